//! Process configuration, read once from the environment at startup.

use secrecy::SecretString;
use std::fmt;

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_BASE_URL: &str = "https://github.com/";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug)]
pub struct Config {
    /// Shared secret used to sign webhook deliveries.
    pub webhook_secret: SecretString,
    /// Bearer token required on the management API.
    pub admin_token: SecretString,
    /// When set, only this organization can be subscribed to.
    pub github_org: Option<String>,
    pub enable_private_repos: bool,
    pub enable_webhook_event_logging: bool,
    pub github_api_url: String,
    /// Web URL prefix stripped from subscription targets.
    pub github_base_url: String,
    pub chat: ChatConfig,
    /// Falls back to an in-memory store when unset.
    pub database_url: Option<String>,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub url: String,
    pub bot_token: SecretString,
    pub bot_user_id: String,
    /// Endpoint notified after each direct message so clients refresh their
    /// pending-review counters.
    pub refresh_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl std::error::Error for ConfigurationError {}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigurationError::Missing(var) => {
                write!(f, "environment variable `{var}` must be set")
            }
            ConfigurationError::Invalid { var, value } => {
                write!(f, "invalid value `{value}` for `{var}`")
            }
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigurationError> {
        Config::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Config, ConfigurationError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigurationError::Missing(var));
        let flag = |var: &'static str| match get(var) {
            None => Ok(false),
            Some(value) => parse_bool(&value).ok_or(ConfigurationError::Invalid { var, value }),
        };

        let port = match get("PORT") {
            None => DEFAULT_PORT,
            Some(value) => value
                .parse()
                .map_err(|_| ConfigurationError::Invalid { var: "PORT", value })?,
        };

        Ok(Config {
            webhook_secret: required("WEBHOOK_SECRET")?.into(),
            admin_token: required("ADMIN_TOKEN")?.into(),
            github_org: get("GITHUB_ORG").map(|org| org.trim().to_lowercase()),
            enable_private_repos: flag("ENABLE_PRIVATE_REPO")?,
            enable_webhook_event_logging: flag("ENABLE_WEBHOOK_EVENT_LOGGING")?,
            github_api_url: get("GITHUB_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            github_base_url: normalize_base_url(
                get("GITHUB_BASE_URL").as_deref().unwrap_or(DEFAULT_GITHUB_BASE_URL),
            ),
            chat: ChatConfig {
                url: required("CHAT_URL")?.trim_end_matches('/').to_string(),
                bot_token: required("CHAT_BOT_TOKEN")?.into(),
                bot_user_id: required("CHAT_BOT_USER_ID")?,
                refresh_url: get("CHAT_REFRESH_URL"),
            },
            database_url: get("DATABASE_URL"),
            port,
        })
    }

    /// A configuration with only the secrets set, used by tests and tools.
    pub fn new(webhook_secret: &str, admin_token: &str) -> Config {
        Config {
            webhook_secret: webhook_secret.to_string().into(),
            admin_token: admin_token.to_string().into(),
            github_org: None,
            enable_private_repos: false,
            enable_webhook_event_logging: false,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_base_url: DEFAULT_GITHUB_BASE_URL.to_string(),
            chat: ChatConfig {
                url: "http://localhost:8065".to_string(),
                bot_token: String::new().into(),
                bot_user_id: String::new(),
                refresh_url: None,
            },
            database_url: None,
            port: DEFAULT_PORT,
        }
    }

    /// Whether `owner` may be subscribed to under the organization lock.
    pub fn check_org(&self, owner: &str) -> bool {
        match &self.github_org {
            Some(org) => org.eq_ignore_ascii_case(owner),
            None => true,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
