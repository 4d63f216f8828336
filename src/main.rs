use anyhow::Context as _;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use hubrelay::chat::ChatClient;
use hubrelay::config::Config;
use hubrelay::github::GithubClient;
use hubrelay::{Context, db};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run_server().await {
        tracing::error!("{e:?}");
        std::process::exit(1);
    }
}

async fn run_server() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let store = db::open(config.database_url.as_deref()).await?;
    let chat = ChatClient::new(&config.chat)?;
    let github = GithubClient::new(config.github_api_url.clone())?;
    if let Some(org) = &config.github_org {
        tracing::info!("subscriptions are restricted to the {org} organization");
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let ctx = Arc::new(Context {
        config,
        store,
        chat: Arc::new(chat),
        github: Arc::new(github),
    });

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, hubrelay::router(ctx))
        .await
        .context("server error")?;
    Ok(())
}
