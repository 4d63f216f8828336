use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::chat::api::{
    Channel, CreatePost, EphemeralMessage, EphemeralPost, PostResponse, RefreshSignal,
};
use crate::chat::{MessageSink, Post, PostType};
use crate::config::ChatConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the chat server's v4 REST API, authenticated as the bot.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    instance_url: String,
    bot_user_id: String,
    bot_token: SecretString,
    refresh_url: Option<String>,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build chat HTTP client")?;
        Ok(Self {
            client,
            instance_url: config.url.clone(),
            bot_user_id: config.bot_user_id.clone(),
            bot_token: config.bot_token.clone(),
            refresh_url: config.refresh_url.clone(),
        })
    }

    async fn direct_channel(&self, user_id: &str) -> anyhow::Result<Channel> {
        let response = self
            .make_request(Method::POST, "channels/direct")
            .json(&[self.bot_user_id.as_str(), user_id])
            .send()
            .await
            .context("fail opening direct channel")?;
        deserialize_response::<Channel>(response).await
    }

    fn make_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/api/v4/{url}", self.instance_url))
            .bearer_auth(self.bot_token.expose_secret())
    }
}

#[async_trait]
impl MessageSink for ChatClient {
    async fn create_post(&self, post: &Post) -> anyhow::Result<()> {
        let response = self
            .make_request(Method::POST, "posts")
            .json(&CreatePost {
                channel_id: &post.channel_id,
                message: &post.message,
                post_type: post.post_type,
            })
            .send()
            .await
            .context("fail sending chat post")?;
        deserialize_response::<PostResponse>(response).await?;
        Ok(())
    }

    async fn create_direct_post(
        &self,
        user_id: &str,
        message: &str,
        post_type: PostType,
    ) -> anyhow::Result<()> {
        let channel = self.direct_channel(user_id).await?;
        self.create_post(&Post {
            channel_id: channel.id,
            message: message.to_string(),
            post_type,
        })
        .await
    }

    async fn send_ephemeral_post(
        &self,
        user_id: &str,
        channel_id: &str,
        message: &str,
    ) -> anyhow::Result<()> {
        let response = self
            .make_request(Method::POST, "posts/ephemeral")
            .json(&EphemeralPost {
                user_id,
                post: EphemeralMessage {
                    channel_id,
                    message,
                },
            })
            .send()
            .await
            .context("fail sending ephemeral post")?;
        deserialize_response::<PostResponse>(response).await?;
        Ok(())
    }

    async fn publish_refresh(&self, user_id: &str) -> anyhow::Result<()> {
        let Some(url) = &self.refresh_url else {
            return Ok(());
        };
        let response = self
            .client
            .post(url)
            .bearer_auth(self.bot_token.expose_secret())
            .json(&RefreshSignal { user_id })
            .send()
            .await
            .context("fail sending refresh signal")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("refresh signal rejected with {status}: {body}");
        }
        Ok(())
    }
}

async fn deserialize_response<T>(response: Response) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.context("chat API request failed")?;
        Err(anyhow::anyhow!(body))
    } else {
        Ok(response.json::<T>().await.with_context(|| {
            anyhow::anyhow!(
                "Failed to deserialize value of type {}",
                std::any::type_name::<T>()
            )
        })?)
    }
}
