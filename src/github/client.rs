use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::github::{
    CombinedStatus, GithubApi, PullRequest, PullRequestDetails, Repository, ReviewSummary,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for the GitHub API.
///
/// Unlike a bot account client, it carries no credential of its own: each
/// call is authenticated with the token of the connected user it is made on
/// behalf of.
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(api_url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build GitHub HTTP client")?;
        Ok(GithubClient { client, api_url })
    }

    /// Sends the request, mapping `404 Not Found` to `None`.
    async fn send_req(&self, req: RequestBuilder) -> anyhow::Result<Option<Bytes>> {
        tracing::debug!("send_req with {:?}", req);
        let req_dbg = format!("{req:?}");
        let resp = req
            .send()
            .await
            .with_context(|| format!("failed to send {req_dbg}"))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let maybe_err = resp.error_for_status_ref().err();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("failed to read response body {req_dbg}"))?;
        if let Some(e) = maybe_err {
            return Err(anyhow::Error::new(e))
                .with_context(|| format!("response: {}", String::from_utf8_lossy(&body)));
        }

        Ok(Some(body))
    }

    async fn json<T>(&self, req: RequestBuilder) -> anyhow::Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.send_req(req).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body).with_context(|| {
                format!("failed to deserialize {}", std::any::type_name::<T>())
            })?)),
            None => Ok(None),
        }
    }

    fn get(&self, token: &SecretString, path: &str) -> RequestBuilder {
        let url = format!("{}/{path}", self.api_url);
        tracing::trace!("get {:?}", url);
        self.client.get(url).configure(token)
    }
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn repository(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<Option<Repository>> {
        self.json(self.get(token, &format!("repos/{owner}/{repo}")))
            .await
            .with_context(|| format!("failed to fetch repository {owner}/{repo}"))
    }

    async fn owner_exists(&self, token: &SecretString, owner: &str) -> anyhow::Result<bool> {
        if self
            .send_req(self.get(token, &format!("orgs/{owner}")))
            .await?
            .is_some()
        {
            return Ok(true);
        }
        Ok(self
            .send_req(self.get(token, &format!("users/{owner}")))
            .await?
            .is_some())
    }

    async fn is_org_member(
        &self,
        token: &SecretString,
        org: &str,
        login: &str,
    ) -> anyhow::Result<bool> {
        // Answers `204 No Content` for members and `404` otherwise.
        let resp = self
            .send_req(self.get(token, &format!("orgs/{org}/members/{login}")))
            .await
            .with_context(|| format!("failed to check membership of {login} in {org}"))?;
        Ok(resp.is_some())
    }

    async fn pull_request_details(
        &self,
        token: &SecretString,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<PullRequestDetails> {
        let pr: PullRequest = self
            .json(self.get(token, &format!("repos/{owner}/{repo}/pulls/{number}")))
            .await?
            .with_context(|| format!("pull request {owner}/{repo}#{number} not found"))?;

        let status_req = match &pr.head {
            Some(head) => Some(self.get(
                token,
                &format!("repos/{owner}/{repo}/commits/{}/status", head.sha),
            )),
            None => None,
        };
        let status = async {
            match status_req {
                Some(req) => self.json::<CombinedStatus>(req).await,
                None => Ok(None),
            }
        };
        let reviews = self.json::<Vec<ReviewSummary>>(
            self.get(token, &format!("repos/{owner}/{repo}/pulls/{number}/reviews")),
        );
        let (status, reviews) = tokio::try_join!(status, reviews)?;

        Ok(PullRequestDetails {
            url: pr.html_url,
            number: pr.number,
            status: status.map(|s| s.state).unwrap_or_default(),
            mergeable: pr.mergeable,
            requested_reviewers: pr
                .requested_reviewers
                .into_iter()
                .map(|user| user.login)
                .collect(),
            reviews: reviews.unwrap_or_default(),
        })
    }
}

trait RequestSend: Sized {
    fn configure(self, token: &SecretString) -> Self;
}

impl RequestSend for RequestBuilder {
    fn configure(self, token: &SecretString) -> RequestBuilder {
        self.header(USER_AGENT, "hubrelay")
            .header(ACCEPT, "application/vnd.github+json")
            .bearer_auth(token.expose_secret())
    }
}
