//! Tests for the REST clients, run against a [`MockServer`].

use crate::common::{MockServer, Reply};
use axum::http::{Method, StatusCode};
use hubrelay::chat::{ChatClient, MessageSink, Post, PostType};
use hubrelay::config::ChatConfig;
use hubrelay::github::{GithubApi, GithubClient};
use secrecy::SecretString;
use serde_json::json;

fn token() -> SecretString {
    "gho_test".to_string().into()
}

fn pull_request(sha: &str) -> serde_json::Value {
    json!({
        "number": 12,
        "title": "Speed things up",
        "body": null,
        "html_url": "https://github.com/octo/hello/pull/12",
        "user": { "login": "alice" },
        "requested_reviewers": [{ "login": "bob" }, { "login": "carol" }],
        "mergeable": true,
        "head": { "sha": sha, "ref": "fast" },
        "base": { "sha": "0000", "ref": "main" },
    })
}

#[tokio::test]
async fn repository_lookup() {
    let server = MockServer::new()
        .route(Method::GET, "/repos/octo/hello", |req| {
            assert_eq!(req.header("authorization"), "Bearer gho_test");
            assert_eq!(req.header("user-agent"), "hubrelay");
            Reply::json(json!({
                "full_name": "octo/hello",
                "private": true,
                "html_url": "https://github.com/octo/hello",
            }))
        })
        .start()
        .await;
    let gh = GithubClient::new(server.url()).unwrap();

    let repo = gh.repository(&token(), "octo", "hello").await.unwrap();
    let repo = repo.expect("repository should be visible");
    assert_eq!(repo.full_name, "octo/hello");
    assert!(repo.private);

    // Unknown routes answer 404, which reads as "not visible".
    let missing = gh.repository(&token(), "octo", "secret").await.unwrap();
    assert!(missing.is_none());

    server.events.assert_eq(&[
        (Method::GET, "/repos/octo/hello"),
        (Method::GET, "/repos/octo/secret"),
    ]);
}

#[tokio::test]
async fn server_errors_are_reported() {
    let server = MockServer::new()
        .route(Method::GET, "/repos/octo/hello", |_| {
            Reply::json(json!({ "message": "Bad credentials" }))
                .with_status(StatusCode::UNAUTHORIZED)
        })
        .start()
        .await;
    let gh = GithubClient::new(server.url()).unwrap();
    let err = gh.repository(&token(), "octo", "hello").await.unwrap_err();
    assert!(format!("{err:?}").contains("Bad credentials"));
}

#[tokio::test]
async fn owner_falls_back_to_users() {
    let server = MockServer::new()
        .route(Method::GET, "/orgs/octo", |_| {
            Reply::json(json!({ "login": "octo" }))
        })
        .route(Method::GET, "/users/alice", |_| {
            Reply::json(json!({ "login": "alice" }))
        })
        .start()
        .await;
    let gh = GithubClient::new(server.url()).unwrap();

    assert!(gh.owner_exists(&token(), "octo").await.unwrap());
    assert!(gh.owner_exists(&token(), "alice").await.unwrap());
    assert!(!gh.owner_exists(&token(), "nobody").await.unwrap());

    server.events.assert_eq(&[
        (Method::GET, "/orgs/octo"),
        (Method::GET, "/orgs/alice"),
        (Method::GET, "/users/alice"),
        (Method::GET, "/orgs/nobody"),
        (Method::GET, "/users/nobody"),
    ]);
}

#[tokio::test]
async fn org_membership() {
    let server = MockServer::new()
        .route(Method::GET, "/orgs/octo/members/alice", |_| {
            Reply::status(StatusCode::NO_CONTENT)
        })
        .start()
        .await;
    let gh = GithubClient::new(server.url()).unwrap();

    assert!(gh.is_org_member(&token(), "octo", "alice").await.unwrap());
    assert!(!gh.is_org_member(&token(), "octo", "mallory").await.unwrap());
}

#[tokio::test]
async fn pull_request_details_combine_status_and_reviews() {
    let server = MockServer::new()
        .route(Method::GET, "/repos/octo/hello/pulls/12", |_| {
            Reply::json(pull_request("abc123"))
        })
        .route(Method::GET, "/repos/octo/hello/commits/abc123/status", |_| {
            Reply::json(json!({ "state": "pending" }))
        })
        .route(Method::GET, "/repos/octo/hello/pulls/12/reviews", |_| {
            Reply::json(json!([{ "user": { "login": "bob" }, "state": "APPROVED" }]))
        })
        .start()
        .await;
    let gh = GithubClient::new(server.url()).unwrap();

    let details = gh
        .pull_request_details(&token(), "octo", "hello", 12)
        .await
        .unwrap();
    assert_eq!(details.url, "https://github.com/octo/hello/pull/12");
    assert_eq!(details.number, 12);
    assert_eq!(details.status, "pending");
    assert_eq!(details.mergeable, Some(true));
    assert_eq!(details.requested_reviewers, ["bob", "carol"]);
    assert_eq!(details.reviews.len(), 1);
    assert_eq!(details.reviews[0].user.login, "bob");
    assert_eq!(details.reviews[0].state, "APPROVED");

    // Status and reviews are fetched concurrently, in no particular order.
    let mut paths: Vec<String> = server
        .events
        .take()
        .into_iter()
        .map(|(_, path)| path)
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        [
            "/repos/octo/hello/commits/abc123/status",
            "/repos/octo/hello/pulls/12",
            "/repos/octo/hello/pulls/12/reviews",
        ]
    );
}

#[tokio::test]
async fn missing_pull_request() {
    let server = MockServer::new().start().await;
    let gh = GithubClient::new(server.url()).unwrap();
    let err = gh
        .pull_request_details(&token(), "octo", "hello", 404)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("octo/hello#404 not found"));
}

fn chat_config(url: String, refresh_url: Option<String>) -> ChatConfig {
    ChatConfig {
        url,
        bot_token: "bot-token".to_string().into(),
        bot_user_id: "bot".to_string(),
        refresh_url,
    }
}

#[tokio::test]
async fn channel_post() {
    let server = MockServer::new()
        .route(Method::POST, "/api/v4/posts", |req| {
            assert_eq!(req.header("authorization"), "Bearer bot-token");
            assert_eq!(
                req.json(),
                json!({
                    "channel_id": "town-square",
                    "message": "hello",
                    "type": "custom_git_pr",
                })
            );
            Reply::json(json!({ "id": "p1" })).with_status(StatusCode::CREATED)
        })
        .start()
        .await;
    let chat = ChatClient::new(&chat_config(server.url(), None)).unwrap();

    chat.create_post(&Post {
        channel_id: "town-square".to_string(),
        message: "hello".to_string(),
        post_type: PostType::PullRequest,
    })
    .await
    .unwrap();
    server.events.assert_eq(&[(Method::POST, "/api/v4/posts")]);
}

#[tokio::test]
async fn rejected_post() {
    let server = MockServer::new()
        .route(Method::POST, "/api/v4/posts", |_| {
            Reply::json(json!({ "message": "channel archived" }))
                .with_status(StatusCode::FORBIDDEN)
        })
        .start()
        .await;
    let chat = ChatClient::new(&chat_config(server.url(), None)).unwrap();
    let err = chat
        .create_post(&Post {
            channel_id: "gone".to_string(),
            message: "hello".to_string(),
            post_type: PostType::Issue,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("channel archived"));
}

#[tokio::test]
async fn direct_post_opens_channel_then_refreshes() {
    let server = MockServer::new()
        .route(Method::POST, "/api/v4/channels/direct", |req| {
            assert_eq!(req.json(), json!(["bot", "u1"]));
            Reply::json(json!({ "id": "dm-bot-u1" })).with_status(StatusCode::CREATED)
        })
        .route(Method::POST, "/api/v4/posts", |req| {
            assert_eq!(req.json()["channel_id"], "dm-bot-u1");
            assert_eq!(req.json()["type"], "custom_git_mention");
            Reply::json(json!({ "id": "p1" })).with_status(StatusCode::CREATED)
        })
        .route(Method::POST, "/refresh", |req| {
            assert_eq!(req.json(), json!({ "user_id": "u1" }));
            Reply::status(StatusCode::OK)
        })
        .start()
        .await;
    let refresh_url = format!("{}/refresh", server.url());
    let chat = ChatClient::new(&chat_config(server.url(), Some(refresh_url))).unwrap();

    chat.create_direct_post("u1", "you were mentioned", PostType::Mention)
        .await
        .unwrap();
    chat.publish_refresh("u1").await.unwrap();

    server.events.assert_eq(&[
        (Method::POST, "/api/v4/channels/direct"),
        (Method::POST, "/api/v4/posts"),
        (Method::POST, "/refresh"),
    ]);
}

#[tokio::test]
async fn refresh_without_endpoint_is_a_no_op() {
    let server = MockServer::new().start().await;
    let chat = ChatClient::new(&chat_config(server.url(), None)).unwrap();
    chat.publish_refresh("u1").await.unwrap();
    server.events.assert_eq(&[]);
}

#[tokio::test]
async fn ephemeral_post() {
    let server = MockServer::new()
        .route(Method::POST, "/api/v4/posts/ephemeral", |req| {
            assert_eq!(
                req.json(),
                json!({
                    "user_id": "u1",
                    "post": { "channel_id": "c1", "message": "only for you" },
                })
            );
            Reply::json(json!({ "id": "e1" })).with_status(StatusCode::CREATED)
        })
        .start()
        .await;
    let chat = ChatClient::new(&chat_config(server.url(), None)).unwrap();
    chat.send_ephemeral_post("u1", "c1", "only for you")
        .await
        .unwrap();
}
