use serde::{Deserialize, Serialize};

use crate::chat::PostType;

/// Body of `POST /posts`.
#[derive(Serialize)]
pub(crate) struct CreatePost<'a> {
    pub(crate) channel_id: &'a str,
    pub(crate) message: &'a str,
    #[serde(rename = "type")]
    pub(crate) post_type: PostType,
}

/// Body of `POST /posts/ephemeral`.
#[derive(Serialize)]
pub(crate) struct EphemeralPost<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) post: EphemeralMessage<'a>,
}

#[derive(Serialize)]
pub(crate) struct EphemeralMessage<'a> {
    pub(crate) channel_id: &'a str,
    pub(crate) message: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshSignal<'a> {
    pub(crate) user_id: &'a str,
}

/// A channel, as returned from `/channels/direct`.
#[derive(Debug, Deserialize)]
pub(crate) struct Channel {
    pub(crate) id: String,
}

/// A created post.
#[derive(Debug, Deserialize)]
pub(crate) struct PostResponse {
    #[allow(unused)]
    pub(crate) id: String,
}
