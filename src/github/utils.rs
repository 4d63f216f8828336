use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// The `On <date>, <name> <notifications@github.com> wrote:` line that opens
/// the quoted thread of an e-mail reply. Mail clients may wrap it.
static EMAIL_REPLY_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\n\nOn .{0,200}?notifications@github\.com>?\s*wrote:")
        .expect("valid e-mail footer regex")
});

/// Deserialize as an optional string
pub(crate) fn opt_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    use serde::de::Deserialize;
    match <Option<String>>::deserialize(deserializer) {
        Ok(v) => Ok(v.unwrap_or_default()),
        Err(e) => Err(e),
    }
}

/// Strips the quoted e-mail thread GitHub appends to comments posted by
/// replying to a notification e-mail.
pub(crate) fn strip_email_reply(body: &str) -> &str {
    match EMAIL_REPLY_FOOTER.find(body) {
        Some(footer) => &body[..footer.start()],
        None => body,
    }
}

/// Reduces an issue or pull request description to plain text: every tag and
/// comment is dropped, along with the whole content of `<details>` blocks.
pub(crate) fn sanitize_description(body: &str) -> String {
    ammonia::Builder::empty()
        .strip_comments(true)
        .clean_content_tags(HashSet::from(["details", "script", "style"]))
        .clean(body)
        .to_string()
        .trim()
        .to_string()
}
