//! Extraction of `@login` mentions from comment and description bodies.
//!
//! A GitHub login is made of ASCII alphanumerics and single hyphens, cannot
//! start or end with a hyphen and is at most 39 characters long. Anything
//! inside code, quotes or raw HTML is ignored, as is the `@` of an e-mail
//! address or the organization part of an `@org/team` mention.

use crate::ignore_block::IgnoreBlocks;
use regex::Regex;
use std::sync::LazyLock;

const MAX_LOGIN_LEN: usize = 39;

static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_@/`.-])@([A-Za-z0-9-]+)").expect("Invalid regexp")
});

/// Returns the mentioned logins in order of first appearance, without
/// duplicates (logins compare case-insensitively).
pub fn get_mentions(input: &str) -> Vec<&str> {
    let ignore = IgnoreBlocks::new(input);
    let mut mentions: Vec<&str> = Vec::new();
    for caps in MENTION.captures_iter(input) {
        let Some(login) = caps.get(1) else {
            continue;
        };
        // Include the `@` itself when checking against ignored regions.
        if ignore.overlaps(login.start() - 1..login.end()) {
            continue;
        }
        // `@org/team` names a team, not a user.
        if input[login.end()..].starts_with('/') {
            continue;
        }
        let name = login.as_str();
        if !is_valid_login(name) {
            continue;
        }
        if !mentions.iter().any(|m| m.eq_ignore_ascii_case(name)) {
            mentions.push(name);
        }
    }
    mentions
}

fn is_valid_login(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_LOGIN_LEN
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
}
