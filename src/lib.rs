pub mod cache;
pub mod config;
pub mod error;
pub mod gemini;
pub mod host;
pub mod prompt;
pub mod reduce;
pub mod session;
pub mod store;
pub mod timestamp;
pub mod transcript;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// A single captioned utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start of the utterance, in seconds
    pub offset: f64,
    pub text: String,
}

impl Segment {
    pub fn new(offset: f64, text: impl Into<String>) -> Self {
        Self {
            offset,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a transcript-grounded conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

static BARE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").unwrap());

// The trailing group rejects ids that run on past 11 characters.
static URL_SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        r"youtu\.be/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        r"youtube(?:-nocookie)?\.com/embed/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn is_youtube_host(host: &str) -> bool {
    host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com")
}

/// Extract the 11-character video ID from a YouTube URL or a bare ID.
///
/// The `v` query parameter wins when it is well formed; otherwise the whole
/// input is matched against the watch, short-link, embed and shorts shapes.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }

    if let Ok(parsed) = url::Url::parse(input)
        && parsed.host_str().is_some_and(is_youtube_host)
        && let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v")
        && BARE_ID.is_match(&v)
    {
        return Some(v.into_owned());
    }

    URL_SHAPES
        .iter()
        .find_map(|re| re.captures(input).map(|caps| caps[1].to_string()))
}
