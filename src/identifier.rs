//! Channel URL parsing and validation
//!
//! Resolves free-form input (full URLs, handles, bare channel IDs) into a
//! typed [`ChannelRef`]. Resolution is deterministic and pure: no network
//! access, so unresolvable input fails immediately without consuming a key.

use std::fmt;

/// Kind of channel reference extracted from raw input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Canonical channel ID ("UC..." from /channel/ paths or bare input)
    ChannelId,
    /// Handle ("@name" from /@name or /c/name paths)
    Handle,
    /// Legacy username (from /user/name paths)
    Username,
    /// Video ID (from watch?v= or youtu.be links); needs one extra lookup
    /// to resolve the owning channel
    Video,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefKind::ChannelId => "channel_id",
            RefKind::Handle => "handle",
            RefKind::Username => "username",
            RefKind::Video => "video",
        };
        write!(f, "{s}")
    }
}

/// A resolved channel reference: what to look up and how
///
/// # Examples
///
/// ```
/// use channel_batch_fetcher::identifier::{ChannelRef, RefKind};
///
/// let r = ChannelRef::parse("https://www.youtube.com/@example").unwrap();
/// assert_eq!(r.kind(), RefKind::Handle);
/// assert_eq!(r.value(), "@example");
/// assert_eq!(r.cache_key(), "handle:@example");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    kind: RefKind,
    value: String,
}

impl ChannelRef {
    /// Parse raw input into a channel reference
    ///
    /// Accepts full URLs (with or without scheme/www), bare "@handle" input,
    /// and bare channel IDs. Input is trimmed; handle and path components are
    /// percent-trimmed of trailing slashes and query strings.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] if the input matches none of the
    /// recognized forms or a matched component is empty.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        // Bare handle input, no URL at all
        if let Some(handle) = trimmed.strip_prefix('@') {
            return Self::handle(handle);
        }

        // Bare canonical channel ID
        if looks_like_channel_id(trimmed) {
            return Ok(Self {
                kind: RefKind::ChannelId,
                value: trimmed.to_string(),
            });
        }

        let path = strip_origin(trimmed)?;

        // youtu.be short links carry the video ID as the whole path
        if host_of(trimmed).is_some_and(|h| h == "youtu.be") {
            let video = first_segment(path);
            return Self::video(video);
        }

        if let Some(rest) = path.strip_prefix("channel/") {
            let id = first_segment(rest);
            if !looks_like_channel_id(id) {
                return Err(IdentifierError::InvalidChannelId(id.to_string()));
            }
            return Ok(Self {
                kind: RefKind::ChannelId,
                value: id.to_string(),
            });
        }

        if let Some(rest) = path.strip_prefix('@') {
            return Self::handle(first_segment(rest));
        }

        if let Some(rest) = path.strip_prefix("user/") {
            let name = first_segment(rest);
            if name.is_empty() {
                return Err(IdentifierError::EmptyComponent("username"));
            }
            return Ok(Self {
                kind: RefKind::Username,
                value: name.to_string(),
            });
        }

        // Legacy custom URLs resolve through the handle lookup nowadays
        if let Some(rest) = path.strip_prefix("c/") {
            return Self::handle(first_segment(rest));
        }

        if let Some(rest) = path.strip_prefix("watch") {
            let query = rest.strip_prefix('?').unwrap_or(rest);
            for pair in query.split('&') {
                if let Some(v) = pair.strip_prefix("v=") {
                    return Self::video(v);
                }
            }
            return Err(IdentifierError::MissingVideoId(trimmed.to_string()));
        }

        if let Some(rest) = path.strip_prefix("shorts/") {
            return Self::video(first_segment(rest));
        }

        Err(IdentifierError::Unrecognized(trimmed.to_string()))
    }

    fn handle(name: &str) -> Result<Self, IdentifierError> {
        let name = first_segment(name);
        if name.is_empty() {
            return Err(IdentifierError::EmptyComponent("handle"));
        }
        Ok(Self {
            kind: RefKind::Handle,
            value: format!("@{name}"),
        })
    }

    fn video(id: &str) -> Result<Self, IdentifierError> {
        let id = first_segment(id);
        if id.is_empty() {
            return Err(IdentifierError::EmptyComponent("video id"));
        }
        Ok(Self {
            kind: RefKind::Video,
            value: id.to_string(),
        })
    }

    /// Reference kind
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    /// Normalized lookup value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Normalized cache key in `<kind>:<value>` format
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.kind, self.value)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Strip scheme and host, returning the path portion without leading slash
fn strip_origin(input: &str) -> Result<&str, IdentifierError> {
    let rest = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))
        .unwrap_or(input);

    match rest.split_once('/') {
        Some((host, path)) if is_known_host(host) => Ok(path),
        Some(_) | None => Err(IdentifierError::Unrecognized(input.to_string())),
    }
}

fn host_of(input: &str) -> Option<&str> {
    let rest = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))
        .unwrap_or(input);
    rest.split('/').next().filter(|h| is_known_host(h))
}

fn is_known_host(host: &str) -> bool {
    matches!(
        host,
        "youtube.com" | "www.youtube.com" | "m.youtube.com" | "youtu.be"
    )
}

/// First path segment, with any query string or fragment cut off
fn first_segment(s: &str) -> &str {
    s.split(['/', '?', '#']).next().unwrap_or("")
}

/// Canonical channel IDs are "UC" + 22 URL-safe base64 characters
fn looks_like_channel_id(s: &str) -> bool {
    s.len() == 24
        && s.starts_with("UC")
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Identifier parsing errors
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// Input was empty or whitespace
    #[error("input is empty")]
    Empty,

    /// Input matched no recognized URL form
    #[error("unrecognized channel reference: {0}")]
    Unrecognized(String),

    /// A /channel/ path did not carry a well-formed channel ID
    #[error("invalid channel id: {0}")]
    InvalidChannelId(String),

    /// A watch URL was missing its v= parameter
    #[error("watch URL has no video id: {0}")]
    MissingVideoId(String),

    /// A matched component was empty
    #[error("{0} component cannot be empty")]
    EmptyComponent(&'static str),
}
