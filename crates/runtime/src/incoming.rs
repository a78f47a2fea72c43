//! Incoming request shape and identifier sanitization.

use nxa_sessions::{base_lane_key, lane_key};

/// A single turn handed to `handle_incoming`, as the channel adapter saw it.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub source: String,
    pub channel_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub text: String,
}

impl IncomingMessage {
    /// `safeIncoming`: every identifier run through [`sanitize`] so none of
    /// them can smuggle the lane-key delimiter grammar, path separators,
    /// or whitespace into anything derived from them.
    pub fn sanitized(&self) -> SafeIncoming {
        SafeIncoming {
            source: sanitize(&self.source),
            channel_id: sanitize(&self.channel_id),
            user_id: sanitize(&self.user_id),
            session_id: self.session_id.as_deref().map(sanitize),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SafeIncoming {
    pub source: String,
    pub channel_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
}

impl SafeIncoming {
    pub fn lane_key(&self) -> String {
        lane_key(&self.source, &self.channel_id, self.session_id.as_deref())
    }

    pub fn base_lane_key(&self) -> String {
        base_lane_key(&self.source, &self.channel_id)
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`; an identifier that
/// sanitizes to nothing becomes `unknown` rather than an empty string.
fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_unsafe_characters() {
        let incoming = IncomingMessage {
            source: "discord".into(),
            channel_id: "general chat".into(),
            user_id: "alice:42".into(),
            session_id: None,
            text: "hi".into(),
        };
        let safe = incoming.sanitized();
        assert_eq!(safe.channel_id, "general_chat");
        assert_eq!(safe.user_id, "alice_42");
    }

    #[test]
    fn empty_identifier_becomes_unknown() {
        let incoming = IncomingMessage {
            source: "".into(),
            channel_id: "general".into(),
            user_id: "x".into(),
            session_id: None,
            text: "hi".into(),
        };
        assert_eq!(incoming.sanitized().source, "unknown");
    }

    #[test]
    fn lane_key_round_trips_through_sanitization() {
        let incoming = IncomingMessage {
            source: "cli".into(),
            channel_id: "local".into(),
            user_id: "u".into(),
            session_id: Some("abc 123".into()),
            text: "hi".into(),
        };
        let safe = incoming.sanitized();
        assert_eq!(safe.lane_key(), "cli:local::session::abc_123");
        assert_eq!(safe.base_lane_key(), "cli:local");
    }
}
