//! Lane key construction.
//!
//! A lane key identifies the ordered stream of work a single conversation
//! participant feeds into the lane queue and session registry:
//! `<source>:<channel>` for the shared per-channel lane, or
//! `<source>:<channel>::session::<safeSessionId>` once a caller pins an
//! explicit sub-session onto that channel.

/// The base lane key, before any explicit sub-session is pinned onto it.
pub fn base_lane_key(source: &str, channel: &str) -> String {
    format!("{source}:{channel}")
}

/// The full lane key, appending a sanitized session suffix when present.
pub fn lane_key(source: &str, channel: &str, session_id: Option<&str>) -> String {
    let base = base_lane_key(source, channel);
    match session_id {
        Some(raw) if !raw.is_empty() => format!("{base}::session::{}", sanitize_session_id(raw)),
        _ => base,
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_` so a session ID can't
/// smuggle `:` or whitespace into the lane key's delimiter grammar.
fn sanitize_session_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_key_has_no_session_suffix() {
        assert_eq!(base_lane_key("discord", "general"), "discord:general");
    }

    #[test]
    fn full_key_appends_session_suffix() {
        assert_eq!(
            lane_key("discord", "general", Some("abc-123")),
            "discord:general::session::abc-123"
        );
    }

    #[test]
    fn missing_session_falls_back_to_base() {
        assert_eq!(lane_key("cli", "local", None), "cli:local");
        assert_eq!(lane_key("cli", "local", Some("")), "cli:local");
    }

    #[test]
    fn unsafe_characters_are_sanitized() {
        assert_eq!(
            lane_key("discord", "general", Some("alice bob:42")),
            "discord:general::session::alice_bob_42"
        );
    }
}
