//! Parsing of the Claude CLI `stream-json` output.
//!
//! Every stdout line is one JSON object with a `type` tag (`system`,
//! `assistant`, `user`, `result`). The relay only needs a few fields out of
//! them; the full value is forwarded to the dashboard untouched.

use serde::Deserialize;
use serde_json::Value;

/// The subset of a stream-json message the relay inspects.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StreamLine {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub is_error: bool,
}

impl StreamLine {
    pub fn is_result(&self) -> bool {
        self.kind == "result"
    }

    /// A `result` message that reports failure (either flag or an `error_*` subtype).
    pub fn is_failed_result(&self) -> bool {
        self.is_result()
            && (self.is_error
                || self
                    .subtype
                    .as_deref()
                    .is_some_and(|s| s.starts_with("error")))
    }
}

/// Parse one stdout line. Returns `None` for blank lines and non-JSON noise.
pub fn parse_line(line: &str) -> Option<(StreamLine, Value)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let parsed: StreamLine = serde_json::from_value(value.clone()).ok()?;
    Some((parsed, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_system_init() {
        let line = r#"{"type":"system","subtype":"init","session_id":"abc-123","tools":["Read"]}"#;
        let (parsed, value) = parse_line(line).unwrap();
        assert_eq!(parsed.kind, "system");
        assert_eq!(parsed.session_id.as_deref(), Some("abc-123"));
        assert_eq!(value["tools"][0], "Read");
        assert!(!parsed.is_result());
    }

    #[test]
    fn test_result_errors() {
        let ok = r#"{"type":"result","subtype":"success","is_error":false,"session_id":"s"}"#;
        assert!(!parse_line(ok).unwrap().0.is_failed_result());

        let flagged = r#"{"type":"result","subtype":"success","is_error":true}"#;
        assert!(parse_line(flagged).unwrap().0.is_failed_result());

        let max_turns = r#"{"type":"result","subtype":"error_max_turns"}"#;
        assert!(parse_line(max_turns).unwrap().0.is_failed_result());
    }

    #[test]
    fn test_noise_is_skipped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
        assert!(parse_line("Loading plugins...").is_none());
        assert!(parse_line(r#"{"no_type": true}"#).is_none());
    }
}
