//! Compiler service wire protocol.
//!
//! Newline-delimited JSON over the subprocess's stdin/stdout. One command
//! shape goes out; replies carry the same `command` tag plus a
//! compiler-defined payload. Anything else on the channel is dropped.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The only command tag both sides speak.
pub const BUILD: &str = "build";

/// Outbound command: recompile exactly these files.
#[derive(Debug, Serialize)]
pub struct BuildCommand<'a> {
    pub command: &'static str,
    pub changes: &'a [PathBuf],
}

impl<'a> BuildCommand<'a> {
    pub fn new(changes: &'a [PathBuf]) -> Self {
        Self {
            command: BUILD,
            changes,
        }
    }

    /// One wire line, newline-terminated.
    pub fn encode(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Inbound reply: the `command` tag plus whatever the compiler reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub command: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Parse one reply line. `None` for malformed lines and foreign commands;
/// the caller logs and drops those.
pub fn decode_reply(line: &str) -> Option<BuildReport> {
    let report: BuildReport = serde_json::from_str(line.trim()).ok()?;
    (report.command == BUILD).then_some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command_shape() {
        let changes = vec![PathBuf::from("/p/a.ts"), PathBuf::from("/p/b.exml")];
        let line = BuildCommand::new(&changes).encode().unwrap();
        assert!(line.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["command"], "build");
        assert_eq!(value["changes"][0], "/p/a.ts");
        assert_eq!(value["changes"][1], "/p/b.exml");
    }

    #[test]
    fn test_decode_reply_roundtrip() {
        // an echo service sends the command right back; that is a valid reply
        let changes = vec![PathBuf::from("/p/a.ts")];
        let line = BuildCommand::new(&changes).encode().unwrap();
        let report = decode_reply(&line).unwrap();
        assert_eq!(report.command, "build");
        assert_eq!(report.payload["changes"][0], "/p/a.ts");
    }

    #[test]
    fn test_decode_reply_with_compiler_payload() {
        let report =
            decode_reply(r#"{"command":"build","exitCode":0,"messages":["ok"]}"#).unwrap();
        assert_eq!(report.payload["exitCode"], 0);
        assert_eq!(report.payload["messages"][0], "ok");
    }

    #[test]
    fn test_decode_malformed_is_none() {
        assert!(decode_reply("not json at all").is_none());
        assert!(decode_reply("{\"command\":").is_none());
        assert!(decode_reply("").is_none());
    }

    #[test]
    fn test_decode_foreign_command_is_none() {
        assert!(decode_reply(r#"{"command":"status","ok":true}"#).is_none());
        assert!(decode_reply(r#"{"ok":true}"#).is_none());
    }
}
