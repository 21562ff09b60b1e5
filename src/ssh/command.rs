//! Remote shell commands for config files
//!
//! Every path is single-quoted before it reaches the remote shell. File
//! content travels base64-encoded so YAML never needs shell quoting.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};

use super::transport::ExecOutput;

pub const EXISTS_MARKER: &str = "EXISTS";
pub const NOT_EXISTS_MARKER: &str = "NOT_EXISTS";
pub const CONNECTION_TEST_MARKER: &str = "Connection test successful";

/// Timestamp format of backup suffixes
const BACKUP_STAMP: &str = "%Y%m%d_%H%M%S";

pub fn shell_escape(s: &str) -> String {
    // Simple escaping - wrap in single quotes and escape single quotes
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// A command plus how its output is judged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub line: String,
    /// Treat any stderr output as failure even on exit 0
    pub strict_stderr: bool,
}

impl RemoteCommand {
    fn new(line: String, strict_stderr: bool) -> Self {
        Self {
            line,
            strict_stderr,
        }
    }

    /// `cat <path>`
    pub fn read(path: &str) -> Self {
        Self::new(format!("cat {}", shell_escape(path)), true)
    }

    /// Prints [`EXISTS_MARKER`] or [`NOT_EXISTS_MARKER`]
    pub fn exists(path: &str) -> Self {
        Self::new(
            format!(
                "test -f {} && echo '{}' || echo '{}'",
                shell_escape(path),
                EXISTS_MARKER,
                NOT_EXISTS_MARKER
            ),
            true,
        )
    }

    /// `cp -p <path> <path>.bak.<stamp>`
    pub fn backup(path: &str, backup_path: &str) -> Self {
        Self::new(
            format!("cp -p {} {}", shell_escape(path), shell_escape(backup_path)),
            false,
        )
    }

    /// Replace the file at `path` with `content`
    pub fn write(path: &str, content: &str) -> Self {
        Self::new(
            format!(
                "printf '%s' {} | base64 -d > {}",
                shell_escape(&BASE64.encode(content.as_bytes())),
                shell_escape(path)
            ),
            false,
        )
    }

    pub fn connection_test() -> Self {
        Self::new(format!("echo '{}'", CONNECTION_TEST_MARKER), false)
    }

    /// Operator-supplied command, judged by exit code alone
    pub fn raw(line: impl Into<String>) -> Self {
        Self::new(line.into(), false)
    }

    /// Why `output` counts as a failure, if it does
    pub fn failure(&self, output: &ExecOutput) -> Option<String> {
        match output.exit_code {
            None => return Some("command exited without status".to_string()),
            Some(0) => {}
            Some(code) => {
                let stderr = output.stderr.trim();
                return Some(if stderr.is_empty() {
                    format!("exit code {}", code)
                } else {
                    format!("exit code {}: {}", code, stderr)
                });
            }
        }
        if self.strict_stderr && !output.stderr.trim().is_empty() {
            return Some(output.stderr.trim().to_string());
        }
        None
    }

    /// First word, for logs; never the arguments
    pub fn summary(&self) -> &str {
        self.line.split_whitespace().next().unwrap_or_default()
    }
}

/// Sibling path the original is copied to before a deploy
pub fn backup_path(path: &str, at: DateTime<Utc>) -> String {
    format!("{}.bak.{}", path, at.format(BACKUP_STAMP))
}
