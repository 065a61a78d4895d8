//! Per-file validation outcome

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Validity result for exactly one candidate file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Verdict {
    pub path: PathBuf,
    pub valid: bool,
    pub error: Option<String>,
    /// File size in bytes, when the file could be stat'ed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Verdict {
    /// Verdict for a file that passed every check.
    pub fn pass(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            valid: true,
            error: None,
            size: None,
        }
    }

    /// Verdict for a file that failed with `error`.
    pub fn fail(path: impl Into<PathBuf>, error: impl Display) -> Self {
        Self {
            path: path.into(),
            valid: false,
            error: Some(error.to_string()),
            size: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_corrupt(&self) -> bool {
        !self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_has_no_error() {
        let verdict = Verdict::pass("/images/ok.png");
        assert!(verdict.valid);
        assert!(!verdict.is_corrupt());
        assert_eq!(verdict.error, None);
        assert_eq!(verdict.path(), Path::new("/images/ok.png"));
    }

    #[test]
    fn test_fail_keeps_message() {
        let verdict = Verdict::fail("/images/bad.jpg", "Incomplete JPEG ending");
        assert!(verdict.is_corrupt());
        assert_eq!(verdict.error.as_deref(), Some("Incomplete JPEG ending"));
    }

    #[test]
    fn test_serializes_null_error_for_valid_files() {
        let json = serde_json::to_value(Verdict::pass("a.png")).unwrap();
        assert_eq!(json["valid"], true);
        assert!(json["error"].is_null());
        assert!(json.get("size").is_none());
    }

    #[test]
    fn test_size_is_carried() {
        let verdict = Verdict::fail("/images/stub.jpg", "Too small: 6 bytes").with_size(6);
        assert_eq!(verdict.size, Some(6));
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["size"], 6);
    }
}
