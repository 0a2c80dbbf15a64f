//! Error taxonomy for harness runs.
//!
//! Every failure is fatal to the scenario that raised it; nothing is recovered
//! locally.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure raised while preparing or running a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Required external locations are missing or a template is malformed.
    #[error("environment setup failed: {0}")]
    Environment(String),

    /// An external command exited with a non-zero status.
    #[error("`{command}` exited with status {code}")]
    CommandFailed { command: String, code: i32 },

    /// Observed state differs from the expectation.
    #[error("{what}: expected {expected:?}, actual {actual:?}")]
    Mismatch {
        what: String,
        expected: String,
        actual: String,
    },

    /// Exactly one candidate was expected.
    #[error("{what}: expected exactly one candidate, found {}: [{}]", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        what: String,
        candidates: Vec<String>,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

impl HarnessError {
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }

    pub fn mismatch(
        what: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Mismatch {
            what: what.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether this error means the system under test misbehaved, as opposed
    /// to the harness being unable to run.
    pub const fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::CommandFailed { .. } | Self::Mismatch { .. } | Self::Ambiguous { .. }
        )
    }
}

/// Attaches a path to `io::Result` values.
pub trait IoContext<T> {
    fn at_path(self, path: impl AsRef<Path>) -> HarnessResult<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at_path(self, path: impl AsRef<Path>) -> HarnessResult<T> {
        self.map_err(|e| HarnessError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_reports_both_values() {
        let err = HarnessError::mismatch("word count output", "a\t1", "b\t2");
        let msg = err.to_string();
        assert!(msg.contains("a\\t1"));
        assert!(msg.contains("b\\t2"));
        assert!(err.is_verification_failure());
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = HarnessError::Ambiguous {
            what: "job statistics directory".to_string(),
            candidates: vec!["/user/a/job_1".to_string(), "/user/a/job_2".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "job statistics directory: expected exactly one candidate, found 2: [/user/a/job_1, /user/a/job_2]"
        );
    }

    #[test]
    fn test_io_errors_are_not_verification_failures() {
        let err: HarnessResult<()> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone")).at_path("/tmp/x");
        let err = err.unwrap_err();
        assert!(!err.is_verification_failure());
        assert!(err.to_string().contains("/tmp/x"));
    }
}
