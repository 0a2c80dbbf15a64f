//! Result verification against the filesystem under test.
//!
//! Every check returns a [`HarnessError`] carrying both the expected and the
//! observed value.

use crate::error::{HarnessError, HarnessResult};
use crate::job_stats::JobStats;
use crate::process::CommandLine;
use crate::remote_fs::RemoteFs;

/// Zero exit is the only success.
pub fn ensure_success(code: i32, cmd: &CommandLine) -> HarnessResult<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(HarnessError::CommandFailed {
            command: cmd.to_string(),
            code,
        })
    }
}

pub fn assert_exists(fs: &dyn RemoteFs, path: &str) -> HarnessResult<()> {
    if fs.exists(path)? {
        Ok(())
    } else {
        Err(HarnessError::mismatch(
            format!("remote path {path}"),
            "exists",
            "missing",
        ))
    }
}

/// The only child of `dir`. Zero or several children are ambiguous.
pub fn single_child(fs: &dyn RemoteFs, dir: &str, what: &str) -> HarnessResult<String> {
    let mut children = fs.list(dir)?;
    if children.len() == 1 {
        Ok(children.remove(0))
    } else {
        Err(HarnessError::Ambiguous {
            what: format!("{what} under {dir}"),
            candidates: children,
        })
    }
}

/// Lower bound on qualifying statistics events.
///
/// The exact count depends on how the engine schedules tasks; only the
/// minimum is checked.
pub fn assert_min_events(stats: &JobStats, min: u64) -> HarnessResult<()> {
    if stats.total() >= min {
        Ok(())
    } else {
        Err(HarnessError::mismatch(
            "job statistics events",
            format!(">= {min}"),
            stats.total().to_string(),
        ))
    }
}

/// Sorts the lines of `content` and compares them with `expected`.
pub fn assert_sorted_lines(what: &str, content: &[u8], expected: &[String]) -> HarnessResult<()> {
    let text = String::from_utf8_lossy(content);
    let mut actual: Vec<&str> = text.lines().collect();
    actual.sort_unstable();

    if actual.iter().eq(expected.iter()) {
        Ok(())
    } else {
        Err(HarnessError::mismatch(
            what,
            format!("{expected:?}"),
            format!("{actual:?}"),
        ))
    }
}

/// Byte-exact comparison of `content` with `expected`.
pub fn assert_exact(what: &str, content: &[u8], expected: &str) -> HarnessResult<()> {
    if content == expected.as_bytes() {
        Ok(())
    } else {
        Err(HarnessError::mismatch(
            what,
            expected,
            String::from_utf8_lossy(content),
        ))
    }
}

/// An uploaded file read back must match the local original.
pub fn assert_round_trip(what: &str, local: &[u8], remote: &[u8]) -> HarnessResult<()> {
    if local == remote {
        return Ok(());
    }
    let first_diff = local
        .iter()
        .zip(remote)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| local.len().min(remote.len()));
    Err(HarnessError::mismatch(
        what,
        format!("{} identical bytes", local.len()),
        format!("{} bytes, first difference at offset {first_diff}", remote.len()),
    ))
}
