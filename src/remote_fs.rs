//! Read-only access to the filesystem under test.
//!
//! The harness never owns remote state; it only checks existence, lists
//! directories and reads files back.

use std::fs;
use std::path::{Path, PathBuf};

use crate::drivers::FsCli;
use crate::environment::ExecutionEnvironment;
use crate::error::{HarnessError, HarnessResult, IoContext};
use crate::process::{CapturingSink, LogForwarder};

/// Observation interface onto the distributed filesystem.
pub trait RemoteFs {
    fn exists(&self, path: &str) -> HarnessResult<bool>;

    /// Children of `dir`, sorted.
    fn list(&self, dir: &str) -> HarnessResult<Vec<String>>;

    fn read(&self, path: &str) -> HarnessResult<Vec<u8>>;
}

/// Joins a child name onto a remote directory.
pub fn join_remote(dir: &str, child: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), child.trim_start_matches('/'))
}

/// Remote filesystem observed through the hadoop client.
#[derive(Debug, Clone)]
pub struct CliRemoteFs {
    cli: FsCli,
    env: ExecutionEnvironment,
    scratch_dir: PathBuf,
}

impl CliRemoteFs {
    /// `scratch_dir` receives downloaded copies.
    pub fn new(cli: FsCli, env: ExecutionEnvironment, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            cli,
            env,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Downloads `remote` to `local`, which must not exist yet.
    pub fn download(&self, remote: &str, local: &Path) -> HarnessResult<()> {
        let cmd = self.cli.get(remote, local);
        let code = self.cli.run(&cmd, &self.env, &mut LogForwarder)?;
        if code != 0 {
            return Err(HarnessError::CommandFailed {
                command: cmd.to_string(),
                code,
            });
        }
        Ok(())
    }
}

impl RemoteFs for CliRemoteFs {
    fn exists(&self, path: &str) -> HarnessResult<bool> {
        let cmd = self.cli.test_exists(path);
        match self.cli.run(&cmd, &self.env, &mut LogForwarder)? {
            0 => Ok(true),
            1 => Ok(false),
            code => Err(HarnessError::CommandFailed {
                command: cmd.to_string(),
                code,
            }),
        }
    }

    fn list(&self, dir: &str) -> HarnessResult<Vec<String>> {
        let cmd = self.cli.ls(dir);
        let mut sink = CapturingSink::default();
        let code = self.cli.run(&cmd, &self.env, &mut sink)?;
        if code != 0 {
            return Err(HarnessError::CommandFailed {
                command: cmd.to_string(),
                code,
            });
        }

        let mut children: Vec<String> = sink
            .lines
            .iter()
            .filter_map(|line| parse_listing_line(line))
            .filter(|path| is_child_of(path, dir))
            .collect();
        children.sort();
        Ok(children)
    }

    fn read(&self, path: &str) -> HarnessResult<Vec<u8>> {
        let fetch_dir = tempfile::Builder::new()
            .prefix("fetch-")
            .tempdir_in(&self.scratch_dir)
            .at_path(&self.scratch_dir)?;
        let name = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("root");
        let local = fetch_dir.path().join(name);

        self.download(path, &local)?;
        fs::read(&local).at_path(&local)
    }
}

/// Path column of an `fs -ls` entry line.
///
/// Entry lines have a permission string followed by replication, owner,
/// group, size, date and time columns. Headers and client log noise yield
/// `None`.
pub fn parse_listing_line(line: &str) -> Option<String> {
    let mut rest = line.trim_start();
    let mut columns = Vec::with_capacity(7);
    for _ in 0..7 {
        let end = rest.find(char::is_whitespace)?;
        columns.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    let permissions = columns[0];
    let looks_like_mode = permissions.len() >= 10
        && permissions.starts_with(['d', '-', 'l'])
        && permissions
            .chars()
            .skip(1)
            .take(9)
            .all(|c| matches!(c, 'r' | 'w' | 'x' | 's' | 'S' | 't' | 'T' | '-'));
    let path = rest.trim_end();

    (looks_like_mode && path.starts_with('/')).then(|| path.to_string())
}

fn is_child_of(path: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// Remote filesystem mounted (or mirrored) under a local directory.
#[derive(Debug, Clone)]
pub struct LocalRemoteFs {
    root: PathBuf,
}

impl LocalRemoteFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn local(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl RemoteFs for LocalRemoteFs {
    fn exists(&self, path: &str) -> HarnessResult<bool> {
        Ok(self.local(path).exists())
    }

    fn list(&self, dir: &str) -> HarnessResult<Vec<String>> {
        let local = self.local(dir);
        let mut children = Vec::new();
        for entry in fs::read_dir(&local).at_path(&local)? {
            let entry = entry.at_path(&local)?;
            children.push(join_remote(dir, &entry.file_name().to_string_lossy()));
        }
        children.sort();
        Ok(children)
    }

    fn read(&self, path: &str) -> HarnessResult<Vec<u8>> {
        let local = self.local(path);
        fs::read(&local).at_path(&local)
    }
}
