//! Command drivers for the hadoop and hive command line clients.
//!
//! Drivers only compose argument vectors; execution goes through
//! [`run_process`] and the exit code is returned unchanged.

use std::path::{Path, PathBuf};

use crate::environment::ExecutionEnvironment;
use crate::error::{HarnessError, HarnessResult};
use crate::process::{run_process, CapturingSink, CommandLine, LogSink};

/// Driver for `hadoop` (`fs`, `jar`, `version`).
#[derive(Debug, Clone)]
pub struct FsCli {
    pub program: PathBuf,
}

impl FsCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `<program> <args...>`
    pub fn command<I, S>(&self, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(&self.program).args(args)
    }

    pub fn ls(&self, path: &str) -> CommandLine {
        self.command(["fs", "-ls", path])
    }

    pub fn mkdir(&self, path: &str) -> CommandLine {
        self.command(["fs", "-mkdir", path])
    }

    pub fn put(&self, local: &Path, remote: &str) -> CommandLine {
        self.command(["fs".to_string(), "-put".to_string(), path_arg(local), remote.to_string()])
    }

    pub fn get(&self, remote: &str, local: &Path) -> CommandLine {
        self.command(["fs".to_string(), "-get".to_string(), remote.to_string(), path_arg(local)])
    }

    /// `fs -test -e`: exit 0 when the path exists, 1 when it does not.
    pub fn test_exists(&self, path: &str) -> CommandLine {
        self.command(["fs", "-test", "-e", path])
    }

    pub fn jar<I, S>(&self, jar: &Path, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command(["jar".to_string(), path_arg(jar)]).args(args)
    }

    pub fn version(&self) -> CommandLine {
        self.command(["version"])
    }

    /// Runs `cmd`, returning its exit code.
    pub fn run(
        &self,
        cmd: &CommandLine,
        env: &ExecutionEnvironment,
        sink: &mut dyn LogSink,
    ) -> HarnessResult<i32> {
        execute(cmd, env, sink)
    }
}

/// Driver for `hive -e <query>` against a metastore scoped to the run.
#[derive(Debug, Clone)]
pub struct QueryCli {
    pub program: PathBuf,
    pub metastore_url: String,
}

impl QueryCli {
    /// Query driver whose embedded metastore lives in `work_dir`.
    pub fn new(program: impl Into<PathBuf>, work_dir: &Path) -> Self {
        Self {
            program: program.into(),
            metastore_url: metastore_url(work_dir),
        }
    }

    pub fn command(&self, query: &str) -> CommandLine {
        CommandLine::new(&self.program)
            .arg("--hiveconf")
            .arg("hive.rpc.query.plan=true")
            .arg("--hiveconf")
            .arg(format!("javax.jdo.option.ConnectionURL={}", self.metastore_url))
            .arg("-e")
            .arg(query)
    }

    /// Runs `query`, returning the exit code.
    pub fn run(
        &self,
        query: &str,
        env: &ExecutionEnvironment,
        sink: &mut dyn LogSink,
    ) -> HarnessResult<i32> {
        execute(&self.command(query), env, sink)
    }
}

/// Embedded Derby metastore created on first use under `work_dir`.
pub fn metastore_url(work_dir: &Path) -> String {
    format!(
        "jdbc:derby:{}/metastore_db;databaseName=metastore_db;create=true",
        work_dir.display()
    )
}

fn execute(
    cmd: &CommandLine,
    env: &ExecutionEnvironment,
    sink: &mut dyn LogSink,
) -> HarnessResult<i32> {
    log::info!("Execute: {cmd}");
    run_process(cmd, env, sink)
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Checks the hadoop client starts, returning its version banner.
pub fn check_available(fs_cli: &FsCli, env: &ExecutionEnvironment) -> HarnessResult<String> {
    let cmd = fs_cli.version();
    let mut sink = CapturingSink::default();
    let code = fs_cli.run(&cmd, env, &mut sink)?;
    if code != 0 {
        return Err(HarnessError::CommandFailed {
            command: cmd.to_string(),
            code,
        });
    }
    let version = sink
        .lines
        .iter()
        .find(|l| l.starts_with("Hadoop "))
        .or_else(|| sink.lines.iter().find(|l| !l.trim().is_empty()))
        .cloned()
        .unwrap_or_default();
    Ok(version)
}
