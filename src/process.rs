//! Process runner for the external command line tools.
//!
//! Standard error is merged into standard output through one pipe. The pipe
//! is drained to end-of-file before the child is waited on, so a chatty child
//! never blocks on a full pipe buffer.

use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::environment::ExecutionEnvironment;
use crate::error::{HarnessResult, IoContext};

/// Log target subprocess output is forwarded under.
pub const SUBPROCESS_TARGET: &str = "subprocess";

/// Receives each line a child process prints.
pub trait LogSink {
    fn line(&mut self, line: &str);
}

/// Forwards lines to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogForwarder;

impl LogSink for LogForwarder {
    fn line(&mut self, line: &str) {
        log::info!(target: SUBPROCESS_TARGET, "{line}");
    }
}

/// Forwards lines to the log and keeps them.
#[derive(Debug, Default)]
pub struct CapturingSink {
    pub lines: Vec<String>,
}

impl LogSink for CapturingSink {
    fn line(&mut self, line: &str) {
        LogForwarder.line(line);
        self.lines.push(line.to_string());
    }
}

/// A program and its full argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs `cmd` in `env`, streaming merged output to `sink`.
///
/// Returns the exit code, `-1` when the child was terminated by a signal.
pub fn run_process(
    cmd: &CommandLine,
    env: &ExecutionEnvironment,
    sink: &mut dyn LogSink,
) -> HarnessResult<i32> {
    let (reader, writer) = io::pipe().at_path(&cmd.program)?;
    let writer_err = writer.try_clone().at_path(&cmd.program)?;

    // The command owns the parent's copies of the write end; it must be
    // dropped before draining or EOF never arrives.
    let mut child = {
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err);
        env.apply(&mut command);
        command.spawn().at_path(&cmd.program)?
    };

    let drained = drain_lines(reader, sink);
    let status = wait_after_drain(&mut child, drained).at_path(&cmd.program)?;
    Ok(status.code().unwrap_or(-1))
}

/// Waits for `child`. A drain error is returned only after the child has
/// been reaped.
fn wait_after_drain(child: &mut Child, drained: io::Result<()>) -> io::Result<ExitStatus> {
    match drained {
        Ok(()) => child.wait(),
        Err(e) => {
            child.wait().ok();
            Err(e)
        }
    }
}

/// Reads `reader` to EOF, forwarding each line without its terminator.
fn drain_lines(reader: impl io::Read, sink: &mut dyn LogSink) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        sink.line(&String::from_utf8_lossy(&buf));
    }
}
