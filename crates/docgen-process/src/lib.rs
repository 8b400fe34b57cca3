//! External tool execution for docgen.
//!
//! Both external tools docgen drives (the Mermaid CLI and pandoc) are run
//! through [`run`], which:
//! - captures stdout and stderr on background reader threads
//! - polls the child until it exits or the timeout elapses
//! - kills and reaps the child on timeout, so nothing is left running
//!
//! On Unix the child leads its own process group. Helpers it forks (npx
//! shims, headless browsers) are killed with it, and output pipes they keep
//! open cannot hold the caller past the timeout.
//!
//! A missing executable is reported as [`ProcessError::NotFound`] so callers
//! can tell "tool unavailable" apart from "tool failed".

use std::fmt;
use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for output pipes to close after killing leftover descendants.
const PIPE_GRACE: Duration = Duration::from_millis(500);

type Reader = Receiver<io::Result<String>>;

/// Timeout used when probing a tool with `--version`.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// An external tool invocation prefix: the program plus any leading arguments.
///
/// Callers append their own arguments via [`ToolCommand::to_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    /// Create a command for the given program (name on `PATH` or a path).
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add leading arguments placed before any call-specific arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build a [`Command`] with the program and leading arguments.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    /// Check whether the tool can be launched and answers `--version`.
    #[must_use]
    pub fn is_available(&self) -> bool {
        let mut command = self.to_command();
        command.arg("--version");
        match run(command, &self.program, PROBE_TIMEOUT) {
            Ok(output) => output.success(),
            Err(err) => {
                tracing::debug!(program = %self.program, error = %err, "Tool probe failed");
                false
            }
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code (`None` when terminated by a signal).
    pub code: Option<i32>,
    /// Standard output (lossy UTF-8).
    pub stdout: String,
    /// Standard error (lossy UTF-8).
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Error launching or waiting for an external process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The executable could not be found.
    #[error("'{program}' not found")]
    NotFound { program: String },
    /// The process exceeded its time budget and was killed.
    #[error("'{program}' timed out after {timeout_ms}ms", timeout_ms = .timeout.as_millis())]
    Timeout { program: String, timeout: Duration },
    /// Any other I/O failure while spawning or waiting.
    #[error("failed to run '{program}': {source}")]
    Io {
        program: String,
        source: io::Error,
    },
}

/// Run a prepared command, waiting at most `timeout` for it to exit.
///
/// stdin is closed, stdout and stderr are captured. `program` is only used
/// for diagnostics. Descendants still holding the output pipes once the
/// budget is spent are killed, and whatever was captured is returned.
///
/// # Errors
///
/// - [`ProcessError::NotFound`] if the executable does not exist
/// - [`ProcessError::Timeout`] if the process was killed after `timeout`
/// - [`ProcessError::Io`] for other spawn or wait failures
pub fn run(
    mut command: Command,
    program: &str,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    command.process_group(0);

    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ProcessError::NotFound {
                program: program.to_owned(),
            }
        } else {
            ProcessError::Io {
                program: program.to_owned(),
                source,
            }
        }
    })?;

    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let status = wait_with_timeout(&mut child, timeout).map_err(|source| ProcessError::Io {
        program: program.to_owned(),
        source,
    })?;

    let Some(status) = status else {
        // Reader threads end on their own once the pipes close.
        tracing::warn!(
            program,
            timeout_ms = timeout.as_millis(),
            "Process timed out and was killed"
        );
        return Err(ProcessError::Timeout {
            program: program.to_owned(),
            timeout,
        });
    };

    let [stdout, stderr] = collect_output(
        &mut child,
        [stdout, stderr],
        timeout.saturating_sub(started.elapsed()),
        program,
    );
    Ok(ProcessOutput {
        code: status.code(),
        stdout,
        stderr,
    })
}

/// Poll the child until it exits; kill and reap it once `timeout` elapses.
///
/// Returns `None` when the child was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(err) => {
                kill_tree(child);
                let _ = child.wait();
                return Err(err);
            }
        }
        if start.elapsed() >= timeout {
            kill_tree(child);
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Wait for the reader threads, spending at most `budget` before killing
/// whatever still holds the pipes open.
fn collect_output(
    child: &mut Child,
    readers: [Option<Reader>; 2],
    budget: Duration,
    program: &str,
) -> [String; 2] {
    let started = Instant::now();
    let mut killed = false;
    readers.map(|reader| {
        let Some(reader) = reader else {
            return String::new();
        };
        loop {
            let wait = if killed {
                PIPE_GRACE
            } else {
                budget.saturating_sub(started.elapsed())
            };
            match reader.recv_timeout(wait) {
                Ok(text) => return text.unwrap_or_default(),
                Err(RecvTimeoutError::Disconnected) => return String::new(),
                Err(RecvTimeoutError::Timeout) if !killed => {
                    tracing::warn!(program, "Descendant processes kept output open, killing them");
                    kill_tree(child);
                    killed = true;
                }
                Err(RecvTimeoutError::Timeout) => return String::new(),
            }
        }
    })
}

/// Kill the child and, on Unix, every process in its group.
///
/// Failures are ignored: the child may already have exited.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(group) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal. The group was created for this
            // child by `process_group(0)` and outlives it while members remain.
            unsafe {
                libc::killpg(group, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}

/// Read `pipe` to the end on a new thread; the text arrives on the returned channel.
fn spawn_reader<R: Read + Send + 'static>(pipe: R) -> Reader {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone once the caller stopped waiting.
        let _ = sender.send(read_pipe(pipe));
    });
    receiver
}

fn read_pipe<R: Read>(mut pipe: R) -> io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
