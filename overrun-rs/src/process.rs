//! Process execution: run options, spawning and completed processes.
//!
//! [`RunOptions`] carries the per-invocation settings, [`execute`] turns a
//! rendered [`CommandLine`] into a [`std::process::Command`] and waits for it,
//! and [`Completion`] is the finished process.  A failed `Completion` whose
//! status nobody looked at prints a warning when it is dropped.

use std::cell::Cell;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::error::ExecError;
use crate::render::CommandLine;

// ── RunOptions ────────────────────────────────────────────────────────────────

/// Per-invocation execution settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
    pub(crate) capture: bool,
    pub(crate) check: Option<bool>,
    current_dir: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    env_remove: Vec<OsString>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print the command to stderr before running it.
    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    /// Discard the child's stdout and stderr (unless captured).
    pub fn quiet(mut self, on: bool) -> Self {
        self.quiet = on;
        self
    }

    /// Capture stdout and stderr into the [`Completion`].
    pub fn capture(mut self, on: bool) -> Self {
        self.capture = on;
        self
    }

    /// Override exit-status checking for `call` and `read`.
    pub fn check(mut self, on: bool) -> Self {
        self.check = Some(on);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env.push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    pub fn env_remove(mut self, key: impl AsRef<OsStr>) -> Self {
        self.env_remove.push(key.as_ref().to_owned());
        self
    }
}

// ── Command construction ──────────────────────────────────────────────────────

/// Which output streams the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Capture {
    Nothing,
    Stdout,
    Both,
}

impl Capture {
    fn for_options(opts: &RunOptions, stdout: bool) -> Self {
        match (opts.capture, stdout) {
            (true, _) => Capture::Both,
            (false, true) => Capture::Stdout,
            (false, false) => Capture::Nothing,
        }
    }
}

fn stdio(piped: bool, quiet: bool) -> Stdio {
    if piped {
        Stdio::piped()
    } else if quiet {
        Stdio::null()
    } else {
        Stdio::inherit()
    }
}

/// Build the `Command` for a rendered line.
///
/// Shell lines run as `<shell> -c <line>`; argument vectors exec `argv[0]`
/// directly.
pub(crate) fn build(line: &CommandLine, shell: &str, opts: &RunOptions, capture: Capture) -> Result<Command, ExecError> {
    let mut cmd = match line {
        CommandLine::Shell(text) => {
            let mut c = Command::new(shell);
            c.arg("-c").arg(text);
            c
        }
        CommandLine::Argv(argv) => {
            let (program, args) = argv.split_first().ok_or(ExecError::EmptyCommand)?;
            let mut c = Command::new(program);
            c.args(args);
            c
        }
    };
    if let Some(dir) = &opts.current_dir {
        cmd.current_dir(dir);
    }
    for key in &opts.env_remove {
        cmd.env_remove(key);
    }
    for (key, value) in &opts.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::inherit());
    cmd.stdout(stdio(capture != Capture::Nothing, opts.quiet));
    cmd.stderr(stdio(capture == Capture::Both, opts.quiet));
    Ok(cmd)
}

fn announce(line: &CommandLine, opts: &RunOptions) {
    if opts.verbose {
        eprintln!("overrun: run: {line}");
    }
}

/// Run a command to completion.
pub(crate) fn execute(
    line: &CommandLine,
    shell: &str,
    opts: &RunOptions,
    want_stdout: bool,
    warn_unchecked: bool,
) -> Result<Completion, ExecError> {
    let capture = Capture::for_options(opts, want_stdout);
    let mut cmd = build(line, shell, opts, capture)?;
    announce(line, opts);
    tracing::debug!(command = %line, ?capture, "running command");

    let command = line.to_string();
    let output = cmd
        .output()
        .map_err(|source| ExecError::Spawn { command: command.clone(), source })?;
    tracing::debug!(command = %line, status = %output.status, "command finished");

    let stdout = (capture != Capture::Nothing).then(|| String::from_utf8_lossy(&output.stdout).into_owned());
    let stderr = (capture == Capture::Both).then(|| String::from_utf8_lossy(&output.stderr).into_owned());
    Ok(Completion {
        command,
        status: output.status,
        stdout,
        stderr,
        inspected: Cell::new(!warn_unchecked),
    })
}

/// Start a command without waiting for it.
pub(crate) fn spawn(line: &CommandLine, shell: &str, opts: &RunOptions) -> Result<Child, ExecError> {
    let capture = Capture::for_options(opts, false);
    let mut cmd = build(line, shell, opts, capture)?;
    announce(line, opts);
    tracing::debug!(command = %line, "spawning command");
    cmd.spawn()
        .map_err(|source| ExecError::Spawn { command: line.to_string(), source })
}

// ── Completion ────────────────────────────────────────────────────────────────

/// A finished process.
///
/// Reading the exit status through [`success`](Self::success),
/// [`code`](Self::code), [`status`](Self::status) or [`check`](Self::check)
/// marks it inspected.
pub struct Completion {
    command: String,
    status: ExitStatus,
    stdout: Option<String>,
    stderr: Option<String>,
    inspected: Cell<bool>,
}

impl Completion {
    /// Whether the process exited successfully.
    pub fn success(&self) -> bool {
        self.inspected.set(true);
        self.status.success()
    }

    /// Exit code; `None` when terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.inspected.set(true);
        self.status.code()
    }

    pub fn status(&self) -> ExitStatus {
        self.inspected.set(true);
        self.status
    }

    /// Captured stdout, if it was captured.
    pub fn stdout(&self) -> Option<&str> {
        self.stdout.as_deref()
    }

    /// Captured stderr, if it was captured.
    pub fn stderr(&self) -> Option<&str> {
        self.stderr.as_deref()
    }

    /// The command as shell text.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Fail with [`ExecError::NonZeroExit`] unless the process succeeded.
    pub fn check(&self) -> Result<(), ExecError> {
        if self.success() {
            return Ok(());
        }
        Err(ExecError::NonZeroExit {
            command: self.command.clone(),
            code: self.status.code(),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        })
    }

    /// Consume and return captured stdout, or an empty string.
    pub fn into_stdout(mut self) -> String {
        self.stdout.take().unwrap_or_default()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("command", &self.command)
            .field("status", &self.status)
            .field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .finish()
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` exited with {}", self.command, self.status)
    }
}

impl Completion {
    fn warns_on_drop(&self) -> bool {
        !self.inspected.get() && !self.status.success()
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.warns_on_drop() {
            eprintln!("overrun: warning: unchecked failed command: {self}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
