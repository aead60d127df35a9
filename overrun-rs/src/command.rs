//! Command handles.
//!
//! A [`Builder`] takes a template through the recorder and the renderer and
//! produces a [`Cmd`]: the rendered [`CommandLine`] plus the settings needed
//! to execute it.  Execution is delegated to [`crate::process`].
//!
//! ```rust,no_run
//! use overrun::{cmd, RunOptions, Scope};
//!
//! let file = "notes from today.txt";
//! let mut c = cmd("wc -l {file}", &mut Scope::new().with("file", file))?;
//! let lines = c.read(&RunOptions::new())?;
//! # Ok::<(), overrun::Error>(())
//! ```

use std::fmt;
use std::process::Child;

use crate::config::Config;
use crate::error::{ExecError, TemplateError};
use crate::eval::{EvalContext, Value};
use crate::process::{self, Completion, RunOptions};
use crate::render::{render, CommandLine, Mode};
use crate::template::{join_parts, record_args, record_eval, Args, Recording};

// ── Builder ───────────────────────────────────────────────────────────────────

/// Template plus the settings a [`Cmd`] is created with.
#[derive(Debug, Clone)]
pub struct Builder {
    template: String,
    mode: Mode,
    shell: String,
    verbose: bool,
    warn_uncalled: bool,
    warn_unchecked: bool,
}

impl Builder {
    /// A vector-mode builder using the process-wide [`Config`].
    pub fn new(template: impl Into<String>) -> Self {
        Self::with_config(template, Config::global())
    }

    pub fn with_config(template: impl Into<String>, config: &Config) -> Self {
        Builder {
            template: template.into(),
            mode: Mode::Vector,
            shell: config.shell.clone(),
            verbose: config.verbose,
            warn_uncalled: config.warn_uncalled,
            warn_unchecked: config.warn_unchecked,
        }
    }

    /// Build the template from parts, skipping empty and `None` parts.
    ///
    /// ```rust
    /// use overrun::Builder;
    ///
    /// let verbose = false;
    /// let b = Builder::from_parts([Some("ls"), verbose.then_some("-l"), Some("{dir}")]);
    /// assert_eq!(b.template(), "ls {dir}");
    /// ```
    pub fn from_parts<I>(parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::new(join_parts(parts))
    }

    /// Shell mode when `on`, vector mode otherwise.
    pub fn shell(mut self, on: bool) -> Self {
        self.mode = if on { Mode::Shell } else { Mode::Vector };
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Shell program for shell mode (default `/bin/sh`).
    pub fn shell_program(mut self, program: impl Into<String>) -> Self {
        self.shell = program.into();
        self
    }

    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    /// Warn on stderr if the command is dropped without being run.
    pub fn warn_uncalled(mut self, on: bool) -> Self {
        self.warn_uncalled = on;
        self
    }

    /// Warn on stderr if a failed [`Completion`] is dropped unchecked.
    pub fn warn_unchecked(mut self, on: bool) -> Self {
        self.warn_unchecked = on;
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Evaluate every field against `ctx` and render.
    pub fn eval(self, ctx: &mut dyn EvalContext) -> Result<Cmd, TemplateError> {
        let rec = record_eval(&self.template, ctx)?;
        self.finish(&rec)
    }

    /// Fill fields from explicit values and render.  Nothing is evaluated.
    pub fn format(self, args: &Args) -> Result<Cmd, TemplateError> {
        let rec = record_args(&self.template, args)?;
        self.finish(&rec)
    }

    fn finish(self, rec: &Recording) -> Result<Cmd, TemplateError> {
        let line = render(rec, self.mode)?;
        Ok(Cmd {
            line,
            shell: self.shell,
            verbose: self.verbose,
            warn_unchecked: self.warn_unchecked,
            warn_uncalled: self.warn_uncalled,
            invoked: false,
        })
    }
}

// ── Cmd ───────────────────────────────────────────────────────────────────────

/// A rendered command ready to execute.
///
/// Dropping a `Cmd` that was never run prints a warning unless
/// [`Builder::warn_uncalled`] turned it off.
#[must_use = "a command does nothing until it is run"]
#[derive(Debug)]
pub struct Cmd {
    line: CommandLine,
    shell: String,
    verbose: bool,
    warn_unchecked: bool,
    warn_uncalled: bool,
    invoked: bool,
}

impl Cmd {
    pub fn line(&self) -> &CommandLine {
        &self.line
    }

    pub fn mode(&self) -> Mode {
        self.line.mode()
    }

    pub fn shell_program(&self) -> &str {
        &self.shell
    }

    /// Whether any execution method has been called.
    pub fn invoked(&self) -> bool {
        self.invoked
    }

    fn options(&self, opts: &RunOptions) -> RunOptions {
        let mut opts = opts.clone();
        opts.verbose |= self.verbose;
        opts
    }

    fn execute(&mut self, opts: &RunOptions, stdout: bool, check_default: bool) -> Result<Completion, ExecError> {
        self.invoked = true;
        let opts = self.options(opts);
        let done = process::execute(&self.line, &self.shell, &opts, stdout, self.warn_unchecked)?;
        if opts.check.unwrap_or(check_default) {
            done.check()?;
        }
        Ok(done)
    }

    /// Run and wait.  The exit status is not checked unless
    /// [`RunOptions::check`] asks for it.
    pub fn run(&mut self, opts: &RunOptions) -> Result<Completion, ExecError> {
        self.execute(opts, false, false)
    }

    /// Run and wait, failing with [`ExecError::NonZeroExit`] on an
    /// unsuccessful exit unless `opts.check(false)`.
    pub fn call(&mut self, opts: &RunOptions) -> Result<Completion, ExecError> {
        self.execute(opts, false, true)
    }

    /// Run, wait and return stdout with trailing newlines removed.  Checked
    /// like [`call`](Self::call).
    pub fn read(&mut self, opts: &RunOptions) -> Result<String, ExecError> {
        let done = self.execute(opts, true, true)?;
        let mut out = done.into_stdout();
        out.truncate(out.trim_end_matches('\n').len());
        Ok(out)
    }

    /// Start without waiting.  The caller owns the child.
    pub fn spawn(&mut self, opts: &RunOptions) -> Result<Child, ExecError> {
        self.invoked = true;
        process::spawn(&self.line, &self.shell, &self.options(opts))
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.line, f)
    }
}

impl Cmd {
    fn warns_on_drop(&self) -> bool {
        self.warn_uncalled && !self.invoked
    }
}

impl Drop for Cmd {
    fn drop(&mut self) {
        if self.warns_on_drop() {
            eprintln!("overrun: warning: uncalled command: {}", self.line);
        }
    }
}

// ── Shortcuts ─────────────────────────────────────────────────────────────────

/// Vector-mode command with fields evaluated against `ctx`.
pub fn cmd(template: &str, ctx: &mut dyn EvalContext) -> Result<Cmd, TemplateError> {
    Builder::new(template).eval(ctx)
}

/// Shell-mode command with fields evaluated against `ctx`.
pub fn shell_cmd(template: &str, ctx: &mut dyn EvalContext) -> Result<Cmd, TemplateError> {
    Builder::new(template).shell(true).eval(ctx)
}

/// Vector-mode command with fields filled from `args`.
pub fn format_cmd(template: &str, args: &Args) -> Result<Cmd, TemplateError> {
    Builder::new(template).format(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
