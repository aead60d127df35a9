//! Error types for template construction and command execution.

use std::io;

use thiserror::Error;

/// Result alias for the crate-level [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure while evaluating a single field expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("name '{0}' is not defined")]
    UnresolvedName(String),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("{0}")]
    Type(String),
    #[error("{name}(): {message}")]
    Call { name: String, message: String },
}

/// Failure while turning a template into a command line.
///
/// All of these surface at construction time, before any process is started.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// A field referenced a name that is neither bound nor a builtin.
    #[error("name '{name}' is not defined (in field `{{{field}}}`)")]
    UnresolvedName { name: String, field: String },
    /// Bad braces, unknown directive, or a value/directive mismatch.
    #[error("malformed template: {0}")]
    Malformed(String),
    /// Any other failure raised while evaluating a field.
    #[error("cannot evaluate field `{{{field}}}`: {source}")]
    Eval {
        field: String,
        #[source]
        source: EvalError,
    },
}

impl TemplateError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        TemplateError::Malformed(msg.into())
    }

    /// Attach the offending field text to an evaluation failure.
    pub(crate) fn from_eval(field: &str, err: EvalError) -> Self {
        match err {
            EvalError::UnresolvedName(name) => TemplateError::UnresolvedName {
                name,
                field: field.to_owned(),
            },
            source => TemplateError::Eval {
                field: field.to_owned(),
                source,
            },
        }
    }
}

/// Failure while executing a rendered command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A checked execution observed an unsuccessful exit status.
    ///
    /// `code` is `None` when the child was terminated by a signal.
    #[error("command `{command}` failed with {}", describe_code(*.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stdout: Option<String>,
        stderr: Option<String>,
    },
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot run an empty argument vector")]
    EmptyCommand,
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "a signal".to_owned(),
    }
}

impl ExecError {
    /// Exit code carried by a [`ExecError::NonZeroExit`].
    pub fn code(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { code, .. } => *code,
            _ => None,
        }
    }
}

/// Any error the pipeline can produce.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
