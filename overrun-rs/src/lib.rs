//! Build subprocess invocations from templates.
//!
//! A template such as `printf "%s\n" {name}` has its `{...}` fields evaluated
//! against an explicit [`Scope`], then rendered either as an argument vector
//! (each value one argument, never re-split) or as a single POSIX shell line
//! (each value single-quoted).  Fields accept two directives: `{x:raw}` inserts
//! text unquoted in shell mode and `{xs:list}` expands a sequence into
//! separate arguments.
//!
//! ```rust,no_run
//! use overrun::{sh, RunOptions};
//!
//! let items = vec!["1 2", "3 4"];
//! let mut c = sh!(r#"printf "[%s]" {items:list}"#, items)?;
//! assert_eq!(c.to_string(), r#"printf "[%s]" '1 2' '3 4'"#);
//! c.call(&RunOptions::new())?;
//! # Ok::<(), overrun::Error>(())
//! ```
//!
//! Templates are code: only pass literals written at the call site.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod eval;
mod macros;
pub mod process;
pub mod render;
pub mod template;

pub use command::{cmd, format_cmd, shell_cmd, Builder, Cmd};
pub use config::Config;
pub use error::{Error, EvalError, ExecError, Result, TemplateError};
pub use eval::{Scope, Value};
pub use process::{Completion, RunOptions};
pub use render::{CommandLine, Mode};
pub use template::{Args, Directive};
