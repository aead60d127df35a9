//! Field expression evaluation.
//!
//! Every `{...}` field of a template is an expression evaluated against an
//! explicit [`Scope`] captured at the call site.  The language covers:
//!
//! - Literals: integers, floats, strings, `None`, `true`/`false`, `[lists]`
//! - Names, attribute access on maps (`cfg.host`), indexing (`xs[-1]`)
//! - Builtin, host and method calls (`"a".join(xs)`)
//! - Arithmetic, comparison and short-circuit `&&` / `||`
//!
//! # Trust boundary
//!
//! A template is code.  Only pass templates written as literals at the call
//! site: a template assembled from external input can call every function the
//! scope exposes.
//!
//! ```rust
//! use overrun::eval::{eval_str, Scope, Value};
//!
//! let mut scope = Scope::new().with("x", 6);
//! assert_eq!(eval_str("x * 7", &mut scope).unwrap(), Value::Int(42));
//! ```

pub mod builtins;
pub mod expr;
pub mod scope;
pub mod value;

// Re-exports for convenience.
pub use expr::{eval_str, EvalContext};
pub use scope::Scope;
pub use value::Value;
