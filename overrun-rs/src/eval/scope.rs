//! Captured bindings that field expressions are evaluated against.
//!
//! A [`Scope`] is an explicit snapshot of the call site: local bindings
//! shadow global bindings, and host functions registered with
//! [`Scope::define_fn`] shadow the builtins.  Use the [`scope!`](crate::scope)
//! macro to capture locals by name.

use std::collections::HashMap;
use std::fmt;

use super::expr::EvalContext;
use super::value::Value;

type HostFn = Box<dyn FnMut(&[Value]) -> Result<Value, String> + Send>;

/// Local and global bindings plus host functions.
#[derive(Default)]
pub struct Scope {
    locals: HashMap<String, Value>,
    globals: HashMap<String, Value>,
    functions: HashMap<String, HostFn>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fns: Vec<&String> = self.functions.keys().collect();
        fns.sort();
        f.debug_struct("Scope")
            .field("locals", &self.locals)
            .field("globals", &self.globals)
            .field("functions", &fns)
            .finish()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a local name.
    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.locals.insert(name.into(), value.into());
    }

    /// Bind a global name; locals of the same name take precedence.
    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(name.into(), value.into());
    }

    /// Builder form of [`Self::set_local`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_local(name, value);
        self
    }

    /// Register a host function callable from expressions.
    pub fn define_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnMut(&[Value]) -> Result<Value, String> + Send + 'static,
    {
        self.functions.insert(name.into(), Box::new(f));
    }

    /// Look up a binding (local first, then global).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }
}

impl EvalContext for Scope {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, String>> {
        self.functions.get_mut(name).map(|f| f(&args))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::expr::eval_str;
    use crate::error::EvalError;

    #[test]
    fn locals_shadow_globals() {
        let mut s = Scope::new();
        s.set_global("x", "global");
        s.set_local("x", "local");
        s.set_global("y", 2);
        assert_eq!(s.get("x"), Some(&Value::from("local")));
        assert_eq!(s.get("y"), Some(&Value::Int(2)));
        assert_eq!(s.get("z"), None);
    }

    #[test]
    fn missing_returns_none() {
        let s = Scope::new();
        assert_eq!(s.get("nope"), None);
    }

    #[test]
    fn host_functions_shadow_builtins() {
        let mut s = Scope::new();
        s.define_fn("upper", |_| Ok(Value::from("shadowed")));
        assert_eq!(eval_str("upper('a')", &mut s), Ok(Value::from("shadowed")));
    }

    #[test]
    fn host_function_errors_propagate() {
        let mut s = Scope::new();
        s.define_fn("boom", |_| Err("exploded".into()));
        assert_eq!(
            eval_str("boom()", &mut s),
            Err(EvalError::Call { name: "boom".into(), message: "exploded".into() })
        );
    }

    #[test]
    fn host_functions_receive_arguments() {
        let mut s = Scope::new().with("n", 4);
        s.define_fn("double", |args| {
            let n = args.first().and_then(Value::as_int).ok_or("need an int")?;
            Ok(Value::Int(n * 2))
        });
        assert_eq!(eval_str("double(n) + 1", &mut s), Ok(Value::Int(9)));
    }
}
