//! Call-site capture macros.
//!
//! Rust has no runtime view of a caller's locals, so these macros capture the
//! names a template uses explicitly.  A bare name binds a clone of the local
//! of that name; `name = expr` binds the value of `expr`.

/// Build a [`Scope`](crate::eval::Scope) from named locals.
///
/// ```rust
/// use overrun::{scope, Value};
///
/// let host = "example.org";
/// let ports = vec![80, 443];
/// let s = scope!(host, ports, retries = 3);
/// assert_eq!(s.get("host"), Some(&Value::from("example.org")));
/// assert_eq!(s.get("retries"), Some(&Value::Int(3)));
/// ```
#[macro_export]
macro_rules! scope {
    () => {
        $crate::eval::Scope::new()
    };
    ($($name:ident $(= $value:expr)?),+ $(,)?) => {{
        let mut scope = $crate::eval::Scope::new();
        $(
            scope.set_local(::std::stringify!($name), $crate::__capture!($name $(, $value)?));
        )+
        scope
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __capture {
    ($name:ident) => {
        $crate::eval::Value::from(::std::clone::Clone::clone(&$name))
    };
    ($name:ident, $value:expr) => {
        $crate::eval::Value::from($value)
    };
}

/// Vector-mode command from a template and captured names.
///
/// Expands to [`cmd`](crate::cmd()) with a [`scope!`], so it yields
/// `Result<Cmd, TemplateError>`.
///
/// ```rust,no_run
/// use overrun::{cmd, RunOptions};
///
/// let msg = "Testing 123";
/// let mut c = cmd!(r#"printf "%s\n" {msg}"#, msg)?;
/// c.call(&RunOptions::new())?;
/// # Ok::<(), overrun::Error>(())
/// ```
#[macro_export]
macro_rules! cmd {
    ($template:expr $(,)?) => {
        $crate::cmd($template, &mut $crate::eval::Scope::new())
    };
    ($template:expr, $($capture:tt)+) => {
        $crate::cmd($template, &mut $crate::scope!($($capture)+))
    };
}

/// Shell-mode counterpart of [`cmd!`].
#[macro_export]
macro_rules! sh {
    ($template:expr $(,)?) => {
        $crate::shell_cmd($template, &mut $crate::eval::Scope::new())
    };
    ($template:expr, $($capture:tt)+) => {
        $crate::shell_cmd($template, &mut $crate::scope!($($capture)+))
    };
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crate::eval::Value;
    use crate::process::RunOptions;
    use crate::render::CommandLine;

    #[test]
    fn scope_captures_by_name() {
        let name = String::from("world");
        let count = 2;
        let s = scope!(name, count, extra = "x");
        assert_eq!(s.get("name"), Some(&Value::from("world")));
        assert_eq!(s.get("count"), Some(&Value::Int(2)));
        assert_eq!(s.get("extra"), Some(&Value::from("x")));
        // captured by clone; the local is still usable
        assert_eq!(name, "world");
    }

    #[test]
    fn empty_scope() {
        let s = scope!();
        assert!(s.is_empty());
    }

    #[test]
    fn cmd_macro_renders_vector() {
        let items = vec!["1 2", "3 4"];
        let mut c = cmd!("printf [%s] {items:l}", items).unwrap();
        assert_eq!(
            c.line(),
            &CommandLine::Argv(vec!["printf".into(), "[%s]".into(), "1 2".into(), "3 4".into()])
        );
        assert!(c.run(&RunOptions::new().quiet(true)).unwrap().success());
    }

    #[test]
    fn sh_macro_renders_shell() {
        let val = "123 45";
        let mut c = sh!("echo Testing{val:raw}", val).unwrap();
        assert_eq!(c.line().as_shell(), Some("echo Testing123 45"));
        assert!(c.run(&RunOptions::new().quiet(true)).unwrap().success());
    }
}
