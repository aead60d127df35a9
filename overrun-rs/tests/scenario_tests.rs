/// End-to-end scenarios: templates rendered and executed through real `printf`
/// and `/bin/sh`.
///
/// Most cases run in both modes; the few that only make sense for one mode
/// live in their own section.  Handles are built from a fixed [`Config`] so the
/// user's `overrunrc` and `OVERRUN_*` variables cannot change the outcome.
use overrun::{
    Args, Builder, Cmd, CommandLine, Config, ExecError, RunOptions, Scope, TemplateError, Value,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const MODES: [bool; 2] = [false, true];

fn config() -> Config {
    Config::default()
}

fn build(template: &str, scope: &mut Scope, shell: bool) -> Cmd {
    Builder::with_config(template, &config())
        .shell(shell)
        .eval(scope)
        .unwrap_or_else(|e| panic!("template {template:?} failed: {e}"))
}

fn read(template: &str, scope: &mut Scope, shell: bool) -> String {
    build(template, scope, shell)
        .read(&RunOptions::new())
        .unwrap_or_else(|e| panic!("running {template:?} (shell={shell}) failed: {e}"))
}

// ── Both modes ────────────────────────────────────────────────────────────────

#[test]
fn simple() {
    for shell in MODES {
        assert_eq!(read(r#"printf "%s\n" "Hello world""#, &mut Scope::new(), shell), "Hello world");
    }
}

#[test]
fn value_interpolation() {
    for shell in MODES {
        let mut scope = Scope::new().with("testing", "Testing 123");
        assert_eq!(read(r#"printf "[%s]" {testing}"#, &mut scope, shell), "[Testing 123]");
    }
}

#[test]
fn value_with_newline() {
    for shell in MODES {
        let mut scope = Scope::new().with("testing", "Testing\n123");
        assert_eq!(read(r#"printf "%s\n" {testing}"#, &mut scope, shell), "Testing\n123");
    }
}

#[test]
fn shell_metacharacters_survive() {
    let nasty = ["it's", "a \"b\" c", "$HOME `id` $(id)", "; rm -rf /tmp/x &&", "*?[]", "back\\slash", " lead", ""];
    for shell in MODES {
        for s in nasty {
            let mut scope = Scope::new().with("s", s);
            assert_eq!(read("printf '[%s]' {s}", &mut scope, shell), format!("[{s}]"), "shell={shell}");
        }
    }
}

#[test]
fn method_call() {
    for shell in MODES {
        assert_eq!(
            read(r#"printf "[%s]\n" {"a".join("12345")}"#, &mut Scope::new(), shell),
            "[1a2a3a4a5]"
        );
    }
}

#[test]
fn run_reports_success_and_failure() {
    for shell in MODES {
        let done = build("ls /", &mut Scope::new(), shell)
            .run(&RunOptions::new().quiet(true))
            .unwrap();
        assert!(done.success());

        let done = build("ls /non_existent_directory", &mut Scope::new(), shell)
            .run(&RunOptions::new().quiet(true))
            .unwrap();
        assert!(!done.success());
    }
}

#[test]
fn conditional_parts() {
    let include_hello = false;
    for shell in MODES {
        let mut c = Builder::from_parts([
            Value::from(r#"printf "%s\n""#),
            Value::from(if include_hello { "hello" } else { "" }),
            Value::from("world"),
        ])
        .shell(shell)
        .eval(&mut Scope::new())
        .unwrap();
        assert_eq!(c.read(&RunOptions::new()).unwrap(), "world");
    }
}

#[test]
fn guarded_parts() {
    for shell in MODES {
        let mut c = Builder::from_parts([
            Value::from(r#"printf "%s\n""#),
            Value::from(false),
            Value::from("456"),
            Value::from(true.then_some("789")),
        ])
        .shell(shell)
        .eval(&mut Scope::new())
        .unwrap();
        assert_eq!(c.read(&RunOptions::new()).unwrap(), "456\n789");
    }
}

#[test]
fn none_interpolation() {
    for shell in MODES {
        assert_eq!(read(r#"printf "[%s]\n" {None}"#, &mut Scope::new(), shell), "[]");
    }
}

#[test]
fn non_string_interpolation() {
    for shell in MODES {
        assert_eq!(read(r#"printf "[%s]\n" {12345}"#, &mut Scope::new(), shell), "[12345]");
        assert_eq!(read(r#"printf "[%s]\n" {1.5 * 2}"#, &mut Scope::new(), shell), "[3.0]");
    }
}

#[test]
fn manual_format() {
    for shell in MODES {
        let args = Args::new().arg("Hello there").named("name", "Chan Tai Man");
        let mut c = Builder::with_config(r#"printf "1:%s 2:%s\n" {} {name}"#, &config())
            .shell(shell)
            .format(&args)
            .unwrap();
        assert_eq!(c.read(&RunOptions::new()).unwrap(), "1:Hello there 2:Chan Tai Man");
    }
}

#[test]
fn format_string_values_are_verbatim() {
    for shell in MODES {
        let mut scope = Scope::new().with("test", "{1}");
        assert_eq!(read(r#"printf "[%s]\n" {test}"#, &mut scope, shell), "[{1}]");
    }
}

#[test]
fn undefined_name_fails_before_spawning() {
    for shell in MODES {
        let err = Builder::with_config(r#"printf "[%s]\n" {undefined_variable}"#, &config())
            .shell(shell)
            .eval(&mut Scope::new())
            .unwrap_err();
        assert!(
            matches!(&err, TemplateError::UnresolvedName { name, .. } if name == "undefined_variable"),
            "{err:?}"
        );
    }
}

#[test]
fn map_attribute() {
    for shell in MODES {
        let cfg: std::collections::BTreeMap<String, Value> = [("host".to_owned(), Value::from("example.org"))].into();
        let mut scope = Scope::new().with("cfg", cfg);
        assert_eq!(read(r#"printf "[%s]" {cfg.host}"#, &mut scope, shell), "[example.org]");
    }
}

#[test]
fn list_interpolation() {
    for shell in MODES {
        let mut scope = Scope::new().with("test", vec!["1 2", "3 4", "5 6"]);
        assert_eq!(read(r#"printf "[%s]" {test:l}"#, &mut scope, shell), "[1 2][3 4][5 6]");
    }
}

#[test]
fn list_interpolation_manual() {
    for shell in MODES {
        let args = Args::new().named("test", vec!["1", "2", "3", "4", "5"]);
        let mut c = Builder::with_config(r#"printf "[%s]" {test:l}"#, &config())
            .shell(shell)
            .format(&args)
            .unwrap();
        assert_eq!(c.read(&RunOptions::new()).unwrap(), "[1][2][3][4][5]");
    }
}

#[test]
fn list_directive_rejects_none() {
    for shell in MODES {
        let err = Builder::with_config("printf {None:l}", &config())
            .shell(shell)
            .eval(&mut Scope::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Malformed(_)));
    }
}

#[test]
fn escaped_curly_braces() {
    for shell in MODES {
        assert_eq!(read(r#"printf "[%s]" "{{curly}}""#, &mut Scope::new(), shell), "[{curly}]");
    }
}

#[test]
fn evaluation_order_is_left_to_right() {
    use std::sync::{Arc, Mutex};

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scope = Scope::new();
    let seen = Arc::clone(&log);
    scope.define_fn("tag", move |args| {
        let name = args.first().map(Value::to_text).unwrap_or_default();
        seen.lock().unwrap().push(name.clone());
        Ok(Value::from(name))
    });
    let out = read("printf %s%s%s {tag('a')} {tag('b')} {tag('a')}", &mut scope, false);
    assert_eq!(out, "aba");
    assert_eq!(*log.lock().unwrap(), ["a", "b", "a"]);
}

// ── Vector mode only ──────────────────────────────────────────────────────────

#[test]
fn vector_argv_is_exact() {
    let mut scope = Scope::new().with("x", "Testing 123");
    let mut c = build(r#"printf "%s\n" {x}"#, &mut scope, false);
    assert_eq!(
        c.line(),
        &CommandLine::Argv(vec!["printf".into(), r"%s\n".into(), "Testing 123".into()])
    );
    assert_eq!(c.read(&RunOptions::new()).unwrap(), "Testing 123");
}

#[test]
fn vector_raw_is_one_argument() {
    let mut scope = Scope::new().with("val", "123 45");
    assert_eq!(read(r#"printf "[%s]\n" Testing{val:r}"#, &mut scope, false), "[Testing123 45]");
}

#[test]
fn missing_program_is_spawn_error() {
    let mut c = build("/nonexistent/overrun-program", &mut Scope::new(), false);
    assert!(matches!(c.run(&RunOptions::new()), Err(ExecError::Spawn { .. })));
}

// ── Shell mode only ───────────────────────────────────────────────────────────

#[test]
fn shell_list_rendering() {
    let mut scope = Scope::new().with("items", vec!["1 2", "3 4"]);
    let mut c = build(r#"printf "[%s]" {items:list}"#, &mut scope, true);
    assert_eq!(c.to_string(), r#"printf "[%s]" '1 2' '3 4'"#);
    assert_eq!(c.read(&RunOptions::new()).unwrap(), "[1 2][3 4]");
}

#[test]
fn raw_format() {
    assert_eq!(
        read(r#"printf "[%s]\n" Testing{"123 45":r}"#, &mut Scope::new(), true),
        "[Testing123]\n[45]"
    );
    let mut scope = Scope::new().with("val", "123 45");
    assert_eq!(build("Testing{val:raw}", &mut scope, true).line().as_shell(), Some("Testing123 45"));
}

#[test]
fn pipeline() {
    assert_eq!(read("yes | head -n2", &mut Scope::new(), true), "y\ny");
}

#[test]
fn exit_code() {
    let done = build("exit 123", &mut Scope::new(), true).run(&RunOptions::new()).unwrap();
    assert!(!done.success());
    assert_eq!(done.code(), Some(123));
}

#[test]
fn call_fails_with_exit_code() {
    let err = build("exit 9", &mut Scope::new(), true).call(&RunOptions::new()).unwrap_err();
    assert!(matches!(err, ExecError::NonZeroExit { code: Some(9), .. }));
}

#[test]
fn run_options_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = build("pwd; printf %s \"$OVERRUN_TEST_VAR\"", &mut Scope::new(), true);
    let out = c
        .read(&RunOptions::new().current_dir(dir.path()).env("OVERRUN_TEST_VAR", "set"))
        .unwrap();
    let canonical = dir.path().canonicalize().unwrap();
    let mut lines = out.lines();
    assert_eq!(std::path::Path::new(lines.next().unwrap()).canonicalize().unwrap(), canonical);
    assert_eq!(lines.next(), Some("set"));
}
