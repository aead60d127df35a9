use proptest::prelude::*;

use overrun::eval::{eval_str, Scope, Value};
use overrun::render::{render, CommandLine, Mode};
use overrun::template::{record_args, record_eval, Args};

fn render_eval(template: &str, scope: &mut Scope, mode: Mode) -> CommandLine {
    let rec = record_eval(template, scope).unwrap_or_else(|e| panic!("record {template:?}: {e}"));
    render(&rec, mode).unwrap_or_else(|e| panic!("render {template:?}: {e}"))
}

fn double_braces(s: &str) -> String {
    s.replace('{', "{{").replace('}', "}}")
}

proptest! {
    /// A template without fields renders as its text with braces un-doubled.
    #[test]
    fn field_free_template_renders_unchanged(s in "\\PC*") {
        let line = render_eval(&double_braces(&s), &mut Scope::new(), Mode::Shell);
        prop_assert_eq!(line, CommandLine::Shell(s));
    }

    /// Shell-quoted values come back byte-for-byte from POSIX word splitting.
    #[test]
    fn shell_quoting_round_trips(s in "\\PC*") {
        let mut scope = Scope::new().with("s", s.as_str());
        let line = render_eval("printf %s {s}", &mut scope, Mode::Shell);
        let text = line.as_shell().unwrap();
        prop_assert_eq!(shell_words::split(text).unwrap(), vec!["printf".to_owned(), "%s".to_owned(), s]);
    }

    /// In vector mode a scalar is exactly one argument, never re-split.
    #[test]
    fn vector_value_is_one_token(s in "\\PC*") {
        let mut scope = Scope::new().with("s", s.as_str());
        let line = render_eval("echo {s}", &mut scope, Mode::Vector);
        prop_assert_eq!(line, CommandLine::Argv(vec!["echo".to_owned(), s]));
    }

    /// A list field in vector mode yields one token per element.
    #[test]
    fn list_expands_to_len_tokens(items in prop::collection::vec("\\PC*", 0..8)) {
        let args = Args::new().named("xs", items.clone());
        let rec = record_args("cmd {xs:l}", &args).unwrap();
        let argv = match render(&rec, Mode::Vector).unwrap() {
            CommandLine::Argv(v) => v,
            other => panic!("expected argv, got {other:?}"),
        };
        prop_assert_eq!(argv.len(), items.len() + 1);
        prop_assert_eq!(&argv[1..], &items[..]);
    }

    /// The rendered argv displays as shell text that splits back into itself.
    #[test]
    fn argv_display_round_trips(items in prop::collection::vec("\\PC*", 1..6)) {
        let line = CommandLine::Argv(items.clone());
        prop_assert_eq!(shell_words::split(&line.to_string()).unwrap(), items);
    }

    /// Integer arithmetic agrees with Rust.
    #[test]
    fn arithmetic_matches_rust(a in -1000i64..1000, b in -1000i64..1000, c in 1i64..1000) {
        let mut scope = Scope::new().with("a", a).with("b", b).with("c", c);
        prop_assert_eq!(eval_str("a + b * c", &mut scope).unwrap(), Value::Int(a + b * c));
        prop_assert_eq!(eval_str("(a - b) / c", &mut scope).unwrap(), Value::Int((a - b) / c));
    }

    /// The evaluator never panics on arbitrary input.
    #[test]
    fn eval_never_panics(s in "\\PC{0,40}") {
        let _ = eval_str(&s, &mut Scope::new());
    }

    /// Neither does the recorder on arbitrary templates.
    #[test]
    fn record_never_panics(s in "\\PC{0,40}") {
        let _ = record_args(&s, &Args::new().arg(1).arg(2));
    }
}

#[test]
fn none_renders_empty_in_every_mode() {
    for mode in [Mode::Shell, Mode::Vector] {
        for template in ["x{None}", "x{None:r}"] {
            let line = render_eval(template, &mut Scope::new(), mode);
            let text = match &line {
                CommandLine::Shell(s) if template.ends_with(":r}") => s.clone(),
                CommandLine::Shell(s) => s.replace("''", ""),
                CommandLine::Argv(v) => v.join(" "),
            };
            assert_eq!(text, "x", "{template} in {mode:?}");
        }
    }
}
