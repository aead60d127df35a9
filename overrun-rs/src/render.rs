//! Quote/render pass: turns a [`Recording`] into the final command line.
//!
//! **Shell mode** emits literal text untouched and quotes every field with
//! POSIX single-quote rules, except `raw` fields which go in verbatim.
//!
//! **Vector mode** splits the template into words the way a POSIX shell
//! would (space, tab and newline, `'…'`, `"…"`, backslash escapes).
//! Field values are opaque during the split: a value lands inside the word it
//! appears in and is never re-split, so no quoting is needed.  A `list` field outside quotes
//! expands into adjacent words.

use std::fmt;

use crate::error::TemplateError;
use crate::eval::Value;
use crate::template::{Directive, Recording, Segment};

/// How the rendered command is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// A single string handed to `sh -c`.
    Shell,
    /// Discrete argument tokens executed directly.
    #[default]
    Vector,
}

/// The rendered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Shell(String),
    Argv(Vec<String>),
}

impl CommandLine {
    pub fn mode(&self) -> Mode {
        match self {
            CommandLine::Shell(_) => Mode::Shell,
            CommandLine::Argv(_) => Mode::Vector,
        }
    }

    pub fn as_shell(&self) -> Option<&str> {
        match self {
            CommandLine::Shell(s) => Some(s),
            CommandLine::Argv(_) => None,
        }
    }

    pub fn as_argv(&self) -> Option<&[String]> {
        match self {
            CommandLine::Shell(_) => None,
            CommandLine::Argv(v) => Some(v),
        }
    }
}

/// Shell text: the line itself, or the argument vector with each token
/// quoted so that it round-trips through a POSIX shell.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Shell(s) => f.write_str(s),
            CommandLine::Argv(argv) => f.write_str(&shell_words::join(argv)),
        }
    }
}

/// Render a recording for the given mode.
pub fn render(rec: &Recording, mode: Mode) -> Result<CommandLine, TemplateError> {
    let line = match mode {
        Mode::Shell => CommandLine::Shell(render_shell(rec)?),
        Mode::Vector => CommandLine::Argv(render_argv(rec)?),
    };
    tracing::debug!(command = %line, ?mode, "rendered command");
    Ok(line)
}

/// A field value after checking it against its directive.
enum Rendered<'a> {
    Text(String),
    Items(&'a [Value]),
}

fn field_value(rec: &Recording, slot: usize, directive: Directive) -> Result<Rendered<'_>, TemplateError> {
    let value = rec
        .value(slot)
        .ok_or_else(|| TemplateError::malformed(format!("no value recorded for slot {slot}")))?;
    match (directive, value) {
        (Directive::List, Value::List(items)) => {
            if let Some(bad) = items.iter().find(|v| v.is_container()) {
                return Err(TemplateError::malformed(format!(
                    "list element of type {} cannot be rendered as an argument",
                    bad.type_name()
                )));
            }
            Ok(Rendered::Items(items))
        }
        (Directive::List, other) => Err(TemplateError::malformed(format!(
            "the list directive needs a sequence, got {}",
            other.type_name()
        ))),
        (_, other) if other.is_container() => Err(TemplateError::malformed(format!(
            "a {} value needs the list directive (`:l`)",
            other.type_name()
        ))),
        (_, other) => Ok(Rendered::Text(other.to_text())),
    }
}

// ── Shell mode ────────────────────────────────────────────────────────────────

/// POSIX single-quote `s`; the empty string becomes `''`.
pub fn quote(s: &str) -> String {
    shell_words::quote(s).into_owned()
}

fn render_shell(rec: &Recording) -> Result<String, TemplateError> {
    let mut out = String::new();
    for seg in rec.segments() {
        match seg {
            Segment::Literal(text) => out.push_str(text),
            Segment::Field { slot, directive } => match field_value(rec, *slot, *directive)? {
                Rendered::Items(items) => {
                    let quoted: Vec<String> = items.iter().map(|v| quote(&v.to_text())).collect();
                    out.push_str(&quoted.join(" "));
                }
                Rendered::Text(text) if *directive == Directive::Raw => out.push_str(&text),
                Rendered::Text(text) => out.push_str(&quote(&text)),
            },
        }
    }
    Ok(out)
}

// ── Vector mode ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Word accumulator for the POSIX split.
struct Words {
    words: Vec<String>,
    current: String,
    /// Set once anything (text, quotes, a field) belongs to the current word,
    /// so that `''` and empty field values still produce an argument.
    started: bool,
}

impl Words {
    fn new() -> Self {
        Words { words: Vec::new(), current: String::new(), started: false }
    }

    fn push(&mut self, c: char) {
        self.current.push(c);
        self.started = true;
    }

    fn push_str(&mut self, s: &str) {
        self.current.push_str(s);
        self.started = true;
    }

    fn finish(&mut self) {
        if self.started {
            self.words.push(std::mem::take(&mut self.current));
            self.started = false;
        }
    }
}

fn render_argv(rec: &Recording) -> Result<Vec<String>, TemplateError> {
    let mut words = Words::new();
    let mut quote = Quote::None;
    // Backslash outside quotes waiting for the character it escapes.
    let mut escape = false;

    for seg in rec.segments() {
        match seg {
            Segment::Literal(text) => {
                let mut chars = text.chars().peekable();
                while let Some(c) = chars.next() {
                    if escape {
                        escape = false;
                        // Backslash-newline is a line continuation.
                        if c != '\n' {
                            words.push(c);
                        }
                        continue;
                    }
                    match quote {
                        Quote::Single => {
                            if c == '\'' {
                                quote = Quote::None;
                            } else {
                                words.push(c);
                            }
                        }
                        Quote::Double => match c {
                            '"' => quote = Quote::None,
                            '\\' => match chars.peek().copied() {
                                Some('\n') => {
                                    chars.next();
                                }
                                Some(next @ ('\\' | '"' | '$' | '`')) => {
                                    chars.next();
                                    words.push(next);
                                }
                                _ => words.push('\\'),
                            },
                            _ => words.push(c),
                        },
                        Quote::None => match c {
                            '\'' => {
                                quote = Quote::Single;
                                words.started = true;
                            }
                            '"' => {
                                quote = Quote::Double;
                                words.started = true;
                            }
                            '\\' => escape = true,
                            ' ' | '\t' | '\n' => words.finish(),
                            _ => words.push(c),
                        },
                    }
                }
            }
            Segment::Field { slot, directive } => {
                // An escape cannot apply to a field; the backslash is dropped.
                escape = false;
                match field_value(rec, *slot, *directive)? {
                    Rendered::Text(text) => words.push_str(&text),
                    Rendered::Items(items) if quote != Quote::None => {
                        let joined: Vec<String> = items.iter().map(Value::to_text).collect();
                        words.push_str(&joined.join(" "));
                    }
                    Rendered::Items(items) => {
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                words.finish();
                            }
                            words.push_str(&item.to_text());
                        }
                    }
                }
            }
        }
    }

    if escape {
        return Err(TemplateError::malformed("trailing backslash in template"));
    }
    if quote != Quote::None {
        return Err(TemplateError::malformed("unterminated quote in template"));
    }
    words.finish();
    Ok(words.words)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
