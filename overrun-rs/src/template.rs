//! Field recording: the first pass over a command template.
//!
//! A template is literal text with embedded fields:
//!
//! | Form            | Meaning                                              |
//! |-----------------|------------------------------------------------------|
//! | `{expr}`        | Field, rendered with the default (quoting) directive |
//! | `{expr:r}`      | Raw: inserted verbatim in shell mode                 |
//! | `{expr:l}`      | List: a sequence expanded to one token per element   |
//! | `{}` / `{0}`    | Positional value (manual mode only)                  |
//! | `{{` / `}}`     | Literal brace                                        |
//!
//! `raw` and `list` are accepted as long spellings of `r` and `l`.
//!
//! [`record`] resolves every field, in left-to-right order, through a
//! [`FieldSource`] and produces a [`Recording`]: literal segments and field
//! slots, plus the ordered values.  The renderer consumes only the recording,
//! so it never knows whether a value was evaluated or supplied explicitly.

use std::collections::BTreeMap;

use crate::error::TemplateError;
use crate::eval::{eval_str, EvalContext, Value};

// ── Directive ─────────────────────────────────────────────────────────────────

/// Per-field rendering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Directive {
    /// Escape the value for the active mode.
    #[default]
    None,
    /// Insert verbatim (shell mode only; a no-op in vector mode).
    Raw,
    /// Expand a sequence into one token per element.
    List,
}

impl Directive {
    /// Parse the text after the `:` of a field.
    pub fn parse(spec: &str) -> Result<Self, TemplateError> {
        match spec {
            "" => Ok(Directive::None),
            "r" | "raw" => Ok(Directive::Raw),
            "l" | "list" => Ok(Directive::List),
            other => Err(TemplateError::malformed(format!("unknown directive '{other}'"))),
        }
    }
}

// ── Recording ─────────────────────────────────────────────────────────────────

/// One piece of a recorded template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text, with doubled braces already collapsed.
    Literal(String),
    /// Reference to `values[slot]`.
    Field { slot: usize, directive: Directive },
}

/// The intermediate representation shared by both input modes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recording {
    segments: Vec<Segment>,
    values: Vec<Value>,
}

impl Recording {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolved values in evaluation order, indexed by slot.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, slot: usize) -> Option<&Value> {
        self.values.get(slot)
    }

    /// Whether the template contained no fields.
    pub fn is_literal(&self) -> bool {
        self.values.is_empty()
    }

    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_owned()));
        }
    }

    fn push_field(&mut self, value: Value, directive: Directive) {
        let slot = self.values.len();
        self.values.push(value);
        self.segments.push(Segment::Field { slot, directive });
    }
}

// ── Field sources ─────────────────────────────────────────────────────────────

/// Supplies the value of each field, in template order.
pub trait FieldSource {
    /// Resolve the text between the braces (directive already removed).
    fn resolve(&mut self, field: &str) -> Result<Value, TemplateError>;
}

/// Auto mode: evaluate every field as an expression.
pub struct EvalSource<'a> {
    ctx: &'a mut dyn EvalContext,
}

impl<'a> EvalSource<'a> {
    pub fn new(ctx: &'a mut dyn EvalContext) -> Self {
        Self { ctx }
    }
}

impl FieldSource for EvalSource<'_> {
    fn resolve(&mut self, field: &str) -> Result<Value, TemplateError> {
        if field.is_empty() {
            return Err(TemplateError::malformed(
                "empty field '{}' needs explicit values (use manual formatting)",
            ));
        }
        eval_str(field, self.ctx).map_err(|e| TemplateError::from_eval(field, e))
    }
}

/// Explicit values for manual mode: positional values for `{}` / `{N}` and
/// named values for `{name}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.push(value);
        self
    }

    /// Set a named value.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.positional.push(value.into());
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.named.insert(name.into(), value.into());
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// A fresh [`FieldSource`] over these values.
    pub fn source(&self) -> ArgSource<'_> {
        ArgSource { args: self, next_auto: 0, numbering: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Numbering {
    Automatic,
    Explicit,
}

/// Manual mode: look fields up in [`Args`] without evaluating anything.
#[derive(Debug)]
pub struct ArgSource<'a> {
    args: &'a Args,
    next_auto: usize,
    numbering: Option<Numbering>,
}

impl ArgSource<'_> {
    fn set_numbering(&mut self, numbering: Numbering) -> Result<(), TemplateError> {
        match self.numbering {
            Some(current) if current != numbering => Err(TemplateError::malformed(
                "cannot mix automatic '{}' and explicit '{N}' field numbering",
            )),
            _ => {
                self.numbering = Some(numbering);
                Ok(())
            }
        }
    }

    fn positional(&self, idx: usize) -> Result<Value, TemplateError> {
        self.args.positional.get(idx).cloned().ok_or_else(|| {
            TemplateError::malformed(format!(
                "no positional value for field {idx} ({} supplied)",
                self.args.positional.len()
            ))
        })
    }
}

impl FieldSource for ArgSource<'_> {
    fn resolve(&mut self, field: &str) -> Result<Value, TemplateError> {
        if field.is_empty() {
            self.set_numbering(Numbering::Automatic)?;
            let idx = self.next_auto;
            self.next_auto += 1;
            return self.positional(idx);
        }
        if field.chars().all(|c| c.is_ascii_digit()) {
            self.set_numbering(Numbering::Explicit)?;
            let idx = field
                .parse()
                .map_err(|_| TemplateError::malformed(format!("field index {field} is too large")))?;
            return self.positional(idx);
        }
        if is_identifier(field) {
            return self.args.named.get(field).cloned().ok_or_else(|| {
                TemplateError::UnresolvedName { name: field.to_owned(), field: field.to_owned() }
            });
        }
        Err(TemplateError::malformed(format!(
            "field '{{{field}}}' must be empty, an index, or a name when values are explicit"
        )))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ── Recording pass ────────────────────────────────────────────────────────────

/// Walk `template`, resolving every field through `source` in order.
pub fn record(template: &str, source: &mut dyn FieldSource) -> Result<Recording, TemplateError> {
    let mut rec = Recording::default();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        rec.push_literal(&rest[..pos]);
        let brace = rest.as_bytes()[pos];
        let after = &rest[pos + 1..];

        if brace == b'}' {
            if let Some(stripped) = after.strip_prefix('}') {
                rec.push_literal("}");
                rest = stripped;
                continue;
            }
            return Err(TemplateError::malformed("single '}' encountered in template"));
        }

        if let Some(stripped) = after.strip_prefix('{') {
            rec.push_literal("{");
            rest = stripped;
            continue;
        }

        let field = scan_field(after)?;
        let directive = Directive::parse(field.spec)?;
        let body = field.body.trim();
        let value = source.resolve(body)?;
        tracing::trace!(field = body, ?directive, value = %value, "recorded field");
        rec.push_field(value, directive);
        rest = &after[field.len..];
    }
    rec.push_literal(rest);
    Ok(rec)
}

/// Record in auto mode, evaluating each field against `ctx`.
pub fn record_eval(template: &str, ctx: &mut dyn EvalContext) -> Result<Recording, TemplateError> {
    record(template, &mut EvalSource::new(ctx))
}

/// Record in manual mode from explicit values.
pub fn record_args(template: &str, args: &Args) -> Result<Recording, TemplateError> {
    record(template, &mut args.source())
}

struct ScannedField<'a> {
    body: &'a str,
    spec: &'a str,
    /// Bytes consumed, including the closing brace.
    len: usize,
}

/// Scan a field whose opening `{` has been consumed.
///
/// Quotes and bracket nesting inside the expression are respected, so
/// `{"a:b"}` and `{m["}"]}` are single fields.  The directive starts at the
/// first `:` outside quotes and brackets.
fn scan_field(src: &str) -> Result<ScannedField<'_>, TemplateError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut colon: Option<usize> = None;
    let mut chars = src.char_indices();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                c if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '\'' | '"' if colon.is_none() => quote = Some(c),
            '(' | '[' | '{' if colon.is_none() => depth += 1,
            ')' | ']' if colon.is_none() => depth = depth.saturating_sub(1),
            '}' if depth > 0 && colon.is_none() => depth -= 1,
            ':' if depth == 0 && colon.is_none() => colon = Some(i),
            '}' => {
                let (body, spec) = match colon {
                    Some(ci) => (&src[..ci], &src[ci + 1..i]),
                    None => (&src[..i], ""),
                };
                return Ok(ScannedField { body, spec, len: i + 1 });
            }
            '{' => {
                return Err(TemplateError::malformed("unexpected '{' in field directive"));
            }
            _ => {}
        }
    }
    Err(TemplateError::malformed("unclosed '{' in template"))
}

/// Join command parts with single spaces, skipping falsy parts (`None`,
/// `false`, `""`, `0`), so optional arguments can be written inline.
pub fn join_parts<I>(parts: I) -> String
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    parts
        .into_iter()
        .map(Into::<Value>::into)
        .filter(Value::as_bool)
        .map(|v| v.to_text())
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
