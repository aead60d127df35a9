//! Built-in functions available to every field expression.
//!
//! Each function receives a `Vec<Value>` of already-evaluated arguments and
//! returns `Result<Value, String>`.  Method-call syntax (`"a".join(xs)`) is
//! dispatched here with the receiver as the first argument.

use std::path::Path;

use regex::Regex;

use super::value::{Value, MAX_SEQUENCE_LEN};

/// Names recognised by [`call_builtin`].
pub const BUILTINS: &[&str] = &[
    "basename", "dirname", "env", "float", "int", "join", "len", "lower", "matches", "range",
    "replace", "split", "str", "strip", "sub", "upper",
];

/// Whether `name` is a built-in function.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Dispatch a built-in function call.
///
/// Returns `None` if the function name is not a built-in.
pub fn call_builtin(name: &str, args: Vec<Value>) -> Option<Result<Value, String>> {
    // Ok(None) → not a builtin; Err(e) → the builtin failed.
    fn inner(name: &str, args: Vec<Value>) -> Result<Option<Value>, String> {
        Ok(Some(match name {
            // ── Conversions ──────────────────────────────────────────────────
            "str" => Value::Str(arg(&args, 0, name)?.to_text()),
            "int" => {
                let v = arg(&args, 0, name)?;
                Value::Int(
                    v.as_int()
                        .ok_or_else(|| format!("cannot convert {} {v:?} to int", v.type_name()))?,
                )
            }
            "float" => {
                let v = arg(&args, 0, name)?;
                Value::Float(
                    v.as_float()
                        .ok_or_else(|| format!("cannot convert {} {v:?} to float", v.type_name()))?,
                )
            }
            "len" => {
                let n = match arg(&args, 0, name)? {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.len(),
                    Value::Map(entries) => entries.len(),
                    other => return Err(format!("{} has no length", other.type_name())),
                };
                Value::Int(n as i64)
            }

            // ── String functions ─────────────────────────────────────────────
            "upper" => Value::Str(get_str(&args, 0, name)?.to_uppercase()),
            "lower" => Value::Str(get_str(&args, 0, name)?.to_lowercase()),
            "strip" => Value::Str(get_str(&args, 0, name)?.trim().to_owned()),
            "replace" => {
                let haystack = get_str(&args, 0, name)?;
                let needle = get_str(&args, 1, name)?;
                let repl = get_str(&args, 2, name)?;
                Value::Str(haystack.replace(&needle, &repl))
            }
            "join" => {
                // join(sep, seq): a string sequence joins its characters.
                let sep = get_str(&args, 0, name)?;
                let parts: Vec<String> = match arg(&args, 1, name)? {
                    Value::List(items) => items.iter().map(Value::to_text).collect(),
                    Value::Str(s) => s.chars().map(String::from).collect(),
                    other => return Err(format!("cannot join {}", other.type_name())),
                };
                Value::Str(parts.join(&sep))
            }
            "split" => {
                // split(s[, sep]): no separator splits on runs of whitespace.
                let s = get_str(&args, 0, name)?;
                match args.get(1) {
                    Some(sep) if !sep.is_none() => {
                        let sep = sep.to_text();
                        if sep.is_empty() {
                            return Err("empty separator".into());
                        }
                        s.split(sep.as_str()).collect()
                    }
                    _ => s.split_whitespace().collect(),
                }
            }

            // ── Regular expressions ──────────────────────────────────────────
            "matches" => {
                let text = get_str(&args, 0, name)?;
                let re = get_regex(&args, 1, name)?;
                Value::Bool(re.is_match(&text))
            }
            "sub" => {
                let text = get_str(&args, 0, name)?;
                let re = get_regex(&args, 1, name)?;
                let repl = get_str(&args, 2, name)?;
                Value::Str(re.replace_all(&text, repl.as_str()).into_owned())
            }

            // ── Sequences ────────────────────────────────────────────────────
            "range" => {
                let (start, stop) = match (get_int(&args, 0, name)?, args.get(1)) {
                    (stop, None) => (0, stop),
                    (start, Some(_)) => (start, get_int(&args, 1, name)?),
                };
                let len = usize::try_from(stop.saturating_sub(start)).unwrap_or(0);
                if len > MAX_SEQUENCE_LEN {
                    return Err(format!("range of {len} items is too large"));
                }
                (start..stop).collect()
            }

            // ── Environment and paths ────────────────────────────────────────
            "env" => {
                let var = get_str(&args, 0, name)?;
                match std::env::var(&var) {
                    Ok(v) => Value::Str(v),
                    Err(_) => args.get(1).cloned().unwrap_or_default(),
                }
            }
            "basename" => {
                let p = get_str(&args, 0, name)?;
                Path::new(&p)
                    .file_name()
                    .map(|s| Value::Str(s.to_string_lossy().into_owned()))
                    .unwrap_or_else(|| Value::Str(String::new()))
            }
            "dirname" => {
                let p = get_str(&args, 0, name)?;
                Path::new(&p)
                    .parent()
                    .map(|s| Value::Str(s.to_string_lossy().into_owned()))
                    .unwrap_or_else(|| Value::Str(String::new()))
            }

            _ => return Ok(None),
        }))
    }
    inner(name, args).transpose()
}

// ── Argument accessors ────────────────────────────────────────────────────────

fn arg<'a>(args: &'a [Value], idx: usize, name: &str) -> Result<&'a Value, String> {
    args.get(idx)
        .ok_or_else(|| format!("{name}: argument {idx} missing"))
}

fn get_str(args: &[Value], idx: usize, name: &str) -> Result<String, String> {
    match arg(args, idx, name)? {
        v if v.is_container() => Err(format!(
            "{name}: argument {idx} must be a string, not {}",
            v.type_name()
        )),
        v => Ok(v.to_text()),
    }
}

fn get_int(args: &[Value], idx: usize, name: &str) -> Result<i64, String> {
    let v = arg(args, idx, name)?;
    v.as_int()
        .ok_or_else(|| format!("{name}: argument {idx} must be an integer"))
}

fn get_regex(args: &[Value], idx: usize, name: &str) -> Result<Regex, String> {
    let pattern = get_str(args, idx, name)?;
    Regex::new(&pattern).map_err(|e| format!("{name}: {e}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
