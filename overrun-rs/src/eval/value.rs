//! Runtime value type for template fields.
//!
//! Every field in a template resolves to a [`Value`].  Scalars are coerced to
//! text when rendered; sequences are only meaningful under the `list`
//! directive.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.  Renders as empty text.
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                // Whole floats keep one decimal so they still read as floats.
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: ")?;
                    v.fmt_nested(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl Value {
    /// Element formatting inside a container: strings are quoted and `None`
    /// is spelled out so that `[None, ""]` stays readable.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }

    /// Coerce to text.  `None` becomes the empty string.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Truthiness: `None`, `false`, `0`, `0.0`, `""` and empty containers
    /// are falsy.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }

    /// Numeric view of a scalar, if it has one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(n) => Some(*n),
            Value::Float(x) => Some(*x as i64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Whether the value is a sequence or mapping rather than a scalar.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Name of the type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    fn numeric_pair(&self, rhs: &Value, op: &str) -> Result<(f64, f64, bool), String> {
        let is_float = matches!(self, Value::Float(_)) || matches!(rhs, Value::Float(_));
        match (self, rhs) {
            (
                Value::Bool(_) | Value::Int(_) | Value::Float(_),
                Value::Bool(_) | Value::Int(_) | Value::Float(_),
            ) => {}
            _ => {
                return Err(format!(
                    "unsupported operand types for {op}: {} and {}",
                    self.type_name(),
                    rhs.type_name()
                ))
            }
        }
        // Both sides are numeric here, so the conversions cannot fail.
        let a = self.as_float().unwrap_or_default();
        let b = rhs.as_float().unwrap_or_default();
        Ok((a, b, is_float))
    }

    fn make_numeric(f: f64, is_float: bool) -> Value {
        if is_float {
            Value::Float(f)
        } else {
            Value::Int(f as i64)
        }
    }

    /// `+`: numeric addition, string concatenation, or list concatenation.
    pub fn arith_add(&self, rhs: &Value) -> Result<Value, String> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_owned()),
            _ => {
                let (a, b, is_float) = self.numeric_pair(rhs, "+")?;
                Ok(Self::make_numeric(a + b, is_float))
            }
        }
    }

    pub fn arith_sub(&self, rhs: &Value) -> Result<Value, String> {
        if let (Value::Int(a), Value::Int(b)) = (self, rhs) {
            return a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_owned());
        }
        let (a, b, is_float) = self.numeric_pair(rhs, "-")?;
        Ok(Self::make_numeric(a - b, is_float))
    }

    /// `*`: numeric multiplication, or repetition of a string/list.
    pub fn arith_mul(&self, rhs: &Value) -> Result<Value, String> {
        match (self, rhs) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                Ok(Value::Str(s.repeat(repeat_count(s.len(), *n)?)))
            }
            (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                let n = repeat_count(items.len(), *n)?;
                Ok(Value::List(items.iter().cycle().take(items.len() * n).cloned().collect()))
            }
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_owned()),
            _ => {
                let (a, b, is_float) = self.numeric_pair(rhs, "*")?;
                Ok(Self::make_numeric(a * b, is_float))
            }
        }
    }

    pub fn arith_div(&self, rhs: &Value) -> Result<Value, String> {
        if let (Value::Int(a), Value::Int(b)) = (self, rhs) {
            return checked_int(*a, *b, i64::checked_div, "division by zero");
        }
        let (a, b, is_float) = self.numeric_pair(rhs, "/")?;
        if b == 0.0 {
            return Err("division by zero".into());
        }
        Ok(Self::make_numeric(a / b, is_float))
    }

    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, String> {
        if let (Value::Int(a), Value::Int(b)) = (self, rhs) {
            return checked_int(*a, *b, i64::checked_rem, "modulo by zero");
        }
        let (a, b, is_float) = self.numeric_pair(rhs, "%")?;
        if b == 0.0 {
            return Err("modulo by zero".into());
        }
        Ok(Self::make_numeric(a % b, is_float))
    }

    pub fn arith_neg(&self) -> Result<Value, String> {
        match self {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| "integer overflow".to_owned()),
            Value::Float(x) => Ok(Value::Float(-x)),
            Value::Bool(b) => Ok(Value::Int(-i64::from(*b))),
            other => Err(format!("bad operand type for unary -: {}", other.type_name())),
        }
    }

    /// Ordering between two values of comparable types.
    pub fn cmp_value(&self, rhs: &Value) -> Result<std::cmp::Ordering, String> {
        use std::cmp::Ordering;
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.cmp_value(y)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => {
                let (a, b, _) = self.numeric_pair(rhs, "comparison")?;
                Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
            }
        }
    }

    /// Equality across types: numbers compare numerically, everything else
    /// structurally.
    pub fn loose_eq(&self, rhs: &Value) -> bool {
        match (self.as_numeric(), rhs.as_numeric()) {
            (Some(a), Some(b)) => a == b,
            _ => self == rhs,
        }
    }

    fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => self.as_float(),
            _ => None,
        }
    }
}

/// Longest string or list that repetition and `range` may build.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

/// Validate `len * n` for a repetition; negative counts give zero.
fn repeat_count(len: usize, n: i64) -> Result<usize, String> {
    let n = usize::try_from(n.max(0)).map_err(|_| "repetition count too large".to_owned())?;
    match len.checked_mul(n) {
        Some(total) if total <= MAX_SEQUENCE_LEN => Ok(n),
        _ => Err("repetition result too large".to_owned()),
    }
}

/// Integer `/` or `%` without going through `f64`.
fn checked_int(
    a: i64,
    b: i64,
    op: fn(i64, i64) -> Option<i64>,
    by_zero: &str,
) -> Result<Value, String> {
    if b == 0 {
        return Err(by_zero.to_owned());
    }
    op(a, b).map(Value::Int).ok_or_else(|| "integer overflow".to_owned())
}

// ── Conversions ───────────────────────────────────────────────────────────────

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Int(n as i64)
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Str(c.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<&Path> for Value {
    fn from(p: &Path) -> Self {
        Value::Str(p.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::from(p.as_path())
    }
}

impl From<&PathBuf> for Value {
    fn from(p: &PathBuf) -> Self {
        Value::from(p.as_path())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::None)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Value::List(items.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(entries: BTreeMap<String, V>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::List(iter.into_iter().map(Into::into).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_displays_empty() {
        assert_eq!(Value::None.to_string(), "");
        assert_eq!(Value::from(None::<&str>).to_text(), "");
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::from("hi").to_string(), "hi");
    }

    #[test]
    fn display_containers() {
        let v = Value::from(vec![Value::from("a b"), Value::Int(1), Value::None]);
        assert_eq!(v.to_string(), r#"["a b", 1, None]"#);
        let mut m = BTreeMap::new();
        m.insert("k".to_owned(), "v");
        assert_eq!(Value::from(m).to_string(), r#"{"k": "v"}"#);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::None.as_bool());
        assert!(!Value::Int(0).as_bool());
        assert!(!Value::from("").as_bool());
        assert!(!Value::List(vec![]).as_bool());
        assert!(Value::from("0").as_bool());
        assert!(Value::from(vec![1]).as_bool());
    }

    #[test]
    fn arithmetic() {
        let a = Value::Int(10);
        let b = Value::Int(3);
        assert_eq!(a.arith_add(&b), Ok(Value::Int(13)));
        assert_eq!(a.arith_sub(&b), Ok(Value::Int(7)));
        assert_eq!(a.arith_mul(&b), Ok(Value::Int(30)));
        assert_eq!(a.arith_div(&b), Ok(Value::Int(3)));
        assert_eq!(a.arith_rem(&b), Ok(Value::Int(1)));
        assert_eq!(a.arith_add(&Value::Float(0.5)), Ok(Value::Float(10.5)));
        assert_eq!(Value::Float(7.0).arith_div(&b), Ok(Value::Float(7.0 / 3.0)));
    }

    #[test]
    fn integer_division_is_exact_above_f64_precision() {
        let ns = Value::Int(1_700_000_000_123_456_789);
        assert_eq!(ns.arith_div(&Value::Int(1)), Ok(Value::Int(1_700_000_000_123_456_789)));
        assert_eq!(ns.arith_rem(&Value::Int(1000)), Ok(Value::Int(789)));
        assert_eq!(ns.arith_div(&Value::Int(1000)), Ok(Value::Int(1_700_000_000_123_456)));
        assert_eq!(
            Value::Int(9_007_199_254_740_993).arith_div(&Value::Int(1)),
            Ok(Value::Int(9_007_199_254_740_993))
        );
    }

    #[test]
    fn integer_division_edge_cases() {
        assert_eq!(Value::Int(1).arith_div(&Value::Int(0)), Err("division by zero".to_owned()));
        assert_eq!(Value::Int(1).arith_rem(&Value::Int(0)), Err("modulo by zero".to_owned()));
        assert_eq!(Value::Int(i64::MIN).arith_div(&Value::Int(-1)), Err("integer overflow".to_owned()));
        assert_eq!(Value::Int(-7).arith_div(&Value::Int(2)), Ok(Value::Int(-3)));
    }

    #[test]
    fn string_and_list_operators() {
        assert_eq!(Value::from("ab").arith_add(&Value::from("cd")), Ok(Value::from("abcd")));
        assert_eq!(Value::from("ab").arith_mul(&Value::Int(2)), Ok(Value::from("abab")));
        assert_eq!(
            Value::from(vec![1]).arith_add(&Value::from(vec![2])),
            Ok(Value::from(vec![1, 2]))
        );
    }

    #[test]
    fn mixed_types_are_errors() {
        assert!(Value::from("a").arith_add(&Value::Int(1)).is_err());
        assert!(Value::None.arith_neg().is_err());
        assert!(Value::Int(1).arith_div(&Value::Int(0)).is_err());
    }

    #[test]
    fn comparisons() {
        use std::cmp::Ordering;
        assert_eq!(Value::Int(1).cmp_value(&Value::Float(1.5)), Ok(Ordering::Less));
        assert_eq!(Value::from("b").cmp_value(&Value::from("a")), Ok(Ordering::Greater));
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(!Value::from("1").loose_eq(&Value::Int(1)));
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(42u8), Value::Int(42));
        assert_eq!(Value::from(Some("x")), Value::from("x"));
        assert_eq!(Value::from(["a", "b"]), Value::List(vec![Value::from("a"), Value::from("b")]));
        assert_eq!(Value::from(PathBuf::from("/tmp/x")), Value::from("/tmp/x"));
        let v: Value = (1..=3).collect();
        assert_eq!(v, Value::from(vec![1, 2, 3]));
    }
}
