//! Field expression lexer, AST, parser, and evaluator.
//!
//! The expression language is deliberately small but general: literals,
//! list literals, names, attribute access on maps, indexing, function and
//! method calls, arithmetic, comparison and short-circuit logic.  There is no
//! assignment, and no ternary operator (the `:` belongs to the field
//! directive).
//!
//! Operator precedence (lowest → highest):
//!   or  →  and  →  equality/relational  →  additive  →  multiplicative  →
//!   unary  →  postfix (call, `.name`, `[index]`)  →  primary

use crate::error::EvalError;

use super::builtins::{call_builtin, is_builtin};
use super::value::Value;

// ── EvalContext ───────────────────────────────────────────────────────────────

/// Bindings and host functions the evaluator reads from.
///
/// [`Scope`](super::scope::Scope) is the standard implementation; tests and
/// embedders can supply their own to observe or intercept lookups.
pub trait EvalContext {
    /// Look up a binding (local first, then global).
    fn get_var(&self, name: &str) -> Option<Value>;

    /// Invoke a host-provided function.
    ///
    /// Returns `None` when no such function exists, in which case the
    /// evaluator falls back to the builtins.
    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, String>>;
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    // Comparison
    Eq, // ==
    Ne, // !=
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And, // &&
    Or,  // ||

    // Misc
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// Unrecognised input character, reported by the parser.
    Unknown(char),
    Eof,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer {
    src: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Lexer {
            src: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume characters while `pred` holds, appending them to `s`.
    fn take_while(&mut self, s: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek().filter(|&c| pred(c)) {
            s.push(c);
            self.pos += 1;
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_number(&mut self, first: char) -> Result<Token, EvalError> {
        let mut s = String::new();
        s.push(first);

        // Hex literal
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.pos += 1;
            let mut hex = String::new();
            self.take_while(&mut hex, |c| c.is_ascii_hexdigit());
            return i64::from_str_radix(&hex, 16)
                .map(Token::Int)
                .map_err(|e| EvalError::Syntax(format!("bad hex literal 0x{hex}: {e}")));
        }

        let mut is_float = false;
        self.take_while(&mut s, |c| c.is_ascii_digit() || c == '_');
        if self.peek() == Some('.') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            s.push('.');
            self.pos += 1;
            self.take_while(&mut s, |c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            s.push('e');
            self.pos += 1;
            if let Some(sign @ ('+' | '-')) = self.peek() {
                s.push(sign);
                self.pos += 1;
            }
            self.take_while(&mut s, |c| c.is_ascii_digit());
        }

        let s = s.replace('_', "");
        if is_float {
            s.parse()
                .map(Token::Float)
                .map_err(|e| EvalError::Syntax(format!("bad number {s}: {e}")))
        } else {
            s.parse()
                .map(Token::Int)
                .map_err(|e| EvalError::Syntax(format!("bad number {s}: {e}")))
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, EvalError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(EvalError::Syntax("unterminated string literal".into())),
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('0') => s.push('\0'),
                    Some(c) => s.push(c),
                    None => return Err(EvalError::Syntax("unterminated string literal".into())),
                },
                Some(c) if c == quote => break,
                Some(c) => s.push(c),
            }
        }
        Ok(Token::Str(s))
    }

    fn next_token(&mut self) -> Result<Token, EvalError> {
        self.skip_ws();
        let ch = match self.advance() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        Ok(match ch {
            '0'..='9' => return self.read_number(ch),
            '"' | '\'' => return self.read_string(ch),
            c if c.is_alphabetic() || c == '_' => {
                let mut s = String::from(c);
                self.take_while(&mut s, |c| c.is_alphanumeric() || c == '_');
                Token::Ident(s)
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '!' => {
                if self.eat('=') {
                    Token::Ne
                } else {
                    Token::Bang
                }
            }
            '=' if self.eat('=') => Token::Eq,
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' if self.eat('&') => Token::And,
            '|' if self.eat('|') => Token::Or,
            ',' => Token::Comma,
            '.' => Token::Dot,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            c => Token::Unknown(c),
        })
    }

    fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token()?;
            let done = matches!(t, Token::Eof);
            tokens.push(t);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    /// `recv.name(args)`, dispatched as `name(recv, args…)`.
    Method(Box<Expr>, String, Vec<Expr>),
    /// `recv.name` on a map.
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), EvalError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EvalError::Syntax(format!("expected {what}, found {:?}", self.peek())))
        }
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_relational()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Token::Minus => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)))
            }
            Token::Bang => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.advance() {
                    Token::Ident(name) => name,
                    other => {
                        return Err(EvalError::Syntax(format!(
                            "expected attribute name after '.', found {other:?}"
                        )))
                    }
                };
                expr = if self.eat(&Token::LParen) {
                    let args = self.parse_args(&name)?;
                    Expr::Method(Box::new(expr), name, args)
                } else {
                    Expr::Attr(Box::new(expr), name)
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Parse a comma-separated argument list; the `(` is already consumed.
    fn parse_args(&mut self, name: &str) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            args.push(self.parse_expr()?);
            while self.eat(&Token::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        if !self.eat(&Token::RParen) {
            return Err(EvalError::Syntax(format!("expected ')' after args to {name}")));
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let tok = self.advance();
        match tok {
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Ident(name) => match name.as_str() {
                "None" | "null" => Ok(Expr::Literal(Value::None)),
                "true" | "True" => Ok(Expr::Literal(Value::Bool(true))),
                "false" | "False" => Ok(Expr::Literal(Value::Bool(false))),
                _ if self.eat(&Token::LParen) => {
                    let args = self.parse_args(&name)?;
                    Ok(Expr::Call(name, args))
                }
                _ => Ok(Expr::Var(name)),
            },
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                while self.peek() != &Token::RBracket {
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            Token::Eof => Err(EvalError::Syntax("unexpected end of expression".into())),
            other => Err(EvalError::Syntax(format!("unexpected token {other:?}"))),
        }
    }
}

/// Parse an expression string into an AST.
pub fn parse_expr(src: &str) -> Result<Expr, EvalError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(EvalError::Syntax(format!("unexpected trailing {other:?}"))),
    }
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

/// Evaluate an [`Expr`] AST node against the given context.
pub fn eval_expr(expr: &Expr, ctx: &mut dyn EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_expr(item, ctx)?);
            }
            Ok(Value::List(out))
        }

        Expr::Var(name) => match ctx.get_var(name) {
            Some(v) => Ok(v),
            None if is_builtin(name) => Err(EvalError::Type(format!(
                "builtin function '{name}' must be called"
            ))),
            None => Err(EvalError::UnresolvedName(name.clone())),
        },

        Expr::Unary(op, inner) => {
            let v = eval_expr(inner, ctx)?;
            match op {
                UnaryOp::Neg => v.arith_neg().map_err(EvalError::Type),
                UnaryOp::Not => Ok(Value::Bool(!v.as_bool())),
            }
        }

        Expr::Binary(op, lhs, rhs) => {
            // Short-circuit for && and ||; the deciding operand is the result.
            match op {
                BinOp::And => {
                    let l = eval_expr(lhs, ctx)?;
                    if !l.as_bool() {
                        return Ok(l);
                    }
                    return eval_expr(rhs, ctx);
                }
                BinOp::Or => {
                    let l = eval_expr(lhs, ctx)?;
                    if l.as_bool() {
                        return Ok(l);
                    }
                    return eval_expr(rhs, ctx);
                }
                _ => {}
            }
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            eval_binop(op, &l, &r).map_err(EvalError::Type)
        }

        Expr::Call(name, arg_exprs) => {
            let args = eval_args(arg_exprs, ctx)?;
            call(name, args, ctx)
        }

        Expr::Method(recv, name, arg_exprs) => {
            let mut args = Vec::with_capacity(arg_exprs.len() + 1);
            args.push(eval_expr(recv, ctx)?);
            args.extend(eval_args(arg_exprs, ctx)?);
            call(name, args, ctx)
        }

        Expr::Attr(recv, name) => match eval_expr(recv, ctx)? {
            Value::Map(mut entries) => entries
                .remove(name)
                .ok_or_else(|| EvalError::Type(format!("map has no key '{name}'"))),
            other => Err(EvalError::Type(format!(
                "{} has no attribute '{name}'",
                other.type_name()
            ))),
        },

        Expr::Index(recv, index) => {
            let container = eval_expr(recv, ctx)?;
            let index = eval_expr(index, ctx)?;
            eval_index(container, &index)
        }
    }
}

fn eval_args(arg_exprs: &[Expr], ctx: &mut dyn EvalContext) -> Result<Vec<Value>, EvalError> {
    let mut args = Vec::with_capacity(arg_exprs.len());
    for ae in arg_exprs {
        args.push(eval_expr(ae, ctx)?);
    }
    Ok(args)
}

/// Host functions shadow builtins.
fn call(name: &str, args: Vec<Value>, ctx: &mut dyn EvalContext) -> Result<Value, EvalError> {
    let to_err = |message: String| EvalError::Call { name: name.to_owned(), message };
    if let Some(result) = ctx.call_fn(name, args.clone()) {
        return result.map_err(to_err);
    }
    if let Some(result) = call_builtin(name, args) {
        return result.map_err(to_err);
    }
    match ctx.get_var(name) {
        Some(v) => Err(EvalError::Type(format!(
            "'{name}' ({}) is not callable",
            v.type_name()
        ))),
        None => Err(EvalError::UnresolvedName(name.to_owned())),
    }
}

fn eval_index(container: Value, index: &Value) -> Result<Value, EvalError> {
    match (container, index) {
        (Value::List(mut items), Value::Int(i)) => {
            let idx = resolve_index(*i, items.len())?;
            Ok(items.swap_remove(idx))
        }
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve_index(*i, chars.len())?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        (Value::Map(mut entries), Value::Str(key)) => entries
            .remove(key)
            .ok_or_else(|| EvalError::Type(format!("map has no key {key:?}"))),
        (container, index) => Err(EvalError::Type(format!(
            "cannot index {} with {}",
            container.type_name(),
            index.type_name()
        ))),
    }
}

/// Map a possibly negative index onto `0..len`.
fn resolve_index(i: i64, len: usize) -> Result<usize, EvalError> {
    let resolved = if i < 0 { len as i64 + i } else { i };
    if (0..len as i64).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(EvalError::Type(format!("index {i} out of range for length {len}")))
    }
}

fn eval_binop(op: &BinOp, l: &Value, r: &Value) -> Result<Value, String> {
    use std::cmp::Ordering;
    match op {
        BinOp::Add => l.arith_add(r),
        BinOp::Sub => l.arith_sub(r),
        BinOp::Mul => l.arith_mul(r),
        BinOp::Div => l.arith_div(r),
        BinOp::Rem => l.arith_rem(r),

        BinOp::Eq => Ok(Value::Bool(l.loose_eq(r))),
        BinOp::Ne => Ok(Value::Bool(!l.loose_eq(r))),
        BinOp::Lt => Ok(Value::Bool(l.cmp_value(r)? == Ordering::Less)),
        BinOp::Le => Ok(Value::Bool(l.cmp_value(r)? != Ordering::Greater)),
        BinOp::Gt => Ok(Value::Bool(l.cmp_value(r)? == Ordering::Greater)),
        BinOp::Ge => Ok(Value::Bool(l.cmp_value(r)? != Ordering::Less)),

        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

/// Convenience: parse and evaluate an expression string.
pub fn eval_str(src: &str, ctx: &mut dyn EvalContext) -> Result<Value, EvalError> {
    let expr = parse_expr(src)?;
    eval_expr(&expr, ctx)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
