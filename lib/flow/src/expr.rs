//! Sandboxed condition-expression evaluator.
//!
//! Condition nodes carry caller-authored text. The legacy backend handed
//! that text to a general-purpose evaluator with access to live process
//! state; this module replaces it with a closed grammar that can only look
//! up context values and combine them:
//!
//! - variable lookup: `ctx.key`, with dotted paths into nested maps
//! - literals: strings (single or double quoted), numbers, `true`,
//!   `false`, `null` (Python-style `True`/`False`/`None` are accepted for
//!   flows written against the legacy backend)
//! - comparisons: `==`, `!=`, `<`, `<=`, `>`, `>=`
//! - boolean combinators: `and`, `or`, `not` (short-circuit)
//! - membership: `in` (element in array, substring in string, key in map)
//!
//! Missing variables evaluate to null. `null == null` is true and any
//! other equality against null is false; ordered comparisons involving
//! null are false without raising. Ordered comparison of incompatible
//! non-null types is a [`EvalError::TypeMismatch`]. The final value is
//! coerced to bool by truthiness, so `ctx.name` alone is a valid
//! condition.

use crate::error::EvalError;
use serde_json::{Map, Value as JsonValue};
use std::iter::Peekable;
use std::str::CharIndices;

/// Evaluates a condition expression against the execution context.
///
/// # Errors
///
/// Returns an [`EvalError`] if the expression fails to parse, references
/// an identifier outside the `ctx` namespace, or applies an operator to
/// operand types it does not support. Callers in the engine treat any
/// error as a false condition and record the reason in the trace.
pub fn evaluate(expression: &str, context: &Map<String, JsonValue>) -> Result<bool, EvalError> {
    let tokens = lex(expression)?;
    let mut parser = Parser::new(tokens, expression.len());
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    let value = eval(&expr, context)?;
    Ok(truthy(&value))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    In,
    True,
    False,
    Null,
    Dot,
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    pos: usize,
}

fn lex(src: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Spanned { token: Token::LParen, pos });
            }
            ')' => {
                chars.next();
                tokens.push(Spanned { token: Token::RParen, pos });
            }
            '.' => {
                chars.next();
                tokens.push(Spanned { token: Token::Dot, pos });
            }
            '=' => {
                chars.next();
                expect_char(&mut chars, '=', pos, "expected '=='")?;
                tokens.push(Spanned { token: Token::Eq, pos });
            }
            '!' => {
                chars.next();
                expect_char(&mut chars, '=', pos, "expected '!='")?;
                tokens.push(Spanned { token: Token::Ne, pos });
            }
            '<' => {
                chars.next();
                let token = if consume_if(&mut chars, '=') { Token::Le } else { Token::Lt };
                tokens.push(Spanned { token, pos });
            }
            '>' => {
                chars.next();
                let token = if consume_if(&mut chars, '=') { Token::Ge } else { Token::Gt };
                tokens.push(Spanned { token, pos });
            }
            quote @ ('\'' | '"') => {
                chars.next();
                tokens.push(lex_string(&mut chars, quote, pos, src.len())?);
            }
            '-' => {
                tokens.push(lex_number(&mut chars, pos)?);
            }
            c if c.is_ascii_digit() => {
                tokens.push(lex_number(&mut chars, pos)?);
            }
            c if c.is_alphabetic() || c == '_' => {
                tokens.push(lex_word(&mut chars, pos));
            }
            other => {
                return Err(EvalError::Syntax {
                    position: pos,
                    message: format!("unexpected character '{other}'"),
                });
            }
        }
    }

    Ok(tokens)
}

fn consume_if(chars: &mut Peekable<CharIndices<'_>>, expected: char) -> bool {
    if chars.peek().is_some_and(|&(_, c)| c == expected) {
        chars.next();
        true
    } else {
        false
    }
}

fn expect_char(
    chars: &mut Peekable<CharIndices<'_>>,
    expected: char,
    pos: usize,
    message: &str,
) -> Result<(), EvalError> {
    if consume_if(chars, expected) {
        Ok(())
    } else {
        Err(EvalError::Syntax {
            position: pos,
            message: message.to_string(),
        })
    }
}

fn lex_string(
    chars: &mut Peekable<CharIndices<'_>>,
    quote: char,
    pos: usize,
    end: usize,
) -> Result<Spanned, EvalError> {
    let mut value = String::new();

    loop {
        match chars.next() {
            Some((_, c)) if c == quote => {
                return Ok(Spanned { token: Token::Str(value), pos });
            }
            Some((escape_pos, '\\')) => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, c)) if c == quote || c == '\\' => value.push(c),
                Some((_, other)) => {
                    return Err(EvalError::Syntax {
                        position: escape_pos,
                        message: format!("unsupported escape '\\{other}'"),
                    });
                }
                None => {
                    return Err(EvalError::Syntax {
                        position: end,
                        message: "unterminated string literal".to_string(),
                    });
                }
            },
            Some((_, c)) => value.push(c),
            None => {
                return Err(EvalError::Syntax {
                    position: end,
                    message: "unterminated string literal".to_string(),
                });
            }
        }
    }
}

fn lex_number(chars: &mut Peekable<CharIndices<'_>>, pos: usize) -> Result<Spanned, EvalError> {
    let mut text = String::new();
    if chars.peek().is_some_and(|&(_, c)| c == '-') {
        chars.next();
        text.push('-');
    }
    while let Some(&(_, c)) = chars.peek() {
        if !c.is_ascii_digit() && c != '.' {
            break;
        }
        chars.next();
        text.push(c);
    }

    text.parse::<f64>()
        .map(|n| Spanned { token: Token::Number(n), pos })
        .map_err(|_| EvalError::Syntax {
            position: pos,
            message: format!("invalid number literal '{text}'"),
        })
}

fn lex_word(chars: &mut Peekable<CharIndices<'_>>, pos: usize) -> Spanned {
    let mut word = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !c.is_alphanumeric() && c != '_' {
            break;
        }
        chars.next();
        word.push(c);
    }

    let token = match word.as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        "true" | "True" => Token::True,
        "false" | "False" => Token::False,
        "null" | "None" => Token::Null,
        _ => Token::Ident(word),
    };
    Spanned { token, pos }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(JsonValue),
    /// Dotted path below `ctx`; empty means the whole context.
    Path(Vec<String>),
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    And,
    Or,
}

impl BinaryOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Recursive-descent parser with Python's operator precedence:
/// `or` < `and` < `not` < comparisons < primaries.
struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    end: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>, end: usize) -> Self {
        Self { tokens, cursor: 0, end }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.cursor).cloned();
        if spanned.is_some() {
            self.cursor += 1;
        }
        spanned
    }

    fn position(&self) -> usize {
        self.tokens.get(self.cursor).map_or(self.end, |s| s.pos)
    }

    fn syntax_error(&self, message: impl Into<String>) -> EvalError {
        EvalError::Syntax {
            position: self.position(),
            message: message.into(),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, EvalError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let rhs = self.parse_not()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let lhs = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            Some(Token::In) => BinaryOp::In,
            _ => return Ok(lhs),
        };
        self.next();
        let rhs = self.parse_primary()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let Some(spanned) = self.next() else {
            return Err(EvalError::Syntax {
                position: self.end,
                message: "expected expression".to_string(),
            });
        };

        match spanned.token {
            Token::True => Ok(Expr::Literal(JsonValue::Bool(true))),
            Token::False => Ok(Expr::Literal(JsonValue::Bool(false))),
            Token::Null => Ok(Expr::Literal(JsonValue::Null)),
            Token::Number(n) => Ok(Expr::Literal(JsonValue::from(n))),
            Token::Str(s) => Ok(Expr::Literal(JsonValue::String(s))),
            Token::Ident(name) if name == "ctx" => self.parse_path(),
            Token::Ident(name) => Err(EvalError::UnknownIdentifier { name }),
            Token::LParen => {
                let inner = self.parse_expression()?;
                match self.next().map(|s| s.token) {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.syntax_error("expected ')'")),
                }
            }
            _ => Err(EvalError::Syntax {
                position: spanned.pos,
                message: "expected expression".to_string(),
            }),
        }
    }

    fn parse_path(&mut self) -> Result<Expr, EvalError> {
        let mut segments = Vec::new();
        while self.peek() == Some(&Token::Dot) {
            self.next();
            match self.next().map(|s| s.token) {
                Some(Token::Ident(segment)) => segments.push(segment),
                _ => return Err(self.syntax_error("expected key after '.'")),
            }
        }
        Ok(Expr::Path(segments))
    }

    fn expect_end(&mut self) -> Result<(), EvalError> {
        if self.cursor == self.tokens.len() {
            Ok(())
        } else {
            Err(self.syntax_error("unexpected trailing input"))
        }
    }
}

fn eval(expr: &Expr, ctx: &Map<String, JsonValue>) -> Result<JsonValue, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(segments) => Ok(lookup(ctx, segments)),
        Expr::Not(inner) => {
            let value = eval(inner, ctx)?;
            Ok(JsonValue::Bool(!truthy(&value)))
        }
        Expr::Binary { op, lhs, rhs } => match op {
            BinaryOp::And => {
                let left = eval(lhs, ctx)?;
                if !truthy(&left) {
                    return Ok(JsonValue::Bool(false));
                }
                let right = eval(rhs, ctx)?;
                Ok(JsonValue::Bool(truthy(&right)))
            }
            BinaryOp::Or => {
                let left = eval(lhs, ctx)?;
                if truthy(&left) {
                    return Ok(JsonValue::Bool(true));
                }
                let right = eval(rhs, ctx)?;
                Ok(JsonValue::Bool(truthy(&right)))
            }
            BinaryOp::Eq => {
                let (left, right) = (eval(lhs, ctx)?, eval(rhs, ctx)?);
                Ok(JsonValue::Bool(values_equal(&left, &right)))
            }
            BinaryOp::Ne => {
                let (left, right) = (eval(lhs, ctx)?, eval(rhs, ctx)?);
                Ok(JsonValue::Bool(!values_equal(&left, &right)))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (left, right) = (eval(lhs, ctx)?, eval(rhs, ctx)?);
                compare_order(*op, &left, &right).map(JsonValue::Bool)
            }
            BinaryOp::In => {
                let (left, right) = (eval(lhs, ctx)?, eval(rhs, ctx)?);
                membership(&left, &right).map(JsonValue::Bool)
            }
        },
    }
}

fn lookup(ctx: &Map<String, JsonValue>, path: &[String]) -> JsonValue {
    let Some((first, rest)) = path.split_first() else {
        return JsonValue::Object(ctx.clone());
    };
    let Some(mut current) = ctx.get(first) else {
        return JsonValue::Null;
    };
    for segment in rest {
        match current.get(segment) {
            Some(value) => current = value,
            None => return JsonValue::Null,
        }
    }
    current.clone()
}

/// Equality with numeric coercion: `1 == 1.0` regardless of the JSON
/// number representation. Mismatched types compare unequal, never raise.
fn values_equal(lhs: &JsonValue, rhs: &JsonValue) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(l), Some(r)) if lhs.is_number() && rhs.is_number() => l == r,
        _ => lhs == rhs,
    }
}

fn compare_order(op: BinaryOp, lhs: &JsonValue, rhs: &JsonValue) -> Result<bool, EvalError> {
    use std::cmp::Ordering;

    // Ordered comparison against null is defined as false, not an error.
    if lhs.is_null() || rhs.is_null() {
        return Ok(false);
    }

    let ordering = match (lhs, rhs) {
        (JsonValue::Number(l), JsonValue::Number(r)) => {
            let (l, r) = (
                l.as_f64().unwrap_or(f64::NAN),
                r.as_f64().unwrap_or(f64::NAN),
            );
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(l), JsonValue::String(r)) => l.cmp(r),
        _ => {
            return Err(EvalError::TypeMismatch {
                op: op.symbol(),
                lhs: type_name(lhs),
                rhs: type_name(rhs),
            });
        }
    };

    Ok(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => unreachable!("caller passes ordering operators only"),
    })
}

fn membership(needle: &JsonValue, haystack: &JsonValue) -> Result<bool, EvalError> {
    match haystack {
        JsonValue::Array(items) => Ok(items.iter().any(|item| values_equal(needle, item))),
        JsonValue::String(text) => match needle {
            JsonValue::String(sub) => Ok(text.contains(sub.as_str())),
            _ => Err(EvalError::TypeMismatch {
                op: "in",
                lhs: type_name(needle),
                rhs: "string",
            }),
        },
        JsonValue::Object(map) => match needle {
            JsonValue::String(key) => Ok(map.contains_key(key)),
            _ => Err(EvalError::TypeMismatch {
                op: "in",
                lhs: type_name(needle),
                rhs: "object",
            }),
        },
        JsonValue::Null => Ok(false),
        _ => Err(EvalError::TypeMismatch {
            op: "in",
            lhs: type_name(needle),
            rhs: type_name(haystack),
        }),
    }
}

fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
