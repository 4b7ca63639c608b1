// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Restricted boolean/comparison expression language used by string
//! conditions, after template substitution.
//!
//! ```text
//! expr       := or
//! or         := and ( "||" and )*
//! and        := equality ( "&&" equality )*
//! equality   := relational ( ( "==" | "!=" | "===" | "!==" ) relational )*
//! relational := unary ( ( "<" | "<=" | ">" | ">=" ) unary )*
//! unary      := ( "!" | "-" ) unary | primary
//! primary    := number | string | true | false | null | undefined | "(" expr ")"
//! ```
//!
//! Expressions are parsed into an AST and evaluated by a tree walk over
//! literals only. There are no identifiers, calls or member accesses, so an
//! expression can never observe anything but its own text.

use std::cmp::Ordering;

use serde_json::Value;
use thiserror::Error;

use crate::packet::canonical::{is_truthy, loose_eq, number_value, to_number};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate to a value. `&&`/`||` yield one of their operands.
    pub fn evaluate(&self) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Unary(UnaryOp::Not, inner) => Value::Bool(!is_truthy(&inner.evaluate())),
            Expr::Unary(UnaryOp::Neg, inner) => number_value(-to_number(&inner.evaluate())),
            Expr::Binary(BinaryOp::And, left, right) => {
                let left = left.evaluate();
                if is_truthy(&left) {
                    right.evaluate()
                } else {
                    left
                }
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let left = left.evaluate();
                if is_truthy(&left) {
                    left
                } else {
                    right.evaluate()
                }
            }
            Expr::Binary(op, left, right) => {
                let (left, right) = (left.evaluate(), right.evaluate());
                Value::Bool(compare(*op, &left, &right))
            }
        }
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    match op {
        BinaryOp::LooseEq => loose_eq(left, right),
        BinaryOp::LooseNe => !loose_eq(left, right),
        BinaryOp::StrictEq => strict_eq(left, right),
        BinaryOp::StrictNe => !strict_eq(left, right),
        BinaryOp::Lt => relation(left, right).map(Ordering::is_lt).unwrap_or(false),
        BinaryOp::Le => relation(left, right).map(Ordering::is_le).unwrap_or(false),
        BinaryOp::Gt => relation(left, right).map(Ordering::is_gt).unwrap_or(false),
        BinaryOp::Ge => relation(left, right).map(Ordering::is_ge).unwrap_or(false),
        BinaryOp::And | BinaryOp::Or => false,
    }
}

/// Same JSON type and equal; numbers compare by value.
pub fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => to_number(left) == to_number(right),
        _ => left == right,
    }
}

/// Two strings order lexicographically, anything else numerically.
/// `None` when either side is not a number.
fn relation(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Some(a.cmp(b));
    }
    to_number(left).partial_cmp(&to_number(right))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Op(op) => write!(f, "'{}'", op),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
        }
    }
}

const OPERATORS: [&str; 12] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "-",
];

fn tokenize(src: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| ExpressionError::InvalidNumber(text.clone()))?;
            tokens.push(Token::Number(number));
        } else if c == '"' || c == '\'' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                let Some(&ch) = chars.get(i) else {
                    return Err(ExpressionError::UnterminatedString);
                };
                i += 1;
                if ch == quote {
                    break;
                }
                if ch == '\\' {
                    let Some(&escaped) = chars.get(i) else {
                        return Err(ExpressionError::UnterminatedString);
                    };
                    i += 1;
                    text.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                } else {
                    text.push(ch);
                }
            }
            tokens.push(Token::Str(text));
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..].iter().take(3).collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .copied()
                .ok_or(ExpressionError::UnexpectedChar(c, i))?;
            tokens.push(Token::Op(op));
            i += op.chars().count();
        }
    }
    Ok(tokens)
}

/// Parse an expression into its AST.
pub fn parse(src: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExpressionError::UnexpectedToken(token.to_string())),
    }
}

/// Parse and evaluate `src`, reducing the result to its truthiness.
///
/// # Example
/// ```
/// use ucp_runner::engine::evaluate_expression;
///
/// assert_eq!(evaluate_expression("5 > 3 && 'a' == 'a'"), Ok(true));
/// assert_eq!(evaluate_expression("!(1 === '1')"), Ok(true));
/// assert!(evaluate_expression("process.exit()").is_err());
/// ```
pub fn evaluate_expression(src: &str) -> Result<bool, ExpressionError> {
    Ok(is_truthy(&parse(src)?.evaluate()))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, candidates: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if candidates.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and()?;
        while self.eat_op(&["||"]).is_some() {
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_equality()?;
        while self.eat_op(&["&&"]).is_some() {
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_relational()?;
        while let Some(op) = self.eat_op(&["===", "!==", "==", "!="]) {
            let op = match op {
                "===" => BinaryOp::StrictEq,
                "!==" => BinaryOp::StrictNe,
                "==" => BinaryOp::LooseEq,
                _ => BinaryOp::LooseNe,
            };
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.eat_op(&["<=", ">=", "<", ">"]) {
            let op = match op {
                "<=" => BinaryOp::Le,
                ">=" => BinaryOp::Ge,
                "<" => BinaryOp::Lt,
                _ => BinaryOp::Gt,
            };
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        match self.eat_op(&["!", "-"]) {
            Some("!") => Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?))),
            Some(_) => Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?))),
            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExpressionError::UnexpectedEnd)?;
        self.pos += 1;
        match token {
            Token::Number(n) => Ok(Expr::Literal(number_value(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                _ => Err(ExpressionError::UnknownIdentifier(name)),
            },
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.tokens.get(self.pos) {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(other) => Err(ExpressionError::UnexpectedToken(other.to_string())),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            other => Err(ExpressionError::UnexpectedToken(other.to_string())),
        }
    }
}
