//! Display filter expressions
//!
//! A filter narrows the rows shown by the packet list without touching the
//! registry. Expressions compare packet attributes with literals:
//!
//! ```text
//! sport == 53 and not (dport > 1024 or payload contains b"\x00")
//! ```
//!
//! Attribute names are packet fields (case-insensitive, an optional `p.`
//! prefix is accepted) or one of the pseudo attributes `class`, `time`,
//! `payload` and `wirelen`. A packet on which the expression cannot be
//! evaluated (missing field, mismatched types) does not match.

use thiserror::Error;

use crate::packet::literal::{parse_int, unescape};
use crate::packet::{FieldValue, Packet, PacketError};

/// Errors raised while parsing a filter expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of filter")]
    UnexpectedEnd,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid literal '{0}'")]
    InvalidLiteral(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
}

/// Parsed filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Bare attribute: true when present and non-zero / non-empty
    Truthy(String),
    Compare {
        attr: String,
        op: CompareOp,
        value: Scalar,
    },
}

/// Values the evaluator compares
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(u64),
    Float(f64),
    Text(Vec<u8>),
}

impl Scalar {
    fn is_truthy(&self) -> bool {
        match self {
            Scalar::Int(v) => *v != 0,
            Scalar::Float(v) => *v != 0.0,
            Scalar::Text(t) => !t.is_empty(),
        }
    }
}

impl From<&FieldValue> for Scalar {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Int(v) => Scalar::Int(*v),
            FieldValue::Bytes(b) => Scalar::Text(b.clone()),
            FieldValue::Str(s) => Scalar::Text(s.as_bytes().to_vec()),
        }
    }
}

/// A compiled display filter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    source: String,
    expr: Expr,
}

impl Filter {
    /// Parse a filter expression
    pub fn parse(text: &str) -> Result<Self, FilterError> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(FilterError::UnexpectedToken(token.to_string()));
        }
        Ok(Self {
            source: text.trim().to_string(),
            expr,
        })
    }

    /// The expression text this filter was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate against a packet, surfacing attribute errors
    pub fn evaluate(&self, packet: &Packet) -> Result<bool, PacketError> {
        eval(&self.expr, packet)
    }

    /// Whether a packet matches; evaluation errors count as no match
    pub fn matches(&self, packet: &Packet) -> bool {
        match self.evaluate(packet) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::trace!(filter = %self.source, "packet excluded: {}", e);
                false
            }
        }
    }
}

fn eval(expr: &Expr, packet: &Packet) -> Result<bool, PacketError> {
    match expr {
        Expr::Or(a, b) => Ok(eval(a, packet)? || eval(b, packet)?),
        Expr::And(a, b) => Ok(eval(a, packet)? && eval(b, packet)?),
        Expr::Not(inner) => Ok(!eval(inner, packet)?),
        Expr::Truthy(attr) => Ok(attribute(packet, attr)?.is_truthy()),
        Expr::Compare { attr, op, value } => compare(attr, &attribute(packet, attr)?, *op, value),
    }
}

/// Resolve an attribute: declared fields first, then pseudo attributes
fn attribute(packet: &Packet, name: &str) -> Result<Scalar, PacketError> {
    let name = name.strip_prefix("p.").unwrap_or(name);
    match packet.field(name) {
        Ok(value) => Ok(Scalar::from(value)),
        Err(missing) => match name.to_ascii_lowercase().as_str() {
            "class" => Ok(Scalar::Text(packet.class_name().as_bytes().to_vec())),
            "time" => Ok(Scalar::Float(packet.time())),
            "payload" => Ok(Scalar::Text(packet.payload().to_vec())),
            "wirelen" => Ok(Scalar::Int(packet.wire_len() as u64)),
            _ => Err(missing),
        },
    }
}

fn compare(attr: &str, left: &Scalar, op: CompareOp, right: &Scalar) -> Result<bool, PacketError> {
    use std::cmp::Ordering;

    let mismatch = || PacketError::InvalidValue {
        field: attr.to_string(),
        reason: format!("cannot compare {:?} with {:?}", left, right),
    };

    if op == CompareOp::Contains {
        return match (left, right) {
            (Scalar::Text(hay), Scalar::Text(needle)) => Ok(needle.is_empty()
                || hay.windows(needle.len()).any(|w| w == needle.as_slice())),
            _ => Err(mismatch()),
        };
    }

    let ordering = match (left, right) {
        (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
        (Scalar::Text(a), Scalar::Text(b)) => a.cmp(b),
        (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b).ok_or_else(mismatch)?,
        (Scalar::Float(a), Scalar::Int(b)) => a.partial_cmp(&(*b as f64)).ok_or_else(mismatch)?,
        (Scalar::Int(a), Scalar::Float(b)) => (*a as f64).partial_cmp(b).ok_or_else(mismatch)?,
        _ => return Err(mismatch()),
    };

    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Contains => unreachable!("handled above"),
    })
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(Scalar),
    Op(CompareOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Literal(v) => write!(f, "{:?}", v),
            Token::Op(op) => write!(f, "{:?}", op),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, FilterError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        let two = |a: char, b: char| c == a && next == Some(b);

        if two('=', '=') {
            tokens.push(Token::Op(CompareOp::Eq));
            i += 2;
        } else if two('!', '=') {
            tokens.push(Token::Op(CompareOp::Ne));
            i += 2;
        } else if two('<', '=') {
            tokens.push(Token::Op(CompareOp::Le));
            i += 2;
        } else if two('>', '=') {
            tokens.push(Token::Op(CompareOp::Ge));
            i += 2;
        } else if two('&', '&') {
            tokens.push(Token::And);
            i += 2;
        } else if two('|', '|') {
            tokens.push(Token::Or);
            i += 2;
        } else if c == '<' {
            tokens.push(Token::Op(CompareOp::Lt));
            i += 1;
        } else if c == '>' {
            tokens.push(Token::Op(CompareOp::Gt));
            i += 1;
        } else if c == '!' {
            tokens.push(Token::Not);
            i += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c == '"' || c == '\'' || (c == 'b' && matches!(next, Some('"') | Some('\''))) {
            let is_bytes = c == 'b';
            let quote_pos = if is_bytes { i + 1 } else { i };
            let (body, end) = read_quoted(&chars, quote_pos)?;
            let bytes = unescape(&body).map_err(|_| FilterError::InvalidLiteral(body.clone()))?;
            tokens.push(Token::Literal(Scalar::Text(bytes)));
            i = end;
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(word_token(word)?);
        } else {
            return Err(FilterError::UnexpectedToken(c.to_string()));
        }
    }

    Ok(tokens)
}

/// Read a quoted literal starting at `start` (the quote); returns the raw body
/// and the index after the closing quote
fn read_quoted(chars: &[char], start: usize) -> Result<(String, usize), FilterError> {
    let quote = chars[start];
    let mut body = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                body.push('\\');
                body.push(chars[i + 1]);
                i += 2;
            }
            c if c == quote => return Ok((body, i + 1)),
            c => {
                body.push(c);
                i += 1;
            }
        }
    }
    Err(FilterError::UnterminatedString)
}

fn word_token(word: String) -> Result<Token, FilterError> {
    Ok(match word.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "contains" => Token::Op(CompareOp::Contains),
        _ if word.starts_with(|c: char| c.is_ascii_digit()) => {
            if let Some(v) = parse_int(&word) {
                Token::Literal(Scalar::Int(v))
            } else if let Ok(v) = word.parse::<f64>() {
                Token::Literal(Scalar::Float(v))
            } else {
                return Err(FilterError::InvalidLiteral(word));
            }
        }
        _ => Token::Ident(word),
    })
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, FilterError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(FilterError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, FilterError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, FilterError> {
        match self.next()? {
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.next()? {
                    Token::RParen => Ok(inner),
                    other => Err(FilterError::UnexpectedToken(other.to_string())),
                }
            }
            Token::Ident(attr) => {
                let Some(Token::Op(op)) = self.peek().cloned() else {
                    return Ok(Expr::Truthy(attr));
                };
                self.pos += 1;
                match self.next()? {
                    Token::Literal(value) => Ok(Expr::Compare { attr, op, value }),
                    other => Err(FilterError::UnexpectedToken(other.to_string())),
                }
            }
            other => Err(FilterError::UnexpectedToken(other.to_string())),
        }
    }
}
