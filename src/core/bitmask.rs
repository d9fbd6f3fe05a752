//! Boolean expression engine over named per-pixel flag bits.
//!
//! Grammar (case-insensitive keywords, parentheses allowed):
//!
//! ```text
//! expr := and_expr (("or" | "|") and_expr)*
//! and_expr := term (("and" | "&") term)*
//! term := ("not" | "!")* atom
//! atom := band_name "." flag_name | "(" expr ")"
//! ```
//!
//! An expression is parsed once and is immutable; evaluation is stateless
//! with respect to any one raster and goes through a [`FlagProvider`], so the
//! same tree can be applied to whatever flag rasters the caller supplies.
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

/// Parsed bitmask expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum BitmaskExpr {
    /// Reference to a named flag of a named band.
    Flag { band: String, flag: String },
    Not(Box<BitmaskExpr>),
    And(Box<BitmaskExpr>, Box<BitmaskExpr>),
    Or(Box<BitmaskExpr>, Box<BitmaskExpr>),
}

/// Resolves flag references during evaluation: is the named flag of the
/// named band set at pixel `(x, y)`?
pub trait FlagProvider {
    fn flag_set(&self, band: &str, flag: &str, x: usize, y: usize) -> Result<bool>;
}

impl BitmaskExpr {
    /// Evaluate the expression at one pixel.
    pub fn evaluate(&self, provider: &impl FlagProvider, x: usize, y: usize) -> Result<bool> {
        match self {
            BitmaskExpr::Flag { band, flag } => provider.flag_set(band, flag, x, y),
            BitmaskExpr::Not(e) => Ok(!e.evaluate(provider, x, y)?),
            BitmaskExpr::And(a, b) => Ok(a.evaluate(provider, x, y)? && b.evaluate(provider, x, y)?),
            BitmaskExpr::Or(a, b) => Ok(a.evaluate(provider, x, y)? || b.evaluate(provider, x, y)?),
        }
    }

    /// Distinct band names referenced by the expression, in sorted order.
    pub fn referenced_bands(&self) -> Vec<String> {
        let mut out = BTreeSet::new();
        self.collect_bands(&mut out);
        out.into_iter().collect()
    }

    fn collect_bands(&self, out: &mut BTreeSet<String>) {
        match self {
            BitmaskExpr::Flag { band, .. } => {
                out.insert(band.clone());
            }
            BitmaskExpr::Not(e) => e.collect_bands(out),
            BitmaskExpr::And(a, b) | BitmaskExpr::Or(a, b) => {
                a.collect_bands(out);
                b.collect_bands(out);
            }
        }
    }
}

impl fmt::Display for BitmaskExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitmaskExpr::Flag { band, flag } => write!(f, "{}.{}", band, flag),
            BitmaskExpr::Not(e) => write!(f, "not {}", e),
            BitmaskExpr::And(a, b) => write!(f, "({} and {})", a, b),
            BitmaskExpr::Or(a, b) => write!(f, "({} or {})", a, b),
        }
    }
}

/// Parse a bitmask expression.
pub fn parse_bitmask(text: &str) -> Result<BitmaskExpr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(Error::syntax(text, "empty expression"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::syntax(
            parser.tokens[parser.pos].text(),
            "unexpected trailing input",
        ));
    }
    Ok(expr)
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    And,
    Or,
    Not,
    LParen,
    RParen,
    /// `band.flag` reference.
    FlagRef(String, String),
}

impl Token {
    fn text(&self) -> String {
        match self {
            Token::And => "and".into(),
            Token::Or => "or".into(),
            Token::Not => "not".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::FlagRef(b, f) => format!("{}.{}", b, f),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            b'!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            b'&' => {
                tokens.push(Token::And);
                i += 1;
            }
            b'|' => {
                tokens.push(Token::Or);
                i += 1;
            }
            b if b.is_ascii_alphanumeric() || b == b'_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
                {
                    i += 1;
                }
                let word = &text[start..i];
                match word.to_ascii_lowercase().as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    _ => {
                        let Some((band, flag)) = word.split_once('.') else {
                            return Err(Error::syntax(word, "expected `band.flag` reference"));
                        };
                        if band.is_empty() || flag.is_empty() || flag.contains('.') {
                            return Err(Error::syntax(word, "malformed `band.flag` reference"));
                        }
                        tokens.push(Token::FlagRef(band.to_string(), flag.to_string()));
                    }
                }
            }
            _ => return Err(Error::syntax(text, "unexpected character")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> Result<BitmaskExpr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let right = self.parse_and()?;
            left = BitmaskExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<BitmaskExpr> {
        let mut left = self.parse_term()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let right = self.parse_term()?;
            left = BitmaskExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<BitmaskExpr> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            let inner = self.parse_term()?;
            return Ok(BitmaskExpr::Not(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<BitmaskExpr> {
        match self.bump() {
            Some(Token::FlagRef(band, flag)) => Ok(BitmaskExpr::Flag { band, flag }),
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(Error::syntax(")", "expected closing parenthesis")),
                }
            }
            Some(t) => Err(Error::syntax(t.text(), "expected flag reference or `(`")),
            None => Err(Error::syntax("", "unexpected end of expression")),
        }
    }
}
