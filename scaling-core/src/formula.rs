//! Mutator formula language.
//!
//! A closed-form arithmetic language over a single variable, `difficulty`
//! (alias `d`). Every formula reduces at compile time to
//!
//! ```text
//! scale × difficulty + offset
//! ```
//!
//! so evaluation is one multiply-add and can never fail at runtime.
//!
//! Accepted syntax: decimal numbers, `difficulty` / `d`, the constants
//! `min` and `max` (the configured difficulty bounds), `+ - * /`, unary
//! minus and parentheses. Anything that would make the result non-affine
//! (`difficulty * difficulty`, dividing by `difficulty`) or divide by zero is
//! rejected with the byte offset of the offending token.
//!
//! ```
//! # use scaling_core::formula::Formula;
//! # use scaling_core::types::DifficultyBounds;
//! let f = Formula::compile("difficulty * 0.9 + 2", DifficultyBounds::default())?;
//! assert!((f.evaluate(10.0) - 11.0).abs() < 1e-9);
//! # Ok::<(), scaling_core::error::ScalingError>(())
//! ```

use std::fmt;

use crate::error::{Result, ScalingError};
use crate::types::DifficultyBounds;

/// A compiled affine formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    scale: f64,
    offset: f64,
    source: String,
}

impl Formula {
    /// `difficulty`: leaves the value unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
            source: "difficulty".to_string(),
        }
    }

    /// `difficulty + delta`.
    #[must_use]
    pub fn delta(delta: f64) -> Self {
        Self {
            scale: 1.0,
            offset: delta,
            source: format!("difficulty + {delta}"),
        }
    }

    /// Compile a formula. `min`/`max` resolve against `bounds`.
    ///
    /// # Errors
    /// Returns [`ScalingError::Formula`] if the text is not a valid affine
    /// expression.
    pub fn compile(source: &str, bounds: DifficultyBounds) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens: &tokens,
            pos: 0,
            depth: 0,
            bounds,
        };
        let affine = parser.expr()?;
        if let Some(&(offset, ref tok)) = parser.peek() {
            return Err(error(source, offset, format!("unexpected {tok}")));
        }
        if !affine.scale.is_finite() || !affine.offset.is_finite() {
            return Err(error(source, 0, "result is not a finite number".to_string()));
        }
        Ok(Self {
            scale: affine.scale,
            offset: affine.offset,
            source: source.trim().to_string(),
        })
    }

    /// Apply the formula to the current difficulty.
    #[must_use]
    pub fn evaluate(&self, difficulty: f64) -> f64 {
        self.scale * difficulty + self.offset
    }

    /// Coefficient on `difficulty`.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Constant term.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// The text this formula was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether applying this formula never changes the value.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        (self.scale - 1.0).abs() < f64::EPSILON && self.offset.abs() < f64::EPSILON
    }
}

impl Default for Formula {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "number {n}"),
            Self::Ident(name) => write!(f, "`{name}`"),
            Self::Plus => f.write_str("`+`"),
            Self::Minus => f.write_str("`-`"),
            Self::Star => f.write_str("`*`"),
            Self::Slash => f.write_str("`/`"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
        }
    }
}

fn error(source: &str, offset: usize, message: String) -> ScalingError {
    ScalingError::Formula {
        source_text: source.to_string(),
        offset,
        message,
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let simple = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(tok) = simple {
            chars.next();
            tokens.push((start, tok));
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let mut end = start;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[start..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| error(source, start, format!("invalid number `{text}`")))?;
            tokens.push((start, Token::Number(value)));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((start, Token::Ident(source[start..end].to_ascii_lowercase())));
        } else {
            return Err(error(source, start, format!("unexpected character `{c}`")));
        }
    }

    if tokens.is_empty() {
        return Err(error(source, 0, "empty formula".to_string()));
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Affine {
    scale: f64,
    offset: f64,
}

impl Affine {
    const fn constant(value: f64) -> Self {
        Self {
            scale: 0.0,
            offset: value,
        }
    }

    fn is_constant(self) -> bool {
        self.scale == 0.0
    }

    fn times(self, k: f64) -> Self {
        Self {
            scale: self.scale * k,
            offset: self.offset * k,
        }
    }
}

/// Deepest nesting of parentheses and unary signs a formula may use.
const MAX_NESTING: usize = 64;

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [(usize, Token)],
    pos: usize,
    depth: usize,
    bounds: DifficultyBounds,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&(usize, Token)> {
        self.tokens.get(self.pos)
    }

    fn end_offset(&self) -> usize {
        self.source.len()
    }

    /// Run `parse` one nesting level deeper, failing at [`MAX_NESTING`].
    fn nested(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<Affine>,
    ) -> Result<Affine> {
        if self.depth >= MAX_NESTING {
            return Err(error(self.source, offset, "formula nested too deeply".to_string()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Affine> {
        let mut acc = self.term()?;
        while let Some((_, tok)) = self.peek() {
            let sign = match tok {
                Token::Plus => 1.0,
                Token::Minus => -1.0,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?.times(sign);
            acc = Affine {
                scale: acc.scale + rhs.scale,
                offset: acc.offset + rhs.offset,
            };
        }
        Ok(acc)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Affine> {
        let mut acc = self.unary()?;
        loop {
            let (offset, op) = match self.peek() {
                Some((at, tok @ (Token::Star | Token::Slash))) => (*at, tok.clone()),
                _ => break,
            };
            match op {
                Token::Star => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    acc = if acc.is_constant() {
                        rhs.times(acc.offset)
                    } else if rhs.is_constant() {
                        acc.times(rhs.offset)
                    } else {
                        return Err(error(
                            self.source,
                            offset,
                            "difficulty cannot be multiplied by itself".to_string(),
                        ));
                    };
                }
                Token::Slash => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if !rhs.is_constant() {
                        return Err(error(
                            self.source,
                            offset,
                            "cannot divide by difficulty".to_string(),
                        ));
                    }
                    if rhs.offset == 0.0 {
                        return Err(error(self.source, offset, "division by zero".to_string()));
                    }
                    acc = acc.times(1.0 / rhs.offset);
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    // unary := ('-' | '+') unary | primary
    fn unary(&mut self) -> Result<Affine> {
        match self.peek() {
            Some(&(offset, Token::Minus)) => {
                self.pos += 1;
                Ok(self.nested(offset, Self::unary)?.times(-1.0))
            }
            Some(&(offset, Token::Plus)) => {
                self.pos += 1;
                self.nested(offset, Self::unary)
            }
            _ => self.primary(),
        }
    }

    // primary := number | ident | '(' expr ')'
    fn primary(&mut self) -> Result<Affine> {
        let Some((offset, tok)) = self.peek().cloned() else {
            return Err(error(
                self.source,
                self.end_offset(),
                "unexpected end of formula".to_string(),
            ));
        };
        self.pos += 1;

        match tok {
            Token::Number(value) => Ok(Affine::constant(value)),
            Token::Ident(name) => match name.as_str() {
                "difficulty" | "d" => Ok(Affine {
                    scale: 1.0,
                    offset: 0.0,
                }),
                "min" => Ok(Affine::constant(self.bounds.min)),
                "max" => Ok(Affine::constant(self.bounds.max)),
                _ => Err(error(self.source, offset, format!("unknown name `{name}`"))),
            },
            Token::LParen => {
                let inner = self.nested(offset, Self::expr)?;
                match self.peek() {
                    Some((_, Token::RParen)) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some((at, other)) => {
                        Err(error(self.source, *at, format!("expected `)`, found {other}")))
                    }
                    None => Err(error(
                        self.source,
                        self.end_offset(),
                        "missing closing `)`".to_string(),
                    )),
                }
            }
            other => Err(error(self.source, offset, format!("unexpected {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
