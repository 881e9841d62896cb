//! Spoken arithmetic
//!
//! "12 plus 7" is rewritten into "12 + 7" and evaluated by a small
//! recursive-descent parser. Nothing outside digits, operators, dots,
//! parentheses and spaces is ever evaluated.

use crate::listening::Session;
use anyhow::Result;
use thiserror::Error;
use tracing::warn;

const ALLOWED_CHARS: &str = "0123456789+-*/.() ";

/// Operator phrases, longest first
const OPERATORS: &[(&str, &str)] = &[
    ("divided by", "/"),
    ("multiplied by", "*"),
    ("times", "*"),
    ("plus", "+"),
    ("minus", "-"),
];

const UNITS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: &[&str] = &[
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

#[derive(Error, Debug, PartialEq)]
pub enum CalcError {
    #[error("unsupported characters in '{0}'")]
    Unsupported(String),

    #[error("malformed expression: {0}")]
    Syntax(String),

    #[error("division by zero")]
    DivisionByZero,
}

/// Value of a single number word, e.g. "seven" → 7, "forty" → 40
pub fn word_value(word: &str) -> Option<u64> {
    if let Some(i) = UNITS.iter().position(|&u| u == word) {
        return Some(i as u64);
    }
    TENS.iter()
        .position(|&t| !t.is_empty() && t == word)
        .map(|i| i as u64 * 10)
}

/// Replace number words with digits ("twenty one" → "21")
pub fn words_to_digits(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut pending_tens: Option<u64> = None;

    for word in text.split_whitespace() {
        match word_value(word) {
            Some(v) if v >= 20 => {
                if let Some(t) = pending_tens.take() {
                    out.push(t.to_string());
                }
                pending_tens = Some(v);
            }
            Some(v) => match pending_tens.take() {
                Some(t) if (1..10).contains(&v) => out.push((t + v).to_string()),
                Some(t) => {
                    out.push(t.to_string());
                    out.push(v.to_string());
                }
                None => out.push(v.to_string()),
            },
            None => {
                if let Some(t) = pending_tens.take() {
                    out.push(t.to_string());
                }
                out.push(word.to_string());
            }
        }
    }
    if let Some(t) = pending_tens {
        out.push(t.to_string());
    }

    out.join(" ")
}

/// Turn a spoken expression into symbols
pub fn normalize_expression(text: &str) -> String {
    let mut expr = text.replace("what is", "").replace("calculate", "");
    for (phrase, symbol) in OPERATORS {
        expr = expr.replace(phrase, symbol);
    }
    words_to_digits(expr.trim())
}

/// Evaluate a symbolic expression
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    if expr.trim().is_empty() || !expr.chars().all(|c| ALLOWED_CHARS.contains(c)) {
        return Err(CalcError::Unsupported(expr.to_string()));
    }

    let tokens: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::Syntax(format!(
            "unexpected '{}'",
            parser.tokens[parser.pos]
        )));
    }
    Ok(value)
}

/// Integral results are spoken without decimals
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.4}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

struct Parser {
    tokens: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn expression(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' {
                value * rhs
            } else if rhs == 0.0 {
                return Err(CalcError::DivisionByZero);
            } else {
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.pos += 1;
                self.factor()
            }
            Some('(') => {
                self.pos += 1;
                let value = self.expression()?;
                if self.peek() != Some(')') {
                    return Err(CalcError::Syntax("missing ')'".to_string()));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(CalcError::Syntax(format!("unexpected '{}'", c))),
            None => Err(CalcError::Syntax("unexpected end".to_string())),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let literal: String = self.tokens[start..self.pos].iter().collect();
        literal
            .parse()
            .map_err(|_| CalcError::Syntax(format!("bad number '{}'", literal)))
    }
}

pub async fn calculate(session: &mut dyn Session, spoken: &str) -> Result<()> {
    let expr = normalize_expression(spoken);
    match evaluate(&expr) {
        Ok(value) => {
            session
                .say(&format!("The answer is {}", format_number(value)))
                .await
        }
        Err(CalcError::Unsupported(_)) => {
            session.say("I can only handle simple calculations.").await
        }
        Err(e) => {
            warn!("Calculation error: {}", e);
            session.say("I couldn't calculate that.").await
        }
    }
    Ok(())
}
