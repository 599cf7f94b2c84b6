//! Shunting-yard conversion of trigger expressions.
//!
//! Precedence, loosest first: `or`, `and`, `= <>`, `< <= > >=`, `+ -`, `* /`,
//! then the unary `-` and `not`. Binary operators are left associative, unary
//! ones right associative.

use crate::macros::parse_at;
use crate::ExpressionError;
use crate::Operator;
use crate::PostfixToken;

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Operand(PostfixToken),
    Operator(Operator),
    Open,
    Close,
}

enum Pending {
    Operator(Operator),
    Open,
}

/// Parses an infix trigger expression into postfix order.
pub fn parse_expression(text: &str) -> Result<Vec<PostfixToken>, ExpressionError> {
    let mut output = Vec::new();
    let mut stack: Vec<Pending> = Vec::new();
    let mut expect_operand = true;
    let mut last_operator: Option<Operator> = None;
    let mut lexer = Lexer { text, pos: 0 };

    while let Some((offset, lexeme)) = lexer.next_lexeme()? {
        let unexpected = |token: &str| ExpressionError::UnexpectedToken {
            offset,
            token: token.to_string(),
        };

        match lexeme {
            Lexeme::Operand(token) => {
                if !expect_operand {
                    return Err(unexpected(&text[offset..lexer.pos]));
                }
                output.push(token);
                expect_operand = false;
            }
            Lexeme::Open => {
                if !expect_operand {
                    return Err(unexpected("("));
                }
                stack.push(Pending::Open);
            }
            Lexeme::Close => {
                if expect_operand {
                    return Err(match last_operator {
                        Some(op) => ExpressionError::MissingOperand(op.symbol()),
                        None => unexpected(")"),
                    });
                }
                loop {
                    match stack.pop() {
                        Some(Pending::Operator(op)) => output.push(PostfixToken::Operator(op)),
                        Some(Pending::Open) => break,
                        None => return Err(ExpressionError::UnbalancedParentheses),
                    }
                }
            }
            Lexeme::Operator(op) => {
                let op = match (op, expect_operand) {
                    (Operator::Sub, true) => Operator::Neg,
                    (Operator::Not, true) => Operator::Not,
                    (Operator::Not, false) => return Err(unexpected("not")),
                    (op, true) => return Err(ExpressionError::MissingOperand(op.symbol())),
                    (op, false) => op,
                };

                if !op.is_unary() {
                    while let Some(Pending::Operator(top)) = stack.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        output.push(PostfixToken::Operator(*top));
                        stack.pop();
                    }
                }
                stack.push(Pending::Operator(op));
                last_operator = Some(op);
                expect_operand = true;
            }
        }
    }

    if output.is_empty() && stack.is_empty() {
        return Err(ExpressionError::Empty);
    }
    if expect_operand {
        return Err(match last_operator {
            Some(op) => ExpressionError::MissingOperand(op.symbol()),
            None => ExpressionError::Empty,
        });
    }

    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Operator(op) => output.push(PostfixToken::Operator(op)),
            Pending::Open => return Err(ExpressionError::UnbalancedParentheses),
        }
    }
    Ok(output)
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl Lexer<'_> {
    /// Next lexeme with its byte offset.
    fn next_lexeme(&mut self) -> Result<Option<(usize, Lexeme)>, ExpressionError> {
        let bytes = self.text.as_bytes();
        while bytes.get(self.pos).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let start = self.pos;
        let Some(&b) = bytes.get(start) else {
            return Ok(None);
        };

        let lexeme = match b {
            b'(' => self.single(Lexeme::Open),
            b')' => self.single(Lexeme::Close),
            b'+' => self.single(Lexeme::Operator(Operator::Add)),
            b'-' => self.single(Lexeme::Operator(Operator::Sub)),
            b'*' => self.single(Lexeme::Operator(Operator::Mul)),
            b'/' => self.single(Lexeme::Operator(Operator::Div)),
            b'=' => self.single(Lexeme::Operator(Operator::Eq)),
            b'<' => match bytes.get(start + 1) {
                Some(b'=') => self.double(Lexeme::Operator(Operator::Le)),
                Some(b'>') => self.double(Lexeme::Operator(Operator::Ne)),
                _ => self.single(Lexeme::Operator(Operator::Lt)),
            },
            b'>' => match bytes.get(start + 1) {
                Some(b'=') => self.double(Lexeme::Operator(Operator::Ge)),
                _ => self.single(Lexeme::Operator(Operator::Gt)),
            },
            b'"' => Lexeme::Operand(PostfixToken::Text(self.string()?)),
            b'{' => Lexeme::Operand(self.reference()?),
            b'0'..=b'9' | b'.' => Lexeme::Operand(PostfixToken::Number(self.number()?)),
            b if b.is_ascii_alphabetic() => self.word()?,
            _ => {
                let token = self.text[start..].chars().next().unwrap_or_default();
                return Err(ExpressionError::UnexpectedToken {
                    offset: start,
                    token: token.to_string(),
                });
            }
        };
        Ok(Some((start, lexeme)))
    }

    fn single(
        &mut self,
        lexeme: Lexeme,
    ) -> Lexeme {
        self.pos += 1;
        lexeme
    }

    fn double(
        &mut self,
        lexeme: Lexeme,
    ) -> Lexeme {
        self.pos += 2;
        lexeme
    }

    fn string(&mut self) -> Result<String, ExpressionError> {
        let start = self.pos;
        let mut value = String::new();
        let mut chars = self.text[start + 1..].char_indices();

        loop {
            match chars.next() {
                None => return Err(ExpressionError::UnterminatedString(start)),
                Some((_, '\\')) => match chars.next() {
                    Some((_, c @ ('"' | '\\'))) => value.push(c),
                    Some((_, c)) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(ExpressionError::UnterminatedString(start)),
                },
                Some((i, '"')) => {
                    self.pos = start + 1 + i + 1;
                    return Ok(value);
                }
                Some((_, c)) => value.push(c),
            }
        }
    }

    /// `{123}` function reference or a leftover `{$MACRO}`.
    fn reference(&mut self) -> Result<PostfixToken, ExpressionError> {
        let start = self.pos;
        if self.text[start..].starts_with("{$") {
            let (_, end) = parse_at(self.text, start).map_err(|e| ExpressionError::UnexpectedToken {
                offset: start,
                token: e.to_string(),
            })?;
            self.pos = end;
            return Ok(PostfixToken::Macro(self.text[start..end].to_string()));
        }

        let invalid = |token: &str| ExpressionError::UnexpectedToken {
            offset: start,
            token: token.to_string(),
        };
        let close = self.text[start..].find('}').ok_or_else(|| invalid(&self.text[start..]))?;
        let inner = &self.text[start + 1..start + close];
        let functionid = inner
            .parse::<u64>()
            .map_err(|_| invalid(&self.text[start..=start + close]))?;
        self.pos = start + close + 1;
        Ok(PostfixToken::Function(functionid))
    }

    fn number(&mut self) -> Result<f64, ExpressionError> {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        while bytes.get(self.pos).is_some_and(|b| b.is_ascii_digit() || *b == b'.') {
            self.pos += 1;
        }
        let digits = &self.text[start..self.pos];
        let value = digits.parse::<f64>().map_err(|_| ExpressionError::UnexpectedToken {
            offset: start,
            token: digits.to_string(),
        })?;

        let multiplier = match bytes.get(self.pos) {
            Some(b'K') => 1024f64,
            Some(b'M') => 1024f64.powi(2),
            Some(b'G') => 1024f64.powi(3),
            Some(b'T') => 1024f64.powi(4),
            Some(b's') => 1.0,
            Some(b'm') => 60.0,
            Some(b'h') => 3_600.0,
            Some(b'd') => 86_400.0,
            Some(b'w') => 604_800.0,
            _ => return Ok(value),
        };
        self.pos += 1;
        Ok(value * multiplier)
    }

    fn word(&mut self) -> Result<Lexeme, ExpressionError> {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        while bytes.get(self.pos).is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_') {
            self.pos += 1;
        }
        match &self.text[start..self.pos] {
            "and" => Ok(Lexeme::Operator(Operator::And)),
            "or" => Ok(Lexeme::Operator(Operator::Or)),
            "not" => Ok(Lexeme::Operator(Operator::Not)),
            other => Err(ExpressionError::UnexpectedToken {
                offset: start,
                token: other.to_string(),
            }),
        }
    }
}
