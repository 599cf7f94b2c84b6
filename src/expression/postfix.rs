use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde::Serialize;

use crate::ExpressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Neg,
    Not,
    Mul,
    Div,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl Operator {
    /// Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Neg | Operator::Not => 6,
            Operator::Mul | Operator::Div => 5,
            Operator::Add | Operator::Sub => 4,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => 3,
            Operator::Eq | Operator::Ne => 2,
            Operator::And => 1,
            Operator::Or => 0,
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Operator::Neg | Operator::Not)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Neg => "-",
            Operator::Not => "not",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PostfixToken {
    /// Numeric constant with its unit suffix already applied.
    Number(f64),
    /// `{<functionid>}` reference.
    Function(u64),
    /// Quoted string constant, unescaped.
    Text(String),
    /// User macro left unresolved at expansion time, kept verbatim.
    Macro(String),
    Operator(Operator),
}

/// Serializes `tokens` as a length-prefixed bincode list and base64-encodes it.
pub fn encode_postfix(tokens: &[PostfixToken]) -> Result<String, ExpressionError> {
    let bytes = bincode::serialize(tokens)?;
    Ok(STANDARD.encode(bytes))
}

/// Restores the token list written by [`encode_postfix`].
pub fn decode_postfix(encoded: &str) -> Result<Vec<PostfixToken>, ExpressionError> {
    let bytes = STANDARD.decode(encoded)?;
    Ok(bincode::deserialize(&bytes)?)
}
