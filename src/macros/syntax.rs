//! User macro token syntax
//!
//! ```text
//! {$NAME}
//! {$NAME:context}
//! {$NAME:"quoted \"context\""}
//! {$NAME:regex:"^prod.*"}
//! ```
//!
//! Names use `A-Z`, `0-9`, `.` and `_`. An unquoted context runs up to the
//! first `}`.

use crate::ContextOp;
use crate::MacroSyntaxError;

const MACRO_START: &str = "{$";
const REGEX_PREFIX: &str = "regex:";

/// A parsed `{$NAME:context}` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroToken {
    pub name: String,
    pub context: Option<String>,
    pub op: ContextOp,
}

impl MacroToken {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            context: None,
            op: ContextOp::Equal,
        }
    }

    pub fn with_context(
        mut self,
        context: &str,
    ) -> Self {
        self.context = Some(context.to_string());
        self
    }
}

/// Parses text that must consist of exactly one user macro.
pub fn parse_user_macro(text: &str) -> Result<MacroToken, MacroSyntaxError> {
    if !text.starts_with(MACRO_START) {
        return Err(MacroSyntaxError::NotAMacro(text.to_string()));
    }
    let (token, end) = parse_at(text, 0)?;
    if end != text.len() {
        return Err(MacroSyntaxError::NotAMacro(text.to_string()));
    }
    Ok(token)
}

/// Strips the `{$` and `}` around a bare macro reference: `{$URL}` → `URL`.
/// Anything else is returned unchanged.
pub fn macro_name(text: &str) -> &str {
    text.strip_prefix(MACRO_START)
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(text)
}

/// Replaces every user macro in `text` with the value `resolve` returns.
///
/// Unresolved macros are kept verbatim. A malformed `{$` token fails the whole
/// expansion.
pub fn expand_user_macros(
    text: &str,
    mut resolve: impl FnMut(&MacroToken) -> Option<String>,
) -> Result<String, MacroSyntaxError> {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(found) = text[pos..].find(MACRO_START) {
        let start = pos + found;
        out.push_str(&text[pos..start]);

        let (token, end) = parse_at(text, start)?;
        match resolve(&token) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&text[start..end]),
        }
        pos = end;
    }

    out.push_str(&text[pos..]);
    Ok(out)
}

/// True when `text` contains at least one `{$` token.
pub fn has_user_macros(text: &str) -> bool {
    text.contains(MACRO_START)
}

/// Parses the macro starting at byte offset `start`; returns it with the offset one past `}`.
pub(crate) fn parse_at(
    text: &str,
    start: usize,
) -> Result<(MacroToken, usize), MacroSyntaxError> {
    let bytes = text.as_bytes();
    let name_start = start + MACRO_START.len();
    let mut pos = name_start;

    while pos < bytes.len() && is_name_byte(bytes[pos]) {
        pos += 1;
    }
    let name = &text[name_start..pos];

    let Some(&next) = bytes.get(pos) else {
        return Err(MacroSyntaxError::Unterminated(start));
    };
    if next != b'}' && next != b':' {
        let found = text[pos..].chars().next().unwrap_or_default();
        return Err(MacroSyntaxError::InvalidName { offset: pos, found });
    }
    if name.is_empty() {
        let end = text[start..].find('}').map(|i| start + i + 1).unwrap_or(text.len());
        return Err(MacroSyntaxError::EmptyName(text[start..end].to_string()));
    }

    if next == b'}' {
        return Ok((MacroToken::new(name), pos + 1));
    }

    // context
    pos += 1;
    while bytes.get(pos) == Some(&b' ') {
        pos += 1;
    }

    let mut op = ContextOp::Equal;
    if text[pos..].starts_with(REGEX_PREFIX) {
        op = ContextOp::Regex;
        pos += REGEX_PREFIX.len();
    }

    let (context, end) = if bytes.get(pos) == Some(&b'"') {
        parse_quoted_context(text, start, pos)?
    } else {
        let close = text[pos..].find('}').ok_or(MacroSyntaxError::Unterminated(start))?;
        (text[pos..pos + close].to_string(), pos + close + 1)
    };

    Ok((
        MacroToken {
            name: name.to_string(),
            context: Some(context),
            op,
        },
        end,
    ))
}

fn parse_quoted_context(
    text: &str,
    start: usize,
    quote: usize,
) -> Result<(String, usize), MacroSyntaxError> {
    let mut context = String::new();
    let mut chars = text[quote + 1..].char_indices();

    let closing = loop {
        match chars.next() {
            None => return Err(MacroSyntaxError::UnterminatedQuote(quote)),
            Some((_, '\\')) => match chars.next() {
                Some((_, '"')) => context.push('"'),
                Some((_, c)) => {
                    context.push('\\');
                    context.push(c);
                }
                None => return Err(MacroSyntaxError::UnterminatedQuote(quote)),
            },
            Some((i, '"')) => break quote + 1 + i,
            Some((_, c)) => context.push(c),
        }
    };

    let mut pos = closing + 1;
    let bytes = text.as_bytes();
    while bytes.get(pos) == Some(&b' ') {
        pos += 1;
    }
    match text[pos..].chars().next() {
        Some('}') => Ok((context, pos + 1)),
        Some(found) => Err(MacroSyntaxError::TrailingCharacters { offset: pos, found }),
        None => Err(MacroSyntaxError::Unterminated(start)),
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'.' || b == b'_'
}
