//! Line parsing: quote-aware tokenization, pipeline splitting and
//! redirection resolution.
//!
//! Tokens keep their quote characters until the very end of parsing so the
//! pipeline builder can tell a quoted `"|"` apart from the `|` operator.
//! `unquote` removes them right before a command is dispatched.
use std::borrow::Cow;

mod pipeline_parser;
mod redirection_parser;
mod tokenizer;

pub use pipeline_parser::{build_pipeline, split_stages, validate_pipeline, Pipeline};
pub use redirection_parser::{
    resolve_redirections, RedirectionKind, RedirectionSpec, ResolvedCommand,
};
pub use tokenizer::{tokenize, tokenize_raw};

/// One whitespace-delimited (or quoted) word of an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: Cow<'a, str>,
    /// Byte offset of the token's first character in the source line.
    pub offset: usize,
}

impl Token<'_> {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_owned(self) -> String {
        self.text.into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Pipe,
    Read,
    Write,
    Append,
}

impl Operator {
    /// Operators are only recognized as standalone tokens.
    pub fn parse(token: &str) -> Option<Operator> {
        match token {
            "|" => Some(Operator::Pipe),
            "<" => Some(Operator::Read),
            ">" => Some(Operator::Write),
            ">>" => Some(Operator::Append),
            _ => None,
        }
    }

    pub fn is_redirection(self) -> bool {
        !matches!(self, Operator::Pipe)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Pipe => "|",
            Operator::Read => "<",
            Operator::Write => ">",
            Operator::Append => ">>",
        }
    }
}

pub(crate) fn is_separator(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

pub(crate) fn is_quote(ch: char) -> bool {
    ch == '\'' || ch == '"'
}

/// True for raw tokens produced from a quoted word (quotes retained).
pub fn is_quoted(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => is_quote(first) && first == last,
        _ => false,
    }
}

/// Strip the surrounding quotes of a raw token and resolve the escapes that
/// are meaningful inside them. Unquoted tokens are returned untouched.
pub fn unquote(token: &str) -> Cow<'_, str> {
    if !is_quoted(token) {
        return Cow::Borrowed(token);
    }
    let quote = token.as_bytes()[0] as char;
    unescape_quoted(&token[1..token.len() - 1], quote)
}

pub(crate) fn unescape_quoted(inner: &str, quote: char) -> Cow<'_, str> {
    if !inner.contains('\\') {
        return Cow::Borrowed(inner);
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if next == quote || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    Cow::Owned(out)
}
