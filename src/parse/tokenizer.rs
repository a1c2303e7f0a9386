//! Tokenizer for shell input.
//!
//! Whitespace outside quotes separates tokens. A token that starts with `'`
//! or `"` runs to the next unescaped matching quote; any other token runs to
//! the next space or tab, so operators glued to text (`cmd>file`) stay part
//! of the word.
use std::borrow::Cow;

use crate::error::{ErrorKind, ShellError, ShellResult};
use crate::parse::{is_quote, is_separator, unescape_quoted, Token};

pub fn tokenize(line: &str, strip_quotes: bool) -> ShellResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while let Some(start) = next_token_start(line, pos) {
        let Some(first) = line[start..].chars().next() else {
            break;
        };
        if is_quote(first) {
            let close = find_closing_quote(line, start, first).ok_or_else(|| {
                ShellError::new(ErrorKind::Parse, format!("Unterminated {first} quote"))
                    .with_context(format!("Add a closing {first} to the quoted word"))
                    .with_position(start)
            })?;
            let token = if strip_quotes {
                Token {
                    text: unescape_quoted(&line[start + 1..close], first),
                    offset: start + 1,
                }
            } else {
                Token {
                    text: Cow::Borrowed(&line[start..=close]),
                    offset: start,
                }
            };
            tokens.push(token);
            pos = close + first.len_utf8();
        } else {
            let end = line[start..]
                .find(is_separator)
                .map_or(line.len(), |rel| start + rel);
            tokens.push(Token {
                text: Cow::Borrowed(&line[start..end]),
                offset: start,
            });
            pos = end;
        }
    }

    Ok(tokens)
}

/// Tokenize keeping quotes, as owned words.
pub fn tokenize_raw(line: &str) -> ShellResult<Vec<String>> {
    Ok(tokenize(line, false)?
        .into_iter()
        .map(Token::into_owned)
        .collect())
}

fn next_token_start(line: &str, pos: usize) -> Option<usize> {
    line[pos..]
        .find(|ch: char| !is_separator(ch))
        .map(|rel| pos + rel)
}

fn find_closing_quote(line: &str, open: usize, quote: char) -> Option<usize> {
    let body = open + quote.len_utf8();
    let mut escaped = false;
    for (idx, ch) in line[body..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Some(body + idx);
        }
    }
    None
}
