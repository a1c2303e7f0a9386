//! Word expansion, run on a command's raw tokens right before dispatch.
//!
//! Quoted tokens are never expanded: they only lose their quotes. Unquoted
//! tokens containing `*` or `?` get `~` replaced by `$HOME` and are then
//! matched against the filesystem.
use std::borrow::Cow;
use std::env;

use crate::parse::{is_quoted, unquote};

mod glob;

pub use glob::{glob_pattern, has_wildcard};

/// Replace a leading `~` (alone or followed by `/`) with `home`.
pub fn expand_tilde<'a>(token: &'a str, home: Option<&str>) -> Cow<'a, str> {
    let Some(home) = home else {
        return Cow::Borrowed(token);
    };
    match token.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            Cow::Owned(format!("{home}{rest}"))
        }
        _ => Cow::Borrowed(token),
    }
}

/// Expand one unquoted token into zero or more words.
pub fn expand_token(token: &str) -> Vec<String> {
    if !has_wildcard(token) {
        return vec![token.to_string()];
    }
    let home = env::var("HOME").ok();
    let pattern = expand_tilde(token, home.as_deref());
    let matches = glob_pattern(&pattern);
    if matches.is_empty() {
        vec![token.to_string()]
    } else {
        matches
    }
}

/// Turn raw tokens into the argv handed to a builtin or program.
pub fn prepare_argv(tokens: Vec<String>) -> Vec<String> {
    let mut argv = Vec::with_capacity(tokens.len());
    for token in tokens {
        if is_quoted(&token) {
            argv.push(unquote(&token).into_owned());
        } else {
            argv.extend(expand_token(&token));
        }
    }
    argv
}
