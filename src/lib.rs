//! Parsing core of the shell.
//!
//! This crate exposes the pieces that do not touch processes or the terminal
//! so fuzz targets and unit tests can link them without the interactive deps.

mod alias;
mod error;
#[cfg(feature = "expansion")]
mod expansion;
mod history;
mod parse;

pub use alias::{AliasEntry, AliasTable};
pub use error::{
    AliasError, ErrorKind, PipelineError, ProcessError, ShellError, ShellResult,
};
pub use history::{format_entries, History};
pub use parse::{
    build_pipeline, is_quoted, resolve_redirections, split_stages, tokenize, tokenize_raw,
    unquote, validate_pipeline, Operator, Pipeline, RedirectionKind, RedirectionSpec,
    ResolvedCommand, Token,
};

/// Tokenize, expand aliases and build the pipeline for one line.
pub fn parse_line(line: &str, aliases: &AliasTable) -> ShellResult<Pipeline> {
    let tokens = tokenize_raw(line)?;
    let expanded = aliases.expand(&tokens)?;
    if expanded == tokens {
        build_pipeline(line, &tokens)
    } else {
        build_pipeline(&expanded.join(" "), &expanded)
    }
}

/// Fuzz helper for parser-only targets.
pub fn fuzz_parse_bytes(data: &[u8]) {
    let input = String::from_utf8_lossy(data);
    if let Ok(pipeline) = parse_line(&input, &AliasTable::new()) {
        for stage in pipeline.stages {
            if let Ok(tokens) = tokenize_raw(&stage) {
                let _ = resolve_redirections(tokens);
            }
        }
    }
}

#[cfg(feature = "expansion")]
pub use expansion::{
    expand_tilde, expand_token, glob_pattern, has_wildcard, prepare_argv,
};

/// Fuzz helper for parser+expansion targets.
#[cfg(feature = "expansion")]
pub fn fuzz_expand_bytes(data: &[u8]) {
    let input = String::from_utf8_lossy(data);
    if let Ok(tokens) = tokenize_raw(&input) {
        for token in &tokens {
            let _ = expansion::expand_token(token);
        }
        let _ = expansion::prepare_argv(tokens);
    }
}
