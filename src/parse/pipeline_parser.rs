use crate::error::{ErrorKind, PipelineError, ShellError, ShellResult};
use crate::parse::{is_quote, is_separator, Operator};

/// A validated line, split into the text of each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<String>,
    /// Some stage carries `<`, `>` or `>>`.
    pub redirected: bool,
}

impl Pipeline {
    /// Lines that need forked children: more than one stage, or any redirection.
    pub fn is_compound(&self) -> bool {
        self.stages.len() > 1 || self.redirected
    }
}

/// Split a line into stage substrings at every `|` outside quotes.
///
/// A quote only opens at the start of a word, the same rule the tokenizer
/// uses, so `a"|"b` splits while `"a|b"` does not.
pub fn split_stages(line: &str) -> Vec<String> {
    let mut stages = Vec::new();
    let mut current = String::new();
    let mut open: Option<char> = None;
    let mut escaped = false;
    let mut word_start = true;

    for ch in line.chars() {
        if let Some(quote) = open {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                open = None;
                word_start = true;
            }
            continue;
        }

        if ch == '|' {
            stages.push(current.trim().to_string());
            current.clear();
            word_start = true;
            continue;
        }

        if word_start && is_quote(ch) {
            open = Some(ch);
        }
        word_start = is_separator(ch);
        current.push(ch);
    }

    stages.push(current.trim().to_string());
    stages
}

/// Check the structural rules of a line against its raw tokens.
///
/// Order: pipe count, then placement, then duplicates, then `>` with `>>`.
pub fn validate_pipeline(tokens: &[String], stage_count: usize) -> ShellResult<()> {
    let pipes = tokens
        .iter()
        .filter(|t| Operator::parse(t) == Some(Operator::Pipe))
        .count();
    if stage_count == 0 || pipes != stage_count - 1 {
        return Err(pipeline_error(
            PipelineError::WrongPipeCount,
            format!("{pipes} pipe operator(s) for {stage_count} stage(s)"),
        )
        .with_context("Separate stages with a standalone | surrounded by spaces"));
    }

    let last = stage_count - 1;
    let mut stage = 0usize;
    let mut reads = 0usize;
    let mut writes = 0usize;
    let mut appends = 0usize;

    for token in tokens {
        let Some(op) = Operator::parse(token) else {
            continue;
        };
        let misplaced = match op {
            Operator::Pipe => {
                stage += 1;
                continue;
            }
            Operator::Read => {
                reads += 1;
                stage != 0
            }
            Operator::Write => {
                writes += 1;
                stage != last
            }
            Operator::Append => {
                appends += 1;
                stage != last
            }
        };
        if misplaced {
            return Err(pipeline_error(
                PipelineError::MisplacedRedirection,
                format!("'{}' in stage {} of {}", op.as_str(), stage + 1, stage_count),
            )
            .with_context("Input redirection belongs on the first stage, output on the last"));
        }
    }

    if reads > 1 || writes > 1 || appends > 1 {
        let op = if reads > 1 {
            Operator::Read
        } else if writes > 1 {
            Operator::Write
        } else {
            Operator::Append
        };
        return Err(pipeline_error(
            PipelineError::DuplicateRedirection,
            format!("'{}' appears more than once", op.as_str()),
        ));
    }

    if writes > 0 && appends > 0 {
        return Err(pipeline_error(
            PipelineError::ConflictingRedirection,
            "both '>' and '>>' given",
        )
        .with_context("Use either > to truncate or >> to append"));
    }

    Ok(())
}

/// Split and validate a line. Nothing is launched if this fails.
pub fn build_pipeline(line: &str, tokens: &[String]) -> ShellResult<Pipeline> {
    let piped = tokens
        .iter()
        .any(|t| Operator::parse(t) == Some(Operator::Pipe));
    let stages = if piped {
        split_stages(line)
    } else {
        vec![line.trim().to_string()]
    };

    validate_pipeline(tokens, stages.len())?;

    if let Some(idx) = stages.iter().position(|s| s.is_empty()) {
        return Err(pipeline_error(
            PipelineError::EmptyStage,
            format!("stage {} of {} is empty", idx + 1, stages.len()),
        ));
    }

    let redirected = tokens
        .iter()
        .any(|t| Operator::parse(t).is_some_and(Operator::is_redirection));

    Ok(Pipeline { stages, redirected })
}

fn pipeline_error(kind: PipelineError, message: impl Into<String>) -> ShellError {
    ShellError::new(ErrorKind::Pipeline(kind), message)
}
