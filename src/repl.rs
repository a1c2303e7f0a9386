use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;

use crate::alias::AliasTable;
use crate::builtins::dispatch;
use crate::config::{build_prompt, ShellConfig};
use crate::error::ShellResult;
use crate::execution::{run_pipeline, Launch};
use crate::expansion::prepare_argv;
use crate::history::History;
use crate::io_helpers::LineSource;
use crate::parse::{build_pipeline, tokenize_raw};

/// Everything that survives from one line to the next.
#[derive(Default)]
pub(crate) struct ShellState {
    pub(crate) aliases: AliasTable,
    pub(crate) history: History,
    pub(crate) config: ShellConfig,
    pub(crate) last_status: i32,
    pub(crate) trace: bool,
    // Set by the SIGINT handler; cleared after each line.
    pub(crate) interrupted: Arc<AtomicBool>,
}

impl ShellState {
    pub(crate) fn new(config: ShellConfig, trace: bool, interrupted: Arc<AtomicBool>) -> Self {
        ShellState {
            config,
            trace,
            interrupted,
            ..ShellState::default()
        }
    }
}

/// Read and run lines until the source is exhausted.
///
/// Returns early only for fatal errors; everything else is reported and the
/// loop moves on to the next line.
pub(crate) fn run(state: &mut ShellState, source: &mut LineSource) -> ShellResult<()> {
    loop {
        let cwd = env::current_dir().unwrap_or_else(|_| "/".into());
        let prompt = build_prompt(
            source.is_interactive(),
            &state.config.prompt,
            state.last_status,
            &cwd,
        );
        let Some(line) = source.next_line(&prompt)? else {
            if source.is_interactive() {
                println!();
            }
            return Ok(());
        };

        let trimmed = line.trim();
        if !trimmed.is_empty() {
            source.remember(trimmed);
        }
        match run_line(state, trimmed) {
            Ok(status) => state.last_status = status,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                eprintln!("{}", err.display_with_input(trimmed));
                state.last_status = err.status();
            }
        }
        if state.interrupted.swap(false, Ordering::SeqCst) {
            debug!("signal event=interrupt status={}", state.last_status);
        }
    }
}

/// Run one input line and return its status.
pub(crate) fn run_line(state: &mut ShellState, line: &str) -> ShellResult<i32> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(state.last_status);
    }
    state.history.record(line);

    let tokens = tokenize_raw(line)?;
    trace_tokens(state, "tokens", &tokens);

    let expanded = state.aliases.expand(&tokens)?;
    let (text, tokens) = if expanded == tokens {
        (line.to_string(), tokens)
    } else {
        trace_tokens(state, "alias", &expanded);
        (expanded.join(" "), expanded)
    };

    let pipeline = build_pipeline(&text, &tokens)?;
    if pipeline.is_compound() {
        trace_tokens(state, "stages", &pipeline.stages);
        return run_pipeline(state, &pipeline);
    }

    let argv = prepare_argv(tokens);
    trace_tokens(state, "argv", &argv);
    dispatch(state, &argv, Launch::Spawn)
}

pub(crate) fn trace_tokens(state: &ShellState, label: &str, tokens: &[String]) {
    if state.trace {
        eprintln!("trace: {label}: {tokens:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, PipelineError};
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn blank_lines_are_not_recorded() {
        let mut state = ShellState::default();
        state.last_status = 3;
        assert_eq!(run_line(&mut state, "   ").unwrap(), 3);
        assert!(state.history.is_empty());
    }

    #[test]
    fn builtins_mutate_the_shell_itself() {
        let mut state = ShellState::default();
        assert_eq!(run_line(&mut state, "alias ll \"ls -la\"").unwrap(), 0);
        assert_eq!(state.aliases.lookup("ll"), Some("ls -la"));
        assert_eq!(state.history.entries(), ["alias ll \"ls -la\""]);
    }

    #[test]
    fn invalid_lines_record_history_but_run_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("never.txt");
        let mut state = ShellState::default();
        let line = format!("echo hi > {} | cat", out.display());
        let err = run_line(&mut state, &line).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Pipeline(PipelineError::MisplacedRedirection)
        );
        assert!(!out.exists());
        assert_eq!(state.history.len(), 1);

        let err = run_line(&mut state, "echo \"open").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    #[serial]
    fn alias_with_pipe_forms_a_pipeline() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("up.txt");
        let mut state = ShellState::default();
        state.aliases.add("shout", "tr a-z A-Z").unwrap();
        let line = format!("echo quiet | shout > {}", out.display());
        assert_eq!(run_line(&mut state, &line).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "QUIET\n");
    }

    #[test]
    #[serial]
    fn redirected_builtin_does_not_touch_the_parent() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("alias.txt");
        let mut state = ShellState::default();
        let line = format!("alias x y > {}", out.display());
        assert_eq!(run_line(&mut state, &line).unwrap(), 0);
        assert!(state.aliases.is_empty());
    }
}
