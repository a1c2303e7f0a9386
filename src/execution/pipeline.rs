use std::fs::File;
use std::os::fd::AsRawFd;

use log::{debug, warn};

use crate::builtins::dispatch;
use crate::error::ShellResult;
use crate::expansion::prepare_argv;
use crate::parse::{resolve_redirections, tokenize_raw, Pipeline, ResolvedCommand};
use crate::repl::ShellState;

use super::redirection::{open_output, run_per_line};
use super::{spawn, wait, Binding, Launch, PipeSet, ProcessHandle};

/// A stage parsed in the parent, its output file already open.
struct Stage {
    command: ResolvedCommand,
    output: Option<File>,
}

/// Fork one child per stage, wire them together and wait for all of them.
///
/// The line's status is the last stage's exit status. A pipe or fork
/// failure stops the launch; children already started are reaped before the
/// error is returned.
pub fn run_pipeline(state: &mut ShellState, pipeline: &Pipeline) -> ShellResult<i32> {
    let count = pipeline.stages.len();
    debug!("pipeline event=start stages={}", count);

    let pipes = PipeSet::new(count.saturating_sub(1))?;
    let mut handles = Vec::with_capacity(count);

    for (idx, text) in pipeline.stages.iter().enumerate() {
        let stage = prepare_stage(text);
        let mut bindings = pipes.bindings_for(idx);
        if let Ok(Stage {
            output: Some(file), ..
        }) = &stage
        {
            bindings.stdout = Binding::Fd(file.as_raw_fd());
        }
        // The parent's copy of the output file closes when `spawn` drops the body.
        match spawn(idx, bindings, &pipes, || run_stage(state, text, stage)) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                drop(pipes);
                warn!(
                    "pipeline event=abort stage={} started={} error={}",
                    idx,
                    handles.len(),
                    err.message
                );
                reap(&handles);
                return Err(err);
            }
        }
    }

    // The parent keeps no pipe end; readers see EOF once writers exit.
    drop(pipes);
    let statuses = reap(&handles);
    let status = statuses.last().copied().unwrap_or(0);
    debug!("pipeline event=done stages={} status={}", count, status);
    Ok(status)
}

fn reap(handles: &[ProcessHandle]) -> Vec<i32> {
    handles
        .iter()
        .map(|handle| match wait(handle) {
            Ok(status) => {
                debug!(
                    "process event=reap stage={} pid={} status={}",
                    handle.stage, handle.pid, status
                );
                status
            }
            Err(err) => {
                warn!("process event=wait-failed pid={} error={}", handle.pid, err.message);
                eprintln!("{}", err.display_simple());
                1
            }
        })
        .collect()
}

fn prepare_stage(text: &str) -> ShellResult<Stage> {
    let command = resolve_redirections(tokenize_raw(text)?)?;
    let output = command.output.as_ref().map(open_output).transpose()?;
    if let Some(spec) = &command.output {
        debug!(
            "redirect event=bind kind={:?} target={}",
            spec.kind, spec.target
        );
    }
    Ok(Stage { command, output })
}

/// Body of a stage child. Errors from preparing the stage in the parent are
/// reported here so they stay local to the stage.
fn run_stage(state: &mut ShellState, text: &str, stage: ShellResult<Stage>) -> i32 {
    match stage.and_then(|stage| execute_stage(state, stage.command)) {
        Ok(status) => status,
        Err(err) => {
            eprintln!("{}", err.display_with_input(text));
            err.status()
        }
    }
}

fn execute_stage(state: &mut ShellState, command: ResolvedCommand) -> ShellResult<i32> {
    if command.argv.is_empty() {
        return Ok(0);
    }
    match &command.input {
        Some(input) => run_per_line(state, command.base(), input),
        None => {
            let argv = prepare_argv(command.argv);
            dispatch(state, &argv, Launch::Exec)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::build_pipeline;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    fn launch(line: &str) -> ShellResult<i32> {
        let tokens = tokenize_raw(line)?;
        let pipeline = build_pipeline(line, &tokens)?;
        let mut state = ShellState::default();
        run_pipeline(&mut state, &pipeline)
    }

    #[test]
    #[serial]
    fn pipeline_output_reaches_the_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let line = format!("echo hello world | tr a-z A-Z > {}", out.display());
        assert_eq!(launch(&line).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "HELLO WORLD\n");
    }

    #[test]
    #[serial]
    fn status_is_the_last_stage() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let line = format!("definitely-not-a-command-xyz | echo after > {}", out.display());
        assert_eq!(launch(&line).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "after\n");

        assert_eq!(launch("echo hi | definitely-not-a-command-xyz").unwrap(), 127);
    }

    #[test]
    #[serial]
    fn redirected_builtin_runs_in_a_child() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("pwd.txt");
        let line = format!("pwd > {}", out.display());
        assert_eq!(launch(&line).unwrap(), 0);
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            format!("{}\n", cwd.display())
        );
    }

    #[test]
    #[serial]
    fn read_base_ignores_words_after_the_target() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "x\n").unwrap();
        let line = format!(
            "echo a < {} b > {}",
            input.display(),
            out.display()
        );
        assert_eq!(launch(&line).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "a x\n");
    }

    #[test]
    #[serial]
    fn output_file_is_created_for_an_empty_command() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("empty.txt");
        fs::write(&out, "stale\n").unwrap();
        assert_eq!(launch(&format!("> {}", out.display())).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    #[serial]
    fn unwritable_output_fails_only_that_stage() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("no-such-dir").join("out.txt");
        let line = format!("echo hi > {}", out.display());
        assert_eq!(launch(&line).unwrap(), 1);
        assert!(!out.exists());
    }

    #[test]
    #[serial]
    fn missing_input_fails_only_that_command() {
        let dir = tempdir().unwrap();
        let line = format!("echo < {}", dir.path().join("absent").display());
        assert_eq!(launch(&line).unwrap(), 1);
    }
}
