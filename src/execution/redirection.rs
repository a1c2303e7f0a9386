use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader};

use log::debug;

use crate::builtins::dispatch;
use crate::error::{ErrorKind, ShellError, ShellResult};
use crate::expansion::prepare_argv;
use crate::parse::{tokenize_raw, RedirectionKind, RedirectionSpec};
use crate::repl::ShellState;

use super::Launch;

/// Open an output target: `>` truncates, `>>` appends; both create.
pub fn open_output(spec: &RedirectionSpec) -> ShellResult<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true);
    if spec.kind == RedirectionKind::Append {
        opts.append(true);
    } else {
        opts.truncate(true);
    }
    opts.open(&spec.target)
        .map_err(|err| file_error(&spec.target, err))
}

/// Run `base` once per line of the input file, the line's words appended.
///
/// Invocations are strictly sequential; the status is that of the last one.
/// A fork failure stops the loop and is handed back to the caller.
pub fn run_per_line(
    state: &mut ShellState,
    base: &[String],
    spec: &RedirectionSpec,
) -> ShellResult<i32> {
    let file = File::open(&spec.target).map_err(|err| file_error(&spec.target, err))?;
    let mut status = 0;

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| file_error(&spec.target, err))?;
        let extra = match tokenize_raw(&line) {
            Ok(tokens) => tokens,
            Err(err) => {
                eprintln!("{}:{}: {}", spec.target, idx + 1, err.display_with_input(&line));
                status = err.status();
                continue;
            }
        };
        let mut tokens = base.to_vec();
        tokens.extend(extra);
        let argv = prepare_argv(tokens);
        debug!(
            "redirect event=reinvoke line={} argc={}",
            idx + 1,
            argv.len()
        );
        status = dispatch(state, &argv, Launch::Spawn)?;
    }

    Ok(status)
}

fn file_error(target: &str, err: io::Error) -> ShellError {
    ShellError::new(ErrorKind::File, format!("{target}: {err}"))
}
