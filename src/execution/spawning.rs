use std::fs;
use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, ExitStatus};

use log::debug;

use crate::error::{ErrorKind, ProcessError, ShellError, ShellResult};

use super::flush_stdio;

/// Run a program found through `PATH` and wait for it.
pub fn run_external(program: &str, args: &[String]) -> ShellResult<i32> {
    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|err| spawn_failure(program, err))?;
    debug!(
        "process event=spawn kind=external program={} pid={}",
        program,
        child.id()
    );
    let status = child.wait().map_err(|err| {
        ShellError::new(
            ErrorKind::Process(ProcessError::WaitFailed),
            format!("{program}: {err}"),
        )
    })?;
    let code = exit_status_code(status);
    debug!("process event=exit program={} status={}", program, code);
    Ok(code)
}

/// Replace the current process with `program`. Returns only on failure.
pub fn exec_external(program: &str, args: &[String]) -> ShellError {
    flush_stdio();
    let err = Command::new(program).args(args).exec();
    wrap_spawn_error(program, err)
}

/// Out of processes or memory means the fork itself failed, which the shell
/// cannot recover from. Anything else is the program's fault.
fn spawn_failure(cmd: &str, err: io::Error) -> ShellError {
    match err.raw_os_error() {
        Some(libc::EAGAIN | libc::ENOMEM) => ShellError::new(
            ErrorKind::Process(ProcessError::ForkFailed),
            format!("fork: {cmd}: {err}"),
        ),
        _ => wrap_spawn_error(cmd, err),
    }
}

fn wrap_spawn_error(cmd: &str, err: io::Error) -> ShellError {
    ShellError::new(
        ErrorKind::Process(ProcessError::ExecFailed),
        spawn_error_message(cmd, &err),
    )
}

fn exit_status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        code
    } else if let Some(sig) = status.signal() {
        128 + sig
    } else {
        1
    }
}

fn spawn_error_message(cmd: &str, err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => format!("{cmd}: command not found"),
        io::ErrorKind::PermissionDenied => {
            if cmd.contains('/') && fs::metadata(cmd).is_ok_and(|meta| meta.is_dir()) {
                format!("{cmd}: is a directory")
            } else {
                format!("{cmd}: permission denied")
            }
        }
        _ => format!("{cmd}: {err}"),
    }
}
