//! Process launch.
//!
//! `spawn` forks a child that applies an explicit `StdioBindings` before
//! running its body, and `wait` collects the child's status. Pipes live in a
//! `PipeSet` owned by the parent; dropping it closes every end.
use std::fmt;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::panic::{self, AssertUnwindSafe};
use std::process;

use log::debug;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, fork, pipe, ForkResult, Pid};

use crate::error::{ErrorKind, ProcessError, ShellError, ShellResult};
use crate::signals::reset_child_signals;

mod pipeline;
mod redirection;
mod spawning;

pub use pipeline::run_pipeline;
pub use spawning::{exec_external, run_external};

/// How a command that is not a builtin gets started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Spawn a child and wait for it.
    Spawn,
    /// Replace the current process, which is already a forked stage.
    Exec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Inherit,
    Fd(RawFd),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Binding::Inherit => write!(f, "inherit"),
            Binding::Fd(fd) => write!(f, "fd:{fd}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdioBindings {
    pub stdin: Binding,
    pub stdout: Binding,
    pub stderr: Binding,
}

impl StdioBindings {
    pub fn inherit() -> Self {
        StdioBindings {
            stdin: Binding::Inherit,
            stdout: Binding::Inherit,
            stderr: Binding::Inherit,
        }
    }

    fn apply(&self) -> nix::Result<()> {
        bind(self.stdin, libc::STDIN_FILENO)?;
        bind(self.stdout, libc::STDOUT_FILENO)?;
        bind(self.stderr, libc::STDERR_FILENO)
    }
}

fn bind(binding: Binding, target: RawFd) -> nix::Result<()> {
    match binding {
        Binding::Fd(fd) if fd != target => retry(|| dup2(fd, target)).map(|_| ()),
        _ => Ok(()),
    }
}

/// A forked child that has not been reaped yet.
#[derive(Debug)]
pub struct ProcessHandle {
    pub pid: Pid,
    pub stage: usize,
    pub bindings: StdioBindings,
}

/// The `N - 1` pipes connecting the stages of an `N`-stage pipeline.
#[derive(Debug)]
pub struct PipeSet {
    pipes: Vec<(OwnedFd, OwnedFd)>,
}

impl PipeSet {
    pub fn new(count: usize) -> ShellResult<Self> {
        let mut pipes = Vec::with_capacity(count);
        for _ in 0..count {
            let ends = pipe().map_err(|err| {
                ShellError::new(
                    ErrorKind::Process(ProcessError::PipeCreateFailed),
                    format!("pipe: {err}"),
                )
            })?;
            pipes.push(ends);
        }
        Ok(PipeSet { pipes })
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Stage `i` reads from pipe `i - 1` and writes to pipe `i`.
    pub fn bindings_for(&self, stage: usize) -> StdioBindings {
        let stdin = match stage.checked_sub(1).and_then(|prev| self.pipes.get(prev)) {
            Some((read, _)) => Binding::Fd(read.as_raw_fd()),
            None => Binding::Inherit,
        };
        let stdout = match self.pipes.get(stage) {
            Some((_, write)) => Binding::Fd(write.as_raw_fd()),
            None => Binding::Inherit,
        };
        StdioBindings {
            stdin,
            stdout,
            stderr: Binding::Inherit,
        }
    }

    /// Close every pipe end in a child once its bindings are in place.
    ///
    /// The child never returns, so the `OwnedFd`s are not dropped twice.
    fn close_in_child(&self) {
        for (read, write) in &self.pipes {
            let _ = close(read.as_raw_fd());
            let _ = close(write.as_raw_fd());
        }
    }
}

/// Fork a child that runs `body` with `bindings` applied and exits with its
/// return value. Only the parent returns from this function.
pub fn spawn<F>(
    stage: usize,
    bindings: StdioBindings,
    pipes: &PipeSet,
    body: F,
) -> ShellResult<ProcessHandle>
where
    F: FnOnce() -> i32,
{
    flush_stdio();
    // SAFETY: the shell is single-threaded, and the child only runs shell
    // code before it exits or execs.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!(
                "process event=fork stage={} pid={} stdin={} stdout={}",
                stage, child, bindings.stdin, bindings.stdout
            );
            Ok(ProcessHandle {
                pid: child,
                stage,
                bindings,
            })
        }
        Ok(ForkResult::Child) => {
            let status = run_child(bindings, pipes, body);
            process::exit(status)
        }
        Err(err) => Err(ShellError::new(
            ErrorKind::Process(ProcessError::ForkFailed),
            format!("fork: {err}"),
        )),
    }
}

fn run_child<F>(bindings: StdioBindings, pipes: &PipeSet, body: F) -> i32
where
    F: FnOnce() -> i32,
{
    if let Err(err) = bindings.apply() {
        eprintln!("minishell: dup2: {err}");
        return 1;
    }
    pipes.close_in_child();
    reset_child_signals();
    // A panicking stage must never unwind back into the shell loop.
    let status = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or(101);
    flush_stdio();
    status
}

/// Block until the child exits; a signal death maps to `128 + signo`.
pub fn wait(handle: &ProcessHandle) -> ShellResult<i32> {
    loop {
        match waitpid(handle.pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(err) => {
                return Err(ShellError::new(
                    ErrorKind::Process(ProcessError::WaitFailed),
                    format!("waitpid {}: {err}", handle.pid),
                ))
            }
        }
    }
}

fn retry<T>(f: impl Fn() -> nix::Result<T>) -> nix::Result<T> {
    loop {
        match f() {
            Err(Errno::EINTR) => continue,
            result => return result,
        }
    }
}

pub(crate) fn flush_stdio() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs::File;
    use std::io::Read;
    use std::mem::ManuallyDrop;
    use std::os::fd::FromRawFd;

    #[test]
    fn bindings_follow_pipe_positions() {
        let pipes = PipeSet::new(2).unwrap();
        assert_eq!(pipes.len(), 2);

        let first = pipes.bindings_for(0);
        assert_eq!(first.stdin, Binding::Inherit);
        assert!(matches!(first.stdout, Binding::Fd(_)));

        let middle = pipes.bindings_for(1);
        assert!(matches!(middle.stdin, Binding::Fd(_)));
        assert!(matches!(middle.stdout, Binding::Fd(_)));
        assert_ne!(middle.stdin, first.stdout);

        let last = pipes.bindings_for(2);
        assert_eq!(last.stdin, Binding::Fd(pipes.pipes[1].0.as_raw_fd()));
        assert_eq!(last.stdout, Binding::Inherit);
        assert_eq!(last.stderr, Binding::Inherit);
    }

    #[test]
    fn single_stage_inherits_everything() {
        let pipes = PipeSet::new(0).unwrap();
        assert!(pipes.is_empty());
        assert_eq!(pipes.bindings_for(0), StdioBindings::inherit());
    }

    #[test]
    #[serial]
    fn spawn_reports_exit_status() {
        let pipes = PipeSet::new(0).unwrap();
        let handle = spawn(0, StdioBindings::inherit(), &pipes, || 7).unwrap();
        assert_eq!(wait(&handle).unwrap(), 7);
    }

    #[test]
    #[serial]
    fn child_writes_through_its_pipe() {
        let pipes = PipeSet::new(1).unwrap();
        let bindings = pipes.bindings_for(0);
        // libtest captures print!, so write to fd 1 directly.
        let handle = spawn(0, bindings, &pipes, || {
            let mut stdout = ManuallyDrop::new(unsafe { File::from_raw_fd(libc::STDOUT_FILENO) });
            stdout.write_all(b"through the pipe").map_or(1, |_| 0)
        })
        .unwrap();
        let read_end = pipes.pipes[0].0.try_clone().unwrap();
        drop(pipes);
        assert_eq!(wait(&handle).unwrap(), 0);

        let mut out = String::new();
        File::from(read_end).read_to_string(&mut out).unwrap();
        assert_eq!(out, "through the pipe");
    }
}
