use std::env;
use std::io::{self, Write};
use std::process;

use log::debug;

use crate::error::{ErrorKind, ShellError, ShellResult};
use crate::execution::{exec_external, flush_stdio, run_external, Launch};
use crate::expansion::expand_tilde;
use crate::history::format_entries;
use crate::repl::ShellState;

pub const BUILTINS: [&str; 7] = ["exit", "pwd", "cd", "alias", "unalias", "echo", "history"];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Run a prepared argv: builtins in this process, anything else as a
/// program. Errors are reported on stderr and turned into a status, except
/// fatal ones, which are returned.
pub fn dispatch(state: &mut ShellState, argv: &[String], launch: Launch) -> ShellResult<i32> {
    let Some((name, args)) = argv.split_first() else {
        return Ok(0);
    };

    let result = if is_builtin(name) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        execute_builtin(state, name, args, &mut out).map(|()| 0)
    } else {
        match launch {
            Launch::Spawn => run_external(name, args),
            Launch::Exec => Err(exec_external(name, args)),
        }
    };

    match result {
        Ok(status) => Ok(status),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            eprintln!("{}", err.display_simple());
            Ok(err.status())
        }
    }
}

pub fn execute_builtin(
    state: &mut ShellState,
    name: &str,
    args: &[String],
    out: &mut dyn Write,
) -> ShellResult<()> {
    match name {
        "exit" => {
            out.flush()?;
            flush_stdio();
            process::exit(0);
        }
        "pwd" => {
            let cwd = env::current_dir()?;
            writeln!(out, "{}", cwd.display())?;
        }
        "cd" => {
            let target = match args {
                [] => state.config.cd_home.clone(),
                [dir] => {
                    let home = env::var("HOME").ok();
                    expand_tilde(dir, home.as_deref()).into_owned()
                }
                _ => return Err(usage("cd: too many arguments", "cd [dir]")),
            };
            env::set_current_dir(&target).map_err(|err| {
                ShellError::new(ErrorKind::File, format!("cd: {target}: {err}"))
            })?;
            debug!("builtin event=cd target={}", target);
        }
        "alias" => match args {
            [] => {
                for entry in state.aliases.list() {
                    writeln!(out, "{entry}")?;
                }
            }
            [name] => {
                let entry = state.aliases.get(name)?;
                writeln!(out, "{entry}")?;
            }
            [name, value] => {
                if state.aliases.exists(name) {
                    state.aliases.update(name, value)?;
                } else {
                    state.aliases.add(name, value)?;
                }
                debug!("alias event=set name={} value={}", name, value);
            }
            _ => return Err(usage("alias: too many arguments", "alias [name [value]]")),
        },
        "unalias" => match args {
            [name] => {
                state.aliases.remove(name)?;
                debug!("alias event=remove name={}", name);
            }
            _ => return Err(usage("unalias: expected one name", "unalias name")),
        },
        "echo" => {
            writeln!(out, "{}", args.join(" "))?;
        }
        "history" => {
            let entries = match args {
                [] => state.history.entries(),
                [count] => {
                    let count = count.parse::<i64>().map_err(|_| {
                        usage(
                            &format!("history: {count}: numeric argument required"),
                            "history [count]",
                        )
                    })?;
                    state.history.first(count)?
                }
                _ => return Err(usage("history: too many arguments", "history [count]")),
            };
            for line in format_entries(entries) {
                writeln!(out, "{line}")?;
            }
        }
        _ => {
            return Err(ShellError::new(
                ErrorKind::Usage,
                format!("{name}: not a builtin"),
            ))
        }
    }
    Ok(())
}

fn usage(message: &str, synopsis: &str) -> ShellError {
    ShellError::new(ErrorKind::Usage, message).with_context(format!("Usage: {synopsis}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AliasError;
    use serial_test::serial;
    use tempfile::tempdir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn run(state: &mut ShellState, line: &[&str]) -> (ShellResult<()>, String) {
        let argv = strings(line);
        let mut out = Vec::new();
        let result = execute_builtin(state, &argv[0], &argv[1..], &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn builtin_names() {
        for name in BUILTINS {
            assert!(is_builtin(name));
        }
        assert!(!is_builtin("ls"));
        assert!(!is_builtin("jobs"));
    }

    #[test]
    fn echo_joins_with_single_spaces() {
        let mut state = ShellState::default();
        assert_eq!(run(&mut state, &["echo", "a", "b", "c"]).1, "a b c\n");
        assert_eq!(run(&mut state, &["echo"]).1, "\n");
        assert_eq!(run(&mut state, &["echo", "a | b"]).1, "a | b\n");
    }

    #[test]
    fn alias_round_trip() {
        let mut state = ShellState::default();
        let (result, out) = run(&mut state, &["alias", "ll", "ls -la"]);
        assert!(result.is_ok());
        assert!(out.is_empty());

        assert_eq!(run(&mut state, &["alias", "ll"]).1, "ll='ls -la'\n");

        run(&mut state, &["alias", "ll", "ls -l"]).0.unwrap();
        run(&mut state, &["alias", "g", "grep"]).0.unwrap();
        assert_eq!(run(&mut state, &["alias"]).1, "ll='ls -l'\ng='grep'\n");

        run(&mut state, &["unalias", "ll"]).0.unwrap();
        let (result, out) = run(&mut state, &["alias", "ll"]);
        assert_eq!(
            result.unwrap_err().kind,
            ErrorKind::Alias(AliasError::NotFound)
        );
        assert!(out.is_empty());
    }

    #[test]
    fn alias_and_unalias_arity() {
        let mut state = ShellState::default();
        let err = run(&mut state, &["alias", "a", "b", "c"]).0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Usage);
        let err = run(&mut state, &["unalias"]).0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Usage);
        let err = run(&mut state, &["unalias", "nope"]).0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Alias(AliasError::NotFound));
    }

    #[test]
    fn history_counts() {
        let mut state = ShellState::default();
        for line in ["one", "two", "three", "four", "five"] {
            state.history.record(line);
        }
        assert_eq!(run(&mut state, &["history", "3"]).1, "1 one\n2 two\n3 three\n");
        assert_eq!(run(&mut state, &["history"]).1.lines().count(), 5);

        for bad in ["-1", "6", "x"] {
            let (result, out) = run(&mut state, &["history", bad]);
            assert_eq!(result.unwrap_err().kind, ErrorKind::Usage);
            assert!(out.is_empty());
        }
    }

    #[test]
    #[serial]
    fn cd_and_pwd() {
        let original = env::current_dir().unwrap();
        let dir = tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();
        let mut state = ShellState::default();

        run(&mut state, &["cd", &target.display().to_string()]).0.unwrap();
        assert_eq!(
            run(&mut state, &["pwd"]).1,
            format!("{}\n", target.display())
        );

        let err = run(&mut state, &["cd", "a", "b"]).0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Usage);
        let err = run(&mut state, &["cd", "/definitely/not/here"]).0.unwrap_err();
        assert_eq!(err.kind, ErrorKind::File);

        state.config.cd_home = original.display().to_string();
        run(&mut state, &["cd"]).0.unwrap();
        assert_eq!(env::current_dir().unwrap(), original);
    }

    #[test]
    fn dispatch_reports_missing_program() {
        let mut state = ShellState::default();
        let argv = strings(&["definitely-not-a-command-xyz"]);
        assert_eq!(dispatch(&mut state, &argv, Launch::Spawn).unwrap(), 127);
        assert_eq!(dispatch(&mut state, &[], Launch::Spawn).unwrap(), 0);
    }
}
