use std::env;
use std::path::PathBuf;
use std::process;

use log::{debug, warn};

mod alias;
mod builtins;
mod config;
mod error;
mod execution;
mod expansion;
mod history;
mod io_helpers;
mod parse;
mod repl;
mod signals;

use config::load_config;
use io_helpers::LineSource;
use repl::ShellState;
use signals::install_interrupt_flag;

struct Options {
    trace: bool,
    script: Option<PathBuf>,
}

fn main() {
    init_logging();
    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("minishell: {msg}");
            eprintln!("usage: minishell [-x] [script]");
            process::exit(2);
        }
    };

    let interrupted = match install_interrupt_flag() {
        Ok(flag) => flag,
        Err(err) => {
            eprintln!("minishell: {err}");
            process::exit(1);
        }
    };
    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            warn!("config event=load-failed error={}", err);
            eprintln!("config error: {err}");
            Default::default()
        }
    };

    let mut source = match &options.script {
        Some(path) => match LineSource::script(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("minishell: {}: {err}", path.display());
                process::exit(1);
            }
        },
        None if is_terminal() => match LineSource::interactive(config.edit_mode) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("minishell: {err}");
                process::exit(1);
            }
        },
        None => LineSource::stdin(),
    };
    debug!(
        "shell event=start interactive={} script={:?}",
        source.is_interactive(),
        options.script
    );

    let mut state = ShellState::new(config, options.trace, interrupted);
    if let Err(err) = repl::run(&mut state, &mut source) {
        eprintln!("{}", err.display_simple());
        process::exit(1);
    }
    process::exit(0);
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        trace: false,
        script: None,
    };
    for arg in args {
        if arg == "-x" {
            options.trace = true;
        } else if arg.starts_with('-') && arg.len() > 1 {
            return Err(format!("unknown option '{arg}'"));
        } else if options.script.is_none() {
            options.script = Some(PathBuf::from(arg));
        } else {
            return Err("only one script may be given".to_string());
        }
    }
    Ok(options)
}

fn is_terminal() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

fn init_logging() {
    let env = env_logger::Env::default().filter_or("MINISHELL_LOG", "info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
