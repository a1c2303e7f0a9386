use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustyline::EditMode;

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Prompt template; `{cwd}` and `{status}` are filled in per line.
    pub prompt: String,
    pub edit_mode: EditMode,
    /// Where `cd` with no arguments goes.
    pub cd_home: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            prompt: "$ ".to_string(),
            edit_mode: EditMode::Emacs,
            cd_home: "/home".to_string(),
        }
    }
}

pub fn build_prompt(interactive: bool, template: &str, last_status: i32, cwd: &Path) -> String {
    if !interactive {
        return String::new();
    }
    template
        .replace("{status}", &last_status.to_string())
        .replace("{cwd}", &cwd.display().to_string())
}

/// `$MINISHELL_RC`, else `~/.minishellrc`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("MINISHELL_RC") {
        return Some(PathBuf::from(path));
    }
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".minishellrc"))
}

/// Load the rc file (if any) and apply environment overrides on top.
///
/// Bad lines are reported as `config:<line>: ...` and skipped; only an
/// unreadable existing file is an error.
pub fn load_config() -> io::Result<ShellConfig> {
    let mut config = ShellConfig::default();
    if let Some(path) = config_path() {
        match fs::read_to_string(&path) {
            Ok(content) => apply_config_text(&mut config, &content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn apply_config_text(config: &mut ShellConfig, content: &str) {
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(err) = apply_setting(config, line) {
            eprintln!("config:{}: {err}", idx + 1);
        }
    }
}

fn apply_setting(config: &mut ShellConfig, line: &str) -> Result<(), String> {
    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| "expected key=value".to_string())?;
    let value = strip_quotes(value.trim());
    match key.trim() {
        "prompt" => config.prompt = value.to_string(),
        "edit_mode" => config.edit_mode = parse_edit_mode(value)?,
        "cd_home" => {
            if value.is_empty() {
                return Err("cd_home must not be empty".to_string());
            }
            config.cd_home = value.to_string();
        }
        other => return Err(format!("unknown key '{other}'")),
    }
    Ok(())
}

fn apply_env_overrides(config: &mut ShellConfig) {
    if let Ok(prompt) = env::var("MINISHELL_PROMPT") {
        config.prompt = prompt;
    }
    if let Ok(mode) = env::var("MINISHELL_EDITMODE") {
        match parse_edit_mode(&mode) {
            Ok(mode) => config.edit_mode = mode,
            Err(err) => eprintln!("MINISHELL_EDITMODE: {err}"),
        }
    }
}

fn parse_edit_mode(value: &str) -> Result<EditMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "vi" => Ok(EditMode::Vi),
        "emacs" => Ok(EditMode::Emacs),
        _ => Err(format!("unknown edit mode '{value}'")),
    }
}

fn strip_quotes(input: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| input.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(input)
}
