use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::vec;

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, EditMode, Editor};

/// Where input lines come from.
pub enum LineSource {
    Interactive(Box<Editor<(), DefaultHistory>>),
    Stdin(io::StdinLock<'static>),
    Script(vec::IntoIter<String>),
}

impl LineSource {
    pub fn interactive(edit_mode: EditMode) -> io::Result<Self> {
        let config = Config::builder()
            .auto_add_history(false)
            .edit_mode(edit_mode)
            .build();
        let editor = Editor::with_config(config).map_err(io::Error::other)?;
        Ok(LineSource::Interactive(Box::new(editor)))
    }

    pub fn stdin() -> Self {
        LineSource::Stdin(io::stdin().lock())
    }

    /// Read the whole script up front; an unreadable file fails here.
    pub fn script(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        Ok(LineSource::Script(lines.into_iter()))
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, LineSource::Interactive(_))
    }

    /// The next line without its terminator, or `None` at end of input.
    /// Ctrl-C at the prompt yields an empty line.
    pub fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self {
            LineSource::Interactive(editor) => match editor.readline(prompt) {
                Ok(line) => Ok(Some(line)),
                Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
                Err(ReadlineError::Eof) => Ok(None),
                Err(err) => Err(io::Error::other(err)),
            },
            LineSource::Stdin(stdin) => {
                let mut line = String::new();
                if stdin.read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                let trimmed = line.trim_end_matches(&['\n', '\r'][..]).len();
                line.truncate(trimmed);
                Ok(Some(line))
            }
            LineSource::Script(lines) => Ok(lines.next()),
        }
    }

    /// Add a line to the editor's recall list.
    pub fn remember(&mut self, line: &str) {
        if let LineSource::Interactive(editor) = self {
            let _ = editor.add_history_entry(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn script_lines_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("script.sh");
        fs::write(&path, "echo one\n\necho two\r\n").unwrap();
        let mut source = LineSource::script(&path).unwrap();
        assert!(!source.is_interactive());
        assert_eq!(source.next_line("").unwrap().as_deref(), Some("echo one"));
        assert_eq!(source.next_line("").unwrap().as_deref(), Some(""));
        assert_eq!(source.next_line("").unwrap().as_deref(), Some("echo two"));
        assert_eq!(source.next_line("").unwrap(), None);
    }

    #[test]
    fn missing_script_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(LineSource::script(&dir.path().join("nope")).is_err());
    }
}
