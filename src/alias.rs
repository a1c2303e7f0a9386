//! The alias table: insertion-ordered `name -> value` pairs owned by the
//! shell state and passed by reference to whatever needs them.
use std::fmt;

use crate::error::{AliasError, ErrorKind, ShellError, ShellResult};
use crate::parse::{tokenize_raw, Operator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub name: String,
    pub value: String,
}

impl fmt::Display for AliasEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}='{}'", self.name, self.value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn add(&mut self, name: &str, value: &str) -> ShellResult<()> {
        if self.exists(name) {
            return Err(alias_error(AliasError::AlreadyExists, name));
        }
        self.entries.push(AliasEntry {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// Replace the value of an existing alias, keeping its place in the list.
    pub fn update(&mut self, name: &str, value: &str) -> ShellResult<()> {
        let idx = self
            .position(name)
            .ok_or_else(|| alias_error(AliasError::NotFound, name))?;
        self.entries[idx].value = value.to_string();
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> ShellResult<AliasEntry> {
        let idx = self
            .position(name)
            .ok_or_else(|| alias_error(AliasError::NotFound, name))?;
        Ok(self.entries.remove(idx))
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|idx| self.entries[idx].value.as_str())
    }

    /// Like `lookup`, but a missing name is an error.
    pub fn get(&self, name: &str) -> ShellResult<&AliasEntry> {
        self.position(name)
            .map(|idx| &self.entries[idx])
            .ok_or_else(|| alias_error(AliasError::NotFound, name))
    }

    pub fn list(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Substitute aliases at every command position of a raw token list.
    ///
    /// A command position is the first token and the token after each `|`.
    /// The value is re-tokenized and spliced in place of the name; the
    /// result is never looked up again, so `alias ls "ls -F"` terminates.
    pub fn expand(&self, tokens: &[String]) -> ShellResult<Vec<String>> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut command_position = true;
        for token in tokens {
            let is_pipe = Operator::parse(token) == Some(Operator::Pipe);
            match self.lookup(token) {
                Some(value) if command_position && !is_pipe => {
                    let words = tokenize_raw(value).map_err(|mut err| {
                        err.position = None;
                        err.with_context(format!("while expanding alias '{token}'"))
                    })?;
                    out.extend(words);
                }
                _ => out.push(token.clone()),
            }
            command_position = is_pipe;
        }
        Ok(out)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}

fn alias_error(kind: AliasError, name: &str) -> ShellError {
    let message = match kind {
        AliasError::AlreadyExists => format!("{name}: alias already exists"),
        AliasError::NotFound => format!("{name}: not found"),
    };
    ShellError::new(ErrorKind::Alias(kind), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_lookup_remove() {
        let mut table = AliasTable::new();
        table.add("ll", "ls -la").unwrap();
        assert!(table.exists("ll"));
        assert_eq!(table.lookup("ll"), Some("ls -la"));
        assert_eq!(table.get("ll").unwrap().to_string(), "ll='ls -la'");

        let err = table.add("ll", "ls").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Alias(AliasError::AlreadyExists));

        let removed = table.remove("ll").unwrap();
        assert_eq!(removed.value, "ls -la");
        assert!(table.is_empty());
        let err = table.remove("ll").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Alias(AliasError::NotFound));
        assert!(table.get("ll").is_err());
    }

    #[test]
    fn list_keeps_insertion_order_across_updates() {
        let mut table = AliasTable::new();
        table.add("b", "two").unwrap();
        table.add("a", "one").unwrap();
        table.update("b", "deux").unwrap();
        let names: Vec<String> = table.list().iter().map(|e| e.to_string()).collect();
        assert_eq!(names, vec!["b='deux'", "a='one'"]);
        assert!(table.update("zz", "x").is_err());
    }

    #[test]
    fn expand_first_token_and_keep_rest() {
        let mut table = AliasTable::new();
        table.add("ll", "ls -la").unwrap();
        let out = table.expand(&strings(&["ll", "/tmp", "ll"])).unwrap();
        assert_eq!(out, strings(&["ls", "-la", "/tmp", "ll"]));
    }

    #[test]
    fn expand_after_each_pipe() {
        let mut table = AliasTable::new();
        table.add("up", "tr a-z A-Z").unwrap();
        let out = table.expand(&strings(&["echo", "up", "|", "up"])).unwrap();
        assert_eq!(out, strings(&["echo", "up", "|", "tr", "a-z", "A-Z"]));
    }

    #[test]
    fn expansion_is_single_level() {
        let mut table = AliasTable::new();
        table.add("ls", "ls -F").unwrap();
        table.add("a", "b").unwrap();
        table.add("b", "echo loop").unwrap();
        assert_eq!(table.expand(&strings(&["ls"])).unwrap(), strings(&["ls", "-F"]));
        assert_eq!(table.expand(&strings(&["a"])).unwrap(), strings(&["b"]));
    }

    #[test]
    fn value_with_quotes_is_retokenized_raw() {
        let mut table = AliasTable::new();
        table.add("say", "echo \"a | b\"").unwrap();
        let out = table.expand(&strings(&["say", "x"])).unwrap();
        assert_eq!(out, strings(&["echo", "\"a | b\"", "x"]));
    }

    #[test]
    fn broken_value_names_the_alias() {
        let mut table = AliasTable::new();
        table.add("bad", "echo \"open").unwrap();
        let err = table.expand(&strings(&["bad"])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert_eq!(err.position, None);
        assert_eq!(err.context.as_deref(), Some("while expanding alias 'bad'"));
    }

    #[test]
    fn quoted_name_is_not_expanded() {
        let mut table = AliasTable::new();
        table.add("ll", "ls -la").unwrap();
        let out = table.expand(&strings(&["\"ll\""])).unwrap();
        assert_eq!(out, strings(&["\"ll\""]));
    }
}
