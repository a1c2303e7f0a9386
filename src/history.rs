use crate::error::{ErrorKind, ShellError, ShellResult};

/// Every line the shell attempted to run, in order, duplicates included.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, line: &str) {
        self.entries.push(line.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The first `count` entries; `count` must lie in `0..=len`.
    pub fn first(&self, count: i64) -> ShellResult<&[String]> {
        usize::try_from(count)
            .ok()
            .filter(|&n| n <= self.entries.len())
            .map(|n| &self.entries[..n])
            .ok_or_else(|| {
                ShellError::new(
                    ErrorKind::Usage,
                    format!("history: {count}: out of range"),
                )
                .with_context(format!("{} line(s) recorded", self.entries.len()))
            })
    }
}

/// Render entries numbered from 1.
pub fn format_entries(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, line)| format!("{} {}", idx + 1, line))
        .collect()
}
