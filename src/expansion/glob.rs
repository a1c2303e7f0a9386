use std::path::{Component, Path};

use glob::{glob_with, MatchOptions};

// Leading dots are handled by `hides_dotfile` rather than by the matcher.
const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub fn has_wildcard(token: &str) -> bool {
    token.contains(['*', '?'])
}

/// Filesystem matches for `pattern`, sorted. Empty on a miss, on an invalid
/// pattern, and for entries that could not be read.
///
/// A wildcard component only matches a dotfile when it starts with a
/// literal `.` itself.
pub fn glob_pattern(pattern: &str) -> Vec<String> {
    let Ok(paths) = glob_with(pattern, OPTIONS) else {
        return Vec::new();
    };
    let mut matches: Vec<String> = paths
        .filter_map(Result::ok)
        .filter(|path| !hides_dotfile(pattern, path))
        .map(|path| path.display().to_string())
        .collect();
    matches.sort();
    matches
}

fn hides_dotfile(pattern: &str, path: &Path) -> bool {
    let wanted = Path::new(pattern).components().rev();
    let found = path.components().rev();
    // `/` must match literally, so components line up from the leaf back.
    wanted.zip(found).any(|(want, got)| match (want, got) {
        (Component::Normal(want), Component::Normal(got)) => {
            let want = want.to_string_lossy();
            has_wildcard(&want)
                && !want.starts_with('.')
                && got.to_string_lossy().starts_with('.')
        }
        _ => false,
    })
}
