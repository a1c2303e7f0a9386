use crate::error::{ErrorKind, ShellError, ShellResult};
use crate::parse::{unquote, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionKind {
    /// Re-run the command once per line of the target file.
    Read,
    Write,
    Append,
}

impl RedirectionKind {
    fn from_operator(op: Operator) -> Option<RedirectionKind> {
        match op {
            Operator::Read => Some(RedirectionKind::Read),
            Operator::Write => Some(RedirectionKind::Write),
            Operator::Append => Some(RedirectionKind::Append),
            Operator::Pipe => None,
        }
    }

    pub fn is_output(self) -> bool {
        !matches!(self, RedirectionKind::Read)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionSpec {
    pub kind: RedirectionKind,
    pub target: String,
}

/// One stage with its redirections pulled out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedCommand {
    /// Remaining raw tokens, quotes still attached.
    pub argv: Vec<String>,
    pub input: Option<RedirectionSpec>,
    pub output: Option<RedirectionSpec>,
    /// How many `argv` tokens preceded the `<` operator.
    pub input_at: Option<usize>,
}

impl ResolvedCommand {
    /// The command re-run for each line of a `<` file: only the words in
    /// front of the operator. Without `<` this is the whole argv.
    pub fn base(&self) -> &[String] {
        match self.input_at {
            Some(at) => &self.argv[..at.min(self.argv.len())],
            None => &self.argv,
        }
    }
}

/// Strip every operator/target pair from a stage's raw tokens.
///
/// The first occurrence of each kind wins; validation has already rejected
/// lines carrying more than one.
pub fn resolve_redirections(tokens: Vec<String>) -> ShellResult<ResolvedCommand> {
    let mut resolved = ResolvedCommand::default();
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        let Some(kind) = Operator::parse(&token).and_then(RedirectionKind::from_operator) else {
            resolved.argv.push(token);
            continue;
        };

        let target = match iter.next() {
            Some(target) if Operator::parse(&target).is_none() => target,
            _ => {
                return Err(ShellError::new(
                    ErrorKind::Parse,
                    format!("Expected a file after '{}'", token),
                )
                .with_context(format!("Usage: cmd {} filename", token)));
            }
        };

        let spec = RedirectionSpec {
            kind,
            target: unquote(&target).into_owned(),
        };
        let slot = if kind.is_output() {
            &mut resolved.output
        } else {
            &mut resolved.input
        };
        if slot.is_none() {
            *slot = Some(spec);
            if kind == RedirectionKind::Read {
                resolved.input_at = Some(resolved.argv.len());
            }
        }
    }

    Ok(resolved)
}
