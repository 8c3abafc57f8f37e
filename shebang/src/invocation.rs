use crate::target::TargetDescriptor;

/// Re-splits the arguments on single spaces.
///
/// The kernel hands everything after the interpreter on a `#!` line over as
/// one argument, so `shebang -d "gcc !+" f.c` may arrive as two, three or
/// four arguments depending on how it was started. Joining and splitting again
/// gives the same tokens either way. Arguments with embedded spaces do not
/// survive this.
pub fn flatten_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = args
        .into_iter()
        .map(|arg| arg.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(" ");

    if joined.is_empty() {
        return vec![];
    }
    joined.split(' ').map(str::to_owned).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command_template: String,
    pub target_path: String,
    /// Echo the final command before running it.
    pub verbose: bool,
    /// Legacy `-r`: always run against a stripped temp file.
    pub strip: bool,
}

impl Invocation {
    /// The last token is the target, everything before it is the command.
    /// Returns `None` when there aren't at least two tokens.
    pub fn from_tokens(tokens: &[String], verbose: bool, strip: bool) -> Option<Self> {
        let (target_path, command) = tokens.split_last()?;
        if command.is_empty() {
            return None;
        }
        let command = command.join(" ");

        Some(Self {
            command_template: unquote(&command).to_owned(),
            target_path: target_path.clone(),
            verbose,
            strip,
        })
    }

    pub fn target(&self) -> TargetDescriptor {
        TargetDescriptor::new(&self.target_path)
    }
}

/// Drops the quotes a `#!` line like `#!/usr/bin/shebang "gcc !+"` leaves
/// around the command. Only a single enclosing pair is removed.
fn unquote(command: &str) -> &str {
    match command
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) if !inner.contains('"') => inner,
        _ => command,
    }
}
