//! Interpreter for `#!` lines.
//!
//! A script starting with `#!/usr/bin/shebang "gcc -o !- !~ && !-"` is run by
//! expanding `!(alias)` references from `.shebang_alias` files, substituting
//! the `!x` meta-strings with pieces of the script's path, and handing the
//! result to `sh -c`. `!~` and `!+` stand for a copy of the script without its
//! `#!` line, as a fifo or a temp file, which is removed once the command is
//! done.

pub mod alias;
pub mod error;
pub mod invocation;
pub mod launcher;
pub mod meta;
pub mod resource;
pub mod target;

use tracing::debug;

pub use alias::{Alias, AliasSources};
pub use error::{Error, Result};
pub use invocation::{flatten_args, Invocation};
pub use launcher::{Launcher, ShellLauncher};
pub use meta::MetaString;
pub use resource::{ResourceKind, Resources, StrippedResource};
pub use target::TargetDescriptor;

/// Expands `template` the way `-r` asks for: the target itself is replaced by
/// the stripped temp file, which is appended if nothing refers to it.
pub fn force_stripped_file(template: &str) -> String {
    let mut cmd = meta::retarget(template, MetaString::Target, MetaString::StrippedFile);
    if !MetaString::scan(&cmd).contains(&MetaString::StrippedFile) {
        cmd.push_str(" !+");
    }
    cmd
}

/// Builds the command for one invocation and runs it.
///
/// Stripped copies live exactly as long as this call, whichever way it
/// returns. Returns the exit code of the command.
pub async fn dispatch<L: Launcher>(
    invocation: &Invocation,
    sources: &AliasSources,
    launcher: &mut L,
) -> Result<i32> {
    let target = invocation.target();

    let aliases = sources.load()?;
    let mut command = alias::expand(&invocation.command_template, &aliases);
    if invocation.strip {
        command = force_stripped_file(&command);
    }

    let used = MetaString::scan(&command);
    let resources = Resources::prepare(
        &target,
        used.contains(&MetaString::StrippedFifo),
        used.contains(&MetaString::StrippedFile),
    )?;

    let values = meta::MetaValues::new(
        &target,
        resources.fifo_path().as_deref(),
        resources.file_path().as_deref(),
    );
    let command = meta::substitute(&command, &values);
    debug!(%command, "assembled command");

    if invocation.verbose {
        println!("{}", command);
    }

    let code = launcher.launch(&command).await?;
    drop(resources);

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_flag_points_target_at_temp_file() {
        assert_eq!(force_stripped_file("guile !@"), "guile !+");
        assert_eq!(force_stripped_file("guile -s !+"), "guile -s !+");
        assert_eq!(force_stripped_file("racket"), "racket !+");
    }
}
