use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::UserDirs;
use tracing::{debug, trace};

use crate::error::{Error, Result};

pub const ALIAS_FILENAME: &str = ".shebang_alias";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub command: String,
}

impl Alias {
    pub fn reference(&self) -> String {
        format!("!({})", self.name)
    }

    pub fn display(&self) -> String {
        format!("{} -> {}", self.reference(), self.command)
    }
}

/// Parses one `name = command` line. Splits on the first `=`, so commands
/// may contain more of them.
pub fn parse_alias(line: &str) -> Option<Alias> {
    let (name, command) = line.split_once('=')?;
    let trim = |s: &str| s.trim_matches(|c: char| c == ' ' || c == '\t').to_owned();

    Some(Alias {
        name: trim(name),
        command: trim(command),
    })
}

/// Ordered list of directories that may hold a `.shebang_alias` file.
#[derive(Debug, Clone)]
pub struct AliasSources {
    dirs: Vec<PathBuf>,
}

impl AliasSources {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Target's directory, then the working directory, then home, then `/etc`.
    pub fn standard(target_dir: &Path) -> Self {
        let mut dirs = vec![target_dir.to_path_buf(), PathBuf::from(".")];
        match UserDirs::new() {
            Some(ud) => dirs.push(ud.home_dir().to_path_buf()),
            None => debug!("no home directory, skipping user aliases"),
        }
        dirs.push(PathBuf::from("/etc"));

        Self { dirs }
    }

    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.dirs.iter().map(|dir| dir.join(ALIAS_FILENAME))
    }

    pub fn load(&self) -> Result<Vec<Alias>> {
        let mut aliases = vec![];

        for path in self.files() {
            // Only a malformed line is fatal. A location that can't be read
            // (missing, no permission, a directory) is skipped.
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    debug!(path = %path.display(), "skipping unreadable alias file: {}", e);
                    continue;
                }
            };
            let cont = String::from_utf8_lossy(&bytes);

            let before = aliases.len();
            for (num, line) in cont.lines().enumerate() {
                if line.trim().is_empty() || line.starts_with('#') {
                    continue;
                }

                let alias = parse_alias(line).ok_or_else(|| Error::AliasParse {
                    path: path.clone(),
                    line: num + 1,
                    text: line.to_owned(),
                })?;
                trace!("alias {}", alias.display());
                aliases.push(alias);
            }

            debug!(path = %path.display(), count = aliases.len() - before, "loaded alias file");
        }

        Ok(aliases)
    }
}

/// Replaces `!(name)` references, one alias at a time in definition order.
///
/// Not recursive: text an alias inserts is only expanded by aliases that come
/// after it in the list. Anything left over stays in the output literally.
pub fn expand(template: &str, aliases: &[Alias]) -> String {
    let mut cmd = template.to_owned();
    for alias in aliases {
        let reference = alias.reference();
        if cmd.contains(&reference) {
            cmd = cmd.replace(&reference, &alias.command);
        }
    }

    for leftover in unresolved(&cmd) {
        debug!(reference = leftover, "alias reference left unexpanded");
    }

    cmd
}

/// `!(...)` references still present in `cmd`.
pub fn unresolved(cmd: &str) -> Vec<&str> {
    let mut found = vec![];
    let mut rest = cmd;
    while let Some(start) = rest.find("!(") {
        let Some(len) = rest[start..].find(')') else {
            break;
        };
        found.push(&rest[start..start + len + 1]);
        rest = &rest[start + len + 1..];
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(name: &str, command: &str) -> Alias {
        Alias {
            name: name.to_owned(),
            command: command.to_owned(),
        }
    }

    #[test]
    fn parse_trims_spaces_and_tabs() {
        assert_eq!(
            parse_alias(" c \t=\tgcc -o !- !~ && !- "),
            Some(alias("c", "gcc -o !- !~ && !-"))
        );
    }

    #[test]
    fn parse_splits_on_first_equals() {
        assert_eq!(
            parse_alias("env = FOO=bar !@"),
            Some(alias("env", "FOO=bar !@"))
        );
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert_eq!(parse_alias("just a command"), None);
    }

    #[test]
    fn expands_single_alias() {
        let aliases = [alias("c", "gcc -o !- !~ && !-")];
        assert_eq!(expand("!(c)", &aliases), "gcc -o !- !~ && !-");
    }

    #[test]
    fn expands_every_occurrence() {
        let aliases = [alias("x", "echo")];
        assert_eq!(expand("!(x) a; !(x) b", &aliases), "echo a; echo b");
    }

    #[test]
    fn later_aliases_expand_inside_earlier_ones() {
        let aliases = [alias("run", "!(cc) && ./!-"), alias("cc", "gcc -o !- !+")];
        assert_eq!(expand("!(run)", &aliases), "gcc -o !- !+ && ./!-");
    }

    #[test]
    fn forward_and_self_references_are_left_alone() {
        let aliases = [alias("cc", "gcc"), alias("run", "!(cc) !(run)")];
        assert_eq!(expand("!(run)", &aliases), "!(cc) !(run)");
    }

    #[test]
    fn first_duplicate_wins() {
        let aliases = [alias("py", "python3"), alias("py", "python2")];
        assert_eq!(expand("!(py) !@", &aliases), "python3 !@");
    }

    #[test]
    fn expansion_is_idempotent_without_forward_references() {
        let aliases = [alias("a", "echo !(b)"), alias("b", "hi")];
        let once = expand("!(a) !(zz)", &aliases);
        assert_eq!(expand(&once, &aliases), once);
    }

    #[test]
    fn finds_unresolved_references() {
        assert_eq!(unresolved("!(a) x !(b) !(c"), vec!["!(a)", "!(b)"]);
        assert!(unresolved("gcc !- !+").is_empty());
    }

    fn write_aliases(dir: &Path, contents: &str) {
        fs::write(dir.join(ALIAS_FILENAME), contents).unwrap();
    }

    #[test]
    fn loads_in_location_order() {
        let first = tempfile::tempdir().unwrap();
        let missing = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_aliases(first.path(), "a = one\nb = two\n");
        write_aliases(second.path(), "a = three\n");

        let sources = AliasSources::new(vec![
            first.path().to_path_buf(),
            missing.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);

        assert_eq!(
            sources.load().unwrap(),
            vec![alias("a", "one"), alias("b", "two"), alias("a", "three")]
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        write_aliases(dir.path(), "# compilers\n\n   \n#c = cc\nc = gcc !+\n");

        let sources = AliasSources::new(vec![dir.path().to_path_buf()]);

        assert_eq!(sources.load().unwrap(), vec![alias("c", "gcc !+")]);
    }

    #[test]
    fn indented_hash_is_not_a_comment() {
        let dir = tempfile::tempdir().unwrap();
        write_aliases(dir.path(), "  # x = y\n");
        let sources = AliasSources::new(vec![dir.path().to_path_buf()]);
        assert_eq!(sources.load().unwrap(), vec![alias("# x", "y")]);

        write_aliases(dir.path(), "  # just a note\n");
        assert!(matches!(
            sources.load(),
            Err(Error::AliasParse { line: 1, .. })
        ));
    }

    #[test]
    fn unreadable_locations_are_skipped() {
        let blocked = tempfile::tempdir().unwrap();
        fs::create_dir(blocked.path().join(ALIAS_FILENAME)).unwrap();
        let good = tempfile::tempdir().unwrap();
        write_aliases(good.path(), "c = gcc\n");

        let sources = AliasSources::new(vec![
            blocked.path().to_path_buf(),
            good.path().to_path_buf(),
        ]);

        assert_eq!(sources.load().unwrap(), vec![alias("c", "gcc")]);
    }

    #[test]
    fn malformed_line_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_aliases(dir.path(), "c = gcc\nbroken line\n");

        let sources = AliasSources::new(vec![dir.path().to_path_buf()]);

        match sources.load() {
            Err(Error::AliasParse { path, line, text }) => {
                assert_eq!(path, dir.path().join(ALIAS_FILENAME));
                assert_eq!(line, 2);
                assert_eq!(text, "broken line");
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn standard_sources_start_with_target_dir_and_end_with_etc() {
        let files = AliasSources::standard(Path::new("/srv/scripts/"))
            .files()
            .collect::<Vec<_>>();

        assert_eq!(files[0], Path::new("/srv/scripts/.shebang_alias"));
        assert_eq!(files[1], Path::new("./.shebang_alias"));
        assert_eq!(files.last().unwrap(), Path::new("/etc/.shebang_alias"));
    }
}
