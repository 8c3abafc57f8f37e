use crate::target::TargetDescriptor;

/// A positional `!x` token in a command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaString {
    /// `!@`
    Target,
    /// `!-`
    WithoutExtension,
    /// `!>`
    Filename,
    /// `!<`
    Directory,
    /// `!.`
    Path,
    /// `!~`
    StrippedFifo,
    /// `!+`
    StrippedFile,
}

impl MetaString {
    pub const ALL: [MetaString; 7] = [
        MetaString::Target,
        MetaString::WithoutExtension,
        MetaString::Filename,
        MetaString::Directory,
        MetaString::Path,
        MetaString::StrippedFifo,
        MetaString::StrippedFile,
    ];

    pub fn from_marker(marker: char) -> Option<Self> {
        Some(match marker {
            '@' => MetaString::Target,
            '-' => MetaString::WithoutExtension,
            '>' => MetaString::Filename,
            '<' => MetaString::Directory,
            '.' => MetaString::Path,
            '~' => MetaString::StrippedFifo,
            '+' => MetaString::StrippedFile,
            _ => return None,
        })
    }

    pub fn token(self) -> &'static str {
        match self {
            MetaString::Target => "!@",
            MetaString::WithoutExtension => "!-",
            MetaString::Filename => "!>",
            MetaString::Directory => "!<",
            MetaString::Path => "!.",
            MetaString::StrippedFifo => "!~",
            MetaString::StrippedFile => "!+",
        }
    }

    /// Tokens used by `template`, in order of appearance, repeats included.
    pub fn scan(template: &str) -> Vec<MetaString> {
        let mut found = vec![];
        tokenize(template, |piece| {
            if let Piece::Meta(meta) = piece {
                found.push(meta);
            }
        });
        found
    }
}

/// Replacement text for every meta-string of one invocation.
#[derive(Debug, Clone, Default)]
pub struct MetaValues {
    target: String,
    without_extension: String,
    filename: String,
    directory: String,
    path: String,
    fifo: String,
    file: String,
}

impl MetaValues {
    pub fn new(target: &TargetDescriptor, fifo: Option<&str>, file: Option<&str>) -> Self {
        Self {
            target: target.full_path.clone(),
            without_extension: target.without_extension(),
            filename: target.filename.clone(),
            directory: target.directory.clone(),
            path: target.reconstructed(),
            fifo: fifo.unwrap_or_default().to_owned(),
            file: file.unwrap_or_default().to_owned(),
        }
    }

    pub fn get(&self, meta: MetaString) -> &str {
        match meta {
            MetaString::Target => &self.target,
            MetaString::WithoutExtension => &self.without_extension,
            MetaString::Filename => &self.filename,
            MetaString::Directory => &self.directory,
            MetaString::Path => &self.path,
            MetaString::StrippedFifo => &self.fifo,
            MetaString::StrippedFile => &self.file,
        }
    }
}

enum Piece<'a> {
    Text(&'a str),
    Meta(MetaString),
}

fn tokenize<'a>(template: &'a str, mut emit: impl FnMut(Piece<'a>)) {
    let mut rest = template;
    while let Some(idx) = rest.find('!') {
        let meta = rest[idx + 1..].chars().next().and_then(MetaString::from_marker);
        match meta {
            Some(meta) => {
                emit(Piece::Text(&rest[..idx]));
                emit(Piece::Meta(meta));
                rest = &rest[idx + 2..];
            }
            None => {
                emit(Piece::Text(&rest[..=idx]));
                rest = &rest[idx + 1..];
            }
        }
    }
    emit(Piece::Text(rest));
}

/// Replaces every meta-string in one left-to-right pass. Inserted values are
/// never rescanned.
pub fn substitute(template: &str, values: &MetaValues) -> String {
    let mut out = String::with_capacity(template.len());
    tokenize(template, |piece| match piece {
        Piece::Text(text) => out.push_str(text),
        Piece::Meta(meta) => out.push_str(values.get(meta)),
    });
    out
}

/// Rewrites every `from` token into `to`, leaving everything else as is.
pub fn retarget(template: &str, from: MetaString, to: MetaString) -> String {
    let mut out = String::with_capacity(template.len());
    tokenize(template, |piece| match piece {
        Piece::Text(text) => out.push_str(text),
        Piece::Meta(meta) if meta == from => out.push_str(to.token()),
        Piece::Meta(meta) => out.push_str(meta.token()),
    });
    out
}
