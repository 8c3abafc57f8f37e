use std::path::{Path, PathBuf};

/// The pieces of the target path that meta-strings can refer to.
///
/// Everything is derived from the path string as given, without touching the
/// filesystem, so `directory + filename` always rebuilds `full_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub directory: String,
    pub filename: String,
    pub stem: String,
    pub extension: String,
    pub full_path: String,
}

impl TargetDescriptor {
    pub fn new(target_path: &str) -> Self {
        let split = target_path.rfind('/').map_or(0, |idx| idx + 1);
        let (directory, filename) = target_path.split_at(split);

        // A leading dot names a hidden file, not an extension.
        let (stem, extension) = match filename.rfind('.') {
            Some(idx) if idx > 0 => filename.split_at(idx),
            _ => (filename, ""),
        };

        Self {
            directory: directory.to_owned(),
            filename: filename.to_owned(),
            stem: stem.to_owned(),
            extension: extension.to_owned(),
            full_path: target_path.to_owned(),
        }
    }

    pub fn reconstructed(&self) -> String {
        format!("{}{}", self.directory, self.filename)
    }

    pub fn without_extension(&self) -> String {
        format!("{}{}", self.directory, self.stem)
    }

    /// Directory to search for a target-local alias file and to place
    /// stripped copies in. An empty directory means the working directory.
    pub fn directory_path(&self) -> &Path {
        if self.directory.is_empty() {
            Path::new(".")
        } else {
            Path::new(&self.directory)
        }
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.full_path)
    }
}
