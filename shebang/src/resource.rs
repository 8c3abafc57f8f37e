use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process, thread,
};

use nix::{errno::Errno, sys::stat::Mode, unistd::mkfifo};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    target::TargetDescriptor,
};

const MAX_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Fifo,
}

/// The part of a script that follows its `#!` line.
///
/// The newline ending the `#!` line is kept so line numbers in the copy match
/// the script's. Input without a leading `#!` is returned whole.
pub fn strip_shebang(contents: &[u8]) -> &[u8] {
    if !contents.starts_with(b"#!") {
        return contents;
    }
    match contents.iter().position(|&b| b == b'\n') {
        Some(idx) => &contents[idx..],
        None => &[],
    }
}

fn candidate(target: &TargetDescriptor, n: u32) -> PathBuf {
    PathBuf::from(format!(
        "{}-{}-{}{}",
        target.without_extension(),
        process::id(),
        n,
        target.extension
    ))
}

/// First `<dir><stem>-<pid>-<n><ext>` at or after `n` with nothing on disk.
pub fn unique_path(target: &TargetDescriptor, mut n: u32) -> PathBuf {
    loop {
        let path = candidate(target, n);
        if path.symlink_metadata().is_err() {
            return path;
        }
        n = n.wrapping_add(1);
    }
}

/// Calls `create` with fresh names until it stops reporting `AlreadyExists`,
/// which covers another process grabbing a name between check and create.
fn with_unique_name<T>(
    target: &TargetDescriptor,
    mut create: impl FnMut(PathBuf) -> Result<T>,
) -> Result<T> {
    let mut last = PathBuf::new();

    for attempt in 0..MAX_ATTEMPTS {
        let path = unique_path(target, attempt);
        match create(path.clone()) {
            Err(Error::ResourceCreate { source, .. })
                if source.kind() == io::ErrorKind::AlreadyExists =>
            {
                last = path;
            }
            created => return created,
        }
    }

    Err(Error::ResourceCreate {
        path: last,
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no unused name left"),
    })
}

/// A shebang-stripped copy of the target. Removed from disk on drop.
#[derive(Debug)]
pub struct StrippedResource {
    kind: ResourceKind,
    path: PathBuf,
    populated: bool,
}

impl StrippedResource {
    pub fn materialize(
        target: &TargetDescriptor,
        kind: ResourceKind,
        payload: &[u8],
    ) -> Result<Self> {
        with_unique_name(target, |path| match kind {
            ResourceKind::File => Self::create_file(path, payload),
            ResourceKind::Fifo => Self::create_fifo(path, payload),
        })
    }

    fn create_file(path: PathBuf, payload: &[u8]) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(source) => return Err(Error::ResourceCreate { path, source }),
        };
        let mut resource = Self {
            kind: ResourceKind::File,
            path,
            populated: false,
        };
        debug!(path = %resource.path.display(), "created stripped file");

        file.write_all(payload)
            .and_then(|_| file.flush())
            .map_err(|source| Error::ResourceWrite {
                path: resource.path.clone(),
                source,
            })?;
        resource.populated = true;

        Ok(resource)
    }

    fn create_fifo(path: PathBuf, payload: &[u8]) -> Result<Self> {
        if let Err(errno) = mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR) {
            let source = if errno == Errno::EEXIST {
                io::Error::from(io::ErrorKind::AlreadyExists)
            } else {
                io::Error::from(errno)
            };
            return Err(Error::ResourceCreate { path, source });
        }
        let mut resource = Self {
            kind: ResourceKind::Fifo,
            path,
            populated: false,
        };
        debug!(path = %resource.path.display(), "created stripped fifo");

        spawn_fifo_writer(resource.path.clone(), payload.to_vec()).map_err(|source| {
            Error::ResourceWrite {
                path: resource.path.clone(),
                source,
            }
        })?;
        resource.populated = true;

        Ok(resource)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// For a fifo this means the writer has been started, not that anyone
    /// has read it yet.
    pub fn populated(&self) -> bool {
        self.populated
    }
}

impl Drop for StrippedResource {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed stripped copy"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "couldn't remove stripped copy: {}", e),
        }
    }
}

/// Writes `payload` into the fifo once, from a detached thread.
///
/// Opening blocks until a reader shows up, which may be never. The thread is
/// not joined; it dies with the process. The fifo is opened without
/// `O_CREAT` so a path that was already cleaned up is not recreated as a
/// regular file.
fn spawn_fifo_writer(path: PathBuf, payload: Vec<u8>) -> io::Result<()> {
    thread::Builder::new()
        .name(String::from("fifo-writer"))
        .spawn(move || {
            let written = OpenOptions::new()
                .write(true)
                .open(&path)
                .and_then(|mut fifo| fifo.write_all(&payload));

            match written {
                Ok(()) => debug!(path = %path.display(), bytes = payload.len(), "fifo drained"),
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!(path = %path.display(), "fifo reader hung up early")
                }
                Err(e) => warn!(path = %path.display(), "couldn't write fifo: {}", e),
            }
        })?;

    Ok(())
}

/// The stripped copies of one invocation, at most one of each kind.
#[derive(Debug, Default)]
pub struct Resources {
    pub fifo: Option<StrippedResource>,
    pub file: Option<StrippedResource>,
}

impl Resources {
    /// Reads the target once, and only if a copy of some kind is wanted.
    pub fn prepare(target: &TargetDescriptor, fifo: bool, file: bool) -> Result<Self> {
        Self::prepare_with(target, fifo, file, StrippedResource::materialize)
    }

    fn prepare_with(
        target: &TargetDescriptor,
        fifo: bool,
        file: bool,
        mut materialize: impl FnMut(
            &TargetDescriptor,
            ResourceKind,
            &[u8],
        ) -> Result<StrippedResource>,
    ) -> Result<Self> {
        let mut resources = Self::default();
        if !fifo && !file {
            return Ok(resources);
        }

        let path = target.path();
        let contents = fs::read(&path).map_err(|source| Error::TargetRead { path, source })?;
        let payload = strip_shebang(&contents);

        if fifo {
            resources.fifo = Some(materialize(target, ResourceKind::Fifo, payload)?);
        }
        if file {
            resources.file = Some(materialize(target, ResourceKind::File, payload)?);
        }

        Ok(resources)
    }

    pub fn fifo_path(&self) -> Option<String> {
        self.fifo
            .as_ref()
            .map(|r| r.path().to_string_lossy().into_owned())
    }

    pub fn file_path(&self) -> Option<String> {
        self.file
            .as_ref()
            .map(|r| r.path().to_string_lossy().into_owned())
    }
}
