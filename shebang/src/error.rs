use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed alias on line {line} of {}: {text:?} (expected `name = command`)", path.display())]
    AliasParse {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("couldn't read target {}", path.display())]
    TargetRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to create {}", path.display())]
    ResourceCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write {}", path.display())]
    ResourceWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't start the shell")]
    Spawn {
        #[source]
        source: io::Error,
    },

    #[error("couldn't install signal handlers")]
    Signals {
        #[source]
        source: io::Error,
    },
}
