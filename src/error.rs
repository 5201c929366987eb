use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse {}", path.display())]
    Deserialize {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
    #[error("serialize preferences")]
    Serialize(#[source] quick_xml::DeError),
    #[error("resolve home directory")]
    HomeDirUnavailable,
    #[error("DOSBox location cancelled")]
    DosboxLocationCancelled,
    #[error("no category with signature {0}")]
    UnknownCategory(String),
    #[error("no game with signature {0}")]
    UnknownGame(String),
    #[error("category title must not be blank")]
    InvalidCategory,
    #[error("invalid game: {0}")]
    InvalidGame(#[from] GameValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameValidationError {
    #[error("the game's name is required")]
    MissingName,
    #[error("the game's executable or the directory mounted as C: is required")]
    MissingLocation,
}
