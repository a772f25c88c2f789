use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no usable documents to index")]
    NoDocuments,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: malformed markup: {source}", path.display())]
    Html {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("{} is not below the documents root", path.display())]
    OutsideRoot { path: PathBuf },

    #[error("index database: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
