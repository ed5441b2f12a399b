use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures the navigation layer has to handle at stage level.
///
/// Per-item install failures are not errors: they are recorded by the
/// install session and never propagate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cannot read catalog {}: {reason}", path.display())]
    CatalogRead { path: PathBuf, reason: String },

    #[error("nothing selected to install")]
    EmptySelection,

    #[error("unknown script: {0}")]
    UnknownScript(String),
}

impl Error {
    pub fn catalog_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CatalogRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
