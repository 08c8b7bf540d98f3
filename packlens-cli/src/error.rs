//! CLI error type.

use thiserror::Error;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Session(#[from] packlens::SessionError),

    #[error(transparent)]
    Package(#[from] packlens::PackageError),

    #[error("no entry named `{0}` in any loaded container")]
    NotFound(String),

    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        source: std::io::Error,
    },
}
