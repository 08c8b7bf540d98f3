//! CLI command implementations.

pub mod extract;
pub mod info;
pub mod tree;

use std::path::PathBuf;

use packlens::{Session, SessionConfig};

use crate::error::CliError;

/// Shared container-loading options.
#[derive(Debug, clap::Args)]
pub struct LoadArgs {
    /// Directory whose subdirectories are loaded as package containers
    pub root: PathBuf,

    /// Skip the on-disk node store cache
    #[arg(long)]
    pub no_cache: bool,
}

impl LoadArgs {
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(&self.root);
        if self.no_cache {
            config.cache_path = None;
        }
        config
    }

    pub fn open_session(&self) -> Result<Session, CliError> {
        let session = Session::open(self.session_config())?;
        tracing::debug!(
            containers = session.group().container_count(),
            "session opened"
        );
        Ok(session)
    }
}
