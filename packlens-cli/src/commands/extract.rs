//! Extract command - pull one file out of the merged namespace.

use std::path::PathBuf;

use clap::Args;

use super::LoadArgs;
use crate::error::CliError;

/// Arguments for the extract command.
#[derive(Debug, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub load: LoadArgs,

    /// Logical path inside the merged tree (e.g. Textures\Minimap\md5translate.trs)
    pub path: String,

    /// Output file (defaults to the entry's file name in the current directory)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Run the extract command.
pub fn run(args: ExtractArgs) -> Result<(), CliError> {
    let session = args.load.open_session()?;

    let logical = args.path.replace('/', "\\");
    let Some(data) = session.extract_file(&logical)? else {
        return Err(CliError::NotFound(args.path));
    };

    let output = args.output.unwrap_or_else(|| {
        let name = logical.rsplit('\\').next().unwrap_or(&logical);
        PathBuf::from(name)
    });
    std::fs::write(&output, &data).map_err(|source| CliError::Output {
        path: output.display().to_string(),
        source,
    })?;

    println!("Extracted {} bytes to {}", data.len(), output.display());
    Ok(())
}
