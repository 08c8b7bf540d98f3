//! Info command - show which container backs a logical path.

use clap::Args;
use packlens::FileKind;

use super::LoadArgs;
use crate::error::CliError;

/// Arguments for the info command.
#[derive(Debug, Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub load: LoadArgs,

    /// Logical path inside the merged tree
    pub path: String,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> Result<(), CliError> {
    let session = args.load.open_session()?;

    let logical = args.path.replace('/', "\\");
    let Some(info) = session.reference_info(&logical) else {
        return Err(CliError::NotFound(args.path));
    };

    println!("Path:      {}", logical);
    println!("Container: {}", info.container);
    println!("Kind:      {}", FileKind::from_path(&logical));
    println!("Size:      {} bytes", info.size);
    println!("Deleted:   {}", if info.deleted { "yes" } else { "no" });
    Ok(())
}
