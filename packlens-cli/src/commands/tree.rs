//! Tree command - enumerate every container and print the merged tree.

use std::time::Duration;

use clap::Args;
use packlens::{RefId, Session};

use super::LoadArgs;
use crate::error::CliError;

/// Arguments for the tree command.
#[derive(Debug, Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub load: LoadArgs,

    /// Maximum number of concurrent enumeration workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Queue polling interval in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Expand at most this many directory levels
    #[arg(long)]
    pub depth: Option<usize>,
}

/// Run the tree command.
pub async fn run(args: TreeArgs) -> Result<(), CliError> {
    let mut config = args.load.session_config();
    if let Some(workers) = args.workers {
        config.explorer.worker_count = workers;
    }
    if let Some(ms) = args.poll_ms {
        config.explorer.poll_interval = Duration::from_millis(ms);
    }

    let session = Session::open(config)?;
    session.start();

    println!("Packlens v{}", packlens::VERSION);
    println!("Containers ({}):", session.group().container_count());
    for container in 0..session.group().container_count() {
        if let Some(name) = session.group().container_name(container) {
            println!("  [{}] {}", container, name);
        }
    }
    println!();

    let max_depth = args.depth.unwrap_or(usize::MAX);
    let (files, merged) = expand_all(&session, max_depth).await;

    print_subtree(&session, session.virtual_root(), 0, max_depth);
    println!();
    println!("{} files discovered, {} merged across containers", files, merged);

    session.close().await;
    Ok(())
}

/// Drives the discovery stream breadth-first: every newly created virtual
/// directory within the depth limit is submitted back for enumeration,
/// until the engine goes idle with nothing left to drain.
async fn expand_all(session: &Session, max_depth: usize) -> (usize, usize) {
    session.submit(session.virtual_root());

    let arena = session.explorer().arena();
    let mut files = 0usize;
    let mut merged = 0usize;

    loop {
        // Idle before drain: once idle, nothing can append any more, so an
        // empty drain after a positive idle check really is the end.
        let idle = session.is_idle();
        let batch = session.drain_discovered();
        if batch.is_empty() {
            if idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            continue;
        }

        for discovery in batch {
            if discovery.merged {
                merged += 1;
                continue;
            }
            let Some(snap) = arena.snapshot(discovery.virtual_ref) else {
                continue;
            };
            if snap.is_file() {
                files += 1;
            } else if path_depth(&snap.file_path) <= max_depth {
                session.submit(discovery.virtual_ref);
            }
        }
    }

    (files, merged)
}

/// Directory depth of a logical path (`Sound\Music\` is depth 2).
fn path_depth(path: &str) -> usize {
    path.matches('\\').count()
}

fn print_subtree(session: &Session, id: RefId, depth: usize, max_depth: usize) {
    let arena = session.explorer().arena();
    for child in arena.children(id) {
        let Some(snap) = arena.snapshot(child) else {
            continue;
        };
        let sources = arena
            .virtual_parts(child)
            .map(|(_, overridden)| 1 + overridden.len())
            .unwrap_or(1);

        let indent = "  ".repeat(depth);
        let suffix = if snap.is_directory() { "\\" } else { "" };
        if sources > 1 {
            println!("{}{}{} ({} sources)", indent, snap.name(), suffix, sources);
        } else {
            println!("{}{}{}", indent, snap.name(), suffix);
        }

        if snap.is_directory() && depth + 1 <= max_depth {
            print_subtree(session, child, depth + 1, max_depth);
        }
    }
}
