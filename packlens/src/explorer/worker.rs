//! Per-reference enumeration: one worker expands one reference's immediate
//! children.

use std::collections::HashSet;

use tracing::debug;

use crate::reference::{EnumState, RefId, RefKind, SubmitDisposition};

use super::builder::Inner;
use super::ExplorerError;

/// Expands one reference's immediate children.
///
/// Callers have already claimed `id` (its state is `Enumerating`). Virtual
/// references expand their primary and every overridden hard reference, then
/// become `Enumerated`; the parts list is re-read after each pass so hard
/// references appended mid-flight are not missed.
pub(super) async fn enumerate(inner: &Inner, id: RefId) -> Result<(), ExplorerError> {
    if inner.cancel.is_cancelled() {
        return Ok(());
    }
    let Some(snap) = inner.arena.snapshot(id) else {
        return Ok(());
    };

    match snap.kind {
        RefKind::Hard { .. } => scan_hard(inner, id),
        RefKind::Virtual { .. } => {
            loop {
                if inner.cancel.is_cancelled() {
                    return Ok(());
                }
                let Some((primary, overridden)) = inner.arena.virtual_parts(id) else {
                    break;
                };
                let mut expanded = false;
                for hard in std::iter::once(primary).chain(overridden) {
                    match inner.arena.try_begin_enumeration(hard) {
                        SubmitDisposition::Begin => {
                            scan_hard(inner, hard)?;
                            expanded = true;
                        }
                        // Claimed by a racing direct submission whose worker
                        // needs a pool permit this task is sitting on.
                        // Requeue this virtual and return so the permit is
                        // released; the dispatch loop resumes it after the
                        // claimed part has had its turn.
                        SubmitDisposition::Busy => {
                            inner.work.lock().push_back(id);
                            return Ok(());
                        }
                        SubmitDisposition::Done => {}
                    }
                }
                if !expanded {
                    break;
                }
            }
            inner.arena.mark_enumerated(id);
            // A hard reference appended between the last parts read above
            // and the mark is invisible to both the loop and the fold's
            // deferral check, which still saw this virtual as enumerating.
            // One final sweep picks it up so no container's subtree drops
            // out of the union.
            if let Some((primary, overridden)) = inner.arena.virtual_parts(id) {
                for hard in std::iter::once(primary).chain(overridden) {
                    if inner.arena.state(hard) == Some(EnumState::NotEnumerated) {
                        inner.submit(hard);
                    }
                }
            }
            Ok(())
        }
    }
}

/// Scans the owning container's cached listfile for one hard reference's
/// immediate children. The caller owns the `Enumerating` claim on `id`.
fn scan_hard(inner: &Inner, id: RefId) -> Result<(), ExplorerError> {
    let Some(snap) = inner.arena.snapshot(id) else {
        return Ok(());
    };
    let RefKind::Hard { container } = snap.kind else {
        return Ok(());
    };

    let Some(listfile) = inner.group.listfile(container) else {
        // Mark the reference terminal anyway so a broken container cannot
        // wedge the wait queue behind it.
        inner.arena.mark_enumerated(id);
        return Err(ExplorerError::MissingListfile {
            container: inner
                .group
                .container_name(container)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{} (not loaded)", container)),
        });
    };

    let prefix = snap.file_path.as_str();
    let mut discovered = Vec::new();
    let mut deferred = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for entry in listfile.prefix_matches(prefix) {
        // Case folding is ASCII-only, so the folded prefix and the matched
        // entry agree on byte length.
        let rest = &entry[prefix.len()..];
        if rest.is_empty() {
            continue;
        }

        let (child_path, is_dir) = match rest.find('\\') {
            // Take only the first segment, separator included.
            Some(pos) => (format!("{}{}", prefix, &rest[..=pos]), true),
            None => (entry.clone(), false),
        };

        let folded = child_path.to_ascii_lowercase();
        if !seen.insert(folded.clone()) {
            continue;
        }
        if inner.arena.child_with_folded_path(id, &folded).is_some() {
            continue;
        }

        let node = inner.store.lookup_path(&snap.package_name, &child_path);
        let state = if is_dir {
            EnumState::NotEnumerated
        } else {
            // Files have no children.
            EnumState::Enumerated
        };
        let child = inner.arena.insert_hard(
            Some(id),
            container,
            snap.package_name.clone(),
            child_path,
            node,
            state,
        );

        if let Some(discovery) = inner.mapper.fold(&inner.arena, child) {
            // A directory folded into an already-enumerated virtual sibling
            // still needs its own expansion for the union to stay complete.
            if discovery.merged
                && is_dir
                && inner.arena.state(discovery.virtual_ref) == Some(EnumState::Enumerated)
            {
                deferred.push(child);
            }
            discovered.push(discovery);
        }
    }

    let count = discovered.len();
    if count > 0 {
        // One contiguous block per worker invocation: ordering within one
        // parent's children stays deterministic for the poller.
        inner.discovered.lock().extend(discovered);
    }
    inner.arena.mark_enumerated(id);

    for child in deferred {
        inner.submit(child);
    }

    debug!(
        reference = %id,
        package = %snap.package_name,
        path = %snap.file_path,
        children = count,
        "enumerated reference"
    );
    Ok(())
}
