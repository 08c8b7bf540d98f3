//! Cached, ordered entry lists.
//!
//! A listfile is read once per container at group construction and is the
//! only thing enumeration workers ever scan. All matching is ASCII
//! case-insensitive, so a case-folded shadow of every entry is kept
//! alongside the original-case strings.
//!
//! # Sort invariant
//!
//! The prefix scan early-exits as soon as entries stop matching, which is
//! only sound if entries sharing a prefix are contiguous, i.e. the listing
//! is sorted. Rather than silently assuming that of the upstream container
//! (a violation would silently truncate directory contents), the invariant
//! is validated at construction and repaired with a warning if broken.

use tracing::warn;

/// Per-container cached entry list, sorted case-insensitively.
#[derive(Debug, Clone)]
pub struct Listfile {
    /// Original-case entry paths, ordered by their case-folded form.
    entries: Vec<String>,
    /// Case-folded shadow, index-aligned with `entries`.
    folded: Vec<String>,
}

impl Listfile {
    /// Builds a listfile from a container's raw entry listing.
    ///
    /// Forward slashes are normalized to backslashes. If the listing is not
    /// sorted by its case-folded form it is sorted here, with a warning
    /// naming the container.
    pub fn new(container: &str, raw: Vec<String>) -> Self {
        let mut entries: Vec<String> = raw
            .into_iter()
            .filter(|e| !e.is_empty())
            .map(|e| e.replace('/', "\\"))
            .collect();

        let sorted = entries
            .windows(2)
            .all(|w| fold(&w[0]) <= fold(&w[1]));
        if !sorted {
            warn!(
                container,
                entries = entries.len(),
                "container listing is not sorted; sorting locally to keep prefix scans sound"
            );
            entries.sort_by_key(|e| fold(e));
        }

        let folded = entries.iter().map(|e| fold(e)).collect();
        Self { entries, folded }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the container listed nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in sorted order, original case.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Case-insensitive exact membership test.
    pub fn contains(&self, path: &str) -> bool {
        self.folded.binary_search(&fold(path)).is_ok()
    }

    /// All entries whose path starts (case-insensitively) with `prefix`,
    /// as one contiguous slice.
    ///
    /// Sorted order makes the matching range contiguous: a binary search
    /// finds its start and the walk stops at the first non-match, which is
    /// the validated form of the early exit enumeration relies on.
    pub fn prefix_matches(&self, prefix: &str) -> &[String] {
        if prefix.is_empty() {
            return &self.entries;
        }
        let folded_prefix = fold(prefix);
        let start = self
            .folded
            .partition_point(|e| e.as_str() < folded_prefix.as_str());
        let end = start
            + self.folded[start..]
                .iter()
                .take_while(|e| e.starts_with(&folded_prefix))
                .count();
        &self.entries[start..end]
    }
}

fn fold(s: &str) -> String {
    s.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listfile(entries: &[&str]) -> Listfile {
        Listfile::new("test.arc", entries.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_unsorted_listing_is_repaired() {
        let lf = listfile(&["Textures\\y.blp", "Models\\x.m2", "Sounds\\z.wav"]);
        assert_eq!(
            lf.entries(),
            &["Models\\x.m2", "Sounds\\z.wav", "Textures\\y.blp"]
        );
    }

    #[test]
    fn test_forward_slashes_normalized() {
        let lf = listfile(&["Textures/Icons/a.blp"]);
        assert_eq!(lf.entries(), &["Textures\\Icons\\a.blp"]);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let lf = listfile(&["Textures\\y.blp"]);
        assert!(lf.contains("textures\\Y.BLP"));
        assert!(!lf.contains("textures\\"));
        assert!(!lf.contains("textures\\missing.blp"));
    }

    #[test]
    fn test_prefix_matches_is_contiguous_and_case_insensitive() {
        let lf = listfile(&[
            "Models\\x.m2",
            "Textures\\Icons\\i.blp",
            "Textures\\y.blp",
            "textures\\z.blp",
            "Sounds\\z.wav",
        ]);

        let hits = lf.prefix_matches("TEXTURES\\");
        assert_eq!(
            hits,
            &["Textures\\Icons\\i.blp", "Textures\\y.blp", "textures\\z.blp"]
        );

        assert!(lf.prefix_matches("Interface\\").is_empty());
        assert_eq!(lf.prefix_matches("").len(), 5);
    }

    #[test]
    fn test_empty_entries_dropped() {
        let lf = listfile(&["", "a.txt", ""]);
        assert_eq!(lf.len(), 1);
        assert!(!lf.is_empty());
    }
}
