//! Decides which catalog entries still need enrichment.

use comparekit_catalog::CatalogTable;
use comparekit_shared::{CompletenessMode, EnrichedEntry, Locale};
use comparekit_storage::EnrichmentStore;

/// Characters that never appear in a genuine product name.
pub const REJECTED_KEY_CHARS: &[char] = &['!', '['];

/// Names shorter than this many characters are rejected.
pub const MIN_KEY_CHARS: usize = 2;

/// Outcome of checking one entry against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Malformed key; never sent to the generator.
    Rejected,
    /// Not in the store yet.
    New,
    /// In the store but missing locale content; regenerated in full.
    Incomplete,
    /// Fully enriched; skipped.
    Complete,
}

impl Eligibility {
    pub fn needs_enrichment(self) -> bool {
        matches!(self, Self::New | Self::Incomplete)
    }
}

/// Whether `name` looks like a real catalog key.
pub fn is_valid_key(name: &str) -> bool {
    name.chars().count() >= MIN_KEY_CHARS && !name.contains(REJECTED_KEY_CHARS)
}

/// Whether a stored entry counts as done under `mode`.
pub fn is_complete(entry: &EnrichedEntry, mode: CompletenessMode) -> bool {
    match mode {
        CompletenessMode::Strict => entry.is_complete(),
        CompletenessMode::Fast => {
            entry.bundle(Locale::DEFAULT).has_verdict() && entry.bundle(Locale::LAST).has_verdict()
        }
    }
}

/// Classify `name` against the current store contents.
pub fn assess(name: &str, store: &EnrichmentStore, mode: CompletenessMode) -> Eligibility {
    if !is_valid_key(name) {
        return Eligibility::Rejected;
    }
    match store.lookup(name) {
        None => Eligibility::New,
        Some(entry) if is_complete(entry, mode) => Eligibility::Complete,
        Some(_) => Eligibility::Incomplete,
    }
}

/// Side-effect-free view of what a run would do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentPlan {
    /// Names that would be synthesized, in source order.
    pub pending: Vec<String>,
    /// Names already fully enriched.
    pub complete: Vec<String>,
    /// Names rejected as malformed.
    pub rejected: Vec<String>,
}

/// Classify every catalog entry without touching the store.
///
/// Repeated names are reported once, at their first occurrence.
pub fn plan(catalog: &CatalogTable, store: &EnrichmentStore, mode: CompletenessMode) -> EnrichmentPlan {
    let mut plan = EnrichmentPlan::default();
    let mut seen = std::collections::HashSet::new();

    for entry in &catalog.entries {
        if !seen.insert(entry.name.as_str()) {
            continue;
        }
        let bucket = match assess(&entry.name, store, mode) {
            Eligibility::Rejected => &mut plan.rejected,
            Eligibility::Complete => &mut plan.complete,
            Eligibility::New | Eligibility::Incomplete => &mut plan.pending,
        };
        bucket.push(entry.name.clone());
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use comparekit_shared::CatalogEntry;
    use uuid::Uuid;

    fn store_path() -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("ck_elig_{}", Uuid::now_v7()))
            .join("enriched.csv")
    }

    fn entry_with_verdicts(name: &str, locales: &[Locale]) -> EnrichedEntry {
        let mut entry = EnrichedEntry::new(CatalogEntry::named("Tool_Name", name), "4.0");
        for locale in locales {
            entry.bundle_mut(*locale).verdict = format!("verdict {locale}");
        }
        entry
    }

    #[test]
    fn key_guards() {
        assert!(is_valid_key("Alpha"));
        assert!(is_valid_key("AB"));
        assert!(!is_valid_key("A"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("B!"));
        assert!(!is_valid_key("[Sponsored] Gamma"));
        // Counted in characters, not bytes.
        assert!(!is_valid_key("é"));
        assert!(is_valid_key("éa"));
    }

    #[test]
    fn assess_follows_store_state() {
        let path = store_path();
        let mut store = EnrichmentStore::empty(&path, "Tool_Name");

        assert_eq!(assess("Alpha", &store, CompletenessMode::Strict), Eligibility::New);
        assert_eq!(assess("B!", &store, CompletenessMode::Strict), Eligibility::Rejected);

        store
            .upsert(entry_with_verdicts("Alpha", &[Locale::English, Locale::Portuguese]))
            .unwrap();
        store.upsert(entry_with_verdicts("Beta", &Locale::ALL)).unwrap();
        store.upsert(entry_with_verdicts("Gamma", &[Locale::English])).unwrap();

        // Middle locale missing: strict retries, fast heuristic skips.
        assert_eq!(assess("Alpha", &store, CompletenessMode::Strict), Eligibility::Incomplete);
        assert_eq!(assess("Alpha", &store, CompletenessMode::Fast), Eligibility::Complete);

        assert_eq!(assess("Beta", &store, CompletenessMode::Strict), Eligibility::Complete);
        assert_eq!(assess("Gamma", &store, CompletenessMode::Fast), Eligibility::Incomplete);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn blank_verdicts_do_not_count() {
        let mut entry = entry_with_verdicts("Alpha", &Locale::ALL);
        entry.bundle_mut(Locale::Spanish).verdict = "   ".into();
        assert!(!is_complete(&entry, CompletenessMode::Strict));
        assert!(is_complete(&entry, CompletenessMode::Fast));
    }

    #[test]
    fn plan_buckets_entries() {
        let path = store_path();
        let mut store = EnrichmentStore::empty(&path, "Tool_Name");
        store.upsert(entry_with_verdicts("Alpha", &Locale::ALL)).unwrap();

        let catalog = CatalogTable {
            key_column: "Tool_Name".into(),
            columns: vec!["Tool_Name".into()],
            entries: ["Alpha", "B!", "Beta", "Beta", "x"]
                .into_iter()
                .map(|n| CatalogEntry::named("Tool_Name", n))
                .collect(),
        };

        let plan = plan(&catalog, &store, CompletenessMode::Strict);
        assert_eq!(plan.pending, vec!["Beta"]);
        assert_eq!(plan.complete, vec!["Alpha"]);
        assert_eq!(plan.rejected, vec!["B!", "x"]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
