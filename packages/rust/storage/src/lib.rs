//! Enriched catalog store backed by a single CSV file.
//!
//! The [`EnrichmentStore`] keeps every [`EnrichedEntry`] in an arena keyed by
//! entry name and rewrites the whole file after each upsert, so the file on
//! disk is always a complete snapshot.
//!
//! **File layout:** raw attribute columns first (first-seen order), then the
//! enrichment columns from [`enrichment_columns`]. Pros/cons cells hold the
//! list items joined with [`join_list`].

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, info, instrument, warn};

use comparekit_shared::{
    CatalogEntry, ComparekitError, EnrichedEntry, Locale, RATING_COLUMN, Result,
    enrichment_columns, is_enrichment_column, join_list, split_list,
};

/// Primary store handle for the enriched table.
#[derive(Debug)]
pub struct EnrichmentStore {
    path: PathBuf,
    key_column: String,
    /// Raw attribute columns, in output order. Always starts with the key column.
    columns: Vec<String>,
    entries: Vec<EnrichedEntry>,
    index: HashMap<String, usize>,
}

impl EnrichmentStore {
    /// Create an empty store that will persist to `path`.
    pub fn empty(path: &Path, key_column: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            key_column: key_column.to_string(),
            columns: vec![key_column.to_string()],
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Load the store at `path`, starting fresh if it is absent, empty, or corrupt.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path, key_column: &str) -> Self {
        match Self::try_load(path, key_column) {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "enriched store unreadable, starting fresh");
                Self::empty(path, key_column)
            }
        }
    }

    /// Load the store at `path`, reporting corruption as `StoreCorrupt`.
    ///
    /// A missing or zero-length file is not corruption and yields an empty store.
    pub fn try_load(path: &Path, key_column: &str) -> Result<Self> {
        let mut store = Self::empty(path, key_column);

        let len = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no enriched store yet");
                return Ok(store);
            }
            Err(e) => return Err(ComparekitError::io(path, e)),
        };
        if len == 0 {
            debug!("enriched store is empty");
            return Ok(store);
        }

        let file = File::open(path).map_err(|e| ComparekitError::io(path, e))?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ComparekitError::store_corrupt(path, e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if !headers.iter().any(|h| h == key_column) {
            return Err(ComparekitError::store_corrupt(
                path,
                format!("missing key column '{key_column}'"),
            ));
        }

        for header in &headers {
            if !is_enrichment_column(header) && !store.columns.contains(header) {
                store.columns.push(header.clone());
            }
        }

        for result in reader.records() {
            let record = result.map_err(|e| ComparekitError::store_corrupt(path, e.to_string()))?;
            if let Some(entry) = entry_from_record(&headers, &record, key_column) {
                store.insert(entry);
            }
        }

        info!(entries = store.len(), "loaded enriched store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Raw attribute columns written before the enrichment columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &EnrichedEntry> {
        self.entries.iter()
    }

    pub fn lookup(&self, name: &str) -> Option<&EnrichedEntry> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    /// Insert or replace `entry` by name, then persist the whole store.
    #[instrument(skip_all, fields(name = %entry.name()))]
    pub fn upsert(&mut self, entry: EnrichedEntry) -> Result<()> {
        let replaced = self.insert(entry);
        self.save()?;
        debug!(replaced, "upserted entry");
        Ok(())
    }

    /// In-memory insert-or-replace. Returns `true` when an entry was replaced.
    fn insert(&mut self, entry: EnrichedEntry) -> bool {
        for (column, _) in &entry.catalog.attributes {
            if !self.columns.contains(column) && !is_enrichment_column(column) {
                self.columns.push(column.clone());
            }
        }

        match self.index.get(entry.name()) {
            Some(&slot) => {
                self.entries[slot] = entry;
                true
            }
            None => {
                self.index.insert(entry.name().to_string(), self.entries.len());
                self.entries.push(entry);
                false
            }
        }
    }

    /// Write the full table to a temp file beside the target, then rename it over.
    pub fn save(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| ComparekitError::io(&parent, e))?;

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("enriched.csv");
        let temp = parent.join(format!(".{file_name}.tmp"));

        // Atomic rename
        let written = self.write_to(&temp).and_then(|()| {
            std::fs::rename(&temp, &self.path).map_err(|e| ComparekitError::io(&self.path, e))
        });
        if let Err(e) = written {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }
        debug!(entries = self.len(), path = %self.path.display(), "persisted enriched store");
        Ok(())
    }

    fn write_to(&self, temp: &Path) -> Result<()> {
        let file = File::create(temp).map_err(|e| ComparekitError::io(temp, e))?;
        let mut writer = WriterBuilder::new().from_writer(file);

        let mut header: Vec<String> = self.columns.clone();
        header.extend(enrichment_columns());
        writer
            .write_record(&header)
            .map_err(|e| ComparekitError::csv(temp, e))?;

        for entry in &self.entries {
            writer
                .write_record(self.record_for(entry))
                .map_err(|e| ComparekitError::csv(temp, e))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| ComparekitError::io(temp, e.into_error()))?;
        file.sync_all().map_err(|e| ComparekitError::io(temp, e))?;
        Ok(())
    }

    fn record_for(&self, entry: &EnrichedEntry) -> Vec<String> {
        let mut record: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                if column == &self.key_column {
                    entry.name().to_string()
                } else {
                    entry.catalog.attribute(column).unwrap_or("").to_string()
                }
            })
            .collect();

        for locale in Locale::ALL {
            let bundle = entry.bundle(locale);
            record.push(join_list(&bundle.pros));
            record.push(join_list(&bundle.cons));
            record.push(bundle.verdict.clone());
            if locale == Locale::DEFAULT {
                record.push(entry.rating.clone());
            }
        }
        record
    }
}

/// Rebuild an entry from one CSV row. Rows without a key are dropped.
fn entry_from_record(
    headers: &[String],
    record: &StringRecord,
    key_column: &str,
) -> Option<EnrichedEntry> {
    let cell = |column: &str| -> &str {
        headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| record.get(i))
            .unwrap_or("")
    };

    let name = cell(key_column).trim().to_string();
    if name.is_empty() {
        return None;
    }

    let attributes = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !is_enrichment_column(h))
        .map(|(i, h)| {
            let value = if h == key_column {
                name.clone()
            } else {
                record.get(i).unwrap_or("").to_string()
            };
            (h.clone(), value)
        })
        .collect();

    let mut entry = EnrichedEntry::new(CatalogEntry { name, attributes }, cell(RATING_COLUMN));
    for locale in Locale::ALL {
        let bundle = entry.bundle_mut(locale);
        bundle.pros = split_list(cell(&locale.pros_column()));
        bundle.cons = split_list(cell(&locale.cons_column()));
        bundle.verdict = cell(&locale.verdict_column()).to_string();
    }
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comparekit_shared::LocaleBundle;
    use uuid::Uuid;

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("ck_store_{}", Uuid::now_v7()))
            .join("tools_enriched.csv")
    }

    fn bundle(tag: &str) -> LocaleBundle {
        LocaleBundle {
            pros: vec![format!("{tag} pro 1"), format!("{tag} pro 2")],
            cons: vec![format!("{tag} con")],
            verdict: format!("{tag} verdict"),
        }
    }

    fn sample(name: &str, tag: &str) -> EnrichedEntry {
        let catalog = CatalogEntry {
            name: name.into(),
            attributes: vec![
                ("Tool_Name".into(), name.into()),
                ("Category".into(), "CRM".into()),
            ],
        };
        let mut entry = EnrichedEntry::new(catalog, "4.6");
        for locale in Locale::ALL {
            *entry.bundle_mut(locale) = bundle(&format!("{tag}-{}", locale.code()));
        }
        entry
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_loads_empty() {
        let path = temp_store_path();
        let store = EnrichmentStore::load(&path, "Tool_Name");
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn zero_length_file_loads_empty() {
        let path = temp_store_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();

        let store = EnrichmentStore::try_load(&path, "Tool_Name").expect("empty is fine");
        assert!(store.is_empty());
        cleanup(&path);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let path = temp_store_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "Tool_Name,Verdict\nAlpha,ok,extra,cells\n").unwrap();

        assert!(matches!(
            EnrichmentStore::try_load(&path, "Tool_Name"),
            Err(ComparekitError::StoreCorrupt { .. })
        ));
        let store = EnrichmentStore::load(&path, "Tool_Name");
        assert!(store.is_empty());
        cleanup(&path);
    }

    #[test]
    fn file_without_key_column_is_corrupt() {
        let path = temp_store_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "Name,Verdict\nAlpha,ok\n").unwrap();

        assert!(EnrichmentStore::try_load(&path, "Tool_Name").is_err());
        assert!(EnrichmentStore::load(&path, "Tool_Name").is_empty());
        cleanup(&path);
    }

    #[test]
    fn upsert_persists_and_reloads() {
        let path = temp_store_path();
        let mut store = EnrichmentStore::load(&path, "Tool_Name");
        store.upsert(sample("Alpha", "a")).expect("upsert");
        store.upsert(sample("Beta", "b")).expect("upsert");

        assert!(path.exists());
        let reloaded = EnrichmentStore::try_load(&path, "Tool_Name").expect("reload");
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.lookup("Alpha"), Some(&sample("Alpha", "a")));
        assert_eq!(reloaded.lookup("Beta"), Some(&sample("Beta", "b")));
        assert_eq!(reloaded.columns(), &["Tool_Name".to_string(), "Category".to_string()]);
        cleanup(&path);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let path = temp_store_path();
        let mut store = EnrichmentStore::empty(&path, "Tool_Name");
        store.upsert(sample("Alpha", "old")).unwrap();
        store.upsert(sample("Beta", "b")).unwrap();
        store.upsert(sample("Alpha", "new")).unwrap();

        assert_eq!(store.len(), 2);
        let names: Vec<&str> = store.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);

        let alpha = store.lookup("Alpha").unwrap();
        assert_eq!(alpha.bundle(Locale::English).verdict, "new-en verdict");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("old-"));
        assert_eq!(raw.matches("\nAlpha,").count(), 1);
        cleanup(&path);
    }

    #[test]
    fn header_layout_matches_enriched_table() {
        let path = temp_store_path();
        let mut store = EnrichmentStore::empty(&path, "Tool_Name");
        store.upsert(sample("Alpha", "a")).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let header = raw.lines().next().unwrap();
        assert_eq!(
            header,
            "Tool_Name,Category,Pros,Cons,Verdict,Rating,Pros_ES,Cons_ES,Verdict_ES,Pros_PT,Cons_PT,Verdict_PT"
        );
        assert!(raw.contains("a-en pro 1 | a-en pro 2"));
        assert!(!path.parent().unwrap().join(".tools_enriched.csv.tmp").exists());
        cleanup(&path);
    }

    #[test]
    fn older_files_missing_locale_columns_load() {
        let path = temp_store_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "Tool_Name,Price,Pros,Cons,Verdict,Rating\nAlpha,9,Fast | Cheap,Ugly,Good pick,4.1\n",
        )
        .unwrap();

        let store = EnrichmentStore::try_load(&path, "Tool_Name").expect("load");
        let alpha = store.lookup("Alpha").unwrap();
        assert_eq!(alpha.rating, "4.1");
        assert_eq!(alpha.bundle(Locale::English).pros, vec!["Fast", "Cheap"]);
        assert_eq!(alpha.bundle(Locale::English).verdict, "Good pick");
        assert!(!alpha.bundle(Locale::Portuguese).has_verdict());
        assert_eq!(alpha.catalog.attribute("Price"), Some("9"));
        cleanup(&path);
    }

    #[test]
    fn new_attribute_columns_are_appended() {
        let path = temp_store_path();
        let mut store = EnrichmentStore::empty(&path, "Tool_Name");
        store.upsert(sample("Alpha", "a")).unwrap();

        let mut gamma = sample("Gamma", "g");
        gamma
            .catalog
            .attributes
            .push(("Affiliate_Link".into(), "https://example.com/g".into()));
        store.upsert(gamma).unwrap();

        assert_eq!(
            store.columns(),
            &["Tool_Name".to_string(), "Category".to_string(), "Affiliate_Link".to_string()]
        );
        let reloaded = EnrichmentStore::try_load(&path, "Tool_Name").unwrap();
        assert_eq!(
            reloaded.lookup("Alpha").unwrap().catalog.attribute("Affiliate_Link"),
            Some("")
        );
        assert_eq!(
            reloaded.lookup("Gamma").unwrap().catalog.attribute("Affiliate_Link"),
            Some("https://example.com/g")
        );
        cleanup(&path);
    }

    #[test]
    fn save_is_byte_stable() {
        let path = temp_store_path();
        let mut store = EnrichmentStore::empty(&path, "Tool_Name");
        store.upsert(sample("Alpha", "a")).unwrap();
        let first = std::fs::read(&path).unwrap();

        let reloaded = EnrichmentStore::try_load(&path, "Tool_Name").unwrap();
        reloaded.save().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
        cleanup(&path);
    }

    #[test]
    fn failed_save_leaves_no_temp_file() {
        let path = temp_store_path();
        // A non-empty directory at the target makes the final rename fail.
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let mut store = EnrichmentStore::empty(&path, "Tool_Name");
        let err = store.upsert(sample("Alpha", "v1")).unwrap_err();
        assert!(matches!(err, ComparekitError::Io { .. }), "{err}");

        let temp = path.parent().unwrap().join(".tools_enriched.csv.tmp");
        assert!(!temp.exists());
        assert!(path.join("occupied").exists());

        cleanup(&path);
    }
}
