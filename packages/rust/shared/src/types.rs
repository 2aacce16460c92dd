//! Core domain types for comparekit catalogs.

/// Separator used to pack a list of pros/cons into a single table cell.
pub const LIST_SEPARATOR: &str = " | ";

/// Default name of the column holding the unique catalog key.
pub const DEFAULT_KEY_COLUMN: &str = "Tool_Name";

/// Column holding the shared rating in the enriched table.
pub const RATING_COLUMN: &str = "Rating";

// ---------------------------------------------------------------------------
// Locale
// ---------------------------------------------------------------------------

/// A supported content locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locale {
    English,
    Spanish,
    Portuguese,
}

impl Locale {
    /// All supported locales, default first.
    pub const ALL: [Locale; 3] = [Locale::English, Locale::Spanish, Locale::Portuguese];

    /// Baseline locale; its columns carry no suffix.
    pub const DEFAULT: Locale = Locale::English;

    /// Locale checked by the fast completeness heuristic.
    pub const LAST: Locale = Locale::Portuguese;

    /// Position of this locale in [`Locale::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::English => 0,
            Self::Spanish => 1,
            Self::Portuguese => 2,
        }
    }

    /// Short language code.
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::Portuguese => "pt",
        }
    }

    /// Human-readable language name, as used in prompts.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Spanish",
            Self::Portuguese => "Portuguese",
        }
    }

    /// Suffix appended to enriched table column names.
    pub fn column_suffix(self) -> &'static str {
        match self {
            Self::English => "",
            Self::Spanish => "_ES",
            Self::Portuguese => "_PT",
        }
    }

    /// Suffix appended to keys in the generated JSON payload.
    pub fn json_suffix(self) -> &'static str {
        match self {
            Self::English => "",
            Self::Spanish => "_es",
            Self::Portuguese => "_pt",
        }
    }

    pub fn pros_column(self) -> String {
        format!("Pros{}", self.column_suffix())
    }

    pub fn cons_column(self) -> String {
        format!("Cons{}", self.column_suffix())
    }

    pub fn verdict_column(self) -> String {
        format!("Verdict{}", self.column_suffix())
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Enrichment columns in table order: `Pros, Cons, Verdict, Rating`, then the
/// pros/cons/verdict triple of each additional locale.
pub fn enrichment_columns() -> Vec<String> {
    let mut columns = Vec::with_capacity(Locale::ALL.len() * 3 + 1);
    for locale in Locale::ALL {
        columns.push(locale.pros_column());
        columns.push(locale.cons_column());
        columns.push(locale.verdict_column());
        if locale == Locale::DEFAULT {
            columns.push(RATING_COLUMN.to_string());
        }
    }
    columns
}

/// Whether `column` is one of the columns produced by enrichment.
pub fn is_enrichment_column(column: &str) -> bool {
    enrichment_columns().iter().any(|c| c == column)
}

/// Join list items into a single cell.
pub fn join_list(items: &[String]) -> String {
    items.join(LIST_SEPARATOR)
}

/// Split a cell back into list items, dropping blanks.
pub fn split_list(cell: &str) -> Vec<String> {
    cell.split(LIST_SEPARATOR.trim())
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// CatalogEntry
// ---------------------------------------------------------------------------

/// One raw record from the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Unique key (value of the key column, trimmed).
    pub name: String,
    /// Every `(column, value)` pair of the raw row, in column order.
    pub attributes: Vec<(String, String)>,
}

impl CatalogEntry {
    /// Build an entry whose only attribute is the key column.
    pub fn named(key_column: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            attributes: vec![(key_column.to_string(), name.clone())],
            name,
        }
    }

    /// Look up a raw attribute by column name.
    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// LocaleBundle / EnrichedEntry
// ---------------------------------------------------------------------------

/// Pros, cons, and verdict for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleBundle {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub verdict: String,
}

impl LocaleBundle {
    /// A bundle counts as done once it has a non-blank verdict.
    pub fn has_verdict(&self) -> bool {
        !self.verdict.trim().is_empty()
    }
}

/// A catalog entry plus its generated multi-locale content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedEntry {
    pub catalog: CatalogEntry,
    /// Overall rating shared across locales, e.g. `"4.7"`.
    pub rating: String,
    /// One bundle per locale, indexed by [`Locale::index`].
    pub bundles: [LocaleBundle; 3],
}

impl EnrichedEntry {
    /// Create an entry with empty bundles.
    pub fn new(catalog: CatalogEntry, rating: impl Into<String>) -> Self {
        Self {
            catalog,
            rating: rating.into(),
            bundles: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.catalog.name
    }

    pub fn bundle(&self, locale: Locale) -> &LocaleBundle {
        &self.bundles[locale.index()]
    }

    pub fn bundle_mut(&mut self, locale: Locale) -> &mut LocaleBundle {
        &mut self.bundles[locale.index()]
    }

    /// Every locale has a verdict.
    pub fn is_complete(&self) -> bool {
        Locale::ALL.iter().all(|l| self.bundle(*l).has_verdict())
    }
}
