//! End-to-end `enrich` pipeline: raw table → eligibility → synthesis → store.
//!
//! Entries are processed strictly one at a time in source order. Each
//! successful synthesis is upserted and flushed to disk before the next entry
//! starts, so an interrupted run resumes where it stopped.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use comparekit_catalog::{CatalogTable, load_catalog};
use comparekit_provider::{ChatClient, TextGenerator};
use comparekit_shared::{
    AppConfig, ComparekitError, CompletenessMode, EnrichmentPolicyConfig, ProviderConfig, Result,
    resolve_api_key,
};
use comparekit_storage::EnrichmentStore;

use crate::eligibility::{self, Eligibility};
use crate::synthesizer::Synthesizer;

// ---------------------------------------------------------------------------
// Options & config
// ---------------------------------------------------------------------------

/// Per-run policy for the driver loop.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// How finished entries are recognized.
    pub completeness: CompletenessMode,
    /// Pause after each successful upsert.
    pub rate_limit: Duration,
    /// Regenerate entries that are already complete.
    pub force: bool,
    /// Stop after this many synthesis attempts.
    pub limit: Option<usize>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self::from(&EnrichmentPolicyConfig::default())
    }
}

impl From<&EnrichmentPolicyConfig> for EnrichOptions {
    fn from(policy: &EnrichmentPolicyConfig) -> Self {
        Self {
            completeness: policy.completeness,
            rate_limit: policy.rate_limit(),
            force: false,
            limit: None,
        }
    }
}

/// Everything `run` needs, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub raw_table: PathBuf,
    pub enriched_table: PathBuf,
    pub key_column: String,
    pub provider: ProviderConfig,
    pub options: EnrichOptions,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            raw_table: PathBuf::from(&config.paths.raw_table),
            enriched_table: PathBuf::from(&config.paths.enriched_table),
            key_column: config.paths.key_column.clone(),
            provider: config.provider.clone(),
            options: EnrichOptions::from(&config.enrichment),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Terminal state of one entry within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Malformed key.
    Rejected,
    /// Already complete (or already handled earlier in this run).
    Skipped,
    /// Synthesized and written to the store.
    Upserted,
    /// Synthesis failed; the entry stays pending for the next run.
    Failed(String),
}

/// Counters for a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Entries sent to the generator.
    pub attempted: usize,
    /// Entries written to the store.
    pub enriched: usize,
    /// `(name, reason)` for every failed synthesis.
    pub failed: Vec<(String, String)>,
    /// Entries skipped as already complete.
    pub skipped_complete: usize,
    /// Entries rejected by the key guards.
    pub rejected: usize,
    /// Whether the attempt limit cut the run short.
    pub limit_reached: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn start() -> Self {
        Self {
            attempted: 0,
            enriched: 0,
            failed: Vec::new(),
            skipped_complete: 0,
            rejected: 0,
            limit_reached: false,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// Whether the store changed during the run.
    pub fn changed(&self) -> bool {
        self.enriched > 0
    }
}

/// Result of the full pipeline.
#[derive(Debug)]
pub enum RunOutcome {
    /// No credential was configured; nothing was loaded or written.
    NoCredential { var: String },
    Completed(RunSummary),
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for enrichment runs.
pub trait EnrichmentProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an entry is evaluated.
    fn entry_started(&self, name: &str, current: usize, total: usize);
    /// Called once the entry reaches a terminal state.
    fn entry_finished(&self, name: &str, outcome: &EntryOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl EnrichmentProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn entry_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn entry_finished(&self, _name: &str, _outcome: &EntryOutcome) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full pipeline with the HTTP generation client.
///
/// 1. Resolve the credential (missing ⇒ clean no-op)
/// 2. Load the raw catalog
/// 3. Load the enriched store
/// 4. Enrich pending entries one by one
#[instrument(skip_all, fields(raw = %config.raw_table.display(), enriched = %config.enriched_table.display()))]
pub async fn run(config: &RunConfig, progress: &dyn EnrichmentProgress) -> Result<RunOutcome> {
    let api_key = match resolve_api_key(&config.provider) {
        Ok(key) => key,
        Err(ComparekitError::CredentialMissing { var }) => {
            warn!(var = %var, "no API key found, skipping enrichment");
            return Ok(RunOutcome::NoCredential { var });
        }
        Err(e) => return Err(e),
    };

    let client = ChatClient::new(&config.provider, api_key)?;
    info!(endpoint = %client.endpoint(), model = %config.provider.model, "generation client ready");

    let summary = run_with_generator(config, client, progress).await?;
    Ok(RunOutcome::Completed(summary))
}

/// Load both tables and enrich with an arbitrary generator.
pub async fn run_with_generator<G: TextGenerator>(
    config: &RunConfig,
    generator: G,
    progress: &dyn EnrichmentProgress,
) -> Result<RunSummary> {
    progress.phase("Loading catalog");
    let catalog = load_catalog(&config.raw_table, &config.key_column)?;

    progress.phase("Loading enriched store");
    let mut store = EnrichmentStore::load(&config.enriched_table, &config.key_column);

    let synthesizer = Synthesizer::new(generator).with_temperature(config.provider.temperature);
    enrich_catalog(&catalog, &mut store, &synthesizer, &config.options, progress).await
}

/// Drive every catalog entry through filter → synthesize → upsert.
///
/// Synthesis failures are logged and counted; store write failures abort.
#[instrument(skip_all, fields(entries = catalog.len(), stored = store.len()))]
pub async fn enrich_catalog<G: TextGenerator>(
    catalog: &CatalogTable,
    store: &mut EnrichmentStore,
    synthesizer: &Synthesizer<G>,
    options: &EnrichOptions,
    progress: &dyn EnrichmentProgress,
) -> Result<RunSummary> {
    let clock = Instant::now();
    let mut summary = RunSummary::start();
    let mut handled: HashSet<&str> = HashSet::new();
    let total = catalog.len();

    progress.phase("Enriching entries");
    info!(
        completeness = ?options.completeness,
        force = options.force,
        rate_limit_ms = options.rate_limit.as_millis() as u64,
        "starting enrichment"
    );

    for (i, entry) in catalog.entries.iter().enumerate() {
        let name = entry.name.as_str();
        progress.entry_started(name, i + 1, total);

        if !handled.insert(name) {
            debug!(tool = name, "duplicate row, already handled this run");
            progress.entry_finished(name, &EntryOutcome::Skipped);
            continue;
        }

        let eligibility = eligibility::assess(name, store, options.completeness);
        let eligible = match eligibility {
            Eligibility::Rejected => {
                debug!(tool = name, "rejected malformed key");
                summary.rejected += 1;
                progress.entry_finished(name, &EntryOutcome::Rejected);
                continue;
            }
            Eligibility::Complete => options.force,
            Eligibility::New | Eligibility::Incomplete => true,
        };
        if !eligible {
            summary.skipped_complete += 1;
            progress.entry_finished(name, &EntryOutcome::Skipped);
            continue;
        }

        if options.limit.is_some_and(|limit| summary.attempted >= limit) {
            info!(limit = ?options.limit, "attempt limit reached");
            summary.limit_reached = true;
            break;
        }

        summary.attempted += 1;
        info!(tool = name, state = ?eligibility, "synthesizing");

        let enriched = match synthesizer.synthesize(entry).await {
            Ok(enriched) => enriched,
            Err(e) => {
                warn!(tool = name, error = %e, "synthesis failed, continuing");
                summary.failed.push((name.to_string(), e.to_string()));
                progress.entry_finished(name, &EntryOutcome::Failed(e.to_string()));
                continue;
            }
        };

        store.upsert(enriched)?;
        summary.enriched += 1;
        progress.entry_finished(name, &EntryOutcome::Upserted);

        if !options.rate_limit.is_zero() {
            tokio::time::sleep(options.rate_limit).await;
        }
    }

    summary.elapsed = clock.elapsed();

    if summary.changed() {
        info!(
            enriched = summary.enriched,
            failed = summary.failed.len(),
            skipped = summary.skipped_complete,
            rejected = summary.rejected,
            "enriched data updated"
        );
    } else {
        info!(
            failed = summary.failed.len(),
            skipped = summary.skipped_complete,
            rejected = summary.rejected,
            "no changes to enriched data"
        );
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
