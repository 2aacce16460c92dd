//! Core enrichment logic for comparekit.
//!
//! Ties the raw catalog, the enriched store and the generation client
//! together into the end-to-end `enrich` run.

pub mod eligibility;
pub mod pipeline;
pub mod synthesizer;

pub use eligibility::{Eligibility, EnrichmentPlan, assess, plan};
pub use pipeline::{
    EnrichOptions, EnrichmentProgress, EntryOutcome, RunConfig, RunOutcome, RunSummary,
    SilentProgress, enrich_catalog, run, run_with_generator,
};
pub use synthesizer::Synthesizer;
