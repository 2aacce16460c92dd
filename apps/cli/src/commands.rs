//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use comparekit_catalog::load_catalog;
use comparekit_core::eligibility;
use comparekit_core::pipeline::{
    EnrichmentProgress, EntryOutcome, RunConfig, RunOutcome, RunSummary,
};
use comparekit_shared::{
    AppConfig, CompletenessMode, init_config, load_config, load_config_from, validate_config,
};
use comparekit_storage::EnrichmentStore;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// comparekit: fill a product catalog with multilingual review content.
#[derive(Parser)]
#[command(
    name = "comparekit",
    version,
    about = "Enrich a product catalog with pros, cons, verdicts and ratings in English, Spanish and Portuguese.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.comparekit/comparekit.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Table locations shared by `enrich` and `status`.
#[derive(Args, Debug, Default)]
pub(crate) struct TableArgs {
    /// Raw catalog CSV.
    #[arg(long)]
    pub raw: Option<PathBuf>,

    /// Enriched output CSV.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Column holding the product name.
    #[arg(long)]
    pub key_column: Option<String>,

    /// Completeness check: strict (default) or fast.
    ///
    /// strict regenerates an entry when any locale lacks a verdict; fast only
    /// checks the English and Portuguese verdicts.
    #[arg(long)]
    pub completeness: Option<CompletenessMode>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate content for every catalog entry that still needs it.
    Enrich {
        #[command(flatten)]
        tables: TableArgs,

        /// Regenerate entries that are already complete.
        #[arg(long)]
        force: bool,

        /// Stop after this many generation attempts.
        #[arg(long)]
        limit: Option<usize>,

        /// Pause between successful entries, in milliseconds.
        #[arg(long)]
        rate_limit_ms: Option<u64>,
    },

    /// Show what an `enrich` run would do, without calling the service.
    Status {
        #[command(flatten)]
        tables: TableArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "comparekit=info",
        1 => "comparekit=debug",
        _ => "comparekit=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Enrich {
            tables,
            force,
            limit,
            rate_limit_ms,
        } => {
            let config = resolve_config(config_path.as_ref(), &tables)?;
            let mut run_config = RunConfig::from(&config);
            run_config.options.force = force;
            run_config.options.limit = limit;
            if let Some(ms) = rate_limit_ms {
                run_config.options.rate_limit = Duration::from_millis(ms);
            }
            cmd_enrich(&run_config).await
        }
        Command::Status { tables } => {
            let config = resolve_config(config_path.as_ref(), &tables)?;
            cmd_status(&config)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_ref()),
        },
    }
}

/// Load the config file and layer CLI overrides on top.
fn resolve_config(path: Option<&PathBuf>, tables: &TableArgs) -> Result<AppConfig> {
    let mut config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };

    if let Some(raw) = &tables.raw {
        config.paths.raw_table = raw.to_string_lossy().into_owned();
    }
    if let Some(out) = &tables.out {
        config.paths.enriched_table = out.to_string_lossy().into_owned();
    }
    if let Some(column) = &tables.key_column {
        config.paths.key_column = column.clone();
    }
    if let Some(mode) = tables.completeness {
        config.enrichment.completeness = mode;
    }

    validate_config(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_enrich(config: &RunConfig) -> Result<()> {
    info!(
        raw = %config.raw_table.display(),
        out = %config.enriched_table.display(),
        model = %config.provider.model,
        "enriching catalog"
    );

    let reporter = CliProgress::new();
    let outcome = comparekit_core::pipeline::run(config, &reporter).await;
    reporter.finish();

    match outcome? {
        RunOutcome::NoCredential { var } => {
            println!();
            println!("  No API key found. Set {var} to enable enrichment.");
            println!("  Nothing was changed.");
            println!();
        }
        RunOutcome::Completed(summary) => print_summary(config, &summary),
    }
    Ok(())
}

fn print_summary(config: &RunConfig, summary: &RunSummary) {
    println!();
    for line in summary_lines(config, summary) {
        println!("{line}");
    }
    println!();
}

fn summary_lines(config: &RunConfig, summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        if summary.changed() {
            "  Enriched data updated!".to_string()
        } else {
            "  No changes to enriched data.".to_string()
        },
        format!("  Enriched:  {}", summary.enriched),
        format!("  Failed:    {}", summary.failed.len()),
        format!("  Complete:  {}", summary.skipped_complete),
        format!("  Rejected:  {}", summary.rejected),
    ];
    if summary.limit_reached {
        lines.push("  Limit:     reached, rerun to continue".to_string());
    }
    lines.push(format!("  Output:    {}", config.enriched_table.display()));
    lines.push(format!(
        "  Started:   {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(format!("  Time:      {:.1}s", summary.elapsed.as_secs_f64()));
    for (name, reason) in &summary.failed {
        lines.push(format!("    ✗ {name}: {reason}"));
    }
    lines
}

fn cmd_status(config: &AppConfig) -> Result<()> {
    let raw = PathBuf::from(&config.paths.raw_table);
    let out = PathBuf::from(&config.paths.enriched_table);
    let key_column = &config.paths.key_column;

    let catalog = load_catalog(&raw, key_column)?;
    let store = EnrichmentStore::try_load(&out, key_column).map_err(|e| {
        eyre!("{e}; the next enrich run would start from an empty table")
    })?;
    let plan = eligibility::plan(&catalog, &store, config.enrichment.completeness);

    println!();
    println!("  Catalog:   {} ({} rows)", raw.display(), catalog.len());
    println!("  Enriched:  {} ({} entries)", out.display(), store.len());
    println!("  Mode:      {:?}", config.enrichment.completeness);
    println!("  Complete:  {}", plan.complete.len());
    println!("  Pending:   {}", plan.pending.len());
    println!("  Rejected:  {}", plan.rejected.len());
    for name in &plan.pending {
        println!("    • {name}");
    }
    println!();
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&PathBuf>) -> Result<()> {
    let config: AppConfig = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl EnrichmentProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn entry_started(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Enriching [{current}/{total}] {name}"));
    }

    fn entry_finished(&self, name: &str, outcome: &EntryOutcome) {
        match outcome {
            EntryOutcome::Upserted => self.spinner.println(format!("  ✓ {name}")),
            EntryOutcome::Failed(reason) => self.spinner.println(format!("  ✗ {name}: {reason}")),
            EntryOutcome::Rejected | EntryOutcome::Skipped => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn enrich_flags_parse() {
        let cli = Cli::try_parse_from([
            "comparekit",
            "-vv",
            "enrich",
            "--raw",
            "in.csv",
            "--out",
            "out.csv",
            "--force",
            "--limit",
            "3",
            "--rate-limit-ms",
            "0",
            "--completeness",
            "fast",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Enrich {
            tables,
            force,
            limit,
            rate_limit_ms,
        } = cli.command
        else {
            panic!("expected enrich");
        };
        assert!(force);
        assert_eq!(limit, Some(3));
        assert_eq!(rate_limit_ms, Some(0));
        assert_eq!(tables.raw, Some(PathBuf::from("in.csv")));
        assert_eq!(tables.completeness, Some(CompletenessMode::Fast));
    }

    #[test]
    fn summary_reports_start_time_and_failures() {
        let config = RunConfig::from(&AppConfig::default());
        let summary = RunSummary {
            attempted: 2,
            enriched: 1,
            failed: vec![("Beta".into(), "timeout".into())],
            skipped_complete: 3,
            rejected: 0,
            limit_reached: false,
            started_at: "2026-03-04T05:06:07Z".parse().unwrap(),
            elapsed: Duration::from_millis(1500),
        };

        let lines = summary_lines(&config, &summary);
        assert_eq!(lines[0], "  Enriched data updated!");
        assert!(lines.contains(&"  Started:   2026-03-04 05:06:07 UTC".to_string()));
        assert!(lines.contains(&"  Time:      1.5s".to_string()));
        assert!(lines.contains(&"    ✗ Beta: timeout".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Limit")));
    }

    #[test]
    fn completeness_help_explains_modes() {
        let help = Cli::command()
            .find_subcommand_mut("enrich")
            .unwrap()
            .render_long_help()
            .to_string();
        assert!(help.contains("strict (default) or fast"), "{help}");
        assert!(help.contains("English and Portuguese"), "{help}");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let dir = std::env::temp_dir().join(format!("ck_cli_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("comparekit.toml");
        std::fs::write(
            &path,
            "[paths]\nraw_table = \"file.csv\"\nkey_column = \"Name\"\n\n[enrichment]\nrate_limit_ms = 10\n",
        )
        .unwrap();

        let tables = TableArgs {
            raw: Some(PathBuf::from("flag.csv")),
            ..TableArgs::default()
        };
        let config = resolve_config(Some(&path), &tables).unwrap();
        assert_eq!(config.paths.raw_table, "flag.csv");
        assert_eq!(config.paths.key_column, "Name");
        assert_eq!(config.enrichment.rate_limit_ms, 10);

        let blank = TableArgs {
            key_column: Some(" ".into()),
            ..TableArgs::default()
        };
        assert!(resolve_config(Some(&path), &blank).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
