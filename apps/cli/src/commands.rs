//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use coursegen_artifacts::write_term_output;
use coursegen_client::HttpCatalogSource;
use coursegen_core::{
    AggregateConfig, AggregateResult, GeCategory, ProgressReporter, RetryPolicy, aggregate,
    load_catalog,
};
use coursegen_shared::{AppConfig, FetchConfig, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// coursegen: build static course catalog data for a term.
#[derive(Parser)]
#[command(
    name = "coursegen",
    version,
    about = "Aggregate a term's course catalog into static JSON data files.",
    long_about = None,
)]
pub(crate) struct Cli {
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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the whole catalog for a term and write its data files.
    Generate {
        /// Term code (defaults to `defaults.term` from config).
        #[arg(short, long)]
        term: Option<String>,

        /// Output root; files land in <out>/<term>/ (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Maximum concurrent program fetches.
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Print the school/program listing for a term.
    Catalog {
        /// Term code (defaults to `defaults.term` from config).
        #[arg(short, long)]
        term: Option<String>,

        /// Print as JSON instead of a plain listing.
        #[arg(long)]
        json: bool,
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
        0 => "coursegen=info",
        1 => "coursegen=debug",
        _ => "coursegen=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            term,
            out,
            concurrency,
        } => cmd_generate(term, out, concurrency).await,
        Command::Catalog { term, json } => cmd_catalog(term, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn http_source(config: &AppConfig, fetch: &FetchConfig) -> Result<HttpCatalogSource> {
    let base_url = config.api.parsed_base_url()?;
    Ok(HttpCatalogSource::new(base_url, fetch.request_timeout)?)
}

async fn cmd_generate(
    term: Option<String>,
    out: Option<PathBuf>,
    concurrency: Option<usize>,
) -> Result<()> {
    let config = load_config()?;

    let term = term.unwrap_or_else(|| config.defaults.term.clone());
    if term.trim().is_empty() {
        return Err(eyre!("term code must not be empty"));
    }
    let output_dir = out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));

    let mut fetch = FetchConfig::from(&config);
    if let Some(n) = concurrency {
        fetch.concurrency = n.max(1);
    }

    let source = Arc::new(http_source(&config, &fetch)?);

    info!(
        term = %term,
        base_url = %config.api.base_url,
        concurrency = fetch.concurrency,
        "generating course data"
    );

    let aggregate_config = AggregateConfig {
        term: term.clone(),
        fetch,
    };
    let reporter = CliProgress::new();
    let result = aggregate(source, &aggregate_config, &reporter)
        .await
        .inspect_err(|_| reporter.spinner.finish_and_clear())?;

    let output = write_term_output(&output_dir, &result, env!("CARGO_PKG_VERSION"))?;

    // Print summary
    println!();
    println!("  Course data generated.");
    println!("  Term:     {term}");
    println!("  Programs: {}", result.courses.program_count());
    println!("  Courses:  {}", result.courses.group_count());
    println!("  Skipped:  {} records", result.diagnostics.len());
    println!("  Path:     {}", output.dir.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    if !result.failures.is_empty() {
        println!();
        println!("  {} unit(s) failed after retries:", result.failures.len());
        for failure in &result.failures {
            println!("    {failure}");
        }
    }
    println!();

    Ok(())
}

async fn cmd_catalog(term: Option<String>, json: bool) -> Result<()> {
    let config = load_config()?;
    let term = term.unwrap_or_else(|| config.defaults.term.clone());
    let fetch = FetchConfig::from(&config);
    let source = http_source(&config, &fetch)?;

    let catalog = load_catalog(&source, &term, &RetryPolicy::from(&fetch)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    for school in &catalog.schools {
        println!("{} ({})", school.name, school.prefix);
        for program in &school.programs {
            println!("  {:<8} {}", program.prefix, program.name);
        }
    }
    println!();
    println!(
        "{} schools, {} programs",
        catalog.schools.len(),
        catalog.program_count()
    );
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn unit_finished(&self, unit: &str, ok: bool, finished: usize, total: usize) {
        if !ok {
            self.spinner.suspend(|| warn!(unit, "program unit failed"));
        }
        self.spinner
            .set_message(format!("Fetching programs [{finished}/{total}] {unit}"));
    }

    fn category_merged(&self, category: &GeCategory, routed: usize) {
        self.spinner.set_message(format!(
            "Merged GE {} ({}/{}): {routed} courses",
            category.letter, category.requirement, category.category
        ));
    }

    fn done(&self, _result: &AggregateResult) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
