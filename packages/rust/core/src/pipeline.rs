//! End-to-end aggregation: catalog listing → fetch phase → GE merge.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use coursegen_client::{CatalogSource, RawSchool};
use coursegen_shared::{Aggregation, Catalog, FetchConfig, Program, Result, School};

use crate::diagnostics::{Diagnostics, Report, UnitFailure};
use crate::fetch::{FetchOptions, fetch_catalog};
use crate::ge::{GeCategory, GeMerger};
use crate::index::ProgramIndex;
use crate::retry::RetryPolicy;

/// Configuration for one `aggregate` run.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Term code, e.g. `20253`.
    pub term: String,
    pub fetch: FetchConfig,
}

/// Everything one run produced.
#[derive(Debug)]
pub struct AggregateResult {
    pub term: String,
    /// Catalog with the synthetic GE school first.
    pub catalog: Catalog,
    pub courses: Aggregation,
    /// Units that exhausted their retries.
    pub failures: Vec<UnitFailure>,
    /// Records skipped while normalizing or routing.
    pub diagnostics: Diagnostics,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback trait for CLI feedback.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called each time a program unit settles, successfully or not.
    fn unit_finished(&self, unit: &str, ok: bool, finished: usize, total: usize);
    /// Called after a GE category has been merged.
    fn category_merged(&self, category: &GeCategory, routed: usize);
    /// Called when the run completes.
    fn done(&self, result: &AggregateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn unit_finished(&self, _unit: &str, _ok: bool, _finished: usize, _total: usize) {}
    fn category_merged(&self, _category: &GeCategory, _routed: usize) {}
    fn done(&self, _result: &AggregateResult) {}
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Convert the remote school listing into canonical form.
///
/// Schools or programs without a prefix cannot be addressed and are dropped.
pub fn catalog_from_listing(listing: Vec<RawSchool>) -> Vec<School> {
    listing
        .into_iter()
        .filter_map(|raw| {
            let prefix = raw.prefix.filter(|p| !p.trim().is_empty());
            let Some(prefix) = prefix else {
                warn!(name = ?raw.name, "school without prefix dropped");
                return None;
            };
            let programs = raw
                .programs
                .unwrap_or_default()
                .into_iter()
                .filter_map(|program| {
                    let prefix = program.prefix.filter(|p| !p.trim().is_empty())?;
                    Some(Program {
                        name: program.name.unwrap_or_else(|| prefix.clone()),
                        prefix,
                    })
                })
                .collect();
            Some(School {
                name: raw.name.unwrap_or_else(|| prefix.clone()),
                prefix,
                programs,
            })
        })
        .collect()
}

/// Fetch the term's catalog with retries and inject the GE school.
pub async fn load_catalog<S: CatalogSource>(
    source: &S,
    term: &str,
    retry: &RetryPolicy,
) -> Result<Catalog> {
    let listing = retry
        .run("catalog", || source.list_catalog(term))
        .await?;
    Ok(Catalog::with_general_education(catalog_from_listing(listing)))
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Run the full aggregation for one term.
///
/// 1. Catalog listing (fatal if it cannot be fetched)
/// 2. Reverse index
/// 3. Concurrent per-program fetch
/// 4. GE seminar and category merge, after every program has settled
#[instrument(skip_all, fields(term = %config.term))]
pub async fn aggregate<S>(
    source: Arc<S>,
    config: &AggregateConfig,
    progress: &dyn ProgressReporter,
) -> Result<AggregateResult>
where
    S: CatalogSource + 'static,
{
    let start = Instant::now();
    let retry = RetryPolicy::from(&config.fetch);

    info!(term = %config.term, "starting aggregation");

    // --- Phase 1: Catalog ---
    progress.phase("Fetching catalog");
    let catalog = load_catalog(source.as_ref(), &config.term, &retry)
        .await
        .inspect_err(|e| error!(error = %e, "catalog listing failed"))?;
    info!(
        schools = catalog.schools.len(),
        programs = catalog.program_count(),
        "catalog loaded"
    );

    // --- Phase 2: Reverse index ---
    let index = ProgramIndex::build(&catalog);

    // --- Phase 3: Programs ---
    progress.phase("Fetching programs");
    let options = FetchOptions {
        concurrency: config.fetch.concurrency,
        retry,
    };
    let fetched =
        fetch_catalog(Arc::clone(&source), &config.term, &catalog, &options, progress).await;
    let mut courses = fetched.courses;
    let mut report: Report = fetched.report;

    // --- Phase 4: General Education ---
    progress.phase("Merging GE categories");
    GeMerger::new(source.as_ref(), &config.term, &index, retry)
        .run(&mut courses, &mut report, progress)
        .await;

    let result = AggregateResult {
        term: config.term.clone(),
        catalog,
        courses,
        failures: report.failures,
        diagnostics: report.diagnostics,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        programs = result.courses.program_count(),
        groups = result.courses.group_count(),
        failures = result.failures.len(),
        skipped = result.diagnostics.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "aggregation complete"
    );

    Ok(result)
}
