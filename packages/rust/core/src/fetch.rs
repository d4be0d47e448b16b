//! Concurrent, retrying per-program fetch phase.
//!
//! Every (school, program) pair of the catalog except the synthetic GE
//! school becomes one task. Tasks run on a bounded pool, each retrying its
//! own remote call, and hand their result back to a single collector that
//! owns the [`Aggregation`]. Workers never touch shared output state.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use coursegen_client::CatalogSource;
use coursegen_shared::{
    Aggregation, Catalog, CourseGenError, CourseGroup, GE_SCHOOL_PREFIX, Result,
};

use crate::diagnostics::{Diagnostics, Report, UnitFailure};
use crate::group::group_courses;
use crate::pipeline::ProgressReporter;
use crate::retry::RetryPolicy;

/// Pool width and retry policy for the fetch phase.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: 12,
            retry: RetryPolicy::default(),
        }
    }
}

/// Result of the fetch phase.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// One entry per successfully fetched program.
    pub courses: Aggregation,
    pub report: Report,
    /// Number of (school, program) units scheduled.
    pub scheduled: usize,
}

/// What one worker hands back to the collector.
struct ProgramFetch {
    school: String,
    program: String,
    result: Result<Vec<CourseGroup>>,
    diagnostics: Diagnostics,
}

/// Fetch, normalize and group the courses of one program, with retries.
pub async fn fetch_program<S: CatalogSource>(
    source: &S,
    term: &str,
    school: &str,
    program: &str,
    retry: &RetryPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CourseGroup>> {
    let unit = format!("{school}/{program}");
    let courses = retry
        .run(&unit, || source.list_program_courses(term, school, program))
        .await?;
    Ok(group_courses(&courses, Some(program), diagnostics))
}

/// Run the fetch phase over the whole catalog.
///
/// A unit that exhausts its retries is recorded in the report and leaves no
/// entry in the aggregation; it never affects other units.
#[instrument(skip_all, fields(term = %term, concurrency = options.concurrency))]
pub async fn fetch_catalog<S>(
    source: Arc<S>,
    term: &str,
    catalog: &Catalog,
    options: &FetchOptions,
    progress: &dyn ProgressReporter,
) -> FetchOutcome
where
    S: CatalogSource + 'static,
{
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (school, program) in catalog
        .pairs()
        .filter(|(school, _)| *school != GE_SCHOOL_PREFIX)
    {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let term = term.to_string();
        let school = school.to_string();
        let program = program.to_string();
        let retry = options.retry;

        tasks.spawn(async move {
            let mut diagnostics = Diagnostics::new();
            let result = match semaphore.acquire().await {
                Ok(_permit) => {
                    fetch_program(
                        source.as_ref(),
                        &term,
                        &school,
                        &program,
                        &retry,
                        &mut diagnostics,
                    )
                    .await
                }
                Err(e) => Err(CourseGenError::Task(format!("worker pool closed: {e}"))),
            };
            ProgramFetch {
                school,
                program,
                result,
                diagnostics,
            }
        });
    }

    let total = tasks.len();
    info!(units = total, "fetching program courses");

    let mut outcome = FetchOutcome {
        scheduled: total,
        ..FetchOutcome::default()
    };
    let mut finished = 0;

    // Collected in completion order; keys are unique per unit.
    while let Some(joined) = tasks.join_next().await {
        finished += 1;
        match joined {
            Ok(fetch) => {
                let unit = format!("{}/{}", fetch.school, fetch.program);
                outcome.report.diagnostics.extend(fetch.diagnostics);
                match fetch.result {
                    Ok(groups) => {
                        info!(%unit, groups = groups.len(), "program fetched");
                        progress.unit_finished(&unit, true, finished, total);
                        outcome.courses.insert(fetch.school, fetch.program, groups);
                    }
                    Err(e) => {
                        error!(%unit, error = %e, "program fetch failed");
                        progress.unit_finished(&unit, false, finished, total);
                        outcome.report.failures.push(UnitFailure::new(unit, e));
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "fetch task did not complete");
                progress.unit_finished("<task>", false, finished, total);
                outcome
                    .report
                    .failures
                    .push(UnitFailure::new("<task>", CourseGenError::Task(e.to_string())));
            }
        }
    }

    info!(
        fetched = outcome.courses.program_count(),
        failed = outcome.report.failures.len(),
        "fetch phase complete"
    );

    outcome
}
