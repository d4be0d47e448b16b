//! Catalog aggregation engine for coursegen.
//!
//! This crate turns the remote catalog into the in-memory
//! school → program → course-group structure: section normalization,
//! grouping, the concurrent retrying fetch phase, and the GE tag merge.

pub mod diagnostics;
pub mod fetch;
pub mod ge;
pub mod group;
pub mod index;
pub mod normalize;
pub mod pipeline;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Report, UnitFailure};
pub use fetch::{FetchOptions, FetchOutcome, fetch_catalog, fetch_program};
pub use ge::{GE_CATEGORIES, GeCategory, GeMerger};
pub use index::ProgramIndex;
pub use pipeline::{
    AggregateConfig, AggregateResult, ProgressReporter, SilentProgress, aggregate, load_catalog,
};
pub use retry::RetryPolicy;
