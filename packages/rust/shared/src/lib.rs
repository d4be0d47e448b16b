//! Shared types, error model, and configuration for coursegen.
//!
//! This crate is the foundation depended on by all other coursegen crates.
//! It provides:
//! - [`CourseGenError`]: the unified error type
//! - Domain types ([`Catalog`], [`Section`], [`CourseGroup`], [`Aggregation`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, DefaultsConfig, FetchConfig, FetchPoliciesConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CourseGenError, Result};
pub use types::{
    Aggregation, Catalog, CourseGroup, CourseKey, GE_PROGRAM_PREFIX, GE_SCHOOL_PREFIX,
    ProgramCourses, Program, School, Section, Units,
};
