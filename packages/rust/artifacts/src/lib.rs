//! On-disk output for one aggregation run.
//!
//! Layout under `<output_dir>/<term>/`:
//!
//! ```text
//! programs.json   {"schools": [...], "success": true}
//! courses.json    {SCHOOL: {PROGRAM: [CourseGroup]}}
//! manifest.json   run metadata, failures and skip counts
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use coursegen_core::{AggregateResult, DiagnosticKind, UnitFailure};
use coursegen_shared::{Catalog, CourseGenError, Result, School};

pub const PROGRAMS_FILE: &str = "programs.json";
pub const COURSES_FILE: &str = "courses.json";
pub const MANIFEST_FILE: &str = "manifest.json";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Body of `programs.json`.
#[derive(Debug, Serialize)]
struct ProgramsFile<'a> {
    schools: &'a [School],
    success: bool,
}

/// Body of `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub term: String,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub school_count: usize,
    pub program_count: usize,
    pub course_group_count: usize,
    pub failures: Vec<ManifestFailure>,
    /// Skipped record counts keyed by kind.
    pub skipped_records: BTreeMap<DiagnosticKind, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFailure {
    pub unit: String,
    pub error: String,
}

impl From<&UnitFailure> for ManifestFailure {
    fn from(failure: &UnitFailure) -> Self {
        Self {
            unit: failure.unit.clone(),
            error: failure.error.clone(),
        }
    }
}

impl Manifest {
    pub fn from_result(result: &AggregateResult, tool_version: &str) -> Self {
        let mut skipped_records = BTreeMap::new();
        for diagnostic in result.diagnostics.iter() {
            *skipped_records.entry(diagnostic.kind).or_default() += 1;
        }

        Self {
            term: result.term.clone(),
            generated_at: Utc::now(),
            tool_version: tool_version.to_string(),
            school_count: result.courses.schools().count(),
            program_count: result.courses.program_count(),
            course_group_count: result.courses.group_count(),
            failures: result.failures.iter().map(ManifestFailure::from).collect(),
            skipped_records,
        }
    }
}

/// Paths of the files written for one term.
#[derive(Debug, Clone)]
pub struct TermOutput {
    pub dir: PathBuf,
    pub programs: PathBuf,
    pub courses: PathBuf,
    pub manifest: PathBuf,
}

impl TermOutput {
    pub fn new(output_dir: &Path, term: &str) -> Self {
        let dir = output_dir.join(term);
        Self {
            programs: dir.join(PROGRAMS_FILE),
            courses: dir.join(COURSES_FILE),
            manifest: dir.join(MANIFEST_FILE),
            dir,
        }
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write all three files for `result` under `<output_dir>/<term>/`.
///
/// Existing files are overwritten.
#[instrument(skip_all, fields(term = %result.term, dir = %output_dir.display()))]
pub fn write_term_output(
    output_dir: &Path,
    result: &AggregateResult,
    tool_version: &str,
) -> Result<TermOutput> {
    let output = TermOutput::new(output_dir, &result.term);
    std::fs::create_dir_all(&output.dir).map_err(|e| CourseGenError::io(&output.dir, e))?;

    write_programs(&output.programs, &result.catalog)?;
    write_json(&output.courses, &result.courses, false)?;

    let manifest = Manifest::from_result(result, tool_version);
    write_json(&output.manifest, &manifest, true)?;

    info!(
        dir = %output.dir.display(),
        programs = manifest.program_count,
        groups = manifest.course_group_count,
        "wrote term output"
    );
    Ok(output)
}

/// Write `programs.json` for a catalog.
pub fn write_programs(path: &Path, catalog: &Catalog) -> Result<()> {
    let body = ProgramsFile {
        schools: &catalog.schools,
        success: true,
    };
    write_json(path, &body, false)
}

/// Read back a manifest written by [`write_term_output`].
pub fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| CourseGenError::io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| CourseGenError::decode(format!("{}: {e}", path.display())))
}

fn write_json<T: Serialize>(path: &Path, data: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(data)
    } else {
        serde_json::to_string(data)
    }
    .map_err(|e| CourseGenError::validation(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| CourseGenError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use coursegen_core::Diagnostics;
    use coursegen_shared::{Aggregation, CourseGroup, CourseKey, Program};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("coursegen-artifacts-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn group(code: &str, title: &str) -> CourseGroup {
        CourseGroup::new(CourseKey {
            title: Some(title.into()),
            description: None,
            course_code: Some(code.into()),
        })
    }

    fn make_result() -> AggregateResult {
        let catalog = Catalog::with_general_education(vec![School {
            name: "Engineering".into(),
            prefix: "ENGR".into(),
            programs: vec![Program {
                name: "Computer Science".into(),
                prefix: "CSCI".into(),
            }],
        }]);

        let mut courses = Aggregation::new();
        courses.insert(
            "ENGR",
            "CSCI",
            vec![group("CSCI-103", "Intro"), group("CSCI-104", "Data Structures")],
        );
        let mut seminar = group("GESM-120", "Seminar");
        seminar.add_ge_tag("A");
        courses.insert("GE", "GESM", vec![seminar]);

        let mut diagnostics = Diagnostics::new();
        diagnostics.record(DiagnosticKind::SectionSkipped, "CSCI-103", "bad section");
        diagnostics.record(DiagnosticKind::SectionSkipped, "CSCI-104", "bad section");
        diagnostics.record(DiagnosticKind::UnroutableCourse, "XYZ-100", "no owner");

        AggregateResult {
            term: "20253".into(),
            catalog,
            courses,
            failures: vec![UnitFailure::new("ENGR/EE", "timed out")],
            diagnostics,
            elapsed: Duration::from_secs(3),
        }
    }

    fn read_value(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_term_directory() {
        let tmp = temp_dir();
        let output =
            write_term_output(&tmp.join("public/data"), &make_result(), "0.1.0-test").unwrap();

        assert_eq!(output.dir, tmp.join("public/data/20253"));
        assert!(output.programs.exists());
        assert!(output.courses.exists());
        assert!(output.manifest.exists());

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn programs_file_lists_ge_first() {
        let tmp = temp_dir();
        let output = write_term_output(&tmp, &make_result(), "0.1.0-test").unwrap();

        let programs = read_value(&output.programs);
        assert_eq!(programs["success"], true);
        assert_eq!(programs["schools"][0]["prefix"], "GE");
        assert_eq!(programs["schools"][0]["programs"][0]["prefix"], "GESM");
        assert_eq!(programs["schools"][1]["programs"][0]["name"], "Computer Science");

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn courses_file_is_sorted_and_stable() {
        let tmp = temp_dir();
        let result = make_result();
        let output = write_term_output(&tmp, &result, "0.1.0-test").unwrap();
        let first = std::fs::read_to_string(&output.courses).unwrap();

        write_term_output(&tmp, &result, "0.1.0-test").unwrap();
        let second = std::fs::read_to_string(&output.courses).unwrap();
        assert_eq!(first, second);

        // BTreeMap ordering puts ENGR before GE
        assert!(first.find("\"ENGR\"").unwrap() < first.find("\"GE\"").unwrap());

        let courses = read_value(&output.courses);
        assert_eq!(courses["ENGR"]["CSCI"].as_array().unwrap().len(), 2);
        assert_eq!(courses["GE"]["GESM"][0]["GE"], serde_json::json!(["A"]));
        assert!(courses["ENGR"]["CSCI"][0].get("GE").is_none());

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn manifest_counts_and_failures() {
        let tmp = temp_dir();
        let output = write_term_output(&tmp, &make_result(), "0.1.0-test").unwrap();

        let manifest = read_manifest(&output.dir).unwrap();
        assert_eq!(manifest.term, "20253");
        assert_eq!(manifest.tool_version, "0.1.0-test");
        assert_eq!(manifest.school_count, 2);
        assert_eq!(manifest.program_count, 2);
        assert_eq!(manifest.course_group_count, 3);
        assert_eq!(
            manifest.failures,
            vec![ManifestFailure {
                unit: "ENGR/EE".into(),
                error: "timed out".into(),
            }]
        );
        assert_eq!(manifest.skipped_records.get(&DiagnosticKind::SectionSkipped), Some(&2));
        assert_eq!(manifest.skipped_records.get(&DiagnosticKind::UnroutableCourse), Some(&1));
        assert!(!manifest.skipped_records.contains_key(&DiagnosticKind::PrerequisiteSkipped));

        // Keys use the diagnostic kind's serialized names
        let raw = read_value(&output.manifest);
        assert_eq!(raw["skipped_records"]["section_skipped"], 2);
        assert_eq!(raw["skipped_records"]["unroutable_course"], 1);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn read_manifest_missing_is_io_error() {
        let tmp = temp_dir();
        let err = read_manifest(&tmp).unwrap_err();
        assert!(matches!(err, CourseGenError::Io { .. }));
        std::fs::remove_dir_all(&tmp).ok();
    }
}
