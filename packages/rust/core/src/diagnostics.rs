//! Side channel for skipped records and failed units.
//!
//! Per-record problems never fail a unit of work; they are recorded here so
//! callers (and tests) can count them without scraping log output.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Why a record was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A course entry was not a course object.
    CourseSkipped,
    /// A course field had an unusable shape and was ignored.
    FieldIgnored,
    /// A section entry could not be decoded.
    SectionSkipped,
    /// A prerequisite reference had no usable course code.
    PrerequisiteSkipped,
    /// A course-code variant had an unexpected shape.
    CourseCodeSkipped,
    /// A GE course could not be routed to an owning program/school.
    UnroutableCourse,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CourseSkipped => "course skipped",
            Self::FieldIgnored => "field ignored",
            Self::SectionSkipped => "section skipped",
            Self::PrerequisiteSkipped => "prerequisite skipped",
            Self::CourseCodeSkipped => "course code skipped",
            Self::UnroutableCourse => "unroutable course",
        };
        f.write_str(s)
    }
}

/// One skipped record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The course or section the record belonged to.
    pub subject: String,
    pub reason: String,
}

/// Collected [`Diagnostic`]s. Each worker owns one; the collector merges them.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped record and log it.
    pub fn record(
        &mut self,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        reason: impl Into<String>,
    ) {
        let entry = Diagnostic {
            kind,
            subject: subject.into(),
            reason: reason.into(),
        };
        match kind {
            DiagnosticKind::UnroutableCourse => {
                debug!(
                    subject = %entry.subject,
                    reason = %entry.reason,
                    "dropping unroutable course"
                );
            }
            _ => {
                warn!(subject = %entry.subject, reason = %entry.reason, "{kind}");
            }
        }
        self.entries.push(entry);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

/// A unit of remote work (one program fetch or one GE feed) that failed
/// after exhausting its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    /// `SCHOOL/PROGRAM`, `GE REQUIREMENT/CATEGORY`, or `catalog`.
    pub unit: String,
    pub error: String,
}

impl UnitFailure {
    pub fn new(unit: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            unit: unit.into(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.error)
    }
}

/// Everything non-fatal that went wrong during a run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub failures: Vec<UnitFailure>,
    pub diagnostics: Diagnostics,
}

impl Report {
    pub fn merge(&mut self, other: Report) {
        self.failures.extend(other.failures);
        self.diagnostics.extend(other.diagnostics);
    }
}
