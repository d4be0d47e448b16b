//! General Education ingestion.
//!
//! Runs after the fetch phase has finished. The seminar feed is stored as
//! the synthetic `GE/GESM` program; every other GE category feed is routed
//! course by course to the program that owns it and merged into that
//! program's groups, tagging them with the category letter.

use std::slice;

use tracing::{error, info, instrument, warn};

use coursegen_client::{CatalogSource, RawCourse};
use coursegen_shared::{Aggregation, CourseGroup, GE_PROGRAM_PREFIX, GE_SCHOOL_PREFIX, Result};

use crate::diagnostics::{DiagnosticKind, Diagnostics, Report, UnitFailure};
use crate::fetch::fetch_program;
use crate::group::{group_courses, merge_sections};
use crate::index::ProgramIndex;
use crate::normalize::CourseCodes;
use crate::pipeline::ProgressReporter;
use crate::retry::RetryPolicy;

/// One GE category feed and the letter its courses are tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeCategory {
    /// Requirement type, e.g. `ACORELIT`.
    pub requirement: &'static str,
    /// Category code within the requirement, e.g. `ARTS`.
    pub category: &'static str,
    pub letter: char,
}

impl GeCategory {
    pub fn unit(&self) -> String {
        format!("GE {}/{}", self.requirement, self.category)
    }
}

/// Requirement type of the seminar feed.
pub const SEMINAR_REQUIREMENT: &str = "ACORELIT";

/// Category feeds in ingestion order.
pub const GE_CATEGORIES: [GeCategory; 8] = [
    GeCategory {
        requirement: "ACORELIT",
        category: "ARTS",
        letter: 'A',
    },
    GeCategory {
        requirement: "ACORELIT",
        category: "HINQ",
        letter: 'B',
    },
    GeCategory {
        requirement: "ACORELIT",
        category: "SANA",
        letter: 'C',
    },
    GeCategory {
        requirement: "ACORELIT",
        category: "LIFE",
        letter: 'D',
    },
    GeCategory {
        requirement: "ACORELIT",
        category: "PSC",
        letter: 'E',
    },
    GeCategory {
        requirement: "ACORELIT",
        category: "QREA",
        letter: 'F',
    },
    GeCategory {
        requirement: "AGLOPERS",
        category: "GPG",
        letter: 'G',
    },
    GeCategory {
        requirement: "AGLOPERS",
        category: "GPH",
        letter: 'H',
    },
];

/// Merge `incoming` into `target`, tagging it with `letter`.
///
/// An existing group with the same identity key absorbs the incoming
/// sections (deduplicated by section code) and gains the letter; otherwise
/// the group is appended carrying only that letter. Repeating a merge
/// changes nothing.
pub fn merge_group(target: &mut Vec<CourseGroup>, incoming: CourseGroup, letter: char) {
    let key = incoming.key();
    match target.iter_mut().find(|group| group.has_key(&key)) {
        Some(existing) => {
            merge_sections(existing, incoming.sections);
            existing.add_ge_tag(letter);
        }
        None => {
            let mut group = incoming;
            group.ge = None;
            group.add_ge_tag(letter);
            target.push(group);
        }
    }
}

/// Counts from one category ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    /// Courses returned by the feed.
    pub received: usize,
    /// Courses routed to an owning program.
    pub routed: usize,
}

/// Sequential GE ingestion over an already-populated [`Aggregation`].
pub struct GeMerger<'a, S> {
    source: &'a S,
    term: &'a str,
    index: &'a ProgramIndex,
    retry: RetryPolicy,
}

impl<'a, S: CatalogSource> GeMerger<'a, S> {
    pub fn new(source: &'a S, term: &'a str, index: &'a ProgramIndex, retry: RetryPolicy) -> Self {
        Self {
            source,
            term,
            index,
            retry,
        }
    }

    /// Seminars first, then every category in [`GE_CATEGORIES`] order.
    ///
    /// A failing feed is recorded in `report` and skipped.
    #[instrument(skip_all, fields(term = %self.term))]
    pub async fn run(
        &self,
        courses: &mut Aggregation,
        report: &mut Report,
        progress: &dyn ProgressReporter,
    ) {
        let seminars = self.ingest_seminars(courses, report).await;
        info!(groups = seminars, "seminar ingestion complete");

        for category in &GE_CATEGORIES {
            match self
                .ingest_category(courses, category, &mut report.diagnostics)
                .await
            {
                Ok(stats) => {
                    info!(
                        unit = %category.unit(),
                        letter = %category.letter,
                        received = stats.received,
                        routed = stats.routed,
                        "GE category merged"
                    );
                    progress.category_merged(category, stats.routed);
                }
                Err(e) => {
                    error!(unit = %category.unit(), error = %e, "GE category failed");
                    report.failures.push(UnitFailure::new(category.unit(), e));
                }
            }
        }
    }

    /// Store the seminar feed as `GE/GESM`, replacing any previous entry.
    ///
    /// When the feed fails or is empty, the normal program feed of whichever
    /// school owns `GESM` is used instead. Returns the number of groups stored.
    pub async fn ingest_seminars(&self, courses: &mut Aggregation, report: &mut Report) -> usize {
        let unit = format!("GE {SEMINAR_REQUIREMENT}/{GE_PROGRAM_PREFIX}");
        let primary = self
            .retry
            .run(&unit, || {
                self.source
                    .list_category_courses(self.term, SEMINAR_REQUIREMENT, GE_PROGRAM_PREFIX)
            })
            .await;

        let mut groups = match primary {
            Ok(raw) => group_courses(&raw, Some(GE_PROGRAM_PREFIX), &mut report.diagnostics),
            Err(e) => {
                error!(%unit, error = %e, "seminar feed failed");
                report.failures.push(UnitFailure::new(unit, e));
                Vec::new()
            }
        };

        if groups.is_empty() {
            groups = self.seminar_fallback(report).await;
        }

        let stored = groups.len();
        if stored > 0 {
            courses.insert(GE_SCHOOL_PREFIX, GE_PROGRAM_PREFIX, groups);
        }
        stored
    }

    async fn seminar_fallback(&self, report: &mut Report) -> Vec<CourseGroup> {
        let Some(owner) = self.index.school_for(GE_PROGRAM_PREFIX) else {
            warn!("no school owns {GE_PROGRAM_PREFIX}, skipping seminar fallback");
            return Vec::new();
        };

        info!(school = owner, "seminar feed empty, falling back to program feed");
        match fetch_program(
            self.source,
            self.term,
            owner,
            GE_PROGRAM_PREFIX,
            &self.retry,
            &mut report.diagnostics,
        )
        .await
        {
            Ok(groups) => groups,
            Err(e) => {
                let unit = format!("{owner}/{GE_PROGRAM_PREFIX}");
                error!(%unit, error = %e, "seminar fallback failed");
                report.failures.push(UnitFailure::new(unit, e));
                Vec::new()
            }
        }
    }

    /// Fetch one category feed and merge each routable course into its
    /// owning program.
    pub async fn ingest_category(
        &self,
        courses: &mut Aggregation,
        category: &GeCategory,
        diagnostics: &mut Diagnostics,
    ) -> Result<CategoryStats> {
        let raw = self
            .retry
            .run(&category.unit(), || {
                self.source
                    .list_category_courses(self.term, category.requirement, category.category)
            })
            .await?;

        let mut stats = CategoryStats {
            received: raw.len(),
            routed: 0,
        };
        for course in &raw {
            if self.merge_course(courses, course, category.letter, diagnostics) {
                stats.routed += 1;
            }
        }
        Ok(stats)
    }

    /// Route one GE course to its owning program and merge it there.
    /// Returns `false` when the course cannot be routed.
    fn merge_course(
        &self,
        courses: &mut Aggregation,
        course: &RawCourse,
        letter: char,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        let codes = CourseCodes::decode(course);
        let label = codes
            .resolve(None)
            .or_else(|| course.name.clone())
            .unwrap_or_else(|| "<unnamed course>".into());

        if let Some(reason) = &course.rejected {
            diagnostics.record(DiagnosticKind::CourseSkipped, label, reason.as_str());
            return false;
        }

        let Some(program) = codes.owner_prefix() else {
            diagnostics.record(DiagnosticKind::UnroutableCourse, label, "no subject prefix");
            return false;
        };
        let Some(school) = self.index.school_for(&program) else {
            diagnostics.record(
                DiagnosticKind::UnroutableCourse,
                label,
                format!("no school owns program {program}"),
            );
            return false;
        };

        let groups = group_courses(slice::from_ref(course), Some(&program), diagnostics);
        let target = courses.program_mut(school, &program);
        for group in groups {
            merge_group(target, group, letter);
        }
        true
    }
}
