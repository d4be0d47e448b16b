//! Fold normalized sections into deduplicated [`CourseGroup`]s.

use std::collections::{HashMap, HashSet};

use coursegen_client::RawCourse;
use coursegen_shared::{CourseGroup, CourseKey, Section};

use crate::diagnostics::Diagnostics;
use crate::normalize::{NormalizedSection, normalize_course};

/// Section codes already present in one group.
///
/// Empty or missing codes are never recorded, so sections without a code
/// are always kept.
#[derive(Debug, Default)]
struct SeenCodes(HashSet<String>);

impl SeenCodes {
    fn from_sections(sections: &[Section]) -> Self {
        Self(
            sections
                .iter()
                .filter_map(Section::dedup_code)
                .map(str::to_string)
                .collect(),
        )
    }

    /// Returns `false` when `section` duplicates a recorded code.
    fn admit(&mut self, section: &Section) -> bool {
        match section.dedup_code() {
            Some(code) => self.0.insert(code.to_string()),
            None => true,
        }
    }
}

/// Group sections by identity key, preserving first-seen key order.
///
/// Within a key, sections keep input order and a repeated section code keeps
/// only its first occurrence.
pub fn group_sections(sections: impl IntoIterator<Item = NormalizedSection>) -> Vec<CourseGroup> {
    let mut groups: Vec<(CourseGroup, SeenCodes)> = Vec::new();
    let mut positions: HashMap<CourseKey, usize> = HashMap::new();

    for NormalizedSection { key, section } in sections {
        let idx = match positions.get(&key) {
            Some(&idx) => idx,
            None => {
                groups.push((CourseGroup::new(key.clone()), SeenCodes::default()));
                positions.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };

        let (group, seen) = &mut groups[idx];
        if seen.admit(&section) {
            group.sections.push(section);
        }
    }

    groups.into_iter().map(|(group, _)| group).collect()
}

/// Normalize and group a batch of raw courses.
pub fn group_courses(
    courses: &[RawCourse],
    preferred_prefix: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Vec<CourseGroup> {
    group_sections(
        courses
            .iter()
            .flat_map(|course| normalize_course(course, preferred_prefix, diagnostics)),
    )
}

/// Append `incoming` sections to `group`, skipping codes it already has.
///
/// Returns the number of sections added.
pub fn merge_sections(
    group: &mut CourseGroup,
    incoming: impl IntoIterator<Item = Section>,
) -> usize {
    let mut seen = SeenCodes::from_sections(&group.sections);
    let before = group.sections.len();
    for section in incoming {
        if seen.admit(&section) {
            group.sections.push(section);
        }
    }
    group.sections.len() - before
}
