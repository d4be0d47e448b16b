//! Core domain types for the aggregated course catalog.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Prefix of the synthetic school hosting seminar-style GE offerings.
pub const GE_SCHOOL_PREFIX: &str = "GE";

/// Prefix of the synthetic seminar program under [`GE_SCHOOL_PREFIX`].
pub const GE_PROGRAM_PREFIX: &str = "GESM";

// ---------------------------------------------------------------------------
// Catalog (schools and programs)
// ---------------------------------------------------------------------------

/// A program (department) offered by a school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    /// Stable identifier, also the subject prefix of its courses.
    pub prefix: String,
}

/// A school and its ordered program list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub name: String,
    pub prefix: String,
    pub programs: Vec<Program>,
}

/// The school/program listing for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub schools: Vec<School>,
}

impl Catalog {
    /// Build a catalog from the remote listing, with the synthetic
    /// General Education school injected ahead of it.
    pub fn with_general_education(remote: Vec<School>) -> Self {
        let mut schools = Vec::with_capacity(remote.len() + 1);
        schools.push(School {
            name: "General Education".into(),
            prefix: GE_SCHOOL_PREFIX.into(),
            programs: vec![Program {
                name: "GE Seminar".into(),
                prefix: GE_PROGRAM_PREFIX.into(),
            }],
        });
        schools.extend(remote);
        Self { schools }
    }

    /// Every `(school_prefix, program_prefix)` pair, in catalog order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.schools.iter().flat_map(|school| {
            school
                .programs
                .iter()
                .map(move |program| (school.prefix.as_str(), program.prefix.as_str()))
        })
    }

    /// Total number of programs across all schools.
    pub fn program_count(&self) -> usize {
        self.schools.iter().map(|s| s.programs.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// Unit count of a section: an exact or fractional quantity, or a range
/// expression such as `"2-4"` kept as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Units {
    Whole(i64),
    Fractional(f64),
    Text(String),
}

impl Units {
    /// Collapse a float into [`Units::Whole`] when it has no fractional part.
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Self::Whole(value as i64)
        } else {
            Self::Fractional(value)
        }
    }
}

/// A canonical, normalized course section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// De-duplication key within a course group.
    pub section_code: Option<String>,
    pub instructors: Vec<String>,
    pub units: Option<Units>,
    #[serde(rename = "total")]
    pub total_seats: Option<i64>,
    #[serde(rename = "registered")]
    pub registered_seats: Option<i64>,
    pub location: Option<String>,
    /// Human-readable meeting time, `"TBA"` when unknown.
    #[serde(rename = "time")]
    pub time_string: String,
    pub duplicated_credits: Vec<String>,
    pub prerequisites: Vec<String>,
    #[serde(rename = "dClearance")]
    pub has_d_clearance: bool,
    #[serde(rename = "type")]
    pub section_type: Option<String>,
}

impl Section {
    /// The section code, if it is usable as a duplicate signal.
    pub fn dedup_code(&self) -> Option<&str> {
        self.section_code.as_deref().filter(|code| !code.is_empty())
    }
}

// ---------------------------------------------------------------------------
// CourseGroup
// ---------------------------------------------------------------------------

/// Identity of a course group.
///
/// Equality is structural over all three fields. A `None` field and an empty
/// string are different values, so otherwise identical courses that differ
/// only in that way land in separate groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseKey {
    pub title: Option<String>,
    pub description: Option<String>,
    pub course_code: Option<String>,
}

/// A deduplicated course entry with its sections and optional GE tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseGroup {
    pub title: Option<String>,
    pub description: Option<String>,
    pub course_code: Option<String>,
    pub sections: Vec<Section>,
    /// Sorted, unique single-letter GE categories. Absent when untagged.
    #[serde(rename = "GE", default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<BTreeSet<String>>,
}

impl CourseGroup {
    /// An empty, untagged group for `key`.
    pub fn new(key: CourseKey) -> Self {
        Self {
            title: key.title,
            description: key.description,
            course_code: key.course_code,
            sections: Vec::new(),
            ge: None,
        }
    }

    /// The identity key of this group.
    pub fn key(&self) -> CourseKey {
        CourseKey {
            title: self.title.clone(),
            description: self.description.clone(),
            course_code: self.course_code.clone(),
        }
    }

    /// Whether this group's identity equals `key`.
    pub fn has_key(&self, key: &CourseKey) -> bool {
        self.title == key.title
            && self.description == key.description
            && self.course_code == key.course_code
    }

    /// Union `tag` into the GE set, creating it if absent.
    pub fn add_ge_tag(&mut self, tag: impl Into<String>) {
        self.ge.get_or_insert_with(BTreeSet::new).insert(tag.into());
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Program prefix → ordered course groups.
pub type ProgramCourses = BTreeMap<String, Vec<CourseGroup>>;

/// School prefix → program prefix → course groups.
///
/// Backed by ordered maps so serialization is deterministic regardless of
/// the order in which fetch tasks complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aggregation {
    schools: BTreeMap<String, ProgramCourses>,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `groups` for a program, replacing any previous list.
    pub fn insert(
        &mut self,
        school: impl Into<String>,
        program: impl Into<String>,
        groups: Vec<CourseGroup>,
    ) -> Option<Vec<CourseGroup>> {
        self.schools
            .entry(school.into())
            .or_default()
            .insert(program.into(), groups)
    }

    pub fn get(&self, school: &str, program: &str) -> Option<&Vec<CourseGroup>> {
        self.schools.get(school)?.get(program)
    }

    /// Mutable access to a program's group list, creating an empty one if needed.
    pub fn program_mut(&mut self, school: &str, program: &str) -> &mut Vec<CourseGroup> {
        self.schools
            .entry(school.to_string())
            .or_default()
            .entry(program.to_string())
            .or_default()
    }

    pub fn schools(&self) -> impl Iterator<Item = (&String, &ProgramCourses)> {
        self.schools.iter()
    }

    pub fn contains_program(&self, school: &str, program: &str) -> bool {
        self.get(school, program).is_some()
    }

    /// Number of (school, program) entries.
    pub fn program_count(&self) -> usize {
        self.schools.values().map(BTreeMap::len).sum()
    }

    /// Number of course groups across every program.
    pub fn group_count(&self) -> usize {
        self.schools
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Iterate over every group together with its school and program prefix.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &str, &CourseGroup)> {
        self.schools.iter().flat_map(|(school, programs)| {
            programs.iter().flat_map(move |(program, groups)| {
                groups
                    .iter()
                    .map(move |group| (school.as_str(), program.as_str(), group))
            })
        })
    }
}
