//! Raw course/section payloads → canonical [`Section`]s.
//!
//! Pure transforms, no I/O. A course yields one [`NormalizedSection`] per
//! live section; cancelled sections are dropped and undecodable ones are
//! skipped with a [`DiagnosticKind::SectionSkipped`] entry.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use coursegen_client::{CodeVariant, RawCourse, RawCourseCode, RawSchedule, RawSection};
use coursegen_shared::{CourseKey, Section, Units};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Placeholder meeting time when nothing can be derived.
pub const TBA: &str = "TBA";

/// A canonical section together with the identity of the group it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSection {
    pub key: CourseKey,
    pub section: Section,
}

enum SectionOutcome {
    Live(NormalizedSection),
    Cancelled,
}

// ---------------------------------------------------------------------------
// Course codes
// ---------------------------------------------------------------------------

/// The decoded course-code variants of one course, in fallback priority order.
#[derive(Debug, Clone, Default)]
pub struct CourseCodes {
    variants: Vec<(CodeVariant, RawCourseCode)>,
    /// Variants present in the payload but with an unexpected shape.
    errors: Vec<(CodeVariant, String)>,
}

impl CourseCodes {
    pub fn decode(course: &RawCourse) -> Self {
        let mut codes = Self::default();
        for variant in CodeVariant::PRIORITY {
            let Some(value) = course.code_value(variant) else {
                continue;
            };
            match RawCourseCode::deserialize(value) {
                Ok(code) => codes.variants.push((variant, code)),
                Err(e) => codes.errors.push((variant, e.to_string())),
            }
        }
        codes
    }

    /// Resolve the course code, preferring the variant whose subject prefix
    /// equals `preferred`, then scheduled → matched → published.
    pub fn resolve(&self, preferred: Option<&str>) -> Option<String> {
        if let Some(preferred) = preferred {
            let matching = self
                .variants
                .iter()
                .filter(|(_, code)| code.prefix.as_deref() == Some(preferred))
                .find_map(|(_, code)| non_empty(code.course_hyphen.as_deref()));
            if matching.is_some() {
                return matching;
            }
        }
        self.variants
            .iter()
            .find_map(|(_, code)| non_empty(code.course_hyphen.as_deref()))
    }

    /// The subject prefix that owns this course (scheduled → matched → published).
    pub fn owner_prefix(&self) -> Option<String> {
        self.variants
            .iter()
            .find_map(|(_, code)| non_empty(code.prefix.as_deref()))
    }

    /// Compact published form, e.g. `CSCI 103`.
    pub fn published_compact(&self) -> Option<String> {
        self.variants
            .iter()
            .find(|(variant, _)| *variant == CodeVariant::Published)
            .and_then(|(_, code)| non_empty(code.course_space.as_deref()))
    }
}

// ---------------------------------------------------------------------------
// Course-level normalization
// ---------------------------------------------------------------------------

/// Normalize every live section of `course`.
///
/// `preferred_prefix` is the subject the course is being fetched under; it
/// steers which course-code variant is used.
pub fn normalize_course(
    course: &RawCourse,
    preferred_prefix: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> Vec<NormalizedSection> {
    let codes = CourseCodes::decode(course);
    let course_code = codes.resolve(preferred_prefix);
    let subject = course_label(course, course_code.as_deref());

    if let Some(reason) = &course.rejected {
        diagnostics.record(DiagnosticKind::CourseSkipped, subject, reason.as_str());
        return Vec::new();
    }
    for field in &course.ignored_fields {
        diagnostics.record(DiagnosticKind::FieldIgnored, subject.clone(), field.as_str());
    }

    for (variant, error) in &codes.errors {
        diagnostics.record(
            DiagnosticKind::CourseCodeSkipped,
            subject.clone(),
            format!("{}: {error}", variant.as_str()),
        );
    }

    let ctx = CourseContext {
        course,
        codes: &codes,
        course_code,
        duplicated_credits: split_duplicate_credits(course.duplicate_credit.as_ref()),
        prerequisites: extract_prerequisites(course.prerequisites(), &subject, diagnostics),
    };

    let mut out = Vec::new();
    for (i, value) in course.sections().iter().enumerate() {
        match normalize_section(&ctx, value) {
            Ok(SectionOutcome::Live(section)) => out.push(section),
            Ok(SectionOutcome::Cancelled) => {
                debug!(course = %subject, index = i, "dropping cancelled section");
            }
            Err(e) => {
                diagnostics.record(
                    DiagnosticKind::SectionSkipped,
                    format!("{subject} section #{i}"),
                    e.to_string(),
                );
            }
        }
    }
    out
}

struct CourseContext<'a> {
    course: &'a RawCourse,
    codes: &'a CourseCodes,
    course_code: Option<String>,
    duplicated_credits: Vec<String>,
    prerequisites: Vec<String>,
}

fn normalize_section(
    ctx: &CourseContext<'_>,
    value: &Value,
) -> Result<SectionOutcome, serde_json::Error> {
    if value.get("isCancelled").and_then(Value::as_bool) == Some(true) {
        return Ok(SectionOutcome::Cancelled);
    }
    let raw = RawSection::deserialize(value)?;

    let schedule = raw.schedule.as_deref().unwrap_or_default();

    let title = non_empty(raw.name.as_deref())
        .or_else(|| non_empty(ctx.course.name.as_deref()))
        .or_else(|| non_empty(ctx.course.full_course_name.as_deref()))
        .or_else(|| ctx.codes.published_compact());

    let key = CourseKey {
        title,
        description: ctx.course.description.clone(),
        course_code: ctx.course_code.clone(),
    };

    let instructors = raw
        .instructors
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|i| {
            let first = i.first_name.as_deref().unwrap_or("");
            let last = i.last_name.as_deref().unwrap_or("");
            non_empty(Some(format!("{first} {last}").trim()))
        })
        .collect();

    let location = schedule
        .iter()
        .find_map(|entry| non_empty(entry.location.as_deref()));

    let section = Section {
        section_code: raw.sis_section_id,
        instructors,
        units: normalize_units(raw.units.as_ref()),
        total_seats: raw.total_seats,
        registered_seats: raw.registered_seats,
        location,
        time_string: format_meeting_time(schedule),
        duplicated_credits: ctx.duplicated_credits.clone(),
        prerequisites: ctx.prerequisites.clone(),
        has_d_clearance: raw.has_d_clearance.unwrap_or(false),
        section_type: raw.rnr_mode,
    };

    Ok(SectionOutcome::Live(NormalizedSection { key, section }))
}

/// A short label for log and diagnostic messages.
fn course_label(course: &RawCourse, code: Option<&str>) -> String {
    code.or(course.name.as_deref())
        .or(course.full_course_name.as_deref())
        .unwrap_or("<unnamed course>")
        .to_string()
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Coerce a raw units value.
///
/// Lists are unwrapped to their first element, numbers and numeric strings
/// become [`Units::Whole`] or [`Units::Fractional`], and range expressions
/// (`2-4`, `2–4`) stay text.
pub fn normalize_units(value: Option<&Value>) -> Option<Units> {
    match value? {
        Value::Array(items) => normalize_units(items.first()),
        Value::Number(n) => n
            .as_i64()
            .map(Units::Whole)
            .or_else(|| n.as_f64().map(Units::from_f64)),
        Value::String(s) => {
            let text = s.trim();
            if text.is_empty() {
                None
            } else if text.contains(['-', '\u{2013}']) {
                Some(Units::Text(text.to_string()))
            } else {
                match text.parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(Units::from_f64(n)),
                    _ => Some(Units::Text(text.to_string())),
                }
            }
        }
        _ => None,
    }
}

/// Split a duplicate-credit note on `,` `;` `/` and the word `and`.
pub fn split_duplicate_credits(value: Option<&Value>) -> Vec<String> {
    static SEPARATOR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[,;/]|\band\b").expect("valid regex"));

    let Some(Value::String(text)) = value else {
        return Vec::new();
    };
    SEPARATOR_RE
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Take the first option's course code of every prerequisite reference.
pub fn extract_prerequisites(
    entries: &[Value],
    subject: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let mut codes = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let code = entry
            .get("courseOptions")
            .and_then(|options| options.get(0))
            .and_then(|option| option.get("courseHyphen"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|code| !code.is_empty());

        match code {
            Some(code) => codes.push(code.to_string()),
            None => diagnostics.record(
                DiagnosticKind::PrerequisiteSkipped,
                subject,
                format!("prerequisite #{i} has no first-option course code"),
            ),
        }
    }
    codes
}

fn abbreviate_day(name: &str) -> String {
    let name = name.trim();
    let short = match name.to_ascii_lowercase().as_str() {
        "monday" => "M",
        "tuesday" => "Tu",
        "wednesday" => "W",
        "thursday" => "Th",
        "friday" => "F",
        "saturday" => "Sa",
        "sunday" => "Su",
        _ => return name.to_string(),
    };
    short.to_string()
}

fn day_string(entry: &RawSchedule) -> Option<String> {
    if let Some(days) = entry.days.as_deref().filter(|d| !d.is_empty()) {
        let joined: String = days.iter().map(|d| abbreviate_day(d)).collect();
        if !joined.is_empty() {
            return Some(joined);
        }
    }
    non_empty(entry.day_code.as_deref()).map(|code| code.replace('H', "Th"))
}

fn meeting_pattern(entry: &RawSchedule) -> Option<String> {
    let start = non_empty(entry.start_time.as_deref());
    let end = non_empty(entry.end_time.as_deref());
    let times = match (start, end) {
        (Some(start), Some(end)) => Some(format!("{start} - {end}")),
        (one, other) => one.or(other),
    };

    let parts: Vec<String> = [day_string(entry), times].into_iter().flatten().collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Render a section's meeting schedule, e.g. `MW 10:00 - 11:50 (+1 more)`.
pub fn format_meeting_time(schedule: &[RawSchedule]) -> String {
    let mut patterns: Vec<String> = Vec::new();
    for pattern in schedule.iter().filter_map(meeting_pattern) {
        if !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
    }

    match patterns.split_first() {
        None => TBA.to_string(),
        Some((first, [])) => first.clone(),
        Some((first, rest)) => format!("{first} (+{} more)", rest.len()),
    }
}
