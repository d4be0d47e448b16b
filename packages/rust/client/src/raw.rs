//! Wire shapes of the remote catalog API.
//!
//! Everything is optional and defaulted: the API omits or nulls fields
//! freely. Sections, prerequisite references and course-code variants are
//! kept as raw JSON so that a single malformed element can be skipped by the
//! normalizer without rejecting the whole page. A [`RawCourse`] decodes from
//! any JSON value; what it could not read is recorded on the course itself.

use serde::{Deserialize, Deserializer, de};
use serde_json::{Map, Value};

/// A school entry from the catalog listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSchool {
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub programs: Option<Vec<RawProgram>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProgram {
    pub name: Option<String>,
    pub prefix: Option<String>,
}

/// Body of the per-program and per-GE-category course endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoursesPayload {
    pub courses: Option<Vec<RawCourse>>,
}

/// Which of the three course-code representations a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeVariant {
    Scheduled,
    Matched,
    Published,
}

impl CodeVariant {
    /// Fallback priority order when no variant matches a preferred prefix.
    pub const PRIORITY: [CodeVariant; 3] = [Self::Scheduled, Self::Matched, Self::Published];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduledCourseCode",
            Self::Matched => "matchedCourseCode",
            Self::Published => "publishedCourseCode",
        }
    }
}

/// A course as returned by the API, carrying zero or more sections.
///
/// Decoding never fails. Scalar text fields accept numbers and booleans;
/// a field with any other unusable shape is dropped and listed in
/// `ignored_fields`, and an entry that is not an object at all sets
/// `rejected`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Value")]
pub struct RawCourse {
    pub name: Option<String>,
    pub full_course_name: Option<String>,
    pub description: Option<String>,
    /// Free-text duplicate-credit note; usually a string.
    pub duplicate_credit: Option<Value>,
    pub prerequisite_course_codes: Option<Vec<Value>>,
    pub scheduled_course_code: Option<Value>,
    pub matched_course_code: Option<Value>,
    pub published_course_code: Option<Value>,
    pub sections: Option<Vec<Value>>,
    /// `field: reason` for each field that was present but unusable.
    pub ignored_fields: Vec<String>,
    /// Set when the entry could not be read as a course.
    pub rejected: Option<String>,
}

impl From<Value> for RawCourse {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            let reason = format!("expected a course object, found {}", json_kind(&value));
            return Self {
                rejected: Some(reason),
                ..Self::default()
            };
        };

        let mut fields = FieldReader {
            map,
            ignored: Vec::new(),
        };
        Self {
            name: fields.text("name"),
            full_course_name: fields.text("fullCourseName"),
            description: fields.text("description"),
            duplicate_credit: fields.value("duplicateCredit"),
            prerequisite_course_codes: fields.list("prerequisiteCourseCodes"),
            scheduled_course_code: fields.value("scheduledCourseCode"),
            matched_course_code: fields.value("matchedCourseCode"),
            published_course_code: fields.value("publishedCourseCode"),
            sections: fields.list("sections"),
            ignored_fields: fields.ignored,
            rejected: None,
        }
    }
}

/// Pulls course fields out of a JSON object, noting the unusable ones.
struct FieldReader {
    map: Map<String, Value>,
    ignored: Vec<String>,
}

impl FieldReader {
    fn value(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key).filter(|v| !v.is_null())
    }

    fn text(&mut self, key: &str) -> Option<String> {
        match self.value(key)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => {
                self.ignore(key, "text", &other);
                None
            }
        }
    }

    fn list(&mut self, key: &str) -> Option<Vec<Value>> {
        match self.value(key)? {
            Value::Array(items) => Some(items),
            other => {
                self.ignore(key, "a list", &other);
                None
            }
        }
    }

    fn ignore(&mut self, key: &str, expected: &str, found: &Value) {
        let reason = format!("{key}: expected {expected}, found {}", json_kind(found));
        self.ignored.push(reason);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Text that may arrive as a JSON number, e.g. a numeric section id.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!(
            "expected text or a number, found {}",
            json_kind(&other)
        ))),
    }
}

/// A count that may arrive as an integer, an integral float, or a numeric
/// string. Anything unparseable reads as absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    fn integral(f: f64) -> Option<i64> {
        (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
    }

    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    })
}

impl RawCourse {
    /// The raw JSON of one course-code variant, if present and non-null.
    pub fn code_value(&self, variant: CodeVariant) -> Option<&Value> {
        let value = match variant {
            CodeVariant::Scheduled => self.scheduled_course_code.as_ref(),
            CodeVariant::Matched => self.matched_course_code.as_ref(),
            CodeVariant::Published => self.published_course_code.as_ref(),
        };
        value.filter(|v| !v.is_null())
    }

    pub fn sections(&self) -> &[Value] {
        self.sections.as_deref().unwrap_or_default()
    }

    pub fn prerequisites(&self) -> &[Value] {
        self.prerequisite_course_codes.as_deref().unwrap_or_default()
    }
}

/// One course-code representation (`CSCI-102`, `CSCI 102`, subject `CSCI`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCourseCode {
    pub prefix: Option<String>,
    pub course_hyphen: Option<String>,
    pub course_space: Option<String>,
}

/// A section entry, decoded lazily from [`RawCourse::sections`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSection {
    #[serde(deserialize_with = "text_or_number")]
    pub sis_section_id: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub name: Option<String>,
    pub is_cancelled: Option<bool>,
    /// Number, numeric string, range string, or a list wrapping one of those.
    pub units: Option<Value>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_seats: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    pub registered_seats: Option<i64>,
    pub has_d_clearance: Option<bool>,
    #[serde(deserialize_with = "text_or_number")]
    pub rnr_mode: Option<String>,
    pub instructors: Option<Vec<RawInstructor>>,
    pub schedule: Option<Vec<RawSchedule>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInstructor {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// One meeting pattern of a section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSchedule {
    /// Compact day code such as `MWH` (`H` = Thursday).
    pub day_code: Option<String>,
    /// Full day names, preferred over `day_code` when present.
    pub days: Option<Vec<String>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
}
