//! In-memory [`CatalogSource`] with scriptable failures, for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use coursegen_client::{CatalogSource, RawCourse, RawSchool};
use coursegen_shared::{CourseGenError, Result};
use serde_json::json;

pub(crate) const CATALOG_UNIT: &str = "catalog";

pub(crate) fn program_unit(school: &str, program: &str) -> String {
    format!("program {school}/{program}")
}

pub(crate) fn category_unit(requirement: &str, category: &str) -> String {
    format!("category {requirement}/{category}")
}

/// A raw course with one live section per id, coded `PREFIX-NUMBER`.
pub(crate) fn raw_course(
    prefix: &str,
    number: &str,
    title: &str,
    section_ids: &[&str],
) -> RawCourse {
    let code = json!({
        "prefix": prefix,
        "courseHyphen": format!("{prefix}-{number}"),
        "courseSpace": format!("{prefix} {number}"),
    });
    let sections: Vec<_> = section_ids
        .iter()
        .map(|id| {
            json!({
                "sisSectionId": id,
                "units": "4.0",
                "totalSeats": 50,
                "registeredSeats": 20,
                "rnrMode": "Lecture",
                "instructors": [{"firstName": "Pat", "lastName": "Doe"}],
                "schedule": [{"dayCode": "TH", "startTime": "12:30", "endTime": "13:50"}]
            })
        })
        .collect();

    serde_json::from_value(json!({
        "name": title,
        "description": format!("{title}: course description"),
        "scheduledCourseCode": code,
        "publishedCourseCode": code,
        "sections": sections,
    }))
    .expect("valid raw course")
}

#[derive(Default)]
pub(crate) struct FakeSource {
    schools: Vec<RawSchool>,
    programs: HashMap<String, Vec<RawCourse>>,
    categories: HashMap<String, Vec<RawCourse>>,
    /// Remaining scripted failures per unit.
    failures: Mutex<HashMap<String, u32>>,
    calls: Mutex<HashMap<String, u32>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn school(mut self, prefix: &str, programs: &[&str]) -> Self {
        let programs: Vec<_> = programs
            .iter()
            .map(|p| json!({"name": format!("{p} program"), "prefix": p}))
            .collect();
        self.schools.push(
            serde_json::from_value(json!({
                "name": format!("{prefix} school"),
                "prefix": prefix,
                "programs": programs,
            }))
            .expect("valid raw school"),
        );
        self
    }

    pub(crate) fn program(mut self, school: &str, program: &str, courses: Vec<RawCourse>) -> Self {
        self.programs.insert(program_unit(school, program), courses);
        self
    }

    pub(crate) fn category(
        mut self,
        requirement: &str,
        category: &str,
        courses: Vec<RawCourse>,
    ) -> Self {
        self.categories
            .insert(category_unit(requirement, category), courses);
        self
    }

    /// Make the next `times` calls for `unit` fail.
    pub(crate) fn fail(self, unit: impl Into<String>, times: u32) -> Self {
        self.failures
            .lock()
            .expect("failures lock")
            .insert(unit.into(), times);
        self
    }

    pub(crate) fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self, unit: &str) -> u32 {
        self.calls
            .lock()
            .expect("calls lock")
            .get(unit)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn respond<T: Clone + Default>(&self, unit: String, data: Option<&T>) -> Result<T> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(unit.clone())
            .or_default() += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let should_fail = {
            let mut failures = self.failures.lock().expect("failures lock");
            match failures.get_mut(&unit) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };

        if should_fail {
            Err(CourseGenError::Network(format!("{unit}: scripted failure")))
        } else {
            Ok(data.cloned().unwrap_or_default())
        }
    }
}

impl CatalogSource for FakeSource {
    async fn list_catalog(&self, _term: &str) -> Result<Vec<RawSchool>> {
        self.respond(CATALOG_UNIT.to_string(), Some(&self.schools))
            .await
    }

    async fn list_program_courses(
        &self,
        _term: &str,
        school: &str,
        program: &str,
    ) -> Result<Vec<RawCourse>> {
        let unit = program_unit(school, program);
        let data = self.programs.get(&unit);
        self.respond(unit, data).await
    }

    async fn list_category_courses(
        &self,
        _term: &str,
        requirement: &str,
        category: &str,
    ) -> Result<Vec<RawCourse>> {
        let unit = category_unit(requirement, category);
        let data = self.categories.get(&unit);
        self.respond(unit, data).await
    }
}
