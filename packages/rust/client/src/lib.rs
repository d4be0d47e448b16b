//! Remote catalog API access.
//!
//! [`CatalogSource`] is the collaborator boundary the aggregation engine
//! depends on; [`HttpCatalogSource`] implements it over the public catalog
//! HTTP API. Retries are the caller's concern: every method here makes
//! exactly one request.

pub mod raw;

use std::future::Future;
use std::time::Duration;

use coursegen_shared::{CourseGenError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

pub use raw::{
    CodeVariant, CoursesPayload, RawCourse, RawCourseCode, RawInstructor, RawProgram, RawSchedule,
    RawSchool, RawSection,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("coursegen/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

// ---------------------------------------------------------------------------
// CatalogSource
// ---------------------------------------------------------------------------

/// The three remote operations the aggregation engine consumes.
pub trait CatalogSource: Send + Sync {
    /// List every school and its programs for `term`.
    fn list_catalog(&self, term: &str) -> impl Future<Output = Result<Vec<RawSchool>>> + Send;

    /// List the courses offered by one program of one school.
    fn list_program_courses(
        &self,
        term: &str,
        school: &str,
        program: &str,
    ) -> impl Future<Output = Result<Vec<RawCourse>>> + Send;

    /// List the courses satisfying one GE category of one requirement type.
    fn list_category_courses(
        &self,
        term: &str,
        requirement: &str,
        category: &str,
    ) -> impl Future<Output = Result<Vec<RawCourse>>> + Send;
}

// ---------------------------------------------------------------------------
// HttpCatalogSource
// ---------------------------------------------------------------------------

/// [`CatalogSource`] backed by the catalog's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: Client,
    base_url: Url,
}

impl HttpCatalogSource {
    /// Create a source rooted at `base_url` with a per-request `timeout`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| CourseGenError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.join(path).map_err(|e| {
            CourseGenError::validation(format!("cannot join {path} onto {}: {e}", self.base_url))
        })?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "requesting");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CourseGenError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CourseGenError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CourseGenError::Network(format!("{url}: failed to read body: {e}")))?;

        serde_json::from_str(&body).map_err(|e| CourseGenError::decode(format!("{url}: {e}")))
    }

    async fn get_courses(&self, url: Url) -> Result<Vec<RawCourse>> {
        let payload: CoursesPayload = self.get_json(url).await?;
        Ok(payload.courses.unwrap_or_default())
    }
}

impl CatalogSource for HttpCatalogSource {
    #[instrument(skip(self))]
    async fn list_catalog(&self, term: &str) -> Result<Vec<RawSchool>> {
        let url = self.endpoint("/api/Schools/TermCode", &[("termCode", term)])?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn list_program_courses(
        &self,
        term: &str,
        school: &str,
        program: &str,
    ) -> Result<Vec<RawCourse>> {
        let url = self.endpoint(
            "/api/Courses/CoursesByTermSchoolProgram",
            &[("termCode", term), ("school", school), ("program", program)],
        )?;
        self.get_courses(url).await
    }

    #[instrument(skip(self))]
    async fn list_category_courses(
        &self,
        term: &str,
        requirement: &str,
        category: &str,
    ) -> Result<Vec<RawCourse>> {
        let url = self.endpoint(
            "/api/Courses/GeCoursesByTerm",
            &[
                ("termCode", term),
                ("geRequirementPrefix", requirement),
                ("categoryPrefix", category),
            ],
        )?;
        self.get_courses(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> HttpCatalogSource {
        let base = Url::parse(&server.uri()).unwrap();
        HttpCatalogSource::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_catalog() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/Schools/TermCode"))
            .and(query_param("termCode", "20253"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "name": "Viterbi School of Engineering",
                    "prefix": "ENGR",
                    "programs": [{"name": "Computer Science", "prefix": "CSCI"}]
                }
            ])))
            .mount(&server)
            .await;

        let schools = source_for(&server).list_catalog("20253").await.unwrap();
        assert_eq!(schools.len(), 1);
        assert_eq!(schools[0].prefix.as_deref(), Some("ENGR"));
        let programs = schools[0].programs.as_ref().unwrap();
        assert_eq!(programs[0].prefix.as_deref(), Some("CSCI"));
    }

    #[tokio::test]
    async fn test_list_program_courses_from_fixture() {
        let server = MockServer::start().await;

        let fixture = std::fs::read_to_string("../../../fixtures/api/courses-by-program.json")
            .expect("read courses fixture");

        Mock::given(method("GET"))
            .and(path("/api/Courses/CoursesByTermSchoolProgram"))
            .and(query_param("school", "ENGR"))
            .and(query_param("program", "CSCI"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .mount(&server)
            .await;

        let courses = source_for(&server)
            .list_program_courses("20253", "ENGR", "CSCI")
            .await
            .unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].sections().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_course_does_not_fail_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/Courses/CoursesByTermSchoolProgram"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "courses": [
                    {"name": "Introduction to Programming", "sections": []},
                    {"name": "Data Structures", "description": 42, "sections": {}},
                    "CSCI-170"
                ]
            })))
            .mount(&server)
            .await;

        let courses = source_for(&server)
            .list_program_courses("20253", "ENGR", "CSCI")
            .await
            .unwrap();
        assert_eq!(courses.len(), 3);

        assert!(courses[0].ignored_fields.is_empty());
        assert!(courses[0].rejected.is_none());

        assert_eq!(courses[1].description.as_deref(), Some("42"));
        assert!(courses[1].sections().is_empty());
        assert_eq!(
            courses[1].ignored_fields,
            vec!["sections: expected a list, found an object".to_string()]
        );

        assert!(courses[2].rejected.is_some());
    }

    #[tokio::test]
    async fn test_non_list_courses_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/Courses/CoursesByTermSchoolProgram"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"courses": "none"})),
            )
            .mount(&server)
            .await;

        let err = source_for(&server)
            .list_program_courses("20253", "ENGR", "CSCI")
            .await
            .unwrap_err();
        assert!(matches!(err, CourseGenError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_category_courses_missing_list_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/Courses/GeCoursesByTerm"))
            .and(query_param("geRequirementPrefix", "ACORELIT"))
            .and(query_param("categoryPrefix", "ARTS"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let courses = source_for(&server)
            .list_category_courses("20253", "ACORELIT", "ARTS")
            .await
            .unwrap();
        assert!(courses.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/Courses/CoursesByTermSchoolProgram"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source_for(&server)
            .list_program_courses("20253", "ENGR", "CSCI")
            .await
            .unwrap_err();
        assert!(matches!(err, CourseGenError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/Schools/TermCode"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = source_for(&server).list_catalog("20253").await.unwrap_err();
        assert!(matches!(err, CourseGenError::Decode { .. }));
    }
}
