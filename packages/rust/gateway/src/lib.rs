//! Remote data gateway for the course-data service.
//!
//! Every supplementary number shown on the page comes through here:
//! average GPA per course, average rating per instructor, grade
//! distributions for the popup charts, and review payloads. The gateway
//! owns the failure policy at this boundary: a transport error, a non-2xx
//! status, or a malformed body is logged at `warn` and collapsed into the
//! no-data sentinel, so callers render `None` instead of surfacing an
//! error. Nothing is retried and nothing is cached.

pub mod payload;

use reqwest::Client;
use tracing::{instrument, warn};
use url::Url;

use courselens_shared::{CourseLensError, GatewayConfig, Metric, Result};

pub use payload::{GradesPayload, RatingsPayload};

/// User-Agent string for gateway requests.
const USER_AGENT: &str = concat!("CourseLens/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow per request.
const MAX_REDIRECTS: usize = 3;

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Client for the course-data service. Cheap to clone; in-flight
/// enrichment tasks each hold their own copy.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    base_url: Url,
}

impl Gateway {
    /// Build a gateway from runtime configuration. When no timeout is
    /// configured the transport default stands.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            CourseLensError::config(format!("invalid gateway host {}: {e}", config.base_url))
        })?;

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CourseLensError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Sentinel-producing lookups (never fail)
    // -----------------------------------------------------------------------

    /// Average GPA for a course. `GET /class/{courseId}/grades`.
    #[instrument(skip(self))]
    pub async fn course_gpa(&self, course: &str) -> Metric {
        match self.fetch_course_grades(course).await {
            Ok(payload) => payload.gpa_metric(),
            Err(e) => {
                warn!(course, error = %e, "course GPA lookup failed");
                Metric::NoData
            }
        }
    }

    /// Average rating for an instructor.
    /// `GET /professor/{urlEncodedName}/ratings`.
    #[instrument(skip(self))]
    pub async fn instructor_rating(&self, name: &str) -> Metric {
        match self.fetch_instructor_ratings(name).await {
            Ok(payload) => payload.metric(),
            Err(e) => {
                warn!(instructor = name, error = %e, "instructor rating lookup failed");
                Metric::NoData
            }
        }
    }

    /// Full grade distribution for a course, for the histogram popup.
    pub async fn course_distribution(&self, course: &str) -> Option<GradesPayload> {
        match self.fetch_course_grades(course).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(course, error = %e, "grade distribution lookup failed");
                None
            }
        }
    }

    /// Full grade distribution across an instructor's sections.
    /// `GET /professor/{urlEncodedName}/grades`.
    pub async fn instructor_distribution(&self, name: &str) -> Option<GradesPayload> {
        match self.fetch_instructor_grades(name).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(instructor = name, error = %e, "instructor distribution lookup failed");
                None
            }
        }
    }

    /// Review payload for an instructor. Consumed but not rendered yet;
    /// callers log it. `GET /professor/{urlEncodedName}/reviews`.
    pub async fn instructor_reviews(&self, name: &str) -> Option<serde_json::Value> {
        match self.fetch_instructor_reviews(name).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(instructor = name, error = %e, "instructor reviews lookup failed");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Raw fetches (error-propagating)
    // -----------------------------------------------------------------------

    async fn fetch_course_grades(&self, course: &str) -> Result<GradesPayload> {
        let url = self.endpoint_url(&["class", course, "grades"])?;
        self.get_json(&url).await
    }

    async fn fetch_instructor_ratings(&self, name: &str) -> Result<RatingsPayload> {
        let url = self.endpoint_url(&["professor", name, "ratings"])?;
        self.get_json(&url).await
    }

    async fn fetch_instructor_grades(&self, name: &str) -> Result<GradesPayload> {
        let url = self.endpoint_url(&["professor", name, "grades"])?;
        self.get_json(&url).await
    }

    async fn fetch_instructor_reviews(&self, name: &str) -> Result<serde_json::Value> {
        let url = self.endpoint_url(&["professor", name, "reviews"])?;
        self.get_json(&url).await
    }

    /// Join path segments onto the base URL. Each segment is
    /// percent-encoded on its own, so instructor names with spaces or
    /// punctuation stay a single segment.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CourseLensError::config(format!(
                    "gateway host cannot carry paths: {}",
                    self.base_url
                ))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CourseLensError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CourseLensError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CourseLensError::Network(format!("{url}: failed to read body: {e}")))?;

        serde_json::from_str(&body).map_err(|e| CourseLensError::payload(format!("{url}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_for(server: &wiremock::MockServer) -> Gateway {
        let config = GatewayConfig {
            base_url: server.uri(),
            timeout: None,
        };
        Gateway::new(&config).expect("build gateway")
    }

    #[test]
    fn test_rejects_invalid_host() {
        let config = GatewayConfig {
            base_url: "not a url".into(),
            timeout: None,
        };
        assert!(Gateway::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_course_gpa_happy_path() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/class/CMSC131/grades"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"{"A+": 10, "A": 25, "B": 12, "gpa": 3.452}"#,
            ))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let metric = gateway.course_gpa("CMSC131").await;
        assert_eq!(metric, Metric::Value(3.452));
        assert_eq!(metric.to_string(), "3.45");
    }

    #[tokio::test]
    async fn test_course_gpa_zero_is_no_data() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/class/ARTT100/grades"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string(r#"{"gpa": 0}"#),
            )
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(gateway.course_gpa("ARTT100").await.is_no_data());
    }

    #[tokio::test]
    async fn test_course_gpa_downgrades_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/class/CMSC499/grades"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(gateway.course_gpa("CMSC499").await.is_no_data());
    }

    #[tokio::test]
    async fn test_course_gpa_downgrades_malformed_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/class/CMSC131/grades"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
            )
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(gateway.course_gpa("CMSC131").await.is_no_data());
    }

    #[tokio::test]
    async fn test_instructor_name_is_percent_encoded() {
        let server = wiremock::MockServer::start().await;

        // The name must travel as one encoded path segment.
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/professor/Dr.%20Amelia%20Smith/ratings"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(r#"{"average_rating": 4.214}"#),
            )
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let metric = gateway.instructor_rating("Dr. Amelia Smith").await;
        assert_eq!(metric.to_string(), "4.21");
    }

    #[tokio::test]
    async fn test_instructor_rating_missing_field_is_no_data() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/professor/Dr.%20Lee/ratings"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(gateway.instructor_rating("Dr. Lee").await.is_no_data());
    }

    #[tokio::test]
    async fn test_distribution_carries_counts() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/professor/Dr.%20Lee/grades"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"{"A": 40, "A-": 11, "B+": 9, "W": 3, "gpa": 3.61}"#,
            ))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let dist = gateway
            .instructor_distribution("Dr. Lee")
            .await
            .expect("distribution");
        assert_eq!(dist.total_grades(), 63);
        assert_eq!(dist.gpa_metric().to_string(), "3.61");
    }

    #[tokio::test]
    async fn test_distribution_none_on_failure() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/class/CMSC131/grades"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert!(gateway.course_distribution("CMSC131").await.is_none());
    }

    #[tokio::test]
    async fn test_reviews_payload_passthrough() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/professor/Dr.%20Lee/reviews"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"{"summarized": "Clear lectures, heavy workload."}"#,
            ))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let reviews = gateway.instructor_reviews("Dr. Lee").await.expect("reviews");
        assert_eq!(
            reviews["summarized"],
            serde_json::json!("Clear lectures, heavy workload.")
        );

        assert!(gateway.instructor_reviews("Nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/v1/class/CMSC131/grades"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string(r#"{"gpa": 2.9}"#),
            )
            .mount(&server)
            .await;

        let config = GatewayConfig {
            base_url: format!("{}/api/v1/", server.uri()),
            timeout: None,
        };
        let gateway = Gateway::new(&config).expect("build gateway");
        assert_eq!(gateway.course_gpa("CMSC131").await.to_string(), "2.90");
    }
}
