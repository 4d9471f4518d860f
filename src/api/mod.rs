//! Client for the roster extraction service.

mod transport;
mod types;

pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
#[cfg(test)]
pub(crate) use transport::mock::MockTransport;
pub use types::{
    Course, CourseId, ExtractAllResponse, ExtractResponse, HealthResponse, LoginRequest,
    LoginResponse,
};

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

const MISSING_BASE: &str =
    "The API URL is not configured. Set ROSTER_API_BASE or api_base in the config file.";

/// Options for a single call.
#[derive(Debug, Clone)]
pub struct RequestOptions<'a> {
    pub method: Method,
    pub body: Option<Value>,
    /// Session token; sent as a bearer token when present.
    pub token: Option<&'a str>,
}

impl<'a> RequestOptions<'a> {
    #[must_use]
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
            token: None,
        }
    }

    #[must_use]
    pub fn post(body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            body,
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }
}

/// Thin JSON client: one call, one attempt, one error shape.
pub struct ApiClient<T: Transport = ReqwestTransport> {
    base: Option<String>,
    transport: T,
}

impl ApiClient<ReqwestTransport> {
    /// Creates a client from configuration using the `reqwest` transport.
    ///
    /// A missing base URL is not an error here; calls fail with
    /// [`Error::Configuration`] instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport =
            ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs.max(1)))?;
        Ok(Self::with_transport(
            config.api_base().map(str::to_string),
            transport,
        ))
    }
}

impl<T: Transport> ApiClient<T> {
    /// Creates a client with a custom transport implementation.
    #[must_use]
    pub fn with_transport(base: Option<String>, transport: T) -> Self {
        let base = base
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        Self { base, transport }
    }

    /// Whether a base URL is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.base.is_some()
    }

    /// Fails fast when no base URL is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the base URL is missing.
    pub fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(Error::Configuration(MISSING_BASE.to_string()))
        }
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolves path segments against the base URL, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let base = self
            .base
            .as_deref()
            .ok_or_else(|| Error::Configuration(MISSING_BASE.to_string()))?;
        let mut url = Url::parse(base)
            .map_err(|e| Error::Configuration(format!("Invalid API URL {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| Error::Configuration(format!("Invalid API URL {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Calls `path` (e.g. `/api/courses`) and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] without touching the network when no
    /// base URL is configured, and [`Error::Transport`] for network failures
    /// and non-2xx responses.
    pub async fn call(&self, path: &str, options: RequestOptions<'_>) -> Result<Value> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.request(&segments, options).await
    }

    async fn request(&self, segments: &[&str], options: RequestOptions<'_>) -> Result<Value> {
        let url = self.endpoint(segments)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = options.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::transport("Invalid session token.", None))?;
            headers.insert(AUTHORIZATION, value);
        }
        let body = options
            .body
            .map(|b| serde_json::to_vec(&b))
            .transpose()
            .map_err(|e| Error::transport(format!("Could not encode request: {e}"), None))?;

        log::debug!("{} {}", options.method, url.path());
        let response = self
            .transport
            .send(ApiRequest {
                method: options.method,
                url,
                headers,
                body,
            })
            .await?;

        if !response.is_success() {
            let err = error_from_response(&response);
            log::debug!("Request failed with {}: {err}", response.status);
            return Err(err);
        }
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body)
            .map_err(|_| Error::transport(UNEXPECTED, Some(response.status)))
    }

    /// Logs in and returns the issued token and course list.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let body = serde_json::to_value(LoginRequest { username, password })
            .map_err(|e| Error::transport(format!("Could not encode request: {e}"), None))?;
        let value = self
            .request(&["api", "login"], RequestOptions::post(Some(body)))
            .await?;
        decode(value)
    }

    /// Lists the courses visible to the session.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn courses(&self, token: &str) -> Result<Vec<Course>> {
        let value = self
            .request(&["api", "courses"], RequestOptions::get().with_token(token))
            .await?;
        decode(value)
    }

    /// Exports the roster and email list of one course.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn extract_course(&self, token: &str, id: &CourseId) -> Result<ExtractResponse> {
        let value = self
            .request(
                &["api", "courses", id.as_str(), "extract"],
                RequestOptions::post(None).with_token(token),
            )
            .await?;
        decode(value)
    }

    /// Exports every course as one ZIP archive.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn extract_all(&self, token: &str) -> Result<ExtractAllResponse> {
        let value = self
            .request(
                &["api", "courses", "extract-all"],
                RequestOptions::post(None).with_token(token),
            )
            .await?;
        decode(value)
    }

    /// Checks that the service is reachable.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn health(&self) -> Result<HealthResponse> {
        let value = self
            .request(&["api", "health"], RequestOptions::get())
            .await?;
        decode(value)
    }
}

const UNEXPECTED: &str = "Unexpected response from server.";

fn decode<D: DeserializeOwned>(value: Value) -> Result<D> {
    serde_json::from_value(value).map_err(|e| {
        log::debug!("Response shape mismatch: {e}");
        Error::transport(UNEXPECTED, None)
    })
}

/// Builds the error for a non-2xx response.
///
/// Prefers the `detail` field of a JSON body; validation errors (a list of
/// objects with `msg`) are joined. Falls back to the status text.
fn error_from_response(response: &ApiResponse) -> Error {
    let detail = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| match body.get("detail")? {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        });
    let message = detail.unwrap_or_else(|| status_text(response.status));
    Error::transport(message, Some(response.status))
}

fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(transport: MockTransport) -> ApiClient<MockTransport> {
        ApiClient::with_transport(Some("http://api.test/".to_string()), transport)
    }

    #[tokio::test]
    async fn missing_base_fails_without_network() {
        let api = ApiClient::with_transport(None, MockTransport::default());
        let err = api.login("u", "p").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(api.transport().requests().is_empty());
        assert!(!api.is_configured());
    }

    #[tokio::test]
    async fn sets_json_content_type_and_bearer() {
        let api = client(MockTransport::default().respond(200, "[]"));
        api.courses("t1").await.unwrap();

        let requests = api.transport().requests();
        let request = &requests[0];
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.as_str(), "http://api.test/api/courses");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers[AUTHORIZATION], "Bearer t1");
    }

    #[tokio::test]
    async fn login_sends_credentials_without_bearer() {
        let api = client(
            MockTransport::default()
                .respond(200, r#"{"token":"t1","courses":[{"id":"C1","name":"CSE 323"}]}"#),
        );
        let response = api.login("alice", "hunter2").await.unwrap();
        assert_eq!(response.token, "t1");
        assert_eq!(response.courses.len(), 1);

        let requests = api.transport().requests();
        assert!(requests[0].headers.get(AUTHORIZATION).is_none());
        let body: Value = serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["username"], "alice");
        assert_eq!(body["password"], "hunter2");
    }

    #[tokio::test]
    async fn course_id_is_percent_encoded() {
        let api = client(MockTransport::default().respond(500, ""));
        let _ = api.extract_course("t", &CourseId::from("a/b c")).await;
        let requests = api.transport().requests();
        assert_eq!(
            requests[0].url.as_str(),
            "http://api.test/api/courses/a%2Fb%20c/extract"
        );
    }

    #[tokio::test]
    async fn base_with_prefix_is_kept() {
        let api = ApiClient::with_transport(
            Some("https://host.test/roster".to_string()),
            MockTransport::default().respond(200, r#"{"status":"ok"}"#),
        );
        assert_eq!(api.health().await.unwrap().status, "ok");
        let requests = api.transport().requests();
        assert_eq!(requests[0].url.as_str(), "https://host.test/roster/api/health");
    }

    #[tokio::test]
    async fn detail_field_becomes_message() {
        let api = client(MockTransport::default().respond(401, r#"{"detail":"Session expired"}"#));
        let err = api
            .call("/api/courses", RequestOptions::get().with_token("t"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Session expired");
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn validation_details_are_joined() {
        let api = client(MockTransport::default().respond(
            422,
            r#"{"detail":[{"msg":"field required"},{"msg":"value is not a string"}]}"#,
        ));
        let err = api.login("", "").await.unwrap_err();
        assert_eq!(err.to_string(), "field required; value is not a string");
    }

    #[tokio::test]
    async fn malformed_error_body_falls_back_to_status_text() {
        let api = client(
            MockTransport::default()
                .respond(502, "<html>bad gateway</html>")
                .respond(599, ""),
        );
        let err = api.call("/api/courses", RequestOptions::get()).await.unwrap_err();
        assert_eq!(err.to_string(), "Bad Gateway");

        let err = api.call("/api/courses", RequestOptions::get()).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 599");
        assert_eq!(err.status(), Some(599));
    }

    #[tokio::test]
    async fn network_failure_has_no_status() {
        let api = client(MockTransport::default().fail("Could not reach the server."));
        let err = api.courses("t").await.unwrap_err();
        assert_eq!(err.to_string(), "Could not reach the server.");
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn unexpected_shape_is_transport_error() {
        let api = client(MockTransport::default().respond(200, r#"{"courses": 3}"#));
        let err = api.courses("t").await.unwrap_err();
        assert_eq!(err.to_string(), UNEXPECTED);
    }

    #[tokio::test]
    async fn one_call_is_one_attempt() {
        let api = client(
            MockTransport::default()
                .respond(503, "")
                .respond(200, "[]"),
        );
        assert!(api.courses("t").await.is_err());
        assert_eq!(api.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let api = client(MockTransport::default().respond(200, r#"{"status":"ok"}"#));
        assert_eq!(api.health().await.unwrap().status, "ok");

        let requests = api.transport().requests();
        assert_eq!(requests[0].url.as_str(), "http://api.test/api/health");
        assert!(!requests[0].headers.contains_key(AUTHORIZATION));
    }
}
