//! Management API client.
//!
//! Requests use the JSON form of the management model over HTTP. A request
//! with attached deployment content goes to the upload endpoint as multipart.

use async_trait::async_trait;
use reqwest::{Client, multipart};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, trace};

use super::address::Address;
use crate::error::{ContainerError, DeployerError, Result};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for read-only requests.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 500;

/// One request: an operation plus the content streams it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagementRequest {
    /// The operation, in management JSON form.
    pub operation: Value,
    /// Content streams referenced by `input-stream-index`.
    pub attachments: Vec<Vec<u8>>,
}

impl ManagementRequest {
    /// Creates a request for a single operation without content.
    #[must_use]
    pub fn single(operation: &str, address: &Address) -> Self {
        let mut body = Map::new();
        body.insert("operation".to_string(), Value::String(operation.to_string()));
        body.insert("address".to_string(), address.to_json());
        Self {
            operation: Value::Object(body),
            attachments: Vec::new(),
        }
    }

    /// Adds a parameter to the operation.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        if let Some(body) = self.operation.as_object_mut() {
            body.insert(name.to_string(), value.into());
        }
        self
    }

    /// The operation name.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        self.operation.get("operation").and_then(Value::as_str).unwrap_or_default()
    }

    /// Returns true for requests that never change the server.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.attachments.is_empty() && self.operation_name().starts_with("read-")
    }
}

/// Outcome field of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded.
    Success,
    /// The operation failed.
    Failed,
}

/// Response to a [`ManagementRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ManagementResponse {
    /// Outcome.
    pub outcome: Outcome,
    /// Result node, `Null` when there is none.
    pub result: Value,
    /// Failure description of a failed outcome.
    pub failure_description: Option<String>,
    /// `response-headers.process-state`, if reported.
    pub process_state: Option<String>,
}

impl ManagementResponse {
    /// A successful response.
    #[must_use]
    pub const fn success(result: Value) -> Self {
        Self {
            outcome: Outcome::Success,
            result,
            failure_description: None,
            process_state: None,
        }
    }

    /// A failed response.
    #[must_use]
    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            result: Value::Null,
            failure_description: Some(description.into()),
            process_state: None,
        }
    }

    /// Sets the process state header.
    #[must_use]
    pub fn with_process_state(mut self, state: impl Into<String>) -> Self {
        self.process_state = Some(state.into());
        self
    }

    /// Returns true for a successful outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Parses the management JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the outcome is missing or unknown.
    pub fn from_json(value: &Value) -> Result<Self> {
        let outcome = match value.get("outcome").and_then(Value::as_str) {
            Some("success") => Outcome::Success,
            Some("failed" | "cancelled") => Outcome::Failed,
            other => {
                return Err(ContainerError::invalid_response(format!("unexpected outcome {other:?}")).into());
            }
        };

        let failure_description = value.get("failure-description").map(|d| match d {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

        let process_state = value
            .get("response-headers")
            .and_then(|h| h.get("process-state"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            outcome,
            result: value.get("result").cloned().unwrap_or(Value::Null),
            failure_description,
            process_state,
        })
    }
}

/// Executes management requests against one container.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// Executes a request and returns the parsed response. Failed outcomes
    /// are returned as responses, not errors.
    async fn execute(&self, request: ManagementRequest) -> Result<ManagementResponse>;
}

/// HTTP management client.
#[derive(Debug, Clone)]
pub struct HttpManagementClient {
    /// HTTP client.
    client: Client,
    /// Base URL of the management interface, e.g. `http://localhost:9990`.
    base_url: String,
    /// User and password.
    credentials: Option<(String, String)>,
}

impl HttpManagementClient {
    /// Creates a client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ContainerError::request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// Authenticates with user and password.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    /// Executes a single request.
    async fn execute_once(&self, request: &ManagementRequest) -> Result<ManagementResponse> {
        trace!("Management request: {}", request.operation);

        let builder = if request.attachments.is_empty() {
            self.client.post(format!("{}/management", self.base_url)).json(&request.operation)
        } else {
            let operation = multipart::Part::text(request.operation.to_string())
                .mime_str("application/json")
                .map_err(|e| ContainerError::request(format!("Failed to build upload: {e}")))?;
            let mut form = multipart::Form::new().part("operation", operation);
            for (index, content) in request.attachments.iter().enumerate() {
                let part = multipart::Part::bytes(content.clone()).file_name(format!("content-{index}"));
                form = form.part(format!("content-{index}"), part);
            }
            self.client
                .post(format!("{}/management-upload", self.base_url))
                .multipart(form)
        };

        let builder = match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ContainerError::request(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ContainerError::AuthenticationFailed {
                message: format!("management interface returned {status}"),
            }
            .into());
        }

        // Failed outcomes come back as 500 with a regular body.
        let body = response
            .text()
            .await
            .map_err(|e| ContainerError::request(format!("Failed to read response: {e}")))?;
        let value: Value = serde_json::from_str(&body).map_err(|e| {
            ContainerError::invalid_response(format!("{status}: {e}: {}", body.chars().take(200).collect::<String>()))
        })?;
        trace!("Management response: {}", value);

        ManagementResponse::from_json(&value)
    }
}

#[async_trait]
impl ManagementClient for HttpManagementClient {
    async fn execute(&self, request: ManagementRequest) -> Result<ManagementResponse> {
        if !request.is_read_only() {
            return self.execute_once(&request).await;
        }

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {MAX_RETRIES}");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt))).await;
            }

            match self.execute_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| DeployerError::Container(ContainerError::request("Max retries exceeded"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_failed_response() {
        let response = ManagementResponse::from_json(&json!({
            "outcome": "failed",
            "failure-description": "WFLYCTL0216: Management resource '[]' not found",
            "rolled-back": true
        }))
        .expect("parse");
        assert!(!response.is_success());
        assert!(response.failure_description.as_deref().is_some_and(|d| d.starts_with("WFLYCTL0216")));
    }

    #[test]
    fn test_parse_composite_failure_object() {
        let response = ManagementResponse::from_json(&json!({
            "outcome": "failed",
            "failure-description": {"WFLYCTL0062: Composite operation failed": {"Operation step-1": "boom"}}
        }))
        .expect("parse");
        assert!(response.failure_description.as_deref().is_some_and(|d| d.contains("boom")));
    }

    #[test]
    fn test_parse_process_state() {
        let response = ManagementResponse::from_json(&json!({
            "outcome": "success",
            "result": null,
            "response-headers": {"process-state": "reload-required"}
        }))
        .expect("parse");
        assert_eq!(response.process_state.as_deref(), Some("reload-required"));
    }

    #[test]
    fn test_read_only_detection() {
        let read = ManagementRequest::single("read-resource", &Address::root());
        assert!(read.is_read_only());
        let write = ManagementRequest::single("composite", &Address::root());
        assert!(!write.is_read_only());
    }

    #[tokio::test]
    async fn test_http_read_resource() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/management"))
            .and(body_partial_json(json!({"operation": "read-resource"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "outcome": "success",
                "result": {"level": "INFO"}
            })))
            .mount(&server)
            .await;

        let client = HttpManagementClient::new(&server.uri()).expect("client");
        let address = Address::root().and("subsystem", "logging").and("logger", "com.foo");
        let response = client
            .execute(ManagementRequest::single("read-resource", &address))
            .await
            .expect("response");
        assert!(response.is_success());
        assert_eq!(response.result["level"], "INFO");
    }

    #[tokio::test]
    async fn test_http_failed_outcome_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/management"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "outcome": "failed",
                "failure-description": "WFLYCTL0216: Management resource 'x' not found"
            })))
            .mount(&server)
            .await;

        let client = HttpManagementClient::new(&server.uri()).expect("client");
        let response = client
            .execute(ManagementRequest::single("read-resource", &Address::root()))
            .await
            .expect("response");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_http_authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = HttpManagementClient::new(&server.uri())
            .expect("client")
            .with_credentials("admin", "wrong");
        let err = client
            .execute(ManagementRequest::single("read-resource", &Address::root()))
            .await
            .expect_err("auth");
        assert!(matches!(err, DeployerError::Container(ContainerError::AuthenticationFailed { .. })));
    }

    #[tokio::test]
    async fn test_http_upload_uses_multipart_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/management-upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"outcome": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpManagementClient::new(&server.uri()).expect("client");
        let mut request = ManagementRequest::single("composite", &Address::root());
        request.attachments.push(b"archive".to_vec());
        let response = client.execute(request).await.expect("response");
        assert!(response.is_success());
    }
}
