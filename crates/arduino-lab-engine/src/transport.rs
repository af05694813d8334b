use std::time::{Duration, Instant};

use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::error::EngineError;

/// Seam between the connector and the network. One call is one POST.
pub trait Transport: Send + Sync {
    /// Returns the raw body of a 2xx response. Anything else is an error that
    /// still carries the body the server sent.
    fn post_json(&self, endpoint: &str, api_key: &str, body: &Value) -> Result<String, EngineError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, EngineError> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|source| EngineError::Http {
            endpoint: "client".to_string(),
            source,
        })?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, endpoint: &str, api_key: &str, body: &Value) -> Result<String, EngineError> {
        let payload = serde_json::to_vec(body)?;
        tracing::debug!(endpoint, bytes = payload.len(), "sending request");
        let started = Instant::now();
        let response = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .map_err(|source| EngineError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        let text = response.text().map_err(|source| EngineError::Http {
            endpoint: endpoint.to_string(),
            source,
        })?;
        tracing::debug!(
            endpoint,
            status = status.as_u16(),
            bytes = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response received"
        );

        if !status.is_success() {
            return Err(EngineError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}
