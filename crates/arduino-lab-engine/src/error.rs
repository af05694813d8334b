use arduino_lab_contracts::PayloadError;
use thiserror::Error;

const DISPLAY_BODY_MAX_CHARS: usize = 2048;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("OpenAI API key not configured (set OPENAI_API_KEY or create {key_file})")]
    MissingApiKey { key_file: String },

    #[error("image encoding failed: {0}")]
    ImageEncoding(#[source] image::ImageError),

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {}", truncate_text(.body, DISPLAY_BODY_MAX_CHARS))]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Status { status, .. } => Some(*status),
            EngineError::Http { source, .. } => source.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Raw response body kept for diagnostics, when the server sent one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            EngineError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::EngineError;

    #[test]
    fn status_error_keeps_full_body_but_truncates_display() {
        let body = "x".repeat(5000);
        let err = EngineError::Status {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            status: 429,
            body: body.clone(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.response_body(), Some(body.as_str()));
        assert!(err.to_string().len() < 2200);
        assert!(err.to_string().contains("returned 429"));
    }
}
