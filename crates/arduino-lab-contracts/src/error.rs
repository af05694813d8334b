use thiserror::Error;

/// Why a model response could not be turned into typed results.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("response envelope is not valid JSON: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error("response envelope has no choices[0].message.content")]
    MissingContent,

    #[error("message content is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("message content is not a JSON object")]
    NotAnObject,

    #[error("'{key}' is not an array")]
    NotAnArray { key: String },

    #[error("entry {index}: unknown component '{item}'")]
    UnknownComponent { index: usize, item: String },

    #[error("entry {index}: invalid quantity ({detail})")]
    InvalidQuantity { index: usize, detail: String },

    #[error("entry {index}: {detail}")]
    MalformedEntry { index: usize, detail: String },

    #[error("project {index}: {source}")]
    InProject {
        index: usize,
        #[source]
        source: Box<PayloadError>,
    },

    #[error("image response has no data[0].b64_json")]
    MissingImage,

    #[error("image data is not valid base64: {0}")]
    InvalidImageData(#[from] base64::DecodeError),
}
