//! Request/response orchestration for the ARduino Lab assistant: builds
//! OpenAI requests, sends them, and turns the replies into typed results.

pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod prompts;
pub mod request;
pub mod transport;

pub use config::EngineConfig;
pub use connector::{ArduinoConnector, ConnectorEvent, RequestKind};
pub use dispatch::{Completed, Dispatcher, Ticket};
pub use error::EngineError;
pub use media::{GeneratedImage, ImageAttachment};
pub use request::{ChatRequest, ImageGenerationRequest};
pub use transport::{HttpTransport, Transport};
