use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

pub use arduino_lab_contracts::events::RequestKind;
use arduino_lab_contracts::events::{RequestEvent, RequestLog};
use arduino_lab_contracts::models::VisionModel;
use arduino_lab_contracts::payloads::{
    parse_components, parse_image_generation, parse_instructions, parse_projects,
};
use arduino_lab_contracts::receipts::{build_receipt, write_receipt, RequestReceipt};
use arduino_lab_contracts::{Component, InstructionStep, Parsed, Project};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::media::{GeneratedImage, ImageAttachment};
use crate::prompts::{detection_prompt, instruction_prompt, project_prompt};
use crate::request::{
    ChatRequest, ImageGenerationRequest, COMPONENTS_MAX_TOKENS, INSTRUCTIONS_MAX_TOKENS,
    PROJECTS_MAX_TOKENS,
};
use crate::transport::{HttpTransport, Transport};

/// Keeps receipt names unique when two calls land in the same millisecond.
static RECEIPT_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// Raw envelope of a successful call, delivered before parsing.
    ResponseReceived { kind: RequestKind, body: String },
    RequestFailed {
        kind: RequestKind,
        status: Option<u16>,
        body: Option<String>,
        message: String,
    },
}

impl ConnectorEvent {
    pub fn kind(&self) -> RequestKind {
        match self {
            ConnectorEvent::ResponseReceived { kind, .. }
            | ConnectorEvent::RequestFailed { kind, .. } => *kind,
        }
    }
}

type Listener = Box<dyn Fn(&ConnectorEvent) + Send + Sync>;

/// Talks to the OpenAI endpoints on behalf of the lab assistant.
///
/// Calls block the current thread; wrap the connector in an `Arc` and use
/// [`crate::Dispatcher`] when the caller must stay responsive.
pub struct ArduinoConnector<T: Transport = HttpTransport> {
    config: EngineConfig,
    transport: T,
    vision_model: RwLock<VisionModel>,
    listeners: RwLock<Vec<Listener>>,
    request_log: Option<RequestLog>,
}

impl ArduinoConnector<HttpTransport> {
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ArduinoConnector<T> {
    pub fn with_transport(config: EngineConfig, transport: T) -> Self {
        let request_log = config.events_path.clone().map(|path| {
            let log = RequestLog::new(path, uuid::Uuid::new_v4().to_string());
            tracing::debug!(
                path = %log.path().display(),
                session_id = log.session_id(),
                "request log enabled"
            );
            log
        });
        Self {
            vision_model: RwLock::new(config.vision_model),
            config,
            transport,
            listeners: RwLock::new(Vec::new()),
            request_log,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn vision_model(&self) -> VisionModel {
        *read_lock(&self.vision_model)
    }

    /// Applies to requests started after the call returns.
    pub fn set_vision_model(&self, model: VisionModel) {
        *write_lock(&self.vision_model) = model;
        tracing::info!(model = %model, "vision model changed");
    }

    pub fn subscribe(&self, listener: impl Fn(&ConnectorEvent) + Send + Sync + 'static) {
        write_lock(&self.listeners).push(Box::new(listener));
    }

    pub fn analyze_components(
        &self,
        image: &ImageAttachment,
    ) -> Result<Parsed<Component>, EngineError> {
        let request = ChatRequest::text(
            self.vision_model().as_str(),
            COMPONENTS_MAX_TOKENS,
            detection_prompt(),
        )
        .with_image(image.clone());
        let body = self.send_chat(RequestKind::Components, &request)?;
        Ok(parse_components(&body)?)
    }

    pub fn generate_projects(&self, inventory_text: &str) -> Result<Parsed<Project>, EngineError> {
        let request = ChatRequest::text(
            self.vision_model().as_str(),
            PROJECTS_MAX_TOKENS,
            project_prompt(inventory_text),
        );
        let body = self.send_chat(RequestKind::Projects, &request)?;
        Ok(parse_projects(&body)?)
    }

    pub fn generate_instructions(
        &self,
        title: &str,
        description: &str,
        components_text: &str,
    ) -> Result<Parsed<InstructionStep>, EngineError> {
        let request = ChatRequest::text(
            self.vision_model().as_str(),
            INSTRUCTIONS_MAX_TOKENS,
            instruction_prompt(title, description, components_text),
        );
        let body = self.send_chat(RequestKind::Instructions, &request)?;
        Ok(parse_instructions(&body)?)
    }

    pub fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, EngineError> {
        let request = ImageGenerationRequest {
            model: self.config.image_model.clone(),
            prompt: prompt.to_string(),
            size: self.config.image_size.clone(),
        };
        let endpoint = self.config.images_endpoint();
        let body = self.exchange(
            RequestKind::Image,
            &endpoint,
            &request.model,
            &request.to_json(),
        )?;
        let bytes = parse_image_generation(&body)?;
        Ok(GeneratedImage::new(bytes))
    }

    /// Sends a chat completion and returns the raw envelope.
    pub fn send_chat(&self, kind: RequestKind, request: &ChatRequest) -> Result<String, EngineError> {
        let endpoint = self.config.chat_endpoint();
        self.exchange(kind, &endpoint, &request.model, &request.to_json())
    }

    fn exchange(
        &self,
        kind: RequestKind,
        endpoint: &str,
        model: &str,
        payload: &Value,
    ) -> Result<String, EngineError> {
        let api_key = match self.config.require_api_key() {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(kind = %kind, "{err}");
                self.notify(&ConnectorEvent::RequestFailed {
                    kind,
                    status: None,
                    body: None,
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        let request_hash = stable_hash(payload);
        let sent = RequestEvent::sent(kind, model, endpoint, request_hash.as_str());
        self.log_event(&sent);
        tracing::info!(kind = %kind, model, request_hash = %request_hash, "request sent");

        let result = self.transport.post_json(endpoint, api_key, payload);
        self.write_receipt(kind, endpoint, model, payload, &result);
        match result {
            Ok(body) => {
                self.log_event(&sent.received(body.len()));
                self.notify(&ConnectorEvent::ResponseReceived {
                    kind,
                    body: body.clone(),
                });
                Ok(body)
            }
            Err(err) => {
                tracing::warn!(kind = %kind, request_hash = %request_hash, "request failed: {err}");
                self.log_event(&sent.failed(err.status(), err.to_string()));
                self.notify(&ConnectorEvent::RequestFailed {
                    kind,
                    status: err.status(),
                    body: err.response_body().map(str::to_string),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn notify(&self, event: &ConnectorEvent) {
        for listener in read_lock(&self.listeners).iter() {
            listener(event);
        }
    }

    fn log_event(&self, event: &RequestEvent) {
        let Some(log) = &self.request_log else {
            return;
        };
        if let Err(err) = log.record(event) {
            tracing::warn!(kind = %event.kind, "failed to append request event: {err:#}");
        }
    }

    fn write_receipt(
        &self,
        kind: RequestKind,
        endpoint: &str,
        model: &str,
        payload: &Value,
        result: &Result<String, EngineError>,
    ) {
        let Some(dir) = &self.config.receipts_dir else {
            return;
        };
        let receipt = build_receipt(&RequestReceipt {
            kind: kind.as_str(),
            endpoint,
            model,
            request: payload,
            status: result.as_ref().err().and_then(EngineError::status),
            response_body: match result {
                Ok(body) => Some(body.as_str()),
                Err(err) => err.response_body(),
            },
            error: result.as_ref().err().map(ToString::to_string),
        });
        let path = receipt_path(dir, kind);
        match write_receipt(&path, &receipt) {
            Ok(()) => tracing::debug!(path = %path.display(), "receipt written"),
            Err(err) => tracing::warn!(path = %path.display(), "failed to write receipt: {err:#}"),
        }
    }
}

/// `receipt-<kind>-<unix millis>-<seq>.json`.
fn receipt_path(dir: &Path, kind: RequestKind) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let seq = RECEIPT_SEQ.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("receipt-{}-{millis}-{seq}.json", kind.as_str()))
}

fn read_lock<V>(lock: &RwLock<V>) -> RwLockReadGuard<'_, V> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<V>(lock: &RwLock<V>) -> RwLockWriteGuard<'_, V> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn stable_hash(payload: &Value) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
