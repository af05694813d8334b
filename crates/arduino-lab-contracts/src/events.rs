//! JSONL audit trail of assistant requests. Lines carry a hash of the
//! request body, never the body itself, so prompts and photos stay out.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Which assistant call produced a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Components,
    Projects,
    Instructions,
    Image,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Components => "components",
            RequestKind::Projects => "projects",
            RequestKind::Instructions => "instructions",
            RequestKind::Image => "image",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPhase {
    #[serde(rename = "request_sent")]
    Sent,
    #[serde(rename = "response_received")]
    Received,
    #[serde(rename = "request_failed")]
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEvent {
    #[serde(rename = "type")]
    pub phase: RequestPhase,
    pub kind: RequestKind,
    pub model: String,
    pub endpoint: String,
    pub request_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestEvent {
    pub fn sent(
        kind: RequestKind,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        request_hash: impl Into<String>,
    ) -> Self {
        Self {
            phase: RequestPhase::Sent,
            kind,
            model: model.into(),
            endpoint: endpoint.into(),
            request_hash: request_hash.into(),
            status: None,
            response_bytes: None,
            error: None,
        }
    }

    /// Same request, answered.
    pub fn received(&self, response_bytes: usize) -> Self {
        Self {
            phase: RequestPhase::Received,
            response_bytes: Some(response_bytes),
            ..self.clone()
        }
    }

    /// Same request, failed; `status` is absent for transport errors.
    pub fn failed(&self, status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            phase: RequestPhase::Failed,
            status,
            error: Some(error.into()),
            ..self.clone()
        }
    }
}

/// One line of the log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub session_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub event: RequestEvent,
}

/// Append-only request log for one session. The file (and its parent
/// directory) is created on the first record.
#[derive(Debug)]
pub struct RequestLog {
    path: PathBuf,
    session_id: String,
    file: Mutex<Option<File>>,
}

impl RequestLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(&self, event: &RequestEvent) -> anyhow::Result<LoggedEvent> {
        let logged = LoggedEvent {
            session_id: self.session_id.clone(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            event: event.clone(),
        };
        let mut line = serde_json::to_string(&logged)?;
        line.push('\n');

        let mut guard = self
            .file
            .lock()
            .map_err(|_| anyhow!("request log lock poisoned"))?;
        if guard.is_none() {
            *guard = Some(open_append(&self.path)?);
        }
        let Some(file) = guard.as_mut() else {
            return Err(anyhow!("request log {} is not open", self.path.display()));
        };
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(logged)
    }
}

fn open_append(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))
}
