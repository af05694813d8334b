use std::io;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use arduino_lab_contracts::{Component, ComponentKind, Parsed};
use arduino_lab_engine::{
    ArduinoConnector, ConnectorEvent, EngineConfig, EngineError, ImageAttachment, RequestKind,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use httpmock::prelude::*;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::json;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

fn connector_for(server: &MockServer) -> Result<ArduinoConnector> {
    let config = EngineConfig::default()
        .with_api_base(server.url("/v1"))
        .with_api_key("sk-test");
    Ok(ArduinoConnector::from_config(config)?)
}

fn chat_envelope(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

fn png_bytes() -> Result<Vec<u8>> {
    let mut out = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(16, 16)).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[test]
fn scan_posts_once_with_bearer_and_parses_components() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-test")
            .header("content-type", "application/json")
            .body_contains("\"max_tokens\":500")
            .body_contains("data:image/jpeg;base64,");
        then.status(200)
            .header("content-type", "application/json")
            .body(chat_envelope(
                "```json\n{\"components\":[{\"item\":\"arduino\",\"quantity\":1},{\"item\":\"led\",\"quantity\":4}]}\n```",
            ));
    });

    let connector = connector_for(&server)?;
    let image = ImageAttachment::from_image_bytes(&png_bytes()?)?;
    let parsed = connector.analyze_components(&image)?;

    mock.assert_hits(1);
    assert_eq!(
        parsed,
        Parsed::Items(vec![
            Component::new(ComponentKind::Arduino, 1),
            Component::new(ComponentKind::Led, 4),
        ])
    );
    Ok(())
}

#[test]
fn non_success_status_keeps_body_and_does_not_retry() -> Result<()> {
    let server = MockServer::start();
    let error_body = json!({ "error": { "message": "Rate limit reached", "type": "requests" } });
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(429).json_body(error_body.clone());
    });

    let connector = connector_for(&server)?;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    connector.subscribe(move |event| {
        if let Ok(mut events) = sink.lock() {
            events.push(event.clone());
        }
    });

    let err = connector
        .generate_projects("arduino x1\nled x3\nbreadboard x1\n")
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected a failure"))?;
    mock.assert_hits(1);
    assert_eq!(err.status(), Some(429));
    assert!(err
        .response_body()
        .is_some_and(|body| body.contains("Rate limit reached")));

    let events = seen.lock().map(|events| events.clone()).unwrap_or_default();
    assert!(matches!(
        events.as_slice(),
        [ConnectorEvent::RequestFailed { kind: RequestKind::Projects, status: Some(429), body: Some(_), .. }]
    ));
    Ok(())
}

#[test]
fn missing_api_key_never_reaches_the_server() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.path_contains("/v1");
        then.status(200);
    });

    let temp = tempfile::tempdir()?;
    let mut config = EngineConfig::default().with_api_base(server.url("/v1"));
    config.key_file = temp.path().join("missing.txt");
    let connector = ArduinoConnector::from_config(config)?;

    let result = connector.generate_instructions("Blink", "Blink an LED", "led x1\n");
    assert!(matches!(result, Err(EngineError::MissingApiKey { .. })));
    mock.assert_hits(0);
    Ok(())
}

#[test]
fn image_generation_decodes_b64_payload() -> Result<()> {
    let server = MockServer::start();
    let png = png_bytes()?;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images/generations")
            .json_body(json!({
                "model": "gpt-image-1-mini",
                "prompt": "An LED connected to pin 13 on a breadboard",
                "size": "1024x1024",
            }));
        then.status(200)
            .json_body(json!({ "created": 1, "data": [{ "b64_json": BASE64.encode(&png) }] }));
    });

    let connector = connector_for(&server)?;
    let image = connector.generate_image("An LED connected to pin 13 on a breadboard")?;
    mock.assert();
    assert_eq!(image.bytes, png);
    assert_eq!(image.mime_type, "image/png");
    Ok(())
}

#[test]
fn instructions_round_trip_through_prompt_and_parser() -> Result<()> {
    let server = MockServer::start();
    let content = json!({
        "instructions": [
            { "step": 1, "text": "Place the LED.", "code": null, "image_prompt": "LED on breadboard" },
            {
                "step": 2,
                "text": "Upload the sketch.",
                "code": { "language": "arduino", "snippet": "void setup() {\n  pinMode(13, OUTPUT);\n}" },
                "image_prompt": "Arduino connected by USB"
            }
        ]
    })
    .to_string();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("PROJECT TITLE:\\nBlink\\n")
            .body_contains("\"max_tokens\":15000");
        then.status(200).body(chat_envelope(&content));
    });

    let connector = connector_for(&server)?;
    let steps = connector
        .generate_instructions("Blink", "Blink an LED", "led x1\narduino x1\n")?
        .into_vec();
    mock.assert();
    assert_eq!(steps.len(), 2);
    assert!(steps[0].code.is_none());
    assert_eq!(
        steps[1].code.as_ref().map(|code| code.language.as_str()),
        Some("arduino")
    );
    Ok(())
}

#[test]
fn empty_component_list_is_no_results() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).body(chat_envelope("{\"components\": []}"));
    });

    let connector = connector_for(&server)?;
    let image = ImageAttachment::from_image_bytes(&png_bytes()?)?;
    assert_eq!(connector.analyze_components(&image)?, Parsed::NoResults);
    Ok(())
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        self.0
            .lock()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut bytes) = self.0.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn outgoing_request_is_traced_with_size_and_hash() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).body(chat_envelope("{\"projects\":[]}"));
    });
    let connector = connector_for(&server)?;

    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let parsed = tracing::subscriber::with_default(subscriber, || {
        connector.generate_projects("led x3\narduino x1\npush_button x1\n")
    })?;
    assert!(parsed.is_empty());

    let text = logs.text();
    let sending = text
        .lines()
        .find(|line| line.contains("sending request"))
        .unwrap_or_default();
    assert!(sending.contains("bytes="), "{text}");
    let sent = text
        .lines()
        .find(|line| line.contains("request sent"))
        .unwrap_or_default();
    assert!(sent.contains("request_hash="), "{text}");
    assert!(!text.contains("sk-test"));
    Ok(())
}
