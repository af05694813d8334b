use std::path::Path;

use serde_json::{Map, Value};

pub const RECEIPT_SCHEMA_VERSION: u64 = 1;
pub const RECEIPT_BODY_MAX_CHARS: usize = 4096;

/// Everything worth keeping about one API exchange, minus image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestReceipt<'a> {
    pub kind: &'a str,
    pub endpoint: &'a str,
    pub model: &'a str,
    pub request: &'a Value,
    pub status: Option<u16>,
    pub response_body: Option<&'a str>,
    pub error: Option<String>,
}

pub fn build_receipt(receipt: &RequestReceipt<'_>) -> Value {
    let mut root = Map::new();
    root.insert(
        "schema_version".to_string(),
        Value::Number(RECEIPT_SCHEMA_VERSION.into()),
    );
    root.insert("kind".to_string(), Value::String(receipt.kind.to_string()));
    root.insert(
        "endpoint".to_string(),
        Value::String(receipt.endpoint.to_string()),
    );
    root.insert("model".to_string(), Value::String(receipt.model.to_string()));
    root.insert("request".to_string(), sanitize_payload(receipt.request));
    root.insert(
        "status".to_string(),
        receipt
            .status
            .map(|status| Value::Number(status.into()))
            .unwrap_or(Value::Null),
    );
    root.insert(
        "response".to_string(),
        receipt
            .response_body
            .map(sanitize_response_body)
            .unwrap_or(Value::Null),
    );
    root.insert(
        "error".to_string(),
        receipt.error.clone().map(Value::String).unwrap_or(Value::Null),
    );
    Value::Object(root)
}

pub fn write_receipt(path: &Path, payload: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}

fn sanitize_response_body(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => sanitize_payload(&parsed),
        Err(_) => Value::String(truncate(body, RECEIPT_BODY_MAX_CHARS)),
    }
}

/// Replaces inline image data (data URLs, `b64_json`) with a placeholder.
pub fn sanitize_payload(value: &Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        Value::String(text) if text.starts_with("data:image/") => {
            Value::String("<omitted>".to_string())
        }
        Value::String(_) => value.clone(),
        Value::Array(rows) => Value::Array(rows.iter().map(sanitize_payload).collect()),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, row) in map {
                if key.eq_ignore_ascii_case("b64_json") {
                    out.insert(key.clone(), Value::String("<omitted>".to_string()));
                    continue;
                }
                out.insert(key.clone(), sanitize_payload(row));
            }
            Value::Object(out)
        }
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{build_receipt, write_receipt, RequestReceipt, RECEIPT_SCHEMA_VERSION};

    #[test]
    fn receipt_omits_image_data_and_keeps_shape() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("receipt-components-1.json");
        let request = json!({
            "model": "chatgpt-4o-latest",
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "count parts"},
                {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAAA"}},
            ]}],
        });
        let body = json!({"data": [{"b64_json": "iVBOR"}]}).to_string();
        let payload = build_receipt(&RequestReceipt {
            kind: "components",
            endpoint: "https://api.openai.com/v1/chat/completions",
            model: "chatgpt-4o-latest",
            request: &request,
            status: Some(200),
            response_body: Some(&body),
            error: None,
        });
        write_receipt(&path, &payload)?;

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(parsed["schema_version"], json!(RECEIPT_SCHEMA_VERSION));
        assert_eq!(parsed["status"], json!(200));
        assert_eq!(
            parsed["request"]["messages"][0]["content"][1]["image_url"]["url"],
            json!("<omitted>")
        );
        assert_eq!(
            parsed["request"]["messages"][0]["content"][0]["text"],
            json!("count parts")
        );
        assert_eq!(parsed["response"]["data"][0]["b64_json"], json!("<omitted>"));
        Ok(())
    }

    #[test]
    fn non_json_bodies_are_kept_as_text() {
        let request = json!({});
        let payload = build_receipt(&RequestReceipt {
            kind: "projects",
            endpoint: "e",
            model: "m",
            request: &request,
            status: Some(502),
            response_body: Some("<html>bad gateway</html>"),
            error: Some("status 502".to_string()),
        });
        assert_eq!(payload["response"], json!("<html>bad gateway</html>"));
        assert_eq!(payload["error"], json!("status 502"));
    }
}
