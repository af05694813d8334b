//! Parsing of chat-completion envelopes whose message content is itself a
//! JSON document (optionally wrapped in Markdown fences).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::components::{Component, ComponentKind};
use crate::error::PayloadError;
use crate::instructions::{CodeSnippet, InstructionStep};
use crate::projects::Project;

pub const COMPONENTS_KEY: &str = "components";
pub const PROJECTS_KEY: &str = "projects";
pub const INSTRUCTIONS_KEY: &str = "instructions";

/// Outcome of a successful parse. An absent or empty top-level array is
/// reported as `NoResults` rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    Items(Vec<T>),
    NoResults,
}

impl<T> Parsed<T> {
    pub fn len(&self) -> usize {
        match self {
            Parsed::Items(items) => items.len(),
            Parsed::NoResults => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> &[T] {
        match self {
            Parsed::Items(items) => items,
            Parsed::NoResults => &[],
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Parsed::Items(items) => items,
            Parsed::NoResults => Vec::new(),
        }
    }
}

/// Returns `choices[0].message.content` from a raw chat-completion body.
pub fn extract_message_content(raw: &str) -> Result<String, PayloadError> {
    let envelope: Value = serde_json::from_str(raw).map_err(PayloadError::InvalidEnvelope)?;
    let content = envelope
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingContent)?;
    if content.trim().is_empty() {
        return Err(PayloadError::MissingContent);
    }
    Ok(content.to_string())
}

/// Removes Markdown code fences (with or without a language tag) around a
/// model reply. Unfenced text comes back trimmed.
pub fn strip_code_fence(text: &str) -> String {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.split_once('\n') {
            Some((first, remainder)) if is_fence_tag(first) => remainder,
            Some(_) => rest,
            None => rest.trim_start_matches(is_tag_char),
        };
    }
    body = body.trim_end();
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim().to_string()
}

fn is_tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '+')
}

fn is_fence_tag(line: &str) -> bool {
    line.trim().chars().all(is_tag_char)
}

fn parse_document(content: &str) -> Result<Map<String, Value>, PayloadError> {
    let cleaned = strip_code_fence(content);
    let parsed = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(err) => {
            // Models sometimes wrap the object in a sentence; retry on the braces.
            tracing::debug!(error = %err, "content is not bare JSON, retrying on outer braces");
            let sliced = match (cleaned.find('{'), cleaned.rfind('}')) {
                (Some(start), Some(end)) if end > start => {
                    serde_json::from_str::<Value>(&cleaned[start..=end]).ok()
                }
                _ => None,
            };
            sliced.ok_or(PayloadError::InvalidJson(err))?
        }
    };
    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(PayloadError::NotAnObject),
    }
}

fn top_level_array<'a>(
    document: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Vec<Value>>, PayloadError> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(rows)) if rows.is_empty() => Ok(None),
        Some(Value::Array(rows)) => Ok(Some(rows)),
        Some(_) => Err(PayloadError::NotAnArray {
            key: key.to_string(),
        }),
    }
}

pub(crate) fn parse_array<T>(
    content: &str,
    key: &str,
    parse_entry: impl Fn(usize, &Value) -> Result<T, PayloadError>,
) -> Result<Parsed<T>, PayloadError> {
    let document = parse_document(content)?;
    let Some(rows) = top_level_array(&document, key)? else {
        tracing::debug!(key, "payload has no results");
        return Ok(Parsed::NoResults);
    };
    let items = rows
        .iter()
        .enumerate()
        .map(|(index, row)| parse_entry(index, row))
        .collect::<Result<Vec<T>, PayloadError>>()?;
    tracing::debug!(key, count = items.len(), "parsed payload");
    Ok(Parsed::Items(items))
}

pub fn parse_components(raw: &str) -> Result<Parsed<Component>, PayloadError> {
    parse_components_from_content(&extract_message_content(raw)?)
}

pub fn parse_projects(raw: &str) -> Result<Parsed<Project>, PayloadError> {
    parse_projects_from_content(&extract_message_content(raw)?)
}

pub fn parse_instructions(raw: &str) -> Result<Parsed<InstructionStep>, PayloadError> {
    parse_instructions_from_content(&extract_message_content(raw)?)
}

pub fn parse_components_from_content(content: &str) -> Result<Parsed<Component>, PayloadError> {
    parse_array(content, COMPONENTS_KEY, component_from_value)
}

pub fn parse_projects_from_content(content: &str) -> Result<Parsed<Project>, PayloadError> {
    parse_array(content, PROJECTS_KEY, project_from_value)
}

pub fn parse_instructions_from_content(
    content: &str,
) -> Result<Parsed<InstructionStep>, PayloadError> {
    parse_array(content, INSTRUCTIONS_KEY, instruction_from_value)
}

/// Decodes `data[0].b64_json` from an images/generations response.
pub fn parse_image_generation(raw: &str) -> Result<Vec<u8>, PayloadError> {
    let envelope: Value = serde_json::from_str(raw).map_err(PayloadError::InvalidEnvelope)?;
    let b64 = envelope
        .get("data")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
        .and_then(|row| row.get("b64_json"))
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingImage)?;
    Ok(BASE64.decode(b64.trim().as_bytes())?)
}

fn entry_object(index: usize, value: &Value) -> Result<&Map<String, Value>, PayloadError> {
    value.as_object().ok_or_else(|| PayloadError::MalformedEntry {
        index,
        detail: "entry is not an object".to_string(),
    })
}

fn required_str<'a>(
    index: usize,
    row: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, PayloadError> {
    row.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| PayloadError::MalformedEntry {
            index,
            detail: format!("'{key}' must be a string"),
        })
}

fn component_from_value(index: usize, value: &Value) -> Result<Component, PayloadError> {
    let row = entry_object(index, value)?;
    let item = required_str(index, row, "item")?;
    let kind = item
        .parse::<ComponentKind>()
        .map_err(|_| PayloadError::UnknownComponent {
            index,
            item: item.to_string(),
        })?;

    let quantity = match row.get("quantity") {
        None | Some(Value::Null) => {
            return Err(PayloadError::InvalidQuantity {
                index,
                detail: "missing".to_string(),
            })
        }
        Some(Value::Number(number)) => {
            if let Some(unsigned) = number.as_u64() {
                u32::try_from(unsigned).map_err(|_| PayloadError::InvalidQuantity {
                    index,
                    detail: format!("{unsigned} is out of range"),
                })?
            } else if number.as_i64().is_some() {
                return Err(PayloadError::InvalidQuantity {
                    index,
                    detail: format!("{number} is negative"),
                });
            } else {
                return Err(PayloadError::InvalidQuantity {
                    index,
                    detail: format!("{number} is not an integer"),
                });
            }
        }
        Some(other) => {
            return Err(PayloadError::InvalidQuantity {
                index,
                detail: format!("{other} is not a number"),
            })
        }
    };

    let value = match row.get("value") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(raw.as_i64().ok_or_else(|| PayloadError::MalformedEntry {
            index,
            detail: format!("'value' must be an integer, got {raw}"),
        })?),
    };

    Ok(Component {
        item: kind,
        quantity,
        value: value.filter(|rating| *rating != 0),
    })
}

fn project_from_value(index: usize, value: &Value) -> Result<Project, PayloadError> {
    project_from_row(index, value, "title")
}

/// Model replies name the project `title`; the bundled catalogue uses `name`.
pub(crate) fn project_from_row(
    index: usize,
    value: &Value,
    title_key: &str,
) -> Result<Project, PayloadError> {
    let row = entry_object(index, value)?;
    let title = required_str(index, row, title_key)?.trim();
    if title.is_empty() {
        return Err(PayloadError::MalformedEntry {
            index,
            detail: format!("'{title_key}' is empty"),
        });
    }
    let description = required_str(index, row, "description")?.trim();

    let components = match row.get(COMPONENTS_KEY) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rows)) => rows
            .iter()
            .enumerate()
            .map(|(component_index, component)| {
                component_from_value(component_index, component)
            })
            .collect::<Result<Vec<Component>, PayloadError>>()
            .map_err(|source| PayloadError::InProject {
                index,
                source: Box::new(source),
            })?,
        Some(_) => {
            return Err(PayloadError::MalformedEntry {
                index,
                detail: "'components' must be an array".to_string(),
            })
        }
    };

    Ok(Project {
        title: title.to_string(),
        description: description.to_string(),
        components,
    })
}

fn instruction_from_value(index: usize, value: &Value) -> Result<InstructionStep, PayloadError> {
    let row = entry_object(index, value)?;
    let step = row
        .get("step")
        .and_then(Value::as_u64)
        .and_then(|step| u32::try_from(step).ok())
        .ok_or_else(|| PayloadError::MalformedEntry {
            index,
            detail: "'step' must be a non-negative integer".to_string(),
        })?;
    let text = required_str(index, row, "text")?.to_string();

    let code = match row.get("code") {
        None | Some(Value::Null) => None,
        Some(Value::Object(code)) => {
            let snippet = required_str(index, code, "snippet")?;
            let language = code
                .get("language")
                .and_then(Value::as_str)
                .unwrap_or("arduino");
            Some(CodeSnippet {
                language: language.to_string(),
                snippet: snippet.to_string(),
            })
            .filter(|code| !code.snippet.trim().is_empty())
        }
        Some(_) => {
            return Err(PayloadError::MalformedEntry {
                index,
                detail: "'code' must be an object or null".to_string(),
            })
        }
    };

    let image_prompt = match row.get("image_prompt") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(prompt)) => prompt.clone(),
        Some(_) => {
            return Err(PayloadError::MalformedEntry {
                index,
                detail: "'image_prompt' must be a string".to_string(),
            })
        }
    };

    Ok(InstructionStep {
        step,
        text,
        code,
        image_prompt,
    })
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use serde_json::json;

    use super::*;

    fn envelope(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        })
        .to_string()
    }

    #[test]
    fn strip_code_fence_handles_tags_and_partial_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn fenced_and_unfenced_content_parse_identically() -> anyhow::Result<()> {
        let body = r#"{"components":[{"item":"led","quantity":3},{"item":"arduino","quantity":1}]}"#;
        let plain = parse_components(&envelope(body))?;
        let fenced = parse_components(&envelope(&format!("```json\n{body}\n```")))?;
        let bare_fence = parse_components(&envelope(&format!("```\n{body}\n```")))?;
        assert_eq!(plain, fenced);
        assert_eq!(plain, bare_fence);
        assert_eq!(plain.len(), 2);
        Ok(())
    }

    #[test]
    fn cardinality_matches_input_arrays() -> anyhow::Result<()> {
        let projects = json!({
            "projects": [
                {"title": "Blink", "description": "Blink an LED", "components": [{"item": "led", "quantity": 1}]},
                {"title": "Fan", "description": "Spin a motor", "components": []},
                {"title": "Alarm", "description": "Buzz on heat", "components": [
                    {"item": "temp_sensor", "quantity": 1}, {"item": "piezo_buzzer", "quantity": 1}
                ]},
            ]
        });
        let parsed = parse_projects(&envelope(&projects.to_string()))?;
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.items()[2].components.len(), 2);

        let steps = json!({
            "instructions": [
                {"step": 1, "text": "Place the Arduino", "code": null, "image_prompt": "an arduino"},
                {"step": 2, "text": "Upload", "code": {"language": "arduino", "snippet": "void setup() {}\nvoid loop() {}"}, "image_prompt": "a laptop"},
            ]
        });
        let parsed = parse_instructions(&envelope(&steps.to_string()))?;
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed.items()[1].code.as_ref().map(|code| code.language.as_str()),
            Some("arduino")
        );
        Ok(())
    }

    #[test]
    fn missing_or_empty_array_is_no_results() -> anyhow::Result<()> {
        assert_eq!(
            parse_components(&envelope(r#"{"components": []}"#))?,
            Parsed::NoResults
        );
        assert_eq!(parse_projects(&envelope("{}"))?, Parsed::NoResults);
        assert_eq!(
            parse_instructions(&envelope(r#"{"instructions": null}"#))?,
            Parsed::NoResults
        );
        Ok(())
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let err = parse_components(&envelope(
            r#"{"components":[{"item":"led","quantity":2},{"item":"diode","quantity":-1}]}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, PayloadError::InvalidQuantity { index: 1, .. }));
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let err = parse_components(&envelope(
            r#"{"components":[{"item":"flux_capacitor","quantity":1}]}"#,
        ))
        .unwrap_err();
        match err {
            PayloadError::UnknownComponent { index, item } => {
                assert_eq!(index, 0);
                assert_eq!(item, "flux_capacitor");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fractional_or_string_quantities_are_not_coerced() {
        for body in [
            r#"{"components":[{"item":"led","quantity":1.5}]}"#,
            r#"{"components":[{"item":"led","quantity":"2"}]}"#,
            r#"{"components":[{"item":"led"}]}"#,
        ] {
            let err = parse_components(&envelope(body)).unwrap_err();
            assert!(matches!(err, PayloadError::InvalidQuantity { .. }), "{body}");
        }
    }

    #[test]
    fn project_component_errors_name_the_project() {
        let body = json!({"projects": [
            {"title": "Ok", "description": "", "components": []},
            {"title": "Bad", "description": "", "components": [{"item": "led", "quantity": -4}]},
        ]});
        let err = parse_projects(&envelope(&body.to_string())).unwrap_err();
        match err {
            PayloadError::InProject { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, PayloadError::InvalidQuantity { index: 0, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn component_value_zero_means_unset() -> anyhow::Result<()> {
        let parsed = parse_components_from_content(
            r#"{"components":[{"item":"resistor","quantity":4,"value":220},{"item":"led","quantity":1,"value":0}]}"#,
        )?;
        assert_eq!(parsed.items()[0].value, Some(220));
        assert_eq!(parsed.items()[1].value, None);
        Ok(())
    }

    #[test]
    fn envelope_errors_are_distinct() {
        assert!(matches!(
            extract_message_content("not json"),
            Err(PayloadError::InvalidEnvelope(_))
        ));
        assert!(matches!(
            extract_message_content(r#"{"error":{"message":"quota"}}"#),
            Err(PayloadError::MissingContent)
        ));
        assert!(matches!(
            parse_components(&envelope("I could not see any parts.")),
            Err(PayloadError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_components(&envelope("[1, 2]")),
            Err(PayloadError::NotAnObject)
        ));
        assert!(matches!(
            parse_components(&envelope(r#"{"components": {"item": "led"}}"#)),
            Err(PayloadError::NotAnArray { .. })
        ));
    }

    #[test]
    fn prose_wrapped_object_is_recovered() -> anyhow::Result<()> {
        let parsed = parse_components(&envelope(
            "Here you go: {\"components\":[{\"item\":\"relay\",\"quantity\":1}]} Enjoy!",
        ))?;
        assert_eq!(parsed.items()[0].item, ComponentKind::Relay);
        Ok(())
    }

    #[test]
    fn empty_code_snippet_becomes_none() -> anyhow::Result<()> {
        let parsed = parse_instructions_from_content(
            r#"{"instructions":[{"step":1,"text":"Wire it","code":{"language":"arduino","snippet":"  "},"image_prompt":"wires"}]}"#,
        )?;
        assert_eq!(parsed.items()[0].code, None);
        Ok(())
    }

    #[test]
    fn image_generation_decodes_first_item() -> anyhow::Result<()> {
        let raw = json!({"created": 1, "data": [{"b64_json": BASE64.encode(b"\x89PNG")}]}).to_string();
        assert_eq!(parse_image_generation(&raw)?, b"\x89PNG".to_vec());
        assert!(matches!(
            parse_image_generation(r#"{"data": []}"#),
            Err(PayloadError::MissingImage)
        ));
        assert!(matches!(
            parse_image_generation(r#"{"data": [{"b64_json": "%%%"}]}"#),
            Err(PayloadError::InvalidImageData(_))
        ));
        Ok(())
    }
}
