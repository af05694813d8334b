use serde_json::{json, Value};

use crate::media::ImageAttachment;

pub const COMPONENTS_MAX_TOKENS: u32 = 500;
pub const PROJECTS_MAX_TOKENS: u32 = 1000;
pub const INSTRUCTIONS_MAX_TOKENS: u32 = 15000;

/// Single-turn chat completion with an optional photo.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub prompt: String,
    pub image: Option<ImageAttachment>,
}

impl ChatRequest {
    pub fn text(model: impl Into<String>, max_tokens: u32, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    /// Text-only requests send `content` as a plain string; image requests
    /// send the text part followed by the image part.
    pub fn to_json(&self) -> Value {
        let content = match &self.image {
            None => Value::String(self.prompt.clone()),
            Some(image) => json!([
                { "type": "text", "text": self.prompt },
                { "type": "image_url", "image_url": { "url": image.data_url() } },
            ]),
        };
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": content }],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
}

impl ImageGenerationRequest {
    pub fn to_json(&self) -> Value {
        json!({
            "model": self.model,
            "prompt": self.prompt,
            "size": self.size,
        })
    }
}
