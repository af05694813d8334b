use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1-mini";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub capabilities: Vec<String>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

/// Vision-capable chat models the assistant can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisionModel {
    #[default]
    Gpt4o,
    Gpt41Mini,
}

impl VisionModel {
    pub fn as_str(self) -> &'static str {
        match self {
            VisionModel::Gpt4o => "chatgpt-4o-latest",
            VisionModel::Gpt41Mini => "gpt-4.1-mini",
        }
    }
}

impl fmt::Display for VisionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisionModel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "chatgpt-4o-latest" | "gpt-4o" | "gpt4o" => Ok(VisionModel::Gpt4o),
            "gpt-4.1-mini" | "gpt41mini" => Ok(VisionModel::Gpt41Mini),
            other => Err(format!("unsupported vision model '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        let model = self.get(name)?;
        if model.supports(capability) {
            return Some(model.clone());
        }
        None
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, capabilities: &[&str]| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
            },
        );
    };

    insert(VisionModel::Gpt4o.as_str(), &["text", "vision"]);
    insert(VisionModel::Gpt41Mini.as_str(), &["text", "vision"]);
    insert(DEFAULT_IMAGE_MODEL, &["image"]);

    map
}

#[cfg(test)]
mod tests {
    use super::{ModelRegistry, VisionModel, DEFAULT_IMAGE_MODEL};

    #[test]
    fn default_registry_orders_vision_models_first() {
        let registry = ModelRegistry::new(None);
        let vision: Vec<String> = registry
            .by_capability("vision")
            .into_iter()
            .map(|model| model.name)
            .collect();
        assert_eq!(vision, vec!["chatgpt-4o-latest", "gpt-4.1-mini"]);
        assert!(registry.ensure(DEFAULT_IMAGE_MODEL, "image").is_some());
        assert!(registry.ensure(DEFAULT_IMAGE_MODEL, "vision").is_none());
    }

    #[test]
    fn vision_model_parses_aliases() {
        assert_eq!("gpt-4o".parse::<VisionModel>(), Ok(VisionModel::Gpt4o));
        assert_eq!(
            "GPT-4.1-mini".parse::<VisionModel>(),
            Ok(VisionModel::Gpt41Mini)
        );
        assert!("davinci".parse::<VisionModel>().is_err());
    }
}
