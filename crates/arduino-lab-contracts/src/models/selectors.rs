use super::registry::{ModelRegistry, ModelSpec};

pub const CAPABILITY_VISION: &str = "vision";
pub const CAPABILITY_IMAGE: &str = "image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

impl ModelSelection {
    pub fn is_fallback(&self) -> bool {
        self.requested
            .as_deref()
            .map(|requested| requested != self.model.name)
            .unwrap_or(false)
    }
}

/// Resolves a user-supplied model name against the registry, falling back
/// to the first model with the capability and recording why.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_else(|| ModelRegistry::new(None)),
        }
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        if let Some(name) = requested {
            if let Some(model) = self.registry.ensure(name, capability) {
                return Ok(ModelSelection {
                    model,
                    requested: Some(name.to_string()),
                    fallback_reason: None,
                });
            }
        }

        let Some(model) = self.registry.by_capability(capability).into_iter().next() else {
            return Err(format!(
                "No models available for capability '{capability}'."
            ));
        };
        let fallback_reason = match requested {
            Some(name) => format!("Requested model '{name}' unavailable for capability '{capability}'."),
            None => "No model specified; using default.".to_string(),
        };
        Ok(ModelSelection {
            model,
            requested: requested.map(str::to_string),
            fallback_reason: Some(fallback_reason),
        })
    }

    pub fn select_vision(&self, requested: Option<&str>) -> Result<ModelSelection, String> {
        self.select(requested, CAPABILITY_VISION)
    }

    pub fn select_image(&self, requested: Option<&str>) -> Result<ModelSelection, String> {
        self.select(requested, CAPABILITY_IMAGE)
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::super::registry::{ModelRegistry, ModelSpec};
    use super::ModelSelector;

    fn spec(name: &str, capabilities: &[&str]) -> ModelSpec {
        ModelSpec {
            name: name.to_string(),
            capabilities: capabilities.iter().map(|item| item.to_string()).collect(),
        }
    }

    #[test]
    fn selector_falls_back_when_requested_model_unavailable() {
        let selection = ModelSelector::new(None)
            .select_vision(Some("gpt-image-1-mini"))
            .unwrap();
        assert_eq!(selection.model.name, "chatgpt-4o-latest");
        assert!(selection.is_fallback());
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Requested model 'gpt-image-1-mini' unavailable for capability 'vision'.")
        );
    }

    #[test]
    fn selector_no_request_uses_default_with_explanation() {
        let selection = ModelSelector::new(None).select_image(Some("  ")).unwrap();
        assert!(!selection.is_fallback());
        assert_eq!(selection.model.name, "gpt-image-1-mini");
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("No model specified; using default.")
        );
    }

    #[test]
    fn selector_errors_when_no_models_for_capability() {
        let mut models = IndexMap::new();
        models.insert("text-only".to_string(), spec("text-only", &["text"]));
        let err = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(Some("gpt-4.1-mini"), "vision")
            .err()
            .unwrap_or_default();
        assert_eq!(err, "No models available for capability 'vision'.");
    }
}
