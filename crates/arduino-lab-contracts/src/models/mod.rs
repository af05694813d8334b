mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec, VisionModel, DEFAULT_IMAGE_MODEL};
pub use selectors::{ModelSelection, ModelSelector, CAPABILITY_IMAGE, CAPABILITY_VISION};
