use serde::Serialize;

use crate::components::Component;

/// Only built through the validating parsers in `payloads` and `catalog`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub title: String,
    pub description: String,
    pub components: Vec<Component>,
}

impl Project {
    /// Inventory-style listing used when asking for instructions.
    pub fn components_text(&self) -> String {
        let mut out = String::new();
        for component in self.components.iter().filter(|row| row.quantity > 0) {
            out.push_str(&format!("{} x{}\n", component.item, component.quantity));
        }
        out
    }
}

/// Project picked by the user, carried into instruction generation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectedProject {
    pub title: String,
    pub description: String,
}

impl From<&Project> for SelectedProject {
    fn from(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone(),
        }
    }
}
