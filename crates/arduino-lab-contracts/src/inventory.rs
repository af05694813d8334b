use crate::components::{Component, ComponentKind};
use crate::error::PayloadError;
use crate::projects::Project;

/// Minimum distinct parts before project suggestions are offered.
pub const MIN_KINDS_FOR_SUGGESTIONS: usize = 3;

/// In-memory parts list for one session. Never written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inventory {
    components: Vec<Component>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inventory with every detectable kind present at zero, so manual
    /// selection can list them all.
    pub fn seeded() -> Self {
        let mut inventory = Self::new();
        inventory.reset();
        inventory
    }

    pub fn reset(&mut self) {
        self.components = ComponentKind::DETECTABLE
            .iter()
            .map(|kind| Component::new(*kind, 0))
            .collect();
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn quantity(&self, kind: ComponentKind) -> u32 {
        self.components
            .iter()
            .find(|row| row.item == kind)
            .map(|row| row.quantity)
            .unwrap_or(0)
    }

    pub fn add(&mut self, kind: ComponentKind, quantity: u32) {
        match self.components.iter_mut().find(|row| row.item == kind) {
            Some(row) => row.quantity = row.quantity.saturating_add(quantity),
            None => self.components.push(Component::new(kind, quantity)),
        }
    }

    pub fn increment(&mut self, kind: ComponentKind) -> u32 {
        self.add(kind, 1);
        self.quantity(kind)
    }

    /// Removes one unit; quantities never go below zero.
    pub fn decrement(&mut self, kind: ComponentKind) -> u32 {
        self.remove(kind, 1)
    }

    pub fn remove(&mut self, kind: ComponentKind, quantity: u32) -> u32 {
        match self.components.iter_mut().find(|row| row.item == kind) {
            Some(row) => {
                row.quantity = row.quantity.saturating_sub(quantity);
                row.quantity
            }
            None => 0,
        }
    }

    /// Adds scan results on top of what is already there.
    pub fn merge(&mut self, detected: &[Component]) {
        for component in detected {
            self.add(component.item, component.quantity);
            if let (Some(value), Some(row)) = (
                component.value,
                self.components
                    .iter_mut()
                    .find(|row| row.item == component.item),
            ) {
                row.value = Some(value);
            }
        }
    }

    pub fn non_zero(&self) -> Vec<Component> {
        self.components
            .iter()
            .filter(|row| row.quantity > 0)
            .cloned()
            .collect()
    }

    pub fn distinct_kinds(&self) -> usize {
        self.components.iter().filter(|row| row.quantity > 0).count()
    }

    pub fn can_suggest_projects(&self) -> bool {
        self.distinct_kinds() >= MIN_KINDS_FOR_SUGGESTIONS
    }

    /// One `<id> x<qty>` line per part on hand, fed to the project prompt.
    pub fn compound_string(&self) -> String {
        let mut out = String::new();
        for component in self.components.iter().filter(|row| row.quantity > 0) {
            out.push_str(&format!("{} x{}\n", component.item, component.quantity));
        }
        out
    }

    /// Reads the `<id> x<qty>` listing back. A bare id counts as one; blank
    /// lines are skipped.
    pub fn from_compound_string(text: &str) -> Result<Self, PayloadError> {
        let mut inventory = Self::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let raw_item = parts.next().unwrap_or_default();
            let item = raw_item
                .parse::<ComponentKind>()
                .map_err(|err| PayloadError::UnknownComponent {
                    index,
                    item: err.0,
                })?;
            let quantity = match parts.next() {
                None => 1,
                Some(raw) => raw
                    .trim_start_matches(['x', 'X'])
                    .parse::<u32>()
                    .map_err(|_| PayloadError::InvalidQuantity {
                        index,
                        detail: format!("'{raw}' is not a count"),
                    })?,
            };
            if let Some(extra) = parts.next() {
                return Err(PayloadError::MalformedEntry {
                    index,
                    detail: format!("unexpected '{extra}' after quantity"),
                });
            }
            inventory.add(item, quantity);
        }
        Ok(inventory)
    }

    /// Exactly the parts a chosen project needs; selecting a project
    /// replaces the session inventory with this.
    pub fn from_project(project: &Project) -> Self {
        let mut inventory = Self::new();
        for component in &project.components {
            inventory.add(component.item, component.quantity);
        }
        inventory
    }
}
