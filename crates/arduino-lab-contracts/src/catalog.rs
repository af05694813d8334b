//! The bundled project catalogue (`projects.json`) and start-up tips
//! (`tips.json`). Catalogue rows go through the same checks as model
//! replies, so an unknown part or an unnamed project is rejected.

use serde::Deserialize;

use crate::error::PayloadError;
use crate::payloads::{parse_array, project_from_row, Parsed, PROJECTS_KEY};
use crate::projects::Project;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tip {
    pub text: String,
    /// e.g. `beginner`, `safety`.
    #[serde(default)]
    pub category: Option<String>,
}

impl Tip {
    pub fn banner(&self) -> String {
        format!("Friendly Tip: {}", self.text.trim())
    }
}

#[derive(Debug, Deserialize)]
struct TipList {
    #[serde(default)]
    tips: Vec<Tip>,
}

/// `{"projects": [{"name", "description", "components": [...]}]}`.
pub fn parse_catalog(content: &str) -> Result<Parsed<Project>, PayloadError> {
    parse_array(content, PROJECTS_KEY, |index, row| {
        project_from_row(index, row, "name")
    })
}

/// Tips with blank text are dropped.
pub fn parse_tips(content: &str) -> Result<Vec<Tip>, PayloadError> {
    let list: TipList = serde_json::from_str(content).map_err(PayloadError::InvalidJson)?;
    Ok(list
        .tips
        .into_iter()
        .filter(|tip| !tip.text.trim().is_empty())
        .collect())
}

pub fn pick_tip(tips: &[Tip], seed: u64) -> Option<&Tip> {
    if tips.is_empty() {
        return None;
    }
    let index = (seed % tips.len() as u64) as usize;
    tips.get(index)
}
