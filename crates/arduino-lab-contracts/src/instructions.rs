use serde::{Deserialize, Serialize};

pub const CODE_PREVIEW_CHARS: usize = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub language: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionStep {
    pub step: u32,
    pub text: String,
    #[serde(default)]
    pub code: Option<CodeSnippet>,
    #[serde(default)]
    pub image_prompt: String,
}

impl InstructionStep {
    /// Code shown in the side pane, cut to [`CODE_PREVIEW_CHARS`] unless expanded.
    pub fn code_preview(&self, expanded: bool) -> Option<String> {
        let code = self.code.as_ref()?;
        if expanded || code.snippet.chars().count() <= CODE_PREVIEW_CHARS {
            return Some(code.snippet.clone());
        }
        let head: String = code.snippet.chars().take(CODE_PREVIEW_CHARS).collect();
        Some(format!("{head}..."))
    }
}

/// Navigation state over a generated guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCursor {
    steps: Vec<InstructionStep>,
    index: usize,
    code_expanded: bool,
}

impl StepCursor {
    /// Returns `None` for an empty guide; there is nothing to navigate.
    pub fn new(steps: Vec<InstructionStep>) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        Some(Self {
            steps,
            index: 0,
            code_expanded: false,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &InstructionStep {
        &self.steps[self.index]
    }

    pub fn steps(&self) -> &[InstructionStep] {
        &self.steps
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.steps.len()
    }

    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.index += 1;
        self.code_expanded = false;
        true
    }

    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.index -= 1;
        self.code_expanded = false;
        true
    }

    pub fn toggle_code(&mut self) -> bool {
        self.code_expanded = !self.code_expanded;
        self.code_expanded
    }

    pub fn code_expanded(&self) -> bool {
        self.code_expanded
    }

    pub fn code_preview(&self) -> Option<String> {
        self.current().code_preview(self.code_expanded)
    }

    /// `Step 2 of 7`.
    pub fn label(&self) -> String {
        format!("Step {} of {}", self.index + 1, self.steps.len())
    }
}
