use arduino_lab_contracts::{Component, InstructionStep, Project};

pub fn component_line(component: &Component) -> String {
    match component.value {
        Some(value) => format!("  {} [{value}]", component.label()),
        None => format!("  {}", component.label()),
    }
}

/// `index` is zero-based; projects are shown numbered from 1.
pub fn project_block(index: usize, project: &Project) -> String {
    let mut out = format!("{}. {}\n   {}\n", index + 1, project.title, project.description);
    for component in &project.components {
        out.push_str(&format!("   - {}\n", component.label()));
    }
    out
}

pub fn step_block(label: &str, step: &InstructionStep, expand_code: bool) -> String {
    let mut out = format!("{label}\n{}\n", step.text);
    if let Some(code) = step.code_preview(expand_code) {
        let language = step
            .code
            .as_ref()
            .map(|code| code.language.as_str())
            .unwrap_or("arduino");
        out.push_str(&format!("--- {language} ---\n{code}\n---\n"));
    }
    if !step.image_prompt.is_empty() {
        out.push_str(&format!("Illustration: {}\n", step.image_prompt));
    }
    out
}
