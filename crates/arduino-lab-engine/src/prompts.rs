use arduino_lab_contracts::ComponentKind;

/// Asks the vision model to count the detectable parts in a photo.
pub fn detection_prompt() -> String {
    let mut prompt = String::from(
        "You are an Arduino lab assistant. In this image, detect ONLY the following components \
         and count how many of each are clearly visible:\n",
    );
    for kind in ComponentKind::DETECTABLE {
        prompt.push_str("- ");
        prompt.push_str(kind.as_str());
        prompt.push('\n');
    }
    prompt.push_str(
        "\nReturn STRICT JSON with this exact schema:\n\
         { \"components\": [ { \"item\": string, \"quantity\": integer } ] }\n\
         Only include components that are visible with quantity > 0. No extra text.",
    );
    prompt
}

/// `components` is the inventory in `item xN` lines.
pub fn project_prompt(components: &str) -> String {
    format!(
        "You are an Arduino project generator. Using ONLY the following available components:\n\
         {components}\n\
         Generate several creative project ideas. Do NOT invent components.\n\n\
         Each project must include:\n\
         • title\n• description\n• components: [ {{ item, quantity }} ]\n\n\
         Return STRICT JSON in this schema:\n\
         {{ \"projects\": [ {{ \"title\": string, \"description\": string, \"components\": [...] }} ] }}"
    )
}

pub fn instruction_prompt(title: &str, description: &str, components: &str) -> String {
    format!(
        "You are an Arduino instructor.\n\
         Generate a very clear step-by-step guide for building the project using the information below.\n\
         Each step MUST include:\n\
         1. step: number\n\
         2. text: beginner-friendly instruction\n\
         3. code: null OR a code object (if this step requires Arduino code)\n\
         4. image_prompt: a short, simple sentence describing an image that can visually illustrate this step\n\n\
         PROJECT TITLE:\n{title}\n\n\
         PROJECT DESCRIPTION:\n{description}\n\n\
         AVAILABLE COMPONENTS:\n{components}\n\n\
         IMPORTANT RULES:\n\
         1. Use ONLY the components listed above.\n\
         2. Wires and resistors are NOT included in the list. They MUST be added automatically when needed.\n   \
         When resistors are required (e.g., for LEDs), instruct the user:\n   \
         'Use an appropriate resistor (typically 220Ω–1kΩ depending on LED specifications).'\n\
         3. The instructions MUST be extremely clear for beginners.\n\
         4. Steps MUST be logical and sequential.\n\
         5. A step MAY need code. If code is needed, include:\n   \
         {{\n     \"language\": \"arduino\",\n     \"snippet\": \"<actual code>\"\n   }}\n   \
         Otherwise set code to null.\n\
         6. Each step MUST include an image_prompt describing EXACTLY what should be drawn.\n   \
         Image prompt rules:\n   \
         - Keep it short and simple.\n   \
         - No photography terms.\n   \
         - Focus on showing connections (Arduino pins, breadboard, components).\n   \
         - No references to JSON, steps, or the instructions.\n\n\
         IMPORTANT JSON VALIDITY RULES:\n\
         - JSON must be 100% valid and parseable.\n\
         - All JSON keys must use double quotes.\n\
         - All JSON string values must use double quotes.\n\
         - Inside code snippets, escape internal double quotes with \\\".\n\
         - All newlines must be escaped as \\n.\n\
         - DO NOT use single quotes for strings in code.\n\n\
         RETURN STRICT JSON USING THIS EXACT SCHEMA:\n\
         {{\n  \"instructions\": [\n    {{\n      \"step\": number,\n      \"text\": string,\n      \
         \"code\": {{ \"language\": string, \"snippet\": string }} | null,\n      \
         \"image_prompt\": string\n    }}\n  ]\n}}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_prompt_lists_every_detectable_kind_once() {
        let prompt = detection_prompt();
        for kind in ComponentKind::DETECTABLE {
            assert!(prompt.contains(&format!("- {}\n", kind.as_str())), "{kind}");
        }
        assert!(!prompt.contains("- resistor\n"));
        assert!(prompt.contains("\"components\""));
    }

    #[test]
    fn project_prompt_embeds_inventory_verbatim() {
        let prompt = project_prompt("led x3\narduino x1\n");
        assert!(prompt.contains("components:\nled x3\narduino x1\n\nGenerate"));
        assert!(prompt.contains("{ \"projects\": [ { \"title\": string"));
    }

    #[test]
    fn instruction_prompt_embeds_project_sections() {
        let prompt = instruction_prompt("Night light", "Turns on in the dark", "led x1\n");
        assert!(prompt.contains("PROJECT TITLE:\nNight light\n\n"));
        assert!(prompt.contains("PROJECT DESCRIPTION:\nTurns on in the dark\n\n"));
        assert!(prompt.contains("AVAILABLE COMPONENTS:\nled x1\n"));
        assert!(prompt.contains("220Ω–1kΩ"));
        assert!(prompt.contains("\"image_prompt\": string"));
    }
}
