use crate::components::ComponentKind;

use super::registry::{
    CommandSpec, NO_ARG_COMMANDS, QUANTITY_COMMANDS, RAW_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Next,
    Previous,
}

/// One line typed into the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Noop,
    Scan { path: String },
    /// Adds the last scan results to the inventory.
    KeepScan,
    Add { item: ComponentKind, quantity: u32 },
    Remove { item: ComponentKind, quantity: u32 },
    Inventory,
    Manual,
    NextPage,
    PreviousPage,
    Reset,
    Suggest,
    ViewProject { index: usize },
    Select,
    Instructions,
    Step(StepDirection),
    ToggleCode,
    Illustrate,
    SetModel { model: String },
    Help,
    Quit,
    Invalid { message: String },
    Unknown { command: String, arg: String },
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    }
}

fn parse_quantity_args(action: &str, arg: &str) -> SessionCommand {
    let parts = split_args(arg);
    let Some(raw_item) = parts.first() else {
        return SessionCommand::Invalid {
            message: format!("/{action} requires a component name"),
        };
    };
    let item = match raw_item.parse::<ComponentKind>() {
        Ok(item) => item,
        Err(err) => {
            return SessionCommand::Invalid {
                message: err.to_string(),
            }
        }
    };
    let quantity = match parts.get(1) {
        None => 1,
        Some(raw) => match raw.parse::<u32>() {
            Ok(quantity) => quantity,
            Err(_) => {
                return SessionCommand::Invalid {
                    message: format!("quantity must be a non-negative integer, got '{raw}'"),
                }
            }
        },
    };
    if action == "add" {
        SessionCommand::Add { item, quantity }
    } else {
        SessionCommand::Remove { item, quantity }
    }
}

fn parse_raw_arg(action: &str, arg: &str) -> SessionCommand {
    match action {
        "set_model" if arg.is_empty() => SessionCommand::Invalid {
            message: "/model requires a model name".to_string(),
        },
        "set_model" => SessionCommand::SetModel {
            model: arg.to_string(),
        },
        "view_project" => match arg.parse::<usize>() {
            Ok(number) if number > 0 => SessionCommand::ViewProject { index: number - 1 },
            _ => SessionCommand::Invalid {
                message: format!("/project expects a project number, got '{arg}'"),
            },
        },
        _ => match arg.to_ascii_lowercase().as_str() {
            "" | "next" | "n" => SessionCommand::Step(StepDirection::Next),
            "prev" | "previous" | "p" => SessionCommand::Step(StepDirection::Previous),
            other => SessionCommand::Invalid {
                message: format!("/step expects next or prev, got '{other}'"),
            },
        },
    }
}

fn no_arg_command(action: &str) -> SessionCommand {
    match action {
        "keep_scan" => SessionCommand::KeepScan,
        "inventory" => SessionCommand::Inventory,
        "manual" => SessionCommand::Manual,
        "next_page" => SessionCommand::NextPage,
        "previous_page" => SessionCommand::PreviousPage,
        "reset" => SessionCommand::Reset,
        "suggest" => SessionCommand::Suggest,
        "select" => SessionCommand::Select,
        "instructions" => SessionCommand::Instructions,
        "toggle_code" => SessionCommand::ToggleCode,
        "illustrate" => SessionCommand::Illustrate,
        "quit" => SessionCommand::Quit,
        _ => SessionCommand::Help,
    }
}

pub fn parse_command(text: &str) -> SessionCommand {
    let raw = text.trim();
    if raw.is_empty() {
        return SessionCommand::Noop;
    }
    let Some(slash_tail) = raw.strip_prefix('/') else {
        return SessionCommand::Unknown {
            command: String::new(),
            arg: raw.to_string(),
        };
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
        let parts = split_args(arg);
        return match parts.len() {
            0 => SessionCommand::Invalid {
                message: format!("/{action} requires an image path"),
            },
            _ => SessionCommand::Scan {
                path: parts.join(" "),
            },
        };
    }
    if let Some(action) = find_action(&command, QUANTITY_COMMANDS) {
        return parse_quantity_args(action, arg);
    }
    if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
        return parse_raw_arg(action, arg);
    }
    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return no_arg_command(action);
    }

    SessionCommand::Unknown {
        command,
        arg: arg.to_string(),
    }
}
