mod parser;
mod registry;

pub use parser::{parse_command, SessionCommand, StepDirection};
pub use registry::SESSION_HELP_COMMANDS;
