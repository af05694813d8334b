#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "scan",
    action: "scan",
}];

pub(crate) const QUANTITY_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "add",
        action: "add",
    },
    CommandSpec {
        command: "remove",
        action: "remove",
    },
];

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "model",
        action: "set_model",
    },
    CommandSpec {
        command: "project",
        action: "view_project",
    },
    CommandSpec {
        command: "step",
        action: "step",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "keep",
        action: "keep_scan",
    },
    CommandSpec {
        command: "inventory",
        action: "inventory",
    },
    CommandSpec {
        command: "manual",
        action: "manual",
    },
    CommandSpec {
        command: "next",
        action: "next_page",
    },
    CommandSpec {
        command: "prev",
        action: "previous_page",
    },
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "suggest",
        action: "suggest",
    },
    CommandSpec {
        command: "select",
        action: "select",
    },
    CommandSpec {
        command: "instructions",
        action: "instructions",
    },
    CommandSpec {
        command: "code",
        action: "toggle_code",
    },
    CommandSpec {
        command: "illustrate",
        action: "illustrate",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/scan <image>",
    "/keep",
    "/add <item> [n]",
    "/remove <item> [n]",
    "/inventory",
    "/manual",
    "/next",
    "/prev",
    "/reset",
    "/suggest",
    "/project <n>",
    "/select",
    "/instructions",
    "/step next|prev",
    "/code",
    "/illustrate",
    "/model <name>",
    "/help",
    "/quit",
];
