use std::fs;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use arduino_lab_contracts::catalog::{parse_catalog, parse_tips, pick_tip};
use arduino_lab_contracts::commands::{
    parse_command, SessionCommand, StepDirection, SESSION_HELP_COMMANDS,
};
use arduino_lab_contracts::paging::{
    INVENTORY_PAGE_SIZE, MANUAL_SELECTION_PAGE_SIZE, PROJECT_COMPONENTS_PAGE_SIZE,
    SCAN_RESULTS_PAGE_SIZE,
};
use arduino_lab_contracts::{
    Component, InstructionStep, Inventory, Pager, Parsed, Project, SelectedProject, StepCursor,
};
use arduino_lab_engine::{
    ArduinoConnector, Completed, ConnectorEvent, Dispatcher, GeneratedImage, ImageAttachment,
    Transport,
};

use crate::render;

const SCAN_SCREEN: &str = "scan";
const PROJECTS_SCREEN: &str = "projects";
const INSTRUCTIONS_SCREEN: &str = "instructions";
const ILLUSTRATION_SCREEN: &str = "illustration";
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Outcome {
    Components(Parsed<Component>),
    Projects(Parsed<Project>),
    Instructions(Parsed<InstructionStep>),
    Illustration { step: usize, image: GeneratedImage },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Inventory,
    ScanResults,
    Manual,
    Projects,
    Project,
    Instructions,
}

/// Files read once when the session starts.
#[derive(Debug, Default)]
pub struct SessionFiles {
    pub catalog: Option<PathBuf>,
    pub tips: Option<PathBuf>,
}

pub fn run_session(
    connector: Arc<ArduinoConnector>,
    out_dir: PathBuf,
    files: SessionFiles,
) -> Result<()> {
    connector.subscribe(|event| {
        let kind = event.kind();
        match event {
            ConnectorEvent::ResponseReceived { body, .. } => {
                tracing::debug!(kind = %kind, bytes = body.len(), "response delivered");
            }
            ConnectorEvent::RequestFailed { status, .. } => {
                tracing::debug!(kind = %kind, ?status, "request failure delivered");
            }
        }
    });

    let lines = spawn_line_reader();
    let mut session = Session::new(connector, io::stdout(), out_dir);
    session.greet()?;
    if let Some(path) = &files.tips {
        session.show_tip(path, tip_seed())?;
    }
    if let Some(path) = &files.catalog {
        session.load_catalog(path)?;
    }
    session.prompt()?;
    loop {
        while let Some(done) = session.dispatcher.poll() {
            session.apply(done)?;
            session.prompt()?;
        }
        match lines.recv_timeout(INPUT_POLL_INTERVAL) {
            Ok(line) => {
                if !session.handle_line(&line)? {
                    break;
                }
                session.prompt()?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

fn tip_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos() as u64 ^ elapsed.as_secs())
        .unwrap_or_default()
}

fn spawn_line_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut handle = stdin.lock();
        let mut line = String::new();
        loop {
            line.clear();
            match handle.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(trimmed).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
    });
    rx
}

struct Session<T: Transport + 'static, W: Write> {
    connector: Arc<ArduinoConnector<T>>,
    dispatcher: Dispatcher<Outcome>,
    out: W,
    out_dir: PathBuf,
    view: View,
    inventory: Inventory,
    scan_results: Vec<Component>,
    projects: Vec<Project>,
    current_project: Option<usize>,
    selected: Option<SelectedProject>,
    selected_components: String,
    cursor: Option<StepCursor>,
    inventory_pager: Pager,
    scan_pager: Pager,
    manual_pager: Pager,
    components_pager: Pager,
}

impl<T: Transport + 'static, W: Write> Session<T, W> {
    fn new(connector: Arc<ArduinoConnector<T>>, out: W, out_dir: PathBuf) -> Self {
        Self {
            connector,
            dispatcher: Dispatcher::new(),
            out,
            out_dir,
            view: View::Inventory,
            inventory: Inventory::seeded(),
            scan_results: Vec::new(),
            projects: Vec::new(),
            current_project: None,
            selected: None,
            selected_components: String::new(),
            cursor: None,
            inventory_pager: Pager::new(INVENTORY_PAGE_SIZE),
            scan_pager: Pager::new(SCAN_RESULTS_PAGE_SIZE),
            manual_pager: Pager::new(MANUAL_SELECTION_PAGE_SIZE),
            components_pager: Pager::new(PROJECT_COMPONENTS_PAGE_SIZE),
        }
    }

    fn greet(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "ARduino Lab session ({}). Type /help for commands.",
            self.connector.vision_model()
        )?;
        Ok(())
    }

    /// A missing or malformed tips file is only logged.
    fn show_tip(&mut self, path: &Path, seed: u64) -> Result<()> {
        let tips = match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(parse_tips(&content)?))
        {
            Ok(tips) => tips,
            Err(err) => {
                tracing::warn!(path = %path.display(), "tips skipped: {err:#}");
                return Ok(());
            }
        };
        if let Some(tip) = pick_tip(&tips, seed) {
            writeln!(self.out, "{}", tip.banner())?;
        }
        Ok(())
    }

    /// Offers the bundled project ideas without asking the model.
    fn load_catalog(&mut self, path: &Path) -> Result<()> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                writeln!(self.out, "{} not found.", path.display())?;
                return Ok(());
            }
            Err(err) => {
                writeln!(self.out, "Cannot read {}: {err}", path.display())?;
                return Ok(());
            }
        };
        match parse_catalog(&content) {
            Ok(Parsed::NoResults) => writeln!(self.out, "No project files found.")?,
            Ok(Parsed::Items(projects)) => {
                tracing::info!(path = %path.display(), count = projects.len(), "project catalogue loaded");
                self.projects = projects;
                self.current_project = None;
                self.view = View::Projects;
                self.show()?;
            }
            Err(err) => writeln!(self.out, "{} is not a valid catalogue: {err}", path.display())?,
        }
        Ok(())
    }

    fn prompt(&mut self) -> Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()?;
        Ok(())
    }

    /// Returns `false` when the session should end.
    fn handle_line(&mut self, line: &str) -> Result<bool> {
        match parse_command(line) {
            SessionCommand::Noop => {}
            SessionCommand::Scan { path } => self.start_scan(PathBuf::from(path))?,
            SessionCommand::KeepScan => self.keep_scan()?,
            SessionCommand::Add { item, quantity } => {
                self.inventory.add(item, quantity);
                writeln!(self.out, "{}: {}", item, self.inventory.quantity(item))?;
            }
            SessionCommand::Remove { item, quantity } => {
                let left = self.inventory.remove(item, quantity);
                writeln!(self.out, "{item}: {left}")?;
            }
            SessionCommand::Inventory => {
                self.view = View::Inventory;
                self.inventory_pager.reset();
                self.show()?;
            }
            SessionCommand::Manual => {
                self.view = View::Manual;
                self.manual_pager.reset();
                self.show()?;
            }
            SessionCommand::NextPage => self.turn_page(true)?,
            SessionCommand::PreviousPage => self.turn_page(false)?,
            SessionCommand::Reset => self.reset()?,
            SessionCommand::Suggest => self.start_suggest()?,
            SessionCommand::ViewProject { index } => self.view_project(index)?,
            SessionCommand::Select => self.select_project()?,
            SessionCommand::Instructions => self.start_instructions()?,
            SessionCommand::Step(direction) => self.step(direction)?,
            SessionCommand::ToggleCode => {
                if let Some(cursor) = self.cursor.as_mut() {
                    cursor.toggle_code();
                    self.view = View::Instructions;
                    self.show()?;
                } else {
                    writeln!(self.out, "No instructions loaded.")?;
                }
            }
            SessionCommand::Illustrate => self.start_illustration()?,
            SessionCommand::SetModel { model } => match crate::resolve_vision_model(&model) {
                Ok(model) => {
                    self.connector.set_vision_model(model);
                    writeln!(self.out, "Vision model set to {model}")?;
                }
                Err(err) => writeln!(self.out, "{err:#}")?,
            },
            SessionCommand::Help => {
                writeln!(self.out, "Commands: {}", SESSION_HELP_COMMANDS.join(" "))?;
            }
            SessionCommand::Quit => return Ok(false),
            SessionCommand::Invalid { message } => writeln!(self.out, "{message}")?,
            SessionCommand::Unknown { command, .. } if command.is_empty() => {
                writeln!(self.out, "Commands start with '/'. Type /help.")?;
            }
            SessionCommand::Unknown { command, .. } => {
                writeln!(self.out, "Unknown command /{command}. Type /help.")?;
            }
        }
        Ok(true)
    }

    fn start_scan(&mut self, path: PathBuf) -> Result<()> {
        let image = match ImageAttachment::from_path(&path) {
            Ok(image) => image,
            Err(err) => {
                writeln!(self.out, "Cannot use {}: {err}", path.display())?;
                return Ok(());
            }
        };
        let connector = Arc::clone(&self.connector);
        self.dispatcher.submit(SCAN_SCREEN, move || {
            connector.analyze_components(&image).map(Outcome::Components)
        });
        writeln!(self.out, "Scanning {}...", path.display())?;
        Ok(())
    }

    fn keep_scan(&mut self) -> Result<()> {
        if self.scan_results.is_empty() {
            writeln!(self.out, "No scan results to keep.")?;
            return Ok(());
        }
        self.inventory.merge(&self.scan_results);
        self.scan_results.clear();
        self.view = View::Inventory;
        self.inventory_pager.reset();
        self.show()
    }

    fn start_suggest(&mut self) -> Result<()> {
        if !self.inventory.can_suggest_projects() {
            writeln!(
                self.out,
                "Add at least 3 different components before asking for projects ({} so far).",
                self.inventory.distinct_kinds()
            )?;
            return Ok(());
        }
        let compound = self.inventory.compound_string();
        let connector = Arc::clone(&self.connector);
        self.dispatcher.submit(PROJECTS_SCREEN, move || {
            connector.generate_projects(&compound).map(Outcome::Projects)
        });
        writeln!(self.out, "Generating project ideas...")?;
        Ok(())
    }

    fn view_project(&mut self, index: usize) -> Result<()> {
        if index >= self.projects.len() {
            writeln!(self.out, "No project {}.", index + 1)?;
            return Ok(());
        }
        self.current_project = Some(index);
        self.view = View::Project;
        self.components_pager.reset();
        self.show()
    }

    fn select_project(&mut self) -> Result<()> {
        let Some(project) = self.current_project.and_then(|index| self.projects.get(index)) else {
            writeln!(self.out, "View a project with /project <n> first.")?;
            return Ok(());
        };
        let selected = SelectedProject::from(project);
        self.selected_components = project.components_text();
        self.inventory = Inventory::from_project(project);
        writeln!(
            self.out,
            "Selected \"{}\". Type /instructions to build it.",
            selected.title
        )?;
        self.selected = Some(selected);
        Ok(())
    }

    fn start_instructions(&mut self) -> Result<()> {
        let Some(selected) = self.selected.clone() else {
            writeln!(self.out, "Select a project first.")?;
            return Ok(());
        };
        let components = self.selected_components.clone();
        let connector = Arc::clone(&self.connector);
        self.dispatcher.submit(INSTRUCTIONS_SCREEN, move || {
            connector
                .generate_instructions(&selected.title, &selected.description, &components)
                .map(Outcome::Instructions)
        });
        writeln!(self.out, "Writing the build guide...")?;
        Ok(())
    }

    fn step(&mut self, direction: StepDirection) -> Result<()> {
        let Some(cursor) = self.cursor.as_mut() else {
            writeln!(self.out, "No instructions loaded.")?;
            return Ok(());
        };
        let moved = match direction {
            StepDirection::Next => cursor.next(),
            StepDirection::Previous => cursor.previous(),
        };
        if !moved {
            writeln!(self.out, "Already at {}.", cursor.label())?;
            return Ok(());
        }
        self.view = View::Instructions;
        self.show()
    }

    fn start_illustration(&mut self) -> Result<()> {
        let Some(cursor) = self.cursor.as_ref() else {
            writeln!(self.out, "No instructions loaded.")?;
            return Ok(());
        };
        let prompt = cursor.current().image_prompt.clone();
        if prompt.trim().is_empty() {
            writeln!(self.out, "This step has no illustration prompt.")?;
            return Ok(());
        }
        let step = cursor.index();
        let connector = Arc::clone(&self.connector);
        self.dispatcher.submit(ILLUSTRATION_SCREEN, move || {
            connector
                .generate_image(&prompt)
                .map(|image| Outcome::Illustration { step, image })
        });
        writeln!(self.out, "Drawing step {}...", step + 1)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        for screen in [
            SCAN_SCREEN,
            PROJECTS_SCREEN,
            INSTRUCTIONS_SCREEN,
            ILLUSTRATION_SCREEN,
        ] {
            self.dispatcher.cancel(screen);
        }
        self.inventory.reset();
        self.scan_results.clear();
        self.projects.clear();
        self.current_project = None;
        self.selected = None;
        self.selected_components.clear();
        self.cursor = None;
        self.view = View::Inventory;
        self.inventory_pager.reset();
        writeln!(self.out, "Session reset.")?;
        Ok(())
    }

    fn apply(&mut self, done: Completed<Outcome>) -> Result<()> {
        let outcome = match done.result {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(screen = %done.screen, "{err}");
                writeln!(self.out, "\n{} request failed: {err}", done.screen)?;
                return Ok(());
            }
        };
        match outcome {
            Outcome::Components(Parsed::NoResults) => {
                writeln!(self.out, "\nNo components detected.")?;
            }
            Outcome::Components(Parsed::Items(components)) => {
                self.scan_results = components;
                self.scan_pager.reset();
                self.view = View::ScanResults;
                writeln!(self.out)?;
                self.show()?;
            }
            Outcome::Projects(Parsed::NoResults) => {
                writeln!(self.out, "\nNo projects suggested. Try adding more components.")?;
            }
            Outcome::Projects(Parsed::Items(projects)) => {
                self.projects = projects;
                self.current_project = None;
                self.view = View::Projects;
                writeln!(self.out)?;
                self.show()?;
            }
            Outcome::Instructions(parsed) => match StepCursor::new(parsed.into_vec()) {
                Some(cursor) => {
                    self.cursor = Some(cursor);
                    self.view = View::Instructions;
                    writeln!(self.out)?;
                    self.show()?;
                }
                None => writeln!(self.out, "\nNo instructions returned.")?,
            },
            Outcome::Illustration { step, image } => {
                let path = self
                    .out_dir
                    .join(format!("step-{:02}.{}", step + 1, image.extension()));
                match image.save(&path) {
                    Ok(()) => writeln!(self.out, "\nSaved illustration to {}", path.display())?,
                    Err(err) => writeln!(self.out, "\nCould not save illustration: {err}")?,
                }
            }
        }
        Ok(())
    }

    fn turn_page(&mut self, forward: bool) -> Result<()> {
        if self.view == View::Instructions {
            let direction = if forward {
                StepDirection::Next
            } else {
                StepDirection::Previous
            };
            return self.step(direction);
        }
        let total = self.list_len();
        let pager = match self.view {
            View::Inventory => &mut self.inventory_pager,
            View::ScanResults => &mut self.scan_pager,
            View::Manual => &mut self.manual_pager,
            View::Project => &mut self.components_pager,
            View::Projects | View::Instructions => {
                writeln!(self.out, "Nothing to page here.")?;
                return Ok(());
            }
        };
        let moved = if forward {
            pager.next(total)
        } else {
            pager.previous()
        };
        if !moved {
            writeln!(self.out, "No more pages.")?;
            return Ok(());
        }
        self.show()
    }

    fn list_len(&self) -> usize {
        match self.view {
            View::Inventory => self.inventory.distinct_kinds(),
            View::ScanResults => self.scan_results.len(),
            View::Manual => self.inventory.components().len(),
            View::Project => self
                .current_project
                .and_then(|index| self.projects.get(index))
                .map(|project| project.components.len())
                .unwrap_or(0),
            View::Projects => self.projects.len(),
            View::Instructions => self.cursor.as_ref().map(StepCursor::len).unwrap_or(0),
        }
    }

    fn show(&mut self) -> Result<()> {
        match self.view {
            View::Inventory => {
                let rows = self.inventory.non_zero();
                if rows.is_empty() {
                    writeln!(self.out, "Inventory is empty. Use /scan <image> or /manual.")?;
                    return Ok(());
                }
                writeln!(self.out, "Inventory:")?;
                write_page(&mut self.out, &self.inventory_pager, &rows)?;
                if self.inventory.can_suggest_projects() {
                    writeln!(self.out, "Type /suggest for project ideas.")?;
                }
            }
            View::ScanResults => {
                writeln!(self.out, "Detected:")?;
                write_page(&mut self.out, &self.scan_pager, &self.scan_results)?;
                writeln!(self.out, "Type /keep to add these to your inventory.")?;
            }
            View::Manual => {
                writeln!(self.out, "Manual selection (/add <item> [n], /remove <item> [n]):")?;
                write_page(
                    &mut self.out,
                    &self.manual_pager,
                    self.inventory.components(),
                )?;
            }
            View::Projects => {
                for (index, project) in self.projects.iter().enumerate() {
                    writeln!(self.out, "{}", render::project_block(index, project))?;
                }
                writeln!(self.out, "Type /project <n> to look closer.")?;
            }
            View::Project => {
                let Some(project) = self.current_project.and_then(|index| self.projects.get(index))
                else {
                    return Ok(());
                };
                writeln!(self.out, "{}\n{}", project.title, project.description)?;
                write_page(&mut self.out, &self.components_pager, &project.components)?;
                writeln!(self.out, "Type /select to build this project.")?;
            }
            View::Instructions => {
                let Some(cursor) = self.cursor.as_ref() else {
                    return Ok(());
                };
                let block = render::step_block(
                    &cursor.label(),
                    cursor.current(),
                    cursor.code_expanded(),
                );
                write!(self.out, "{block}")?;
            }
        }
        Ok(())
    }
}

fn write_page(out: &mut impl Write, pager: &Pager, rows: &[Component]) -> Result<()> {
    for component in pager.slice(rows) {
        writeln!(out, "{}", render::component_line(component))?;
    }
    if pager.shows_controls(rows.len()) {
        writeln!(out, "{} (/next, /prev)", pager.label(rows.len()))?;
    }
    Ok(())
}
