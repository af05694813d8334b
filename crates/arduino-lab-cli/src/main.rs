mod logging;
mod render;
mod session;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arduino_lab_contracts::models::{ModelSelector, VisionModel};
use arduino_lab_contracts::{Inventory, Parsed};
use arduino_lab_engine::config::{parse_timeout, resolve_image_model};
use arduino_lab_engine::{ArduinoConnector, EngineConfig, ImageAttachment};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "arduino-lab", version, about = "ARduino Lab assistant")]
struct Cli {
    /// Debug logging for the workspace crates.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// chatgpt-4o-latest or gpt-4.1-mini.
    #[arg(long, global = true)]
    model: Option<String>,
    /// Model for step illustrations.
    #[arg(long, global = true)]
    image_model: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<String>,
    /// Append request events to this JSONL file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    /// Write a receipt per request into this directory.
    #[arg(long, global = true)]
    receipts: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detect components in a photo.
    Scan(ScanArgs),
    /// Suggest projects for a set of components.
    Projects(ProjectsArgs),
    /// Generate a step-by-step build guide.
    Instructions(InstructionsArgs),
    /// Generate an illustration for a step.
    Image(ImageArgs),
    /// Interactive lab session.
    Session(SessionArgs),
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(long)]
    image: PathBuf,
}

#[derive(Debug, Args)]
struct InventoryInput {
    /// `<id> x<qty>` entries, e.g. `--components "led x3" "arduino x1"`.
    #[arg(long, num_args = 1.., conflicts_with = "inventory_file")]
    components: Vec<String>,
    /// File with one `<id> x<qty>` entry per line.
    #[arg(long)]
    inventory_file: Option<PathBuf>,
}

impl InventoryInput {
    fn load(&self) -> Result<Inventory> {
        let text = match &self.inventory_file {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            None => self.components.join("\n"),
        };
        let inventory = Inventory::from_compound_string(&text)?;
        if inventory.distinct_kinds() == 0 {
            bail!("no components given (use --components or --inventory-file)");
        }
        Ok(inventory)
    }
}

#[derive(Debug, Args)]
struct ProjectsArgs {
    #[command(flatten)]
    input: InventoryInput,
}

#[derive(Debug, Args)]
struct InstructionsArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[command(flatten)]
    input: InventoryInput,
}

#[derive(Debug, Args)]
struct ImageArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Where step illustrations are saved.
    #[arg(long, default_value = "arduino-lab-out")]
    out: PathBuf,
    /// Project ideas to browse before asking the model (`projects.json`).
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Friendly tips shown at start-up (`tips.json`).
    #[arg(long)]
    tips: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("arduino-lab error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);
    let config = engine_config(&cli)?;
    tracing::debug!(?config, "configuration resolved");
    let connector = ArduinoConnector::from_config(config)?;

    match cli.command {
        Command::Scan(args) => run_scan(&connector, args),
        Command::Projects(args) => run_projects(&connector, args),
        Command::Instructions(args) => run_instructions(&connector, args),
        Command::Image(args) => run_image(&connector, args),
        Command::Session(args) => {
            let files = session::SessionFiles {
                catalog: args.catalog,
                tips: args.tips,
            };
            session::run_session(Arc::new(connector), args.out, files)?;
            Ok(0)
        }
    }
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env()?;
    if let Some(api_base) = &cli.api_base {
        config = config.with_api_base(api_base.clone());
    }
    if let Some(model) = cli.model.as_deref() {
        config = config.with_vision_model(resolve_vision_model(model)?);
    }
    if let Some(model) = cli.image_model.as_deref() {
        config = config.with_image_model(resolve_image_model(model)?);
    }
    if let Some(raw) = cli.timeout.as_deref() {
        config = config.with_timeout(Some(parse_timeout(raw)?));
    }
    if cli.events.is_some() {
        config = config.with_events_path(cli.events.clone());
    }
    if cli.receipts.is_some() {
        config = config.with_receipts_dir(cli.receipts.clone());
    }
    Ok(config)
}

/// Unknown names fall back to the default vision model with a warning.
pub(crate) fn resolve_vision_model(requested: &str) -> Result<VisionModel> {
    let canonical = requested
        .parse::<VisionModel>()
        .map(|model| model.as_str().to_string())
        .unwrap_or_else(|_| requested.to_string());
    let selection = ModelSelector::new(None)
        .select_vision(Some(&canonical))
        .map_err(anyhow::Error::msg)?;
    if selection.is_fallback() {
        if let Some(reason) = &selection.fallback_reason {
            tracing::warn!(model = %selection.model.name, "{reason}");
        }
    }
    selection
        .model
        .name
        .parse::<VisionModel>()
        .map_err(anyhow::Error::msg)
}

fn run_scan(connector: &ArduinoConnector, args: ScanArgs) -> Result<i32> {
    let image = ImageAttachment::from_path(&args.image)
        .with_context(|| format!("failed to prepare {}", args.image.display()))?;
    match connector.analyze_components(&image)? {
        Parsed::NoResults => {
            println!("No components detected.");
            Ok(2)
        }
        Parsed::Items(components) => {
            for component in &components {
                println!("{}", render::component_line(component));
            }
            Ok(0)
        }
    }
}

fn run_projects(connector: &ArduinoConnector, args: ProjectsArgs) -> Result<i32> {
    let inventory = args.input.load()?;
    if !inventory.can_suggest_projects() {
        bail!(
            "project suggestions need at least 3 different components, got {}",
            inventory.distinct_kinds()
        );
    }
    match connector.generate_projects(&inventory.compound_string())? {
        Parsed::NoResults => {
            println!("No projects suggested.");
            Ok(2)
        }
        Parsed::Items(projects) => {
            for (index, project) in projects.iter().enumerate() {
                println!("{}", render::project_block(index, project));
            }
            Ok(0)
        }
    }
}

fn run_instructions(connector: &ArduinoConnector, args: InstructionsArgs) -> Result<i32> {
    let inventory = args.input.load()?;
    let steps = connector
        .generate_instructions(&args.title, &args.description, &inventory.compound_string())?
        .into_vec();
    if steps.is_empty() {
        println!("No instructions returned.");
        return Ok(2);
    }
    for (index, step) in steps.iter().enumerate() {
        let label = format!("Step {} of {}", index + 1, steps.len());
        println!("{}", render::step_block(&label, step, true));
    }
    Ok(0)
}

fn run_image(connector: &ArduinoConnector, args: ImageArgs) -> Result<i32> {
    let image = connector.generate_image(&args.prompt)?;
    image
        .save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    println!(
        "Saved {} ({}, {} bytes)",
        args.out.display(),
        image.mime_type,
        image.bytes.len()
    );
    Ok(0)
}
