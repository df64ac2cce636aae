//! ccli-demo - a small shell built on the ccli line editor
//!
//! Usage:
//!   ccli-demo                       # Default prompt, history tagged "ccli-demo"
//!   ccli-demo --tag work            # Keep a separate history
//!   ccli-demo --log /tmp/demo.log   # Write diagnostics (RUST_LOG filters)
//!
//! Commands:
//!   echo [words...]                 # Print the words
//!   history [n]                     # List history, or show the line n back
//!   alias [name[=value] ...]        # List, show or define aliases
//!   unalias name...                 # Remove aliases
//!   show {commands|history|aliases}
//!   exit

mod commands;

use anyhow::{Context, Result};
use ccli::{Config, FdConsole, Session};
use clap::Parser as ClapParser;
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(ClapParser)]
#[command(name = "ccli-demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interactive demo shell built on the ccli line editor", long_about = None)]
struct Args {
    /// Prompt shown before each line
    #[arg(long)]
    prompt: Option<String>,

    /// Number of history lines kept
    #[arg(long)]
    history_max: Option<usize>,

    /// Cache section the history and aliases are saved under
    #[arg(long)]
    tag: Option<String>,

    /// Don't load or save history and aliases
    #[arg(long)]
    no_persist: bool,

    /// TOML file with default settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append diagnostics to this file
    #[arg(long)]
    log: Option<PathBuf>,
}

/// Settings read from `--config`. Command line flags win.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    prompt: Option<String>,
    tag: Option<String>,
    history_max: Option<usize>,
    page_scroll: Option<usize>,
    continuation_prompt: Option<String>,
    command_delimiter: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    fn to_config(&self) -> Config {
        let mut config = Config::new();
        if let Some(max) = self.history_max {
            config = config.with_history_max(max);
        }
        if let Some(lines) = self.page_scroll {
            config = config.with_page_scroll(lines);
        }
        if let Some(prompt) = &self.continuation_prompt {
            config = config.with_continuation_prompt(prompt.as_str());
        }
        if let Some(delimiter) = &self.command_delimiter {
            config = config.with_command_delimiter(delimiter.as_str());
        }
        config
    }
}

const DEFAULT_PROMPT: &str = "ccli> ";
const DEFAULT_TAG: &str = "ccli-demo";

/// Log to `path`. The terminal is in raw mode, so nothing goes to stderr.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log {}", path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ccli=info,ccli_demo=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log {
        init_logging(path)?;
    }

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let mut config = file.to_config();
    if let Some(max) = args.history_max {
        config = config.with_history_max(max);
    }
    let prompt = args
        .prompt
        .clone()
        .or_else(|| file.prompt.clone())
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let tag = args
        .tag
        .clone()
        .or_else(|| file.tag.clone())
        .unwrap_or_else(|| DEFAULT_TAG.to_string());

    let console = FdConsole::stdio().context("setting up the terminal")?;
    let mut session = Session::with_config(console, &prompt, config)?;
    commands::register(&mut session)?;

    if !args.no_persist {
        if let Err(e) = session.history_load(&tag) {
            tracing::warn!("could not load history: {e}");
        }
        if let Err(e) = session.alias_load(&tag) {
            tracing::warn!("could not load aliases: {e}");
        }
    }

    tracing::info!(prompt = prompt.as_str(), tag = tag.as_str(), "starting");
    session.run()?;

    if !args.no_persist {
        session.history_save(&tag).context("saving history")?;
        session.alias_save(&tag).context("saving aliases")?;
    }
    Ok(())
}
