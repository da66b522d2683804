// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gantry`: thin command-line adapter over the skill engine.
//!
//! Rendering here is deliberately plain line output; richer surfaces
//! (REPL drawers, chat bots) are separate frontends speaking to the same
//! store and engine.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gantry_bus::EventBus;
use gantry_core::Config;
use gantry_drivers::{ClaudeDriver, DriverRegistry};
use gantry_engine::Engine;
use gantry_store::{Registry, SessionStore};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "gantry", about = "Drive coding-agent subprocesses through skill graphs")]
struct Cli {
    /// Act on this session instead of the focused one
    #[arg(long, global = true)]
    session: Option<Uuid>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage sessions
    #[command(subcommand)]
    Session(commands::SessionCommand),
    /// Run a skill to completion against the focused session
    Run {
        /// Skill name under the skills directory
        skill: String,
    },
    /// Send a single prompt to the focused session's agent
    Prompt { text: String },
    /// Run a shell command; its output feeds the next prompt
    Exec { command: String },
    /// List enabled skills
    Skills,
    /// Run heartbeat definitions (once, or on a loop)
    Heartbeat {
        /// Run the due heartbeats once and exit
        #[arg(long)]
        once: bool,
    },
    /// Show the tail of the focused session's audit log
    Log {
        #[arg(short = 'n', long, default_value_t = 20)]
        lines: usize,
    },
}

/// Shared wiring for every subcommand.
pub(crate) struct App {
    pub config: Config,
    pub store: SessionStore,
    pub bus: EventBus,
    pub registry: Registry,
    pub engine: Engine,
    pub instance_id: String,
    pub session_override: Option<Uuid>,
}

impl App {
    fn new(config: Config, session_override: Option<Uuid>) -> Result<Self> {
        let bus = EventBus::new();
        let store = SessionStore::new(&config.root, bus.clone());
        let registry = Registry::new(&config.root);
        registry.sync()?;

        let drivers = DriverRegistry::new();
        register_drivers(&drivers, &config);

        let engine = Engine::new(store.clone(), bus.clone(), drivers, config.default_max_loops);
        let instance_id = std::env::var("GANTRY_INSTANCE")
            .unwrap_or_else(|_| format!("cli-{}", std::process::id()));

        Ok(Self {
            config,
            store,
            bus,
            registry,
            engine,
            instance_id,
            session_override,
        })
    }

    /// The session this invocation acts on: the `--session` flag, the
    /// instance's registry focus, or the most recent session.
    pub fn focused_session(&self) -> Result<Uuid> {
        if let Some(id) = self.session_override {
            return Ok(id);
        }
        if let Some(id) = self.registry.get(&self.instance_id).session_id {
            return Ok(id);
        }
        let latest = self
            .store
            .latest()?
            .context("no sessions exist yet; create one with `gantry session new`")?;
        Ok(latest.id)
    }
}

/// Drivers available to sessions. An explicit registration per backend,
/// done once at startup.
fn register_drivers(drivers: &DriverRegistry, config: &Config) {
    let log_path = config.agent_log_path();
    let (bin, tier_models) = match config.backend("claude") {
        Some(backend) => (backend.bin.clone(), backend.tier_models.clone()),
        None => ("claude".to_string(), HashMap::new()),
    };
    drivers.register(std::sync::Arc::new(ClaudeDriver::new(
        bin,
        tier_models,
        log_path,
    )));
}

fn init_tracing(config: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let file = tracing_appender::rolling::never(
        config.root.clone(),
        "gantry-cli.log",
    );
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    std::fs::create_dir_all(&config.root)
        .with_context(|| format!("creating storage root {}", config.root.display()))?;
    let _guard = init_tracing(&config);
    let app = App::new(config, cli.session)?;

    match cli.command {
        Command::Session(cmd) => commands::session(&app, cmd).await,
        Command::Run { skill } => commands::run_skill(&app, &skill).await,
        Command::Prompt { text } => commands::prompt(&app, &text).await,
        Command::Exec { command } => commands::exec(&app, &command).await,
        Command::Skills => commands::skills(&app),
        Command::Heartbeat { once } => commands::heartbeat(&app, once).await,
        Command::Log { lines } => commands::log(&app, lines),
    }
}
