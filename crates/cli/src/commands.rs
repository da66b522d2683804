// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand handlers.

use crate::App;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use gantry_core::{Event, Verbosity};
use gantry_engine::{load_heartbeats, HeartbeatRunner, InterventionAction};
use gantry_skill::SkillLoader;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Create a session anchored at the current directory and focus it
    New {
        /// Human title for listings
        #[arg(default_value = "untitled")]
        title: String,
    },
    /// List sessions, newest first
    List {
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
        /// Include ephemeral (heartbeat) sessions
        #[arg(long)]
        all: bool,
    },
    /// Focus an existing session for this CLI instance
    Focus { id: Uuid },
    /// Archive a session
    Archive { id: Uuid },
    /// Set how much of the event stream this instance prints
    Verbosity {
        /// One of low, medium, high
        level: String,
    },
}

pub async fn session(app: &App, cmd: SessionCommand) -> Result<()> {
    match cmd {
        SessionCommand::New { title } => {
            let cwd = std::env::current_dir().context("resolving current directory")?;
            let session = app
                .store
                .create(cwd, title, &app.config.default_agent)?;
            app.registry.set(&app.instance_id, session.id)?;
            println!("{}", session.id);
            Ok(())
        }
        SessionCommand::List {
            page,
            page_size,
            all,
        } => {
            let (entries, total) = app.store.list(page, page_size, all)?;
            for entry in &entries {
                println!(
                    "{}  {}  {}  {}",
                    entry.id,
                    entry.last_updated.format("%Y-%m-%d %H:%M"),
                    entry.cwd.display(),
                    entry.title
                );
            }
            println!("{} of {} session(s)", entries.len(), total);
            Ok(())
        }
        SessionCommand::Focus { id } => {
            // Fail early if the session does not exist.
            app.store.load(id)?;
            app.registry.set(&app.instance_id, id)?;
            println!("focused {}", id);
            Ok(())
        }
        SessionCommand::Archive { id } => {
            app.store.archive(id)?;
            println!("archived {}", id);
            Ok(())
        }
        SessionCommand::Verbosity { level } => {
            let level = match level.to_ascii_lowercase().as_str() {
                "low" => Verbosity::Low,
                "medium" => Verbosity::Medium,
                "high" => Verbosity::High,
                other => bail!("unknown verbosity: {}", other),
            };
            app.registry.set_verbosity(&app.instance_id, level)?;
            println!("verbosity {}", level);
            Ok(())
        }
    }
}

pub async fn run_skill(app: &App, skill_name: &str) -> Result<()> {
    let session_id = app.focused_session()?;
    let loader = SkillLoader::new(&app.config.root);
    let skill = loader.load(skill_name)?;

    // Interventions are delivered in-process, so the run command itself
    // asks the user how to proceed whenever the engine blocks.
    let mut sub = app.bus.subscribe();
    let engine = app.engine.clone();
    let run = tokio::spawn(async move { engine.run(&skill, session_id).await });

    while !run.is_finished() {
        match tokio::time::timeout(Duration::from_millis(100), sub.recv()).await {
            Ok(Some(Event::TaskBlocked {
                session_id: blocked,
                node,
                feedback,
            })) if blocked == session_id => {
                eprintln!("blocked at '{}':\n{}", node, feedback);
                let action = ask_intervention().await?;
                deliver_intervention(app, session_id, action).await?;
            }
            Ok(Some(_)) | Err(_) => {}
            Ok(None) => break,
        }
    }
    let status = run.await??;
    println!("{}", status);
    Ok(())
}

/// Read an intervention decision from stdin.
async fn ask_intervention() -> Result<InterventionAction> {
    loop {
        eprint!("[retry / proceed-to-fail / abort] > ");
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await??;
        if line.is_empty() {
            // EOF on stdin (non-interactive invocation): abort the run.
            return Ok(InterventionAction::Abort);
        }
        match line.trim().parse() {
            Ok(action) => return Ok(action),
            Err(message) => eprintln!("{}", message),
        }
    }
}

/// Deliver a resolution, retrying briefly: the engine publishes the
/// blocked event just before it registers its waiter.
async fn deliver_intervention(
    app: &App,
    session_id: Uuid,
    action: InterventionAction,
) -> Result<()> {
    for _ in 0..100 {
        if app.engine.resolve_intervention(session_id, action) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("session {} stopped waiting for intervention", session_id);
}

pub async fn prompt(app: &App, text: &str) -> Result<()> {
    let session_id = app.focused_session()?;
    let reply = app.engine.execute_prompt(session_id, text).await?;
    println!("{}", reply);
    Ok(())
}

pub async fn exec(app: &App, command: &str) -> Result<()> {
    let session_id = app.focused_session()?;
    let out = app.engine.execute_command(session_id, command).await?;
    print!("{}", out.output);
    if !out.success() {
        bail!("command exited {}", out.exit_code);
    }
    Ok(())
}

pub fn skills(app: &App) -> Result<()> {
    for name in SkillLoader::new(&app.config.root).list() {
        println!("{}", name);
    }
    Ok(())
}

pub async fn heartbeat(app: &App, once: bool) -> Result<()> {
    let defs = load_heartbeats(&app.config.heartbeats_dir());
    if defs.is_empty() {
        println!("no heartbeat definitions");
        return Ok(());
    }
    let runner = HeartbeatRunner::new(
        app.engine.clone(),
        SkillLoader::new(&app.config.root),
        app.config.default_agent.clone(),
        defs,
    );
    if once {
        let fired = runner.run_due(Instant::now()).await;
        println!("{} heartbeat(s) fired", fired);
        return Ok(());
    }
    runner.run_loop(Duration::from_secs(30)).await;
    Ok(())
}

pub fn log(app: &App, lines: usize) -> Result<()> {
    let session_id = app.focused_session()?;
    let session = app.store.load(session_id)?;
    for entry in app.store.last_audit(&session, lines)? {
        let exit = entry
            .exit_code
            .map(|c| format!(" [exit {}]", c))
            .unwrap_or_default();
        println!(
            "{}  {:18}  {}{}  {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.kind.to_string(),
            entry.source,
            exit,
            entry.content.replace('\n', "\\n")
        );
    }
    Ok(())
}
