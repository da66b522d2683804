// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill-graph interpreter.
//!
//! A run walks the session's active node through the graph: action-loop
//! states issue an LLM turn and verify it with a shell command, tool
//! states run a command directly, end states complete the run. Failures
//! are converted into feedback for the next attempt and counted against
//! the state's retry budget and the skill-wide loop budget; exhausting
//! either parks the session in `intervention_required` until a human
//! resolves it. Every mutation is persisted and every observable step is
//! appended to the session's audit log.

use crate::cot::{CotParser, Segment};
use crate::intervention::{InterventionAction, InterventionHub};
use crate::prompt::{build_prompt, merge_feedback, RESUME_SENTINEL};
use crate::running::RunningSet;
use crate::EngineError;
use gantry_bus::EventBus;
use gantry_core::{
    ApprovalMode, AuditEntry, AuditKind, AuditRole, Event, ModelTier, Session, SessionStatus,
};
use gantry_drivers::{DriverEvent, DriverRegistry, RunOptions};
use gantry_shell::{ShellExecutor, ShellOutput};
use gantry_skill::{render, SkillGraph, StateDef, StateType, DEFAULT_FAIL_PROMPT};
use gantry_store::SessionStore;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// The Skill Engine. Cheap to clone per interface adapter.
#[derive(Clone)]
pub struct Engine {
    store: SessionStore,
    bus: EventBus,
    drivers: DriverRegistry,
    default_max_loops: u32,
    running: RunningSet,
    interventions: InterventionHub,
}

impl Engine {
    pub fn new(
        store: SessionStore,
        bus: EventBus,
        drivers: DriverRegistry,
        default_max_loops: u32,
    ) -> Self {
        Self {
            store,
            bus,
            drivers,
            default_max_loops,
            running: RunningSet::new(),
            interventions: InterventionHub::new(),
        }
    }

    /// Execute a skill against a session until it completes, fails, or
    /// the caller-side driver context is cancelled.
    ///
    /// A no-op returning the current status if the session already has a
    /// run in flight.
    pub async fn run(
        &self,
        skill: &SkillGraph,
        session_id: Uuid,
    ) -> Result<SessionStatus, EngineError> {
        let Some(_guard) = self.running.try_acquire(session_id) else {
            tracing::debug!(%session_id, "run already in flight, ignoring");
            return Ok(SessionStatus::Running);
        };

        let mut session = self.store.load(session_id)?;
        self.initialize_run(&mut session, skill)?;

        while matches!(
            session.status,
            SessionStatus::Running | SessionStatus::InterventionRequired
        ) {
            let node_name = session.active_node.clone().unwrap_or_default();
            let Some(state) = skill.state(&node_name).cloned() else {
                self.set_status(
                    &mut session,
                    SessionStatus::Failed,
                    format!("failed: unknown state '{}'", node_name),
                )?;
                self.store.save(&mut session)?;
                break;
            };

            if state.state_type == StateType::End {
                self.set_status(&mut session, SessionStatus::Completed, "completed")?;
                self.store.save(&mut session)?;
                break;
            }

            if session.status == SessionStatus::InterventionRequired {
                self.await_intervention(&mut session, &node_name, &state).await?;
                continue;
            }

            match state.state_type {
                StateType::ActionLoop => {
                    self.run_action_state(&mut session, skill, &node_name, &state)
                        .await?
                }
                StateType::Tool => self.run_tool_state(&mut session, &state).await?,
                StateType::End => {}
            }
        }
        Ok(session.status)
    }

    /// One conversational turn outside any skill.
    pub async fn execute_prompt(
        &self,
        session_id: Uuid,
        text: &str,
    ) -> Result<String, EngineError> {
        let Some(_guard) = self.running.try_acquire(session_id) else {
            return Err(EngineError::Busy(session_id));
        };
        let mut session = self.store.load(session_id)?;

        self.append(
            &session,
            AuditEntry::new(AuditKind::LlmPrompt, "user", text).with_role(AuditRole::User),
        )?;
        let approval = session.approval;
        let tier = session.model_tier;
        let final_text = self
            .call_driver(&mut session, "default", text, approval, tier)
            .await?;
        self.store.save(&mut session)?;
        Ok(final_text)
    }

    /// Run an approved shell command; its output becomes the pending
    /// feedback for the session's next prompt.
    pub async fn execute_command(
        &self,
        session_id: Uuid,
        command: &str,
    ) -> Result<ShellOutput, EngineError> {
        let mut session = self.store.load(session_id)?;
        let out = self
            .run_cmd(&session, command, "user")
            .await?;
        session.pending_feedback = out.output.clone();
        self.store.save(&mut session)?;
        Ok(out)
    }

    /// Deliver a human decision to a blocked run. Has no effect (and
    /// returns false) unless the session is waiting in
    /// `intervention_required`.
    pub fn resolve_intervention(&self, session_id: Uuid, action: InterventionAction) -> bool {
        self.interventions.resolve(session_id, action)
    }

    pub fn is_running(&self, session_id: Uuid) -> bool {
        self.running.is_running(session_id)
    }

    fn initialize_run(
        &self,
        session: &mut Session,
        skill: &SkillGraph,
    ) -> Result<(), EngineError> {
        session.skill = Some(skill.skill_name.clone());
        match (session.active_node.is_some(), session.status) {
            (false, _) | (true, SessionStatus::Completed | SessionStatus::Failed) => {
                // Fresh run (a finished session restarts from the top).
                session.active_node = Some(skill.initial_state.clone());
                session.reset_counters();
                session.pending_feedback.clear();
                self.set_status(
                    session,
                    SessionStatus::Running,
                    format!(
                        "started skill '{}' at '{}'",
                        skill.skill_name, skill.initial_state
                    ),
                )?;
            }
            (true, SessionStatus::Running) => {
                // Re-entry into an interrupted run: invite the agent to
                // pick up where it left off.
                session.pending_feedback = RESUME_SENTINEL.to_string();
            }
            (true, SessionStatus::Idle) => {
                self.set_status(
                    session,
                    SessionStatus::Running,
                    format!("resumed skill '{}'", skill.skill_name),
                )?;
            }
            (true, SessionStatus::InterventionRequired) => {
                // The main loop will block for a resolution.
            }
        }
        self.store.save(session)?;
        Ok(())
    }

    async fn await_intervention(
        &self,
        session: &mut Session,
        node_name: &str,
        state: &StateDef,
    ) -> Result<(), EngineError> {
        self.bus.publish(Event::TaskBlocked {
            session_id: session.id,
            node: node_name.to_string(),
            feedback: session.pending_feedback.clone(),
        });
        tracing::info!(session_id = %session.id, node = node_name, "run blocked, waiting for intervention");

        let Some(action) = self.interventions.wait(session.id).await else {
            self.append(
                session,
                AuditEntry::new(AuditKind::Intervention, "user", "abort (waiter displaced)"),
            )?;
            self.set_status(session, SessionStatus::Failed, "failed: intervention waiter displaced")?;
            self.store.save(session)?;
            return Ok(());
        };

        self.append(
            session,
            AuditEntry::new(AuditKind::Intervention, "user", action.to_string()),
        )?;
        match action {
            InterventionAction::Retry => {
                session.retry_count = 0;
                self.set_status(session, SessionStatus::Running, "resumed: retry")?;
            }
            InterventionAction::ProceedToFail => {
                session.reset_counters();
                session.pending_feedback = "User triggered fail route".to_string();
                if state.on_fail_route.is_empty() {
                    self.set_status(
                        session,
                        SessionStatus::Failed,
                        format!("failed: no fail route from '{}'", node_name),
                    )?;
                } else {
                    session.active_node = Some(state.on_fail_route.clone());
                    self.set_status(
                        session,
                        SessionStatus::Running,
                        format!("resumed: fail route to '{}'", state.on_fail_route),
                    )?;
                }
            }
            InterventionAction::Abort => {
                self.set_status(session, SessionStatus::Failed, "failed: aborted by user")?;
            }
        }
        self.store.save(session)?;
        Ok(())
    }

    async fn run_action_state(
        &self,
        session: &mut Session,
        skill: &SkillGraph,
        node_name: &str,
        state: &StateDef,
    ) -> Result<(), EngineError> {
        // 1. Pre-action command, first attempt only (retries must not
        //    repeat non-idempotent setup).
        if session.retry_count == 0 && !state.pre_action_cmd.is_empty() {
            let out = self.run_cmd(session, &state.pre_action_cmd, "engine").await?;
            if !out.success() {
                self.handle_action_failure(session, skill, state, out.exit_code, &out.output)?;
                self.store.save(session)?;
                return Ok(());
            }
        }

        // 2. LLM turn with the state's effective approval mode and tier.
        let prompt = build_prompt(&state.instruction, &session.pending_feedback);
        self.append(
            session,
            AuditEntry::new(AuditKind::LlmPrompt, "engine", &prompt).with_role(AuditRole::User),
        )?;
        let approval = state.approval.unwrap_or(session.approval);
        let tier = state.model_tier.or(session.model_tier);
        match self
            .call_driver(session, &state.role, &prompt, approval, tier)
            .await
        {
            Ok(_text) => {
                // 3. Feedback is single-use once the agent has seen it.
                session.pending_feedback.clear();
            }
            Err(err @ EngineError::Store(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(session_id = %session.id, node = node_name, error = %err, "driver turn failed");
                self.handle_action_failure(session, skill, state, -1, &err.to_string())?;
                self.store.save(session)?;
                return Ok(());
            }
        }

        // 4. Verification.
        let verify = if state.verify_cmd.is_empty() {
            ShellOutput {
                exit_code: 0,
                output: String::new(),
                truncated: false,
            }
        } else {
            self.run_cmd(session, &state.verify_cmd, "engine").await?
        };

        if verify.success() {
            // 5. Success: best-effort post-action, counters reset, verify
            //    output carried to the next state.
            if !state.post_action_cmd.is_empty() {
                let post = self.run_cmd(session, &state.post_action_cmd, "engine").await?;
                if !post.success() {
                    tracing::debug!(node = node_name, "post-action command failed (ignored)");
                }
            }
            session.reset_counters();
            session.pending_feedback = verify.output;
            session.active_node = Some(state.next.clone());
        } else {
            self.handle_action_failure(session, skill, state, verify.exit_code, &verify.output)?;
        }
        self.store.save(session)?;
        Ok(())
    }

    async fn run_tool_state(
        &self,
        session: &mut Session,
        state: &StateDef,
    ) -> Result<(), EngineError> {
        let out = self.run_cmd(session, &state.command, "engine").await?;
        if out.success() {
            session.reset_counters();
            session.active_node = Some(state.next.clone());
        } else if !state.on_fail_route.is_empty() {
            session.retry_count = 0;
            session.loop_count += 1;
            session.active_node = Some(state.on_fail_route.clone());
        } else {
            self.set_status(
                session,
                SessionStatus::Failed,
                format!("failed: tool command exited {}", out.exit_code),
            )?;
        }
        self.store.save(session)?;
        Ok(())
    }

    /// Failure bookkeeping shared by pre-action, driver, and verify
    /// failures: compose feedback, then spend a retry, route, or block.
    fn handle_action_failure(
        &self,
        session: &mut Session,
        skill: &SkillGraph,
        state: &StateDef,
        exit_code: i32,
        output: &str,
    ) -> Result<(), EngineError> {
        session.retry_count += 1;

        let template = if state.on_fail_prompt.is_empty() {
            DEFAULT_FAIL_PROMPT
        } else {
            &state.on_fail_prompt
        };
        let vars = HashMap::from([
            ("exit_code", exit_code.to_string()),
            ("output", output.to_string()),
            ("stdout", output.to_string()),
            ("stderr", output.to_string()),
        ]);
        let feedback = render(template, &vars);
        session.pending_feedback = merge_feedback(&session.pending_feedback, &feedback);

        if state.max_retries > 0 {
            if session.retry_count >= state.max_retries {
                self.block(session, "retry budget exhausted")?;
            }
            // Otherwise stay on this state for a local retry.
        } else {
            // No local retries: route through the graph, bounded by the
            // skill-wide loop budget.
            let max_loops = if skill.max_loops > 0 {
                skill.max_loops
            } else {
                self.default_max_loops
            };
            if session.loop_count >= max_loops {
                self.block(session, "loop budget exhausted")?;
            } else if !state.on_fail_route.is_empty() {
                session.loop_count += 1;
                session.retry_count = 0;
                session.active_node = Some(state.on_fail_route.clone());
            } else {
                self.block(session, "no retries or fail route available")?;
            }
        }
        Ok(())
    }

    fn block(&self, session: &mut Session, reason: &str) -> Result<(), EngineError> {
        self.set_status(
            session,
            SessionStatus::InterventionRequired,
            format!("intervention required: {}", reason),
        )
    }

    /// Run one driver turn, splitting the chunk stream into visible text
    /// and thought audit entries as it arrives.
    async fn call_driver(
        &self,
        session: &mut Session,
        role: &str,
        prompt: &str,
        approval: ApprovalMode,
        tier: Option<ModelTier>,
    ) -> Result<String, EngineError> {
        let driver = self
            .drivers
            .get(&session.agent)
            .ok_or_else(|| EngineError::UnknownDriver(session.agent.clone()))?;
        let opts = RunOptions {
            native_session_id: session.cached_role_id(role).map(str::to_string),
            prompt: prompt.to_string(),
            cwd: session.cwd.clone(),
            approval,
            yolo: approval == ApprovalMode::Yolo,
            model_tier: tier,
            budget_usd: session.budget_usd,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        // The driver future is polled here rather than spawned, so
        // cancelling this run drops it and the subprocess with it.
        let run_fut = driver.run(opts, tx);
        tokio::pin!(run_fut);

        // The sender drops when the driver returns, ending the receive
        // loop; handling must not block beyond local file appends.
        let mut parser = CotParser::new();
        let mut chunk_entries = 0usize;
        let mut outcome: Option<Result<String, gantry_drivers::DriverError>> = None;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(DriverEvent::NativeSessionId(id)) => {
                        self.learn_native_id(session, role, id)?;
                    }
                    Some(DriverEvent::Chunk(chunk)) => {
                        for segment in parser.push(&chunk) {
                            self.append_segment(session, role, segment)?;
                            chunk_entries += 1;
                        }
                    }
                    None => break,
                },
                result = &mut run_fut, if outcome.is_none() => {
                    outcome = Some(result);
                }
            }
        }
        for segment in parser.flush() {
            self.append_segment(session, role, segment)?;
            chunk_entries += 1;
        }

        let final_text = match outcome {
            Some(result) => result?,
            // The driver dropped its sender before returning.
            None => run_fut.await?,
        };
        if chunk_entries == 0 && !final_text.is_empty() {
            // Non-streaming backend: record the whole response at once.
            self.append(
                session,
                AuditEntry::new(AuditKind::LlmResponse, role, &final_text)
                    .with_role(AuditRole::Assistant),
            )?;
        }
        Ok(final_text)
    }

    fn learn_native_id(
        &self,
        session: &mut Session,
        role: &str,
        id: String,
    ) -> Result<(), EngineError> {
        match session.role_cache.get(role) {
            Some(existing) if *existing == id => Ok(()),
            Some(existing) if !existing.is_empty() => {
                // The backend rotated its session id mid-conversation.
                // Persist the latest so resumes keep working, and leave a
                // trace of the old one.
                tracing::warn!(role, old = %existing, new = %id, "agent-native session id changed");
                self.append(
                    session,
                    AuditEntry::new(
                        AuditKind::Info,
                        "engine",
                        format!(
                            "native session id for role '{}' changed from {} to {}",
                            role, existing, id
                        ),
                    ),
                )?;
                session.role_cache.insert(role.to_string(), id);
                self.store.save(session)?;
                Ok(())
            }
            _ => {
                session.role_cache.insert(role.to_string(), id);
                self.store.save(session)?;
                Ok(())
            }
        }
    }

    fn append_segment(
        &self,
        session: &Session,
        role: &str,
        segment: Segment,
    ) -> Result<(), EngineError> {
        let entry = match segment {
            Segment::Text(text) => AuditEntry::new(AuditKind::LlmResponseChunk, role, text),
            Segment::Thought(text) => AuditEntry::new(AuditKind::LlmThought, role, text),
        };
        self.append(session, entry.with_role(AuditRole::Assistant))
    }

    async fn run_cmd(
        &self,
        session: &Session,
        command: &str,
        source: &str,
    ) -> Result<ShellOutput, EngineError> {
        let shell = ShellExecutor::new().cwd(&session.cwd);
        let out = match shell.run(command).await {
            Ok(out) => out,
            // A spawn failure is reported like a failing command so the
            // retry machinery sees it.
            Err(err) => ShellOutput {
                exit_code: -1,
                output: err.to_string(),
                truncated: false,
            },
        };
        self.append(
            session,
            AuditEntry::new(AuditKind::CmdResult, source, &out.output)
                .with_exit_code(out.exit_code),
        )?;
        Ok(out)
    }

    fn set_status(
        &self,
        session: &mut Session,
        status: SessionStatus,
        message: impl Into<String>,
    ) -> Result<(), EngineError> {
        session.status = status;
        self.append(
            session,
            AuditEntry::new(AuditKind::Status, "engine", message),
        )?;
        self.bus.publish(Event::StatusChanged {
            session_id: session.id,
            status,
        });
        Ok(())
    }

    fn append(&self, session: &Session, entry: AuditEntry) -> Result<(), EngineError> {
        self.store.append_audit(session, &entry)?;
        Ok(())
    }

    pub(crate) fn store(&self) -> &SessionStore {
        &self.store
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
