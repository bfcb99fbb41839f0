//! Turn orchestrator: one utterance in, one reply out.
//!
//! A turn runs as an explicit state machine:
//!
//! ```text
//! Received → OverrideCheck ─┬─ ManualReply
//!                           └─ Classify → SensitiveCheck ─┬─ SensitiveFallback
//!                                                         └─ IntentCheck ─┬─ UnknownFallback
//!                                                                         └─ FastTrack ─┬─ ToolRequested
//!                                                                                       └─ PrimaryCall ─┬─ DirectReply
//!                                                                                                       └─ ToolRequested
//!
//! ToolRequested ─┬─ ToolArgumentsRejected
//!                └─ ToolExecuted → SecondCall ─┬─ ToolReply
//!                                              └─ ToolFallback
//! ```
//!
//! Each session's turns are serialized on the session lock. Model transport
//! failures on the primary or second call abort the turn with an error;
//! classifier, router and tool failures do not. Every assistant tool call
//! written to history is answered by a tool message, even when the turn fails.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use agent_tools::{TOOL_DISABLED, TOOL_TIMED_OUT};
use brain_core::{
    error_payload, hash_prompt, short_hash, ChatRequest, Message, ModelGateway, ToolCall,
    ToolDefinition, ToolExecutor, ToolRequest, ToolResult, ToolResultRequest,
};
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::archive::{HistoryArchive, NoopArchive};
use crate::classifier::{ClassificationResult, Classifier};
use crate::completion::completed_task_names;
use crate::config::{ConfigSource, TurnConfig};
use crate::diagnostics::{Diagnostics, StrategyTag};
use crate::error::OrchestratorError;
use crate::prompt::{append_redlines, build_persona, StatusCode};
use crate::router::Router;
use crate::session::{Session, SessionStore};
use crate::strategy::{known_intents, remap_intent, selector_for, UNKNOWN_INTENT};
use crate::workflow::{DependencyRules, TaskStatus};

/// Utterance that interrupts the agent.
pub const INTERRUPT_SIGNAL: &str = "打断";

pub const INTERRUPT_REPLY: &str = "好的，您请说。";

/// Utterance a voice front end sends when the caller stays silent.
pub const SILENCE_SIGNAL: &str = " ";

/// Silence count at which the call is closed.
pub const SILENCE_THRESHOLD: u32 = 4;

/// Replies to the first, second and third consecutive silence signal.
pub const SILENCE_REPLIES: &[&str] = &[
    "喂，您好，请问还能听到我说话吗？",
    "您好，您那边是信号不太好吗？如果能听到请回复我一下。",
    "您好，如果您现在不方便，我们可以稍后再联系您。",
];

pub const SILENCE_CLOSING_REPLY: &str = "看您一直没有回复，那就先不打扰您了，祝您生活愉快，再见！";

pub const WORKFLOW_COMPLETE_REPLY: &str = "本次业务流程已经全部完成，感谢您的耐心配合，祝您生活愉快！";

pub const BAD_TOOL_ARGUMENTS_REPLY: &str = "抱歉，模型返回的工具参数格式不正确。";

/// Reply when the model answers a tool result with another tool call or with nothing.
pub const TOOL_FALLBACK_REPLY: &str = "抱歉，暂时没能查到相关信息，您可以稍后再试或换个问题。";

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// Scripted reply from the override check; no model call.
    ManualReply,
    SensitiveFallback,
    UnknownFallback,
    /// Primary model answered without a tool.
    DirectReply,
    /// A tool ran and the second call answered.
    ToolReply,
    /// A tool ran but the second call asked for another tool or said nothing.
    ToolFallback,
    /// Tool call arguments were not a JSON object; nothing was executed.
    ToolArgumentsRejected,
}

/// Outcome of a successful turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub reply: String,
    pub terminal: Terminal,
    pub diagnostics: Diagnostics,
}

/// One task as shown to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskState {
    pub name: String,
    pub sanitized: String,
    pub status: TaskStatus,
    pub available: bool,
}

enum TurnState {
    Received,
    OverrideCheck,
    Classify,
    SensitiveCheck(ClassificationResult),
    IntentCheck(ClassificationResult),
    FastTrack,
    PrimaryCall,
    ToolRequested(ToolCall),
    ToolExecuted { call: ToolCall, result: ToolResult },
    SecondCall(Message),
    Finished { terminal: Terminal, reply: String },
}

/// Everything a turn carries between states.
struct Turn<'a> {
    session_id: &'a str,
    utterance: &'a str,
    config: TurnConfig,
    session: &'a mut Session,
    rules: DependencyRules,
    persona: String,
    tools: Vec<ToolDefinition>,
    diagnostics: Diagnostics,
}

impl Turn<'_> {
    fn available_names(&self) -> Vec<String> {
        if !self.config.features.workflow {
            return Vec::new();
        }
        self.session
            .tracker
            .available_tasks(&self.rules)
            .into_iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    fn workflow_names(&self) -> Vec<String> {
        if self.config.features.workflow {
            self.session.tracker.task_names()
        } else {
            Vec::new()
        }
    }

    /// Render the persona for `status` and record it in diagnostics.
    fn render_persona(&mut self, status: StatusCode, strategy: &str) {
        let available = self.available_names();
        let workflow = self.workflow_names();
        self.persona = append_redlines(
            build_persona(&self.config.persona_template, status, &available, &workflow, strategy),
            &self.config.safety_redlines,
        );
        self.diagnostics.persona_hash = hash_prompt(&self.persona);
        self.diagnostics.persona_preview = self.persona.clone();
        self.diagnostics.available_tasks = available;
    }

    fn primary_model(&self) -> &str {
        &self.config.primary_params.model_name
    }

    fn finish(&mut self, tag: StrategyTag, terminal: Terminal, reply: impl Into<String>) -> TurnState {
        self.diagnostics.strategy_tag = tag;
        TurnState::Finished {
            terminal,
            reply: reply.into(),
        }
    }
}

/// Ties configuration, model gateway, tools and session state together.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use agent_tools::{default_registry, RegistryToolExecutor};
/// use brain_core::ModelGateway;
/// use orchestrator::{Orchestrator, StaticConfigSource};
///
/// # async fn example(gateway: Arc<ModelGateway>) -> Result<(), orchestrator::OrchestratorError> {
/// let orchestrator = Orchestrator::new(
///     Arc::new(StaticConfigSource::default()),
///     gateway,
///     Arc::new(RegistryToolExecutor::new(default_registry())),
/// );
///
/// let turn = orchestrator.handle_turn("caller-1", "你们有哪些套餐？").await?;
/// println!("{} ({:?})", turn.reply, turn.terminal);
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    config: Arc<dyn ConfigSource>,
    gateway: Arc<ModelGateway>,
    classifier: Classifier,
    router: Router,
    tools: Arc<dyn ToolExecutor>,
    archive: Arc<dyn HistoryArchive>,
    sessions: SessionStore,
}

impl Orchestrator {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        gateway: Arc<ModelGateway>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            config,
            classifier: Classifier::new(gateway.clone()),
            router: Router::new(gateway.clone()),
            gateway,
            tools,
            archive: Arc::new(NoopArchive),
            sessions: SessionStore::new(),
        }
    }

    /// Archive histories with `archive` on reset and exit.
    pub fn with_archive(mut self, archive: Arc<dyn HistoryArchive>) -> Self {
        self.archive = archive;
        self
    }

    /// The configured opening line.
    pub async fn opening_line(&self) -> String {
        self.config.opening_line().await
    }

    /// Run one turn for `session_id`.
    ///
    /// Turns of the same session run one at a time; turns of different
    /// sessions run concurrently.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        utterance: &str,
    ) -> Result<TurnResult, OrchestratorError> {
        let started = Instant::now();
        let config = TurnConfig::load(self.config.as_ref()).await?;

        let session = self.sessions.get_or_create(session_id, &config.tasks).await;
        let mut session = session.lock().await;

        let rules = DependencyRules::parse(&config.dependency_text, &session.tracker.task_names());
        let mut turn = Turn {
            session_id,
            utterance,
            config,
            session: &mut *session,
            rules,
            persona: String::new(),
            tools: Vec::new(),
            diagnostics: Diagnostics::default(),
        };

        info!(session = %session_id, "Processing turn");

        let mut state = TurnState::Received;
        let (terminal, reply) = loop {
            state = match state {
                TurnState::Received => TurnState::OverrideCheck,
                TurnState::OverrideCheck => self.check_overrides(&mut turn).await?,
                TurnState::Classify => self.classify(&mut turn).await,
                TurnState::SensitiveCheck(result) => Self::check_sensitive(&mut turn, result),
                TurnState::IntentCheck(result) => Self::check_intent(&mut turn, result),
                TurnState::FastTrack => self.fast_track(&mut turn).await?,
                TurnState::PrimaryCall => self.primary_call(&mut turn).await?,
                TurnState::ToolRequested(call) => self.execute_tool(&mut turn, call).await?,
                TurnState::ToolExecuted { call, result } => {
                    turn.diagnostics.tool_result = Some(result.content.clone());
                    TurnState::SecondCall(Message::tool(result.content, call.id))
                }
                TurnState::SecondCall(tool_message) => self.second_call(&mut turn, tool_message).await?,
                TurnState::Finished { terminal, reply } => break (terminal, reply),
            };
        };

        if matches!(terminal, Terminal::DirectReply | Terminal::ToolReply) && turn.config.features.workflow {
            Self::scan_completion(&mut turn, &reply);
        }

        turn.diagnostics.timings.total_ms = started.elapsed().as_millis() as u64;
        info!(
            session = %session_id,
            terminal = ?terminal,
            strategy = ?turn.diagnostics.strategy_tag,
            elapsed_ms = turn.diagnostics.timings.total_ms,
            "Turn finished"
        );

        Ok(TurnResult {
            reply,
            terminal,
            diagnostics: turn.diagnostics,
        })
    }

    /// Interrupt, silence and finished-workflow short circuits.
    async fn check_overrides(&self, turn: &mut Turn<'_>) -> Result<TurnState, OrchestratorError> {
        if turn.utterance.trim() == INTERRUPT_SIGNAL {
            info!(session = %turn.session_id, "Manual interrupt");
            turn.render_persona(StatusCode::Interrupted, "");
            return Ok(turn.finish(StrategyTag::ManualInterrupt, Terminal::ManualReply, INTERRUPT_REPLY));
        }

        if turn.utterance == SILENCE_SIGNAL {
            let count = turn.session.silence_count + 1;
            let closing = count >= SILENCE_THRESHOLD;
            turn.render_persona(StatusCode::Silence, "");

            let (tag, reply) = if closing {
                (StrategyTag::SilenceClosing, SILENCE_CLOSING_REPLY)
            } else {
                let index = (count as usize - 1).min(SILENCE_REPLIES.len() - 1);
                (StrategyTag::SilencePrompt, SILENCE_REPLIES[index])
            };
            info!(session = %turn.session_id, count, "Silence signal");

            self.gateway
                .add_messages(
                    turn.session_id,
                    turn.primary_model(),
                    vec![Message::user(SILENCE_SIGNAL), Message::assistant(reply)],
                )
                .await?;

            // Session state only moves once the exchange is in history.
            if closing {
                turn.session.tracker.complete_all();
                turn.session.silence_count = 0;
            } else {
                turn.session.silence_count = count;
            }
            return Ok(turn.finish(tag, Terminal::ManualReply, reply));
        }

        if turn.config.features.workflow
            && !turn.session.tracker.is_empty()
            && turn.session.tracker.is_workflow_complete()
            && turn.session.tracker.available_tasks(&turn.rules).is_empty()
        {
            info!(session = %turn.session_id, "Workflow already complete");
            turn.render_persona(StatusCode::Normal, "");
            return Ok(turn.finish(StrategyTag::WorkflowComplete, Terminal::ManualReply, WORKFLOW_COMPLETE_REPLY));
        }

        Ok(TurnState::Classify)
    }

    async fn classify(&self, turn: &mut Turn<'_>) -> TurnState {
        turn.session.silence_count = 0;

        let outcome = self
            .classifier
            .classify(
                turn.utterance,
                &turn.config.classifier_prompt,
                &turn.config.classifier_params,
                &turn.config.primary_params,
            )
            .await;

        let diagnostics = &mut turn.diagnostics;
        diagnostics.timings.classify_ms = Some(outcome.elapsed_ms);
        diagnostics.classifier_model = Some(outcome.model_used);
        diagnostics.classifier_fallback = outcome.fell_back;
        diagnostics.intent = match &outcome.error {
            Some(failure) => failure.intent_label().to_string(),
            None => outcome.result.intent.clone(),
        };
        diagnostics.classifier_error = outcome.error.map(|e| e.to_string());
        diagnostics.emotion = outcome.result.emotion.clone();
        diagnostics.is_sensitive = outcome.result.is_sensitive;
        diagnostics.direct_tool = outcome.result.direct_tool.clone();

        TurnState::SensitiveCheck(outcome.result)
    }

    fn check_sensitive(turn: &mut Turn<'_>, result: ClassificationResult) -> TurnState {
        if result.is_sensitive {
            info!(session = %turn.session_id, "Sensitive utterance, using fallback text");
            let reply = turn.config.sensitive_text.clone();
            return turn.finish(StrategyTag::SensitiveFallback, Terminal::SensitiveFallback, reply);
        }
        TurnState::IntentCheck(result)
    }

    /// Intent gate, then strategy selection and persona rendering.
    fn check_intent(turn: &mut Turn<'_>, result: ClassificationResult) -> TurnState {
        if !turn.config.features.strategy {
            turn.render_persona(StatusCode::Normal, "");
            turn.diagnostics.strategy_tag = StrategyTag::NoStrategy;
            return TurnState::FastTrack;
        }

        let intent = remap_intent(&result.intent, &known_intents(&turn.config));
        if intent == UNKNOWN_INTENT {
            info!(session = %turn.session_id, raw = %result.intent, "Unrecognized intent, using fallback text");
            let reply = turn.config.fallback_text.clone();
            return turn.finish(StrategyTag::UnknownFallback, Terminal::UnknownFallback, reply);
        }

        let emotion = if turn.config.features.emotion {
            result.emotion.as_str()
        } else {
            ""
        };
        let strategy = selector_for(turn.config.policy, &turn.config).select(&intent, emotion);
        debug!(intent = %intent, emotion = %emotion, strategy = %strategy, "Selected strategy");

        turn.render_persona(StatusCode::Normal, &strategy);
        turn.diagnostics.strategy_tag = if strategy.is_empty() {
            StrategyTag::NoStrategy
        } else {
            StrategyTag::Strategy
        };
        turn.diagnostics.strategy_text = strategy;
        TurnState::FastTrack
    }

    /// Tool definitions offered this turn, after the configured switches and descriptions.
    fn offer_tools(&self, turn: &mut Turn<'_>) {
        turn.tools = if turn.config.features.tools {
            turn.config.tool_policy.apply(self.tools.definitions())
        } else {
            Vec::new()
        };
    }

    /// Let the router answer simple data questions with a tool.
    ///
    /// On a hit the user utterance and a synthesized assistant tool call are
    /// written to history, as the primary call would have, and the tool runs.
    async fn fast_track(&self, turn: &mut Turn<'_>) -> Result<TurnState, OrchestratorError> {
        self.offer_tools(turn);
        if !turn.config.features.router || turn.tools.is_empty() {
            return Ok(TurnState::PrimaryCall);
        }

        let outcome = self
            .router
            .route(
                turn.utterance,
                &turn.config.router_prompt,
                &turn.config.router_params,
                &turn.tools,
            )
            .await;
        turn.diagnostics.timings.route_ms = Some(outcome.elapsed_ms);
        turn.diagnostics.router_model = outcome.model_used;
        turn.diagnostics.router_error = outcome.error;

        let Some(tool) = outcome.tool else {
            return Ok(TurnState::PrimaryCall);
        };

        let call = ToolCall::new(format!("router-{}", Uuid::new_v4()), tool.name, tool.arguments);
        let mut messages = Vec::with_capacity(3);
        let opening = turn.config.opening_line.trim();
        if !opening.is_empty() && self.gateway.history(turn.session_id).await.is_empty() {
            messages.push(Message::assistant(opening));
        }
        messages.push(Message::user(turn.utterance));
        messages.push(Message::assistant_with_calls("", vec![call.clone()]));
        self.gateway
            .add_messages(turn.session_id, turn.primary_model(), messages)
            .await?;

        info!(session = %turn.session_id, tool = %call.name, "Fast-tracked to tool");
        turn.diagnostics.fast_track = true;
        Ok(TurnState::ToolRequested(call))
    }

    async fn primary_call(&self, turn: &mut Turn<'_>) -> Result<TurnState, OrchestratorError> {
        info!(
            session = %turn.session_id,
            model = %turn.config.primary_params.model_name,
            persona = %short_hash(&turn.persona),
            tools = turn.tools.len(),
            "Calling primary model"
        );
        trace!("Persona: {}", turn.persona);

        let opening = turn.config.opening_line.trim();
        let request = ChatRequest {
            session_id: turn.session_id.to_string(),
            user_text: turn.utterance.to_string(),
            system_prompt: turn.persona.clone(),
            opening_line: (!opening.is_empty()).then(|| opening.to_string()),
            params: turn.config.primary_params.clone(),
            tools: turn.tools.clone(),
        };

        let started = Instant::now();
        let reply = self.gateway.chat(request).await?;
        turn.diagnostics.timings.primary_ms = Some(started.elapsed().as_millis() as u64);

        if reply.tool_calls.len() > 1 {
            warn!(
                session = %turn.session_id,
                count = reply.tool_calls.len(),
                "Model requested several tools; only the first is serviced"
            );
            let unanswered = reply.tool_calls[1..]
                .iter()
                .map(|extra| Message::tool(error_payload("tool call limit reached"), extra.id.clone()))
                .collect();
            self.gateway
                .add_messages(turn.session_id, turn.primary_model(), unanswered)
                .await?;
        }

        if let Some(call) = reply.first_tool_call() {
            return Ok(TurnState::ToolRequested(call.clone()));
        }
        let tag = turn.diagnostics.strategy_tag;
        Ok(turn.finish(tag, Terminal::DirectReply, reply.text))
    }

    async fn execute_tool(&self, turn: &mut Turn<'_>, call: ToolCall) -> Result<TurnState, OrchestratorError> {
        turn.diagnostics.tool_invoked = Some(call.name.clone());

        let request = match ToolRequest::from_call(&call.id, &call.name, &call.arguments_json) {
            Ok(request) => request.with_session(turn.session_id),
            Err(e) => {
                warn!(tool = %call.name, "Rejecting tool call with malformed arguments: {}", e);
                // Answer the dangling call so the history replays cleanly.
                self.gateway
                    .add_messages(
                        turn.session_id,
                        turn.primary_model(),
                        vec![
                            Message::tool(error_payload("bad tool arguments"), call.id),
                            Message::assistant(BAD_TOOL_ARGUMENTS_REPLY),
                        ],
                    )
                    .await?;
                return Ok(turn.finish(
                    StrategyTag::BadToolArguments,
                    Terminal::ToolArgumentsRejected,
                    BAD_TOOL_ARGUMENTS_REPLY,
                ));
            }
        };

        if !turn.config.tool_policy.allows(&call.name) {
            warn!(session = %turn.session_id, tool = %call.name, "Tool is switched off");
            let result = ToolResult::error(&call.id, TOOL_DISABLED);
            return Ok(TurnState::ToolExecuted { call, result });
        }

        info!(session = %turn.session_id, tool = %call.name, "Executing tool");
        let started = Instant::now();
        let result = match turn.config.tool_policy.timeout {
            Some(limit) => tokio::time::timeout(limit, self.tools.execute(request))
                .await
                .unwrap_or_else(|_| {
                    warn!(session = %turn.session_id, tool = %call.name, "Tool timed out");
                    ToolResult::error(&call.id, TOOL_TIMED_OUT)
                }),
            None => self.tools.execute(request).await,
        };
        turn.diagnostics.timings.tool_ms = Some(started.elapsed().as_millis() as u64);

        if !result.success {
            debug!(tool = %call.name, "Tool returned error payload: {}", result.content);
        }
        Ok(TurnState::ToolExecuted { call, result })
    }

    /// Send the tool result back to the primary model.
    ///
    /// One tool round per turn: a further tool call is answered with an error
    /// payload and the caller gets [`TOOL_FALLBACK_REPLY`], as for a blank reply.
    async fn second_call(&self, turn: &mut Turn<'_>, tool_message: Message) -> Result<TurnState, OrchestratorError> {
        let call_id = tool_message.tool_call_id.clone().unwrap_or_default();
        let request = ToolResultRequest {
            session_id: turn.session_id.to_string(),
            system_prompt: Some(turn.persona.clone()),
            params: turn.config.primary_params.clone(),
            tools: turn.tools.clone(),
            tool_message,
        };

        let started = Instant::now();
        let outcome = self.gateway.chat_with_tool_result(request).await;
        turn.diagnostics.timings.second_ms = Some(started.elapsed().as_millis() as u64);

        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session = %turn.session_id, "Second model call failed: {}", e);
                // The failed call committed nothing, so the assistant tool call is still open.
                let answer = vec![Message::tool(error_payload("model call failed"), call_id)];
                if let Err(commit) = self
                    .gateway
                    .add_messages(turn.session_id, turn.primary_model(), answer)
                    .await
                {
                    warn!(session = %turn.session_id, "Could not close dangling tool call: {}", commit);
                }
                return Err(e.into());
            }
        };

        if !reply.tool_calls.is_empty() {
            warn!(
                session = %turn.session_id,
                tool = %reply.tool_calls[0].name,
                "Refusing tool call from second model call"
            );
            let mut messages: Vec<Message> = reply
                .tool_calls
                .iter()
                .map(|extra| Message::tool(error_payload("tool call limit reached"), extra.id.clone()))
                .collect();
            messages.push(Message::assistant(TOOL_FALLBACK_REPLY));
            self.gateway
                .add_messages(turn.session_id, turn.primary_model(), messages)
                .await?;
            return Ok(turn.finish(StrategyTag::ToolFallback, Terminal::ToolFallback, TOOL_FALLBACK_REPLY));
        }

        if reply.text.trim().is_empty() {
            warn!(session = %turn.session_id, "Second model call returned no text");
            self.gateway
                .add_messages(
                    turn.session_id,
                    turn.primary_model(),
                    vec![Message::assistant(TOOL_FALLBACK_REPLY)],
                )
                .await?;
            return Ok(turn.finish(StrategyTag::ToolFallback, Terminal::ToolFallback, TOOL_FALLBACK_REPLY));
        }

        let tag = turn.diagnostics.strategy_tag;
        Ok(turn.finish(tag, Terminal::ToolReply, reply.text))
    }

    /// Mark tasks the reply announces as completed.
    fn scan_completion(turn: &mut Turn<'_>, reply: &str) {
        for name in completed_task_names(reply) {
            match turn.session.tracker.complete(&name) {
                Some(task) => {
                    info!(session = %turn.session_id, task = %task, "Task completed");
                    turn.diagnostics.completed_this_turn.push(task);
                }
                None => debug!(session = %turn.session_id, "Completion marker names unknown task: {}", name),
            }
        }
    }

    /// Archive and clear a session, then start it over with the current task list.
    pub async fn reset(&self, session_id: &str) -> Result<Option<PathBuf>, OrchestratorError> {
        let tasks = self.config.task_list().await;
        let session = self.sessions.get_or_create(session_id, &tasks).await;
        let mut session = session.lock().await;

        let history = self.gateway.history(session_id).await;
        let archived = self.archive.archive(session_id, &history).await?;
        self.gateway.pop_history(session_id).await;

        session.reset(&tasks);
        info!(session = %session_id, messages = history.len(), "Session reset");
        Ok(archived)
    }

    /// Archive a session's history and release its workflow state.
    ///
    /// Model history is kept. A later turn for the same id starts a fresh
    /// workflow. If archiving fails the session is left in place.
    pub async fn save_on_exit(&self, session_id: &str) -> Result<Option<PathBuf>, OrchestratorError> {
        let session = self.sessions.get(session_id).await;
        let guard = match &session {
            Some(session) => Some(session.lock().await),
            None => None,
        };

        let history = self.gateway.history(session_id).await;
        let archived = self.archive.archive(session_id, &history).await?;

        if guard.is_some() {
            self.sessions.remove(session_id).await;
            info!(session = %session_id, "Session released on exit");
        }
        Ok(archived)
    }

    /// Reload the task list into every live session.
    ///
    /// All tasks return to pending. Returns how many sessions were updated.
    pub async fn reconfigure_workflow(&self) -> usize {
        let tasks = self.config.task_list().await;
        let sessions = self.sessions.all().await;
        for (_, session) in &sessions {
            session
                .lock()
                .await
                .tracker
                .update_tasks(tasks.iter().cloned());
        }
        info!(sessions = sessions.len(), tasks = tasks.len(), "Reconfigured workflow");
        sessions.len()
    }

    /// Per-task status of a session, or `None` if the session does not exist.
    pub async fn workflow_snapshot(&self, session_id: &str) -> Option<Vec<TaskState>> {
        let session = self.sessions.get(session_id).await?;
        let dependency_text = self.config.dependency_text().await;
        let session = session.lock().await;

        let rules = DependencyRules::parse(&dependency_text, &session.tracker.task_names());
        let available: Vec<&str> = session
            .tracker
            .available_tasks(&rules)
            .into_iter()
            .map(|t| t.name())
            .collect();

        Some(
            session
                .tracker
                .tasks()
                .iter()
                .map(|task| TaskState {
                    name: task.name().to_string(),
                    sanitized: task.sanitized_name().to_string(),
                    status: task.status(),
                    available: available.contains(&task.name()),
                })
                .collect(),
        )
    }

    /// Conversation history of a session.
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.gateway.history(session_id).await
    }
}
