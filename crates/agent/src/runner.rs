//! The loop controller: one `process_turn` call per user message.
//!
//! The loop alternates between the model and the tool registry until the
//! model answers with plain text or the tool-call ceiling is hit. Tool
//! failures are ordinary results the model reads about; only a failure of
//! the model transport itself aborts the turn, and that is caught once at
//! the top and turned into a fixed apology.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use crmpilot_core::error::Error;
use crmpilot_core::event::{DomainEvent, EventBus};
use crmpilot_core::markers;
use crmpilot_core::provider::{CompletionRequest, ModelProvider, ToolDefinition};
use crmpilot_core::store::{ConversationStore, UserId};
use crmpilot_core::turn::Turn;
use crmpilot_tools::ToolRegistry;
use tracing::{debug, error, info, warn};

use crate::prompt;

const CEILING_MESSAGE: &str = "I've reached the maximum number of tool calls for this request. \
     Here's what I found so far. Please try a simpler query if you need more.";

const TIMEOUT_MESSAGE: &str = "The request took too long. Please try a simpler query.";

/// Loop bounds. `max_tool_calls` caps dispatch rounds within one turn;
/// `history_window` is the number of stored turns loaded as context.
#[derive(Debug, Clone)]
pub struct LoopParams {
    pub max_tool_calls: usize,
    pub history_window: usize,
}

impl Default for LoopParams {
    fn default() -> Self {
        Self {
            max_tool_calls: 25,
            history_window: 50,
        }
    }
}

/// The final answer for one user turn. `text` keeps any `[SEND_FILE:...]`
/// markers verbatim for the model-facing contract; `attachments` carries the
/// same paths structurally so the transport layer does not have to re-parse.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub text: String,
    pub attachments: Vec<PathBuf>,
}

pub struct AgentRunner {
    provider: Arc<dyn ModelProvider>,
    store: Arc<dyn ConversationStore>,
    registry: Arc<ToolRegistry>,
    events: Arc<EventBus>,
    params: LoopParams,
}

impl AgentRunner {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        store: Arc<dyn ConversationStore>,
        registry: Arc<ToolRegistry>,
        events: Arc<EventBus>,
        params: LoopParams,
    ) -> Self {
        Self {
            provider,
            store,
            registry,
            events,
            params,
        }
    }

    /// Drive one user message to a final answer. Never fails: fatal transport
    /// errors become fixed apology strings.
    pub async fn process_turn(&self, user: &UserId, text: &str) -> AgentReply {
        self.events.publish(DomainEvent::TurnStarted {
            user_id: user.to_string(),
            content_preview: text.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        match self.run_loop(user, text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(user = %user, error = %e, "Turn failed");
                self.events.publish(DomainEvent::ErrorOccurred {
                    context: "process_turn".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                let text = match &e {
                    Error::Provider(p) if p.is_timeout() => TIMEOUT_MESSAGE.to_string(),
                    other => format!("An error occurred: {other}"),
                };
                AgentReply {
                    text,
                    attachments: Vec::new(),
                }
            }
        }
    }

    async fn run_loop(&self, user: &UserId, text: &str) -> Result<AgentReply, Error> {
        let mut working = self.store.load(user, self.params.history_window).await?;

        let user_turn = Turn::user(text);
        working.push(user_turn.clone());
        let mut generated = vec![user_turn];

        let tools: Vec<ToolDefinition> = self.registry.definitions();
        let mut pending_files: Vec<PathBuf> = Vec::new();
        let mut iterations = 0usize;
        let mut hit_ceiling = false;

        let final_text = loop {
            if iterations >= self.params.max_tool_calls {
                warn!(user = %user, iterations, "Tool call ceiling reached");
                hit_ceiling = true;
                break CEILING_MESSAGE.to_string();
            }

            let response = self
                .provider
                .complete(CompletionRequest {
                    system_prompt: prompt::system_prompt(),
                    turns: working.clone(),
                    tools: tools.clone(),
                })
                .await?;

            if response.is_terminal() {
                break response.content.unwrap_or_default();
            }

            let assistant =
                Turn::assistant_tool_calls(response.content.clone(), response.tool_calls.clone());
            working.push(assistant.clone());
            generated.push(assistant);

            // Dispatch in emission order; the model must see its own
            // requests answered in the order it made them.
            for invocation in &response.tool_calls {
                debug!(tool = %invocation.name, "Dispatching tool call");
                let started = Instant::now();
                let result = self
                    .registry
                    .dispatch(&invocation.name, invocation.arguments.clone())
                    .await;

                let success = !(result.starts_with("Error executing ")
                    || result.starts_with("Unknown tool: "));
                self.events.publish(DomainEvent::ToolExecuted {
                    tool_name: invocation.name.clone(),
                    success,
                    duration_ms: started.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                });

                // The model is not reliable about echoing file markers, so
                // they are collected here and re-attached to the final text.
                pending_files.extend(markers::extract_send_files(&result));

                let tool_turn = Turn::tool_result(&invocation.id, result);
                working.push(tool_turn.clone());
                generated.push(tool_turn);
            }

            iterations += 1;
        };

        let mut final_text = final_text;
        for path in &pending_files {
            let marker = markers::send_file(path);
            if !final_text.contains(&marker) {
                final_text.push('\n');
                final_text.push_str(&marker);
            }
        }

        generated.push(Turn::assistant(final_text.clone()));
        self.store.append(user, &generated).await?;

        info!(user = %user, iterations, hit_ceiling, "Turn completed");
        self.events.publish(DomainEvent::TurnCompleted {
            user_id: user.to_string(),
            iterations: iterations as u32,
            hit_ceiling,
            timestamp: Utc::now(),
        });

        let attachments = markers::extract_send_files(&final_text);
        Ok(AgentReply {
            text: final_text,
            attachments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crmpilot_core::error::{ProviderError, ToolError};
    use crmpilot_core::provider::CompletionResponse;
    use crmpilot_core::tool::Tool;
    use crmpilot_core::turn::{Role, ToolInvocation};
    use crmpilot_memory::InMemoryStore;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of responses; counts how often it was called.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<CompletionResponse, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("provider called more often than scripted")
        }
    }

    /// A provider that requests the same tool on every round, forever.
    struct LoopingProvider {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ModelProvider for LoopingProvider {
        fn name(&self) -> &str {
            "looping"
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            Ok(CompletionResponse {
                content: None,
                tool_calls: vec![ToolInvocation {
                    id: format!("call_{calls}"),
                    name: "recorder".into(),
                    arguments: json!({}),
                }],
            })
        }
    }

    /// Records every argument payload and returns a canned string.
    struct RecorderTool {
        reply: String,
        seen: Arc<Mutex<Vec<Value>>>,
    }

    #[async_trait]
    impl Tool for RecorderTool {
        fn name(&self) -> &str {
            "recorder"
        }
        fn description(&self) -> &str {
            "Records its arguments"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
            self.seen.lock().unwrap().push(arguments);
            Ok(self.reply.clone())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "flaky"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _: Value) -> Result<String, ToolError> {
            Err(ToolError::ExecutionFailed("remote service unavailable".into()))
        }
    }

    fn text_response(text: &str) -> Result<CompletionResponse, ProviderError> {
        Ok(CompletionResponse {
            content: Some(text.into()),
            tool_calls: vec![],
        })
    }

    fn tool_response(id: &str, name: &str, arguments: Value) -> Result<CompletionResponse, ProviderError> {
        Ok(CompletionResponse {
            content: None,
            tool_calls: vec![ToolInvocation {
                id: id.into(),
                name: name.into(),
                arguments,
            }],
        })
    }

    struct Harness {
        runner: AgentRunner,
        store: Arc<InMemoryStore>,
        seen: Arc<Mutex<Vec<Value>>>,
    }

    fn harness(provider: Arc<dyn ModelProvider>, tool_reply: &str) -> Harness {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(RecorderTool {
            reply: tool_reply.into(),
            seen: seen.clone(),
        }));
        registry.register(Box::new(FailingTool));

        let store = Arc::new(InMemoryStore::new());
        let runner = AgentRunner::new(
            provider,
            store.clone(),
            Arc::new(registry),
            Arc::new(EventBus::default()),
            LoopParams::default(),
        );
        Harness {
            runner,
            store,
            seen,
        }
    }

    #[tokio::test]
    async fn immediate_text_needs_no_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response(
            "Hello! How can I help?",
        )]));
        let h = harness(provider.clone(), "unused");
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "hi").await;
        assert_eq!(reply.text, "Hello! How can I help?");
        assert!(reply.attachments.is_empty());
        assert!(h.seen.lock().unwrap().is_empty());
        assert_eq!(provider.call_count(), 1);

        let persisted = h.store.load(&user, 50).await.unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].role, Role::User);
        assert_eq!(persisted[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn one_tool_round_with_exact_arguments() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(
                "call_1",
                "recorder",
                json!({"module": "Leads", "word": "John Smith"}),
            ),
            text_response("I found John Smith."),
        ]));
        let h = harness(provider, "Found lead: John Smith (ID: 123)");
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "find John Smith").await;
        assert_eq!(reply.text, "I found John Smith.");

        let seen = h.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], json!({"module": "Leads", "word": "John Smith"}));
        drop(seen);

        // user, assistant(tool_calls), tool, assistant
        let persisted = h.store.load(&user, 50).await.unwrap();
        assert_eq!(persisted.len(), 4);
        assert!(persisted[1].has_tool_calls());
        assert_eq!(persisted[2].role, Role::Tool);
        assert_eq!(persisted[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(
            persisted[2].content.as_deref(),
            Some("Found lead: John Smith (ID: 123)")
        );
    }

    #[tokio::test]
    async fn ceiling_stops_after_twentyfive_rounds() {
        let provider = Arc::new(LoopingProvider {
            calls: Mutex::new(0),
        });
        let h = harness(provider.clone(), "still looking...");
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "do the impossible").await;
        assert_eq!(reply.text, CEILING_MESSAGE);
        // 25 dispatch rounds, then the ceiling message without a 26th call
        assert_eq!(*provider.calls.lock().unwrap(), 25);
        assert_eq!(h.seen.lock().unwrap().len(), 25);

        // user + 25 * (assistant + tool) + final assistant
        let persisted = h.store.load(&user, 1000).await.unwrap();
        assert_eq!(persisted.len(), 52);
        assert_eq!(persisted[51].content.as_deref(), Some(CEILING_MESSAGE));
    }

    #[tokio::test]
    async fn tool_failure_feeds_back_and_loop_continues() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response("call_1", "flaky", json!({})),
            text_response("That service is down, sorry."),
        ]));
        let h = harness(provider, "unused");
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "try it").await;
        assert_eq!(reply.text, "That service is down, sorry.");

        let persisted = h.store.load(&user, 50).await.unwrap();
        assert_eq!(
            persisted[2].content.as_deref(),
            Some("Error executing flaky: Tool execution failed: remote service unavailable")
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_not_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response("call_1", "no_such_tool", json!({})),
            text_response("Let me try something else."),
        ]));
        let h = harness(provider, "unused");
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "go").await;
        assert_eq!(reply.text, "Let me try something else.");
        let persisted = h.store.load(&user, 50).await.unwrap();
        assert_eq!(
            persisted[2].content.as_deref(),
            Some("Unknown tool: no_such_tool")
        );
    }

    #[tokio::test]
    async fn file_markers_are_reattached_and_surfaced() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response("call_1", "recorder", json!({"result_set_id": "abc12345"})),
            // Model drops the marker from its summary
            text_response("Your report is ready."),
        ]));
        let h = harness(
            provider,
            "Report generated with 60 leads.\n[SEND_FILE:/tmp/leads.csv]",
        );
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "export them").await;
        assert_eq!(reply.text, "Your report is ready.\n[SEND_FILE:/tmp/leads.csv]");
        assert_eq!(reply.attachments, vec![PathBuf::from("/tmp/leads.csv")]);
    }

    #[tokio::test]
    async fn marker_already_echoed_is_not_duplicated() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response("call_1", "recorder", json!({})),
            text_response("Here you go: [SEND_FILE:/tmp/leads.csv]"),
        ]));
        let h = harness(provider, "Done.\n[SEND_FILE:/tmp/leads.csv]");
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "export").await;
        assert_eq!(reply.text, "Here you go: [SEND_FILE:/tmp/leads.csv]");
        assert_eq!(reply.attachments.len(), 1);
    }

    #[tokio::test]
    async fn timeout_gets_the_fixed_apology_and_persists_nothing() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Timeout(
            "deadline exceeded".into(),
        ))]));
        let h = harness(provider, "unused");
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "slow query").await;
        assert_eq!(reply.text, "The request took too long. Please try a simpler query.");
        assert!(h.store.load(&user, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_provider_errors_are_reported_generically() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        })]));
        let h = harness(provider, "unused");
        let user = UserId::new("u1");

        let reply = h.runner.process_turn(&user, "hi").await;
        assert!(reply.text.starts_with("An error occurred:"));
        assert!(reply.text.contains("upstream exploded"));
    }

    #[tokio::test]
    async fn history_is_loaded_into_the_request_window() {
        let store = Arc::new(InMemoryStore::new());
        let user = UserId::new("u1");
        store
            .append(&user, &[Turn::user("earlier"), Turn::assistant("noted")])
            .await
            .unwrap();

        let provider = Arc::new(ScriptedProvider::new(vec![text_response("ok")]));
        let runner = AgentRunner::new(
            provider,
            store.clone(),
            Arc::new(ToolRegistry::new()),
            Arc::new(EventBus::default()),
            LoopParams::default(),
        );

        runner.process_turn(&user, "and now?").await;
        // 2 old + user + assistant
        assert_eq!(store.load(&user, 50).await.unwrap().len(), 4);
    }
}
