//! ReAct loop: alternate model turns and tool observations until a final
//! answer or an exhaustion limit.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::parser::{parse_decision, AgentDecision};
use crate::core::config::service::get_u64;
use crate::core::errors::AppError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::prompts;
use crate::tools::ToolRegistry;

const STOPPED_MESSAGE: &str = "Agent stopped due to iteration limit or time limit. \
                               The observations gathered so far may be incomplete.";

/// One completed tool invocation inside a run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    pub thought: Option<String>,
    pub tool: String,
    pub input: String,
    pub observation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    pub output: String,
    pub steps: Vec<AgentStep>,
}

pub struct AgentExecutor {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    timeout: Duration,
    config: Value,
}

impl AgentExecutor {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: &Value) -> Self {
        Self {
            provider,
            tools,
            max_iterations: get_u64(config, &["agent", "max_iterations"], 10).max(1) as usize,
            timeout: Duration::from_secs(get_u64(config, &["agent", "timeout_secs"], 120).max(1)),
            config: config.clone(),
        }
    }

    /// Answer a question. Exhausting the iteration budget or the wall-clock
    /// budget is not an error; the caller gets a stop message plus whatever
    /// steps completed.
    pub async fn run(&self, question: &str) -> Result<AgentOutcome, AppError> {
        let mut steps = Vec::new();

        match tokio::time::timeout(self.timeout, self.run_loop(question, &mut steps)).await {
            Ok(Ok(Some(answer))) => Ok(AgentOutcome {
                output: answer,
                steps,
            }),
            Ok(Ok(None)) => {
                tracing::warn!("Agent hit the iteration limit ({})", self.max_iterations);
                Ok(AgentOutcome {
                    output: STOPPED_MESSAGE.to_string(),
                    steps,
                })
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                tracing::warn!("Agent timed out after {:?}", self.timeout);
                Ok(AgentOutcome {
                    output: STOPPED_MESSAGE.to_string(),
                    steps,
                })
            }
        }
    }

    /// Returns Ok(Some(answer)) on a final answer, Ok(None) on iteration
    /// exhaustion.
    async fn run_loop(
        &self,
        question: &str,
        steps: &mut Vec<AgentStep>,
    ) -> Result<Option<String>, AppError> {
        let system_prompt =
            prompts::react_system_prompt(&self.tools.descriptions_block(), &self.tools.names());

        let mut messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(question.to_string()),
        ];

        for iteration in 0..self.max_iterations {
            let mut request = ChatRequest::new(messages.clone()).with_settings(&self.config);
            request.stop = Some(vec!["Observation:".to_string()]);

            let response = self.provider.chat(request).await?;
            tracing::debug!("Agent turn {}: {}", iteration + 1, response);
            messages.push(ChatMessage::assistant(response.clone()));

            match parse_decision(&response) {
                Ok(AgentDecision::Final { answer }) => {
                    return Ok(Some(answer));
                }
                Ok(AgentDecision::ToolCall {
                    thought,
                    tool,
                    input,
                }) => {
                    tracing::info!("Agent calls {} with input: {}", tool, input);
                    let observation = self.tools.dispatch(&tool, &input).await;

                    messages.push(ChatMessage::user(format!("Observation: {}", observation)));
                    steps.push(AgentStep {
                        thought,
                        tool,
                        input,
                        observation,
                    });
                }
                Err(failure) => {
                    tracing::warn!("Unparseable agent turn: {}", failure.feedback);
                    messages.push(ChatMessage::user(format!(
                        "Observation: {}",
                        failure.feedback
                    )));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::tools::Tool;

    struct ScriptedProvider {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool, AppError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest) -> Result<String, AppError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AppError::Internal("script exhausted".to_string()))
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
            Ok(inputs.iter().map(|_| vec![0.0]).collect())
        }
    }

    struct StubSearch;

    #[async_trait]
    impl Tool for StubSearch {
        fn name(&self) -> &str {
            "vectordb_search"
        }

        fn description(&self) -> &str {
            "stub search"
        }

        async fn call(&self, _input: &str) -> Result<String, AppError> {
            Ok("Cu(Mg) resistivity: 2.0uOhm-cm [a.pdf p.3]".to_string())
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StubSearch));
        Arc::new(registry)
    }

    fn config(max_iterations: u64) -> Value {
        json!({ "agent": { "max_iterations": max_iterations, "timeout_secs": 30 } })
    }

    #[tokio::test]
    async fn answers_after_a_tool_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            "Thought: check the papers.\nAction: vectordb_search\nAction Input: Cu-Mg resistivity",
            "Thought: found it.\nFinal Answer: Cu(Mg) resistivity is 2.0uOhm-cm.",
        ]));
        let executor = AgentExecutor::new(provider, registry(), &config(10));

        let outcome = executor.run("Resistivity of Cu-Mg?").await.unwrap();
        assert_eq!(outcome.output, "Cu(Mg) resistivity is 2.0uOhm-cm.");
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].tool, "vectordb_search");
        assert!(outcome.steps[0].observation.contains("2.0uOhm-cm"));
    }

    #[tokio::test]
    async fn direct_final_answer_needs_no_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            "Thought: trivial.\nFinal Answer: Copper is a metal.",
        ]));
        let executor = AgentExecutor::new(provider, registry(), &config(10));

        let outcome = executor.run("Is copper a metal?").await.unwrap();
        assert_eq!(outcome.output, "Copper is a metal.");
        assert!(outcome.steps.is_empty());
    }

    #[tokio::test]
    async fn recovers_from_an_unparseable_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            "Let me think about copper without any structure.",
            "Final Answer: recovered.",
        ]));
        let executor = AgentExecutor::new(provider, registry(), &config(10));

        let outcome = executor.run("q").await.unwrap();
        assert_eq!(outcome.output, "recovered.");
    }

    #[tokio::test]
    async fn iteration_limit_returns_stop_message_with_steps() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            "Action: vectordb_search\nAction Input: first",
            "Action: vectordb_search\nAction Input: second",
        ]));
        let executor = AgentExecutor::new(provider, registry(), &config(2));

        let outcome = executor.run("q").await.unwrap();
        assert!(outcome.output.contains("Agent stopped"));
        assert_eq!(outcome.steps.len(), 2);
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let executor = AgentExecutor::new(provider, registry(), &config(3));

        let err = executor.run("q").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
