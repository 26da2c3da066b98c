use std::sync::Arc;

use chrono::Local;
use marquee_domain::{
    ChatMessage, ChatRequest, Environment, HistoryKind, HistoryStore, IdPolicy, SessionId,
    ToolCall,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::retry::chat_with_retry;
use crate::tools::{MovieTool, NO_CONTEXT_ANSWER, ToolName};
use crate::{Retriever, Services, TemplateEngine};

/// Returned when the model keeps calling tools past the iteration bound.
pub const ITERATION_LIMIT_ANSWER: &str = "Agent stopped due to iteration limit or time limit.";

/// Answers data questions in Markdown, looking movies up through tools.
pub struct AnswerAgent<S> {
    services: Arc<S>,
    environment: Environment,
    templates: TemplateEngine<'static>,
    retriever: Arc<Retriever<S>>,
}

impl<S: Services> AnswerAgent<S> {
    pub fn new(
        services: Arc<S>,
        environment: Environment,
        templates: TemplateEngine<'static>,
        retriever: Arc<Retriever<S>>,
    ) -> Self {
        Self { services, environment, templates, retriever }
    }

    pub async fn answer(&self, session: &SessionId, question: &str) -> anyhow::Result<String> {
        let system = self.templates.render(
            "answer-system.md",
            &json!({
                "present_date": Local::now().format("%Y-%m-%d").to_string(),
                "lookup_tool": ToolName::GetMovies.as_ref(),
                "fallback_tool": ToolName::NotAbleToParse.as_ref(),
            }),
        )?;
        let history = self.services.history().read(session, HistoryKind::Answer).await;

        let mut request = ChatRequest::new(self.environment.model.clone())
            .tools(MovieTool::definitions())
            .add_message(ChatMessage::system(system))
            .add_messages(history)
            .add_message(ChatMessage::user(question));

        let mut answer = None;
        for iteration in 0..self.environment.max_agent_iterations {
            let completion = chat_with_retry(
                self.services.completion(),
                &self.environment.retry_config,
                request.clone(),
            )
            .await?;

            if completion.tool_calls.is_empty() {
                answer = Some(completion.text_or_empty().to_string());
                break;
            }

            debug!(%session, iteration, tool_calls = completion.tool_calls.len(), "Agent requested tools");
            request = request.add_message(completion.to_message());
            for call in &completion.tool_calls {
                let observation = self.call(session, call).await?;
                request = request.add_message(ChatMessage::tool_result(call.id.clone(), observation));
            }
        }

        let answer = answer.unwrap_or_else(|| {
            warn!(%session, limit = self.environment.max_agent_iterations, "Agent reached the iteration limit");
            ITERATION_LIMIT_ANSWER.to_string()
        });

        self.services
            .history()
            .append(
                session,
                HistoryKind::Answer,
                vec![ChatMessage::user(question), ChatMessage::assistant(answer.clone())],
            )
            .await;

        info!(%session, "Answered question");
        Ok(answer)
    }

    /// Executes one tool call. Bad calls become an error observation so the
    /// model can correct itself; retrieval failures end the turn.
    async fn call(&self, session: &SessionId, call: &ToolCall) -> anyhow::Result<String> {
        let tool = match MovieTool::parse(call) {
            Ok(tool) => tool,
            Err(e) => {
                warn!(%session, name = %call.name, arguments = %call.arguments, error = %e, "Invalid tool call");
                return Ok(format!("Error: {e}"));
            }
        };

        match tool {
            MovieTool::GetMovies(input) => {
                info!(%session, query = %input.query, "Looking up movies");
                let documents = self
                    .retriever
                    .retrieve(session, &input.query, IdPolicy::Remove)
                    .await?;
                Ok(serde_json::to_string(&documents)?)
            }
            MovieTool::NotAbleToParse(_) => Ok(NO_CONTEXT_ANSWER.to_string()),
        }
    }
}
