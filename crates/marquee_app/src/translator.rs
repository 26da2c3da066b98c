use std::sync::Arc;

use marquee_domain::{
    ChatMessage, ChatRequest, Environment, Error, FewShotExamples, HistoryKind, HistoryStore,
    SchemaDescription, SessionId,
};
use serde_json::json;
use tracing::debug;

use crate::retry::chat_with_retry;
use crate::{Services, TemplateEngine};

/// Turns a question into the raw text of an aggregation pipeline.
pub struct Translator<S> {
    services: Arc<S>,
    environment: Environment,
    templates: TemplateEngine<'static>,
}

impl<S: Services> Translator<S> {
    pub fn new(services: Arc<S>, environment: Environment, templates: TemplateEngine<'static>) -> Self {
        Self { services, environment, templates }
    }

    /// Returns the model output unmodified; see [`crate::sanitize`] for
    /// turning it into a pipeline.
    pub async fn translate(
        &self,
        session: &SessionId,
        question: &str,
        schema: &SchemaDescription,
        examples: &FewShotExamples,
    ) -> anyhow::Result<String> {
        let system = self.templates.render(
            "translator-system.md",
            &json!({
                "collection": schema.collection,
                "schema": schema.text,
                "examples": examples,
                "limit": self.environment.result_limit,
            }),
        )?;
        let history = self.services.history().read(session, HistoryKind::Translator).await;

        let request = ChatRequest::new(self.environment.model.clone())
            .add_message(ChatMessage::system(system))
            .add_messages(history)
            .add_message(ChatMessage::user(question));

        let completion = chat_with_retry(
            self.services.completion(),
            &self.environment.retry_config,
            request,
        )
        .await
        .map_err(Error::Translation)?;

        let raw = completion.text_or_empty().to_string();
        debug!(%session, question, pipeline = %raw, "Translated question");

        self.services
            .history()
            .append(
                session,
                HistoryKind::Translator,
                vec![ChatMessage::user(question), ChatMessage::assistant(raw.clone())],
            )
            .await;

        Ok(raw)
    }
}
