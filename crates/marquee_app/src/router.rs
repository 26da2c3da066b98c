use std::sync::Arc;

use marquee_domain::{
    ChatMessage, ChatRequest, Environment, Error, HistoryKind, HistoryStore, Intent, SessionId,
};
use serde_json::json;
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::retry::chat_with_retry;
use crate::{Services, TemplateEngine};

/// Classifies a question into the [`Intent`] that decides how it is handled.
pub struct Router<S> {
    services: Arc<S>,
    environment: Environment,
    templates: TemplateEngine<'static>,
}

impl<S: Services> Router<S> {
    pub fn new(services: Arc<S>, environment: Environment, templates: TemplateEngine<'static>) -> Self {
        Self { services, environment, templates }
    }

    /// Unknown labels and filtered completions resolve to
    /// [`Intent::NoContext`]; only a failed completion is an error.
    pub async fn classify(&self, session: &SessionId, question: &str) -> anyhow::Result<Intent> {
        let options = Intent::iter().map(|intent| intent.label()).collect::<Vec<_>>();
        let system = self.templates.render("router-system.md", &json!({ "options": options }))?;
        let history = self.services.history().read(session, HistoryKind::Router).await;

        let request = ChatRequest::new(self.environment.router_model.clone())
            .add_message(ChatMessage::system(system))
            .add_messages(history)
            .add_message(ChatMessage::user(question));

        let completion = chat_with_retry(
            self.services.completion(),
            &self.environment.retry_config,
            request,
        )
        .await
        .map_err(Error::Classification)?;

        let intent = if completion.is_content_filtered() {
            warn!(%session, "Router completion was filtered by the content policy");
            Intent::NoContext
        } else {
            Intent::parse_label(completion.text_or_empty())
        };

        self.services
            .history()
            .append(
                session,
                HistoryKind::Router,
                vec![ChatMessage::user(question), ChatMessage::assistant(intent.label())],
            )
            .await;

        info!(%session, %intent, "Routed question");
        Ok(intent)
    }
}
