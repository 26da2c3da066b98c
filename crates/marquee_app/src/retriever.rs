use std::sync::Arc;

use marquee_domain::{
    DocumentStore, Environment, Error, FewShotExamples, IdPolicy, Pipeline, ResultDocument,
    SchemaDescription, SessionId,
};
use tracing::{error, info};

use crate::{Services, TemplateEngine, Translator, sanitize};

/// Answers a question with documents: translate, sanitize, execute.
pub struct Retriever<S> {
    services: Arc<S>,
    environment: Environment,
    translator: Translator<S>,
    schema: SchemaDescription,
    examples: FewShotExamples,
}

impl<S: Services> Retriever<S> {
    pub fn new(services: Arc<S>, environment: Environment, templates: TemplateEngine<'static>) -> Self {
        let translator = Translator::new(services.clone(), environment.clone(), templates);
        Self {
            services,
            environment,
            translator,
            schema: SchemaDescription::movies(),
            examples: FewShotExamples::movies(),
        }
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    pub async fn retrieve(
        &self,
        session: &SessionId,
        question: &str,
        policy: IdPolicy,
    ) -> anyhow::Result<Vec<ResultDocument>> {
        let raw = self
            .translator
            .translate(session, question, &self.schema, &self.examples)
            .await?;
        let pipeline = sanitize(&raw)?;
        self.execute(pipeline, policy).await
    }

    /// Runs `pipeline` with a result limit appended when it has none.
    pub async fn execute(
        &self,
        pipeline: Pipeline,
        policy: IdPolicy,
    ) -> anyhow::Result<Vec<ResultDocument>> {
        let pipeline = pipeline.ensure_limit(self.environment.result_limit);
        let raw = self.services.store().aggregate(&pipeline).await.map_err(|e| {
            error!(%pipeline, error = %format!("{e:#}"), "Pipeline execution failed");
            Error::Execution(e)
        })?;

        info!(%pipeline, count = raw.len(), "Executed pipeline");
        Ok(raw
            .into_iter()
            .map(|document| ResultDocument::from_raw(document, policy))
            .collect())
    }
}
