use std::sync::Arc;

use lazy_static::lazy_static;
use marquee_domain::{
    ChartArtifact, ChartSandbox, ChatMessage, ChatRequest, Environment, Error, ResultDocument,
    SchemaDescription,
};
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

use crate::retry::chat_with_retry;
use crate::{Services, TemplateEngine};

const DARK_TEMPLATE: &str = "plotly_dark";
const DARK_BACKGROUND: &str = "#111111";
const LIGHT_FONT: &str = "#f2f5fa";

lazy_static! {
    static ref CODE_BLOCK: Regex = Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap();
}

/// Rephrases a chart request, writes chart code for the retrieved rows and
/// renders it.
pub struct Visualizer<S> {
    services: Arc<S>,
    environment: Environment,
    templates: TemplateEngine<'static>,
}

impl<S: Services> Visualizer<S> {
    pub fn new(services: Arc<S>, environment: Environment, templates: TemplateEngine<'static>) -> Self {
        Self { services, environment, templates }
    }

    /// Rewrites a chart request as a plain data-retrieval question.
    pub async fn rephrase(&self, question: &str, schema: &SchemaDescription) -> anyhow::Result<String> {
        let prompt = self
            .templates
            .render("rephrase.md", &json!({ "question": question, "schema": schema.text }))?;
        let request = ChatRequest::new(self.environment.model.clone())
            .add_message(ChatMessage::user(prompt));

        let completion = chat_with_retry(self.services.completion(), &self.environment.retry_config, request)
            .await
            .map_err(Error::Rephrase)?;

        let rephrased = completion.text_or_empty().trim().trim_matches('"').to_string();
        info!(question, rephrased = %rephrased, "Rephrased chart request");
        Ok(rephrased)
    }

    /// Asks the model for a chart script over `documents`.
    pub async fn synthesize(
        &self,
        documents: &[ResultDocument],
        schema: &SchemaDescription,
        question: &str,
    ) -> anyhow::Result<String> {
        let prompt = self.templates.render(
            "chart-code.md",
            &json!({
                "columns": columns(documents),
                "row_count": documents.len(),
                "sample_record": documents.first().map(ResultDocument::to_value).unwrap_or(Value::Null),
                "schema": schema.text,
                "question": question,
            }),
        )?;
        let request = ChatRequest::new(self.environment.model.clone())
            .add_message(ChatMessage::user(prompt));

        let completion = chat_with_retry(self.services.completion(), &self.environment.retry_config, request)
            .await
            .map_err(Error::Synthesis)?;
        if completion.is_content_filtered() {
            return Err(Error::Synthesis(anyhow::anyhow!("Completion was filtered")).into());
        }

        let code = strip_code_fences(completion.text_or_empty());
        debug!(%code, "Synthesized chart code");
        Ok(code)
    }

    /// Runs chart code against `documents` and serializes the figure.
    pub async fn render(&self, code: &str, documents: &[ResultDocument]) -> Result<ChartArtifact, Error> {
        let data = Value::Array(documents.iter().map(ResultDocument::to_value).collect());
        let figure = self
            .services
            .sandbox()
            .render(code, data)
            .await
            .map_err(|e| Error::Render(format!("{e:#}")))?
            .ok_or_else(|| Error::Render("Chart code did not bind `fig`".to_string()))?;

        let figure = apply_dark_theme(figure)?;
        Ok(ChartArtifact::from_figure(&figure))
    }

    /// Synthesizes and renders a chart. Failures are logged and produce an
    /// empty artifact.
    pub async fn chart(
        &self,
        documents: &[ResultDocument],
        schema: &SchemaDescription,
        question: &str,
    ) -> ChartArtifact {
        if documents.is_empty() {
            info!(question, "No documents to chart");
            return ChartArtifact::empty();
        }

        let code = match self.synthesize(documents, schema, question).await {
            Ok(code) => code,
            Err(e) => {
                error!(question, error = %format!("{e:#}"), "Chart code generation failed");
                return ChartArtifact::empty();
            }
        };

        match self.render(&code, documents).await {
            Ok(chart) => {
                info!(question, rows = documents.len(), "Rendered chart");
                chart
            }
            Err(e) => {
                error!(question, %code, error = %e, "Chart rendering failed");
                ChartArtifact::empty()
            }
        }
    }
}

/// Field names across `documents` in first-seen order.
fn columns(documents: &[ResultDocument]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for key in documents.iter().flat_map(|document| document.keys()) {
        if !columns.contains(key) {
            columns.push(key.clone());
        }
    }
    columns
}

fn strip_code_fences(text: &str) -> String {
    let code = match CODE_BLOCK.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    };
    code.trim().to_string()
}

/// Gives the figure the dark look unless it already names a template.
fn apply_dark_theme(figure: Value) -> Result<Value, Error> {
    let Value::Object(mut figure) = figure else {
        return Err(Error::Render("Figure must be an object map".to_string()));
    };

    let layout = figure
        .entry("layout")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(layout) = layout else {
        return Err(Error::Render("Figure layout must be an object map".to_string()));
    };

    if layout.contains_key("template") {
        return Ok(Value::Object(figure));
    }
    layout.insert("template".to_string(), json!(DARK_TEMPLATE));
    layout
        .entry("paper_bgcolor")
        .or_insert_with(|| json!(DARK_BACKGROUND));
    layout
        .entry("plot_bgcolor")
        .or_insert_with(|| json!(DARK_BACKGROUND));
    layout
        .entry("font")
        .or_insert_with(|| json!({ "color": LIGHT_FONT }));
    warn!("Chart code did not set a template, applied the dark theme");
    Ok(Value::Object(figure))
}
