use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use marquee_domain::{DocumentStore, Pipeline};
use serde_json::Value;
use tracing::{debug, info};

use crate::aggregate;

/// Document store that evaluates pipelines in process.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Vec<Value>>,
}

impl MemoryStore {
    pub fn new(docs: Vec<Value>) -> Self {
        Self { docs: Arc::new(docs) }
    }

    /// Loads a collection from a JSON array or newline-delimited JSON file.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        let docs = parse_dataset(&content)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
        info!(path = %path.display(), documents = docs.len(), "Dataset loaded");
        Ok(Self::new(docs))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn parse_dataset(content: &str) -> anyhow::Result<Vec<Value>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid JSON on line {}", number + 1))
        })
        .collect()
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn aggregate(&self, pipeline: &Pipeline) -> anyhow::Result<Vec<Value>> {
        let docs = self.docs.clone();
        let pipeline = pipeline.clone();
        let results = tokio::task::spawn_blocking(move || {
            aggregate::run(docs.as_ref().clone(), &pipeline)
        })
        .await
        .context("Aggregation task failed")??;
        debug!(results = results.len(), "Pipeline evaluated in memory");
        Ok(results)
    }
}
