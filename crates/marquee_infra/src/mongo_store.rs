use anyhow::Context;
use futures::TryStreamExt;
use marquee_domain::{DocumentStore, Pipeline};
use mongodb::bson::{Bson, Document};
use mongodb::{Client, Collection};
use serde_json::Value;
use tracing::{debug, info};

/// Document store backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("Failed to connect to MongoDB")?;
        info!(database, collection, "Connected to MongoDB");
        Ok(Self { collection: client.database(database).collection(collection) })
    }
}

/// Converts a stage from extended JSON into BSON so that `$date` and `$oid`
/// values keep their types.
fn to_document(stage: Value) -> anyhow::Result<Document> {
    match Bson::try_from(stage).context("Stage is not valid extended JSON")? {
        Bson::Document(document) => Ok(document),
        other => anyhow::bail!("Stage must be a document, found {other}"),
    }
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    async fn aggregate(&self, pipeline: &Pipeline) -> anyhow::Result<Vec<Value>> {
        let stages = pipeline
            .stages()
            .iter()
            .cloned()
            .map(|stage| to_document(Value::from(stage)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let cursor = self
            .collection
            .aggregate(stages)
            .await
            .context("Aggregation failed")?;
        let documents: Vec<Document> = cursor.try_collect().await.context("Cursor failed")?;
        debug!(results = documents.len(), "Pipeline evaluated by MongoDB");

        Ok(documents
            .into_iter()
            .map(|document| Bson::Document(document).into_relaxed_extjson())
            .collect())
    }
}
