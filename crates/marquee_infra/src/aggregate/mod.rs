//! In-process evaluation of aggregation pipelines over JSON documents.

mod error;
mod expr;
mod matcher;
mod stages;
mod value;

pub use error::AggregateError;
use marquee_domain::Pipeline;
use serde_json::Value;

/// Runs every stage of `pipeline` over `docs` in order.
pub fn run(docs: Vec<Value>, pipeline: &Pipeline) -> Result<Vec<Value>, AggregateError> {
    pipeline
        .stages()
        .iter()
        .try_fold(docs, |docs, stage| stages::apply(stage, docs))
}
