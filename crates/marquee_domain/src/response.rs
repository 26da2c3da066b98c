use serde::{Deserialize, Serialize};

use crate::ChartArtifact;

/// What one turn returns to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub answer: String,
    pub chart: String,
}

impl TurnResponse {
    pub fn new(answer: impl Into<String>, chart: ChartArtifact) -> Self {
        Self { answer: answer.into(), chart: chart.into_string() }
    }

    pub fn has_chart(&self) -> bool {
        !self.chart.is_empty()
    }
}
