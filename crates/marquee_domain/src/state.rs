use derive_setters::Setters;
use serde::{Deserialize, Serialize};

use crate::{ChartArtifact, Intent, ResultDocument, SessionId};

/// Everything known about the turn being processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session: SessionId,
    pub question: String,
    pub intent: Option<Intent>,
    pub rephrased_question: Option<String>,
    pub documents: Option<Vec<ResultDocument>>,
    pub answer: Option<String>,
    pub chart: Option<ChartArtifact>,
}

/// Partial state produced by one node.
#[derive(Debug, Clone, Default, PartialEq, Setters)]
#[setters(into, strip_option)]
pub struct StateUpdate {
    pub intent: Option<Intent>,
    pub rephrased_question: Option<String>,
    pub documents: Option<Vec<ResultDocument>>,
    pub answer: Option<String>,
    pub chart: Option<ChartArtifact>,
}

impl ConversationState {
    pub fn new(session: SessionId, question: impl Into<String>) -> Self {
        Self { session, question: question.into(), ..Default::default() }
    }

    /// Merges a node's output. Fields that are already set are kept.
    pub fn merge(&mut self, update: StateUpdate) {
        fn first<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        first(&mut self.intent, update.intent);
        first(&mut self.rephrased_question, update.rephrased_question);
        first(&mut self.documents, update.documents);
        first(&mut self.answer, update.answer);
        first(&mut self.chart, update.chart);
    }

    /// The question retrieval should run with.
    pub fn retrieval_question(&self) -> &str {
        self.rephrased_question
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(&self.question)
    }

    pub fn has_output(&self) -> bool {
        self.answer.as_deref().is_some_and(|a| !a.is_empty())
            || self.chart.as_ref().is_some_and(|c| !c.is_empty())
    }
}
