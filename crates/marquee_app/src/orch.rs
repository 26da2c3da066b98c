// Tests for this module can be found in: tests/orch_*.rs
use std::collections::HashMap;
use std::sync::Arc;

use derive_more::Display;
use marquee_domain::{
    ChartArtifact, ConversationState, Environment, Error, IdPolicy, Intent, SessionId,
    StateUpdate, TurnResponse,
};
use tracing::{debug, info};

use crate::{AnswerAgent, Retriever, Router, Services, TemplateEngine, Visualizer};

pub const FALLBACK_ANSWER: &str = "Unable to process the query. Could you provide more information?";
pub const NO_CONTEXT_REPLY: &str =
    "I'm sorry, I don't understand the question. Please provide more context or rephrase your question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Node {
    Router,
    DataQueryAnswer,
    Rephrase,
    Retrieve,
    Synthesize,
    Help,
    NoContext,
}

/// Where control goes after a node.
#[derive(Clone, Copy)]
pub enum Edge {
    Direct(Node),
    Conditional(fn(&ConversationState) -> Node),
    End,
}

/// Nodes and the edges between them. Nodes without an outgoing edge end the
/// turn.
#[derive(Clone)]
pub struct Graph {
    entry: Node,
    edges: HashMap<Node, Edge>,
}

impl Graph {
    pub fn new(entry: Node) -> Self {
        Self { entry, edges: HashMap::new() }
    }

    pub fn edge(mut self, from: Node, to: Node) -> Self {
        self.edges.insert(from, Edge::Direct(to));
        self
    }

    pub fn conditional(mut self, from: Node, route: fn(&ConversationState) -> Node) -> Self {
        self.edges.insert(from, Edge::Conditional(route));
        self
    }

    pub fn finish(mut self, node: Node) -> Self {
        self.edges.insert(node, Edge::End);
        self
    }

    pub fn entry(&self) -> Node {
        self.entry
    }

    pub fn next(&self, node: Node, state: &ConversationState) -> Option<Node> {
        match self.edges.get(&node)? {
            Edge::Direct(to) => Some(*to),
            Edge::Conditional(route) => Some(route(state)),
            Edge::End => None,
        }
    }

    /// Router, then one branch per intent.
    pub fn movies() -> Self {
        Graph::new(Node::Router)
            .conditional(Node::Router, route_intent)
            .edge(Node::Rephrase, Node::Retrieve)
            .edge(Node::Retrieve, Node::Synthesize)
            .finish(Node::Synthesize)
            .finish(Node::DataQueryAnswer)
            .finish(Node::Help)
            .finish(Node::NoContext)
    }
}

fn route_intent(state: &ConversationState) -> Node {
    match state.intent {
        Some(Intent::DataQuery) => Node::DataQueryAnswer,
        Some(Intent::Visualization) => Node::Rephrase,
        Some(Intent::Help) => Node::Help,
        Some(Intent::NoContext) | None => Node::NoContext,
    }
}

/// Drives a [`Graph`] for one question at a time.
pub struct Orchestrator<S> {
    environment: Environment,
    graph: Graph,
    help: String,
    router: Router<S>,
    retriever: Arc<Retriever<S>>,
    answer: AnswerAgent<S>,
    visualizer: Visualizer<S>,
}

impl<S: Services> Orchestrator<S> {
    pub fn new(services: Arc<S>, environment: Environment) -> anyhow::Result<Self> {
        let templates = TemplateEngine::default();
        let help = templates.render("help.md", &serde_json::json!({}))?;
        let retriever = Arc::new(Retriever::new(services.clone(), environment.clone(), templates.clone()));
        Ok(Self {
            graph: Graph::movies(),
            help,
            router: Router::new(services.clone(), environment.clone(), templates.clone()),
            answer: AnswerAgent::new(services.clone(), environment.clone(), templates.clone(), retriever.clone()),
            visualizer: Visualizer::new(services, environment.clone(), templates),
            retriever,
            environment,
        })
    }

    /// Replaces the graph the orchestrator walks.
    pub fn graph(mut self, graph: Graph) -> Self {
        self.graph = graph;
        self
    }

    pub async fn invoke(&self, question: &str) -> anyhow::Result<TurnResponse> {
        self.invoke_in_session(&SessionId::default(), question).await
    }

    pub async fn invoke_in_session(
        &self,
        session: &SessionId,
        question: &str,
    ) -> anyhow::Result<TurnResponse> {
        let mut state = ConversationState::new(session.clone(), question);
        let limit = self.environment.max_steps;
        let mut steps = 0;
        let mut node = Some(self.graph.entry());

        while let Some(current) = node {
            if steps >= limit {
                return Err(Error::StepLimitExceeded { limit }.into());
            }
            steps += 1;

            debug!(%session, node = %current, step = steps, "Running node");
            let update = self.execute(current, &state).await?;
            state.merge(update);
            node = self.graph.next(current, &state);
        }

        info!(%session, steps, has_output = state.has_output(), "Turn finished");
        Ok(response(state))
    }

    async fn execute(&self, node: Node, state: &ConversationState) -> anyhow::Result<StateUpdate> {
        let update = StateUpdate::default();
        Ok(match node {
            Node::Router => update.intent(self.router.classify(&state.session, &state.question).await?),
            Node::DataQueryAnswer => {
                update.answer(self.answer.answer(&state.session, &state.question).await?)
            }
            Node::Rephrase => update.rephrased_question(
                self.visualizer
                    .rephrase(&state.question, self.retriever.schema())
                    .await?,
            ),
            Node::Retrieve => update.documents(
                self.retriever
                    .retrieve(&state.session, state.retrieval_question(), IdPolicy::Stringify)
                    .await?,
            ),
            Node::Synthesize => {
                let documents = state.documents.as_deref().unwrap_or_default();
                update.chart(
                    self.visualizer
                        .chart(documents, self.retriever.schema(), &state.question)
                        .await,
                )
            }
            Node::Help => update.answer(self.help.clone()),
            Node::NoContext => update.answer(NO_CONTEXT_REPLY),
        })
    }
}

fn response(state: ConversationState) -> TurnResponse {
    let chart = state.chart.unwrap_or_else(ChartArtifact::empty);
    let answer = state.answer.unwrap_or_default();
    if answer.is_empty() && chart.is_empty() {
        return TurnResponse::new(FALLBACK_ANSWER, chart);
    }
    TurnResponse::new(answer, chart)
}
