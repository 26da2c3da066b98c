#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use marquee_app::{Orchestrator, Services};
use marquee_domain::{
    ChatCompletion, ChatRequest, CompletionService, Environment, Error, RetryConfig, ToolCall,
};
use marquee_infra::{InMemoryHistory, MemoryStore, RhaiSandbox};
use serde_json::{Value, json};

/// One scripted completion outcome.
pub enum Reply {
    Completion(ChatCompletion),
    Retryable,
    Failure,
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Completion(ChatCompletion::text(text))
    }

    pub fn tool_call(id: &str, name: &str, arguments: Value) -> Self {
        Reply::Completion(
            ChatCompletion::default()
                .tool_calls(vec![ToolCall::new(id, name).arguments(arguments.to_string())]),
        )
    }
}

/// Completion service that replays replies in order and records requests.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self { replies: Mutex::new(replies.into()), requests: Mutex::default() }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CompletionService for ScriptedCompletion {
    async fn chat(&self, request: ChatRequest) -> anyhow::Result<ChatCompletion> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Completion(completion)) => Ok(completion),
            Some(Reply::Retryable) => Err(Error::Retryable(anyhow::anyhow!("503 Service Unavailable")).into()),
            Some(Reply::Failure) => Err(anyhow::anyhow!("400 Bad Request")),
            None => Err(anyhow::anyhow!("No scripted reply left")),
        }
    }
}

pub struct TestServices {
    pub completion: ScriptedCompletion,
    pub store: MemoryStore,
    pub history: InMemoryHistory,
    pub sandbox: RhaiSandbox,
}

impl Services for TestServices {
    type Completion = ScriptedCompletion;
    type Store = MemoryStore;
    type History = InMemoryHistory;
    type Sandbox = RhaiSandbox;

    fn completion(&self) -> &Self::Completion {
        &self.completion
    }

    fn store(&self) -> &Self::Store {
        &self.store
    }

    fn history(&self) -> &Self::History {
        &self.history
    }

    fn sandbox(&self) -> &Self::Sandbox {
        &self.sandbox
    }
}

pub fn movies() -> Vec<Value> {
    vec![
        json!({
            "_id": {"$oid": "573a1398f29313caabceb500"},
            "title": "Heat",
            "year": 1995,
            "genres": ["Action", "Crime", "Drama"],
            "cast": ["Al Pacino", "Robert De Niro", "Val Kilmer"],
            "released": {"$date": "1995-12-15T00:00:00Z"},
            "imdb": {"rating": 8.2, "votes": 400000},
            "plot": "A group of professional bank robbers feel the heat from police."
        }),
        json!({
            "_id": {"$oid": "573a1398f29313caabceb501"},
            "title": "Casino",
            "year": 1995,
            "genres": ["Crime", "Drama"],
            "cast": ["Robert De Niro", "Sharon Stone", "Joe Pesci"],
            "released": {"$date": "1995-11-22T00:00:00Z"},
            "imdb": {"rating": 8.2, "votes": 350000}
        }),
        json!({
            "_id": {"$oid": "573a1398f29313caabceb502"},
            "title": "The Insider",
            "year": 1999,
            "genres": ["Biography", "Drama"],
            "cast": ["Al Pacino", "Russell Crowe"],
            "released": {"$date": "1999-11-05T00:00:00Z"},
            "imdb": {"rating": 7.8, "votes": 150000},
            "plot": "A research chemist comes under attack after he decides to appear in a 60 Minutes expose."
        }),
        json!({
            "_id": {"$oid": "573a1398f29313caabceb503"},
            "title": "Scarface",
            "year": 1983,
            "genres": ["Crime", "Drama"],
            "cast": ["Al Pacino", "Michelle Pfeiffer"],
            "released": {"$date": "1983-12-09T00:00:00Z"},
            "imdb": {"rating": 8.3, "votes": 700000},
            "plot": null
        }),
    ]
}

pub fn environment() -> Environment {
    Environment::default().retry_config(RetryConfig::default().min_delay_ms(1u64))
}

pub struct Fixture {
    pub services: Arc<TestServices>,
    pub orchestrator: Orchestrator<TestServices>,
}

pub fn services(replies: Vec<Reply>) -> Arc<TestServices> {
    Arc::new(TestServices {
        completion: ScriptedCompletion::new(replies),
        store: MemoryStore::new(movies()),
        history: InMemoryHistory::new(),
        sandbox: RhaiSandbox::default(),
    })
}

impl Fixture {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self::with_environment(replies, environment())
    }

    pub fn with_environment(replies: Vec<Reply>, environment: Environment) -> Self {
        let services = services(replies);
        let orchestrator = Orchestrator::new(services.clone(), environment).unwrap();
        Self { services, orchestrator }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.services.completion.requests()
    }
}
