use std::sync::Arc;

use dashmap::DashMap;
use marquee_app::{Orchestrator, Services};
use marquee_domain::{Environment, SessionId, TurnResponse};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{API, MarqueeServices};

pub struct MarqueeAPI<S> {
    environment: Environment,
    orchestrator: Orchestrator<S>,
    // Turns of one session run one at a time so its histories stay ordered.
    sessions: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl<S: Services> MarqueeAPI<S> {
    pub fn new(services: Arc<S>, environment: Environment) -> anyhow::Result<Self> {
        let orchestrator = Orchestrator::new(services, environment.clone())?;
        Ok(Self { environment, orchestrator, sessions: DashMap::new() })
    }

    fn session_lock(&self, session: &SessionId) -> Arc<Mutex<()>> {
        self.sessions.entry(session.clone()).or_default().clone()
    }

    /// Drops the session's lock once no turn holds or awaits it.
    fn release(&self, session: &SessionId, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.sessions
            .remove_if(session, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn turn(&self, session: &SessionId, question: &str) -> anyhow::Result<TurnResponse> {
        info!(%session, question, "Received question");
        match self.orchestrator.invoke_in_session(session, question).await {
            Ok(response) => {
                info!(%session, has_chart = response.has_chart(), "Question answered");
                Ok(response)
            }
            Err(e) => {
                error!(%session, error = %format!("{e:#}"), "Question failed");
                Err(e)
            }
        }
    }
}

impl MarqueeAPI<MarqueeServices> {
    pub async fn init(environment: Environment) -> anyhow::Result<Self> {
        let services = Arc::new(MarqueeServices::new(&environment).await?);
        Self::new(services, environment)
    }
}

#[async_trait::async_trait]
impl<S: Services> API for MarqueeAPI<S> {
    async fn ask(&self, session: Option<SessionId>, question: &str) -> anyhow::Result<TurnResponse> {
        let session = session.unwrap_or_default();
        let lock = self.session_lock(&session);
        let result = {
            let _guard = lock.lock().await;
            self.turn(&session, question).await
        };
        self.release(&session, lock);
        result
    }

    fn environment(&self) -> &Environment {
        &self.environment
    }
}
