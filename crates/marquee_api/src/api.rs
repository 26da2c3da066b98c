use marquee_domain::{Environment, SessionId, TurnResponse};

#[async_trait::async_trait]
pub trait API: Sync + Send {
    /// Answers one question. Without a session the shared default session is
    /// used.
    async fn ask(&self, session: Option<SessionId>, question: &str) -> anyhow::Result<TurnResponse>;

    /// The configuration the API was started with.
    fn environment(&self) -> &Environment;
}
