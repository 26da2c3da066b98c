use dashmap::DashMap;
use marquee_domain::{ChatMessage, HistoryKind, HistoryStore, SessionId};

/// Process-lifetime chat history.
#[derive(Default)]
pub struct InMemoryHistory {
    entries: DashMap<(SessionId, HistoryKind), Vec<ChatMessage>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistory {
    async fn read(&self, session: &SessionId, kind: HistoryKind) -> Vec<ChatMessage> {
        self.entries
            .get(&(session.clone(), kind))
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    async fn append(&self, session: &SessionId, kind: HistoryKind, messages: Vec<ChatMessage>) {
        self.entries
            .entry((session.clone(), kind))
            .or_default()
            .extend(messages);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_history_is_keyed_by_session_and_kind() {
        let fixture = InMemoryHistory::new();
        let a = SessionId::new("a");
        let b = SessionId::new("b");

        fixture
            .append(&a, HistoryKind::Router, vec![ChatMessage::user("q1"), ChatMessage::assistant("Movies")])
            .await;
        fixture
            .append(&a, HistoryKind::Router, vec![ChatMessage::user("q2")])
            .await;
        fixture
            .append(&b, HistoryKind::Translator, vec![ChatMessage::user("other")])
            .await;

        let actual = fixture.read(&a, HistoryKind::Router).await;
        let expected = vec![
            ChatMessage::user("q1"),
            ChatMessage::assistant("Movies"),
            ChatMessage::user("q2"),
        ];
        assert_eq!(actual, expected);
        assert!(fixture.read(&a, HistoryKind::Translator).await.is_empty());
        assert_eq!(fixture.read(&b, HistoryKind::Translator).await.len(), 1);
    }
}
