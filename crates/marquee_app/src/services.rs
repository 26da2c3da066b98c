use marquee_domain::{ChartSandbox, CompletionService, DocumentStore, HistoryStore};

/// The infrastructure a conversation runs on.
pub trait Services: Send + Sync + 'static {
    type Completion: CompletionService;
    type Store: DocumentStore;
    type History: HistoryStore;
    type Sandbox: ChartSandbox;

    fn completion(&self) -> &Self::Completion;
    fn store(&self) -> &Self::Store;
    fn history(&self) -> &Self::History;
    fn sandbox(&self) -> &Self::Sandbox;
}
