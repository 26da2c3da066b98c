mod aggregate;
mod env;
mod history;
mod memory_store;
#[cfg(feature = "mongodb")]
mod mongo_store;
mod sandbox;

pub use aggregate::AggregateError;
pub use env::EnvironmentService;
pub use history::InMemoryHistory;
pub use memory_store::MemoryStore;
#[cfg(feature = "mongodb")]
pub use mongo_store::MongoStore;
pub use sandbox::{RhaiSandbox, SandboxLimits};
