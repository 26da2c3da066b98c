mod answer;
mod orch;
mod retriever;
mod retry;
mod router;
mod sanitizer;
mod services;
mod template_engine;
mod tools;
mod translator;
mod visualization;

pub use answer::*;
pub use orch::*;
pub use retriever::*;
pub use retry::*;
pub use router::*;
pub use sanitizer::*;
pub use services::*;
pub use template_engine::*;
pub use tools::*;
pub use translator::*;
pub use visualization::*;
