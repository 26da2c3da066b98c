mod chart;
mod chat;
mod date;
mod document;
mod env;
mod error;
mod history;
mod intent;
mod pipeline;
mod response;
mod retry_config;
mod schema;
mod services;
mod state;

pub use chart::*;
pub use chat::*;
pub use date::*;
pub use document::*;
pub use env::*;
pub use error::*;
pub use history::*;
pub use intent::*;
pub use pipeline::*;
pub use response::*;
pub use retry_config::*;
pub use schema::*;
pub use services::*;
pub use state::*;
