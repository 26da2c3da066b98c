mod client;
mod dto;
mod error;
mod retry;

pub use client::OpenAIProvider;
pub use error::Error;
