use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider returned status {status}: {message}")]
    InvalidStatusCode { status: u16, message: String },

    #[error("Provider returned no choices")]
    EmptyResponse,

    #[error("Provider error: {0}")]
    Api(String),
}
