mod api;
mod marquee_api;
mod services;

pub use api::*;
pub use marquee_api::*;
pub use services::*;
