//! Literal-only decoder for model-written aggregation pipelines.
//!
//! Accepts the relaxed object notation language models tend to emit:
//! single or double quoted strings, bare keys, trailing commas, Python style
//! `True`/`False`/`None`, and the `Date("...")`, `ISODate("...")` and
//! `ObjectId("...")` constructors. Nothing is ever executed; anything outside
//! this grammar is rejected.

mod error;
mod lexer;
mod parser;
mod token;

pub use error::{Error, Result};
pub use parser::parse;
