//! Examples
//!
//! Runnable demonstrations built on the listings. Each example is a unit
//! struct implementing [`crate::Example`] and is registered in the CLI binary
//! under a dotted id, e.g. `cargo run example 01.03`.

pub mod basics;
pub mod embeddings;
pub mod llm_api;
pub mod vectordb;
