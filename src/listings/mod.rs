//! Listings
//!
//! The reusable demonstration code behind the examples: a chat completion
//! client, embedding helpers, an in-memory vector collection, a cross-encoder
//! reranker, and a scalar backpropagation walkthrough.

pub mod backprop;
pub mod chat;
pub mod embeddings;
pub mod rerank;
pub mod vectordb;
