//! Cross-encoder reranking
//!
//! A first-pass vector search ranks by embedding similarity, which is fast
//! but approximate. The cross-encoder scores each (query, document) pair
//! directly and reorders the retrieved set by that relevance score.

use std::cmp::Ordering;

use anyhow::Result;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};

/// One reranked hit; `index` points back into the input document slice.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    pub index: usize,
    pub score: f32,
    pub document: String,
}

/// BGE cross-encoder running locally via ONNX; downloaded on first use.
pub struct Reranker {
    model: TextRerank,
}

impl Reranker {
    pub fn new() -> Result<Self> {
        let model = TextRerank::try_new(
            RerankInitOptions::new(RerankerModel::BGERerankerBase).with_show_download_progress(true),
        )?;
        Ok(Self { model })
    }

    /// Scores every (query, document) pair and returns the documents in
    /// descending relevance order.
    pub fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RankedDocument>> {
        let candidates: Vec<&str> = documents.iter().map(|d| d.as_str()).collect();
        let results = self.model.rerank(query, candidates, false, None)?;
        let scores: Vec<(usize, f32)> = results.into_iter().map(|r| (r.index, r.score)).collect();
        Ok(order_by_score(&scores)
            .into_iter()
            .map(|(index, score)| RankedDocument {
                index,
                score,
                document: documents[index].clone(),
            })
            .collect())
    }
}

/// Orders (index, score) pairs by descending score. Ties keep their input
/// order.
pub fn order_by_score(scores: &[(usize, f32)]) -> Vec<(usize, f32)> {
    let mut ranked = scores.to_vec();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
}
