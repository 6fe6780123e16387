//! Text embeddings
//!
//! Embeddings come from two places in these examples: the OpenAI
//! `/v1/embeddings` endpoint and a local ONNX sentence-embedding model. Both
//! sit behind the [`Embedder`] trait so the vector collection can embed
//! documents without caring which one it was given. The rest of the module is
//! display and analysis plumbing: cosine similarity, per-vector stats, a JSON
//! cache for previously computed embeddings, and a 2-D projection rendered as
//! an HTML scatter plot.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::error;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

const POWER_ITERATIONS: usize = 64;

pub trait Embedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingItem {
    pub index: usize,
    pub embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct EmbeddingClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: String::from(base_url.trim_end_matches('/')),
            api_key: String::from(api_key),
            model: String::from(model),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        Ok(Self::new(
            "https://api.openai.com/v1",
            &api_key,
            DEFAULT_EMBEDDING_MODEL,
        ))
    }

    /// Embeds `texts` with an explicit model. The failure path is logged
    /// before the error is re-raised to the caller.
    pub fn embed_with_model(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        self.request(texts, model)
            .inspect_err(|err| error!(%err, model, "embedding request failed"))
    }

    fn request(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let response: EmbeddingResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model,
                input: texts,
            })
            .send()?
            .error_for_status()?
            .json()?;

        // the API is allowed to return items out of order
        let mut items = response.data;
        items.sort_by_key(|item| item.index);
        ensure!(
            items.len() == texts.len(),
            "expected {} embeddings, got {}",
            texts.len(),
            items.len()
        );
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }
}

impl Embedder for EmbeddingClient {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_with_model(texts, &self.model)
    }
}

/// Multilingual sentence embedder running locally via ONNX. The model is
/// downloaded on first use and produces L2-normalized vectors.
pub struct LocalEmbedder {
    model: TextEmbedding,
}

impl LocalEmbedder {
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::MultilingualE5Small).with_show_download_progress(true),
        )?;
        Ok(Self { model })
    }
}

impl Embedder for LocalEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.model.embed(texts.to_vec(), None)?)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let denom = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    a.dot(&b) / denom
}

/// Summary numbers printed next to each embedding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorStats {
    pub norm: f32,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

pub fn vector_stats(v: &[f32]) -> VectorStats {
    let view = ArrayView1::from(v);
    VectorStats {
        norm: view.dot(&view).sqrt(),
        min: v.iter().copied().fold(f32::INFINITY, f32::min),
        max: v.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        mean: view.mean().unwrap_or(0.0),
    }
}

/// Embeddings persisted between runs of the projection example. The cache is
/// only trusted when both the texts and the categories match what was stored.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingCache {
    pub texts: Vec<String>,
    pub categories: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
}

impl EmbeddingCache {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Returns the cached embeddings when the stored inputs match, `None`
    /// when there is no cache or the inputs changed.
    pub fn load(path: &Path, texts: &[String], categories: &[String]) -> Result<Option<Vec<Vec<f32>>>> {
        if !path.exists() {
            return Ok(None);
        }
        let cache: EmbeddingCache = serde_json::from_str(&fs::read_to_string(path)?)?;
        if cache.texts == texts && cache.categories == categories {
            Ok(Some(cache.embeddings))
        } else {
            Ok(None)
        }
    }
}

/// Projects the embeddings onto their top two principal components.
///
/// Power iteration with deflation, deterministic start vector, so repeated
/// runs over the same cache produce the same picture.
pub fn project_2d(embeddings: &[Vec<f32>]) -> Result<Vec<[f32; 2]>> {
    let rows = embeddings.len();
    if rows < 2 {
        bail!("need at least two embeddings to project");
    }
    let cols = embeddings[0].len();
    ensure!(
        embeddings.iter().all(|e| e.len() == cols),
        "embeddings must share a dimension"
    );

    let flat: Vec<f32> = embeddings.iter().flatten().copied().collect();
    let mut data = Array2::from_shape_vec((rows, cols), flat)?;
    let mean = data
        .mean_axis(Axis(0))
        .ok_or_else(|| anyhow!("empty embedding matrix"))?;
    data -= &mean;

    let first = principal_direction(&data, None);
    let second = principal_direction(&data, Some(&first));

    Ok(data
        .rows()
        .into_iter()
        .map(|row| [row.dot(&first), row.dot(&second)])
        .collect())
}

fn principal_direction(data: &Array2<f32>, orthogonal_to: Option<&Array1<f32>>) -> Array1<f32> {
    let cols = data.ncols();
    let mut v = Array1::from_shape_fn(cols, |i| 1.0 + i as f32 / cols as f32);
    normalize(&mut v);
    for _ in 0..POWER_ITERATIONS {
        let mut next = data.t().dot(&data.dot(&v));
        if let Some(prev) = orthogonal_to {
            let along = next.dot(prev);
            next.scaled_add(-along, prev);
        }
        normalize(&mut next);
        v = next;
    }
    v
}

fn normalize(v: &mut Array1<f32>) {
    let norm = v.dot(v).sqrt();
    if norm > 0.0 {
        *v /= norm;
    }
}

/// Writes the projected points as a scatter plot, one trace per category,
/// to a self-contained HTML file.
pub fn render_projection(
    points: &[[f32; 2]],
    texts: &[String],
    categories: &[String],
    path: &Path,
) -> Result<()> {
    use plotly::common::{Mode, Title};
    use plotly::{Layout, Plot, Scatter};

    ensure!(
        points.len() == texts.len() && texts.len() == categories.len(),
        "points, texts, and categories must line up"
    );

    let mut ordered: Vec<String> = Vec::new();
    for category in categories {
        if !ordered.contains(category) {
            ordered.push(category.clone());
        }
    }

    let mut plot = Plot::new();
    for category in &ordered {
        let indices: Vec<usize> = categories.iter().positions(|c| c == category).collect();
        let xs: Vec<f64> = indices.iter().map(|&i| f64::from(points[i][0])).collect();
        let ys: Vec<f64> = indices.iter().map(|&i| f64::from(points[i][1])).collect();
        let labels: Vec<String> = indices.iter().map(|&i| point_label(&texts[i])).collect();
        plot.add_trace(
            Scatter::new(xs, ys)
                .name(category)
                .mode(Mode::Markers)
                .text_array(labels),
        );
    }
    plot.set_layout(
        Layout::new().title(Title::with_text("Semantic clustering of example sentences")),
    );

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    plot.write_html(path);
    Ok(())
}

fn point_label(text: &str) -> String {
    const MAX: usize = 25;
    if text.chars().count() > MAX {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    } else {
        String::from(text)
    }
}
