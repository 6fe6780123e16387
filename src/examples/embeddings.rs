//! Embedding examples

use crate::Example;
use anyhow::Result;

/// # Local multilingual embeddings
///
/// #### Id
/// 02.01
///
/// #### CLI command
/// ```sh
/// cargo run example 02.01
/// ```
pub struct EG01;

impl Example for EG01 {
    fn description(&self) -> String {
        String::from("Embed a few sentences with a local multilingual model.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::embeddings::{vector_stats, Embedder, LocalEmbedder};
        use itertools::izip;

        println!("Loading the embedding model...");
        let embedder = LocalEmbedder::new()?;
        println!("Model ready.\n");

        let texts = vec![
            String::from("Good morning, how are you today?"),
            String::from("Machine learning turns data into predictions."),
            String::from("좋은 아침입니다, 오늘 기분이 어떠세요?"),
        ];

        println!("Embedding {} sentences...", texts.len());
        let embeddings = embedder.embed(&texts)?;

        println!("Done.");
        println!("Embedding dimension: {}\n", embeddings[0].len());
        for (i, (text, embedding)) in izip!(&texts, &embeddings).enumerate() {
            let head: Vec<String> = embedding
                .iter()
                .take(8)
                .map(|x| format!("{x:.4}"))
                .collect();
            println!("{}. {text}", i + 1);
            println!("   first components: [{}]", head.join(", "));
            println!("   norm: {:.4}\n", vector_stats(embedding).norm);
        }
        Ok(())
    }
}

/// # Remote embeddings and similarity
///
/// #### Id
/// 02.02
///
/// #### CLI command
/// ```sh
/// cargo run example 02.02
/// ```
pub struct EG02;

impl Example for EG02 {
    fn description(&self) -> String {
        String::from("Embed sentence pairs via the OpenAI API and compare their similarity.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::embeddings::{
            cosine_similarity, vector_stats, EmbeddingClient,
        };
        use itertools::izip;

        let client = EmbeddingClient::from_env()?;

        let texts = vec![
            String::from("Hello, world!"),
            String::from("This is a test"),
            String::from("Embeddings are useful"),
            String::from("안녕, 세상아!"),
            String::from("이것은 테스트입니다"),
            String::from("임베딩은 유용합니다"),
        ];

        println!("{}", "=".repeat(60));
        println!("Remote embeddings");
        println!("{}", "=".repeat(60));
        println!("\nSentences to embed: {}", texts.len());
        for (i, text) in texts.iter().enumerate() {
            println!("  {}. {text}", i + 1);
        }

        println!("\nRequesting embeddings...");
        let embeddings = client.embed_with_model(&texts, "text-embedding-3-large")?;

        println!("Received {} vectors", embeddings.len());
        println!("Embedding dimension: {}\n", embeddings[0].len());

        println!("Per-vector stats:");
        for (text, embedding) in izip!(&texts, &embeddings) {
            let stats = vector_stats(embedding);
            println!("  {text}");
            println!(
                "    norm: {:.4}, min: {:.4}, max: {:.4}, mean: {:.4}",
                stats.norm, stats.min, stats.max, stats.mean
            );
        }

        println!("\n{}", "=".repeat(60));
        println!("Pairwise similarity");
        println!("{}", "=".repeat(60));

        // each English sentence against its Korean counterpart, plus two
        // unrelated pairs for contrast
        let pairs = [
            (0_usize, 3_usize),
            (1, 4),
            (2, 5),
            (0, 1),
            (3, 4),
        ];
        for (i, j) in pairs {
            let similarity = cosine_similarity(&embeddings[i], &embeddings[j]);
            println!("{} vs {}: {similarity:.4}", texts[i], texts[j]);
        }
        Ok(())
    }
}

/// # 2-D projection of an embedding set
///
/// #### Id
/// 02.03
///
/// #### CLI command
/// ```sh
/// cargo run example 02.03
/// ```
pub struct EG03;

impl Example for EG03 {
    fn description(&self) -> String {
        String::from("Project cached embeddings to 2-D and render a scatter plot.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::embeddings::{
            project_2d, render_projection, Embedder, EmbeddingCache, EmbeddingClient,
        };
        use std::path::Path;

        let cache_path = Path::new("output/embeddings_2d.json");
        let plot_path = Path::new("output/embeddings_2d.html");

        // sentence groups chosen so that related meanings cluster together
        let groups: [(&str, &[&str]); 4] = [
            (
                "positive_weather",
                &[
                    "Clear skies and sunshine all afternoon",
                    "A warm breeze made the walk delightful",
                    "Not a cloud in sight, perfect picnic weather",
                ],
            ),
            (
                "negative_weather",
                &[
                    "The storm knocked the power out again",
                    "Cold rain has been falling since dawn",
                    "Thick fog swallowed the whole valley",
                ],
            ),
            (
                "positive_food",
                &[
                    "The soup was rich and full of flavor",
                    "Best pastry I have had in years",
                    "Every dish on the menu was a delight",
                ],
            ),
            (
                "negative_food",
                &[
                    "The bread was stale and tasteless",
                    "My meal arrived cold and overcooked",
                    "The sauce was far too salty to finish",
                ],
            ),
        ];

        let mut texts = Vec::new();
        let mut categories = Vec::new();
        for (category, sentences) in groups {
            for sentence in sentences {
                texts.push(String::from(*sentence));
                categories.push(String::from(category));
            }
        }

        let embeddings = match EmbeddingCache::load(cache_path, &texts, &categories)? {
            Some(embeddings) => {
                println!("Loaded {} embeddings from {}", embeddings.len(), cache_path.display());
                embeddings
            }
            None => {
                println!("Embedding {} sentences...", texts.len());
                let client = EmbeddingClient::from_env()?;
                let embeddings = client.embed(&texts)?;
                EmbeddingCache {
                    texts: texts.clone(),
                    categories: categories.clone(),
                    embeddings: embeddings.clone(),
                }
                .save(cache_path)?;
                println!("Saved embeddings to {}", cache_path.display());
                embeddings
            }
        };

        println!("Projecting to 2-D...");
        let points = project_2d(&embeddings)?;
        render_projection(&points, &texts, &categories, plot_path)?;
        println!("Wrote {}", plot_path.display());

        println!("\nSentences with similar meaning land near each other:");
        println!("- positive_weather: pleasant weather descriptions");
        println!("- negative_weather: storms, rain, and fog");
        println!("- positive_food:    praise for a meal");
        println!("- negative_food:    complaints about a meal");
        Ok(())
    }
}
