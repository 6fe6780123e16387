//! Vector database examples
//!
//! All collections here are in-process and live only for the duration of the
//! example. The local embedding model is downloaded on first use.

use crate::Example;
use anyhow::Result;

fn print_hits(hits: &[crate::listings::vectordb::QueryHit]) {
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{}] {}",
            i + 1,
            hit.id,
            hit.document.as_deref().unwrap_or("<no document stored>")
        );
        if let Some(metadata) = &hit.metadata {
            println!("   metadata: {}", serde_json::to_string(metadata).unwrap_or_default());
        }
        println!("   distance: {:.4}", hit.distance);
    }
}

/// # Three ways to add records
///
/// #### Id
/// 03.01
///
/// #### CLI command
/// ```sh
/// cargo run example 03.01
/// ```
pub struct EG01;

impl Example for EG01 {
    fn description(&self) -> String {
        String::from("Add records with auto-embedding, explicit embeddings, or embeddings only.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::embeddings::{Embedder, LocalEmbedder};
        use crate::listings::vectordb::{metadata, Collection, Item};
        use std::collections::BTreeMap;
        use std::rc::Rc;

        println!("Loading the embedding model...");
        let embedder: Rc<dyn Embedder> = Rc::new(LocalEmbedder::new()?);
        println!("Model ready.\n");

        println!("{}", "=".repeat(60));
        println!("Method 1: documents only, the collection embeds them");
        println!("{}", "=".repeat(60));

        let mut auto = Collection::with_embedder("auto_embedding", embedder.clone());
        auto.add(vec![
            Item::new("id1")
                .document("Artificial intelligence lets computers learn and reason.")
                .metadata(metadata([("topic", "AI"), ("level", "basic")])),
            Item::new("id2")
                .document("Machine learning finds patterns in data.")
                .metadata(metadata([("topic", "ML"), ("level", "basic")])),
            Item::new("id3")
                .document("Deep learning stacks many neural network layers.")
                .metadata(metadata([("topic", "DL"), ("level", "intermediate")])),
        ])?;

        println!("Records added: {}", auto.count());
        println!("\nStored documents:");
        for record in auto.get(Some(&["id1", "id2"])) {
            println!("  {}: {}", record.id, record.document.as_deref().unwrap_or(""));
        }

        println!("\n{}", "=".repeat(60));
        println!("Method 2: explicit embeddings plus documents");
        println!("{}", "=".repeat(60));

        let documents = vec![
            String::from("Lisbon is the capital of Portugal."),
            String::from("Porto is Portugal's second city."),
            String::from("Madeira is a popular island destination."),
        ];
        let embeddings = embedder.embed(&documents)?;
        println!("\nGenerated {} embeddings of dimension {}", embeddings.len(), embeddings[0].len());

        let mut manual = Collection::new("manual_embedding");
        let cities = ["Lisbon", "Porto", "Madeira"];
        manual.add(
            documents
                .iter()
                .zip(embeddings)
                .zip(cities)
                .enumerate()
                .map(|(i, ((document, embedding), city))| {
                    Item::new(&format!("city{}", i + 1))
                        .document(document)
                        .embedding(embedding)
                        .metadata(metadata([("city", city)]))
                })
                .collect(),
        )?;
        println!("Records added: {}", manual.count());

        let query = "Which cities in Portugal should I visit?";
        let query_vectors = embedder.embed(&[String::from(query)])?;
        println!("\nQuery: {query}");
        print_hits(&manual.query(&query_vectors[0], 2, None));

        println!("\n{}", "=".repeat(60));
        println!("Method 3: embeddings and metadata, documents kept elsewhere");
        println!("{}", "=".repeat(60));

        // the documents live in an external store; the collection only holds
        // vectors and pointers back to it
        let external_docs: BTreeMap<&str, &str> = BTreeMap::from([
            ("doc_001", "Python is an easy language to pick up."),
            ("doc_002", "JavaScript powers interactive web pages."),
            ("doc_003", "Go compiles quickly and deploys as one binary."),
        ]);

        let doc_texts: Vec<String> = external_docs.values().map(|d| String::from(*d)).collect();
        let doc_embeddings = embedder.embed(&doc_texts)?;

        let mut vectors_only = Collection::new("embedding_only");
        vectors_only.add(
            external_docs
                .keys()
                .zip(doc_embeddings)
                .enumerate()
                .map(|(i, (id, embedding))| {
                    Item::new(id).embedding(embedding).metadata(metadata([(
                        "doc_location",
                        format!("shelf_{}", i + 1),
                    )]))
                })
                .collect(),
        )?;
        println!("\nRecords added: {}", vectors_only.count());

        let query2 = "a good first programming language";
        let query2_vectors = embedder.embed(&[String::from(query2)])?;
        println!("\nQuery: {query2}");
        for (i, hit) in vectors_only.query(&query2_vectors[0], 2, None).iter().enumerate() {
            let actual = external_docs.get(hit.id.as_str()).unwrap_or(&"<missing>");
            println!("{}. id: {}", i + 1, hit.id);
            println!("   document (from the external store): {actual}");
        }

        println!("\n{}", "=".repeat(60));
        println!("Duplicate ids are ignored");
        println!("{}", "=".repeat(60));

        let inserted = auto.add(vec![Item::new("id1").document("this will not be added")])?;
        println!("\nRe-adding id1 inserted {inserted} records");
        let original = &auto.get(Some(&["id1"]))[0];
        println!("id1 still reads: {}", original.document.as_deref().unwrap_or(""));
        Ok(())
    }
}

/// # Semantic search with metadata filtering
///
/// #### Id
/// 03.02
///
/// #### CLI command
/// ```sh
/// cargo run example 03.02
/// ```
pub struct EG02;

impl Example for EG02 {
    fn description(&self) -> String {
        String::from("Query a document collection, with and without metadata filters.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::embeddings::{Embedder, LocalEmbedder};
        use crate::listings::vectordb::{metadata, Collection, Item};
        use std::rc::Rc;

        println!("Loading the embedding model...");
        let embedder: Rc<dyn Embedder> = Rc::new(LocalEmbedder::new()?);
        println!("Model ready.\n");

        let mut collection = Collection::with_embedder("tech_and_travel", embedder);

        let entries: [(&str, &str, &str); 8] = [
            (
                "Neural networks learn by adjusting millions of weights.",
                "tech",
                "deep learning",
            ),
            (
                "Vector databases index embeddings for nearest-neighbor search.",
                "tech",
                "vector databases",
            ),
            (
                "An embedding maps text into a high-dimensional vector space.",
                "tech",
                "embeddings",
            ),
            (
                "Transformers process whole sequences with attention.",
                "tech",
                "architectures",
            ),
            (
                "Kyoto's temples are busiest during autumn foliage.",
                "travel",
                "japan",
            ),
            (
                "The Lofoten islands offer midnight-sun hiking in June.",
                "travel",
                "norway",
            ),
            (
                "Street food tours are the best way to taste Bangkok.",
                "travel",
                "thailand",
            ),
            (
                "Patagonia rewards visitors who brave its winds.",
                "travel",
                "argentina",
            ),
        ];

        println!("Indexing {} documents...", entries.len());
        collection.add(
            entries
                .iter()
                .enumerate()
                .map(|(i, (document, category, topic))| {
                    Item::new(&format!("doc_{i}")).document(document).metadata(metadata([
                        ("category", *category),
                        ("topic", *topic),
                    ]))
                })
                .collect(),
        )?;
        println!("Collection holds {} records\n", collection.count());

        println!("{}", "=".repeat(60));
        println!("Search 1: plain semantic query");
        println!("{}", "=".repeat(60));
        let query1 = "How do machines turn words into numbers?";
        println!("Query: {query1}\n");
        print_hits(&collection.query_text(query1, 3, None)?);

        println!("\n{}", "=".repeat(60));
        println!("Search 2: a travel question");
        println!("{}", "=".repeat(60));
        let query2 = "Where should I go hiking this summer?";
        println!("Query: {query2}\n");
        print_hits(&collection.query_text(query2, 3, None)?);

        println!("\n{}", "=".repeat(60));
        println!("Search 3: the same tech query, restricted by metadata");
        println!("{}", "=".repeat(60));
        let filter = metadata([("category", "tech")]);
        println!("Query: {query1}");
        println!("Filter: category=tech\n");
        print_hits(&collection.query_text(query1, 3, Some(&filter))?);

        println!("\n{}", "=".repeat(60));
        println!("Fetch by id");
        println!("{}", "=".repeat(60));
        for record in collection.get(Some(&["doc_0", "doc_4"])) {
            println!("\nid: {}", record.id);
            println!("document: {}", record.document.as_deref().unwrap_or(""));
        }
        Ok(())
    }
}

/// # Update and upsert
///
/// #### Id
/// 03.03
///
/// #### CLI command
/// ```sh
/// cargo run example 03.03
/// ```
pub struct EG03;

impl Example for EG03 {
    fn description(&self) -> String {
        String::from("Mutate existing records with update, add-or-replace with upsert.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::embeddings::{Embedder, LocalEmbedder};
        use crate::listings::vectordb::{metadata, Collection, Item, MetadataValue};
        use std::rc::Rc;

        println!("Loading the embedding model...");
        let embedder: Rc<dyn Embedder> = Rc::new(LocalEmbedder::new()?);
        println!("Model ready.\n");

        let mut collection = Collection::with_embedder("update_example", embedder);
        collection.add(vec![
            Item::new("id1")
                .document("Python is an easy language to learn.")
                .metadata(metadata([("language", MetadataValue::from("Python")), ("level", MetadataValue::from(1_i64))])),
            Item::new("id2")
                .document("JavaScript is used for web development.")
                .metadata(metadata([("language", MetadataValue::from("JavaScript")), ("level", MetadataValue::from(2_i64))])),
            Item::new("id3")
                .document("Go is an efficient language.")
                .metadata(metadata([("language", MetadataValue::from("Go")), ("level", MetadataValue::from(2_i64))])),
        ])?;

        println!("Initial count: {}", collection.count());
        for record in collection.get(Some(&["id1", "id2"])) {
            println!("  {}: {}", record.id, record.document.as_deref().unwrap_or(""));
        }

        println!("\n{}", "=".repeat(60));
        println!("update(): existing ids only, unknown ids are ignored");
        println!("{}", "=".repeat(60));

        let updated = collection.update(vec![
            Item::new("id1")
                .document("Python is popular with beginners.")
                .metadata(metadata([
                    ("language", MetadataValue::from("Python")),
                    ("level", MetadataValue::from(1_i64)),
                    ("popular", MetadataValue::from(true)),
                ])),
            Item::new("id9").document("no such record"),
        ])?;
        println!("\nRecords updated: {updated}");
        let record = &collection.get(Some(&["id1"]))[0];
        println!("id1 now reads: {}", record.document.as_deref().unwrap_or(""));

        println!("\n{}", "=".repeat(60));
        println!("upsert(): update what exists, insert what does not");
        println!("{}", "=".repeat(60));

        let (updated, inserted) = collection.upsert(vec![
            Item::new("id2").document("JavaScript runs on the front end and the back end."),
            Item::new("id4")
                .document("Rust is a safe systems programming language.")
                .metadata(metadata([("language", MetadataValue::from("Rust")), ("level", MetadataValue::from(3_i64))])),
        ])?;
        println!("\nupdated {updated}, inserted {inserted}");
        println!("Count after upsert: {}", collection.count());

        println!("\nFinal records:");
        for record in collection.get(None) {
            println!("  {}: {}", record.id, record.document.as_deref().unwrap_or(""));
        }
        Ok(())
    }
}

/// # Delete by id and by filter
///
/// #### Id
/// 03.04
///
/// #### CLI command
/// ```sh
/// cargo run example 03.04
/// ```
pub struct EG04;

impl Example for EG04 {
    fn description(&self) -> String {
        String::from("Remove records by id, by metadata filter, and by their intersection.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::embeddings::{Embedder, LocalEmbedder};
        use crate::listings::vectordb::{metadata, Collection, Item};
        use std::rc::Rc;

        println!("Loading the embedding model...");
        let embedder: Rc<dyn Embedder> = Rc::new(LocalEmbedder::new()?);
        println!("Model ready.\n");

        let mut collection = Collection::with_embedder("delete_example", embedder);
        collection.add(vec![
            Item::new("id1")
                .document("Python for beginners")
                .metadata(metadata([("language", "Python"), ("level", "basic")])),
            Item::new("id2")
                .document("Advanced Python")
                .metadata(metadata([("language", "Python"), ("level", "intermediate")])),
            Item::new("id3")
                .document("JavaScript for beginners")
                .metadata(metadata([("language", "JavaScript"), ("level", "basic")])),
            Item::new("id4")
                .document("Advanced JavaScript")
                .metadata(metadata([("language", "JavaScript"), ("level", "intermediate")])),
            Item::new("id5")
                .document("Go for beginners")
                .metadata(metadata([("language", "Go"), ("level", "basic")])),
        ])?;

        println!("Initial count: {}", collection.count());
        for record in collection.get(None) {
            println!("  {}: {}", record.id, record.document.as_deref().unwrap_or(""));
        }

        println!("\n=== delete by id ===");
        let removed = collection.delete(Some(&["id1"]), None);
        println!("removed {removed}; {} records remain", collection.count());

        println!("\n=== delete by filter ===");
        let javascript = metadata([("language", "JavaScript")]);
        let removed = collection.delete(None, Some(&javascript));
        println!("removed {removed}; {} records remain", collection.count());

        println!("\n=== delete by ids and filter together ===");
        collection.add(vec![
            Item::new("id6")
                .document("Rust for beginners")
                .metadata(metadata([("language", "Rust"), ("level", "basic")])),
            Item::new("id7")
                .document("Advanced Rust")
                .metadata(metadata([("language", "Rust"), ("level", "intermediate")])),
        ])?;
        println!("after adding two more: {} records", collection.count());

        // of id6 and id7, only the basic one goes away
        let basic = metadata([("level", "basic")]);
        let removed = collection.delete(Some(&["id6", "id7"]), Some(&basic));
        println!("conditional delete removed {removed}; {} records remain", collection.count());

        println!("\nFinal records:");
        for record in collection.get(None) {
            println!("  {}: {}", record.id, record.document.as_deref().unwrap_or(""));
        }
        Ok(())
    }
}

/// # Rerank a first-pass search
///
/// #### Id
/// 03.05
///
/// #### CLI command
/// ```sh
/// cargo run example 03.05
/// ```
pub struct EG05;

impl Example for EG05 {
    fn description(&self) -> String {
        String::from("Reorder vector search results with a cross-encoder reranker.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::embeddings::{Embedder, LocalEmbedder};
        use crate::listings::rerank::Reranker;
        use crate::listings::vectordb::{Collection, Item};
        use std::rc::Rc;

        println!("Loading the embedding model and the reranker...");
        let embedder: Rc<dyn Embedder> = Rc::new(LocalEmbedder::new()?);
        let reranker = Reranker::new()?;
        println!("Models ready.\n");

        let documents = [
            "Python reads almost like pseudocode.",
            "JavaScript is everywhere on the web.",
            "Python dominates data science and machine learning.",
            "Go was designed at Google for large services.",
            "Python's forgiving syntax suits first-time programmers.",
        ];

        let mut collection = Collection::with_embedder("rerank_example", embedder);
        collection.add(
            documents
                .iter()
                .enumerate()
                .map(|(i, document)| Item::new(&format!("doc{i}")).document(document))
                .collect(),
        )?;
        println!("Indexed {} documents\n", collection.count());

        let query = "What is a good programming language for a beginner?";
        println!("Query: {query}\n");

        let hits = collection.query_text(query, 5, None)?;
        println!("{}", "=".repeat(60));
        println!("Pass 1: vector similarity");
        println!("{}", "=".repeat(60));
        for (i, hit) in hits.iter().enumerate() {
            println!("{}. [{}] {}", i + 1, hit.id, hit.document.as_deref().unwrap_or(""));
            println!("   distance: {:.4}", hit.distance);
        }

        let retrieved: Vec<String> = hits
            .iter()
            .map(|hit| String::from(hit.document.as_deref().unwrap_or("")))
            .collect();
        let reranked = reranker.rerank(query, &retrieved)?;

        println!("\n{}", "=".repeat(60));
        println!("Pass 2: cross-encoder scores");
        println!("{}", "=".repeat(60));
        for (i, ranked) in reranked.iter().enumerate() {
            println!("{}. [{}] {}", i + 1, hits[ranked.index].id, ranked.document);
            println!("   score: {:.4}", ranked.score);
        }

        println!("\nPass 1 is fast but approximate; the cross-encoder reads each");
        println!("(query, document) pair in full and usually orders them better.");
        Ok(())
    }
}
