//! In-memory vector collection
//!
//! A small, non-persistent collection with the CRUD + query surface the
//! vector-database examples exercise: add, get, query with metadata filters,
//! update, upsert, and delete. Records live in insertion order for the
//! lifetime of the process. A collection may carry an [`Embedder`]; it then
//! accepts documents without explicit embeddings and embeds them itself.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::listings::embeddings::{cosine_similarity, Embedder};

pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Str(String::from(value))
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Str(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Builds a metadata map from key/value pairs.
pub fn metadata<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Metadata
where
    K: Into<String>,
    V: Into<MetadataValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A stored record.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub document: Option<String>,
    pub embedding: Vec<f32>,
    pub metadata: Option<Metadata>,
}

/// One item handed to `add`/`update`/`upsert`. An item without an embedding
/// must carry a document so an attached embedder can fill the vector in.
#[derive(Debug, Clone, Default)]
pub struct Item {
    pub id: String,
    pub document: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<Metadata>,
}

impl Item {
    pub fn new(id: &str) -> Self {
        Self {
            id: String::from(id),
            ..Self::default()
        }
    }

    pub fn document(mut self, text: &str) -> Self {
        self.document = Some(String::from(text));
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A ranked query result. `distance` is cosine distance, so smaller is
/// closer; identical normalized vectors score 0.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub document: Option<String>,
    pub metadata: Option<Metadata>,
    pub distance: f32,
}

pub struct Collection {
    name: String,
    records: Vec<Record>,
    embedder: Option<Rc<dyn Embedder>>,
}

impl Collection {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            records: Vec::new(),
            embedder: None,
        }
    }

    pub fn with_embedder(name: &str, embedder: Rc<dyn Embedder>) -> Self {
        Self {
            name: String::from(name),
            records: Vec::new(),
            embedder: Some(embedder),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Inserts new records. An id that already exists is skipped, so
    /// re-adding is safe and keeps the original record. Returns the number
    /// of records actually inserted.
    pub fn add(&mut self, items: Vec<Item>) -> Result<usize> {
        let mut items = items;
        self.fill_embeddings(&mut items, true)?;

        let mut inserted = 0_usize;
        for item in items {
            if self.position(&item.id).is_some() {
                continue;
            }
            self.records.push(Record {
                id: item.id,
                document: item.document,
                // fill_embeddings guarantees the vector is present
                embedding: item.embedding.unwrap_or_default(),
                metadata: item.metadata,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    /// All records, or those whose ids were asked for, in insertion order.
    pub fn get(&self, ids: Option<&[&str]>) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| ids.is_none_or(|ids| ids.contains(&r.id.as_str())))
            .collect()
    }

    /// Nearest records by cosine distance, optionally restricted to records
    /// whose metadata contains every pair of `where_filter`.
    pub fn query(
        &self,
        query_embedding: &[f32],
        n_results: usize,
        where_filter: Option<&Metadata>,
    ) -> Vec<QueryHit> {
        let mut hits: Vec<QueryHit> = self
            .records
            .iter()
            .filter(|r| matches_filter(r.metadata.as_ref(), where_filter))
            .map(|r| QueryHit {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                distance: 1.0 - cosine_similarity(&r.embedding, query_embedding),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        hits.truncate(n_results);
        hits
    }

    /// Embeds the query text with the collection's embedder and queries.
    pub fn query_text(
        &self,
        query: &str,
        n_results: usize,
        where_filter: Option<&Metadata>,
    ) -> Result<Vec<QueryHit>> {
        let Some(embedder) = &self.embedder else {
            bail!("collection '{}' has no embedder attached", self.name);
        };
        let embedded = embedder.embed(&[String::from(query)])?;
        let Some(query_embedding) = embedded.first() else {
            bail!("embedder returned no vector for the query");
        };
        Ok(self.query(query_embedding, n_results, where_filter))
    }

    /// Mutates existing records only; items with unknown ids are ignored.
    /// A new document without an explicit embedding is re-embedded when an
    /// embedder is attached, otherwise the stored vector is kept. Returns
    /// the number of records updated.
    pub fn update(&mut self, items: Vec<Item>) -> Result<usize> {
        let mut items = items;
        self.fill_embeddings(&mut items, false)?;

        let mut updated = 0_usize;
        for item in items {
            let Some(pos) = self.position(&item.id) else {
                continue;
            };
            let record = &mut self.records[pos];
            if let Some(document) = item.document {
                record.document = Some(document);
            }
            if let Some(embedding) = item.embedding {
                record.embedding = embedding;
            }
            if let Some(metadata) = item.metadata {
                record.metadata = Some(metadata);
            }
            updated += 1;
        }
        Ok(updated)
    }

    /// Update-or-insert: existing ids are updated in place, new ids are
    /// added. Returns `(updated, inserted)`.
    pub fn upsert(&mut self, items: Vec<Item>) -> Result<(usize, usize)> {
        let (existing, fresh): (Vec<Item>, Vec<Item>) = items
            .into_iter()
            .partition(|item| self.position(&item.id).is_some());
        let updated = self.update(existing)?;
        let inserted = self.add(fresh)?;
        Ok((updated, inserted))
    }

    /// Removes records by ids, by metadata filter, or — when both are given —
    /// by their intersection. With neither, the collection is cleared.
    /// Returns the number of records removed.
    pub fn delete(&mut self, ids: Option<&[&str]>, where_filter: Option<&Metadata>) -> usize {
        let before = self.records.len();
        self.records.retain(|r| {
            let id_match = ids.is_none_or(|ids| ids.contains(&r.id.as_str()));
            let where_match = matches_filter(r.metadata.as_ref(), where_filter);
            !(id_match && where_match)
        });
        before - self.records.len()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Embeds documents for items that arrived without a vector. With
    /// `require` set every item must end up with an embedding; otherwise
    /// items without a document are left untouched (update keeps the stored
    /// vector in that case).
    fn fill_embeddings(&self, items: &mut [Item], require: bool) -> Result<()> {
        let pending: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.embedding.is_none() && item.document.is_some())
            .map(|(i, _)| i)
            .collect();

        if !pending.is_empty() {
            let Some(embedder) = &self.embedder else {
                if require {
                    bail!(
                        "collection '{}' has no embedder; provide embeddings explicitly",
                        self.name
                    );
                }
                return Ok(());
            };
            let texts: Vec<String> = pending
                .iter()
                .map(|&i| items[i].document.clone().unwrap_or_default())
                .collect();
            let vectors = embedder.embed(&texts)?;
            for (&i, vector) in pending.iter().zip(vectors) {
                items[i].embedding = Some(vector);
            }
        }

        if require {
            if let Some(item) = items.iter().find(|item| item.embedding.is_none()) {
                bail!(
                    "item '{}' has neither an embedding nor a document to embed",
                    item.id
                );
            }
        }
        Ok(())
    }
}

fn matches_filter(metadata: Option<&Metadata>, filter: Option<&Metadata>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if filter.is_empty() {
        return true;
    }
    let Some(metadata) = metadata else {
        return false;
    };
    filter.iter().all(|(k, v)| metadata.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    /// Deterministic stand-in for a real model: counts vowels, consonants,
    /// and whitespace so that similar texts land near each other.
    struct CountingEmbedder;

    impl Embedder for CountingEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
                    let consonants = t
                        .chars()
                        .filter(|c| c.is_alphabetic() && !"aeiou".contains(*c))
                        .count() as f32;
                    let spaces = t.chars().filter(|c| c.is_whitespace()).count() as f32;
                    vec![vowels, consonants, spaces]
                })
                .collect())
        }
    }

    #[fixture]
    pub fn languages() -> Collection {
        let mut collection = Collection::new("languages");
        collection
            .add(vec![
                Item::new("id1")
                    .document("Python basics")
                    .embedding(vec![1.0, 0.0, 0.0])
                    .metadata(metadata([("language", "Python"), ("level", "basic")])),
                Item::new("id2")
                    .document("Python internals")
                    .embedding(vec![0.9, 0.1, 0.0])
                    .metadata(metadata([
                        ("language", "Python"),
                        ("level", "intermediate"),
                    ])),
                Item::new("id3")
                    .document("JavaScript basics")
                    .embedding(vec![0.0, 1.0, 0.0])
                    .metadata(metadata([
                        ("language", "JavaScript"),
                        ("level", "basic"),
                    ])),
                Item::new("id4")
                    .document("Go basics")
                    .embedding(vec![0.0, 0.0, 1.0])
                    .metadata(metadata([("language", "Go"), ("level", "basic")])),
            ])
            .unwrap();
        collection
    }

    #[rstest]
    fn test_add_skips_duplicate_ids(mut languages: Collection) {
        let inserted = languages
            .add(vec![Item::new("id1")
                .document("this must not replace the original")
                .embedding(vec![9.0, 9.0, 9.0])])
            .unwrap();

        assert_eq!(inserted, 0);
        assert_eq!(languages.count(), 4);
        let original = &languages.get(Some(&["id1"]))[0];
        assert_eq!(original.document.as_deref(), Some("Python basics"));
        assert_eq!(original.embedding, vec![1.0, 0.0, 0.0]);
    }

    #[rstest]
    fn test_add_requires_embedding_or_document() {
        let mut collection = Collection::new("bare");
        let result = collection.add(vec![Item::new("id1")]);
        assert!(result.is_err());
    }

    #[rstest]
    fn test_add_without_embedder_rejects_document_only_items() {
        let mut collection = Collection::new("bare");
        let result = collection.add(vec![Item::new("id1").document("some text")]);
        assert!(result.is_err());
    }

    #[rstest]
    fn test_auto_embedding_through_attached_embedder() {
        let mut collection =
            Collection::with_embedder("auto", Rc::new(CountingEmbedder) as Rc<dyn Embedder>);
        collection
            .add(vec![Item::new("id1").document("abc def")])
            .unwrap();

        let record = &collection.get(Some(&["id1"]))[0];
        // "abc def": 2 vowels, 4 consonants, 1 space
        assert_eq!(record.embedding, vec![2.0, 4.0, 1.0]);
    }

    #[rstest]
    fn test_get_all_preserves_insertion_order(languages: Collection) {
        let ids: Vec<&str> = languages.get(None).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["id1", "id2", "id3", "id4"]);
    }

    #[rstest]
    fn test_get_by_ids(languages: Collection) {
        let records = languages.get(Some(&["id1", "id3"]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "id1");
        assert_eq!(records[1].id, "id3");
    }

    #[rstest]
    fn test_query_ranks_by_distance(languages: Collection) {
        let hits = languages.query(&[1.0, 0.0, 0.0], 2, None);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "id1");
        assert_eq!(hits[1].id, "id2");
        assert!(hits[0].distance < 1e-6);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[rstest]
    fn test_query_respects_metadata_filter(languages: Collection) {
        let filter = metadata([("level", "basic")]);
        let hits = languages.query(&[0.9, 0.1, 0.0], 10, Some(&filter));

        // id2 is the nearest neighbor but is not `basic`, so it must not appear
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["id1", "id3", "id4"]);
    }

    #[rstest]
    fn test_query_filter_on_missing_metadata() {
        let mut collection = Collection::new("mixed");
        collection
            .add(vec![
                Item::new("plain").embedding(vec![1.0, 0.0]),
                Item::new("tagged")
                    .embedding(vec![1.0, 0.0])
                    .metadata(metadata([("topic", "ai")])),
            ])
            .unwrap();

        let filter = metadata([("topic", "ai")]);
        let hits = collection.query(&[1.0, 0.0], 10, Some(&filter));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "tagged");
    }

    #[rstest]
    fn test_update_ignores_unknown_ids(mut languages: Collection) {
        let updated = languages
            .update(vec![Item::new("missing").document("nope")])
            .unwrap();

        assert_eq!(updated, 0);
        assert_eq!(languages.count(), 4);
    }

    #[rstest]
    fn test_update_replaces_provided_fields_only(mut languages: Collection) {
        let updated = languages
            .update(vec![Item::new("id1")
                .metadata(metadata([("language", "Python"), ("popular", "yes")]))])
            .unwrap();

        assert_eq!(updated, 1);
        let record = &languages.get(Some(&["id1"]))[0];
        // document and embedding untouched, metadata replaced
        assert_eq!(record.document.as_deref(), Some("Python basics"));
        assert_eq!(record.embedding, vec![1.0, 0.0, 0.0]);
        assert_eq!(
            record.metadata.as_ref().unwrap().get("popular"),
            Some(&MetadataValue::from("yes"))
        );
    }

    #[rstest]
    fn test_update_re_embeds_new_document_with_embedder() {
        let mut collection =
            Collection::with_embedder("auto", Rc::new(CountingEmbedder) as Rc<dyn Embedder>);
        collection
            .add(vec![Item::new("id1").document("aa")])
            .unwrap();

        collection
            .update(vec![Item::new("id1").document("bb cc")])
            .unwrap();

        let record = &collection.get(Some(&["id1"]))[0];
        assert_eq!(record.document.as_deref(), Some("bb cc"));
        // "bb cc": 0 vowels, 4 consonants, 1 space
        assert_eq!(record.embedding, vec![0.0, 4.0, 1.0]);
    }

    #[rstest]
    fn test_update_without_embedder_keeps_stored_vector(mut languages: Collection) {
        languages
            .update(vec![Item::new("id1").document("renamed")])
            .unwrap();

        let record = &languages.get(Some(&["id1"]))[0];
        assert_eq!(record.document.as_deref(), Some("renamed"));
        assert_eq!(record.embedding, vec![1.0, 0.0, 0.0]);
    }

    #[rstest]
    fn test_upsert_updates_and_inserts(mut languages: Collection) {
        let (updated, inserted) = languages
            .upsert(vec![
                Item::new("id2")
                    .document("JavaScript everywhere")
                    .embedding(vec![0.5, 0.5, 0.0]),
                Item::new("id5")
                    .document("Rust basics")
                    .embedding(vec![0.2, 0.2, 0.6])
                    .metadata(metadata([("language", "Rust")])),
            ])
            .unwrap();

        assert_eq!((updated, inserted), (1, 1));
        assert_eq!(languages.count(), 5);
        let record = &languages.get(Some(&["id2"]))[0];
        assert_eq!(record.document.as_deref(), Some("JavaScript everywhere"));
    }

    #[rstest]
    fn test_delete_by_ids(mut languages: Collection) {
        let removed = languages.delete(Some(&["id1"]), None);
        assert_eq!(removed, 1);
        assert_eq!(languages.count(), 3);
        assert!(languages.get(Some(&["id1"])).is_empty());
    }

    #[rstest]
    fn test_delete_by_filter(mut languages: Collection) {
        let filter = metadata([("language", "Python")]);
        let removed = languages.delete(None, Some(&filter));
        assert_eq!(removed, 2);
        assert_eq!(languages.count(), 2);
    }

    #[rstest]
    fn test_delete_requires_both_when_both_given(mut languages: Collection) {
        // id3 matches the ids but not the filter; only id1 goes away
        let filter = metadata([("language", "Python")]);
        let removed = languages.delete(Some(&["id1", "id3"]), Some(&filter));

        assert_eq!(removed, 1);
        let ids: Vec<&str> = languages.get(None).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["id2", "id3", "id4"]);
    }

    #[rstest]
    fn test_delete_with_no_selectors_clears_collection(mut languages: Collection) {
        let removed = languages.delete(None, None);
        assert_eq!(removed, 4);
        assert_eq!(languages.count(), 0);
    }

    #[rstest]
    fn test_query_text_uses_attached_embedder() {
        let mut collection =
            Collection::with_embedder("auto", Rc::new(CountingEmbedder) as Rc<dyn Embedder>);
        collection
            .add(vec![
                Item::new("vowelly").document("aeiou aeiou"),
                Item::new("consonanty").document("bcdfg bcdfg"),
            ])
            .unwrap();

        let hits = collection.query_text("aaa eee", 1, None).unwrap();
        assert_eq!(hits[0].id, "vowelly");
    }

    #[rstest]
    fn test_query_text_without_embedder_fails(languages: Collection) {
        assert!(languages.query_text("anything", 1, None).is_err());
    }

    #[rstest]
    fn test_metadata_value_json_representation() {
        let m = metadata([
            ("language", MetadataValue::from("Python")),
            ("level", MetadataValue::from(1_i64)),
            ("popular", MetadataValue::from(true)),
        ]);
        let json = serde_json::to_value(&m).unwrap();

        assert_eq!(json["language"], "Python");
        assert_eq!(json["level"], 1);
        assert_eq!(json["popular"], true);
    }
}
