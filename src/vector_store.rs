//! In-process vector index (C3): brute-force cosine search over two named
//! collections, "resumes" and "postings", using a linear-scan cosine search
//! over an in-memory table.

use crate::error::{MatchError, MatchResult};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Resumes,
    Postings,
}

impl Collection {
    fn as_str(&self) -> &'static str {
        match self {
            Collection::Resumes => "resumes",
            Collection::Postings => "postings",
        }
    }
}

/// A primitive metadata value. List-valued fields are joined to a comma
/// string by the caller before being stored here.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Join a list of strings into a single comma-separated metadata value.
pub fn joined_list(values: &[String]) -> MetadataValue {
    MetadataValue::Text(values.join(","))
}

pub type Metadata = HashMap<String, MetadataValue>;

#[derive(Debug, Clone)]
struct Entry {
    vector: Vec<f32>,
    metadata: Metadata,
}

/// A single hit from a similarity query: raw cosine distance in `[0, 2]`
/// (0 = identical direction, 2 = opposite), kept separate from any
/// presentation-layer normalization.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub key: String,
    pub metadata: Metadata,
    pub distance: f64,
}

/// Cosine distance re-expressed as a `[0, 100]` display score. This is a
/// presentation concern only — scoring math always works off raw distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationScore(pub f64);

impl PresentationScore {
    /// Retrieval-time normalization: given the `k` distances returned for one
    /// query, score each by its position within that query's `[min_d, max_d]`
    /// range: `35 + 60 * (1 - (d - min_d)/(max_d - min_d))`, clamped to
    /// `[0, 100]`. When every distance is equal, every score is 85. This is
    /// strictly a presentation normalization for the recommendation fallback;
    /// the scoring engine itself always uses raw cosine similarity.
    pub fn normalize_query_distances(distances: &[f64]) -> Vec<PresentationScore> {
        if distances.is_empty() {
            return Vec::new();
        }
        let min_d = distances.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_d = distances.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        distances
            .iter()
            .map(|&d| {
                let raw = if (max_d - min_d).abs() < 1e-12 {
                    85.0
                } else {
                    35.0 + 60.0 * (1.0 - (d - min_d) / (max_d - min_d))
                };
                PresentationScore(raw.clamp(0.0, 100.0))
            })
            .collect()
    }
}

pub struct VectorStore {
    dim: usize,
    collections: HashMap<&'static str, RwLock<HashMap<String, Entry>>>,
}

impl VectorStore {
    pub fn new(dim: usize) -> Self {
        let mut collections = HashMap::new();
        collections.insert("resumes", RwLock::new(HashMap::new()));
        collections.insert("postings", RwLock::new(HashMap::new()));
        Self { dim, collections }
    }

    fn table(&self, collection: Collection) -> &RwLock<HashMap<String, Entry>> {
        self.collections
            .get(collection.as_str())
            .expect("both collections are registered at construction")
    }

    pub fn upsert(&self, collection: Collection, key: &str, vector: Vec<f32>, metadata: Metadata) -> MatchResult<()> {
        if vector.len() != self.dim {
            return Err(MatchError::Validation(format!(
                "vector has {} dims, expected {}",
                vector.len(),
                self.dim
            )));
        }
        let mut table = self
            .table(collection)
            .write()
            .map_err(|_| MatchError::Configuration("vector store lock poisoned".to_string()))?;
        table.insert(key.to_string(), Entry { vector, metadata });
        Ok(())
    }

    pub fn get(&self, collection: Collection, key: &str) -> MatchResult<Option<(Vec<f32>, Metadata)>> {
        let table = self
            .table(collection)
            .read()
            .map_err(|_| MatchError::Configuration("vector store lock poisoned".to_string()))?;
        Ok(table.get(key).map(|e| (e.vector.clone(), e.metadata.clone())))
    }

    pub fn delete(&self, collection: Collection, key: &str) -> MatchResult<bool> {
        let mut table = self
            .table(collection)
            .write()
            .map_err(|_| MatchError::Configuration("vector store lock poisoned".to_string()))?;
        Ok(table.remove(key).is_some())
    }

    pub fn count(&self, collection: Collection) -> MatchResult<usize> {
        let table = self
            .table(collection)
            .read()
            .map_err(|_| MatchError::Configuration("vector store lock poisoned".to_string()))?;
        Ok(table.len())
    }

    pub fn clear(&self, collection: Collection) -> MatchResult<()> {
        let mut table = self
            .table(collection)
            .write()
            .map_err(|_| MatchError::Configuration("vector store lock poisoned".to_string()))?;
        table.clear();
        Ok(())
    }

    /// Brute-force cosine-distance query against every entry in `collection`,
    /// ascending by distance (closest first), returning at most `limit` hits.
    pub fn query(&self, collection: Collection, vector: &[f32], limit: usize) -> MatchResult<Vec<VectorHit>> {
        if vector.len() != self.dim {
            return Err(MatchError::Validation(format!(
                "query vector has {} dims, expected {}",
                vector.len(),
                self.dim
            )));
        }
        let table = self
            .table(collection)
            .read()
            .map_err(|_| MatchError::Configuration("vector store lock poisoned".to_string()))?;
        let mut hits: Vec<VectorHit> = table
            .iter()
            .map(|(key, entry)| VectorHit {
                key: key.clone(),
                metadata: entry.metadata.clone(),
                distance: cosine_distance(vector, &entry.vector),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Cosine distance between the vectors stored under two keys in the same
    /// collection. Fails rather than substituting a fallback score if either
    /// vector is missing.
    pub fn distance_between(&self, collection: Collection, key_a: &str, key_b: &str) -> MatchResult<f64> {
        let (a, _) = self
            .get(collection, key_a)?
            .ok_or_else(|| MatchError::EmbeddingMissing(key_a.to_string()))?;
        let (b, _) = self
            .get(collection, key_b)?
            .ok_or_else(|| MatchError::EmbeddingMissing(key_b.to_string()))?;
        Ok(cosine_distance(&a, &b))
    }
}

/// `1 - cosine_similarity`, so identical direction is 0 and opposite is 2.
/// Callers must never substitute this with a default score when a vector is
/// missing or zero-length — they must propagate the error instead.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 2.0;
    }
    let similarity = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    1.0 - similarity
}
