//! Persistent vector collection backed by redb.
//!
//! Stores one entry per chunk, keyed by the composite id
//! `"{source}_{chunk_id}"`. Binary format per entry:
//! - 4 bytes: vector dimension D (u32 LE)
//! - D * 4 bytes: f32 LE vector values
//! - remainder: JSON-encoded `{text, source, chunk_id}` record
//!
//! Search is a brute-force cosine-similarity scan over all entries,
//! which is adequate at the corpus sizes this tool targets. Re-adding
//! an already-indexed id overwrites the previous entry (redb insert
//! semantics); a full rebuild goes through `reset` first so stale
//! chunks never leak into results.

use std::path::Path;

use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    ReadableTableMetadata,
    TableDefinition,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    chunker::Chunk,
    error::{Error, Result},
};

const CHUNKS: TableDefinition<&str, &[u8]> = TableDefinition::new("chunks");

/// Header size: 4 bytes vector dimension.
const HEADER_SIZE: usize = 4;

#[derive(Debug, Serialize, Deserialize)]
struct ChunkRecord {
    text: String,
    source: String,
    chunk_id: usize,
}

/// A search hit: the stored chunk plus its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub source: String,
    pub chunk_id: usize,
    /// Cosine similarity to the query vector, in `[-1, 1]`.
    pub score: f32,
}

/// The persistent chunk collection.
pub struct ChunkStore {
    db: Database,
    created: bool,
}

impl ChunkStore {
    /// Open the collection at `path`, creating it if absent.
    ///
    /// An existing file that cannot be opened is discarded and replaced
    /// with an empty collection (logged) rather than failing startup;
    /// errors from the replacement attempt itself propagate.
    pub fn open(path: &Path) -> Result<Self> {
        let existed = path.exists();
        let db = match Database::create(path) {
            Ok(db) => db,
            Err(e) if existed => {
                warn!(
                    "could not open collection at {}: {e}; recreating empty",
                    path.display()
                );
                std::fs::remove_file(path)?;
                Database::create(path)?
            }
            Err(e) => return Err(e.into()),
        };

        let txn = db.begin_write()?;
        txn.open_table(CHUNKS)?;
        txn.commit()?;

        let store = Self {
            db,
            created: !existed,
        };

        if existed {
            info!("opened existing collection with {} chunks", store.count()?);
        } else {
            info!("created new collection at {}", path.display());
        }

        Ok(store)
    }

    /// Whether `open` created a fresh collection (as opposed to loading
    /// an existing one).
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// Persist chunks and their vectors in one transaction.
    ///
    /// `chunks` and `vectors` must have equal length, and every vector
    /// must match the dimension of the collection (fixed by the first
    /// entry ever added). Existing ids are overwritten.
    pub fn add_chunks(
        &self,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let expected = match self.dimension()? {
            Some(dim) => dim,
            None => vectors[0].len(),
        };
        for vector in vectors {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CHUNKS)?;
            for (chunk, vector) in chunks.iter().zip(vectors) {
                let record = ChunkRecord {
                    text: chunk.text.clone(),
                    source: chunk.source.clone(),
                    chunk_id: chunk.chunk_id,
                };
                let value = encode_entry(vector, &record)?;
                table.insert(chunk.id().as_str(), value.as_slice())?;
            }
        }
        txn.commit()?;

        info!("added {} chunks to the collection", chunks.len());
        Ok(())
    }

    /// Return up to `top_k` entries ordered by descending cosine
    /// similarity to `query`. An empty collection yields an empty
    /// result, not an error; a query whose dimension does not match
    /// the collection's is rejected.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let Some(expected) = self.dimension()? else {
            return Ok(Vec::new());
        };
        if query.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }

        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHUNKS)?;

        let mut hits = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let (vector, record) = decode_entry(value.value())?;
            hits.push(RetrievedChunk {
                score: cosine_similarity(query, &vector),
                text: record.text,
                source: record.source,
                chunk_id: record.chunk_id,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Number of entries currently persisted.
    pub fn count(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHUNKS)?;
        Ok(table.len()?)
    }

    /// Drop all entries, leaving the collection ready for new adds.
    ///
    /// Returns whether any table existed to drop; resetting an absent
    /// collection is a no-op, not an error.
    pub fn reset(&self) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let existed = txn.delete_table(CHUNKS)?;
        txn.open_table(CHUNKS)?;
        txn.commit()?;

        info!("collection reset");
        Ok(existed)
    }

    /// Vector dimension of the collection, or None while empty.
    fn dimension(&self) -> Result<Option<usize>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHUNKS)?;

        let Some(entry) = table.iter()?.next() else {
            return Ok(None);
        };
        let (_, value) = entry?;
        let bytes = value.value();
        if bytes.len() < HEADER_SIZE {
            return Ok(None);
        }
        let dim = u32::from_le_bytes(
            bytes[..HEADER_SIZE].try_into().unwrap_or_default(),
        );
        Ok(Some(dim as usize))
    }
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore").finish_non_exhaustive()
    }
}

fn encode_entry(vector: &[f32], record: &ChunkRecord) -> Result<Vec<u8>> {
    let dim = vector.len() as u32;
    let mut bytes =
        Vec::with_capacity(HEADER_SIZE + vector.len() * 4 + record.text.len());
    bytes.extend_from_slice(&dim.to_le_bytes());
    bytes.extend_from_slice(bytemuck::cast_slice(vector));
    serde_json::to_writer(&mut bytes, record)?;
    Ok(bytes)
}

fn decode_entry(bytes: &[u8]) -> Result<(Vec<f32>, ChunkRecord)> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::Config("truncated collection entry".into()));
    }
    let dim = u32::from_le_bytes(
        bytes[..HEADER_SIZE].try_into().unwrap_or_default(),
    ) as usize;
    let vector_end = HEADER_SIZE + dim * 4;
    if bytes.len() < vector_end {
        return Err(Error::Config("truncated collection entry".into()));
    }

    // pod_collect_to_vec copes with unaligned input slices.
    let vector: Vec<f32> =
        bytemuck::pod_collect_to_vec(&bytes[HEADER_SIZE..vector_end]);
    let record: ChunkRecord = serde_json::from_slice(&bytes[vector_end..])?;
    Ok((vector, record))
}

/// Cosine similarity between two vectors; zero for mismatched lengths
/// or zero-magnitude input.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, chunk_id: usize, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source: source.to_string(),
            chunk_id,
        }
    }

    fn test_store() -> (tempfile::TempDir, ChunkStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChunkStore::open(&tmp.path().join("test.redb")).unwrap();
        (tmp, store)
    }

    #[test]
    fn new_collection_is_empty() {
        let (_tmp, store) = test_store();
        assert!(store.was_created());
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn add_and_count() {
        let (_tmp, store) = test_store();

        let chunks = vec![
            chunk("a.txt", 0, "first"),
            chunk("a.txt", 1, "second"),
            chunk("b.txt", 0, "third"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];

        store.add_chunks(&chunks, &vectors).unwrap();
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn top_1_returns_closest_by_cosine() {
        let (_tmp, store) = test_store();

        let chunks = vec![
            chunk("doc.txt", 0, "chunk A"),
            chunk("doc.txt", 1, "chunk B"),
            chunk("doc.txt", 2, "chunk C"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        store.add_chunks(&chunks, &vectors).unwrap();

        let hits = store.search(&[0.1, 0.9, 0.2], 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "chunk B");
        assert_eq!(hits[0].source, "doc.txt");
        assert_eq!(hits[0].chunk_id, 1);
    }

    #[test]
    fn results_are_ordered_by_descending_score() {
        let (_tmp, store) = test_store();

        let chunks =
            vec![chunk("d", 0, "far"), chunk("d", 1, "near"), chunk("d", 2, "mid")];
        let vectors = vec![
            vec![-1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.5, 0.5],
        ];
        store.add_chunks(&chunks, &vectors).unwrap();

        let hits = store.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits[0].text, "near");
        assert_eq!(hits[1].text, "mid");
        assert_eq!(hits[2].text, "far");
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[1].score >= hits[2].score);
    }

    #[test]
    fn top_k_caps_result_length() {
        let (_tmp, store) = test_store();

        let chunks = vec![chunk("d", 0, "x"), chunk("d", 1, "y")];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        store.add_chunks(&chunks, &vectors).unwrap();

        assert_eq!(store.search(&[1.0, 0.0], 1).unwrap().len(), 1);
        assert_eq!(store.search(&[1.0, 0.0], 10).unwrap().len(), 2);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let (_tmp, store) = test_store();

        let chunks = vec![chunk("d", 0, "x"), chunk("d", 1, "y")];
        let vectors = vec![vec![1.0, 0.0]];

        assert!(matches!(
            store.add_chunks(&chunks, &vectors),
            Err(Error::CountMismatch {
                chunks: 2,
                vectors: 1
            })
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let (_tmp, store) = test_store();

        store
            .add_chunks(&[chunk("d", 0, "x")], &[vec![1.0, 0.0, 0.0]])
            .unwrap();

        let result =
            store.add_chunks(&[chunk("d", 1, "y")], &[vec![1.0, 0.0]]);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn query_dimension_mismatch_is_rejected() {
        let (_tmp, store) = test_store();

        store
            .add_chunks(&[chunk("d", 0, "x")], &[vec![1.0, 0.0, 0.0]])
            .unwrap();

        assert!(matches!(
            store.search(&[1.0, 0.0], 1),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn readding_same_ids_overwrites() {
        let (_tmp, store) = test_store();

        let chunks = vec![chunk("d.txt", 0, "old text")];
        store.add_chunks(&chunks, &[vec![1.0, 0.0]]).unwrap();

        let chunks = vec![chunk("d.txt", 0, "new text")];
        store.add_chunks(&chunks, &[vec![1.0, 0.0]]).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let hits = store.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].text, "new text");
    }

    #[test]
    fn reset_is_idempotent() {
        let (_tmp, store) = test_store();

        store
            .add_chunks(&[chunk("d", 0, "x")], &[vec![1.0, 0.0]])
            .unwrap();
        assert!(store.reset().unwrap());
        assert!(store.reset().unwrap());
        assert_eq!(store.count().unwrap(), 0);

        store
            .add_chunks(
                &[chunk("e", 0, "fresh"), chunk("e", 1, "start")],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("persist.redb");

        {
            let store = ChunkStore::open(&path).unwrap();
            store
                .add_chunks(&[chunk("d.txt", 0, "kept")], &[vec![0.5, 0.5]])
                .unwrap();
        }

        let store = ChunkStore::open(&path).unwrap();
        assert!(!store.was_created());
        assert_eq!(store.count().unwrap(), 1);
        let hits = store.search(&[0.5, 0.5], 1).unwrap();
        assert_eq!(hits[0].text, "kept");
    }

    #[test]
    fn corrupt_file_falls_back_to_empty_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("corrupt.redb");
        std::fs::write(&path, "this is not a redb file").unwrap();

        let store = ChunkStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        // Magnitude invariance.
        assert!(
            (cosine_similarity(&[2.0, 0.0], &[0.5, 0.0]) - 1.0).abs() < 1e-6
        );
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
