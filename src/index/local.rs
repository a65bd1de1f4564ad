//! In-process vector index with exhaustive Euclidean search.

use crate::index::{
    VectorIndex,
    types::{IndexEntry, IndexError, IndexMatch},
};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Flat, mutex-guarded store of index entries.
///
/// Every upsert batch is appended under a single lock acquisition, so concurrent writers never
/// interleave partial batches. Entries are never replaced: upserting an id twice stores it twice.
pub struct LocalIndex {
    dimension: usize,
    entries: Mutex<Vec<IndexEntry>>,
}

impl LocalIndex {
    /// Create an empty index accepting vectors of width `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<IndexEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            })
        }
    }
}

fn euclidean_distance(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f32>()
        .sqrt()
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        for entry in &entries {
            self.check_dimension(&entry.vector)?;
        }
        let added = entries.len();
        let mut store = self.entries();
        store.extend(entries);
        tracing::debug!(added, total = store.len(), "Local index appended entries");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidTopK(top_k));
        }
        self.check_dimension(vector)?;

        let store = self.entries();
        let mut ranked: Vec<(f32, &IndexEntry)> = store
            .iter()
            .map(|entry| (euclidean_distance(vector, &entry.vector), entry))
            .collect();
        // Stable sort: equal distances keep insertion order.
        ranked.sort_by(|left, right| left.0.total_cmp(&right.0));

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(distance, entry)| IndexMatch {
                id: entry.id.clone(),
                text: entry.metadata.text.clone(),
                score: distance,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.entries().len())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::EntryMetadata;
    use std::sync::Arc;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            metadata: EntryMetadata {
                text: format!("text-{id}"),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn empty_index_returns_no_matches() {
        let index = LocalIndex::new(2);
        let matches = index.query(&[0.0, 0.0], 3).await.expect("query");
        assert!(matches.is_empty());
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn single_entry_is_returned() {
        let index = LocalIndex::new(2);
        index.upsert(vec![entry("a", vec![1.0, 1.0])]).await.unwrap();
        let matches = index.query(&[0.0, 0.0], 5).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "text-a");
        assert!((matches[0].score - 2.0_f32.sqrt()).abs() < 1e-6);
    }

    #[tokio::test]
    async fn results_are_sorted_by_ascending_distance_and_truncated() {
        let index = LocalIndex::new(2);
        index
            .upsert(vec![
                entry("far", vec![10.0, 0.0]),
                entry("near", vec![1.0, 0.0]),
                entry("exact", vec![0.0, 0.0]),
                entry("mid", vec![3.0, 0.0]),
            ])
            .await
            .unwrap();

        let matches = index.query(&[0.0, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near", "mid"]);
        assert_eq!(matches[0].score, 0.0);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let index = LocalIndex::new(1);
        index
            .upsert(vec![entry("first", vec![1.0]), entry("second", vec![-1.0])])
            .await
            .unwrap();
        let matches = index.query(&[0.0], 2).await.unwrap();
        assert_eq!(matches[0].id, "first");
        assert_eq!(matches[1].id, "second");
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected() {
        let index = LocalIndex::new(2);
        let error = index.query(&[0.0, 0.0], 0).await.unwrap_err();
        assert!(matches!(error, IndexError::InvalidTopK(0)));
    }

    #[tokio::test]
    async fn repeated_upsert_appends() {
        let index = LocalIndex::new(1);
        index.upsert(vec![entry("dup", vec![0.5])]).await.unwrap();
        index.upsert(vec![entry("dup", vec![0.5])]).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected_without_partial_writes() {
        let index = LocalIndex::new(2);
        let error = index
            .upsert(vec![entry("ok", vec![0.0, 0.0]), entry("bad", vec![0.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            IndexError::DimensionMismatch { expected: 2, actual: 1 }
        ));
        assert_eq!(index.count().await.unwrap(), 0);

        let error = index.query(&[0.0, 0.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(error, IndexError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn concurrent_batches_are_appended_whole() {
        let index = Arc::new(LocalIndex::new(1));
        let mut handles = Vec::new();
        for writer in 0..8 {
            let index = Arc::clone(&index);
            handles.push(tokio::spawn(async move {
                let batch = (0..25)
                    .map(|n| entry(&format!("{writer}-{n}"), vec![writer as f32]))
                    .collect();
                index.upsert(batch).await
            }));
        }
        for handle in handles {
            handle.await.expect("task").expect("upsert");
        }

        assert_eq!(index.count().await.unwrap(), 200);
        let store = index.entries();
        for batch in store.chunks(25) {
            let writer = batch[0].vector[0];
            assert!(batch.iter().all(|entry| entry.vector[0] == writer));
        }
    }
}
