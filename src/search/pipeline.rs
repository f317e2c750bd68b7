//! Query → embedding → neighbors → ids → records → summaries.

use serde::Serialize;

use crate::error::SearchError;
use crate::models::HostelSummary;
use crate::search::index::EMPTY_SLOT;
use crate::state::AppState;

/// Neighbors requested from the index per query.
pub const TOP_K: usize = 5;

/// How many neighbor slots made it through hydration, and why the rest didn't.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HydrationReport {
    /// Slots returned by the index.
    pub requested: usize,
    /// Slots whose position has no id (padding or past the id array).
    pub out_of_range: usize,
    /// Ids with no record in the store.
    pub missing: usize,
    pub hydrated: usize,
}

impl HydrationReport {
    pub fn dropped(&self) -> usize {
        self.out_of_range + self.missing
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The index reported no neighbors at all.
    NoMatches,
    /// Hydrated hits in index order. May be empty when every slot was dropped;
    /// `report` tells that case apart from `NoMatches`.
    Hits {
        hits: Vec<HostelSummary>,
        report: HydrationReport,
    },
}

/// Run one search request against `state`.
pub async fn run_search(state: &AppState, raw_query: &str) -> Result<SearchOutcome, SearchError> {
    let query = raw_query.trim();
    if query.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let Some(loaded) = state.index.as_deref() else {
        tracing::error!("Search requested but the vector index is not available");
        return Err(SearchError::IndexUnavailable);
    };

    tracing::info!("Generating embedding for query: {query}");
    let embedding = state.embedder.embed(query).await.map_err(|e| {
        tracing::error!("Error generating embedding: {e:#}");
        SearchError::Embedding(e)
    })?;

    if embedding.len() != loaded.index.dimension() {
        return Err(SearchError::DimensionMismatch {
            expected: loaded.index.dimension(),
            actual: embedding.len(),
        });
    }

    let neighbors = loaded.index.search(&embedding, TOP_K);
    if neighbors.first().map(|n| n.position) == Some(EMPTY_SLOT) {
        return Ok(SearchOutcome::NoMatches);
    }

    let mut report = HydrationReport {
        requested: neighbors.len(),
        ..HydrationReport::default()
    };
    let mut hits = Vec::with_capacity(neighbors.len());

    for neighbor in &neighbors {
        let Some(id) = loaded.ids.get(neighbor.position) else {
            report.out_of_range += 1;
            continue;
        };
        let record = state.store.get(id).await.map_err(|e| {
            tracing::error!("Record lookup failed for {id}: {e:#}");
            SearchError::RecordStore(e)
        })?;
        match record {
            Some(record) => hits.push(HostelSummary::from_record(&record)),
            None => {
                tracing::debug!("No record for id {id} at position {}", neighbor.position);
                report.missing += 1;
            }
        }
    }
    report.hydrated = hits.len();

    if report.dropped() > 0 {
        tracing::warn!(
            "Hydrated {} of {} neighbors ({} out of range, {} missing records)",
            report.hydrated,
            report.requested,
            report.out_of_range,
            report.missing
        );
    }

    Ok(SearchOutcome::Hits { hits, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::embeddings::Embedder;
    use crate::search::ids::IdMap;
    use crate::search::index::{FlatIndex, Metric};
    use crate::search::locate::LoadedIndex;
    use crate::store::json::JsonRecordStore;
    use crate::store::{Record, RecordStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns a fixed vector and counts calls.
    struct FixedEmbedder {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FixedEmbedder {
        fn new(vector: Vec<f32>) -> Arc<Self> {
            Arc::new(Self {
                vector,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("quota exceeded")
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn get(&self, _id: &str) -> anyhow::Result<Option<Record>> {
            anyhow::bail!("connection refused")
        }
    }

    /// 1-D index with vectors at 0.0, 1.0, ..., n-1 and ids "h0".."h{n-1}".
    fn line_index(n: usize) -> LoadedIndex {
        let vectors = (0..n).map(|i| i as f32).collect();
        let index = FlatIndex::new(1, Metric::L2, vectors).unwrap();
        let ids = IdMap::new((0..n).map(|i| format!("h{i}")).collect());
        LoadedIndex::new(index, ids)
    }

    fn store_with(ids: &[&str]) -> Arc<JsonRecordStore> {
        let docs = ids
            .iter()
            .map(|id| json!({"_id": id, "name": format!("Hostel {id}")}))
            .collect();
        Arc::new(JsonRecordStore::from_documents(docs).unwrap())
    }

    #[tokio::test]
    async fn test_blank_query_skips_embedding() {
        let embedder = FixedEmbedder::new(vec![0.0]);
        let state = AppState::new(embedder.clone(), Some(line_index(3)), store_with(&[]));

        for query in ["", "   ", "\t\n"] {
            let err = run_search(&state, query).await.unwrap_err();
            assert!(matches!(err, SearchError::EmptyQuery));
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_index_skips_embedding() {
        let embedder = FixedEmbedder::new(vec![0.0]);
        let state = AppState::new(embedder.clone(), None, store_with(&["h0"]));

        let err = run_search(&state, "cheap hostel").await.unwrap_err();
        assert!(matches!(err, SearchError::IndexUnavailable));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure() {
        let state = AppState::new(Arc::new(FailingEmbedder), Some(line_index(3)), store_with(&[]));
        let err = run_search(&state, "cheap hostel").await.unwrap_err();
        assert!(matches!(err, SearchError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let state = AppState::new(
            FixedEmbedder::new(vec![0.0, 1.0]),
            Some(line_index(3)),
            store_with(&[]),
        );
        let err = run_search(&state, "cheap hostel").await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_index_is_no_matches() {
        let state = AppState::new(
            FixedEmbedder::new(vec![0.0]),
            Some(line_index(0)),
            store_with(&["h0"]),
        );
        let outcome = run_search(&state, "cheap hostel").await.unwrap();
        assert_eq!(outcome, SearchOutcome::NoMatches);
    }

    #[tokio::test]
    async fn test_hits_follow_index_order() {
        let state = AppState::new(
            FixedEmbedder::new(vec![3.1]),
            Some(line_index(10)),
            store_with(&["h1", "h2", "h3", "h4", "h5"]),
        );
        let SearchOutcome::Hits { hits, report } = run_search(&state, "hostel").await.unwrap()
        else {
            panic!("expected hits");
        };
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["h3", "h4", "h2", "h5", "h1"]);
        assert_eq!(report.hydrated, TOP_K);
        assert_eq!(report.dropped(), 0);
    }

    #[tokio::test]
    async fn test_missing_records_are_dropped_and_counted() {
        // Neighbors of 0.0 are h0..h4; only three of them exist in the store
        let state = AppState::new(
            FixedEmbedder::new(vec![0.0]),
            Some(line_index(8)),
            store_with(&["h0", "h2", "h4"]),
        );
        let SearchOutcome::Hits { hits, report } = run_search(&state, "hostel").await.unwrap()
        else {
            panic!("expected hits");
        };
        assert_eq!(hits.len(), 3);
        assert_eq!(
            report,
            HydrationReport {
                requested: 5,
                out_of_range: 0,
                missing: 2,
                hydrated: 3
            }
        );
        assert!(hits.iter().all(|h| h.location == crate::models::DEFAULT_LOCATION));
    }

    #[tokio::test]
    async fn test_positions_past_id_array_are_dropped() {
        // Index has 4 vectors but only 2 ids; padding fills slot 5
        let index = FlatIndex::new(1, Metric::L2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let ids = IdMap::new(vec!["h0".to_string(), "h1".to_string()]);
        let state = AppState::new(
            FixedEmbedder::new(vec![0.0]),
            Some(LoadedIndex::new(index, ids)),
            store_with(&["h0", "h1"]),
        );
        let SearchOutcome::Hits { hits, report } = run_search(&state, "hostel").await.unwrap()
        else {
            panic!("expected hits");
        };
        assert_eq!(hits.len(), 2);
        assert_eq!(report.out_of_range, 3);
        assert_eq!(report.requested, 5);
    }

    #[tokio::test]
    async fn test_all_dropped_is_distinguishable_from_no_matches() {
        let state = AppState::new(
            FixedEmbedder::new(vec![0.0]),
            Some(line_index(5)),
            store_with(&[]),
        );
        let outcome = run_search(&state, "hostel").await.unwrap();
        match outcome {
            SearchOutcome::Hits { hits, report } => {
                assert!(hits.is_empty());
                assert_eq!(report.missing, 5);
            }
            SearchOutcome::NoMatches => panic!("all-dropped must not look like no matches"),
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error() {
        let state = AppState::new(
            FixedEmbedder::new(vec![0.0]),
            Some(line_index(3)),
            Arc::new(BrokenStore),
        );
        let err = run_search(&state, "hostel").await.unwrap_err();
        assert!(matches!(err, SearchError::RecordStore(_)));
    }

    #[tokio::test]
    async fn test_repeated_queries_are_stable() {
        let state = AppState::new(
            FixedEmbedder::new(vec![2.4]),
            Some(line_index(6)),
            store_with(&["h0", "h1", "h2", "h3", "h4", "h5"]),
        );
        let first = run_search(&state, "hostel").await.unwrap();
        let second = run_search(&state, "hostel").await.unwrap();
        assert_eq!(first, second);
    }
}
