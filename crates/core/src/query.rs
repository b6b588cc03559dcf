use crate::error::{IndexError, SearchError};
use crate::index::CorpusIndex;
use crate::models::BestMatch;
use crate::traits::Embedder;
use std::sync::Arc;
use tracing::debug;

pub struct QueryService<E> {
    embedder: Arc<E>,
    index: CorpusIndex,
}

impl<E> Clone for QueryService<E> {
    fn clone(&self) -> Self {
        Self {
            embedder: Arc::clone(&self.embedder),
            index: self.index.clone(),
        }
    }
}

impl<E> QueryService<E>
where
    E: Embedder,
{
    pub fn new(embedder: Arc<E>, index: CorpusIndex) -> Self {
        Self { embedder, index }
    }

    /// Returns the single stored chunk closest to `text`.
    pub async fn query(&self, text: &str) -> Result<BestMatch, SearchError> {
        self.query_top_k(text, 1)
            .await?
            .into_iter()
            .next()
            .ok_or(SearchError::Index(IndexError::EmptyCorpus))
    }

    /// Returns up to `k` stored chunks, nearest first.
    pub async fn query_top_k(&self, text: &str, k: usize) -> Result<Vec<BestMatch>, SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if self.index.is_empty().await {
            return Err(IndexError::EmptyCorpus.into());
        }

        let query_vector = self.embedder.embed(text).await?;
        let hits = self.index.search_with_text(&query_vector, k).await?;
        debug!(k, hits = hits.len(), "query answered");

        Ok(hits
            .into_iter()
            .map(|(neighbor, chunk_text)| BestMatch {
                chunk_index: neighbor.chunk_index,
                distance: neighbor.distance,
                chunk_text,
            })
            .collect())
    }
}
