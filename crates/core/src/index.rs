use crate::error::IndexError;
use crate::models::Neighbor;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-only flat vector store with the chunk text of every entry.
///
/// Row `i` of `vectors` and `chunks[i]` describe the same entry; the row index is
/// the entry's identity for the lifetime of the corpus.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    dimension: Option<usize>,
    vectors: Vec<f32>,
    chunks: Vec<String>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn chunk_text(&self, index: usize) -> Option<&str> {
        self.chunks.get(index).map(String::as_str)
    }

    /// Appends every pair or nothing. Returns the indices assigned to the new entries.
    pub fn add(
        &mut self,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<String>,
    ) -> Result<Range<usize>, IndexError> {
        if vectors.len() != chunks.len() {
            return Err(IndexError::LengthMismatch {
                vectors: vectors.len(),
                chunks: chunks.len(),
            });
        }

        let expected = match (self.dimension, vectors.first()) {
            (_, None) => return Err(IndexError::EmptyBatch),
            (Some(dimension), _) => dimension,
            (None, Some(first)) if first.is_empty() => return Err(IndexError::ZeroDimension),
            (None, Some(first)) => first.len(),
        };

        if let Some(mismatch) = vectors.iter().find(|vector| vector.len() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: mismatch.len(),
            });
        }

        let start = self.len();
        self.dimension = Some(expected);
        self.vectors.reserve(vectors.len() * expected);
        for vector in vectors {
            self.vectors.extend(vector);
        }
        self.chunks.extend(chunks);

        Ok(start..self.len())
    }

    /// Brute-force scan returning the `k` closest entries by squared Euclidean
    /// distance, nearest first, ties resolved by insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        let dimension = match self.dimension {
            Some(dimension) if !self.is_empty() => dimension,
            _ => return Err(IndexError::EmptyCorpus),
        };

        if query.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let mut neighbors = self
            .vectors
            .chunks_exact(dimension)
            .enumerate()
            .map(|(chunk_index, stored)| Neighbor {
                distance: squared_l2(query, stored),
                chunk_index,
            })
            .collect::<Vec<_>>();

        neighbors.sort_by(|left, right| {
            left.distance
                .total_cmp(&right.distance)
                .then(left.chunk_index.cmp(&right.chunk_index))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| {
            let delta = a - b;
            delta * delta
        })
        .sum()
}

/// Shared handle to the process-wide corpus.
///
/// Additions take the write lock, so the dimension check and the append happen as
/// one step. Searches hold the read lock for the whole scan and therefore always
/// see a complete snapshot.
#[derive(Debug, Default, Clone)]
pub struct CorpusIndex {
    inner: Arc<RwLock<Corpus>>,
}

impl CorpusIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(
        &self,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<String>,
    ) -> Result<Range<usize>, IndexError> {
        self.inner.write().await.add(vectors, chunks)
    }

    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        self.inner.read().await.search(query, k)
    }

    /// Searches and resolves each hit to its chunk text under one read lock.
    pub async fn search_with_text(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(Neighbor, String)>, IndexError> {
        let corpus = self.inner.read().await;
        let neighbors = corpus.search(query, k)?;

        Ok(neighbors
            .into_iter()
            .filter_map(|neighbor| {
                corpus
                    .chunk_text(neighbor.chunk_index)
                    .map(|text| (neighbor, text.to_string()))
            })
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn dimension(&self) -> Option<usize> {
        self.inner.read().await.dimension()
    }

    pub async fn chunk_text(&self, index: usize) -> Option<String> {
        self.inner
            .read()
            .await
            .chunk_text(index)
            .map(str::to_string)
    }
}
