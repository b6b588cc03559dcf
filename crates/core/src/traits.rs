use crate::error::EmbeddingError;
use async_trait::async_trait;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds each unit with its own call, in order. The first failure aborts the
    /// batch and carries the index of the unit that failed.
    async fn embed_many(&self, units: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(units.len());
        for (index, unit) in units.iter().enumerate() {
            let vector = self
                .embed(unit)
                .await
                .map_err(|source| EmbeddingError::Unit {
                    index,
                    source: Box::new(source),
                })?;
            vectors.push(vector);
        }
        Ok(vectors)
    }
}
