use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("missing embedding credential: {0}")]
    MissingCredential(String),

    #[error("env file error: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("invalid embedding endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("embedding failed for unit {index}: {source}")]
    Unit {
        index: usize,
        #[source]
        source: Box<EmbeddingError>,
    },
}

impl EmbeddingError {
    /// Position of the failing unit when raised from a batch call.
    pub fn unit_index(&self) -> Option<usize> {
        match self {
            Self::Unit { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("sentence tokenizer unavailable: {0}")]
pub struct TokenizerError(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("cannot add an empty batch to the corpus")]
    EmptyBatch,

    #[error("vector count {vectors} doesn't match chunk count {chunks}")]
    LengthMismatch { vectors: usize, chunks: usize },

    #[error("embedding dimension {actual} != corpus dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding vectors must have at least one component")]
    ZeroDimension,

    #[error("corpus is empty; ingest a document first")]
    EmptyCorpus,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("invalid chunking strategy: {0}")]
    InvalidStrategy(String),

    #[error("invalid chunking config: {0}")]
    InvalidConfiguration(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("document produced no chunks: {0}")]
    EmptyDocument(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query is empty")]
    EmptyQuery,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
