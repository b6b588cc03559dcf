pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod query;
pub mod traits;

pub use chunking::{
    chunk_by_overlap, chunk_by_paragraph, chunk_by_sentence, chunk_text, overlap_windows, Chunker,
    SentenceTokenizer, UnicodeSentenceTokenizer,
};
pub use embeddings::{EmbeddingConfig, OpenAiEmbedder, DEFAULT_BASE_URL, EMBEDDING_MODEL};
pub use error::{EmbeddingError, IndexError, IngestError, SearchError, TokenizerError};
pub use extractor::{extract_docx_text, extract_pdf_text, FileTextExtractor, TextExtractor};
pub use index::{Corpus, CorpusIndex};
pub use ingest::{discover_documents, IngestionPipeline};
pub use models::{
    BestMatch, ChunkStrategy, Document, DocumentFingerprint, DocumentFormat,
    FolderIngestionReport, IngestionReport, Neighbor, OverlapParams, SkippedDocument,
};
pub use query::QueryService;
pub use traits::Embedder;
