use crate::chunking::Chunker;
use crate::error::IngestError;
use crate::extractor::{FileTextExtractor, TextExtractor};
use crate::index::CorpusIndex;
use crate::models::{
    ChunkStrategy, Document, DocumentFormat, FolderIngestionReport, IngestionReport,
    SkippedDocument,
};
use crate::traits::Embedder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Recursively lists every `.pdf` and `.docx` file under `folder`, sorted.
pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if DocumentFormat::from_path(entry.path()).is_ok() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Extract, chunk, embed and index one document at a time into a shared corpus.
pub struct IngestionPipeline<E, X = FileTextExtractor> {
    embedder: Arc<E>,
    extractor: Arc<X>,
    chunker: Arc<Chunker>,
    index: CorpusIndex,
}

impl<E, X> Clone for IngestionPipeline<E, X> {
    fn clone(&self) -> Self {
        Self {
            embedder: Arc::clone(&self.embedder),
            extractor: Arc::clone(&self.extractor),
            chunker: Arc::clone(&self.chunker),
            index: self.index.clone(),
        }
    }
}

impl<E> IngestionPipeline<E, FileTextExtractor>
where
    E: Embedder + 'static,
{
    pub fn new(embedder: Arc<E>, index: CorpusIndex) -> Self {
        Self::with_extractor(embedder, FileTextExtractor, index)
    }
}

impl<E, X> IngestionPipeline<E, X>
where
    E: Embedder + 'static,
    X: TextExtractor + Send + Sync + 'static,
{
    pub fn with_extractor(embedder: Arc<E>, extractor: X, index: CorpusIndex) -> Self {
        Self {
            embedder,
            extractor: Arc::new(extractor),
            chunker: Arc::new(Chunker::default()),
            index,
        }
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = Arc::new(chunker);
        self
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    /// Runs every stage and appends the chunks to the corpus only if all of them
    /// succeed. Stage errors are returned as-is.
    pub async fn ingest(
        &self,
        document: Document,
        strategy: ChunkStrategy,
    ) -> Result<IngestionReport, IngestError> {
        let fingerprint = document.fingerprint();
        let source = fingerprint.source_path.clone();

        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .map_err(|error| IngestError::Extraction(format!("extraction task failed: {error}")))??;
        debug!(source = %source, chars = text.len(), "extracted text");

        let chunks = self.chunker.chunk(&text, &strategy)?;
        if chunks.is_empty() {
            return Err(IngestError::EmptyDocument(source));
        }
        debug!(source = %source, %strategy, chunk_count = chunks.len(), "chunked text");

        let vectors = self.embedder.embed_many(&chunks).await?;
        let chunks_added = chunks.len();
        let corpus_range = self.index.add(vectors, chunks).await?;

        info!(
            source = %source,
            %strategy,
            chunks_added,
            first_index = corpus_range.start,
            "document ingested"
        );

        Ok(IngestionReport {
            document: fingerprint,
            strategy,
            chunks_added,
            corpus_range,
        })
    }

    pub async fn ingest_path(
        &self,
        path: &Path,
        strategy: ChunkStrategy,
    ) -> Result<IngestionReport, IngestError> {
        let format = DocumentFormat::from_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        self.ingest(Document::new(path, format, bytes), strategy).await
    }

    /// Runs the ingestion on the runtime and hands back the task. Dropping the
    /// handle detaches the task; the corpus update still applies fully or not at all.
    pub fn spawn_ingest(
        &self,
        path: PathBuf,
        strategy: ChunkStrategy,
    ) -> JoinHandle<Result<IngestionReport, IngestError>> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.ingest_path(&path, strategy).await })
    }

    /// Ingests every supported file under `folder` in order, recording failures
    /// instead of stopping at the first one.
    pub async fn ingest_folder(
        &self,
        folder: &Path,
        strategy: ChunkStrategy,
    ) -> Result<FolderIngestionReport, IngestError> {
        let files = discover_documents(folder);

        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no pdf or docx files found in {}",
                folder.display()
            )));
        }

        let mut ingested = Vec::new();
        let mut skipped_files = Vec::new();

        for path in files {
            match self.ingest_path(&path, strategy).await {
                Ok(report) => ingested.push(report),
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipped document");
                    skipped_files.push(SkippedDocument {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        Ok(FolderIngestionReport {
            ingested,
            skipped_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SentenceTokenizer;
    use crate::error::{EmbeddingError, IndexError, TokenizerError};
    use crate::models::OverlapParams;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Returns canned vectors per text and counts every call.
    #[derive(Default)]
    struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        fallback: Option<Vec<f32>>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.to_string(), vector);
            self
        }

        fn with_fallback(mut self, vector: Vec<f32>) -> Self {
            self.fallback = Some(vector);
            self
        }
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.vectors
                .get(text)
                .cloned()
                .or_else(|| self.fallback.clone())
                .ok_or_else(|| EmbeddingError::Status {
                    status: 500,
                    body: format!("no vector for {text}"),
                })
        }
    }

    /// Treats the document bytes as already-extracted UTF-8 text.
    struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract(&self, document: &Document) -> Result<String, IngestError> {
            String::from_utf8(document.bytes.clone())
                .map_err(|error| IngestError::Extraction(error.to_string()))
        }
    }

    fn text_document(name: &str, text: &str) -> Document {
        Document::new(name, DocumentFormat::Docx, text.as_bytes().to_vec())
    }

    fn pipeline(embedder: TableEmbedder) -> IngestionPipeline<TableEmbedder, PlainTextExtractor> {
        IngestionPipeline::with_extractor(Arc::new(embedder), PlainTextExtractor, CorpusIndex::new())
    }

    #[tokio::test]
    async fn paragraph_document_adds_one_entry_per_paragraph() {
        let embedder = TableEmbedder::default()
            .with("Alpha project status is green.", vec![1.0, 0.0])
            .with("Beta project status is red.", vec![0.0, 1.0]);
        let pipeline = pipeline(embedder);

        let report = pipeline
            .ingest(
                text_document(
                    "status.docx",
                    "Alpha project status is green.\n\nBeta project status is red.",
                ),
                ChunkStrategy::Paragraph,
            )
            .await
            .expect("ingestion should succeed");

        assert_eq!(report.chunks_added, 2);
        assert_eq!(report.corpus_range, 0..2);
        assert_eq!(report.document.document_title, "status.docx");
        assert_eq!(pipeline.index().len().await, 2);
        assert_eq!(
            pipeline.index().chunk_text(1).await.as_deref(),
            Some("Beta project status is red.")
        );
    }

    struct OfflineTokenizer;

    impl SentenceTokenizer for OfflineTokenizer {
        fn sentences(&self, _text: &str) -> Result<Vec<String>, TokenizerError> {
            Err(TokenizerError("punkt data missing".to_string()))
        }
    }

    #[tokio::test]
    async fn injected_chunker_falls_back_to_naive_sentence_split() {
        let embedder = TableEmbedder::default()
            .with("Dr", vec![0.0, 1.0])
            .with("Smith arrived", vec![1.0, 0.0])
            .with("He left.", vec![1.0, 1.0]);
        let pipeline = pipeline(embedder).with_chunker(Chunker::new(OfflineTokenizer));

        let report = pipeline
            .ingest(
                text_document("visit.docx", "Dr. Smith arrived. He left."),
                ChunkStrategy::Sentence,
            )
            .await
            .expect("fallback split should still ingest");

        assert_eq!(report.chunks_added, 3);
        assert_eq!(pipeline.index().chunk_text(0).await.as_deref(), Some("Dr"));
        assert_eq!(
            pipeline.index().chunk_text(2).await.as_deref(),
            Some("He left.")
        );
    }

    #[tokio::test]
    async fn empty_document_is_rejected_without_embedding() {
        let embedder = TableEmbedder::default().with_fallback(vec![1.0]);
        let pipeline = pipeline(embedder);

        for strategy in [
            ChunkStrategy::Sentence,
            ChunkStrategy::Paragraph,
            ChunkStrategy::Overlap(OverlapParams::default()),
        ] {
            let result = pipeline
                .ingest(text_document("blank.docx", " \n\n "), strategy)
                .await;
            assert!(matches!(result, Err(IngestError::EmptyDocument(_))));
        }

        assert_eq!(pipeline.embedder.calls.load(Ordering::SeqCst), 0);
        assert!(pipeline.index().is_empty().await);
    }

    #[tokio::test]
    async fn embedding_failure_reports_unit_and_leaves_corpus_untouched() {
        let embedder = TableEmbedder::default()
            .with("one", vec![1.0])
            .with("three", vec![3.0]);
        let pipeline = pipeline(embedder);

        let result = pipeline
            .ingest(text_document("a.docx", "one\ntwo\nthree"), ChunkStrategy::Paragraph)
            .await;

        match result {
            Err(IngestError::Embedding(error)) => assert_eq!(error.unit_index(), Some(1)),
            other => panic!("expected embedding error, got {other:?}"),
        }
        assert!(pipeline.index().is_empty().await);
    }

    #[tokio::test]
    async fn dimension_change_between_documents_is_rejected() {
        let embedder = TableEmbedder::default()
            .with("first doc", vec![1.0, 0.0])
            .with("second doc", vec![1.0, 0.0, 0.0]);
        let pipeline = pipeline(embedder);

        pipeline
            .ingest(text_document("a.docx", "first doc"), ChunkStrategy::Paragraph)
            .await
            .expect("first ingestion should succeed");

        let result = pipeline
            .ingest(text_document("b.docx", "second doc"), ChunkStrategy::Paragraph)
            .await;

        assert!(matches!(
            result,
            Err(IngestError::Index(IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }))
        ));
        assert_eq!(pipeline.index().len().await, 1);
    }

    #[tokio::test]
    async fn sequential_documents_share_one_corpus() {
        let embedder = TableEmbedder::default().with_fallback(vec![0.5, 0.5]);
        let pipeline = pipeline(embedder);

        let first = pipeline
            .ingest(
                text_document("a.docx", "The pump failed. The valve held."),
                ChunkStrategy::Sentence,
            )
            .await
            .expect("first ingestion should succeed");
        let second = pipeline
            .ingest(
                text_document("b.docx", "one two three four five"),
                ChunkStrategy::Overlap(OverlapParams {
                    window_size: 2,
                    overlap: 0,
                }),
            )
            .await
            .expect("second ingestion should succeed");

        assert_eq!(first.corpus_range, 0..2);
        assert_eq!(second.corpus_range, 2..5);
        assert_eq!(pipeline.index().len().await, 5);
        assert_eq!(
            pipeline.index().chunk_text(0).await.as_deref(),
            Some("The pump failed.")
        );
        assert_eq!(
            pipeline.index().chunk_text(4).await.as_deref(),
            Some("five")
        );
    }

    #[tokio::test]
    async fn spawned_ingestion_reads_documents_from_disk() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let unsupported = dir.path().join("notes.txt");
        fs::write(&unsupported, "plain text")?;

        let pipeline = IngestionPipeline::new(
            Arc::new(TableEmbedder::default().with_fallback(vec![1.0])),
            CorpusIndex::new(),
        );

        let result = pipeline
            .spawn_ingest(unsupported, ChunkStrategy::Paragraph)
            .await?;
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));

        let broken = dir.path().join("broken.pdf");
        fs::write(&broken, b"%PDF-1.4\n%broken")?;
        let result = pipeline.spawn_ingest(broken, ChunkStrategy::Paragraph).await?;
        assert!(matches!(result, Err(IngestError::Extraction(_))));
        assert!(pipeline.index().is_empty().await);
        Ok(())
    }

    #[test]
    fn discover_documents_is_recursive_and_filters_formats() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;

        fs::write(dir.path().join("a.pdf"), b"%PDF-1.4\n%fake")?;
        fs::write(nested.join("b.DOCX"), b"PK")?;
        fs::write(nested.join("c.txt"), b"skip me")?;

        let files = discover_documents(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|path| path.extension().is_some()));
        Ok(())
    }

    #[tokio::test]
    async fn folder_ingestion_skips_unreadable_documents() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;

        let pipeline = IngestionPipeline::new(
            Arc::new(TableEmbedder::default().with_fallback(vec![1.0])),
            CorpusIndex::new(),
        );
        let report = pipeline
            .ingest_folder(dir.path(), ChunkStrategy::Paragraph)
            .await?;

        assert_eq!(report.chunks_added(), 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(
            report.skipped_files[0]
                .path
                .file_name()
                .and_then(|name| name.to_str()),
            Some("unreadable.pdf")
        );

        let empty = tempdir()?;
        let result = pipeline
            .ingest_folder(empty.path(), ChunkStrategy::Paragraph)
            .await;
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }
}
