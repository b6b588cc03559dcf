use crate::error::IngestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_WINDOW_WORDS: usize = 200;
pub const DEFAULT_OVERLAP_WORDS: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Detects the format from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        if extension.eq_ignore_ascii_case("pdf") {
            Ok(Self::Pdf)
        } else if extension.eq_ignore_ascii_case("docx") {
            Ok(Self::Docx)
        } else {
            Err(IngestError::UnsupportedFormat(path.display().to_string()))
        }
    }
}

/// Raw document bytes waiting for text extraction.
#[derive(Debug, Clone)]
pub struct Document {
    pub source_path: PathBuf,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(source_path: impl Into<PathBuf>, format: DocumentFormat, bytes: Vec<u8>) -> Self {
        Self {
            source_path: source_path.into(),
            format,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let format = DocumentFormat::from_path(path)?;
        let bytes = std::fs::read(path)?;
        Ok(Self::new(path, format, bytes))
    }

    pub fn fingerprint(&self) -> DocumentFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);

        let title = self
            .source_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        DocumentFingerprint {
            document_title: title,
            source_path: self.source_path.to_string_lossy().to_string(),
            format: self.format,
            checksum: format!("{:x}", hasher.finalize()),
            ingested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_title: String,
    pub source_path: String,
    pub format: DocumentFormat,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct OverlapParams {
    pub window_size: usize,
    pub overlap: usize,
}

impl OverlapParams {
    pub fn validate(self) -> Result<Self, IngestError> {
        if self.window_size == 0 {
            return Err(IngestError::InvalidConfiguration(
                "window size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.window_size {
            return Err(IngestError::InvalidConfiguration(format!(
                "overlap {} must be smaller than window size {}",
                self.overlap, self.window_size
            )));
        }
        Ok(self)
    }

    /// Number of words the window start advances per step.
    pub fn step(self) -> usize {
        self.window_size - self.overlap
    }
}

impl Default for OverlapParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_WORDS,
            overlap: DEFAULT_OVERLAP_WORDS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChunkStrategy {
    Sentence,
    Paragraph,
    Overlap(OverlapParams),
}

impl ChunkStrategy {
    /// Resolves a strategy name, using `params` when the name is `overlap`.
    pub fn from_name(name: &str, params: OverlapParams) -> Result<Self, IngestError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sentence" => Ok(Self::Sentence),
            "paragraph" => Ok(Self::Paragraph),
            "overlap" => Ok(Self::Overlap(params.validate()?)),
            other => Err(IngestError::InvalidStrategy(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
            Self::Overlap(_) => "overlap",
        }
    }
}

impl FromStr for ChunkStrategy {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_name(value, OverlapParams::default())
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One scored entry returned by a nearest-neighbour scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BestMatch {
    pub chunk_index: usize,
    pub distance: f32,
    pub chunk_text: String,
}

impl fmt::Display for BestMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Most Similar Chunk (Distance: {}):\n{}",
            self.distance, self.chunk_text
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    pub document: DocumentFingerprint,
    pub strategy: ChunkStrategy,
    pub chunks_added: usize,
    pub corpus_range: Range<usize>,
}

pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

pub struct FolderIngestionReport {
    pub ingested: Vec<IngestionReport>,
    pub skipped_files: Vec<SkippedDocument>,
}

impl FolderIngestionReport {
    pub fn chunks_added(&self) -> usize {
        self.ingested.iter().map(|report| report.chunks_added).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_ignores_case() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("/tmp/Report.PDF")).ok(),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.docx")).ok(),
            Some(DocumentFormat::Docx)
        );
        assert!(matches!(
            DocumentFormat::from_path(Path::new("notes.txt")),
            Err(IngestError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            DocumentFormat::from_path(Path::new("no_extension")),
            Err(IngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = "semantic".parse::<ChunkStrategy>();
        assert!(matches!(result, Err(IngestError::InvalidStrategy(name)) if name == "semantic"));
    }

    #[test]
    fn overlap_strategy_validates_params() {
        let params = OverlapParams {
            window_size: 10,
            overlap: 10,
        };
        let result = ChunkStrategy::from_name("overlap", params);
        assert!(matches!(result, Err(IngestError::InvalidConfiguration(_))));

        let parsed = "Overlap".parse::<ChunkStrategy>().expect("default params are valid");
        assert_eq!(parsed, ChunkStrategy::Overlap(OverlapParams::default()));
    }

    #[test]
    fn best_match_renders_display_string() {
        let best = BestMatch {
            chunk_index: 0,
            distance: 0.5,
            chunk_text: "Alpha".to_string(),
        };
        assert_eq!(best.to_string(), "Most Similar Chunk (Distance: 0.5):\nAlpha");
    }

    #[test]
    fn fingerprint_checksum_is_reproducible() {
        let document = Document::new("/tmp/a.pdf", DocumentFormat::Pdf, b"abc".to_vec());
        let first = document.fingerprint();
        let second = document.fingerprint();
        assert_eq!(first.checksum, second.checksum);
        assert_eq!(first.document_title, "a.pdf");
    }
}
