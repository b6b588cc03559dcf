use crate::error::{IngestError, TokenizerError};
use crate::models::{ChunkStrategy, OverlapParams};
use std::ops::Range;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

const NAIVE_SENTENCE_DELIMITER: &str = ". ";

pub trait SentenceTokenizer {
    fn sentences(&self, text: &str) -> Result<Vec<String>, TokenizerError>;
}

/// Sentence boundaries from Unicode text segmentation (UAX #29).
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeSentenceTokenizer;

impl SentenceTokenizer for UnicodeSentenceTokenizer {
    fn sentences(&self, text: &str) -> Result<Vec<String>, TokenizerError> {
        Ok(text
            .unicode_sentences()
            .map(|sentence| sentence.trim().to_string())
            .filter(|sentence| !sentence.is_empty())
            .collect())
    }
}

pub struct Chunker {
    tokenizer: Box<dyn SentenceTokenizer + Send + Sync>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(UnicodeSentenceTokenizer)
    }
}

impl Chunker {
    pub fn new(tokenizer: impl SentenceTokenizer + Send + Sync + 'static) -> Self {
        Self {
            tokenizer: Box::new(tokenizer),
        }
    }

    /// Splits `text` into ordered, non-empty units. Blank text yields no units.
    pub fn chunk(&self, text: &str, strategy: &ChunkStrategy) -> Result<Vec<String>, IngestError> {
        match strategy {
            ChunkStrategy::Sentence => Ok(chunk_by_sentence(text, self.tokenizer.as_ref())),
            ChunkStrategy::Paragraph => Ok(chunk_by_paragraph(text)),
            ChunkStrategy::Overlap(params) => chunk_by_overlap(text, *params),
        }
    }
}

pub fn chunk_text(text: &str, strategy: &ChunkStrategy) -> Result<Vec<String>, IngestError> {
    Chunker::default().chunk(text, strategy)
}

pub fn chunk_by_sentence(text: &str, tokenizer: &dyn SentenceTokenizer) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    match tokenizer.sentences(text) {
        Ok(sentences) => sentences,
        Err(error) => {
            warn!(%error, "sentence tokenizer failed, splitting on \". \"");
            naive_sentence_split(text)
        }
    }
}

fn naive_sentence_split(text: &str) -> Vec<String> {
    text.split(NAIVE_SENTENCE_DELIMITER)
        .map(|sentence| sentence.trim().to_string())
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

pub fn chunk_by_paragraph(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn chunk_by_overlap(text: &str, params: OverlapParams) -> Result<Vec<String>, IngestError> {
    let words = text.split_whitespace().collect::<Vec<_>>();
    let windows = overlap_windows(words.len(), params)?;

    Ok(windows
        .into_iter()
        .map(|window| words[window].join(" "))
        .collect())
}

/// Word ranges covered by each overlap window, in order.
pub fn overlap_windows(
    word_count: usize,
    params: OverlapParams,
) -> Result<Vec<Range<usize>>, IngestError> {
    let params = params.validate()?;

    Ok((0..word_count)
        .step_by(params.step())
        .map(|start| start..start.saturating_add(params.window_size).min(word_count))
        .collect())
}
