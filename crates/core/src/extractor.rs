use crate::error::IngestError;
use crate::models::{Document, DocumentFormat};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// Maximum decompressed size read from `word/document.xml`.
const MAX_DOCX_XML_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY_ENTRY: &str = "word/document.xml";

pub trait TextExtractor {
    fn extract(&self, document: &Document) -> Result<String, IngestError>;
}

/// Extracts PDF text with `lopdf` and DOCX text straight from the OOXML package.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTextExtractor;

impl TextExtractor for FileTextExtractor {
    fn extract(&self, document: &Document) -> Result<String, IngestError> {
        match document.format {
            DocumentFormat::Pdf => extract_pdf_text(&document.bytes),
            DocumentFormat::Docx => extract_docx_text(&document.bytes),
        }
    }
}

/// Concatenates the text of every page in page order. Page boundaries are not kept.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|error| IngestError::Extraction(format!("pdf parse error: {error}")))?;

    if document.is_encrypted() {
        return Err(IngestError::Extraction("pdf is encrypted".to_string()));
    }

    let mut text = String::new();
    for page_no in document.get_pages().into_keys() {
        let page_text = document.extract_text(&[page_no]).map_err(|error| {
            IngestError::Extraction(format!("pdf page {page_no} text error: {error}"))
        })?;
        text.push_str(&page_text);
    }

    Ok(text)
}

/// Joins the body-level paragraphs with a blank line. Table cells and text boxes are skipped.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| IngestError::Extraction(format!("docx archive error: {error}")))?;

    let entry = archive.by_name(DOCX_BODY_ENTRY).map_err(|error| {
        IngestError::Extraction(format!("docx is missing {DOCX_BODY_ENTRY}: {error}"))
    })?;

    let mut xml = Vec::new();
    entry.take(MAX_DOCX_XML_BYTES).read_to_end(&mut xml)?;
    if xml.len() as u64 >= MAX_DOCX_XML_BYTES {
        return Err(IngestError::Extraction(format!(
            "{DOCX_BODY_ENTRY} exceeds size limit ({MAX_DOCX_XML_BYTES} bytes)"
        )));
    }

    Ok(docx_paragraphs(&xml)?.join("\n\n"))
}

fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, IngestError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_text = false;
    let mut in_properties = false;
    // Open `w:tbl` / `w:txbxContent` elements; everything inside them is ignored.
    let mut excluded = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|error| IngestError::Extraction(format!("docx xml error: {error}")))?
        {
            Event::Start(element) => match element.local_name().as_ref() {
                b"tbl" | b"txbxContent" => excluded += 1,
                _ if excluded > 0 => {}
                b"p" => {
                    depth += 1;
                    if depth == 1 {
                        current.clear();
                    }
                }
                b"pPr" => in_properties = true,
                b"t" => in_text = depth > 0,
                _ => {}
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                _ if excluded > 0 => {}
                b"p" if depth == 0 => paragraphs.push(String::new()),
                b"tab" if depth > 0 && !in_properties => current.push('\t'),
                b"br" | b"cr" if depth > 0 && !in_properties => current.push('\n'),
                _ => {}
            },
            Event::End(element) => match element.local_name().as_ref() {
                b"tbl" | b"txbxContent" => excluded = excluded.saturating_sub(1),
                _ if excluded > 0 => {}
                b"p" if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                b"pPr" => in_properties = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(text) if in_text && excluded == 0 => {
                let unescaped = text
                    .unescape()
                    .map_err(|error| IngestError::Extraction(format!("docx text error: {error}")))?;
                current.push_str(&unescaped);
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    Ok(paragraphs)
}
