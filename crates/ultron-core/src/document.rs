//! PDF ingestion: turns an uploaded document into plain text context.
//!
//! Join policy: within a page, text items are trimmed, empty items dropped, and
//! the rest joined by a single space. Every page is followed by one `'\n'`, so
//! three pages reading `a`, `b`, `c` extract to `"a\nb\nc\n"`.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Encoding, Object, ObjectId};
use tracing::debug;

use crate::error::ExtractionError;

pub const PDF_MIME: &str = "application/pdf";

/// A file handed to the session for attachment
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, deriving its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, mime_for_path(path), bytes))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME)
    }
}

/// Guess a MIME type from a file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => PDF_MIME,
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Extracted text of the attached document.
///
/// Lives beside the message history, never inside it: it only reaches the
/// backend through the assembled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    pub file_name: String,
    pub raw_text: String,
}

pub struct DocumentTextExtractor;

impl DocumentTextExtractor {
    /// Extract the text of every page, in page order.
    pub fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
        let doc =
            Document::load_mem(bytes).map_err(|e| ExtractionError::InvalidPdf(e.to_string()))?;

        let mut text = String::new();
        // get_pages is keyed by page number, so iteration is in document order
        for (page, page_id) in doc.get_pages() {
            let items = page_text_items(&doc, page_id).map_err(|e| ExtractionError::PageDecode {
                page,
                reason: e.to_string(),
            })?;
            text.push_str(&join_text_items(&items));
            text.push('\n');
        }

        debug!(chars = text.len(), "extracted document text");
        Ok(text)
    }

    /// Check the upload type, then extract off the async executor.
    pub async fn extract_upload(upload: DocumentUpload) -> Result<DocumentContext, ExtractionError> {
        if !upload.is_pdf() {
            return Err(ExtractionError::UnsupportedType(upload.mime_type));
        }

        let DocumentUpload { file_name, bytes, .. } = upload;
        let raw_text = tokio::task::spawn_blocking(move || Self::extract(&bytes))
            .await
            .map_err(|e| ExtractionError::Join(e.to_string()))??;

        Ok(DocumentContext { file_name, raw_text })
    }
}

/// One item per text-showing operation (`Tj`, `TJ`, `'`, `"`), in stream order.
fn page_text_items(doc: &Document, page_id: ObjectId) -> lopdf::Result<Vec<String>> {
    let encodings = doc
        .get_page_fonts(page_id)?
        .into_iter()
        .map(|(name, font)| font.get_font_encoding(doc).map(|encoding| (name, encoding)))
        .collect::<lopdf::Result<BTreeMap<Vec<u8>, Encoding>>>()?;

    let raw = doc.get_page_content(page_id)?;
    let content = Content::decode(&raw)?;
    // The content parser stops quietly at the first bad token
    if content.operations.is_empty() && raw.iter().any(|b| !b.is_ascii_whitespace()) {
        return Err(lopdf::Error::ContentDecode);
    }

    let mut items = Vec::new();
    let mut current_encoding: Option<&Encoding> = None;
    for operation in &content.operations {
        let shown = match operation.operator.as_str() {
            "Tf" => {
                current_encoding = operation
                    .operands
                    .first()
                    .and_then(|font| font.as_name().ok())
                    .and_then(|font| encodings.get(font));
                continue;
            }
            "Tj" | "'" | "TJ" => operation.operands.first(),
            "\"" => operation.operands.get(2),
            _ => continue,
        };

        let (Some(operand), Some(encoding)) = (shown, current_encoding) else {
            debug!(operator = %operation.operator, "skipping text without a font or operand");
            continue;
        };
        let mut item = String::new();
        decode_shown_text(&mut item, encoding, operand)?;
        items.push(item);
    }
    Ok(items)
}

/// Strings decode through the font encoding; large negative kerning in a
/// `TJ` array reads as a word gap
fn decode_shown_text(out: &mut String, encoding: &Encoding, operand: &Object) -> lopdf::Result<()> {
    match operand {
        Object::String(bytes, _) => out.push_str(&Document::decode_text(encoding, bytes)?),
        Object::Array(parts) => {
            for part in parts {
                match part {
                    Object::Integer(gap) if *gap < -100 => out.push(' '),
                    Object::Real(gap) if *gap < -100.0 => out.push(' '),
                    other => decode_shown_text(out, encoding, other)?,
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn join_text_items(items: &[String]) -> String {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
