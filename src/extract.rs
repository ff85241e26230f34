//! Per-format text extraction for source documents.
//!
//! Turns raw file bytes into [`DocumentRecord`]s: PDF pages become one
//! record each (so chunk ids carry real page numbers), DOCX and plain
//! text become a single record at page 0.

use std::io::Read;
use std::path::Path;

use crate::models::DocumentRecord;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction error. Loading never panics; the ingest pipeline logs
/// the error and skips the file.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedExtension(String),
    Io(String),
    Pdf(String),
    Docx(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedExtension(ext) => {
                write!(f, "unsupported file extension: {}", ext)
            }
            ExtractError::Io(e) => write!(f, "failed to read file: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the records of one source file.
///
/// `source_path` is the identifier stored on every record (the path
/// relative to the data directory); `path` is where the bytes live.
pub fn extract_records(path: &Path, source_path: &str) -> Result<Vec<DocumentRecord>, ExtractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
            extract_pdf(&bytes, source_path)
        }
        "docx" => {
            let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
            extract_docx(&bytes, source_path)
        }
        "txt" | "md" => {
            let text =
                std::fs::read_to_string(path).map_err(|e| ExtractError::Io(e.to_string()))?;
            Ok(vec![DocumentRecord {
                text,
                source_path: source_path.to_string(),
                page: 0,
            }])
        }
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8], source_path: &str) -> Result<Vec<DocumentRecord>, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(page, text)| DocumentRecord {
            text,
            source_path: source_path.to_string(),
            page: page as u32,
        })
        .collect())
}

fn extract_docx(bytes: &[u8], source_path: &str) -> Result<Vec<DocumentRecord>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Docx(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    let text = extract_w_t_elements(&doc_xml)?;
    Ok(vec![DocumentRecord {
        text,
        source_path: source_path.to_string(),
        page: 0,
    }])
}

/// Collect the `<w:t>` text runs of a WordprocessingML body, inserting
/// paragraph breaks at `</w:p>` so the chunker sees real boundaries.
fn extract_w_t_elements(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.is_empty() && !out.ends_with("\n\n") {
                    out.push_str("\n\n");
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        use std::io::Write;
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
                .collect();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn docx_text_runs_joined_with_paragraph_breaks() {
        let bytes = docx_with_paragraphs(&["First paragraph.", "Second paragraph."]);
        let records = extract_docx(&bytes, "notes.docx").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].page, 0);
        assert_eq!(records[0].text, "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn invalid_zip_returns_docx_error() {
        let err = extract_docx(b"not a zip", "bad.docx").unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn invalid_pdf_returns_pdf_error() {
        let err = extract_pdf(b"not a pdf", "bad.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn unsupported_extension_rejected() {
        let err = extract_records(Path::new("legacy.doc"), "legacy.doc").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedExtension(_)));
    }

    #[test]
    fn plain_text_single_record_at_page_zero() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("note.txt");
        std::fs::write(&path, "hello world").unwrap();
        let records = extract_records(&path, "note.txt").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "hello world");
        assert_eq!(records[0].page, 0);
        assert_eq!(records[0].source_path, "note.txt");
    }
}
