//! Multi-format text extraction (PDF, OOXML, plain text).
//!
//! Extraction never aborts the corpus: [`extract_document`] turns any failure
//! into an [`ExtractedDocument`] with empty text and the error recorded.

use std::io::Read;

use crate::error::ExtractError;
use crate::models::{DocumentFormat, DocumentSource, ExtractedDocument, SourceHandle};

/// Maximum sheets to process in an xlsx.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to process per sheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Turns a [`DocumentSource`] into an [`ExtractedDocument`].
///
/// The seam the context cache extracts through; tests substitute counting
/// or failing implementations.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, source: &DocumentSource) -> ExtractedDocument;
}

/// Default extractor: reads the source and dispatches on its format.
#[derive(Debug, Clone)]
pub struct FormatExtractor {
    max_bytes: u64,
}

impl FormatExtractor {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl TextExtractor for FormatExtractor {
    fn extract(&self, source: &DocumentSource) -> ExtractedDocument {
        extract_document(source, self.max_bytes)
    }
}

/// Reads and extracts one source, recording any failure on the result.
pub fn extract_document(source: &DocumentSource, max_bytes: u64) -> ExtractedDocument {
    let result =
        read_source(source, max_bytes).and_then(|bytes| extract_text(&bytes, &source.format));
    match result {
        Ok(text) => ExtractedDocument::ok(&source.name, text),
        Err(e) => {
            tracing::warn!(document = %source.name, error = %e, "extraction failed");
            ExtractedDocument::failed(&source.name, e)
        }
    }
}

fn read_source(source: &DocumentSource, max_bytes: u64) -> Result<Vec<u8>, ExtractError> {
    if source.size > max_bytes {
        return Err(ExtractError::TooLarge {
            size: source.size,
            limit: max_bytes,
        });
    }
    match &source.handle {
        SourceHandle::File(path) => {
            std::fs::read(path).map_err(|e| ExtractError::Io(format!("{}: {}", path.display(), e)))
        }
        SourceHandle::Memory(bytes) => Ok(bytes.to_vec()),
    }
}

/// Extracts plain text from raw bytes of the given format.
pub fn extract_text(bytes: &[u8], format: &DocumentFormat) -> Result<String, ExtractError> {
    match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
        DocumentFormat::Pptx => extract_pptx(bytes),
        DocumentFormat::Xlsx => extract_xlsx(bytes),
        DocumentFormat::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
        DocumentFormat::Other(ext) => Err(ExtractError::UnsupportedFormat(if ext.is_empty() {
            "(no extension)".to_string()
        } else {
            ext.clone()
        })),
    }
}

/// Pages in document order, joined with a newline.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked on malformed input".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.join("\n"))
}

type ZipReader<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_zip(bytes: &[u8]) -> Result<ZipReader<'_>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut ZipReader<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Zip entries matching `<prefix>N.xml`, sorted by N.
fn numbered_entries(archive: &ZipReader<'_>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_zip(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    // One line per w:p paragraph.
    collect_text_runs(&xml, Some(b"p".as_slice()))
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_zip(bytes)?;
    let mut slides = Vec::new();
    for name in numbered_entries(&archive, "ppt/slides/slide") {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        slides.push(collect_text_runs(&xml, None)?);
    }
    Ok(slides.join("\n"))
}

/// Concatenates the text of every `t` element.
///
/// With `line_break` set, a newline is emitted after each closing element of
/// that local name that produced text.
fn collect_text_runs(xml: &[u8], line_break: Option<&[u8]>) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_t = true,
            Ok(Event::Text(te)) if in_t => {
                let text = te.unescape().map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    in_t = false;
                } else if line_break == Some(name.as_ref()) && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines.join("\n"))
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_zip(bytes)?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let mut sheets = Vec::new();
    for name in numbered_entries(&archive, "xl/worksheets/sheet")
        .into_iter()
        .take(XLSX_MAX_SHEETS)
    {
        let sheet_xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        sheets.push(extract_xlsx_sheet_cells(&sheet_xml, &shared_strings)?);
    }
    Ok(sheets.join("\n"))
}

fn read_shared_strings(archive: &mut ZipReader<'_>) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    // Workbooks with only numeric cells have no shared strings part.
    if archive.by_name("xl/sharedStrings.xml").is_err() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    let text = te.unescape().map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                    s.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn extract_xlsx_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut cell_is_shared_str = false;
    while cells.len() < XLSX_MAX_CELLS_PER_SHEET {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                } else if e.local_name().as_ref() == b"v" {
                    in_v = true;
                }
            }
            Ok(Event::Text(te)) if in_v => {
                let v = te.unescape().map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                let s = v.trim();
                if cell_is_shared_str {
                    if let Some(text) = s.parse::<usize>().ok().and_then(|i| shared_strings.get(i)) {
                        cells.push(text.clone());
                    }
                } else if !s.is_empty() {
                    cells.push(s.to_string());
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"v" {
                    in_v = false;
                } else if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}
