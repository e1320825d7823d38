//! Document loading and text extraction.

use crate::progress::ProgressReporter;
use crate::types::{Document, DocumentFailure};
use docqa_core::{AppError, AppResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Archive member holding a Word document's body.
const DOCX_BODY: &str = "word/document.xml";

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Docx,
    Csv,
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            Some("csv") => Self::Csv,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Csv => "csv",
            Self::Markdown => "markdown",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Citation label for a file: its name, or the full path if it has none.
pub fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load one file and extract its text.
pub async fn load_document(path: &Path) -> AppResult<Document> {
    let content_type = ContentType::from_path(path);
    tracing::debug!("Loading {:?} as {}", path, content_type.as_str());

    let text = match content_type {
        ContentType::Pdf => extract_pdf(path).await?,
        ContentType::Docx => extract_blocking(path, "DOCX", extract_docx).await?,
        ContentType::Csv => extract_blocking(path, "CSV", render_csv).await?,
        ContentType::Markdown => clean_markdown(&read_text(path).await?),
        ContentType::PlainText => read_text(path).await?,
        ContentType::Unknown => {
            return Err(AppError::Knowledge(format!(
                "Unsupported file type: {:?} (expected .pdf, .docx, .csv, .txt, .md)",
                path
            )))
        }
    };

    Ok(Document::new(source_label(path), text).with_path(path))
}

/// Load every supported file under `paths`.
///
/// Directories are walked recursively in file-name order and unsupported
/// files inside them are skipped. A path given explicitly that is missing,
/// unsupported or unreadable is reported as a failure; loading continues.
pub async fn load_documents(
    paths: &[PathBuf],
    progress: &ProgressReporter,
) -> (Vec<Document>, Vec<DocumentFailure>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();

    for path in paths {
        if path.is_dir() {
            files.extend(discover_files(path));
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            let err = AppError::Knowledge(format!("Path not found: {:?}", path));
            tracing::warn!("{}", err);
            failures.push(DocumentFailure::new(path.display().to_string(), &err));
        }
    }

    let total = files.len() as u64;
    let mut documents = Vec::with_capacity(files.len());

    for (i, file) in files.iter().enumerate() {
        progress.load(i as u64 + 1, Some(total), &source_label(file));

        match load_document(file).await {
            Ok(document) => documents.push(document),
            Err(e) => {
                tracing::warn!("Failed to load {:?}: {}", file, e);
                failures.push(DocumentFailure::new(file.display().to_string(), &e));
            }
        }
    }

    tracing::info!(
        "Loaded {} documents ({} failed)",
        documents.len(),
        failures.len()
    );

    (documents, failures)
}

fn discover_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            let supported = ContentType::from_path(p).is_supported();
            if !supported {
                tracing::debug!("Skipping unsupported file {:?}", p);
            }
            supported
        })
        .collect()
}

async fn read_text(path: &Path) -> AppResult<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    String::from_utf8(bytes)
        .map_err(|_| AppError::Knowledge(format!("{:?} is not valid UTF-8 text", path)))
}

/// Run a CPU-bound extractor over the file's bytes on a blocking thread;
/// a panic inside the extractor becomes an error for this document only.
async fn extract_blocking<F>(path: &Path, kind: &str, extract: F) -> AppResult<String>
where
    F: FnOnce(Vec<u8>) -> Result<String, String> + Send + 'static,
{
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    tokio::task::spawn_blocking(move || extract(bytes))
        .await
        .map_err(|e| {
            AppError::Knowledge(format!("{} extraction task failed for {:?}: {}", kind, path, e))
        })?
        .map_err(|e| AppError::Knowledge(format!("{} extraction failed for {:?}: {}", kind, path, e)))
}

async fn extract_pdf(path: &Path) -> AppResult<String> {
    let text = extract_blocking(path, "PDF", |bytes| {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
    })
    .await?;

    Ok(normalize_pdf_text(&text))
}

/// Paragraph text of a `.docx` file, one non-empty paragraph per line.
fn extract_docx(bytes: Vec<u8>) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let mut body = archive.by_name(DOCX_BODY).map_err(|e| e.to_string())?;

    let mut xml = String::new();
    body.read_to_string(&mut xml).map_err(|e| e.to_string())?;

    docx_paragraphs(&xml)
}

fn docx_paragraphs(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let paragraph = std::mem::take(&mut current);
                    if !paragraph.trim().is_empty() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

/// A header line followed by one `column: value | ...` line per row.
fn render_csv(bytes: Vec<u8>) -> Result<String, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes.as_slice());

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let mut lines = vec![format!(
        "CSV Headers: {}",
        headers.iter().collect::<Vec<_>>().join(", ")
    )];

    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| format!("{}: {}", column, value))
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(row);
    }

    Ok(lines.join("\n"))
}

/// Drop trailing spaces and collapse runs of blank lines left by extraction.
fn normalize_pdf_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        result.push_str(line);
        result.push('\n');
    }

    result.trim().to_string()
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        // Skip horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(Path::new("Manual.PDF")),
            ContentType::Pdf
        );
        assert_eq!(
            ContentType::from_path(Path::new("notes.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(Path::new("file.txt")),
            ContentType::PlainText
        );
        assert_eq!(
            ContentType::from_path(Path::new("Report.DOCX")),
            ContentType::Docx
        );
        assert_eq!(
            ContentType::from_path(Path::new("prices.csv")),
            ContentType::Csv
        );
        assert_eq!(
            ContentType::from_path(Path::new("sheet.xlsx")),
            ContentType::Unknown
        );
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSome text\n\n```rust\ncode\n```\n\nMore text";
        let output = clean_markdown(input);
        assert!(output.contains("Header"));
        assert!(output.contains("Some text"));
        assert!(output.contains("More text"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_normalize_pdf_text() {
        let input = "Page one   \n\n\n\nPage two\n";
        assert_eq!(normalize_pdf_text(input), "Page one\n\nPage two");
    }

    #[tokio::test]
    async fn test_load_text_document_uses_file_name_as_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("policy.txt");
        fs::write(&path, "Refunds are issued within 30 days.").unwrap();

        let doc = load_document(&path).await.unwrap();
        assert_eq!(doc.source, "policy.txt");
        assert_eq!(doc.text, "Refunds are issued within 30 days.");
        assert_eq!(doc.path.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        fs::write(&path, b"this is not a pdf").unwrap();

        assert!(matches!(
            load_document(&path).await,
            Err(AppError::Knowledge(_))
        ));
    }

    #[tokio::test]
    async fn test_load_documents_walks_and_reports_failures() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("docs");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.md"), "# Title\nBody").unwrap();
        fs::write(dir.join("nested").join("a.txt"), "Nested text").unwrap();
        fs::write(dir.join("image.png"), [0u8, 1, 2]).unwrap();

        let unsupported = temp.path().join("data.xlsx");
        fs::write(&unsupported, [0u8, 1, 2]).unwrap();
        let missing = temp.path().join("missing.pdf");

        let (documents, failures) = load_documents(
            &[dir, unsupported, missing],
            &ProgressReporter::noop(),
        )
        .await;

        let sources: Vec<&str> = documents.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["b.md", "a.txt"]);
        assert_eq!(documents[0].text, "Title\nBody");

        assert_eq!(failures.len(), 2);
        assert!(failures.iter().any(|f| f.document.ends_with("missing.pdf")));
        assert!(failures.iter().any(|f| f.document.ends_with("data.xlsx")));
    }

    fn write_docx(path: &Path, body: &str) {
        use std::io::Write;

        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
        zip.start_file(DOCX_BODY, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_load_docx_paragraphs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("handbook.docx");
        write_docx(
            &path,
            concat!(
                "<w:p><w:r><w:t>Leave is </w:t></w:r><w:r><w:t xml:space=\"preserve\">accrued monthly.</w:t></w:r></w:p>",
                "<w:p></w:p>",
                "<w:p><w:r><w:t>Travel &amp; expenses</w:t><w:tab/><w:t>need approval.</w:t></w:r></w:p>",
            ),
        );

        let doc = load_document(&path).await.unwrap();
        assert_eq!(doc.source, "handbook.docx");
        assert_eq!(
            doc.text,
            "Leave is accrued monthly.\nTravel & expenses\tneed approval."
        );
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.docx");
        fs::write(&path, b"not a zip archive").unwrap();

        assert!(matches!(
            load_document(&path).await,
            Err(AppError::Knowledge(_))
        ));
    }

    #[tokio::test]
    async fn test_load_csv_rows() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("prices.csv");
        fs::write(&path, "plan,price\nBasic,10\n\"Pro, annual\",99\n").unwrap();

        let doc = load_document(&path).await.unwrap();
        assert_eq!(
            doc.text,
            "CSV Headers: plan, price\nplan: Basic | price: 10\nplan: Pro, annual | price: 99"
        );
    }

    #[tokio::test]
    async fn test_directory_walk_includes_docx_and_csv() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("docs");
        fs::create_dir_all(&dir).unwrap();
        write_docx(&dir.join("a.docx"), "<w:p><w:r><w:t>Policy text</w:t></w:r></w:p>");
        fs::write(dir.join("b.csv"), "id,name\n1,Ada\n").unwrap();

        let (documents, failures) = load_documents(&[dir], &ProgressReporter::noop()).await;

        assert!(failures.is_empty());
        let sources: Vec<&str> = documents.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["a.docx", "b.csv"]);
    }
}
