//! Conversion of uploaded study material into plain text.
//!
//! Supported inputs are recognized by file extension (case-insensitive):
//!
//! - `pdf` – decoded page by page; every page contributes its text followed by a newline.
//! - `txt`, `md` – decoded as UTF-8, replacing invalid byte sequences.
//! - `png`, `jpg`, `jpeg` – not read at all; the caller supplies OCR output as precomputed text.
//!
//! Precomputed text always comes first in the returned blob.

use super::types::ExtractionError;
use std::path::Path;

/// Broad family a file extension belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Paged document decoded with a PDF parser.
    Pdf,
    /// Plain text or Markdown.
    PlainText,
    /// Raster image whose text comes from an upstream OCR step.
    Image,
}

impl DocumentKind {
    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" => Some(Self::PlainText),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Extract the text content of `path`, prefixed by `precomputed_text`.
pub async fn extract_text(path: &Path, precomputed_text: &str) -> Result<String, ExtractionError> {
    let kind = DocumentKind::from_path(path).ok_or_else(|| ExtractionError::UnsupportedFormat {
        path: path.display().to_string(),
    })?;

    let mut text = precomputed_text.to_string();
    match kind {
        DocumentKind::Pdf => {
            let bytes = read_file(path).await?;
            let pages = extract_pdf_pages(path, bytes).await?;
            tracing::debug!(path = %path.display(), pages = pages.len(), "Decoded PDF pages");
            append_pages(&mut text, pages);
        }
        DocumentKind::PlainText => {
            let bytes = read_file(path).await?;
            text.push_str(&String::from_utf8_lossy(&bytes));
        }
        DocumentKind::Image => {
            if precomputed_text.trim().is_empty() {
                tracing::warn!(path = %path.display(), "Image supplied without OCR text");
            }
        }
    }

    tracing::debug!(
        path = %path.display(),
        kind = ?kind,
        bytes = text.len(),
        "Extracted document text"
    );
    Ok(text)
}

/// Append each page's text followed by a newline. Pages without text still contribute the newline.
fn append_pages(text: &mut String, pages: Vec<String>) {
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ExtractionError::Io {
            path: path.display().to_string(),
            source,
        })
}

async fn extract_pdf_pages(path: &Path, bytes: Vec<u8>) -> Result<Vec<String>, ExtractionError> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .await
        .map_err(|error| ExtractionError::Pdf {
            path: display.clone(),
            message: format!("decoder task failed: {error}"),
        })?
        .map_err(|error| ExtractionError::Pdf {
            path: display,
            message: error.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create fixture");
        file.write_all(contents).expect("write fixture");
        path
    }

    #[test]
    fn classifies_extensions_case_insensitively() {
        assert_eq!(
            DocumentKind::from_path(Path::new("notes/Chapter1.PDF")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("a.md")),
            Some(DocumentKind::PlainText)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("scan.JPeG")),
            Some(DocumentKind::Image)
        );
        assert_eq!(DocumentKind::from_path(Path::new("file.docx")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[tokio::test]
    async fn reads_plain_text_files() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "notes.txt", b"Mitochondria are the powerhouse.");
        let text = extract_text(&path, "").await.expect("extracted");
        assert_eq!(text, "Mitochondria are the powerhouse.");
    }

    #[tokio::test]
    async fn replaces_invalid_utf8_instead_of_failing() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "latin1.txt", b"caf\xe9 au lait");
        let text = extract_text(&path, "").await.expect("extracted");
        assert!(text.starts_with("caf"));
        assert!(text.ends_with(" au lait"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn precomputed_text_comes_first() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "notes.txt", b"file body");
        let text = extract_text(&path, "ocr prefix ").await.expect("extracted");
        assert_eq!(text, "ocr prefix file body");
    }

    #[tokio::test]
    async fn images_use_precomputed_text_without_reading_the_file() {
        let text = extract_text(Path::new("does/not/exist.png"), "text from ocr")
            .await
            .expect("extracted");
        assert_eq!(text, "text from ocr");
    }

    #[tokio::test]
    async fn unsupported_extension_fails_even_with_precomputed_text() {
        let error = extract_text(Path::new("file.docx"), "ignored")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::UnsupportedFormat { path } if path == "file.docx"));
    }

    #[tokio::test]
    async fn missing_file_surfaces_io_error() {
        let dir = TempDir::new().unwrap();
        let error = extract_text(&dir.path().join("missing.txt"), "")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Io { .. }));
    }

    /// Build a minimal PDF with one Helvetica text run per non-empty page.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let page_ids: Vec<usize> = (0..pages.len()).map(|n| 4 + 2 * n).collect();
        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];
        for (page_id, page_text) in page_ids.iter().zip(pages) {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                page_id + 1
            ));
            let content = if page_text.is_empty() {
                "q Q".to_string()
            } else {
                format!("BT /F1 24 Tf 72 700 Td ({page_text}) Tj ET")
            };
            objects.push(format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ));
        }

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (n, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", n + 1).as_bytes());
        }
        let xref_offset = pdf.len();
        let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            trailer.push_str(&format!("{offset:010} 00000 n \n"));
        }
        trailer.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.extend_from_slice(trailer.as_bytes());
        pdf
    }

    #[test]
    fn pages_are_joined_with_trailing_newlines() {
        let mut text = "ocr: ".to_string();
        append_pages(
            &mut text,
            vec!["first page".into(), String::new(), "third page".into()],
        );
        assert_eq!(text, "ocr: first page\n\nthird page\n");
    }

    #[tokio::test]
    async fn decodes_pdf_pages_in_order_after_precomputed_text() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "lecture.pdf",
            &pdf_with_pages(&["Photosynthesis", "Mitochondria", ""]),
        );

        let text = extract_text(&path, "OCR: ").await.expect("extracted");

        assert!(text.starts_with("OCR: "), "{text:?}");
        assert!(text.ends_with('\n'), "{text:?}");
        let words: Vec<&str> = text["OCR: ".len()..].split_whitespace().collect();
        assert_eq!(words, vec!["Photosynthesis", "Mitochondria"]);
        assert!(text.matches('\n').count() >= 3, "{text:?}");
    }

    #[tokio::test]
    async fn malformed_pdf_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "broken.pdf", b"this is not a pdf");
        let error = extract_text(&path, "").await.unwrap_err();
        assert!(matches!(error, ExtractionError::Pdf { .. }));
    }
}
