//! Per-page PDF text extraction.

use std::path::Path;

use crate::core::errors::AppError;

/// One page of extracted text with its provenance.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Source file name (not the full path).
    pub source: String,
    /// 1-based page number.
    pub page: u32,
    pub total_pages: u32,
    pub text: String,
}

/// Extract text from a single PDF, one entry per non-empty page.
///
/// Encrypted or malformed files surface as errors; callers decide whether
/// to skip or abort.
pub fn load_pdf(path: &Path) -> Result<Vec<PdfPage>, AppError> {
    if !path.exists() {
        return Err(AppError::NotFound(format!(
            "PDF does not exist: {}",
            path.display()
        )));
    }

    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let page_texts = pdf_extract::extract_text_by_pages(path)
        .map_err(|err| AppError::Internal(format!("Failed to read {}: {}", source, err)))?;

    let total_pages = page_texts.len() as u32;
    let pages: Vec<PdfPage> = page_texts
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| PdfPage {
            source: source.clone(),
            page: index as u32 + 1,
            total_pages,
            text,
        })
        .collect();

    tracing::info!("{}: loaded {} non-empty pages", source, pages.len());
    Ok(pages)
}

/// Load a PDF file or every `*.pdf` in a directory.
///
/// Individual file failures (encrypted, corrupt) are logged and skipped so
/// one bad paper does not abort a folder ingest.
pub fn load_pdfs(path: &Path) -> Result<Vec<PdfPage>, AppError> {
    if !path.exists() {
        return Err(AppError::NotFound(format!(
            "Path does not exist: {}",
            path.display()
        )));
    }

    if path.is_file() {
        if !is_pdf(path) {
            return Err(AppError::BadRequest(format!(
                "Not a PDF file: {}",
                path.display()
            )));
        }
        return load_pdf(path);
    }

    let mut pdf_files: Vec<_> = std::fs::read_dir(path)
        .map_err(AppError::internal)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_pdf(p))
        .collect();
    pdf_files.sort();

    if pdf_files.is_empty() {
        return Err(AppError::NotFound(format!(
            "No PDF files found in {}",
            path.display()
        )));
    }

    tracing::info!("Found {} PDF files in {}", pdf_files.len(), path.display());

    let mut all_pages = Vec::new();
    for pdf_file in &pdf_files {
        match load_pdf(pdf_file) {
            Ok(pages) => all_pages.extend(pages),
            Err(err) => {
                tracing::warn!("Skipping {}: {}", pdf_file.display(), err);
            }
        }
    }

    tracing::info!("Loaded {} pages total", all_pages.len());
    Ok(all_pages)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_not_found() {
        let err = load_pdfs(Path::new("/nonexistent/papers")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn non_pdf_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "plain text").unwrap();

        let err = load_pdfs(&file).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn empty_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_pdfs(dir.path()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
