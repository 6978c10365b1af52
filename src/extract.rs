//! Text acquisition for ingestible files.
//!
//! Configuration exports arrive as plain text (`.cfg`, `.txt`, `.log`) or as
//! PDF captures of terminal sessions. This module turns raw bytes into the
//! UTF-8 text the parser consumes; the ingest pipeline skips files that fail
//! here rather than aborting the run.

use std::path::Path;

/// Extraction error. Callers log and skip the offending file.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedExtension(String),
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedExtension(ext) => {
                write!(f, "unsupported file extension: {}", ext)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts plain text from file bytes, dispatching on the extension.
pub fn extract_text(bytes: &[u8], path: &Path) -> Result<String, ExtractError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "cfg" | "txt" | "log" => Ok(extract_plain(bytes)),
        "pdf" => extract_pdf(bytes),
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

/// Device exports often carry stray bytes (terminal escapes, truncated
/// captures); lossy decoding keeps the rest of the file usable.
fn extract_plain(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn unsupported_extension_returns_error() {
        let err = extract_text(b"foo", &PathBuf::from("router.docx")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedExtension(_)));
    }

    #[test]
    fn missing_extension_returns_error() {
        let err = extract_text(b"foo", &PathBuf::from("router")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedExtension(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", &PathBuf::from("capture.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn plain_text_passes_through() {
        let text = extract_text(b"hostname SW1\n", &PathBuf::from("sw1.cfg")).unwrap();
        assert_eq!(text, "hostname SW1\n");
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let bytes = b"hostname SW1\n\xff\xfeend\n";
        let text = extract_text(bytes, &PathBuf::from("sw1.log")).unwrap();
        assert!(text.starts_with("hostname SW1\n"));
        assert!(text.contains('\u{fffd}'));
        assert!(text.ends_with("end\n"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let text = extract_text(b"vlan 10\n", &PathBuf::from("backup.CFG")).unwrap();
        assert_eq!(text, "vlan 10\n");
    }
}
