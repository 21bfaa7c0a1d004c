//! Collaborator seams for document text and mesh boundaries.
//!
//! Binary document formats and mesh parsing live outside this crate; the
//! session only sees these traits. `PlainTextExtractor` covers UTF-8 text.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document contains no text")]
    Empty,

    #[error("Document is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot read document {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Mesh has no boundary names")]
    NoBoundaries,

    #[error("Cannot read mesh {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot parse mesh boundaries: {0}")]
    Parse(String),
}

/// Turns uploaded file bytes into plain text.
pub trait DocumentTextExtractor: Send + Sync {
    fn extract(&self, file_bytes: &[u8]) -> Result<String, DocumentError>;
}

/// Lists the boundary patch names of a mesh, in file order.
pub trait MeshBoundaryExtractor: Send + Sync {
    fn extract_boundaries(&self, mesh_path: &Path) -> Result<Vec<String>, MeshError>;
}

impl<F> DocumentTextExtractor for F
where
    F: Fn(&[u8]) -> Result<String, DocumentError> + Send + Sync,
{
    fn extract(&self, file_bytes: &[u8]) -> Result<String, DocumentError> {
        self(file_bytes)
    }
}

impl<F> MeshBoundaryExtractor for F
where
    F: Fn(&Path) -> Result<Vec<String>, MeshError> + Send + Sync,
{
    fn extract_boundaries(&self, mesh_path: &Path) -> Result<Vec<String>, MeshError> {
        self(mesh_path)
    }
}

/// UTF-8 text documents (`.txt`, `.md`, extracted PDF text dumps).
pub struct PlainTextExtractor;

impl DocumentTextExtractor for PlainTextExtractor {
    fn extract(&self, file_bytes: &[u8]) -> Result<String, DocumentError> {
        let bytes = file_bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(file_bytes);
        let text = std::str::from_utf8(bytes)
            .map_err(|e| DocumentError::Encoding(e.to_string()))?;

        let text = text.replace("\r\n", "\n");
        if text.trim().is_empty() {
            return Err(DocumentError::Empty);
        }

        tracing::debug!(chars = text.chars().count(), "PlainTextExtractor: read document");
        Ok(text)
    }
}

impl PlainTextExtractor {
    /// Read and extract a text document from disk.
    pub fn extract_file(&self, path: &Path) -> Result<String, DocumentError> {
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.extract(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_reads_utf8() {
        let text = PlainTextExtractor.extract("NACA 0012, Re = 6×10⁶".as_bytes()).unwrap();
        assert_eq!(text, "NACA 0012, Re = 6×10⁶");
    }

    #[test]
    fn plain_text_strips_bom_and_crlf() {
        let text = PlainTextExtractor
            .extract(b"\xEF\xBB\xBFline one\r\nline two")
            .unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn plain_text_rejects_blank() {
        assert!(matches!(
            PlainTextExtractor.extract(b"  \n\t "),
            Err(DocumentError::Empty)
        ));
    }

    #[test]
    fn plain_text_rejects_binary() {
        assert!(matches!(
            PlainTextExtractor.extract(&[0xff, 0xfe, 0x00, 0x81]),
            Err(DocumentError::Encoding(_))
        ));
    }

    #[test]
    fn extract_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = PlainTextExtractor.extract_file(&dir.path().join("paper.txt"));
        assert!(matches!(result, Err(DocumentError::Io { .. })));
    }

    #[test]
    fn extract_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, "Case 1: AoA = 10").unwrap();
        assert_eq!(PlainTextExtractor.extract_file(&path).unwrap(), "Case 1: AoA = 10");
    }

    #[test]
    fn closures_act_as_mesh_extractors() {
        let extractor = |_: &Path| -> Result<Vec<String>, MeshError> {
            Ok(vec!["inlet".into(), "outlet".into()])
        };
        let names = extractor.extract_boundaries(Path::new("mesh.msh")).unwrap();
        assert_eq!(names, vec!["inlet", "outlet"]);
    }
}
