//! Loads knowledge-base documents from a directory.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::document::{Document, SOURCE_KEY};
use crate::error::{RagError, Result};

/// Reads every `*.md` and `*.txt` file directly inside a directory.
///
/// Subdirectories are not visited. Documents are returned sorted by file
/// name; each has the file name as its ID and `file_name` / `source`
/// metadata.
#[derive(Debug, Clone)]
pub struct FileSystemDocumentLoader {
    extensions: Vec<String>,
}

impl Default for FileSystemDocumentLoader {
    fn default() -> Self {
        Self { extensions: vec!["md".to_string(), "txt".to_string()] }
    }
}

impl FileSystemDocumentLoader {
    /// Loader for `*.md` and `*.txt` files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accepted file extensions (without the leading dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Load all matching documents from `dir`.
    ///
    /// # Errors
    ///
    /// Fails fast with [`RagError::Io`] if the directory cannot be listed or
    /// any matching file cannot be read as UTF-8.
    pub async fn load_documents(&self, dir: impl AsRef<Path>) -> Result<Vec<Document>> {
        let dir = dir.as_ref();
        let io_err = |path: &Path, source: std::io::Error| {
            error!(path = %path.display(), error = %source, "failed to read documents");
            RagError::Io { path: path.display().to_string(), source }
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| io_err(dir, e))?;
        let mut paths: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(dir, e))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| io_err(&path, e))?;
            if file_type.is_file() && self.accepts(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| io_err(&path, e))?;
            let file_name =
                path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let source = path.display().to_string();
            let mut document = Document::from_file_name(file_name, text);
            document.metadata.insert(SOURCE_KEY.to_string(), source.clone());
            document.source_uri = Some(source);
            documents.push(document);
        }

        info!(dir = %dir.display(), document_count = documents.len(), "loaded documents");
        Ok(documents)
    }
}
