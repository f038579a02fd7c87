//! Knowledge-base documents and the segments cut from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the source file name of a document.
pub const FILE_NAME_KEY: &str = "file_name";

/// Metadata key holding the full source path of a document.
pub const SOURCE_KEY: &str = "source";

/// One knowledge-base file, immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The file name for loaded documents; chunk ids derive from it.
    pub id: String,
    pub text: String,
    /// Carries [`FILE_NAME_KEY`] and, for loaded files, [`SOURCE_KEY`].
    pub metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document whose id and `file_name` metadata are both `file_name`.
    pub fn from_file_name(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            id: file_name.clone(),
            text: text.into(),
            metadata: HashMap::from([(FILE_NAME_KEY.to_string(), file_name)]),
            source_uri: None,
        }
    }

    /// The `file_name` metadata, if present.
    pub fn file_name(&self) -> Option<&str> {
        self.metadata.get(FILE_NAME_KEY).map(String::as_str)
    }
}

/// A bounded piece of a [`Document`], embedded once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{document_id}_{chunk_index}`.
    pub id: String,
    /// Segment text after transformation; this is what gets embedded.
    pub text: String,
    /// Empty until the pipeline embeds the chunk.
    pub embedding: Vec<f32>,
    /// The document's metadata plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    pub document_id: String,
}

impl Chunk {
    /// The `file_name` metadata inherited from the parent document.
    pub fn file_name(&self) -> Option<&str> {
        self.metadata.get(FILE_NAME_KEY).map(String::as_str)
    }
}

/// A stored chunk and its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}
