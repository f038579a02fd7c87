//! Segment rewriting applied between chunking and embedding.

use crate::document::Chunk;

/// Rewrites a chunk before it is embedded and stored.
///
/// Transformers may change the text but must keep `id`, `document_id` and
/// metadata intact.
pub trait SegmentTransformer: Send + Sync {
    /// Rewrite one chunk in place.
    fn transform(&self, chunk: &mut Chunk);
}

/// Prefixes each segment with its source file name, `"{file_name}\n{text}"`.
///
/// Chunks without `file_name` metadata are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileNamePrefixTransformer;

impl SegmentTransformer for FileNamePrefixTransformer {
    fn transform(&self, chunk: &mut Chunk) {
        if let Some(file_name) = chunk.file_name() {
            chunk.text = format!("{file_name}\n{}", chunk.text);
        }
    }
}
