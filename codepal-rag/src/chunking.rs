//! Document chunking.
//!
//! [`ParagraphChunker`] packs whole paragraphs into segments of at most
//! `max_segment_size` characters. A paragraph that does not fit on its own is
//! broken into sentences, a sentence into words, and a word into fixed-size
//! character runs, so no segment ever exceeds the limit. Each new segment
//! starts with trailing units of the previous one, up to `max_overlap_size`
//! characters.
//!
//! All sizes are counted in `char`s, never bytes.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Paragraph-aware splitter with sentence-level overlap.
///
/// Chunk IDs are `{document_id}_{chunk_index}`. Each chunk inherits the
/// parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use codepal_rag::ParagraphChunker;
///
/// let chunker = ParagraphChunker::new(1000, 200);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    max_segment_size: usize,
    max_overlap_size: usize,
}

impl ParagraphChunker {
    /// Create a new `ParagraphChunker`.
    ///
    /// # Arguments
    ///
    /// * `max_segment_size`: maximum number of characters per segment
    /// * `max_overlap_size`: maximum number of characters repeated from the previous segment
    pub fn new(max_segment_size: usize, max_overlap_size: usize) -> Self {
        Self { max_segment_size: max_segment_size.max(1), max_overlap_size }
    }

    /// Split raw text into segment strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let units = split_into_units(text, self.max_segment_size);
        pack_units(units, self.max_segment_size, self.max_overlap_size)
    }
}

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*\n\s*").expect("valid paragraph regex"));

const PARAGRAPH_SEP: &str = "\n\n";
const SENTENCE_SEP: &str = " ";
const NO_SEP: &str = "";

/// The smallest piece the packer moves around, with the separator that goes
/// in front of it when it is not the first unit of a segment.
#[derive(Debug, Clone)]
struct Unit {
    text: String,
    len: usize,
    sep: &'static str,
}

impl Unit {
    fn new(text: &str, sep: &'static str) -> Self {
        Self { text: text.to_string(), len: text.chars().count(), sep }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_into_units(text: &str, max: usize) -> Vec<Unit> {
    let mut units = Vec::new();
    for paragraph in PARAGRAPH_BREAK.split(text).map(str::trim).filter(|p| !p.is_empty()) {
        let first = units.len();
        if char_len(paragraph) <= max {
            units.push(Unit::new(paragraph, PARAGRAPH_SEP));
        } else {
            for sentence in split_sentences(paragraph) {
                if char_len(sentence) <= max {
                    units.push(Unit::new(sentence, SENTENCE_SEP));
                } else {
                    split_words(sentence, max, &mut units);
                }
            }
        }
        // A paragraph always starts after a paragraph break.
        if let Some(unit) = units.get_mut(first) {
            unit.sep = PARAGRAPH_SEP;
        }
    }
    units
}

/// Split after `.`, `!`, `?` (and their full-width forms) followed by whitespace
/// or the end of text. Full-width terminators also split without whitespace.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let end = idx + c.len_utf8();
        let boundary = match c {
            '。' | '！' | '？' => true,
            '.' | '!' | '?' => chars.peek().is_none_or(|(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            let sentence = paragraph[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let rest = paragraph[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

fn split_words(sentence: &str, max: usize, units: &mut Vec<Unit>) {
    for word in sentence.split_whitespace() {
        if char_len(word) <= max {
            units.push(Unit::new(word, SENTENCE_SEP));
            continue;
        }
        // Hard truncation: contiguous runs of `max` characters.
        let chars: Vec<char> = word.chars().collect();
        for (i, run) in chars.chunks(max).enumerate() {
            let text: String = run.iter().collect();
            let sep = if i == 0 { SENTENCE_SEP } else { NO_SEP };
            units.push(Unit { len: run.len(), text, sep });
        }
    }
}

/// Greedily pack units into segments, seeding each new segment with trailing
/// units of the previous one.
fn pack_units(units: Vec<Unit>, max: usize, max_overlap: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current: Vec<Unit> = Vec::new();
    let mut current_len = 0;

    for unit in units {
        let added = if current.is_empty() { unit.len } else { unit.sep.len() + unit.len };
        if current_len + added <= max {
            current_len += added;
            current.push(unit);
            continue;
        }

        segments.push(render(&current));

        // The overlap must fit beside the incoming unit.
        let budget = max_overlap.min(max.saturating_sub(unit.len + unit.sep.len()));
        let overlap = trailing_overlap(&current, budget);
        current_len = segment_len(&overlap);
        current = overlap;

        current_len += if current.is_empty() { unit.len } else { unit.sep.len() + unit.len };
        current.push(unit);
    }

    if !current.is_empty() {
        segments.push(render(&current));
    }
    segments
}

fn trailing_overlap(units: &[Unit], budget: usize) -> Vec<Unit> {
    let mut taken: Vec<Unit> = Vec::new();
    let mut len = 0;
    for unit in units.iter().rev() {
        // `unit` becomes the new head; the previous head now needs its separator.
        let extra = match taken.last() {
            Some(head) => head.sep.len() + unit.len,
            None => unit.len,
        };
        if len + extra > budget {
            break;
        }
        len += extra;
        taken.push(unit.clone());
    }
    taken.reverse();
    taken
}

fn segment_len(units: &[Unit]) -> usize {
    units
        .iter()
        .enumerate()
        .map(|(i, u)| if i == 0 { u.len } else { u.sep.len() + u.len })
        .sum()
}

fn render(units: &[Unit]) -> String {
    let mut out = String::new();
    for (i, unit) in units.iter().enumerate() {
        if i > 0 {
            out.push_str(unit.sep);
        }
        out.push_str(&unit.text);
    }
    out
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.to_string());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text,
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_paragraphs_share_one_segment() {
        let chunker = ParagraphChunker::new(100, 20);
        let segments = chunker.split_text("First paragraph.\n\nSecond paragraph.");
        assert_eq!(segments, vec!["First paragraph.\n\nSecond paragraph."]);
    }

    #[test]
    fn paragraphs_split_when_full() {
        let chunker = ParagraphChunker::new(20, 0);
        let segments = chunker.split_text("aaaaaaaaaa bbbbbbb\n\ncccccccccc dddddd");
        assert_eq!(segments, vec!["aaaaaaaaaa bbbbbbb", "cccccccccc dddddd"]);
    }

    #[test]
    fn long_paragraph_falls_back_to_sentences_with_overlap() {
        let chunker = ParagraphChunker::new(30, 12);
        let text = "One two three. Four five six. Seven eight nine.";
        let segments = chunker.split_text(text);
        assert_eq!(segments[0], "One two three. Four five six.");
        // "Four five six." (14 chars) exceeds the 12-char overlap budget.
        assert_eq!(segments[1], "Seven eight nine.");
        assert!(segments.iter().all(|s| s.chars().count() <= 30));
    }

    #[test]
    fn overlap_repeats_trailing_sentence_when_it_fits() {
        let chunker = ParagraphChunker::new(40, 15);
        let text = "Alpha beta gamma. Delta epsilon. Zeta eta theta iota.";
        let segments = chunker.split_text(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], "Alpha beta gamma. Delta epsilon.");
        assert_eq!(segments[1], "Delta epsilon. Zeta eta theta iota.");
    }

    #[test]
    fn oversized_word_is_hard_truncated() {
        let chunker = ParagraphChunker::new(4, 0);
        let segments = chunker.split_text("abcdefghij");
        assert_eq!(segments, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_text_never_exceeds_limit() {
        let chunker = ParagraphChunker::new(5, 2);
        let text = "编程学习路线。面试题分享。项目学习建议非常重要";
        let segments = chunker.split_text(text);
        assert!(!segments.is_empty());
        for segment in &segments {
            assert!(segment.chars().count() <= 5, "segment too long: {segment}");
        }
    }

    #[test]
    fn chunk_ids_and_metadata() {
        let doc = Document::from_file_name("notes.md", "Para one.\n\nPara two.");
        let chunks = ParagraphChunker::new(10, 0).chunk(&doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].id, "notes.md_1");
        assert_eq!(chunks[1].metadata.get("chunk_index").map(String::as_str), Some("1"));
        assert_eq!(chunks[1].file_name(), Some("notes.md"));
        assert!(chunks.iter().all(|c| c.embedding.is_empty()));
    }

    #[test]
    fn blank_document_yields_nothing() {
        let doc = Document::from_file_name("empty.md", " \n\n ");
        assert!(ParagraphChunker::new(10, 0).chunk(&doc).is_empty());
    }
}
