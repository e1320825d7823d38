//! Text chunking with configurable size and overlap.
//!
//! Sizes and offsets are counted in characters (Unicode scalar values), so
//! slicing never splits a code point. Chunk `i` starts at character
//! `i * (chunk_size - overlap)`; the last chunk may be shorter.

use crate::types::{Chunk, Document};
use docqa_core::{AppError, AppResult};

/// Splits document text into overlapping fixed-size passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker; `overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        if overlap >= chunk_size {
            return Err(AppError::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Lazily split a document into chunks.
    pub fn chunk<'a>(&self, document: &'a Document) -> Chunks<'a> {
        let total_chars = document.text.chars().count();

        tracing::debug!(
            "Chunking '{}' ({} chars, size: {}, overlap: {})",
            document.source,
            total_chars,
            self.chunk_size,
            self.overlap
        );

        Chunks {
            chunker: *self,
            document_id: &document.id,
            text: &document.text,
            total_chars,
            next_sequence: 0,
            start_char: 0,
            start_byte: 0,
            done: total_chars == 0,
        }
    }

    /// Number of chunks a text of `total_chars` characters produces.
    pub fn chunk_count(&self, total_chars: usize) -> usize {
        if total_chars == 0 {
            0
        } else if total_chars <= self.chunk_size {
            1
        } else {
            1 + (total_chars - self.chunk_size).div_ceil(self.step())
        }
    }

    /// Rebuild the original text from consecutive chunks of one document.
    pub fn reassemble(chunks: &[Chunk]) -> String {
        let mut text = String::new();
        let mut covered: usize = 0;

        for chunk in chunks {
            let skip = covered.saturating_sub(chunk.start);
            text.extend(chunk.text.chars().skip(skip));
            covered = covered.max(chunk.end);
        }

        text
    }
}

/// Restartable iterator over the chunks of one document.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    chunker: Chunker,
    document_id: &'a str,
    text: &'a str,
    total_chars: usize,
    next_sequence: usize,
    start_char: usize,
    start_byte: usize,
    done: bool,
}

/// Byte offset of the `n`th character after `from`, clamped to the end.
fn advance(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(offset, _)| from + offset)
        .unwrap_or(text.len())
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }

        let end_char = (self.start_char + self.chunker.chunk_size).min(self.total_chars);
        let end_byte = advance(self.text, self.start_byte, end_char - self.start_char);

        let chunk = Chunk {
            document_id: self.document_id.to_string(),
            sequence: self.next_sequence,
            start: self.start_char,
            end: end_char,
            text: self.text[self.start_byte..end_byte].to_string(),
        };

        self.next_sequence += 1;

        if end_char >= self.total_chars {
            self.done = true;
        } else {
            let step = self.chunker.step();
            self.start_byte = advance(self.text, self.start_byte, step);
            self.start_char += step;
        }

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {
    fn len(&self) -> usize {
        if self.done {
            0
        } else {
            self.chunker.chunk_count(self.total_chars) - self.next_sequence
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("test.txt", text)
    }

    #[test]
    fn test_rejects_overlap_not_below_size() {
        assert!(matches!(
            Chunker::new(100, 100),
            Err(AppError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Chunker::new(0, 0),
            Err(AppError::InvalidConfiguration(_))
        ));
        assert!(Chunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_sentence_scenario() {
        let document = doc("The quick brown fox. The lazy dog sleeps.");
        let chunker = Chunker::new(20, 5).unwrap();
        let chunks: Vec<Chunk> = chunker.chunk(&document).collect();

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 20);
        }
        for pair in chunks.windows(2) {
            let suffix: String = pair[0].text.chars().skip(15).collect();
            let prefix: String = pair[1].text.chars().take(5).collect();
            assert_eq!(suffix, prefix);
        }
        assert_eq!(chunks[0].text, "The quick brown fox.");
        assert_eq!((chunks[2].start, chunks[2].end), (30, 41));
    }

    #[test]
    fn test_short_document_yields_one_chunk() {
        let document = doc("tiny");
        let chunks: Vec<Chunk> = Chunker::new(100, 10).unwrap().chunk(&document).collect();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "tiny");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 4));
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        let document = doc("");
        let chunker = Chunker::new(100, 10).unwrap();
        assert_eq!(chunker.chunk(&document).count(), 0);
        assert_eq!(chunker.chunk(&document).len(), 0);
    }

    #[test]
    fn test_no_overlap() {
        let document = doc(&"a".repeat(300));
        let chunks: Vec<Chunk> = Chunker::new(100, 0).unwrap().chunk(&document).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].start, 200);
    }

    #[test]
    fn test_exact_size_and_restartable() {
        let document = doc(&"abcdefghij".repeat(25));
        let chunker = Chunker::new(50, 10).unwrap();
        let mut chunks = chunker.chunk(&document);

        let fresh = chunks.clone();
        assert_eq!(chunks.len(), chunker.chunk_count(250));

        chunks.next();
        assert_eq!(chunks.len(), fresh.len() - 1);

        let first_pass: Vec<Chunk> = fresh.clone().collect();
        let second_pass: Vec<Chunk> = fresh.collect();
        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass.len(), 6);
    }

    #[test]
    fn test_multibyte_text_is_sliced_on_chars() {
        let text = "Gamedex é um aplicativo 🎮 brasileiro para gerenciar jogos!";
        let document = doc(text);
        let chunker = Chunker::new(7, 3).unwrap();
        let chunks: Vec<Chunk> = chunker.chunk(&document).collect();

        for chunk in &chunks {
            assert_eq!(chunk.text.chars().count(), chunk.char_len());
        }
        assert_eq!(Chunker::reassemble(&chunks), text);
    }

    #[test]
    fn test_reassembly_reproduces_text() {
        let text = "Refunds are issued within 30 days. Contact support for help!\n\n\
                    Warranty claims need a receipt? Yes, always.";
        for (size, overlap) in [(1, 0), (5, 4), (10, 3), (16, 8), (64, 0), (200, 50)] {
            let chunker = Chunker::new(size, overlap).unwrap();
            let document = doc(text);
            let chunks: Vec<Chunk> = chunker.chunk(&document).collect();

            assert_eq!(chunks.len(), chunker.chunk_count(text.chars().count()));
            assert_eq!(Chunker::reassemble(&chunks), text, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_chunks_carry_document_identity() {
        let document = doc("one two three four five six");
        let chunks: Vec<Chunk> = Chunker::new(10, 2).unwrap().chunk(&document).collect();

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.document_id, document.id);
            assert_eq!(chunk.sequence, i);
        }
    }
}
