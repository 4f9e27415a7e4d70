//! Word-based chunking with overlap.

use llmbind_core::error::Error;

/// Splits text into windows of at most `chunk_size` words, each starting
/// `chunk_size - overlap` words after the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            overlap: 30,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, Error> {
        if chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk_size must be at least 1".into(),
            });
        }
        if overlap >= chunk_size {
            return Err(Error::Config {
                message: format!("chunk_overlap ({overlap}) must be less than chunk_size ({chunk_size})"),
            });
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk texts in document order. Whitespace is normalized to single
    /// spaces; blank text yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::new();
        let mut offset = 0;

        while offset < words.len() {
            let end = (offset + self.chunk_size).min(words.len());
            chunks.push(words[offset..end].join(" "));
            if end == words.len() {
                break;
            }
            offset = end - self.overlap;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = Chunker::new(10, 2).unwrap();
        assert_eq!(chunker.chunk("the quick  brown\nfox"), vec!["the quick brown fox"]);
    }

    #[test]
    fn windows_overlap() {
        let chunker = Chunker::new(4, 1).unwrap();
        let chunks = chunker.chunk("a b c d e f g h i j");
        assert_eq!(chunks, vec!["a b c d", "d e f g", "g h i j"]);
    }

    #[test]
    fn exact_fit_has_no_trailing_chunk() {
        let chunker = Chunker::new(3, 1).unwrap();
        assert_eq!(chunker.chunk("a b c d e"), vec!["a b c", "c d e"]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(Chunker::default().chunk(" \n\t").is_empty());
    }

    #[test]
    fn rejects_bad_policy() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(5, 5).is_err());
        assert!(Chunker::new(5, 4).is_ok());
    }
}
