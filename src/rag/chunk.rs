use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Fixed-size character windows with a constant overlap between neighbours.
///
/// No awareness of PR boundaries: one PR's text may span two chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 || overlap >= size {
            return Err(ChunkError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Join `texts` with newlines and split the result.
    pub fn split<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        let joined = texts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");
        self.split_text(&joined)
    }

    /// Windows `[start, start + size)`, `start` advancing by `size - overlap`.
    /// The last window always ends at the end of `text`.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let step = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(Chunker::new(50, 50).is_err());
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(51, 50).is_ok());
    }

    #[test]
    fn test_empty_input_has_no_chunks() {
        let chunker = Chunker::default();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_short_input_is_single_chunk() {
        let chunks = Chunker::default().split(&["one", "two"]);
        assert_eq!(chunks, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn test_chunks_respect_size_and_reassemble() {
        let chunker = Chunker::default();
        for len in [1, 499, 500, 501, 950, 951, 1234, 5000] {
            let text: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
            let chunks = chunker.split_text(&text);
            assert!(chunks.iter().all(|c| c.chars().count() <= 500), "len {len}");
            assert_eq!(reassemble(&chunks, 50), text, "len {len}");
        }
    }

    #[test]
    fn test_neighbours_share_overlap() {
        let text = "x".repeat(300) + &"y".repeat(700);
        let chunks = Chunker::default().split_text(&text);
        assert_eq!(chunks.len(), 3);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 50).collect();
            let head: String = pair[1].chars().take(50).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = Chunker::new(4, 1).unwrap();
        let chunks = chunker.split_text("äöüßäöü");
        assert_eq!(chunks, vec!["äöüß", "ßäöü"]);
    }
}
