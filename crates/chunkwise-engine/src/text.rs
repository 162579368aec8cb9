//! Word statistics over text chunks.
//!
//! The parser is a pure function of its chunk: it keeps no state between
//! calls. Context from the previous chunk arrives as the carry byte, which
//! decides whether the chunk starts inside a word and, if that word ends at
//! the first byte, how it is classified.

use chunkwise_core::{TextChunk, TextStats, WordBoundary};

/// Counts words and classifies their first and last bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkBoundaryParser {
    boundary: WordBoundary,
}

impl ChunkBoundaryParser {
    /// Create a parser for the given separator policy.
    pub const fn new(boundary: WordBoundary) -> Self {
        Self { boundary }
    }

    /// Separator policy in use.
    pub const fn boundary(&self) -> WordBoundary {
        self.boundary
    }

    /// Parse one chunk.
    pub fn parse(&self, chunk: &TextChunk) -> TextStats {
        self.parse_bytes(&chunk.bytes, chunk.carry, chunk.is_final)
    }

    /// Parse raw bytes.
    ///
    /// A word is counted, and its first byte classified, in the chunk where it
    /// starts. A word still open when a non-final chunk ends is left for the
    /// next chunk to close; one still open at the end of a final chunk is
    /// closed here.
    pub fn parse_bytes(&self, bytes: &[u8], carry: u8, is_final: bool) -> TextStats {
        let mut stats = TextStats::default();
        let mut in_word = !self.boundary.is_separator(carry);
        let mut last = carry;

        for &byte in bytes {
            if self.boundary.is_separator(byte) {
                if in_word {
                    close_word(&mut stats, last);
                    in_word = false;
                }
            } else if !in_word {
                stats.words += 1;
                if is_vowel(byte) {
                    stats.vowel_start += 1;
                }
                in_word = true;
            }
            last = byte;
        }

        if in_word && is_final {
            close_word(&mut stats, last);
        }

        stats
    }
}

fn close_word(stats: &mut TextStats, last: u8) {
    if is_consonant(last) {
        stats.consonant_end += 1;
    }
}

/// ASCII vowel, either case.
#[inline]
pub const fn is_vowel(byte: u8) -> bool {
    matches!(
        byte,
        b'a' | b'e' | b'i' | b'o' | b'u' | b'A' | b'E' | b'I' | b'O' | b'U'
    )
}

/// ASCII letter that is not a vowel.
#[inline]
pub const fn is_consonant(byte: u8) -> bool {
    byte.is_ascii_alphabetic() && !is_vowel(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"The cat sat. An owl flew up.";

    fn whitespace() -> ChunkBoundaryParser {
        ChunkBoundaryParser::new(WordBoundary::Whitespace)
    }

    #[test]
    fn test_sample_whitespace() {
        let stats = whitespace().parse_bytes(SAMPLE, b' ', true);
        assert_eq!(stats, TextStats::new(7, 3, 4));
    }

    #[test]
    fn test_sample_punctuation() {
        let parser = ChunkBoundaryParser::new(WordBoundary::Punctuation);
        let stats = parser.parse_bytes(SAMPLE, b' ', true);
        assert_eq!(stats, TextStats::new(7, 3, 6));
    }

    #[test]
    fn test_empty_and_separators() {
        let parser = whitespace();
        assert!(parser.parse_bytes(b"", b' ', true).is_zero());
        assert!(parser.parse_bytes(b" \t\r\n  ", b' ', true).is_zero());
    }

    #[test]
    fn test_open_word_not_closed_before_final() {
        let parser = whitespace();
        let stats = parser.parse_bytes(b"one two", b' ', false);
        // "two" is counted where it starts but its ending is unknown yet.
        assert_eq!(stats, TextStats::new(2, 1, 0));

        let stats = parser.parse_bytes(b"one two", b' ', true);
        assert_eq!(stats, TextStats::new(2, 1, 0));

        let stats = parser.parse_bytes(b"one cat", b' ', true);
        assert_eq!(stats, TextStats::new(2, 1, 1));
    }

    #[test]
    fn test_carry_continues_word() {
        let parser = whitespace();
        // Previous chunk ended with "...ca"; this one starts with "t up".
        let stats = parser.parse_bytes(b"t up", b'a', true);
        assert_eq!(stats, TextStats::new(1, 1, 2));
    }

    #[test]
    fn test_carry_classifies_immediate_end() {
        let parser = whitespace();
        // Previous chunk ended inside "cat" at its last letter.
        let stats = parser.parse_bytes(b" ", b't', false);
        assert_eq!(stats, TextStats::new(0, 0, 1));

        // An empty final chunk closes the carried word.
        let stats = parser.parse_bytes(b"", b't', true);
        assert_eq!(stats, TextStats::new(0, 0, 1));
    }

    #[test]
    fn test_non_ascii_is_word_but_unclassified() {
        let parser = whitespace();
        let stats = parser.parse_bytes("été ñu".as_bytes(), b' ', true);
        assert_eq!(stats.words, 2);
        assert_eq!(stats.vowel_start, 0);
        assert_eq!(stats.consonant_end, 0);
    }

    #[test]
    fn test_parse_chunk() {
        let chunk = TextChunk::new(b"Apple pie".to_vec(), b' ', true);
        assert_eq!(whitespace().parse(&chunk), TextStats::new(2, 1, 0));
    }

    #[test]
    fn test_classification() {
        assert!(is_vowel(b'E'));
        assert!(!is_vowel(b'y'));
        assert!(is_consonant(b'y'));
        assert!(!is_consonant(b'.'));
        assert!(!is_consonant(0xC3));
    }
}
