//! Input sources: turn a text stream or a matrix file into work units.
//!
//! Sources are owned by the dispatcher and consumed sequentially. Both are
//! generic over [`Read`] so tests and embedders can feed in-memory data.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use tracing::debug;

use chunkwise_core::{
    Error, MatrixTask, Result, TextChunk, UnitKind, WordBoundary, WorkUnit, MIN_CHUNK_BYTES,
};

/// A finite, ordered stream of work units for one input.
pub trait UnitSource {
    /// Name used in reports and diagnostics.
    fn name(&self) -> &str;

    /// Kind of units produced.
    fn kind(&self) -> UnitKind;

    /// Next unit in source order, or `None` once exhausted. Keeps returning
    /// `None` after that.
    fn next_unit(&mut self) -> Result<Option<WorkUnit>>;
}

/// Size of the matrix file header: count and order.
const HEADER_BYTES: usize = 8;

/// Carry byte used for the first chunk of every input.
pub const INITIAL_CARRY: u8 = b' ';

/// Cuts a byte stream into chunks that never split a word.
#[derive(Debug)]
pub struct TextSource<R> {
    name: String,
    reader: R,
    boundary: WordBoundary,
    max_chunk_bytes: usize,
    /// Bytes read past the last cut, prepended to the next chunk.
    pending: Vec<u8>,
    carry: u8,
    chunks: usize,
    finished: bool,
}

impl TextSource<BufReader<File>> {
    /// Open a text file.
    pub fn open(
        path: impl AsRef<Path>,
        max_chunk_bytes: usize,
        boundary: WordBoundary,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::input_access(path.display().to_string(), e))?;
        Self::from_reader(
            path.display().to_string(),
            BufReader::new(file),
            max_chunk_bytes,
            boundary,
        )
    }
}

impl<R: Read> TextSource<R> {
    /// Wrap a reader.
    pub fn from_reader(
        name: impl Into<String>,
        reader: R,
        max_chunk_bytes: usize,
        boundary: WordBoundary,
    ) -> Result<Self> {
        if max_chunk_bytes < MIN_CHUNK_BYTES {
            return Err(Error::configuration(format!(
                "max_chunk_bytes must be at least {MIN_CHUNK_BYTES}, got {max_chunk_bytes}"
            )));
        }
        Ok(Self {
            name: name.into(),
            reader,
            boundary,
            max_chunk_bytes,
            pending: Vec::new(),
            carry: INITIAL_CARRY,
            chunks: 0,
            finished: false,
        })
    }

    /// Number of chunks produced so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Whether the final chunk has been produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Produce the next chunk.
    ///
    /// Tops the pending bytes up to `max_chunk_bytes`. A short read means end
    /// of input and yields the final chunk. Otherwise the buffer is cut after
    /// its last separator and the tail is kept for the next call; a buffer with
    /// no separator at all is one long word and is cut as is.
    pub fn next_chunk(&mut self) -> Result<Option<TextChunk>> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = std::mem::take(&mut self.pending);
        let eof = self.fill(&mut buffer)?;

        if eof {
            self.finished = true;
        } else if let Some(pos) = buffer
            .iter()
            .rposition(|&b| self.boundary.is_separator(b))
        {
            self.pending = buffer.split_off(pos + 1);
        } else {
            debug!(
                input = %self.name,
                len = buffer.len(),
                "no separator in a full buffer, cutting inside a word"
            );
        }

        let carry = self.carry;
        if let Some(last) = buffer.last() {
            self.carry = *last;
        }
        self.chunks += 1;

        Ok(Some(TextChunk::new(buffer, carry, eof)))
    }

    /// Read until `buffer` holds `max_chunk_bytes` bytes or the reader is
    /// exhausted. Returns whether end of input was reached.
    fn fill(&mut self, buffer: &mut Vec<u8>) -> Result<bool> {
        let mut filled = buffer.len();
        buffer.resize(self.max_chunk_bytes, 0);

        let mut eof = false;
        while filled < buffer.len() {
            match self.reader.read(&mut buffer[filled..]) {
                Ok(0) => {
                    eof = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Error::io(format!("failed reading {}", self.name), e));
                }
            }
        }

        buffer.truncate(filled);
        Ok(eof)
    }
}

impl<R: Read> UnitSource for TextSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Text
    }

    fn next_unit(&mut self) -> Result<Option<WorkUnit>> {
        Ok(self.next_chunk()?.map(WorkUnit::Text))
    }
}

/// Reads matrices from the binary matrix format.
///
/// Layout: little-endian `i32` count, little-endian `i32` order, then
/// `count * order * order` little-endian `f64` values, row-major, one matrix
/// after another.
#[derive(Debug)]
pub struct MatrixSource<R> {
    name: String,
    reader: R,
    count: usize,
    order: usize,
    next_index: usize,
    matrix_bytes: usize,
    buffer: Vec<u8>,
}

impl MatrixSource<BufReader<File>> {
    /// Open a matrix file and read its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::input_access(&name, e))?;
        let len = file
            .metadata()
            .map_err(|e| Error::input_access(&name, e))?
            .len();
        let source = Self::from_reader(name, BufReader::new(file))?;
        source.check_length(len)?;
        Ok(source)
    }
}

impl<R: Read> MatrixSource<R> {
    /// Wrap a reader positioned at the header.
    pub fn from_reader(name: impl Into<String>, mut reader: R) -> Result<Self> {
        let name = name.into();

        let mut header = [0u8; HEADER_BYTES];
        read_exact(&mut reader, &mut header, &name, "header")?;
        let count = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let order = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if count < 0 {
            return Err(Error::invalid_input(
                &name,
                format!("negative matrix count {count}"),
            ));
        }
        if order <= 0 {
            return Err(Error::invalid_input(
                &name,
                format!("matrix order must be positive, got {order}"),
            ));
        }

        let order = order as usize;
        let matrix_bytes = order
            .checked_mul(order)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f64>()))
            .ok_or_else(|| Error::invalid_input(&name, format!("matrix order {order} is too large")))?;

        debug!(input = %name, count, order, "opened matrix input");

        Ok(Self {
            name,
            reader,
            count: count as usize,
            order,
            next_index: 0,
            matrix_bytes,
            buffer: Vec::new(),
        })
    }

    /// Reject an input whose byte length cannot hold what the header announces.
    pub fn check_length(&self, len: u64) -> Result<()> {
        let expected = HEADER_BYTES as u128 + self.count as u128 * self.matrix_bytes as u128;
        if u128::from(len) >= expected {
            return Ok(());
        }
        let first_short = len.saturating_sub(HEADER_BYTES as u64) / self.matrix_bytes as u64;
        Err(Error::invalid_input(
            &self.name,
            format!("truncated matrix {first_short}: header promises {expected} bytes, input has {len}"),
        ))
    }

    /// Number of matrices announced by the header.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Order shared by every matrix.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Read the next matrix, tagged with its position in the file.
    pub fn next_task(&mut self) -> Result<Option<MatrixTask>> {
        if self.next_index >= self.count {
            return Ok(None);
        }

        let index = self.next_index;
        // Grow with the data actually read, not with the size the header claims.
        self.buffer.clear();
        let read = (&mut self.reader)
            .take(self.matrix_bytes as u64)
            .read_to_end(&mut self.buffer)
            .map_err(|e| Error::io(format!("failed reading matrix {index} of {}", self.name), e))?;
        if read < self.matrix_bytes {
            return Err(Error::invalid_input(
                &self.name,
                format!("truncated matrix {index}"),
            ));
        }

        let values = self
            .buffer
            .chunks_exact(8)
            .map(|raw| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(raw);
                f64::from_le_bytes(bytes)
            })
            .collect();

        self.next_index += 1;
        Ok(Some(MatrixTask::new(self.order, index, values)))
    }
}

impl<R: Read> UnitSource for MatrixSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Matrix
    }

    fn next_unit(&mut self) -> Result<Option<WorkUnit>> {
        Ok(self.next_task()?.map(WorkUnit::Matrix))
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], name: &str, what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::invalid_input(name, format!("truncated {what}")),
        _ => Error::io(format!("failed reading {what} of {name}"), e),
    })
}

/// Encode matrices in the binary matrix format.
pub fn write_matrices<W: io::Write>(writer: &mut W, order: usize, matrices: &[Vec<f64>]) -> Result<()> {
    let count = i32::try_from(matrices.len())
        .map_err(|_| Error::internal("too many matrices for the file header"))?;
    let order_field =
        i32::try_from(order).map_err(|_| Error::internal("matrix order exceeds the file header"))?;

    writer.write_all(&count.to_le_bytes())?;
    writer.write_all(&order_field.to_le_bytes())?;
    for matrix in matrices {
        if matrix.len() != order * order {
            return Err(Error::internal(format!(
                "expected {} values, got {}",
                order * order,
                matrix.len()
            )));
        }
        for value in matrix {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::ChunkBoundaryParser;
    use chunkwise_core::TextStats;
    use proptest::prelude::*;
    use std::io::{Cursor, Write};

    fn chunks_of(text: &[u8], max: usize, boundary: WordBoundary) -> Vec<TextChunk> {
        let mut source =
            TextSource::from_reader("mem", Cursor::new(text.to_vec()), max, boundary).unwrap();
        let mut chunks = Vec::new();
        while let Some(chunk) = source.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        assert!(source.is_finished());
        assert!(source.next_chunk().unwrap().is_none());
        chunks
    }

    #[test]
    fn test_empty_input_single_final_chunk() {
        let chunks = chunks_of(b"", 11, WordBoundary::Whitespace);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
        assert!(chunks[0].is_final);
        assert_eq!(chunks[0].carry, INITIAL_CARRY);
    }

    #[test]
    fn test_cut_keeps_separator_and_carry() {
        let chunks = chunks_of(b"The cat sat. An owl flew up.", 11, WordBoundary::Whitespace);
        let texts: Vec<&[u8]> = chunks.iter().map(|c| c.bytes.as_slice()).collect();
        assert_eq!(
            texts,
            vec![&b"The cat "[..], b"sat. An ", b"owl flew ", b"up."]
        );
        assert_eq!(chunks[0].carry, b' ');
        assert_eq!(chunks[1].carry, b' ');
        assert!(chunks[..3].iter().all(|c| !c.is_final));
        assert!(chunks[3].is_final);
    }

    #[test]
    fn test_long_word_cut_whole() {
        let chunks = chunks_of(b"abcdefghijklmnop qr", 11, WordBoundary::Whitespace);
        assert_eq!(chunks[0].bytes, b"abcdefghijk");
        assert_eq!(chunks[1].carry, b'k');

        let parser = ChunkBoundaryParser::new(WordBoundary::Whitespace);
        let total: TextStats = chunks.iter().map(|c| parser.parse(c)).sum();
        assert_eq!(total, TextStats::new(2, 1, 2));
    }

    #[test]
    fn test_exact_fill_then_eof() {
        let chunks = chunks_of(b"hello world", 11, WordBoundary::Whitespace);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].bytes, b"hello ");
        assert_eq!(chunks[1].bytes, b"world");
        assert!(chunks[1].is_final);

        // One word filling the buffer exactly leaves an empty final chunk.
        let chunks = chunks_of(b"abcdefghijk", 11, WordBoundary::Whitespace);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_empty());
        assert!(chunks[1].is_final);
        assert_eq!(chunks[1].carry, b'k');
    }

    #[test]
    fn test_rejects_small_chunks() {
        let err = TextSource::from_reader("mem", Cursor::new(Vec::new()), 10, WordBoundary::Whitespace)
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_missing_file() {
        let err = TextSource::open("/definitely/not/here.txt", 100, WordBoundary::Whitespace)
            .unwrap_err();
        assert_eq!(err.error_code(), "INPUT_ACCESS_ERROR");
        let err = MatrixSource::open("/definitely/not/here.bin").unwrap_err();
        assert_eq!(err.error_code(), "INPUT_ACCESS_ERROR");
    }

    fn encoded(order: usize, matrices: &[Vec<f64>]) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_matrices(&mut bytes, order, matrices).unwrap();
        bytes
    }

    #[test]
    fn test_matrix_file_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encoded(2, &[vec![1.0, 2.0, 3.0, 4.0], vec![2.0, 0.0, 0.0, 2.0]]))
            .unwrap();
        file.flush().unwrap();

        let mut source = MatrixSource::open(file.path()).unwrap();
        assert_eq!(source.count(), 2);
        assert_eq!(source.order(), 2);

        let first = source.next_task().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.values, vec![1.0, 2.0, 3.0, 4.0]);
        let second = source.next_task().unwrap().unwrap();
        assert_eq!(second.index, 1);
        assert!(source.next_task().unwrap().is_none());
        assert!(source.next_unit().unwrap().is_none());
    }

    #[test]
    fn test_matrix_header_validation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        let err = MatrixSource::from_reader("neg", Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        let err = MatrixSource::from_reader("zero", Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let err = MatrixSource::from_reader("short", Cursor::new(vec![1, 0, 0])).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_matrix_truncated_values() {
        let mut bytes = encoded(2, &[vec![1.0, 2.0, 3.0, 4.0]]);
        bytes[0] = 2; // header now promises two matrices
        let mut source = MatrixSource::from_reader("trunc", Cursor::new(bytes)).unwrap();
        assert!(source.next_task().unwrap().is_some());
        let err = source.next_task().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(err.to_string().contains("truncated matrix 1"));
    }

    fn header(count: i32, order: i32) -> Vec<u8> {
        let mut bytes = count.to_le_bytes().to_vec();
        bytes.extend_from_slice(&order.to_le_bytes());
        bytes
    }

    #[test]
    fn test_huge_order_without_data() {
        let mut source = MatrixSource::from_reader("huge", Cursor::new(header(1, 1 << 24))).unwrap();
        assert_eq!(source.order(), 1 << 24);
        let err = source.next_task().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(err.to_string().contains("truncated matrix 0"));
    }

    #[test]
    fn test_huge_count_without_data() {
        let mut source =
            MatrixSource::from_reader("many", Cursor::new(header(i32::MAX, 1))).unwrap();
        assert_eq!(source.count(), i32::MAX as usize);
        let err = source.next_task().unwrap_err();
        assert!(err.to_string().contains("truncated matrix 0"));
    }

    #[test]
    fn test_open_checks_file_length() {
        let mut bytes = header(3, 2);
        bytes.extend_from_slice(&encoded(2, &[vec![1.0, 2.0, 3.0, 4.0]])[8..]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let err = MatrixSource::open(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(err.to_string().contains("truncated matrix 1"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&header(1, 1 << 24)).unwrap();
        assert!(MatrixSource::open(file.path()).is_err());
    }

    #[test]
    fn test_zero_matrices() {
        let mut source = MatrixSource::from_reader("empty", Cursor::new(encoded(3, &[]))).unwrap();
        assert_eq!(source.count(), 0);
        assert!(source.next_task().unwrap().is_none());
    }

    fn text_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(
            prop::sample::select(b"aeiouxyzTBK .,;\n\t'".to_vec()),
            0..400,
        )
    }

    proptest! {
        #[test]
        fn prop_chunks_reconstruct_input(text in text_strategy(), max in 11usize..64) {
            for boundary in [WordBoundary::Whitespace, WordBoundary::Punctuation] {
                let chunks = chunks_of(&text, max, boundary);
                let joined: Vec<u8> = chunks.iter().flat_map(|c| c.bytes.iter().copied()).collect();
                prop_assert_eq!(&joined, &text);
                prop_assert!(chunks.iter().all(|c| c.len() <= max));
                prop_assert_eq!(chunks.iter().filter(|c| c.is_final).count(), 1);
            }
        }

        #[test]
        fn prop_chunking_preserves_counts(text in text_strategy(), max in 11usize..64) {
            for boundary in [WordBoundary::Whitespace, WordBoundary::Punctuation] {
                let parser = ChunkBoundaryParser::new(boundary);
                let whole = parser.parse_bytes(&text, INITIAL_CARRY, true);
                let split: TextStats = chunks_of(&text, max, boundary)
                    .iter()
                    .map(|c| parser.parse(c))
                    .sum();
                prop_assert_eq!(whole, split);
            }
        }

        #[test]
        fn prop_words_never_split(
            words in prop::collection::vec("[a-z]{1,8}", 1..60),
            max in 11usize..40,
        ) {
            let text = words.join(" ");
            let chunks = chunks_of(text.as_bytes(), max, WordBoundary::Whitespace);
            for chunk in &chunks[..chunks.len() - 1] {
                prop_assert_eq!(chunk.last_byte(), Some(b' '));
            }
        }
    }
}
