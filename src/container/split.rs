use super::format::{Counted, Header, SYNC_SIZE};
use super::reader::{ContainerReader, ReadError};

/// Reads byte ranges of an in-memory container independently.
///
/// A block belongs to the range containing its start, which is the byte
/// right after the preceding sync token. Ranges that tile the container
/// therefore see every block exactly once.
pub struct SplitReader<'a> {
    data: &'a [u8],
    header: Header,
    header_len: usize,
}

impl<'a> SplitReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, ReadError> {
        let mut source = Counted::new(data);
        let header = Header::read_from(&mut source)?;
        let header_len = source.count() as usize;

        Ok(Self {
            data,
            header,
            header_len,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Offset of the first block.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// First block boundary at or after `from`.
    pub fn next_boundary(&self, from: usize) -> Option<usize> {
        if from <= self.header_len {
            return Some(self.header_len);
        }
        if from > self.data.len() {
            return None;
        }

        let search_start = from - SYNC_SIZE;
        self.data[search_start..]
            .windows(SYNC_SIZE)
            .position(|window| window == self.header.sync)
            .map(|index| search_start + index + SYNC_SIZE)
    }

    /// Records of the blocks starting in `[start, end)`.
    pub fn split(&self, start: usize, end: usize) -> Result<ContainerReader<&'a [u8]>, ReadError> {
        let begin = self
            .next_boundary(start)
            .unwrap_or(self.data.len())
            .min(self.data.len());

        ContainerReader::resume(
            &self.data[begin..],
            self.header.clone(),
            begin as u64,
            Some(end as u64),
        )
    }

    /// Cut the container into `count` ranges of roughly equal size.
    pub fn ranges(&self, count: usize) -> Vec<(usize, usize)> {
        let count = count.max(1);
        let step = self.data.len().div_ceil(count).max(1);

        (0..count)
            .map(|i| ((i * step).min(self.data.len()), ((i + 1) * step).min(self.data.len())))
            .collect()
    }
}
