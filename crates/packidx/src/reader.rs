//! Byte-level input helpers for index decoding.

use std::io::{self, Read};

use packidx_hash::hasher::Hasher;
use packidx_hash::ObjectId;

use crate::DecodeError;

/// Reader adapter that feeds every byte it delivers into a SHA-1.
///
/// Index files end in a checksum of everything before it; decoding
/// through this adapter makes the digest available once the tables
/// have been consumed.
pub struct HashingReader<R> {
    inner: R,
    hasher: Hasher,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
        }
    }

    /// Stop hashing, returning the inner reader and the digest of all
    /// bytes read so far.
    pub fn finish(self) -> (R, ObjectId) {
        (self.inner, self.hasher.finalize())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// Read exactly `N` bytes into a stack array.
pub(crate) fn read_array<const N: usize, R: Read>(
    reader: &mut R,
    section: &'static str,
) -> Result<[u8; N], DecodeError> {
    let mut buf = [0u8; N];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(buf),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(DecodeError::Truncated(section)),
        Err(e) => Err(e.into()),
    }
}

/// Read exactly `len` bytes into a fresh boxed slice.
///
/// The buffer grows as bytes arrive; `len` is not allocated up front.
/// A short read fails with `section` named in the error.
pub(crate) fn read_blob<R: Read>(
    reader: &mut R,
    len: u64,
    section: &'static str,
) -> Result<Box<[u8]>, DecodeError> {
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(DecodeError::Truncated(section));
    }
    Ok(buf.into_boxed_slice())
}

/// Decode a big-endian u32 at `pos` in `data`.
pub(crate) fn be32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// Decode a big-endian u64 at `pos` in `data`.
pub(crate) fn be64(data: &[u8], pos: usize) -> u64 {
    u64::from_be_bytes([
        data[pos],
        data[pos + 1],
        data[pos + 2],
        data[pos + 3],
        data[pos + 4],
        data[pos + 5],
        data[pos + 6],
        data[pos + 7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use packidx_hash::hasher::Hasher;

    #[test]
    fn hashing_reader_digests_consumed_bytes() {
        let data = b"some index bytes".to_vec();
        let mut reader = HashingReader::new(&data[..]);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);

        let (_, digest) = reader.finish();
        assert_eq!(digest, Hasher::digest(&data));
    }

    #[test]
    fn hashing_reader_excludes_unread_tail() {
        let data = b"headtail".to_vec();
        let mut reader = HashingReader::new(&data[..]);

        let head = read_array::<4, _>(&mut reader, "head").unwrap();
        assert_eq!(&head, b"head");

        let (mut inner, digest) = reader.finish();
        assert_eq!(digest, Hasher::digest(b"head"));

        let tail = read_array::<4, _>(&mut inner, "tail").unwrap();
        assert_eq!(&tail, b"tail");
    }

    #[test]
    fn read_blob_reports_truncation() {
        let data = [0u8; 10];
        let err = read_blob(&mut &data[..], 11, "object ids").unwrap_err();
        assert!(matches!(err, DecodeError::Truncated("object ids")));
    }

    #[test]
    fn read_blob_exact_length() {
        let data = [7u8; 10];
        let blob = read_blob(&mut &data[..], 10, "records").unwrap();
        assert_eq!(&*blob, &data);
    }

    #[test]
    fn read_array_reports_truncation() {
        let data = [0u8; 3];
        let err = read_array::<8, _>(&mut &data[..], "header").unwrap_err();
        assert!(matches!(err, DecodeError::Truncated("header")));
    }

    #[test]
    fn be_decoders() {
        let data = [0x00, 0x01, 0x02, 0x03, 0x80, 0x00, 0x00, 0x00, 0x01, 0x00];
        assert_eq!(be32(&data, 0), 0x0001_0203);
        assert_eq!(be32(&data, 4), 0x8000_0000);
        assert_eq!(be64(&data, 1), 0x0102_0380_0000_0001);
    }
}
