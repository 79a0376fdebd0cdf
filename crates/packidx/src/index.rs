//! Pack index opening, version dispatch, and the query surface.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use packidx_hash::collections::OidArray;
use packidx_hash::fanout::FanoutTable;
use packidx_hash::{AbbreviatedObjectId, MutableObjectId, ObjectId};

use crate::entry::Entries;
use crate::reader::{read_array, HashingReader};
use crate::v1::PackIndexV1;
use crate::v2::PackIndexV2;
use crate::{DecodeError, IdxError, IDX_VERSION_2, TOC_SIGNATURE};

/// A pack index file, decoded into memory.
///
/// Created by [`open`](PackIndex::open) or [`read`](PackIndex::read)
/// and immutable afterwards; lookups never allocate, so shared
/// references may be used from several threads at once (each iterator
/// carries its own cursor).
#[derive(Debug)]
pub enum PackIndex {
    V1(PackIndexV1),
    V2(PackIndexV2),
}

impl PackIndex {
    /// Open a pack index file.
    ///
    /// The file descriptor is closed before this returns, on success
    /// and failure alike; the index keeps only the decoded tables and
    /// the pack checksum.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IdxError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                IdxError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                IdxError::Unreadable {
                    path: path.to_path_buf(),
                    source: e.into(),
                }
            }
        })?;
        match Self::read(BufReader::new(file)) {
            Ok(index) => Ok(index),
            Err(DecodeError::UnsupportedVersion(v)) => Err(IdxError::UnsupportedVersion(v)),
            Err(source) => Err(IdxError::Unreadable {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Decode an index from any byte source (file handle or memory blob).
    ///
    /// The trailing 20 bytes must be the SHA-1 of everything before
    /// them; a mismatch fails the decode.
    pub fn read(source: impl Read) -> Result<Self, DecodeError> {
        let mut reader = HashingReader::new(source);
        let header = read_array::<8, _>(&mut reader, "header")?;

        let index = if header[0..4] == TOC_SIGNATURE {
            let version = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
            if version != IDX_VERSION_2 {
                return Err(DecodeError::UnsupportedVersion(version));
            }
            Self::V2(PackIndexV2::read(&mut reader)?)
        } else {
            // No magic: the 8 bytes are the first two fan-out entries
            // of a v1 file.
            let fan0 = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
            let fan1 = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
            if fan0 > fan1 {
                return Err(DecodeError::Corrupt(
                    "leading fan-out entries decrease; not a pack index".into(),
                ));
            }
            Self::V1(PackIndexV1::read(&mut reader, fan0, fan1)?)
        };

        let (mut inner, actual) = reader.finish();
        let stored = read_array::<20, _>(&mut inner, "index checksum")?;
        let stored = ObjectId::from_bytes(&stored).expect("20-byte array");
        if stored != actual {
            return Err(DecodeError::ChecksumMismatch {
                expected: stored,
                actual,
            });
        }
        Ok(index)
    }

    /// Index format version (1 or 2).
    pub fn version(&self) -> u32 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
        }
    }

    /// Total number of objects in this index.
    pub fn object_count(&self) -> u64 {
        match self {
            Self::V1(idx) => idx.object_count(),
            Self::V2(idx) => idx.object_count(),
        }
    }

    /// Number of 64-bit offset slots (always 0 for v1).
    pub fn offset64_count(&self) -> u64 {
        match self {
            Self::V1(_) => 0,
            Self::V2(idx) => idx.offset64_count(),
        }
    }

    /// Whether `oid` is present in this index.
    pub fn has(&self, oid: &ObjectId) -> bool {
        self.find_position(oid).is_some()
    }

    /// Look up the pack offset of `oid`.
    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        match self {
            Self::V1(idx) => idx.find_offset(oid),
            Self::V2(idx) => idx.find_offset(oid),
        }
    }

    /// [`find_offset`](Self::find_offset) with `None` mapped to `-1`,
    /// for callers that expect the integer sentinel.
    pub fn find_offset_raw(&self, oid: &ObjectId) -> i64 {
        match self.find_offset(oid) {
            Some(offset) => offset as i64,
            None => -1,
        }
    }

    /// Find the sorted position of `oid`.
    pub fn find_position(&self, oid: &ObjectId) -> Option<u64> {
        match self {
            Self::V1(idx) => idx.find_position(oid),
            Self::V2(idx) => idx.find_position(oid),
        }
    }

    /// Look up the CRC32 of `oid`'s compressed pack representation.
    ///
    /// Fails with [`IdxError::CrcNotSupported`] on a v1 index and with
    /// [`IdxError::MissingObject`] when `oid` is absent.
    pub fn find_crc32(&self, oid: &ObjectId) -> Result<u32, IdxError> {
        match self {
            Self::V1(_) => Err(IdxError::CrcNotSupported),
            Self::V2(idx) => idx
                .find_crc32(oid)
                .ok_or(IdxError::MissingObject(*oid)),
        }
    }

    /// Object id at the given sorted position.
    ///
    /// # Panics
    ///
    /// Panics if `position >= object_count()`.
    pub fn object_id_at(&self, position: u64) -> ObjectId {
        match self {
            Self::V1(idx) => idx.object_id_at(position),
            Self::V2(idx) => idx.object_id_at(position),
        }
    }

    /// Pack offset at the given sorted position.
    ///
    /// # Panics
    ///
    /// Panics if `position >= object_count()`.
    pub fn offset_at(&self, position: u64) -> u64 {
        match self {
            Self::V1(idx) => idx.offset_at(position),
            Self::V2(idx) => idx.offset_at(position),
        }
    }

    /// CRC32 at the given sorted position.
    ///
    /// # Panics
    ///
    /// Panics if `position >= object_count()`.
    pub fn crc32_at(&self, position: u64) -> Result<u32, IdxError> {
        match self {
            Self::V1(_) => Err(IdxError::CrcNotSupported),
            Self::V2(idx) => Ok(idx.crc32_at(position)),
        }
    }

    /// Checksum of the companion pack, from the index trailer.
    pub fn pack_checksum(&self) -> &ObjectId {
        match self {
            Self::V1(idx) => idx.pack_checksum(),
            Self::V2(idx) => idx.pack_checksum(),
        }
    }

    /// Iterate over all entries in ascending id order.
    ///
    /// The iterator rewrites one shared entry in place; see
    /// [`Entries::next_entry`].
    pub fn iter(&self) -> Entries<'_> {
        Entries::new(self)
    }

    /// Append every id beginning with `abbrev` to `matches`.
    ///
    /// Stops once `matches` holds `match_limit + 1` entries, one past
    /// the limit, so callers can tell "ambiguous" from "resolved"
    /// without collecting every candidate. Zero appended ids means the
    /// abbreviation names nothing in this index.
    pub fn resolve(
        &self,
        matches: &mut OidArray,
        abbrev: &AbbreviatedObjectId,
        match_limit: usize,
    ) {
        let range = if abbrev.hex_len() >= 2 {
            self.fanout().range(abbrev.first_byte())
        } else {
            // A single nibble spans sixteen adjacent first-byte buckets.
            let first = abbrev.first_byte();
            self.fanout().span(first, first | 0x0f)
        };

        // Lower bound: first position whose id is not below the prefix.
        let mut low = range.start;
        let mut high = range.end;
        while low < high {
            let mid = low + (high - low) / 2;
            if abbrev.prefix_compare(self.oid_bytes_at(mid as u64)) == Ordering::Greater {
                low = mid + 1;
            } else {
                high = mid;
            }
        }

        for position in low..range.end {
            let id = self.oid_bytes_at(position as u64);
            if !abbrev.matches(id) {
                break;
            }
            matches.push(ObjectId::from_bytes(id).expect("20-byte id slice"));
            if matches.len() > match_limit {
                break;
            }
        }
    }

    fn fanout(&self) -> &FanoutTable {
        match self {
            Self::V1(idx) => idx.fanout(),
            Self::V2(idx) => idx.fanout(),
        }
    }

    fn oid_bytes_at(&self, position: u64) -> &[u8] {
        match self {
            Self::V1(idx) => idx.oid_bytes_at(position),
            Self::V2(idx) => idx.oid_bytes_at(position),
        }
    }

    /// Overwrite `id` with the entry at `position`, returning its offset.
    pub(crate) fn copy_entry(&self, position: u64, id: &mut MutableObjectId) -> u64 {
        match self {
            Self::V1(idx) => idx.copy_entry(position, id),
            Self::V2(idx) => idx.copy_entry(position, id),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Header-probe behavior only; fixture-backed coverage lives in
    //! the crate's integration tests.

    use super::*;

    #[test]
    fn version_3_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&TOC_SIGNATURE);
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(&[0u8; 1024]);

        let err = PackIndex::read(&buf[..]).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion(3)));
    }

    #[test]
    fn truncated_header_rejected() {
        let err = PackIndex::read(&[0xffu8, 0x74][..]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated("header")));
    }

    #[test]
    fn decreasing_leading_fanout_rejected() {
        // No TOC magic and fan[0] > fan[1]: cannot be a v1 index either.
        let mut buf = Vec::new();
        buf.extend_from_slice(&9u32.to_be_bytes());
        buf.extend_from_slice(&3u32.to_be_bytes());

        let err = PackIndex::read(&buf[..]).unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)));
    }
}
