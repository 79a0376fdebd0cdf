//! Pack index (`.idx`) reading and lookup.
//!
//! A pack index maps a 20-byte object id to its byte offset inside the
//! companion pack file, using a 256-entry fan-out table to narrow a
//! binary search to ids sharing a leading byte. Two on-disk layouts
//! exist:
//!
//! ```text
//! v2 (current):
//!   Header:  \xff tOc (4 bytes) | version (4 bytes = 2)
//!   Fanout:  256 × 4-byte big-endian cumulative counts
//!   OIDs:    N × 20-byte sorted OIDs
//!   CRC32:   N × 4-byte CRC32 values
//!   Offsets: N × 4-byte offsets (high bit set → 64-bit table index)
//!   64-bit:  K × 8-byte offsets (for packs ≥ 2 GiB)
//!   Trailer: 20-byte pack checksum | 20-byte index checksum
//!
//! v1 (legacy, no header):
//!   Fanout:  256 × 4-byte big-endian cumulative counts
//!   Records: N × (4-byte offset | 20-byte OID), sorted by OID
//!   Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```
//!
//! [`PackIndex::open`] detects the layout, loads the tables into
//! memory, verifies the trailing checksum, and closes the file. The
//! resulting value is immutable; lookups are `O(log n)` and never
//! allocate.

pub mod entry;
pub mod index;
pub mod reader;
pub mod v1;
pub mod v2;

use std::path::PathBuf;

use packidx_hash::ObjectId;

pub use entry::{Entries, Entry};
pub use index::PackIndex;
pub use v1::PackIndexV1;
pub use v2::PackIndexV2;

/// Errors surfaced by [`PackIndex::open`] and index queries.
#[derive(Debug, thiserror::Error)]
pub enum IdxError {
    #[error("pack index not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("unreadable pack index {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("unsupported pack index version {0}")]
    UnsupportedVersion(u32),

    #[error("object {0} is not in this pack index")]
    MissingObject(ObjectId),

    #[error("CRC32 values are not stored in a v1 pack index")]
    CrcNotSupported,
}

/// Structural failures while decoding an index file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("truncated pack index: {0}")]
    Truncated(&'static str),

    #[error("corrupt pack index: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Hash(#[from] packidx_hash::HashError),

    #[error("pack index claims {0} objects, above the v1 limit")]
    TooManyObjects(u64),

    #[error("unsupported pack index version {0}")]
    UnsupportedVersion(u32),

    #[error("index checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: ObjectId,
        actual: ObjectId,
    },
}

/// Pack index v2 header constants.
pub const TOC_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\377tOc"
pub const IDX_VERSION_2: u32 = 2;
