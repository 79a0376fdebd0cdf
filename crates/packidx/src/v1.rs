//! Legacy (v1) pack index: fan-out followed by interleaved records.
//!
//! The format has no header; the file opens directly with the fan-out
//! table, then `N` 24-byte records of `u32` offset followed by the
//! 20-byte object id, sorted by id. Offsets are 31-bit, so v1 cannot
//! address large packs, and no CRC32 values are stored.

use std::cmp::Ordering;
use std::io::Read;

use packidx_hash::fanout::FanoutTable;
use packidx_hash::{MutableObjectId, ObjectId};

use crate::reader::{be32, read_array, read_blob, HashingReader};
use crate::DecodeError;

const RECORD_LEN: usize = 24;

/// Legacy pack index with interleaved (offset, id) records.
#[derive(Debug)]
pub struct PackIndexV1 {
    fanout: FanoutTable,
    /// One contiguous blob of 24-byte records.
    records: Box<[u8]>,
    pack_checksum: ObjectId,
}

impl PackIndexV1 {
    /// Decode the body of a v1 index.
    ///
    /// The caller has already consumed the first 8 bytes while probing
    /// for the v2 magic; they are the first two fan-out entries and
    /// arrive as `fan0` and `fan1`.
    pub(crate) fn read<R: Read>(
        reader: &mut HashingReader<R>,
        fan0: u32,
        fan1: u32,
    ) -> Result<Self, DecodeError> {
        let mut table = [0u32; 256];
        table[0] = fan0;
        table[1] = fan1;
        let rest = read_array::<1016, _>(reader, "fan-out table")?;
        for (i, slot) in table.iter_mut().enumerate().skip(2) {
            *slot = be32(&rest, (i - 2) * 4);
        }
        let fanout = FanoutTable::from_array(table)?;

        let count = fanout.total() as u64;
        if count > i32::MAX as u64 {
            return Err(DecodeError::TooManyObjects(count));
        }

        let records = read_blob(reader, count * RECORD_LEN as u64, "object records")?;

        // v1 offsets are 31-bit; a set high bit cannot be a real offset.
        for i in 0..count as usize {
            if be32(&records, i * RECORD_LEN) & 0x8000_0000 != 0 {
                return Err(DecodeError::Corrupt(format!(
                    "record {i} carries an offset with the high bit set"
                )));
            }
        }

        let pack_checksum = read_array::<20, _>(reader, "pack checksum")?;
        Ok(Self {
            fanout,
            records,
            pack_checksum: ObjectId::from_bytes(&pack_checksum).expect("20-byte array"),
        })
    }

    /// Total number of objects in this index.
    pub fn object_count(&self) -> u64 {
        self.fanout.total() as u64
    }

    /// Checksum of the companion pack, from the index trailer.
    pub fn pack_checksum(&self) -> &ObjectId {
        &self.pack_checksum
    }

    /// Find the sorted position of `oid`.
    pub fn find_position(&self, oid: &ObjectId) -> Option<u64> {
        let range = self.fanout.range(oid.first_byte());
        let target = oid.as_bytes();

        let mut low = range.start;
        let mut high = range.end;
        while low < high {
            let mid = low + (high - low) / 2;
            match self.oid_bytes_at(mid as u64).cmp(target) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Some(mid as u64),
            }
        }
        None
    }

    /// Look up the pack offset of `oid`.
    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        self.find_position(oid).map(|p| self.offset_at(p))
    }

    /// Pack offset at the given sorted position.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range.
    pub fn offset_at(&self, position: u64) -> u64 {
        be32(&self.records, position as usize * RECORD_LEN) as u64
    }

    /// Object id at the given sorted position.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range.
    pub fn object_id_at(&self, position: u64) -> ObjectId {
        ObjectId::from_bytes(self.oid_bytes_at(position)).expect("20-byte id slice")
    }

    pub(crate) fn fanout(&self) -> &FanoutTable {
        &self.fanout
    }

    /// Raw id bytes at the given sorted position.
    pub(crate) fn oid_bytes_at(&self, position: u64) -> &[u8] {
        let start = position as usize * RECORD_LEN + 4;
        &self.records[start..start + 20]
    }

    /// Overwrite `id` with the entry at `position`, returning its offset.
    pub(crate) fn copy_entry(&self, position: u64, id: &mut MutableObjectId) -> u64 {
        id.set_bytes(self.oid_bytes_at(position));
        self.offset_at(position)
    }
}
