//! Modern (v2) pack index with separated tables.
//!
//! After the 8-byte header the file carries four parallel tables, all
//! ordered by object id: the ids themselves, one CRC32 per object, one
//! 32-bit offset per object, and an overflow table of 64-bit offsets
//! for entries whose 32-bit slot has the high bit set.

use std::cmp::Ordering;
use std::io::Read;

use packidx_hash::fanout::FanoutTable;
use packidx_hash::{MutableObjectId, ObjectId};

use crate::reader::{be32, be64, read_array, read_blob, HashingReader};
use crate::DecodeError;

const OID_LEN: usize = 20;

/// Modern pack index with CRC32 values and 64-bit offset support.
#[derive(Debug)]
pub struct PackIndexV2 {
    fanout: FanoutTable,
    /// Per-first-byte blobs of 20-byte ids.
    ids: Vec<Box<[u8]>>,
    /// Per-first-byte blobs of 4-byte CRC32 values.
    crcs: Vec<Box<[u8]>>,
    /// Per-first-byte blobs of 4-byte offsets.
    offsets32: Vec<Box<[u8]>>,
    /// 8-byte slots for offsets that do not fit in 31 bits.
    offsets64: Box<[u8]>,
    pack_checksum: ObjectId,
}

impl PackIndexV2 {
    /// Decode the body of a v2 index (header already consumed).
    pub(crate) fn read<R: Read>(reader: &mut HashingReader<R>) -> Result<Self, DecodeError> {
        let fan_bytes = read_array::<1024, _>(reader, "fan-out table")?;
        let fanout = FanoutTable::from_bytes(&fan_bytes)?;

        // Each table arrives in 256 per-bucket chunks; an implausible
        // fan-out count hits end-of-file instead of one huge allocation.
        let ids = Self::read_buckets(reader, &fanout, OID_LEN, "object ids")?;
        let crcs = Self::read_buckets(reader, &fanout, 4, "crc32 table")?;
        let offsets32 = Self::read_buckets(reader, &fanout, 4, "offset table")?;

        // Count 64-bit slots referenced by high-bit entries.
        let mut slots = 0u64;
        let mut max_slot = None;
        for bucket in &offsets32 {
            for entry in bucket.chunks_exact(4) {
                let raw = u32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]]);
                if raw & 0x8000_0000 != 0 {
                    slots += 1;
                    let slot = (raw & 0x7fff_ffff) as u64;
                    max_slot = Some(max_slot.map_or(slot, |m: u64| m.max(slot)));
                }
            }
        }
        let offsets64 = read_blob(reader, slots * 8, "64-bit offset table")?;
        if let Some(max) = max_slot {
            if max >= slots {
                return Err(DecodeError::Corrupt(format!(
                    "offset references 64-bit slot {max} of {slots}"
                )));
            }
        }

        let pack_checksum = read_array::<20, _>(reader, "pack checksum")?;
        Ok(Self {
            fanout,
            ids,
            crcs,
            offsets32,
            offsets64,
            pack_checksum: ObjectId::from_bytes(&pack_checksum).expect("20-byte array"),
        })
    }

    fn read_buckets<R: Read>(
        reader: &mut HashingReader<R>,
        fanout: &FanoutTable,
        entry_len: usize,
        section: &'static str,
    ) -> Result<Vec<Box<[u8]>>, DecodeError> {
        let mut buckets = Vec::with_capacity(256);
        for b in 0..=255u8 {
            let count = fanout.range(b).len() as u64;
            buckets.push(read_blob(reader, count * entry_len as u64, section)?);
        }
        Ok(buckets)
    }

    /// Total number of objects in this index.
    pub fn object_count(&self) -> u64 {
        self.fanout.total() as u64
    }

    /// Number of 64-bit offset slots.
    pub fn offset64_count(&self) -> u64 {
        (self.offsets64.len() / 8) as u64
    }

    /// Checksum of the companion pack, from the index trailer.
    pub fn pack_checksum(&self) -> &ObjectId {
        &self.pack_checksum
    }

    /// Find the sorted position of `oid`.
    pub fn find_position(&self, oid: &ObjectId) -> Option<u64> {
        let (bucket, local) = self.find_local(oid)?;
        Some(self.fanout.range(bucket as u8).start as u64 + local as u64)
    }

    /// Look up the pack offset of `oid`.
    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        let (bucket, local) = self.find_local(oid)?;
        Some(self.decode_offset(bucket, local))
    }

    /// Look up the CRC32 of `oid`'s compressed representation.
    pub fn find_crc32(&self, oid: &ObjectId) -> Option<u32> {
        let (bucket, local) = self.find_local(oid)?;
        Some(be32(&self.crcs[bucket], local * 4))
    }

    /// Pack offset at the given sorted position.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range.
    pub fn offset_at(&self, position: u64) -> u64 {
        let (bucket, local) = self.bucket_local(position);
        self.decode_offset(bucket, local)
    }

    /// CRC32 at the given sorted position.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range.
    pub fn crc32_at(&self, position: u64) -> u32 {
        let (bucket, local) = self.bucket_local(position);
        be32(&self.crcs[bucket], local * 4)
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
        let (bucket, local) = self.bucket_local(position);
        &self.ids[bucket][local * OID_LEN..(local + 1) * OID_LEN]
    }

    /// Overwrite `id` with the entry at `position`, returning its offset.
    pub(crate) fn copy_entry(&self, position: u64, id: &mut MutableObjectId) -> u64 {
        let (bucket, local) = self.bucket_local(position);
        id.set_bytes(&self.ids[bucket][local * OID_LEN..]);
        self.decode_offset(bucket, local)
    }

    /// Map a global position to its bucket and local index.
    fn bucket_local(&self, position: u64) -> (usize, usize) {
        let bucket = self.fanout.bucket_of(position as u32);
        let start = self.fanout.range(bucket).start;
        (bucket as usize, position as usize - start)
    }

    /// Binary search for `oid` inside its first-byte bucket.
    fn find_local(&self, oid: &ObjectId) -> Option<(usize, usize)> {
        let bucket = oid.first_byte() as usize;
        let blob = &self.ids[bucket];
        let target = oid.as_bytes();

        let mut low = 0;
        let mut high = blob.len() / OID_LEN;
        while low < high {
            let mid = low + (high - low) / 2;
            let candidate = &blob[mid * OID_LEN..(mid + 1) * OID_LEN];
            match candidate.cmp(target) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Some((bucket, mid)),
            }
        }
        None
    }

    /// Decode the offset stored for (`bucket`, `local`), following the
    /// 64-bit indirection when the high bit is set.
    fn decode_offset(&self, bucket: usize, local: usize) -> u64 {
        let raw = be32(&self.offsets32[bucket], local * 4);
        if raw & 0x8000_0000 != 0 {
            let slot = (raw & 0x7fff_ffff) as usize;
            be64(&self.offsets64, slot * 8)
        } else {
            raw as u64
        }
    }
}
