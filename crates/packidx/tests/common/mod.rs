//! Byte-exact synthetic index files for tests and benches.
#![allow(dead_code)]

use packidx_hash::hasher::Hasher;
use packidx_hash::ObjectId;

pub const TOC_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63];

/// An id that is all zeros except the first and last byte.
pub fn make_oid(first_byte: u8, suffix: u8) -> ObjectId {
    let mut bytes = [0u8; 20];
    bytes[0] = first_byte;
    bytes[19] = suffix;
    ObjectId::from_bytes(&bytes).unwrap()
}

/// The CRC32 each builder stores for an entry, derived from its id so
/// tests can recompute the expected value.
pub fn crc_of(oid: &ObjectId) -> u32 {
    crc32fast::hash(oid.as_bytes())
}

/// The pack checksum both builders write into the trailer.
pub fn fixture_pack_checksum() -> ObjectId {
    Hasher::digest(b"fixture pack")
}

fn fanout_of(entries: &[(ObjectId, u64)]) -> [u32; 256] {
    let mut fanout = [0u32; 256];
    for (oid, _) in entries {
        fanout[oid.first_byte() as usize] += 1;
    }
    for i in 1..256 {
        fanout[i] += fanout[i - 1];
    }
    fanout
}

fn finish_trailer(mut buf: Vec<u8>) -> Vec<u8> {
    buf.extend_from_slice(fixture_pack_checksum().as_bytes());
    let idx_checksum = Hasher::digest(&buf);
    buf.extend_from_slice(idx_checksum.as_bytes());
    buf
}

/// Build a v2 index. Offsets of 2^31 and above are routed through the
/// 64-bit table, exactly as a writer would emit them.
pub fn build_v2(entries: &[(ObjectId, u64)]) -> Vec<u8> {
    let mut entries: Vec<_> = entries.to_vec();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut buf = Vec::new();
    buf.extend_from_slice(&TOC_SIGNATURE);
    buf.extend_from_slice(&2u32.to_be_bytes());

    for count in fanout_of(&entries) {
        buf.extend_from_slice(&count.to_be_bytes());
    }

    for (oid, _) in &entries {
        buf.extend_from_slice(oid.as_bytes());
    }

    for (oid, _) in &entries {
        buf.extend_from_slice(&crc_of(oid).to_be_bytes());
    }

    let mut large = Vec::new();
    for (_, offset) in &entries {
        if *offset < 0x8000_0000 {
            buf.extend_from_slice(&(*offset as u32).to_be_bytes());
        } else {
            let slot = large.len() as u32;
            buf.extend_from_slice(&(0x8000_0000 | slot).to_be_bytes());
            large.push(*offset);
        }
    }
    for offset in large {
        buf.extend_from_slice(&offset.to_be_bytes());
    }

    finish_trailer(buf)
}

/// Build a v1 index from (id, offset) records. Offsets above 31 bits
/// are written verbatim so corruption handling can be exercised.
pub fn build_v1(entries: &[(ObjectId, u32)]) -> Vec<u8> {
    let mut entries: Vec<_> = entries.to_vec();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let widened: Vec<(ObjectId, u64)> =
        entries.iter().map(|(oid, off)| (*oid, *off as u64)).collect();

    let mut buf = Vec::new();
    for count in fanout_of(&widened) {
        buf.extend_from_slice(&count.to_be_bytes());
    }

    for (oid, offset) in &entries {
        buf.extend_from_slice(&offset.to_be_bytes());
        buf.extend_from_slice(oid.as_bytes());
    }

    finish_trailer(buf)
}
