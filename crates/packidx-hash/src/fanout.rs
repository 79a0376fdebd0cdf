use std::ops::Range;

use crate::{HashError, ObjectId};

/// Fan-out table mapping first byte to cumulative count.
///
/// Used in pack index files for fast object lookup. Each of the 256
/// entries contains the cumulative number of objects whose first hash
/// byte is ≤ the entry index; entry 255 is the total object count.
#[derive(Debug)]
pub struct FanoutTable {
    table: [u32; 256],
}

impl FanoutTable {
    /// Build a fan-out table from a sorted slice of OIDs.
    ///
    /// The OIDs **must** be sorted; this function does not verify order.
    pub fn build(oids: &[ObjectId]) -> Self {
        let mut table = [0u32; 256];
        for oid in oids {
            let bucket = oid.first_byte() as usize;
            table[bucket] += 1;
        }
        // Convert counts to cumulative counts.
        for i in 1..256 {
            table[i] += table[i - 1];
        }
        Self { table }
    }

    /// Take ownership of raw cumulative counts, validating that they
    /// never decrease.
    pub fn from_array(table: [u32; 256]) -> Result<Self, HashError> {
        for i in 1..256 {
            if table[i] < table[i - 1] {
                return Err(HashError::FanoutOrder { index: i });
            }
        }
        Ok(Self { table })
    }

    /// Read from binary format (pack index): 256 big-endian u32 values.
    pub fn from_bytes(data: &[u8]) -> Result<Self, HashError> {
        if data.len() < 1024 {
            return Err(HashError::InvalidHashLength {
                expected: 1024,
                actual: data.len(),
            });
        }
        let mut table = [0u32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let offset = i * 4;
            *entry = u32::from_be_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]);
        }
        Self::from_array(table)
    }

    /// Get the index range for OIDs whose first byte equals `first_byte`.
    pub fn range(&self, first_byte: u8) -> Range<usize> {
        self.span(first_byte, first_byte)
    }

    /// Get the index range covering every OID whose first byte lies in
    /// `first..=last`. The entries of adjacent buckets are contiguous,
    /// so the result is a single half-open range.
    pub fn span(&self, first: u8, last: u8) -> Range<usize> {
        debug_assert!(first <= last);
        let start = if first == 0 {
            0
        } else {
            self.table[(first - 1) as usize] as usize
        };
        let end = self.table[last as usize] as usize;
        start..end
    }

    /// Total number of objects tracked by this fan-out table.
    pub fn total(&self) -> u32 {
        self.table[255]
    }

    /// Get the raw table entry at the given index.
    pub fn get(&self, index: u8) -> u32 {
        self.table[index as usize]
    }

    /// Find the bucket containing the given global position.
    ///
    /// Returns the first byte `b` with `table[b-1] <= position < table[b]`.
    ///
    /// # Panics
    ///
    /// Panics if `position >= total()`.
    pub fn bucket_of(&self, position: u32) -> u8 {
        assert!(position < self.total(), "position beyond fan-out total");
        self.table.partition_point(|&count| count <= position) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_oid(first_byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[0] = first_byte;
        ObjectId::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn build_and_lookup() {
        let mut oids: Vec<ObjectId> = vec![
            make_oid(0x00),
            make_oid(0x00),
            make_oid(0x01),
            make_oid(0x05),
            make_oid(0xff),
        ];
        oids.sort();

        let ft = FanoutTable::build(&oids);
        assert_eq!(ft.total(), 5);
        assert_eq!(ft.range(0x00), 0..2);
        assert_eq!(ft.range(0x01), 2..3);
        assert_eq!(ft.range(0x02), 3..3); // empty
        assert_eq!(ft.range(0x05), 3..4);
        assert_eq!(ft.range(0xff), 4..5);
    }

    #[test]
    fn span_covers_bucket_group() {
        let mut oids: Vec<ObjectId> = vec![
            make_oid(0x4f),
            make_oid(0x50),
            make_oid(0x57),
            make_oid(0x5f),
            make_oid(0x60),
        ];
        oids.sort();

        let ft = FanoutTable::build(&oids);
        // Every OID whose first nibble is 5.
        assert_eq!(ft.span(0x50, 0x5f), 1..4);
        assert_eq!(ft.span(0x00, 0xff), 0..5);
    }

    #[test]
    fn bucket_of_position() {
        let mut oids: Vec<ObjectId> = vec![
            make_oid(0x00),
            make_oid(0x00),
            make_oid(0x05),
            make_oid(0xff),
        ];
        oids.sort();

        let ft = FanoutTable::build(&oids);
        assert_eq!(ft.bucket_of(0), 0x00);
        assert_eq!(ft.bucket_of(1), 0x00);
        assert_eq!(ft.bucket_of(2), 0x05);
        assert_eq!(ft.bucket_of(3), 0xff);
    }

    #[test]
    fn bytes_roundtrip() {
        let oids: Vec<ObjectId> = (0..=255u8).map(make_oid).collect();
        let ft = FanoutTable::build(&oids);

        let mut bytes = [0u8; 1024];
        for i in 0..256 {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&ft.get(i as u8).to_be_bytes());
        }

        let ft2 = FanoutTable::from_bytes(&bytes).unwrap();
        assert_eq!(ft.table, ft2.table);
    }

    #[test]
    fn empty_table() {
        let ft = FanoutTable::build(&[]);
        assert_eq!(ft.total(), 0);
        for b in 0..=255u8 {
            assert!(ft.range(b).is_empty());
        }
    }

    #[test]
    fn rejects_decreasing_counts() {
        let mut table = [7u32; 256];
        table[200] = 6;
        let err = FanoutTable::from_array(table).unwrap_err();
        assert!(matches!(err, HashError::FanoutOrder { index: 200 }));
    }

    #[test]
    fn from_bytes_too_short() {
        let err = FanoutTable::from_bytes(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, HashError::InvalidHashLength { .. }));
    }
}
