use std::fmt;

use crate::hex::hex_to_string;
use crate::{ObjectId, OID_RAW_LEN};

/// A mutable object id buffer.
///
/// Index iterators rewrite one of these in place for every entry they
/// yield, so a full traversal allocates nothing. Callers that need a
/// stable value take a copy with [`freeze`](MutableObjectId::freeze).
#[derive(Clone, Copy, Default)]
pub struct MutableObjectId([u8; OID_RAW_LEN]);

impl MutableObjectId {
    pub fn new() -> Self {
        Self([0u8; OID_RAW_LEN])
    }

    /// Overwrite this id with the first 20 bytes of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than 20 bytes.
    pub fn set_bytes(&mut self, bytes: &[u8]) {
        self.0.copy_from_slice(&bytes[..OID_RAW_LEN]);
    }

    /// Overwrite this id with the value of `oid`.
    pub fn set(&mut self, oid: &ObjectId) {
        self.0.copy_from_slice(oid.as_bytes());
    }

    /// Get the raw bytes of the current value.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Copy the current value into an immutable [`ObjectId`].
    pub fn freeze(&self) -> ObjectId {
        ObjectId::from_bytes(&self.0).expect("20-byte buffer")
    }

    /// Get the first byte of the current value.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// Get the hex string representation (lowercase).
    pub fn to_hex(&self) -> String {
        hex_to_string(&self.0)
    }
}

impl PartialEq for MutableObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MutableObjectId {}

impl PartialEq<ObjectId> for MutableObjectId {
    fn eq(&self, other: &ObjectId) -> bool {
        self.0 == *other.as_bytes()
    }
}

impl PartialEq<MutableObjectId> for ObjectId {
    fn eq(&self, other: &MutableObjectId) -> bool {
        *self.as_bytes() == other.0
    }
}

impl fmt::Display for MutableObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for MutableObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MutableObjectId({})", &self.to_hex()[..8])
    }
}

impl From<ObjectId> for MutableObjectId {
    fn from(oid: ObjectId) -> Self {
        let mut m = Self::new();
        m.set(&oid);
        m
    }
}
