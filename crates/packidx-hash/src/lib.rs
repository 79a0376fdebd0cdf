//! Object identity primitives for the packidx pack index reader.
//!
//! This crate provides the core `ObjectId` type and its two companions
//! used by index lookups: the in-place-rewritable [`MutableObjectId`]
//! cursor and the [`AbbreviatedObjectId`] hex prefix. It also carries
//! hex encoding/decoding, the 256-entry fan-out table, streaming SHA-1
//! hashing, and the `OidArray` collector.

mod error;
pub mod hex;
mod oid;
mod mutable;
mod abbrev;
pub mod hasher;
pub mod collections;
pub mod fanout;

pub use abbrev::AbbreviatedObjectId;
pub use error::HashError;
pub use mutable::MutableObjectId;
pub use oid::ObjectId;

/// Length of a SHA-1 digest in bytes.
pub const OID_RAW_LEN: usize = 20;

/// Length of a SHA-1 digest in hex nibbles.
pub const OID_HEX_LEN: usize = 40;
