//! Interledger packet types and wire codec.
//!
//! This crate defines the packet value objects exchanged between payment
//! switch participants and their compact binary representation. Packets are
//! immutable per-transaction values: built once, encoded, and never mutated.
//!
//! # Wire Format
//!
//! Big-endian, length-prefixed nested fields. Every variable-length field
//! carries an explicit length prefix and a protocol-defined upper bound, so
//! decoding is total: any input either yields exactly one packet consuming
//! the whole buffer, or a [`CodecError`].
//!
//! # Invariants
//!
//! - Round-trip: `decode(encode(p)) == p` for every encodable packet
//! - Bounds: encode rejects out-of-bounds fields instead of truncating
//! - No trailing bytes: decode rejects buffers longer than one packet

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod codec;
mod error;
mod packet;

pub use codec::{MAX_ADDRESS_LEN, MAX_DATA_LEN, MAX_MESSAGE_LEN};
pub use error::CodecError;
pub use packet::{
    Address, CONDITION_LEN, Currency, ErrorCode, FULFILMENT_LEN, FulfilPacket, Packet, PacketType,
    PreparePacket, RejectPacket,
};
