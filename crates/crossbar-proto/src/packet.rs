//! Packet value objects.
//!
//! A packet is created once per transaction and never mutated. The three
//! packet kinds mirror the prepare/fulfil/reject exchange: a prepare carries
//! the execution condition the transfer is held against, a fulfil releases
//! the matching preimage, and a reject carries a machine-readable error.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::codec;
use crate::error::CodecError;

/// Length of an execution condition in bytes (SHA-256 digest).
pub const CONDITION_LEN: usize = 32;

/// Length of a fulfilment preimage in bytes.
pub const FULFILMENT_LEN: usize = 32;

/// Wire discriminant for each packet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum PacketType {
    /// Transfer prepare: holds funds against an execution condition.
    Prepare = 12,
    /// Transfer fulfil: releases the condition preimage.
    Fulfil = 13,
    /// Transfer reject: refuses the transfer with an error code.
    Reject = 14,
}

impl PacketType {
    /// Parses a wire type byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            12 => Some(Self::Prepare),
            13 => Some(Self::Fulfil),
            14 => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Destination account address.
///
/// A dot-separated hierarchical identifier, e.g. `g.dfsp2.alice`.
/// Validated at construction: 1..=1023 bytes drawn from
/// `A`–`Z`, `a`–`z`, `0`–`9`, `.`, `_`, `~`, `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Validates and wraps an address string.
    pub fn new(address: &str) -> Result<Self, CodecError> {
        if address.is_empty() {
            return Err(CodecError::BadAddress { reason: "empty" });
        }
        if address.len() > codec::MAX_ADDRESS_LEN {
            return Err(CodecError::BadAddress { reason: "exceeds maximum length" });
        }
        let valid = address
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'~' | b'-'));
        if !valid {
            return Err(CodecError::BadAddress { reason: "invalid character" });
        }
        Ok(Self(address.to_string()))
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// ISO 4217 currency code: exactly three uppercase ASCII letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    /// Validates and wraps a currency code.
    pub fn new(code: &str) -> Result<Self, CodecError> {
        let bytes = code.as_bytes();
        let [a, b, c] = bytes else {
            return Err(CodecError::BadCurrency);
        };
        if ![a, b, c].into_iter().all(u8::is_ascii_uppercase) {
            return Err(CodecError::BadCurrency);
        }
        Ok(Self([*a, *b, *c]))
    }

    /// Wraps raw wire bytes.
    pub(crate) fn from_wire(bytes: [u8; 3]) -> Result<Self, CodecError> {
        if !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(CodecError::BadCurrency);
        }
        Ok(Self(bytes))
    }

    /// Returns the raw three-byte code.
    pub fn as_bytes(&self) -> [u8; 3] {
        self.0
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Invariant: bytes are ASCII uppercase, checked at construction.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl TryFrom<String> for Currency {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.as_str().to_string()
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reject code: three uppercase ASCII alphanumerics,
/// e.g. `F00` (bad request) or `T00` (internal error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ErrorCode([u8; 3]);

impl ErrorCode {
    /// Validates and wraps an error code.
    pub fn new(code: &str) -> Result<Self, CodecError> {
        let [a, b, c] = code.as_bytes() else {
            return Err(CodecError::BadErrorCode);
        };
        let valid = [a, b, c].into_iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return Err(CodecError::BadErrorCode);
        }
        Ok(Self([*a, *b, *c]))
    }

    /// Wraps raw wire bytes.
    pub(crate) fn from_wire(bytes: [u8; 3]) -> Result<Self, CodecError> {
        if !bytes.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return Err(CodecError::BadErrorCode);
        }
        Ok(Self(bytes))
    }

    /// Returns the raw three-byte code.
    pub fn as_bytes(&self) -> [u8; 3] {
        self.0
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transfer prepare packet.
///
/// Commits the amount and destination to an execution condition. The
/// receiving participant holds funds until a matching fulfilment arrives or
/// `expires_at` passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparePacket {
    /// Transfer amount in minor currency units.
    pub amount: u64,
    /// Transfer currency.
    pub currency: Currency,
    /// Destination account address.
    pub destination: Address,
    /// Expiration as unix milliseconds. After this instant the transfer
    /// must not be fulfilled.
    pub expires_at: u64,
    /// Hash commitment the transfer is held against.
    pub execution_condition: [u8; CONDITION_LEN],
    /// Opaque end-to-end data, not interpreted by the switch.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub data: Vec<u8>,
}

/// Transfer fulfil packet.
///
/// Releases the preimage of a previously communicated condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfilPacket {
    /// Preimage satisfying the prepare's execution condition.
    pub fulfilment: [u8; FULFILMENT_LEN],
    /// Opaque end-to-end data.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub data: Vec<u8>,
}

/// Transfer reject packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectPacket {
    /// Machine-readable rejection code.
    pub code: ErrorCode,
    /// Address of the participant that rejected the transfer.
    pub triggered_by: Address,
    /// Human-readable description, for operator logs only.
    pub message: String,
    /// Opaque end-to-end data.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub data: Vec<u8>,
}

/// A packet of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Packet {
    /// Transfer prepare.
    Prepare(PreparePacket),
    /// Transfer fulfil.
    Fulfil(FulfilPacket),
    /// Transfer reject.
    Reject(RejectPacket),
}

impl Packet {
    /// Returns the wire discriminant for this packet.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Prepare(_) => PacketType::Prepare,
            Self::Fulfil(_) => PacketType::Fulfil,
            Self::Reject(_) => PacketType::Reject,
        }
    }

    /// Encodes the packet to its wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when a variable-length field exceeds its
    /// protocol bound.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        codec::encode(self)
    }

    /// Decodes a packet from its wire representation.
    ///
    /// The buffer must contain exactly one packet.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] on truncated, oversized, malformed, or
    /// trailing input.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::decode(bytes)
    }
}

impl From<PreparePacket> for Packet {
    fn from(packet: PreparePacket) -> Self {
        Self::Prepare(packet)
    }
}

impl From<FulfilPacket> for Packet {
    fn from(packet: FulfilPacket) -> Self {
        Self::Fulfil(packet)
    }
}

impl From<RejectPacket> for Packet {
    fn from(packet: RejectPacket) -> Self {
        Self::Reject(packet)
    }
}
