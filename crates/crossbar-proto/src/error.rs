//! Codec error types.

use thiserror::Error;

/// Errors from packet encoding and decoding.
///
/// Every variant is deterministic given its input: a rejected buffer is
/// rejected forever, so none of these are retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before a complete field could be read.
    #[error("truncated input: needed {needed} more bytes, {remaining} remaining")]
    Truncated {
        /// Bytes required by the next field.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Input contains bytes past the end of the packet.
    #[error("trailing bytes after packet: {count}")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        count: usize,
    },

    /// Leading type byte does not name a known packet type.
    #[error("unknown packet type: {value:#04x}")]
    UnknownPacketType {
        /// The unrecognized type byte.
        value: u8,
    },

    /// A variable-length field exceeds its protocol bound.
    #[error("field `{field}` too long: {len} bytes (max {max})")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Declared or actual length.
        len: usize,
        /// Protocol-defined maximum.
        max: usize,
    },

    /// Destination address is empty or contains invalid characters.
    #[error("invalid address: {reason}")]
    BadAddress {
        /// What the address violated.
        reason: &'static str,
    },

    /// Currency code is not three uppercase ASCII letters.
    #[error("invalid currency code")]
    BadCurrency,

    /// Reject error code is not three uppercase ASCII alphanumerics.
    #[error("invalid error code")]
    BadErrorCode,

    /// A text field is not valid UTF-8.
    #[error("field `{field}` is not valid UTF-8")]
    BadUtf8 {
        /// Name of the offending field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CodecError::Truncated { needed: 8, remaining: 3 };
        assert_eq!(err.to_string(), "truncated input: needed 8 more bytes, 3 remaining");
    }

    #[test]
    fn unknown_type_display_is_hex() {
        let err = CodecError::UnknownPacketType { value: 0xff };
        assert_eq!(err.to_string(), "unknown packet type: 0xff");
    }
}
