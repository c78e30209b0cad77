//! Binary wire codec.
//!
//! Hand-rolled big-endian encoding with explicit length prefixes. The codec
//! is total over arbitrary input: decode either consumes the whole buffer
//! and yields one packet, or fails with a [`CodecError`] naming the first
//! violation. Nothing here allocates proportionally to claimed (rather than
//! actual) lengths, so hostile length prefixes cannot balloon memory.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::packet::{
    Address, CONDITION_LEN, Currency, ErrorCode, FULFILMENT_LEN, FulfilPacket, Packet, PacketType,
    PreparePacket, RejectPacket,
};

/// Maximum destination address length in bytes.
pub const MAX_ADDRESS_LEN: usize = 1023;

/// Maximum opaque data length in bytes.
pub const MAX_DATA_LEN: usize = 32_767;

/// Maximum reject message length in bytes.
pub const MAX_MESSAGE_LEN: usize = 4095;

/// Encodes a packet to wire bytes.
pub(crate) fn encode(packet: &Packet) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(packet.packet_type() as u8);
    match packet {
        Packet::Prepare(prepare) => encode_prepare(&mut buf, prepare)?,
        Packet::Fulfil(fulfil) => encode_fulfil(&mut buf, fulfil)?,
        Packet::Reject(reject) => encode_reject(&mut buf, reject)?,
    }
    Ok(buf.freeze())
}

fn encode_prepare(buf: &mut BytesMut, prepare: &PreparePacket) -> Result<(), CodecError> {
    buf.put_u64(prepare.amount);
    buf.put_slice(&prepare.currency.as_bytes());
    buf.put_u64(prepare.expires_at);
    buf.put_slice(&prepare.execution_condition);
    put_address(buf, &prepare.destination);
    put_data(buf, &prepare.data)
}

fn encode_fulfil(buf: &mut BytesMut, fulfil: &FulfilPacket) -> Result<(), CodecError> {
    buf.put_slice(&fulfil.fulfilment);
    put_data(buf, &fulfil.data)
}

fn encode_reject(buf: &mut BytesMut, reject: &RejectPacket) -> Result<(), CodecError> {
    buf.put_slice(&reject.code.as_bytes());
    put_address(buf, &reject.triggered_by);
    let message = reject.message.as_bytes();
    if message.len() > MAX_MESSAGE_LEN {
        return Err(CodecError::FieldTooLong {
            field: "message",
            len: message.len(),
            max: MAX_MESSAGE_LEN,
        });
    }
    buf.put_u16(message.len() as u16);
    buf.put_slice(message);
    put_data(buf, &reject.data)
}

// Address length is bounded at construction, so this cannot fail.
fn put_address(buf: &mut BytesMut, address: &Address) {
    let bytes = address.as_str().as_bytes();
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
}

fn put_data(buf: &mut BytesMut, data: &[u8]) -> Result<(), CodecError> {
    if data.len() > MAX_DATA_LEN {
        return Err(CodecError::FieldTooLong { field: "data", len: data.len(), max: MAX_DATA_LEN });
    }
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
    Ok(())
}

/// Decodes exactly one packet from wire bytes.
pub(crate) fn decode(bytes: &[u8]) -> Result<Packet, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let type_byte = cursor.read_u8()?;
    let packet_type = PacketType::from_u8(type_byte)
        .ok_or(CodecError::UnknownPacketType { value: type_byte })?;

    let packet = match packet_type {
        PacketType::Prepare => Packet::Prepare(decode_prepare(&mut cursor)?),
        PacketType::Fulfil => Packet::Fulfil(decode_fulfil(&mut cursor)?),
        PacketType::Reject => Packet::Reject(decode_reject(&mut cursor)?),
    };

    let remaining = cursor.remaining();
    if remaining != 0 {
        return Err(CodecError::TrailingBytes { count: remaining });
    }
    Ok(packet)
}

fn decode_prepare(cursor: &mut Cursor<'_>) -> Result<PreparePacket, CodecError> {
    let amount = cursor.read_u64()?;
    let currency = Currency::from_wire(cursor.read_array::<3>()?)?;
    let expires_at = cursor.read_u64()?;
    let execution_condition = cursor.read_array::<CONDITION_LEN>()?;
    let destination = read_address(cursor)?;
    let data = read_data(cursor)?;
    Ok(PreparePacket { amount, currency, destination, expires_at, execution_condition, data })
}

fn decode_fulfil(cursor: &mut Cursor<'_>) -> Result<FulfilPacket, CodecError> {
    let fulfilment = cursor.read_array::<FULFILMENT_LEN>()?;
    let data = read_data(cursor)?;
    Ok(FulfilPacket { fulfilment, data })
}

fn decode_reject(cursor: &mut Cursor<'_>) -> Result<RejectPacket, CodecError> {
    let code = ErrorCode::from_wire(cursor.read_array::<3>()?)?;
    let triggered_by = read_address(cursor)?;

    let message_len = cursor.read_u16()? as usize;
    if message_len > MAX_MESSAGE_LEN {
        return Err(CodecError::FieldTooLong {
            field: "message",
            len: message_len,
            max: MAX_MESSAGE_LEN,
        });
    }
    let message_bytes = cursor.read_slice(message_len)?;
    let message = std::str::from_utf8(message_bytes)
        .map_err(|_| CodecError::BadUtf8 { field: "message" })?
        .to_string();

    let data = read_data(cursor)?;
    Ok(RejectPacket { code, triggered_by, message, data })
}

fn read_address(cursor: &mut Cursor<'_>) -> Result<Address, CodecError> {
    let len = cursor.read_u16()? as usize;
    if len > MAX_ADDRESS_LEN {
        return Err(CodecError::FieldTooLong { field: "address", len, max: MAX_ADDRESS_LEN });
    }
    let bytes = cursor.read_slice(len)?;
    let text =
        std::str::from_utf8(bytes).map_err(|_| CodecError::BadUtf8 { field: "address" })?;
    Address::new(text)
}

fn read_data(cursor: &mut Cursor<'_>) -> Result<Vec<u8>, CodecError> {
    let len = cursor.read_u32()? as usize;
    if len > MAX_DATA_LEN {
        return Err(CodecError::FieldTooLong { field: "data", len, max: MAX_DATA_LEN });
    }
    Ok(cursor.read_slice(len)?.to_vec())
}

/// Bounds-checked read cursor over the input buffer.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::Truncated { needed: len, remaining: self.remaining() });
        }
        let slice = &self.buf[self.pos .. self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let slice = self.read_slice(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.read_array::<2>()?))
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_array::<4>()?))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.read_array::<8>()?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    fn sample_prepare() -> PreparePacket {
        PreparePacket {
            amount: 100,
            currency: Currency::new("USD").unwrap(),
            destination: Address::new("g.payee").unwrap(),
            expires_at: 1_700_000_000_000,
            execution_condition: [0xAA; CONDITION_LEN],
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn prepare_roundtrip() {
        let packet = Packet::Prepare(sample_prepare());
        let bytes = packet.encode().unwrap();
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn fulfil_roundtrip() {
        let packet =
            Packet::Fulfil(FulfilPacket { fulfilment: [7; FULFILMENT_LEN], data: vec![] });
        let bytes = packet.encode().unwrap();
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn reject_roundtrip() {
        let packet = Packet::Reject(RejectPacket {
            code: ErrorCode::new("F00").unwrap(),
            triggered_by: Address::new("g.switch").unwrap(),
            message: "bad request".to_string(),
            data: vec![0xFF],
        });
        let bytes = packet.encode().unwrap();
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    // Pins the wire layout: changing the codec breaks interop, not just tests.
    #[test]
    fn prepare_wire_layout_is_stable() {
        let bytes = Packet::Prepare(sample_prepare()).encode().unwrap();
        let expected = hex!(
            "0c"               // type: prepare
            "0000000000000064" // amount: 100
            "555344"           // currency: USD
            "0000018bcfe56800" // expires_at: 1700000000000
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            "0007"             // address length
            "672e7061796565"   // g.payee
            "00000003"         // data length
            "010203"
        );
        assert_eq!(bytes.as_ref(), &expected[..]);
    }

    #[test]
    fn decode_empty_input_is_truncated() {
        assert!(matches!(Packet::decode(&[]), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn decode_unknown_type_fails() {
        assert!(matches!(
            Packet::decode(&[0x42]),
            Err(CodecError::UnknownPacketType { value: 0x42 })
        ));
    }

    #[test]
    fn decode_truncated_prepare_fails() {
        let bytes = Packet::Prepare(sample_prepare()).encode().unwrap();
        for cut in 1 .. bytes.len() {
            assert!(
                matches!(Packet::decode(&bytes[.. cut]), Err(CodecError::Truncated { .. })),
                "cut at {cut} should be truncated"
            );
        }
    }

    #[test]
    fn decode_trailing_bytes_fails() {
        let mut bytes = Packet::Prepare(sample_prepare()).encode().unwrap().to_vec();
        bytes.push(0);
        assert!(matches!(Packet::decode(&bytes), Err(CodecError::TrailingBytes { count: 1 })));
    }

    #[test]
    fn encode_oversized_data_fails() {
        let mut prepare = sample_prepare();
        prepare.data = vec![0; MAX_DATA_LEN + 1];
        assert!(matches!(
            Packet::Prepare(prepare).encode(),
            Err(CodecError::FieldTooLong { field: "data", .. })
        ));
    }

    #[test]
    fn encode_oversized_message_fails() {
        let packet = Packet::Reject(RejectPacket {
            code: ErrorCode::new("T00").unwrap(),
            triggered_by: Address::new("g.switch").unwrap(),
            message: "x".repeat(MAX_MESSAGE_LEN + 1),
            data: vec![],
        });
        assert!(matches!(
            packet.encode(),
            Err(CodecError::FieldTooLong { field: "message", .. })
        ));
    }

    #[test]
    fn decode_hostile_data_length_fails_without_allocating() {
        // Fulfil packet claiming 4 GiB of data after the preimage.
        let mut bytes = vec![0x0d];
        bytes.extend_from_slice(&[0; FULFILMENT_LEN]);
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            Packet::decode(&bytes),
            Err(CodecError::FieldTooLong { field: "data", .. })
        ));
    }

    #[test]
    fn decode_rejects_bad_currency_bytes() {
        let mut bytes = Packet::Prepare(sample_prepare()).encode().unwrap().to_vec();
        // Currency sits right after the type byte and amount.
        bytes[9] = b'u';
        assert!(matches!(Packet::decode(&bytes), Err(CodecError::BadCurrency)));
    }

    fn arb_address() -> impl Strategy<Value = Address> {
        proptest::string::string_regex("[a-zA-Z0-9._~-]{1,64}")
            .expect("valid regex")
            .prop_map(|s| Address::new(&s).expect("generated address is valid"))
    }

    fn arb_currency() -> impl Strategy<Value = Currency> {
        proptest::string::string_regex("[A-Z]{3}")
            .expect("valid regex")
            .prop_map(|s| Currency::new(&s).expect("generated currency is valid"))
    }

    fn arb_packet() -> impl Strategy<Value = Packet> {
        let prepare = (
            any::<u64>(),
            arb_currency(),
            arb_address(),
            any::<u64>(),
            any::<[u8; CONDITION_LEN]>(),
            proptest::collection::vec(any::<u8>(), 0 .. 256),
        )
            .prop_map(|(amount, currency, destination, expires_at, condition, data)| {
                Packet::Prepare(PreparePacket {
                    amount,
                    currency,
                    destination,
                    expires_at,
                    execution_condition: condition,
                    data,
                })
            });

        let fulfil = (any::<[u8; FULFILMENT_LEN]>(), proptest::collection::vec(any::<u8>(), 0 .. 256))
            .prop_map(|(fulfilment, data)| Packet::Fulfil(FulfilPacket { fulfilment, data }));

        let reject = (
            proptest::string::string_regex("[A-Z0-9]{3}").expect("valid regex"),
            arb_address(),
            proptest::string::string_regex("[ -~]{0,64}").expect("valid regex"),
            proptest::collection::vec(any::<u8>(), 0 .. 256),
        )
            .prop_map(|(code, triggered_by, message, data)| {
                Packet::Reject(RejectPacket {
                    code: ErrorCode::new(&code).expect("generated code is valid"),
                    triggered_by,
                    message,
                    data,
                })
            });

        prop_oneof![prepare, fulfil, reject]
    }

    proptest! {
        #[test]
        fn roundtrip_all_valid_packets(packet in arb_packet()) {
            let bytes = packet.encode().unwrap();
            prop_assert_eq!(Packet::decode(&bytes).unwrap(), packet);
        }

        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0 .. 512)) {
            let _ = Packet::decode(&bytes);
        }

        #[test]
        fn single_byte_mutation_never_roundtrips_silently(
            seed in any::<[u8; CONDITION_LEN]>(),
            index in 0usize .. 60,
            flip in 1u8 ..,
        ) {
            let packet = Packet::Prepare(PreparePacket {
                amount: 42,
                currency: Currency::new("XOF").unwrap(),
                destination: Address::new("g.dfsp1.bob").unwrap(),
                expires_at: 1_700_000_000_000,
                execution_condition: seed,
                data: vec![9, 9],
            });
            let mut bytes = packet.encode().unwrap().to_vec();
            let index = index % bytes.len();
            bytes[index] ^= flip;
            // Either decoding fails, or it yields a different packet; a
            // silent identical roundtrip would mean ignored bytes.
            match Packet::decode(&bytes) {
                Ok(decoded) => prop_assert_ne!(decoded, packet),
                Err(_) => {},
            }
        }
    }
}
