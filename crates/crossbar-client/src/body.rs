//! Signed message body payloads.
//!
//! These are the JSON bodies wrapped by the signature envelope. Transaction
//! ids cross the wire as 32-digit lowercase hex (JSON numbers cannot carry
//! a `u128` faithfully through every peer's parser); packets, conditions,
//! and fulfilments as unpadded base64url.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::event::TransactionId;

/// Formats a transaction id for a message body.
pub(crate) fn format_transaction_id(transaction_id: TransactionId) -> String {
    format!("{transaction_id:032x}")
}

/// Parses a transaction id from a message body.
pub(crate) fn parse_transaction_id(text: &str) -> Result<TransactionId, ClientError> {
    if text.len() != 32 {
        return Err(ClientError::MalformedBody {
            reason: format!("transaction id must be 32 hex digits, got {}", text.len()),
        });
    }
    TransactionId::from_str_radix(text, 16).map_err(|_| ClientError::MalformedBody {
        reason: "transaction id is not valid hex".to_string(),
    })
}

/// Quote response: the payee's packet and condition for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponseBody {
    /// Transaction id, 32 lowercase hex digits.
    pub transaction_id: String,
    /// Encoded prepare packet, base64url without padding.
    pub ilp_packet: String,
    /// Execution condition, base64url without padding.
    pub condition: String,
}

/// Transfer prepare: the payer forwards the quoted packet and condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPrepareBody {
    /// Transaction id, 32 lowercase hex digits.
    pub transaction_id: String,
    /// Encoded prepare packet, base64url without padding.
    pub ilp_packet: String,
    /// Execution condition, base64url without padding.
    pub condition: String,
}

/// Transfer fulfil: the payee releases the settlement proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFulfilBody {
    /// Transaction id, 32 lowercase hex digits.
    pub transaction_id: String,
    /// Fulfilment preimage, base64url without padding.
    pub fulfilment: String,
}

/// Parses a verified JSON body into a typed payload.
pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(
    body: &serde_json::Value,
) -> Result<T, ClientError> {
    serde_json::from_value(body.clone())
        .map_err(|e| ClientError::MalformedBody { reason: e.to_string() })
}

/// Serializes a typed payload into a JSON body for signing.
pub(crate) fn to_body<T: Serialize>(payload: &T) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(payload)
        .map_err(|e| ClientError::MalformedBody { reason: e.to_string() })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_roundtrip() {
        let id: TransactionId = 0x1234_5678_9abc_def0;
        let text = format_transaction_id(id);
        assert_eq!(text.len(), 32);
        assert_eq!(parse_transaction_id(&text).unwrap(), id);
    }

    #[test]
    fn transaction_id_rejects_short_and_garbage_input() {
        assert!(parse_transaction_id("1234").is_err());
        assert!(parse_transaction_id(&"g".repeat(32)).is_err());
    }

    #[test]
    fn quote_response_body_serde_uses_camel_case() {
        let body = QuoteResponseBody {
            transaction_id: format_transaction_id(9),
            ilp_packet: "AAAA".to_string(),
            condition: "BBBB".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("ilpPacket").is_some());
        assert!(json.get("transactionId").is_some());

        let parsed: QuoteResponseBody = parse_body(&json).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn parse_body_reports_missing_fields() {
        let result: Result<TransferFulfilBody, _> =
            parse_body(&serde_json::json!({"transactionId": "00"}));
        assert!(matches!(result, Err(ClientError::MalformedBody { .. })));
    }
}
