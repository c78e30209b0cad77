//! Client state machine.
//!
//! The `Client` manages per-transaction condition/fulfilment state and
//! orchestrates the codec, fulfilment crypto, and signature layers. It is
//! a pure state machine: events in, actions out, no I/O.
//!
//! # Condition derivation
//!
//! The prepare packet embeds its own execution condition, so the
//! fulfilment is derived over the packet's *unsealed* bytes - the encoding
//! with the condition field zeroed - and the condition is then written
//! into the packet. Any holder of the participant secret can re-derive
//! the fulfilment from a received packet the same way, which is how an
//! inbound transfer prepare is answered without storing the preimage.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use crossbar_crypto::{
    Condition, Fulfilment, KeySet, RotatingKeys, Secret, SignedHeaders, SignedMessage, Signer,
    generate_fulfilment, validate_fulfilment, verify_message,
};
use crossbar_proto::{CONDITION_LEN, Packet, PreparePacket};
use tracing::warn;

use crate::body::{
    QuoteResponseBody, TransferFulfilBody, TransferPrepareBody, format_transaction_id,
    parse_body, parse_transaction_id, to_body,
};
use crate::error::ClientError;
use crate::event::{ClientAction, ClientEvent, QuoteTerms, TransactionId};

/// Static client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Local participant identifier, stamped as the signed `source` header.
    pub participant: String,
    /// How long a quoted transfer stays executable, in milliseconds.
    pub quote_ttl_ms: u64,
}

/// Per-transaction pending state.
///
/// Transaction-scoped: created at quote or transfer initiation, consumed
/// at fulfilment-validation time, then discarded. Nothing is reused across
/// transactions, so a condition can never be replayed.
#[derive(Debug, Clone)]
enum Pending {
    /// Payee side: a quote went out under this condition.
    QuoteSent {
        condition: Condition,
    },
    /// Payer side: a transfer is held against this condition.
    TransferHeld {
        condition: Condition,
        expires_at: u64,
    },
}

/// Client state machine.
///
/// Holds the local participant's secret and signer, the rotating
/// verification key set, and pending per-transaction state. Pure state
/// machine - returns actions, caller handles I/O.
pub struct Client {
    config: ClientConfig,
    secret: Secret,
    signer: Signer,
    keys: RotatingKeys,
    pending: HashMap<TransactionId, Pending>,
}

impl Client {
    /// Creates a client from its configuration and key material.
    pub fn new(
        config: ClientConfig,
        secret: Secret,
        signer: Signer,
        verification_keys: KeySet,
    ) -> Self {
        Self {
            config,
            secret,
            signer,
            keys: RotatingKeys::new(verification_keys),
            pending: HashMap::new(),
        }
    }

    /// Number of transactions with pending state.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a transaction has pending state.
    pub fn is_pending(&self, transaction_id: TransactionId) -> bool {
        self.pending.contains_key(&transaction_id)
    }

    /// The rotating verification key handle.
    ///
    /// Shared with any collaborator that verifies on this client's behalf;
    /// rotations through [`ClientEvent::KeysRotated`] are visible to every
    /// clone.
    pub fn verification_keys(&self) -> RotatingKeys {
        self.keys.clone()
    }

    /// Process an event and return resulting actions.
    ///
    /// Security-relevant rejections (signature failures, condition or
    /// fulfilment mismatches) are logged here as warnings before being
    /// returned; they are never downgraded to a silent success.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the event cannot be processed.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        let result = self.dispatch(event);
        match &result {
            Err(error) if error.is_security_event() => {
                warn!(%error, "inbound message failed authentication");
            },
            Ok(actions) => {
                for action in actions {
                    if let ClientAction::Reject { transaction_id, error } = action {
                        warn!(
                            transaction_id = %format_transaction_id(*transaction_id),
                            %error,
                            "transfer rejected"
                        );
                    }
                }
            },
            Err(_) => {},
        }
        result
    }

    fn dispatch(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::QuoteRequested { transaction_id, terms, now_ms } => {
                self.handle_quote_requested(transaction_id, terms, now_ms)
            },
            ClientEvent::TransferInitiated { transaction_id, condition, expires_at } => {
                self.handle_transfer_initiated(transaction_id, condition, expires_at)
            },
            ClientEvent::TransferPrepared { transaction_id, message, now_ms } => {
                self.handle_transfer_prepared(transaction_id, &message, now_ms)
            },
            ClientEvent::FulfilmentReceived { transaction_id, message, now_ms } => {
                self.handle_fulfilment_received(transaction_id, &message, now_ms)
            },
            ClientEvent::KeysRotated { keys } => {
                self.keys.rotate(keys);
                Ok(vec![])
            },
        }
    }

    /// Answer a quote as payee: build the packet, commit to a fresh
    /// condition, and sign the response.
    fn handle_quote_requested(
        &mut self,
        transaction_id: TransactionId,
        terms: QuoteTerms,
        now_ms: u64,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if self.pending.contains_key(&transaction_id) {
            return Err(ClientError::DuplicateTransaction { transaction_id });
        }

        let mut prepare = PreparePacket {
            amount: terms.amount,
            currency: terms.currency,
            destination: terms.payee,
            expires_at: now_ms.saturating_add(self.config.quote_ttl_ms),
            execution_condition: [0u8; CONDITION_LEN],
            data: terms.data,
        };

        let fulfilment = self.derive_fulfilment(&prepare)?;
        let condition = fulfilment.condition();
        prepare.execution_condition = *condition.as_bytes();
        let sealed = Packet::Prepare(prepare).encode()?;

        let body = to_body(&QuoteResponseBody {
            transaction_id: format_transaction_id(transaction_id),
            ilp_packet: Base64Url.encode(&sealed),
            condition: condition.to_base64(),
        })?;
        let headers = self.headers(format!("/quotes/{}", format_transaction_id(transaction_id)));
        let signed = self.signer.sign(headers, body)?;

        self.pending.insert(transaction_id, Pending::QuoteSent { condition });

        Ok(vec![ClientAction::Send(signed)])
    }

    /// Hold an outbound transfer as payer against the quoted condition.
    fn handle_transfer_initiated(
        &mut self,
        transaction_id: TransactionId,
        condition: Condition,
        expires_at: u64,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if self.pending.contains_key(&transaction_id) {
            return Err(ClientError::DuplicateTransaction { transaction_id });
        }
        self.pending.insert(transaction_id, Pending::TransferHeld { condition, expires_at });
        Ok(vec![])
    }

    /// Validate an inbound transfer prepare as payee and release the
    /// fulfilment if the packet commits to the quoted condition.
    fn handle_transfer_prepared(
        &mut self,
        transaction_id: TransactionId,
        message: &SignedMessage,
        now_ms: u64,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let quoted_condition = match self.pending.get(&transaction_id) {
            Some(Pending::QuoteSent { condition }) => *condition,
            _ => return Err(ClientError::UnknownTransaction { transaction_id }),
        };

        // Authentication gates everything else.
        let verified = verify_message(message, &self.keys)?;
        let body: TransferPrepareBody = parse_body(&verified.body)?;
        check_transaction_id(transaction_id, &body.transaction_id)?;

        let packet_bytes =
            Base64Url.decode(&body.ilp_packet).map_err(|_| ClientError::MalformedBody {
                reason: "ilpPacket is not valid base64url".to_string(),
            })?;
        let Packet::Prepare(prepare) = Packet::decode(&packet_bytes)? else {
            return Err(ClientError::UnexpectedPacket);
        };

        if prepare.expires_at <= now_ms {
            self.pending.remove(&transaction_id);
            let error = ClientError::TransferExpired {
                transaction_id,
                expires_at: prepare.expires_at,
                now_ms,
            };
            return Ok(vec![ClientAction::Reject { transaction_id, error }]);
        }

        // The packet must commit to the condition we quoted, and the
        // fulfilment re-derived from its unsealed bytes must hash to it.
        let embedded = Condition::from_bytes(prepare.execution_condition);
        let body_condition = Condition::from_base64(&body.condition)?;
        let fulfilment = self.derive_fulfilment(&prepare)?;
        let commits = validate_fulfilment(&fulfilment, &embedded)
            && embedded == quoted_condition
            && body_condition == quoted_condition;
        if !commits {
            self.pending.remove(&transaction_id);
            let error = ClientError::ConditionMismatch { transaction_id };
            return Ok(vec![ClientAction::Reject { transaction_id, error }]);
        }

        let body = to_body(&TransferFulfilBody {
            transaction_id: body.transaction_id,
            fulfilment: fulfilment.to_base64(),
        })?;
        let headers =
            self.headers(format!("/transfers/{}", format_transaction_id(transaction_id)));
        let signed = self.signer.sign(headers, body)?;

        self.pending.remove(&transaction_id);

        Ok(vec![ClientAction::Send(signed)])
    }

    /// Validate an inbound settlement proof as payer and release funds.
    fn handle_fulfilment_received(
        &mut self,
        transaction_id: TransactionId,
        message: &SignedMessage,
        now_ms: u64,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let (condition, expires_at) = match self.pending.get(&transaction_id) {
            Some(Pending::TransferHeld { condition, expires_at }) => (*condition, *expires_at),
            _ => return Err(ClientError::UnknownTransaction { transaction_id }),
        };

        let verified = verify_message(message, &self.keys)?;
        let body: TransferFulfilBody = parse_body(&verified.body)?;
        check_transaction_id(transaction_id, &body.transaction_id)?;
        let fulfilment = Fulfilment::from_base64(&body.fulfilment)?;

        if now_ms >= expires_at {
            self.pending.remove(&transaction_id);
            let error =
                ClientError::TransferExpired { transaction_id, expires_at, now_ms };
            return Ok(vec![ClientAction::Reject { transaction_id, error }]);
        }

        if !validate_fulfilment(&fulfilment, &condition) {
            self.pending.remove(&transaction_id);
            let error = ClientError::FulfilmentMismatch { transaction_id };
            return Ok(vec![ClientAction::Reject { transaction_id, error }]);
        }

        self.pending.remove(&transaction_id);

        Ok(vec![ClientAction::ReleaseFunds { transaction_id, fulfilment }])
    }

    /// Re-derives the fulfilment for a prepare packet from its unsealed
    /// bytes (condition field zeroed).
    fn derive_fulfilment(&self, prepare: &PreparePacket) -> Result<Fulfilment, ClientError> {
        let mut unsealed = prepare.clone();
        unsealed.execution_condition = [0u8; CONDITION_LEN];
        let bytes = Packet::Prepare(unsealed).encode()?;
        Ok(generate_fulfilment(&bytes, &self.secret)?)
    }

    fn headers(&self, uri: String) -> SignedHeaders {
        SignedHeaders {
            source: self.config.participant.clone(),
            destination: None,
            uri,
            method: "PUT".to_string(),
        }
    }
}

/// Requires the body's transaction id to match the event's.
fn check_transaction_id(
    transaction_id: TransactionId,
    body_text: &str,
) -> Result<(), ClientError> {
    if parse_transaction_id(body_text)? != transaction_id {
        return Err(ClientError::MalformedBody {
            reason: "body transaction id does not match event".to_string(),
        });
    }
    Ok(())
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("participant", &self.config.participant)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
