//! End-to-end quote/transfer exchange between two participant clients.
//!
//! Drives a payee client and a payer client through the full settlement
//! flow, with the test harness playing the switch: it carries signed
//! messages between the two and owns the clocks.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use crossbar_client::{
    Client, ClientAction, ClientConfig, ClientEvent, QuoteResponseBody, QuoteTerms,
    TransferPrepareBody,
};
use crossbar_crypto::{
    Condition, KeyId, KeySet, Secret, SignedHeaders, SignedMessage, Signer, validate_fulfilment,
    verify_message,
};
use crossbar_proto::{Address, Currency, Packet};
use rand::rngs::OsRng;

const NOW_MS: u64 = 1_700_000_000_000;
const TRANSACTION_ID: u128 = 0x00c0_ffee_0000_0000_0000_0000_0000_0001;

struct Participant {
    client: Client,
    signer: Signer,
}

/// Two participants that trust each other's verification keys.
fn participants() -> (Participant, Participant) {
    let (payer_signer, payer_key) = Signer::generate(KeyId::from("dfsp1-2024"), &mut OsRng);
    let (payee_signer, payee_key) = Signer::generate(KeyId::from("dfsp2-2024"), &mut OsRng);

    let payer_trust = KeySet::new().with_key(KeyId::from("dfsp2-2024"), payee_key);
    let payee_trust = KeySet::new().with_key(KeyId::from("dfsp1-2024"), payer_key);

    let payer = Participant {
        client: Client::new(
            ClientConfig { participant: "dfsp1".to_string(), quote_ttl_ms: 30_000 },
            Secret::new(b"payer-ledger-secret".to_vec()).expect("non-empty secret"),
            payer_signer.clone(),
            payer_trust,
        ),
        signer: payer_signer,
    };
    let payee = Participant {
        client: Client::new(
            ClientConfig { participant: "dfsp2".to_string(), quote_ttl_ms: 30_000 },
            Secret::new(b"payee-ledger-secret".to_vec()).expect("non-empty secret"),
            payee_signer.clone(),
            payee_trust,
        ),
        signer: payee_signer,
    };
    (payer, payee)
}

fn quote_terms() -> QuoteTerms {
    QuoteTerms {
        amount: 10_000,
        currency: Currency::new("USD").expect("valid currency"),
        payee: Address::new("g.dfsp2.alice").expect("valid address"),
        data: b"invoice 42".to_vec(),
    }
}

fn sent_message(actions: &[ClientAction]) -> SignedMessage {
    match actions {
        [ClientAction::Send(message)] => message.clone(),
        other => panic!("expected a single Send action, got {other:?}"),
    }
}

/// The payer-side orchestration: authenticate the quote response and pull
/// out the packet and condition a real transport layer would act on.
fn accept_quote(payer: &Participant, message: &SignedMessage) -> (QuoteResponseBody, u64) {
    let verified = verify_message(message, &payer.client.verification_keys())
        .expect("quote response must authenticate");
    let body: QuoteResponseBody =
        serde_json::from_value(verified.body).expect("quote response body");

    let packet_bytes = Base64Url.decode(&body.ilp_packet).expect("packet base64");
    let Packet::Prepare(prepare) = Packet::decode(&packet_bytes).expect("packet decodes") else {
        panic!("expected a prepare packet");
    };
    assert_eq!(
        prepare.execution_condition,
        *Condition::from_base64(&body.condition).expect("condition").as_bytes(),
    );
    (body, prepare.expires_at)
}

#[test]
fn full_transfer_settles_with_verified_fulfilment() {
    let (mut payer, mut payee) = participants();

    // Payee answers the quote with a packet committing to a condition.
    let actions = payee
        .client
        .handle(ClientEvent::QuoteRequested {
            transaction_id: TRANSACTION_ID,
            terms: quote_terms(),
            now_ms: NOW_MS,
        })
        .expect("quote succeeds");
    let quote_message = sent_message(&actions);

    // Payer authenticates the quote and holds the transfer.
    let (quote, expires_at) = accept_quote(&payer, &quote_message);
    let condition = Condition::from_base64(&quote.condition).expect("condition");
    payer
        .client
        .handle(ClientEvent::TransferInitiated {
            transaction_id: TRANSACTION_ID,
            condition,
            expires_at,
        })
        .expect("hold succeeds");

    // Payer forwards the quoted packet as a signed transfer prepare.
    let prepare_message = payer
        .signer
        .sign(
            SignedHeaders {
                source: "dfsp1".to_string(),
                destination: Some("dfsp2".to_string()),
                uri: format!("/transfers/{}", quote.transaction_id),
                method: "POST".to_string(),
            },
            serde_json::to_value(TransferPrepareBody {
                transaction_id: quote.transaction_id.clone(),
                ilp_packet: quote.ilp_packet.clone(),
                condition: quote.condition.clone(),
            })
            .expect("body serializes"),
        )
        .expect("prepare signs");

    // Payee validates the prepare and releases the fulfilment.
    let actions = payee
        .client
        .handle(ClientEvent::TransferPrepared {
            transaction_id: TRANSACTION_ID,
            message: prepare_message,
            now_ms: NOW_MS + 1_000,
        })
        .expect("prepare succeeds");
    let fulfil_message = sent_message(&actions);

    // Payer validates the proof and releases funds.
    let actions = payer
        .client
        .handle(ClientEvent::FulfilmentReceived {
            transaction_id: TRANSACTION_ID,
            message: fulfil_message,
            now_ms: NOW_MS + 2_000,
        })
        .expect("fulfilment succeeds");

    match &actions[..] {
        [ClientAction::ReleaseFunds { transaction_id, fulfilment }] => {
            assert_eq!(*transaction_id, TRANSACTION_ID);
            assert!(validate_fulfilment(fulfilment, &condition));
        },
        other => panic!("expected ReleaseFunds, got {other:?}"),
    }

    // Both sides discarded their transaction state.
    assert_eq!(payer.client.pending_count(), 0);
    assert_eq!(payee.client.pending_count(), 0);
}

#[test]
fn tampered_fulfilment_body_never_releases_funds() {
    let (mut payer, mut payee) = participants();

    let actions = payee
        .client
        .handle(ClientEvent::QuoteRequested {
            transaction_id: TRANSACTION_ID,
            terms: quote_terms(),
            now_ms: NOW_MS,
        })
        .expect("quote succeeds");
    let (quote, expires_at) = accept_quote(&payer, &sent_message(&actions));
    payer
        .client
        .handle(ClientEvent::TransferInitiated {
            transaction_id: TRANSACTION_ID,
            condition: Condition::from_base64(&quote.condition).expect("condition"),
            expires_at,
        })
        .expect("hold succeeds");

    let prepare_message = payer
        .signer
        .sign(
            SignedHeaders {
                source: "dfsp1".to_string(),
                destination: Some("dfsp2".to_string()),
                uri: format!("/transfers/{}", quote.transaction_id),
                method: "POST".to_string(),
            },
            serde_json::to_value(TransferPrepareBody {
                transaction_id: quote.transaction_id.clone(),
                ilp_packet: quote.ilp_packet.clone(),
                condition: quote.condition.clone(),
            })
            .expect("body serializes"),
        )
        .expect("prepare signs");
    let actions = payee
        .client
        .handle(ClientEvent::TransferPrepared {
            transaction_id: TRANSACTION_ID,
            message: prepare_message,
            now_ms: NOW_MS + 1_000,
        })
        .expect("prepare succeeds");
    let mut fulfil_message = sent_message(&actions);

    // A man in the middle swaps in a different preimage.
    fulfil_message.body["fulfilment"] =
        serde_json::json!(Base64Url.encode([0x42u8; 32]));

    let result = payer.client.handle(ClientEvent::FulfilmentReceived {
        transaction_id: TRANSACTION_ID,
        message: fulfil_message,
        now_ms: NOW_MS + 2_000,
    });

    // The signature no longer covers the body: authentication fails and
    // no ReleaseFunds action is ever produced.
    assert!(result.is_err());
    assert!(payer.client.is_pending(TRANSACTION_ID));
}

#[test]
fn fulfil_signed_by_unregistered_key_is_rejected() {
    let (mut payer, _) = participants();
    let fulfilment = crossbar_crypto::Fulfilment::from_bytes([5; 32]);

    payer
        .client
        .handle(ClientEvent::TransferInitiated {
            transaction_id: TRANSACTION_ID,
            condition: fulfilment.condition(),
            expires_at: NOW_MS + 30_000,
        })
        .expect("hold succeeds");

    // A correct proof signed under a key the payer never registered.
    let (rogue_signer, _) = Signer::generate(KeyId::from("rogue-1"), &mut OsRng);
    let message = rogue_signer
        .sign(
            SignedHeaders {
                source: "dfsp2".to_string(),
                destination: None,
                uri: "/transfers".to_string(),
                method: "PUT".to_string(),
            },
            serde_json::json!({
                "transactionId": format!("{TRANSACTION_ID:032x}"),
                "fulfilment": fulfilment.to_base64(),
            }),
        )
        .expect("signs");

    let result = payer.client.handle(ClientEvent::FulfilmentReceived {
        transaction_id: TRANSACTION_ID,
        message,
        now_ms: NOW_MS,
    });

    assert!(result.is_err());
    assert!(payer.client.is_pending(TRANSACTION_ID));
}
