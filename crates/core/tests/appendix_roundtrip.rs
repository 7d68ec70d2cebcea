//! End-to-end appendix tests: flag-driven binary dispatch, JSON attachment
//! dispatch, size and fee contracts, and the announcement state machine.

use hex_literal::hex;
use serde_json::json;
use spa_core::payloads::{
    Appendix, EncryptToSelfMessage, EncryptedMessage, PlainMessage, PrunableEncryptedMessage,
    PublicKeyAnnouncement, UnsealedEncryptedMessage, FLAG_ENCRYPTED_MESSAGE, FLAG_MESSAGE,
    FLAG_PRUNABLE_ENCRYPTED_MESSAGE, FLAG_PUBLIC_KEY_ANNOUNCEMENT,
};
use spa_core::Prunable;
use spa_core::{
    crypto, Account, AccountStore, ChainContext, ChainParams, EncryptedData, MemoryAccountStore,
    MemoryPrunableMessageStore, Sealable, SpaError, Transaction,
};
use spa_io::{BinaryWriter, MemoryReader};

struct Node {
    params: ChainParams,
    accounts: MemoryAccountStore,
    prunable_messages: MemoryPrunableMessageStore,
    height: i32,
    epoch_time: i32,
}

impl Node {
    fn new() -> Self {
        Self {
            params: ChainParams::default(),
            accounts: MemoryAccountStore::new(),
            prunable_messages: MemoryPrunableMessageStore::new(),
            height: 1000,
            epoch_time: 100_000,
        }
    }

    fn ctx(&self) -> ChainContext<'_> {
        ChainContext {
            params: &self.params,
            height: self.height,
            epoch_time: self.epoch_time,
            accounts: &self.accounts,
            prunable_messages: &self.prunable_messages,
        }
    }
}

fn write(appendix: &Appendix) -> Vec<u8> {
    let mut writer = BinaryWriter::new();
    appendix.write_to(&mut writer).unwrap();
    writer.into_bytes()
}

#[test]
fn test_plain_message_reference_bytes() {
    let appendix = Appendix::from(PlainMessage::from_text("hi"));
    assert_eq!(write(&appendix), hex!("01 02 00 00 80 68 69"));
}

#[test]
fn test_flag_dispatch_round_trip() {
    let recipient_key = crypto::public_key("recipient");
    let sealed =
        EncryptedData::encrypt(b"for your eyes", "sender", &recipient_key).unwrap();
    let prunable_data =
        EncryptedData::encrypt(b"prunable payload", "sender", &recipient_key).unwrap();

    let appendices = vec![
        Appendix::from(PlainMessage::from_text("hi")),
        Appendix::from(EncryptedMessage::new(sealed, true, false)),
        Appendix::from(PublicKeyAnnouncement::new(recipient_key)),
        Appendix::from(PrunableEncryptedMessage::new(prunable_data, true, false)),
    ];
    let flags = FLAG_MESSAGE
        | FLAG_ENCRYPTED_MESSAGE
        | FLAG_PUBLIC_KEY_ANNOUNCEMENT
        | FLAG_PRUNABLE_ENCRYPTED_MESSAGE;

    let mut writer = BinaryWriter::new();
    for appendix in &appendices {
        appendix.write_to(&mut writer).unwrap();
    }
    let bytes = writer.into_bytes();

    let mut reader = MemoryReader::new(&bytes);
    let parsed = Appendix::parse_all(&mut reader, flags, 1).unwrap();
    assert_eq!(parsed, appendices);
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn test_size_contract_every_kind() {
    let recipient_key = crypto::public_key("recipient");
    let sealed = EncryptedData::encrypt(b"for your eyes", "sender", &recipient_key).unwrap();
    let self_sealed =
        EncryptedData::encrypt(b"to self", "sender", &crypto::public_key("sender")).unwrap();
    let prunable_data =
        EncryptedData::encrypt(b"prunable payload", "sender", &recipient_key).unwrap();

    let appendices = vec![
        Appendix::from(PlainMessage::from_text("hello")),
        Appendix::from(PlainMessage::new(vec![])),
        Appendix::from(EncryptedMessage::new(sealed, true, false)),
        Appendix::from(EncryptToSelfMessage::new(self_sealed, true, false)),
        Appendix::from(PrunableEncryptedMessage::new(prunable_data, true, false)),
        Appendix::from(PublicKeyAnnouncement::new(recipient_key)),
    ];
    for appendix in &appendices {
        let mut writer = BinaryWriter::new();
        appendix.write_to(&mut writer).unwrap();
        assert_eq!(
            writer.position(),
            appendix.size(),
            "size mismatch for {}",
            appendix.name()
        );
    }
}

#[test]
fn test_json_attachment_dispatch() {
    let recipient_key = crypto::public_key("recipient");
    let sealed = EncryptedData::encrypt(b"for your eyes", "sender", &recipient_key).unwrap();

    let plain = Appendix::from(PlainMessage::from_text("hi"));
    let encrypted = Appendix::from(EncryptedMessage::new(sealed, true, false));
    let announcement = Appendix::from(PublicKeyAnnouncement::new(recipient_key));

    // One attachment object carrying all three appendices.
    let mut attachment = serde_json::Map::new();
    for appendix in [&plain, &encrypted, &announcement] {
        if let serde_json::Value::Object(fields) = appendix.to_json() {
            attachment.extend(fields);
        }
    }
    let attachment = serde_json::Value::Object(attachment);

    let parsed = Appendix::parse_attachment(&attachment).unwrap();
    assert_eq!(parsed, vec![plain, encrypted, announcement]);
}

#[test]
fn test_json_ignores_unknown_keys() {
    let appendix = PlainMessage::from_text("hi");
    let mut json = appendix.to_json();
    json.as_object_mut()
        .unwrap()
        .insert("somethingElse".to_string(), json!(42));
    let parsed = Appendix::parse_attachment(&json).unwrap();
    assert_eq!(parsed, vec![Appendix::from(appendix)]);
}

#[test]
fn test_version_zero_transaction_round_trip() {
    // Legacy transactions carry no per-appendix version byte.
    let bytes = hex!("02 00 00 80 68 69");
    let mut reader = MemoryReader::new(&bytes);
    let parsed = Appendix::parse_all(&mut reader, FLAG_MESSAGE, 0).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].version(), 0);
    assert_eq!(parsed[0].size(), 6);
    assert_eq!(write(&parsed[0]), bytes);
}

#[test]
fn test_version_mismatch_rejected() {
    // A version-2 plain message is never valid.
    let bytes = hex!("02 02 00 00 80 68 69");
    let mut reader = MemoryReader::new(&bytes);
    let err = Appendix::parse_all(&mut reader, FLAG_MESSAGE, 1).unwrap_err();
    match err {
        SpaError::NotValid(message) => assert!(message.contains("version")),
        other => panic!("expected NotValid, got {other:?}"),
    }
}

#[test]
fn test_truncated_appendix_rejected() {
    // Announcement flag present but only 10 key bytes on the wire.
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&[0u8; 10]);
    let mut reader = MemoryReader::new(&bytes);
    assert!(Appendix::parse_all(&mut reader, FLAG_PUBLIC_KEY_ANNOUNCEMENT, 1).is_err());
}

#[test]
fn test_fee_schedule_per_kind() {
    let node = Node::new();
    let ctx = node.ctx();
    let one_spa = node.params.one_spa;

    let plain = Appendix::from(PlainMessage::from_text("hi"));
    assert_eq!(plain.fee(&ctx), Some(one_spa));

    let empty = Appendix::from(PlainMessage::new(vec![]));
    assert_eq!(empty.fee(&ctx), Some(0));

    let long = Appendix::from(PlainMessage::new(vec![0u8; 33]));
    assert_eq!(long.fee(&ctx), Some(2 * one_spa));

    let recipient_key = crypto::public_key("recipient");
    // 14-byte plaintext, uncompressed: effective size is the plaintext size.
    let sealed = EncryptedData::encrypt(b"attack at dawn", "sender", &recipient_key).unwrap();
    let encrypted = Appendix::from(EncryptedMessage::new(sealed, true, false));
    assert_eq!(encrypted.fee(&ctx), Some(2 * one_spa));

    let prunable_data =
        EncryptedData::encrypt(b"prunable body", "sender", &recipient_key).unwrap();
    let prunable = Appendix::from(PrunableEncryptedMessage::new(prunable_data, true, false));
    // full size 30 bytes -> one 32-byte unit at a tenth of a SPA.
    assert_eq!(prunable.full_size(), 30);
    assert_eq!(prunable.fee(&ctx), Some(one_spa / 10));

    let announcement = Appendix::from(PublicKeyAnnouncement::new(recipient_key));
    assert_eq!(announcement.fee(&ctx), Some(0));
}

#[test]
fn test_draft_seal_then_wire_then_decrypt() {
    let node = Node::new();
    let recipient_key = crypto::public_key("recipient");
    let draft = UnsealedEncryptedMessage::new(
        b"the crow flies at midnight".to_vec(),
        true,
        true,
        recipient_key,
    )
    .unwrap();

    // The draft participates in fee sizing but refuses the wire.
    let as_appendix = Appendix::UnsealedEncryptedMessage(draft.clone());
    assert!(as_appendix.fee(&node.ctx()).is_some());
    let mut writer = BinaryWriter::new();
    assert!(matches!(
        as_appendix.write_to(&mut writer),
        Err(SpaError::NotYetEncrypted(_))
    ));

    let sealed = draft.seal("sender").unwrap();
    let bytes = write(&Appendix::from(sealed.clone()));
    let mut reader = MemoryReader::new(&bytes);
    let parsed = EncryptedMessage::from_reader(&mut reader, 1).unwrap();
    assert_eq!(parsed, sealed);

    let opened = parsed
        .encrypted_data()
        .decrypt("recipient", &crypto::public_key("sender"))
        .unwrap();
    let plaintext = spa_core::convert::uncompress(&opened, 1000).unwrap();
    assert_eq!(plaintext, b"the crow flies at midnight");
}

#[test]
fn test_announcement_lifecycle() {
    let node = Node::new();
    let recipient_key = crypto::public_key("recipient");
    let recipient_id = crypto::account_id_from_public_key(&recipient_key);
    let tx = Transaction::new(1, 1)
        .with_recipient(recipient_id)
        .with_timestamp(node.epoch_time - 10);

    let appendix = Appendix::from(PublicKeyAnnouncement::new(recipient_key));
    appendix.validate(&node.ctx(), &tx).unwrap();

    let mut sender = Account::new(5);
    let mut recipient = Account::new(recipient_id);
    appendix
        .apply(&node.ctx(), &tx, &mut sender, &mut recipient)
        .unwrap();
    assert_eq!(recipient.public_key(), Some(&recipient_key));

    // Now announced: re-validation still passes.
    appendix.validate(&node.ctx(), &tx).unwrap();

    // A racing announcement already bound a different key to another account;
    // the correctly bound announcement for it is transiently invalid.
    let third_key = crypto::public_key("third");
    let third_id = crypto::account_id_from_public_key(&third_key);
    node.accounts
        .set_or_verify(third_id, &crypto::public_key("racer"))
        .unwrap();
    let conflicting = Appendix::from(PublicKeyAnnouncement::new(third_key));
    let conflict_tx = Transaction::new(2, 1)
        .with_recipient(third_id)
        .with_timestamp(node.epoch_time - 10);
    assert!(matches!(
        conflicting.validate(&node.ctx(), &conflict_tx),
        Err(SpaError::NotCurrentlyValid(_))
    ));

    // Idempotent re-application.
    let before = recipient.clone();
    appendix
        .apply(&node.ctx(), &tx, &mut sender, &mut recipient)
        .unwrap();
    assert_eq!(recipient, before);
}

#[test]
fn test_prunable_store_flow_across_peers() {
    let node = Node::new();
    let recipient_key = crypto::public_key("recipient");
    let payload = EncryptedData::encrypt(b"archive me", "sender", &recipient_key).unwrap();
    let appendix = PrunableEncryptedMessage::new(payload, true, false);
    let appendix_hash = appendix.hash();
    let tx = Transaction::new(321, 1)
        .with_recipient(7)
        .with_timestamp(node.epoch_time - 50);

    // Block application retains the payload.
    let wrapped = Appendix::from(appendix);
    let mut sender = Account::new(5);
    let mut recipient = Account::new(7);
    wrapped
        .apply(&node.ctx(), &tx, &mut sender, &mut recipient)
        .unwrap();

    // A peer that only saw the block bytes rehydrates from the store.
    let bytes = write(&wrapped);
    let mut reader = MemoryReader::new(&bytes);
    let bare = PrunableEncryptedMessage::from_reader(&mut reader, 1).unwrap();
    assert!(!bare.has_prunable_data());

    bare.load_prunable(&node.ctx(), &tx, false);
    assert!(bare.has_prunable_data());
    assert_eq!(bare.hash(), appendix_hash);

    // The rehydrated JSON form carries both payload and hash.
    let json = bare.to_json();
    assert!(json.get("encryptedMessage").is_some());
    assert_eq!(
        json["encryptedMessageHash"],
        json!(hex::encode(appendix_hash))
    );
}

#[test]
fn test_validate_at_finish_is_noop() {
    let node = Node::new();
    // Would fail plain validate (no recipient), but finish-validation only
    // re-runs for phased transactions and nothing here is phased.
    let recipient_key = crypto::public_key("recipient");
    let sealed = EncryptedData::encrypt(b"x", "sender", &recipient_key).unwrap();
    let appendix = Appendix::from(EncryptedMessage::new(sealed, false, false));
    let tx = Transaction::new(1, 1);
    assert!(!appendix.is_phased(&tx));
    assert!(appendix.validate_at_finish(&node.ctx(), &tx).is_ok());
    assert!(appendix.validate(&node.ctx(), &tx).is_err());
}
