//! Envelope encryption through a key store: KEK → wrapped DEK → column data.

use std::sync::Arc;

use cellcrypt::{
    CachingKeyStoreProvider, CryptoConfig, CryptoContext, EncryptionType, Error,
    InMemoryKeyStoreProvider, KeyEncryptionKey, KeyStoreProvider, ProtectedDataEncryptionKey,
    TypeSpec, Value,
};

const MASTER_PATH: &str = "local/column-master-key";

fn key_store() -> Arc<dyn KeyStoreProvider> {
    let store = InMemoryKeyStoreProvider::new();
    store.add_key(MASTER_PATH, &[0x5C; 32]).unwrap();
    Arc::new(CachingKeyStoreProvider::from_config(store, &CryptoConfig::default()))
}

#[test]
fn wrapped_key_reloads_and_decrypts_data() {
    let provider = key_store();
    let kek = Arc::new(
        KeyEncryptionKey::new("cmk", MASTER_PATH, Arc::clone(&provider), true).unwrap(),
    );
    let protected = ProtectedDataEncryptionKey::generate("cek", Arc::clone(&kek)).unwrap();

    let ctx = CryptoContext::default();
    let spec = TypeSpec::new("nvarchar").with_size(64);
    let settings = ctx
        .settings(Arc::clone(protected.data_key()), EncryptionType::Randomized, &spec)
        .unwrap();
    let ciphertext = ctx
        .encrypt(&Value::String("4111-1111-1111-1111".into()), &settings)
        .unwrap();

    // Only the wrapped key and the signed KEK metadata are persisted.
    let stored_key = protected.encrypted_value().to_vec();
    let stored_signature = kek.signature().to_vec();

    let kek = KeyEncryptionKey::from_signed("cmk", MASTER_PATH, provider, true, stored_signature)
        .unwrap();
    let reloaded =
        ProtectedDataEncryptionKey::from_encrypted("cek", Arc::new(kek), stored_key).unwrap();
    assert_eq!(reloaded, protected);

    let settings = ctx
        .settings(Arc::clone(reloaded.data_key()), EncryptionType::Randomized, &spec)
        .unwrap();
    assert_eq!(
        ctx.decrypt(&ciphertext, &settings).unwrap(),
        Value::String("4111-1111-1111-1111".into())
    );
}

#[test]
fn tampered_metadata_is_rejected() {
    let provider = key_store();
    let kek = KeyEncryptionKey::new("cmk", MASTER_PATH, Arc::clone(&provider), false).unwrap();

    // Flipping the enclave flag invalidates the signature.
    let err = KeyEncryptionKey::from_signed(
        "cmk",
        MASTER_PATH,
        provider,
        true,
        kek.signature().to_vec(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::SignatureVerificationFailed { .. }), "{err}");
}

#[test]
fn unknown_master_key_surfaces_as_provider_error() {
    let provider = key_store();
    let err = KeyEncryptionKey::new("cmk", "local/missing", provider, false).unwrap_err();
    match err {
        Error::KeyStoreProvider { provider, operation, .. } => {
            assert_eq!(provider, "in_memory");
            assert_eq!(operation, "sign");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wrapped_key_under_wrong_master_fails() {
    let store = InMemoryKeyStoreProvider::new();
    store.add_key(MASTER_PATH, &[1; 32]).unwrap();
    store.add_key("local/other", &[2; 32]).unwrap();
    let provider: Arc<dyn KeyStoreProvider> = Arc::new(store);

    let kek = Arc::new(
        KeyEncryptionKey::new("cmk", MASTER_PATH, Arc::clone(&provider), false).unwrap(),
    );
    let protected = ProtectedDataEncryptionKey::generate("cek", kek).unwrap();

    let other = Arc::new(KeyEncryptionKey::new("cmk2", "local/other", provider, false).unwrap());
    let err = ProtectedDataEncryptionKey::from_encrypted(
        "cek",
        other,
        protected.encrypted_value().to_vec(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::KeyStoreProvider { operation: "unwrap_key", .. }));
}

#[test]
fn batch_over_protected_key_keeps_nulls() {
    let provider = key_store();
    let kek = Arc::new(KeyEncryptionKey::new("cmk", MASTER_PATH, provider, false).unwrap());
    let protected = ProtectedDataEncryptionKey::generate("cek", kek).unwrap();

    let ctx = CryptoContext::from_config(&CryptoConfig::default());
    let settings = ctx
        .settings(
            Arc::clone(protected.data_key()),
            EncryptionType::Deterministic,
            &TypeSpec::new("int"),
        )
        .unwrap();
    let column = vec![Some(Value::I32(10)), None, Some(Value::I32(20)), Some(Value::I32(10))];
    let encrypted = ctx.encrypt_batch(&column, &settings).unwrap();
    assert_eq!(encrypted[0], encrypted[3]);
    assert!(encrypted[1].is_none());
    assert_eq!(ctx.decrypt_batch(&encrypted, &settings).unwrap(), column);
}
