//! End-to-end behaviour of the public API: AEAD round trips and codec limits.

use std::sync::Arc;

use cellcrypt::{
    AeadAes256CbcHmacSha256, CryptoContext, DataEncryptionKey, Decimal, EncryptionType, Error,
    TypeSpec, Value,
};

fn root_key(seed: u8) -> Vec<u8> {
    (0..32u8).map(|i| i.wrapping_mul(7).wrapping_add(seed)).collect()
}

#[test]
fn deterministic_text_repeats_and_decrypts() {
    let key = Arc::new(DataEncryptionKey::new("cek", &root_key(1)).unwrap());
    let algorithm =
        AeadAes256CbcHmacSha256::new(Arc::clone(&key), EncryptionType::Deterministic).unwrap();

    let first = algorithm.encrypt(b"test").unwrap();
    let second = algorithm.encrypt(b"test").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1 + 32 + 16 + 16);
    assert_eq!(first[0], 0x01);
    assert_eq!(algorithm.decrypt(&first).unwrap(), b"test");

    let other = Arc::new(DataEncryptionKey::new("cek", &root_key(2)).unwrap());
    let wrong = AeadAes256CbcHmacSha256::new(other, EncryptionType::Deterministic).unwrap();
    let err = wrong.decrypt(&first).unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed { .. }), "{err}");
}

#[test]
fn deterministic_differs_for_different_plaintexts() {
    let key = Arc::new(DataEncryptionKey::new("cek", &root_key(3)).unwrap());
    let algorithm = AeadAes256CbcHmacSha256::new(key, EncryptionType::Deterministic).unwrap();
    assert_ne!(algorithm.encrypt(b"test").unwrap(), algorithm.encrypt(b"tesu").unwrap());
}

#[test]
fn decimal_10_2_round_trips_and_rejects_overflow() {
    let ctx = CryptoContext::default();
    let key = Arc::new(DataEncryptionKey::new("cek", &root_key(4)).unwrap());
    let settings = ctx
        .settings(
            key,
            EncryptionType::Randomized,
            &TypeSpec::new("decimal").with_precision(10, 2),
        )
        .unwrap();

    let value = Value::Decimal("123.45".parse::<Decimal>().unwrap());
    let ciphertext = ctx.encrypt(&value, &settings).unwrap();
    assert_eq!(ctx.decrypt(&ciphertext, &settings).unwrap(), value);

    let too_wide = Value::Decimal("12345678901.23".parse::<Decimal>().unwrap());
    let err = ctx.encrypt(&too_wide, &settings).unwrap_err();
    assert!(matches!(err, Error::InvalidPrecisionOrScale(_)), "{err}");
}

#[test]
fn undersized_and_unknown_version_fail_early() {
    let key = Arc::new(DataEncryptionKey::new("cek", &root_key(5)).unwrap());
    let algorithm = AeadAes256CbcHmacSha256::new(key, EncryptionType::Randomized).unwrap();

    let err = algorithm.decrypt(&[0x01; 64]).unwrap_err();
    assert!(matches!(err, Error::InvalidCiphertextLength { actual: 64, minimum: 65 }));

    let mut ciphertext = algorithm.encrypt(b"payload").unwrap();
    ciphertext[0] = 0x02;
    let err = algorithm.decrypt(&ciphertext).unwrap_err();
    assert!(matches!(err, Error::UnsupportedAlgorithmVersion(0x02)));
}

#[test]
fn every_type_survives_the_facade() {
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    let ctx = CryptoContext::default();
    let key = Arc::new(DataEncryptionKey::generate("cek").unwrap());
    let date = NaiveDate::from_ymd_opt(1582, 10, 15).unwrap();
    let datetime = date.and_hms_opt(12, 30, 0).unwrap();
    let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();

    let cases = [
        (TypeSpec::new("bit"), Value::Bool(true)),
        (TypeSpec::new("smallint"), Value::I16(-5)),
        (TypeSpec::new("real"), Value::F32(1.5)),
        (TypeSpec::new("money"), Value::Decimal(Decimal::new(-12_3400, 4).unwrap())),
        (TypeSpec::new("uniqueidentifier"), Value::Guid(uuid::Uuid::new_v4())),
        (TypeSpec::new("date"), Value::Date(date)),
        (TypeSpec::new("datetime2").with_scale(3), Value::DateTime(datetime)),
        (
            TypeSpec::new("datetimeoffset"),
            Value::DateTimeOffset(offset.from_local_datetime(&datetime).unwrap()),
        ),
        (TypeSpec::new("varchar").with_size(20), Value::String("café".into())),
        (TypeSpec::new("varbinary").with_size(4), Value::Bytes(vec![0, 1, 2, 3])),
    ];

    for (spec, value) in cases {
        let settings = ctx
            .settings(Arc::clone(&key), EncryptionType::Deterministic, &spec)
            .unwrap();
        let ciphertext = ctx.encrypt(&value, &settings).unwrap();
        assert_eq!(ctx.decrypt(&ciphertext, &settings).unwrap(), value, "{spec}");
    }
}
