use quill_crypto::{open, seal, AeadKey, SealedBlob, KEY_SIZE};

#[test]
fn seal_open_roundtrip() {
    let key = AeadKey::random();
    let blob = seal(&key, b"aad", b"hello audit").unwrap();
    let plain = open(&key, b"aad", &blob).unwrap();
    assert_eq!(plain, b"hello audit");
}

#[test]
fn wrong_key_fails() {
    let blob = seal(&AeadKey::random(), b"aad", b"data").unwrap();
    assert!(open(&AeadKey::random(), b"aad", &blob).is_err());
}

#[test]
fn wrong_aad_fails() {
    let key = AeadKey::random();
    let blob = seal(&key, b"scope-a", b"data").unwrap();
    assert!(open(&key, b"scope-b", &blob).is_err());
}

#[test]
fn base64_roundtrip() {
    let key = AeadKey::random();
    let blob = seal(&key, b"aad", b"data").unwrap();
    let encoded = blob.to_base64();
    let decoded = SealedBlob::from_base64(&encoded).unwrap();
    assert_eq!(open(&key, b"aad", &decoded).unwrap(), b"data");
}

#[test]
fn truncated_base64_rejected() {
    assert!(SealedBlob::from_base64("AAAA").is_err());
    assert!(SealedBlob::from_base64("not base64 !!!").is_err());
}

#[test]
fn key_from_slice_validates_length() {
    assert!(AeadKey::from_slice(&[0u8; KEY_SIZE]).is_ok());
    assert!(AeadKey::from_slice(&[0u8; 16]).is_err());
}

#[test]
fn key_debug_redacts_material() {
    let key = AeadKey::from_bytes([7u8; KEY_SIZE]);
    let dbg = format!("{key:?}");
    assert!(dbg.contains("REDACTED"));
    assert!(!dbg.contains('7'));
}
