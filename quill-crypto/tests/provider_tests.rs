use quill_crypto::{
    CryptoError, DenyAllProvider, KeyProvider, KeyPurpose, PassthroughWrapper, KeyWrapper,
    StaticKeyProvider,
};
use quill_types::ScopeId;

fn scope(s: &str) -> ScopeId {
    ScopeId::parse(s).unwrap()
}

#[test]
fn wrappers_for_same_scope_interoperate() {
    let provider = StaticKeyProvider::random();
    let w1 = provider.get_wrapper(&scope("p_1"), KeyPurpose::Audit).unwrap();
    let w2 = provider.get_wrapper(&scope("p_1"), KeyPurpose::Audit).unwrap();
    let sealed = w1.encrypt(b"record").unwrap();
    assert_eq!(w2.decrypt(&sealed).unwrap(), b"record");
}

#[test]
fn wrappers_for_different_scopes_do_not() {
    let provider = StaticKeyProvider::random();
    let w1 = provider.get_wrapper(&scope("p_1"), KeyPurpose::Audit).unwrap();
    let w2 = provider.get_wrapper(&scope("p_2"), KeyPurpose::Audit).unwrap();
    let sealed = w1.encrypt(b"record").unwrap();
    assert!(w2.decrypt(&sealed).is_err());
}

#[test]
fn different_roots_do_not_interoperate() {
    let w1 = StaticKeyProvider::random()
        .get_wrapper(&scope("p_1"), KeyPurpose::Audit)
        .unwrap();
    let w2 = StaticKeyProvider::random()
        .get_wrapper(&scope("p_1"), KeyPurpose::Audit)
        .unwrap();
    let sealed = w1.encrypt(b"record").unwrap();
    assert!(w2.decrypt(&sealed).is_err());
}

#[test]
fn deny_all_reports_key_unavailable() {
    let err = DenyAllProvider
        .get_wrapper(&scope("p_1"), KeyPurpose::Audit)
        .err()
        .unwrap();
    assert!(matches!(err, CryptoError::KeyUnavailable { .. }));
}

#[test]
fn passthrough_roundtrip() {
    let w = PassthroughWrapper;
    let sealed = w.encrypt(b"plain").unwrap();
    assert_eq!(w.decrypt(&sealed).unwrap(), b"plain");
}
