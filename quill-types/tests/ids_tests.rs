use quill_types::{IdGenerator, PublicId, ScopeId, UuidGenerator};
use std::collections::HashSet;
use std::str::FromStr;

// ── PublicId ──────────────────────────────────────────────────────

#[test]
fn public_id_parse_and_display_roundtrip() {
    let id = PublicId::parse("bnd_0123abcd").unwrap();
    assert_eq!(id.to_string(), "bnd_0123abcd");
    assert_eq!(id.as_str(), "bnd_0123abcd");
}

#[test]
fn public_id_prefix() {
    let id = PublicId::parse("bnd_0123abcd").unwrap();
    assert_eq!(id.prefix(), "bnd");
}

#[test]
fn public_id_rejects_missing_prefix() {
    assert!(PublicId::parse("").is_err());
    assert!(PublicId::parse("noseparator").is_err());
    assert!(PublicId::parse("_nosuffixprefix").is_err());
    assert!(PublicId::parse("noprefix_").is_err());
}

#[test]
fn public_id_from_str() {
    let parsed: PublicId = PublicId::from_str("tgt_42").unwrap();
    assert_eq!(parsed.prefix(), "tgt");
}

#[test]
fn public_id_ordering_is_lexicographic() {
    let a = PublicId::parse("bnd_aaa").unwrap();
    let b = PublicId::parse("bnd_bbb").unwrap();
    assert!(a < b);
}

#[test]
fn public_id_serde_is_transparent() {
    let id = PublicId::parse("bnd_xyz").unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"bnd_xyz\"");
    let back: PublicId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

// ── ScopeId ───────────────────────────────────────────────────────

#[test]
fn scope_id_accepts_opaque_strings() {
    let s = ScopeId::parse("p_123").unwrap();
    assert_eq!(s.as_str(), "p_123");
}

#[test]
fn scope_id_rejects_empty() {
    assert!(ScopeId::parse("").is_err());
}

// ── UuidGenerator ─────────────────────────────────────────────────

#[test]
fn generator_ids_carry_prefix_and_are_unique() {
    let g = UuidGenerator;
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let id = g.new_id("bnd").unwrap();
        assert_eq!(id.prefix(), "bnd");
        assert!(seen.insert(id));
    }
}

#[test]
fn generator_rejects_bad_prefix() {
    let g = UuidGenerator;
    assert!(g.new_id("").is_err());
    assert!(g.new_id("has_sep").is_err());
}
