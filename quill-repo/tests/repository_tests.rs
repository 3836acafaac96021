use pretty_assertions::assert_eq;
use quill_audit::AuditOp;
use quill_crypto::{DenyAllProvider, StaticKeyProvider};
use quill_db::Db;
use quill_repo::{
    parse_field_mask, provision_target, Binding, BindingField, ListOptions, Page, PageCursor,
    RepoError, Repository, RepositoryConfig,
};
use quill_types::{PublicId, ScopeId, Timestamp, UuidGenerator};
use std::sync::Arc;
use std::time::Duration;

fn repo() -> Repository {
    repo_on(Db::open_in_memory().unwrap())
}

fn repo_on(db: Db) -> Repository {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Repository::new(
        db,
        Arc::new(StaticKeyProvider::random()),
        Arc::new(UuidGenerator),
        RepositoryConfig::default(),
    )
    .unwrap()
}

fn scope(s: &str) -> ScopeId {
    ScopeId::parse(s).unwrap()
}

fn create(repo: &Repository, scope_id: &str, value: &str) -> Binding {
    repo.create_binding(&Binding::new(scope(scope_id), value))
        .unwrap()
}

// Timestamps are millisecond-grained; spacing writes out keeps
// update-time ordering deterministic where a test depends on it.
fn tick() {
    std::thread::sleep(Duration::from_millis(3));
}

// ── create ────────────────────────────────────────────────────────

#[test]
fn create_assigns_id_version_and_timestamps() {
    let repo = repo();
    let created = create(&repo, "p_1", "user@example.com");

    let id = created.public_id.clone().unwrap();
    assert_eq!(id.prefix(), "bnd");
    assert_eq!(created.version, 1);
    assert_eq!(created.create_time, created.update_time);
    assert!(created.create_time > Timestamp::epoch());

    let found = repo.lookup_binding(&id).unwrap().unwrap();
    assert_eq!(found, created);
}

#[test]
fn create_keeps_optional_fields() {
    let repo = repo();
    let mut b = Binding::new(scope("p_1"), "user@example.com");
    b.name = Some("primary".to_string());
    b.description = Some("main address".to_string());
    let created = repo.create_binding(&b).unwrap();
    assert_eq!(created.name.as_deref(), Some("primary"));
    assert_eq!(created.description.as_deref(), Some("main address"));
}

#[test]
fn create_rejects_preset_id_and_empty_value() {
    let repo = repo();

    let mut b = Binding::new(scope("p_1"), "v");
    b.public_id = Some(PublicId::parse("bnd_preset").unwrap());
    assert!(matches!(
        repo.create_binding(&b),
        Err(RepoError::InvalidParameter(_))
    ));

    let b = Binding::new(scope("p_1"), "");
    assert!(matches!(
        repo.create_binding(&b),
        Err(RepoError::InvalidParameter(_))
    ));
}

#[test]
fn duplicate_value_names_the_value_domain() {
    let repo = repo();
    create(&repo, "p_1", "user@example.com");

    // Globally unique, so a different scope collides too.
    let err = repo
        .create_binding(&Binding::new(scope("p_2"), "user@example.com"))
        .unwrap_err();
    match err {
        RepoError::AlreadyExists { message, .. } => {
            assert!(message.contains("user@example.com"), "{message}");
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    // The failed create rolled back with its audit row.
    assert!(repo.load_audit(&scope("p_2"), 10, 0).unwrap().is_empty());
}

#[test]
fn duplicate_name_is_scoped() {
    let repo = repo();
    let mut b = Binding::new(scope("p_1"), "v1");
    b.name = Some("primary".to_string());
    repo.create_binding(&b).unwrap();

    let mut dup = Binding::new(scope("p_1"), "v2");
    dup.name = Some("primary".to_string());
    match repo.create_binding(&dup).unwrap_err() {
        RepoError::AlreadyExists { message, .. } => {
            assert!(message.contains("primary"), "{message}");
            assert!(message.contains("p_1"), "{message}");
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    // Same name in another scope is fine.
    let mut elsewhere = Binding::new(scope("p_2"), "v3");
    elsewhere.name = Some("primary".to_string());
    repo.create_binding(&elsewhere).unwrap();
}

#[test]
fn dangling_target_reference_names_the_target() {
    let repo = repo();
    let target = PublicId::parse("tgt_1").unwrap();

    let mut b = Binding::new(scope("p_1"), "v1");
    b.target_id = Some(target.clone());
    match repo.create_binding(&b).unwrap_err() {
        RepoError::NotFound(msg) => assert!(msg.contains("tgt_1"), "{msg}"),
        other => panic!("expected NotFound, got {other:?}"),
    }

    provision_target(repo.db(), &target).unwrap();
    let created = repo.create_binding(&b).unwrap();
    assert_eq!(created.target_id, Some(target));
}

// ── update ────────────────────────────────────────────────────────

#[test]
fn update_bumps_version_by_one_and_writes_masked_fields() {
    let repo = repo();
    let created = create(&repo, "p_1", "old@example.com");
    tick();

    let mut b = created.clone();
    b.value = "new@example.com".to_string();
    b.name = Some("renamed".to_string());
    let (updated, rows) = repo
        .update_binding(&b, created.version, &[BindingField::Value, BindingField::Name])
        .unwrap();

    assert_eq!(rows, 1);
    assert_eq!(updated.version, 2);
    assert_eq!(updated.value, "new@example.com");
    assert_eq!(updated.name.as_deref(), Some("renamed"));
    assert_eq!(updated.create_time, created.create_time);
    assert!(updated.update_time > created.update_time);
}

#[test]
fn unmasked_fields_are_left_alone() {
    let repo = repo();
    let mut b = Binding::new(scope("p_1"), "v1");
    b.name = Some("keep-me".to_string());
    let created = repo.create_binding(&b).unwrap();

    let mut change = created.clone();
    change.value = "v2".to_string();
    change.name = Some("ignored".to_string());
    let (updated, _) = repo
        .update_binding(&change, created.version, &[BindingField::Value])
        .unwrap();
    assert_eq!(updated.value, "v2");
    assert_eq!(updated.name.as_deref(), Some("keep-me"));
}

#[test]
fn masked_empty_field_nulls_the_column() {
    let repo = repo();
    let mut b = Binding::new(scope("p_1"), "v1");
    b.description = Some("about to go".to_string());
    let created = repo.create_binding(&b).unwrap();

    let mut change = created.clone();
    change.description = None;
    let (updated, _) = repo
        .update_binding(&change, created.version, &[BindingField::Description])
        .unwrap();
    assert_eq!(updated.description, None);
}

#[test]
fn stale_version_conflicts_and_mutates_nothing() {
    let repo = repo();
    let created = create(&repo, "p_1", "v1");
    let id = created.public_id.clone().unwrap();

    let mut change = created.clone();
    change.value = "v2".to_string();
    let err = repo
        .update_binding(&change, created.version + 1, &[BindingField::Value])
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict));

    let found = repo.lookup_binding(&id).unwrap().unwrap();
    assert_eq!(found, created);
}

#[test]
fn racing_updates_from_the_same_version_admit_one_winner() {
    let repo = Arc::new(repo());
    let created = repo
        .create_binding(&Binding::new(scope("p_1"), "v0"))
        .unwrap();
    let id = created.public_id.clone().unwrap();

    // Both writers observed version 1; the guard lets exactly one through.
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let repo = Arc::clone(&repo);
            let mut change = created.clone();
            change.value = format!("contender-{i}");
            std::thread::spawn(move || repo.update_binding(&change, 1, &[BindingField::Value]))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let (winner, rows) = winners[0];
    assert_eq!(*rows, 1);
    assert_eq!(winner.version, 2);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(RepoError::Conflict))));

    let found = repo.lookup_binding(&id).unwrap().unwrap();
    assert_eq!(found, *winner);
}

#[test]
fn update_of_missing_binding_is_not_found() {
    let repo = repo();
    let mut b = Binding::new(scope("p_1"), "v1");
    b.public_id = Some(PublicId::parse("bnd_missing").unwrap());
    assert!(matches!(
        repo.update_binding(&b, 1, &[BindingField::Value]),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn update_validations_fire_before_any_write() {
    let repo = repo();
    let created = create(&repo, "p_1", "v1");
    let id = created.public_id.clone().unwrap();

    // No public id.
    let detached = Binding::new(scope("p_1"), "v2");
    assert!(matches!(
        repo.update_binding(&detached, 1, &[BindingField::Value]),
        Err(RepoError::InvalidParameter(_))
    ));

    // Zero version.
    assert!(matches!(
        repo.update_binding(&created, 0, &[BindingField::Value]),
        Err(RepoError::InvalidParameter(_))
    ));

    // Empty mask.
    assert!(matches!(
        repo.update_binding(&created, 1, &[]),
        Err(RepoError::EmptyFieldMask)
    ));

    // Value cannot be masked to empty.
    let mut cleared = created.clone();
    cleared.value = String::new();
    assert!(matches!(
        repo.update_binding(&cleared, 1, &[BindingField::Value]),
        Err(RepoError::InvalidParameter(_))
    ));

    let found = repo.lookup_binding(&id).unwrap().unwrap();
    assert_eq!(found, created);
}

#[test]
fn field_mask_parsing_rejects_unknown_names() {
    assert_eq!(
        parse_field_mask(&["Value", "TARGET_ID"]).unwrap(),
        vec![BindingField::Value, BindingField::TargetId]
    );
    assert!(matches!(
        parse_field_mask(&["value", "nonsense"]),
        Err(RepoError::InvalidFieldMask(name)) if name == "nonsense"
    ));
}

// ── delete ────────────────────────────────────────────────────────

#[test]
fn delete_is_idempotent_and_leaves_a_tombstone() {
    let repo = repo();
    let created = create(&repo, "p_1", "v1");
    let id = created.public_id.clone().unwrap();

    assert_eq!(repo.delete_binding(&id).unwrap(), 1);
    assert_eq!(repo.lookup_binding(&id).unwrap(), None);
    assert_eq!(repo.delete_binding(&id).unwrap(), 0);

    let deleted = repo.list_deleted_ids(Timestamp::epoch()).unwrap();
    assert_eq!(deleted.ids, vec![id]);
}

#[test]
fn watermark_chaining_misses_nothing() {
    let repo = repo();
    let a = create(&repo, "p_1", "v-a");
    let b = create(&repo, "p_1", "v-b");
    let a_id = a.public_id.unwrap();
    let b_id = b.public_id.unwrap();

    repo.delete_binding(&a_id).unwrap();
    let first = repo.list_deleted_ids(Timestamp::epoch()).unwrap();
    assert_eq!(first.ids, vec![a_id]);

    tick();
    repo.delete_binding(&b_id).unwrap();
    let second = repo.list_deleted_ids(first.watermark).unwrap();
    assert_eq!(second.ids, vec![b_id]);
    assert!(second.watermark >= first.watermark);
}

// ── lookup and list ───────────────────────────────────────────────

#[test]
fn lookup_miss_is_none_not_an_error() {
    let repo = repo();
    let id = PublicId::parse("bnd_missing").unwrap();
    assert_eq!(repo.lookup_binding(&id).unwrap(), None);
}

#[test]
fn listing_pages_through_every_item_exactly_once() {
    let repo = repo();
    let mut expected = Vec::new();
    for i in 0..7 {
        expected.push(create(&repo, "p_1", &format!("v{i}")));
        tick();
    }
    // Another scope's rows never leak into the listing.
    create(&repo, "p_2", "other-scope");

    let mut seen = Vec::new();
    let mut opts = ListOptions {
        after: None,
        limit: Some(3),
    };
    loop {
        let Page { bindings, next } = repo.list_bindings(&scope("p_1"), &opts).unwrap();
        if bindings.is_empty() {
            break;
        }
        seen.extend(bindings);
        opts.after = next;
    }
    assert_eq!(seen, expected);
}

#[test]
fn updated_items_move_to_the_end_of_the_pagination() {
    let repo = repo();
    let first = create(&repo, "p_1", "v0");
    tick();
    for i in 1..4 {
        create(&repo, "p_1", &format!("v{i}"));
        tick();
    }

    let page = repo
        .list_bindings(
            &scope("p_1"),
            &ListOptions {
                after: None,
                limit: Some(2),
            },
        )
        .unwrap();
    assert_eq!(page.bindings[0].value, "v0");

    // Touch the already-listed row mid-pagination.
    let mut change = first.clone();
    change.description = Some("touched".to_string());
    repo.update_binding(&change, first.version, &[BindingField::Description])
        .unwrap();

    let rest = repo
        .list_bindings(
            &scope("p_1"),
            &ListOptions {
                after: page.next,
                limit: Some(10),
            },
        )
        .unwrap();
    let values: Vec<&str> = rest.bindings.iter().map(|b| b.value.as_str()).collect();
    assert_eq!(values, vec!["v2", "v3", "v0"]);
}

#[test]
fn items_created_mid_pagination_are_not_missed() {
    let repo = repo();
    for i in 0..3 {
        create(&repo, "p_1", &format!("v{i}"));
        tick();
    }

    let page = repo
        .list_bindings(
            &scope("p_1"),
            &ListOptions {
                after: None,
                limit: Some(2),
            },
        )
        .unwrap();

    create(&repo, "p_1", "v3");
    let rest = repo
        .list_bindings(
            &scope("p_1"),
            &ListOptions {
                after: page.next,
                limit: Some(10),
            },
        )
        .unwrap();
    let values: Vec<&str> = rest.bindings.iter().map(|b| b.value.as_str()).collect();
    assert_eq!(values, vec!["v2", "v3"]);
}

#[test]
fn cursor_ties_on_update_time_break_by_public_id() {
    let repo = repo();
    let a = create(&repo, "p_1", "v-a");
    let cursor = PageCursor {
        update_time: a.update_time,
        public_id: a.public_id.clone().unwrap(),
    };
    // Resuming exactly at the last item's key excludes that item.
    let page = repo
        .list_bindings(
            &scope("p_1"),
            &ListOptions {
                after: Some(cursor),
                limit: Some(10),
            },
        )
        .unwrap();
    assert!(page.bindings.is_empty());
    assert!(page.next.is_none());
}

#[test]
fn page_limit_is_never_zero() {
    let repo = repo();
    create(&repo, "p_1", "v1");
    let page = repo
        .list_bindings(
            &scope("p_1"),
            &ListOptions {
                after: None,
                limit: Some(0),
            },
        )
        .unwrap();
    assert_eq!(page.bindings.len(), 1);
}

// ── audit trail ───────────────────────────────────────────────────

#[test]
fn every_mutation_leaves_one_audit_record() {
    let repo = repo();
    let created = create(&repo, "p_1", "v1");
    let id = created.public_id.clone().unwrap();

    let mut change = created.clone();
    change.value = "v2".to_string();
    repo.update_binding(&change, created.version, &[BindingField::Value])
        .unwrap();
    repo.delete_binding(&id).unwrap();

    let records = repo.load_audit(&scope("p_1"), 10, 0).unwrap();
    let ops: Vec<AuditOp> = records.iter().map(|r| r.record.op).collect();
    assert_eq!(ops, vec![AuditOp::Delete, AuditOp::Update, AuditOp::Create]);
    for r in &records {
        assert_eq!(r.record.public_id, id);
        assert_eq!(r.record.resource_type, "binding");
    }

    // The delete snapshot captures the row as it was when it died.
    let value = records[0]
        .record
        .fields
        .iter()
        .find(|f| f.name == "value")
        .unwrap();
    assert_eq!(value.value, serde_json::json!("v2"));
}

#[test]
fn delete_audit_snapshot_reflects_the_row_at_delete_time() {
    let repo = Arc::new(repo());
    let created = repo
        .create_binding(&Binding::new(scope("p_1"), "v1"))
        .unwrap();
    let id = created.public_id.clone().unwrap();

    // Keep updating until the delete lands underneath us.
    let updater = {
        let repo = Arc::clone(&repo);
        let mut change = created.clone();
        std::thread::spawn(move || {
            let mut version = change.version;
            let mut ok_updates = 0u32;
            loop {
                change.value = format!("v{}", version + 1);
                match repo.update_binding(&change, version, &[BindingField::Value]) {
                    Ok((updated, _)) => {
                        version = updated.version;
                        ok_updates += 1;
                    }
                    Err(RepoError::NotFound(_)) => return ok_updates,
                    Err(e) => panic!("unexpected update error: {e:?}"),
                }
            }
        })
    };

    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(repo.delete_binding(&id).unwrap(), 1);
    let ok_updates = updater.join().unwrap();

    // The snapshot carries the version the row died at, which only holds
    // if it was read in the delete's own transaction.
    let records = repo.load_audit(&scope("p_1"), 1, 0).unwrap();
    assert_eq!(records[0].record.op, AuditOp::Delete);
    let version = records[0]
        .record
        .fields
        .iter()
        .find(|f| f.name == "version")
        .unwrap();
    assert_eq!(version.value, serde_json::json!(ok_updates + 1));
}

#[test]
fn audit_rows_are_encrypted_at_rest() {
    let repo = repo();
    create(&repo, "p_1", "user@example.com");

    let stored: String = repo
        .db()
        .with_conn::<_, RepoError>(|conn| {
            Ok(conn.query_row("SELECT record FROM audit_entry", [], |r| r.get(0))?)
        })
        .unwrap();
    assert!(!stored.contains("user@example.com"));
}

#[test]
fn unavailable_audit_key_aborts_the_mutation() {
    let db = Db::open_in_memory().unwrap();
    let repo = Repository::new(
        db.clone(),
        Arc::new(DenyAllProvider),
        Arc::new(UuidGenerator),
        RepositoryConfig::default(),
    )
    .unwrap();

    let err = repo
        .create_binding(&Binding::new(scope("p_1"), "v1"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Encrypt(_)));

    let rows: i64 = db
        .with_conn::<_, RepoError>(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM binding", [], |r| r.get(0))?)
        })
        .unwrap();
    assert_eq!(rows, 0);
}

// ── file-backed storage ───────────────────────────────────────────

#[test]
fn works_on_a_file_backed_database() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repo_on(Db::open(&dir.path().join("quill.db")).unwrap());

    let created = create(&repo, "p_1", "v1");
    let id = created.public_id.clone().unwrap();
    assert_eq!(repo.lookup_binding(&id).unwrap(), Some(created));
}

// ── count estimate ────────────────────────────────────────────────

#[test]
fn estimated_count_reflects_rows() {
    let repo = repo();
    assert_eq!(repo.estimated_count().unwrap(), 0);
    for i in 0..4 {
        create(&repo, "p_1", &format!("v{i}"));
    }
    assert_eq!(repo.estimated_count().unwrap(), 4);
}
