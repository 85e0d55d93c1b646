use focusnote_core::{
    CategoryValidationError, CoreConfig, CoreError, ManualClock, MemoryBlobStore, NoteRepository,
    Notifier, RecoveryPolicy, StorageErrorKind,
};
use std::sync::Arc;

fn open_repo(store: Arc<MemoryBlobStore>) -> NoteRepository {
    NoteRepository::load(
        store,
        Arc::new(ManualClock::new(0)),
        Notifier::new(),
        &CoreConfig::default(),
    )
}

fn validation_error(err: CoreError) -> CategoryValidationError {
    match err {
        CoreError::InvalidCategory(inner) => inner,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn create_category_rejects_invalid_names() {
    let mut repo = open_repo(Arc::new(MemoryBlobStore::new()));
    let too_long = "x".repeat(51);
    let cases = [
        ("", CategoryValidationError::EmptyName),
        ("   ", CategoryValidationError::EmptyName),
        ("a", CategoryValidationError::TooShort),
        (" b ", CategoryValidationError::TooShort),
        (too_long.as_str(), CategoryValidationError::TooLong),
        ("work/home", CategoryValidationError::InvalidChars),
        ("what?", CategoryValidationError::InvalidChars),
        ("a|b", CategoryValidationError::InvalidChars),
        ("general", CategoryValidationError::DuplicateName),
        ("  GENERAL ", CategoryValidationError::DuplicateName),
    ];

    for (name, expected) in cases {
        let err = repo.create_category(name, "").unwrap_err();
        assert_eq!(validation_error(err), expected, "name {name:?}");
    }
    assert_eq!(repo.categories().len(), 1);
}

#[test]
fn names_are_trimmed_and_fifty_chars_is_allowed() {
    let mut repo = open_repo(Arc::new(MemoryBlobStore::new()));

    let work = repo.create_category("  Work ", "   ").unwrap();
    assert_eq!(work.name, "Work");
    assert_eq!(work.icon_ref, "folder");

    let err = repo.create_category("Work", "").unwrap_err();
    assert!(err.is_user_actionable());
    assert_eq!(validation_error(err), CategoryValidationError::DuplicateName);

    let long = "é".repeat(50);
    assert_eq!(repo.create_category(&long, "star").unwrap().name, long);
}

#[test]
fn rename_checks_duplicates_against_other_categories_only() {
    let mut repo = open_repo(Arc::new(MemoryBlobStore::new()));
    let work = repo.create_category("Work", "").unwrap();

    assert_eq!(repo.rename_category(work.id, "WORK").unwrap().name, "WORK");
    let err = repo.rename_category(work.id, "general").unwrap_err();
    assert_eq!(validation_error(err), CategoryValidationError::DuplicateName);
}

#[test]
fn deleting_the_last_category_fails_and_changes_nothing() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut repo = open_repo(store.clone());
    let general = repo.categories()[0].clone();
    let note = repo.create(general.id).unwrap();
    repo.flush().unwrap();
    let writes_before = store.write_count("categories");

    let err = repo.delete_category(general.id).unwrap_err();
    assert_eq!(err, CoreError::CannotDeleteLast);
    assert_eq!(err.recovery_policy(), RecoveryPolicy::UserIntervention);
    assert_eq!(repo.categories(), &[general.clone()]);
    assert_eq!(repo.get(note.id).unwrap().category_id, general.id);
    assert_eq!(store.write_count("categories"), writes_before);
}

#[test]
fn delete_prefers_general_and_leaves_no_orphans() {
    let mut repo = open_repo(Arc::new(MemoryBlobStore::new()));
    let general = repo.categories()[0].id;
    let inbox = repo.create_category("Inbox", "").unwrap().id;
    let work = repo.create_category("Work", "").unwrap().id;
    for _ in 0..4 {
        repo.create(work).unwrap();
    }
    repo.create(inbox).unwrap();

    assert_eq!(repo.delete_category(work).unwrap().id, general);
    assert_eq!(repo.note_count(general), 4);
    assert_eq!(repo.note_count(work), 0);
    let live = repo
        .categories()
        .iter()
        .map(|category| category.id)
        .collect::<Vec<_>>();
    assert!(repo
        .notes()
        .iter()
        .all(|note| live.contains(&note.category_id)));

    // Without a "General" category, any remaining category receives notes.
    assert_eq!(repo.delete_category(general).unwrap().id, inbox);
    assert_eq!(repo.note_count(inbox), 5);
}

#[test]
fn failed_delete_restores_only_the_moved_notes() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut repo = open_repo(store.clone());
    let general = repo.categories()[0].id;
    let work = repo.create_category("Work", "").unwrap().id;
    let already_general = repo.create(general).unwrap().id;
    let moved_a = repo.create(work).unwrap().id;
    let moved_b = repo.create(work).unwrap().id;
    let order_before = repo.categories().to_vec();

    // One initial attempt plus three retries.
    store.fail_next_writes(4, StorageErrorKind::PermissionDenied);
    let err = repo.delete_category(work).unwrap_err();

    assert_eq!(err.code(), "save_failed");
    assert_eq!(err.storage_kind(), Some(StorageErrorKind::PermissionDenied));
    assert_eq!(err.recovery_policy(), RecoveryPolicy::UserIntervention);
    assert_eq!(repo.categories(), order_before.as_slice());
    assert_eq!(repo.get(already_general).unwrap().category_id, general);
    assert_eq!(repo.get(moved_a).unwrap().category_id, work);
    assert_eq!(repo.get(moved_b).unwrap().category_id, work);
    assert_eq!(repo.list_by_category(work).len(), 2);
    assert_eq!(repo.list_by_category(general).len(), 1);
}

#[test]
fn failed_create_rolls_back_the_append() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut repo = open_repo(store.clone());

    store.fail_next_writes(4, StorageErrorKind::InsufficientStorage);
    let err = repo.create_category("Work", "").unwrap_err();
    assert!(matches!(err, CoreError::SaveFailed(_)));
    assert_eq!(repo.categories().len(), 1);
    assert!(repo.save_status().is_failed());

    // A later write succeeds and the name is free again.
    assert_eq!(repo.create_category("Work", "").unwrap().name, "Work");
    assert_eq!(repo.save_status().label(), "saved");
}

fn open_repo_at(store: Arc<MemoryBlobStore>, clock: Arc<ManualClock>) -> NoteRepository {
    NoteRepository::load(store, clock, Notifier::new(), &CoreConfig::default())
}

#[test]
fn failed_delete_is_not_visible_after_reload() {
    let store = Arc::new(MemoryBlobStore::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut repo = open_repo_at(store.clone(), clock.clone());
    let work = repo.create_category("Work", "").unwrap().id;
    let note = repo.create(work).unwrap().id;
    repo.flush().unwrap();

    // Categories land on disk, every notes attempt fails.
    store.fail_next_writes_to("notes", 4, StorageErrorKind::Io);
    assert!(repo.delete_category(work).is_err());
    assert!(repo.deadline_ms().is_some());

    clock.advance_ms(500);
    assert_eq!(repo.poll(), Some(Ok(())));
    assert_eq!(repo.save_status().label(), "saved");

    let reloaded = open_repo_at(store, clock);
    let names = reloaded
        .categories()
        .iter()
        .map(|category| category.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["General", "Work"]);
    assert_eq!(reloaded.get(note).unwrap().category_id, work);
}

#[test]
fn failed_create_is_not_visible_after_reload() {
    let store = Arc::new(MemoryBlobStore::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut repo = open_repo_at(store.clone(), clock.clone());
    let general = repo.categories()[0].id;
    repo.flush().unwrap();

    // A pending note edit is cancelled by the immediate save and must be
    // queued again by the rollback.
    let draft = repo.create(general).unwrap().id;
    store.fail_next_writes_to("notes", 4, StorageErrorKind::Io);
    assert!(repo.create_category("Work", "").is_err());

    clock.advance_ms(500);
    assert_eq!(repo.poll(), Some(Ok(())));

    let reloaded = open_repo_at(store, clock);
    assert_eq!(reloaded.categories().len(), 1);
    assert!(reloaded.get(draft).is_some());
}
