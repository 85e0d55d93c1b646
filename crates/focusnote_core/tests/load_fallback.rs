use focusnote_core::persist::collections::backup_key;
use focusnote_core::persist::{load_collection, LoadSource};
use focusnote_core::storage::{CATEGORIES_KEY, NOTES_KEY};
use focusnote_core::{
    Category, CoreConfig, CoreError, ManualClock, MemoryBlobStore, Note, NoteRepository, Notifier,
    RecoveryPolicy, StorageErrorKind,
};
use std::sync::Arc;

fn encode<T: serde::Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

fn load_repo(store: Arc<MemoryBlobStore>, now_ms: i64) -> NoteRepository {
    NoteRepository::load(
        store,
        Arc::new(ManualClock::new(now_ms)),
        Notifier::new(),
        &CoreConfig::default(),
    )
}

#[test]
fn corrupted_primary_falls_back_to_backup_and_is_preserved() {
    let store = Arc::new(MemoryBlobStore::new());
    let general = Category::new("General", "folder", 0);
    let note = Note::new(general.id, 0);
    store.insert_raw(CATEGORIES_KEY, encode(&vec![general.clone()]));
    store.insert_raw(NOTES_KEY, b"{ not json".to_vec());
    store.insert_raw(&backup_key(NOTES_KEY), encode(&vec![note.clone()]));

    let repo = load_repo(store.clone(), 1_234);

    assert_eq!(repo.notes(), &[note.clone()]);
    assert_eq!(store.get("notes.corrupt-1234").unwrap(), b"{ not json".to_vec());
    // The primary is replaced by what was recovered.
    let rewritten: Vec<Note> = serde_json::from_slice(&store.get(NOTES_KEY).unwrap()).unwrap();
    assert_eq!(rewritten, vec![note]);
}

#[test]
fn unreadable_primary_and_backup_degrade_to_empty() {
    let store = Arc::new(MemoryBlobStore::new());
    store.insert_raw(NOTES_KEY, b"[{]".to_vec());
    store.insert_raw(&backup_key(NOTES_KEY), b"also broken".to_vec());
    store.insert_raw(CATEGORIES_KEY, b"\xff\xfe".to_vec());

    let repo = load_repo(store, 0);

    assert!(repo.notes().is_empty());
    assert_eq!(repo.categories().len(), 1);
    assert_eq!(repo.categories()[0].name, "General");
}

#[test]
fn load_reports_source_and_errors() {
    let store = MemoryBlobStore::new();
    let clock = ManualClock::new(0);

    let missing = load_collection::<Note>(&store, &clock, NOTES_KEY);
    assert_eq!(missing.source, LoadSource::Empty);
    assert!(missing.errors.is_empty());

    store.insert_raw(NOTES_KEY, b"nope".to_vec());
    let corrupted = load_collection::<Note>(&store, &clock, NOTES_KEY);
    assert_eq!(corrupted.source, LoadSource::Empty);
    assert!(corrupted.preserved_corrupt_key.is_some());
    assert_eq!(corrupted.errors.len(), 1);
    assert_eq!(corrupted.errors[0].recovery_policy(), RecoveryPolicy::Fallback);
    assert!(matches!(corrupted.errors[0], CoreError::Corrupted(_)));

    let reread = load_collection::<Note>(&store, &clock, NOTES_KEY);
    assert_eq!(reread.source, LoadSource::Primary);
}

#[test]
fn backup_write_failure_does_not_fail_the_save() {
    let store = Arc::new(MemoryBlobStore::new());
    let mut repo = load_repo(store.clone(), 0);
    store.fail_next_writes_to(&backup_key(NOTES_KEY), 1, StorageErrorKind::InsufficientStorage);

    repo.flush().unwrap();

    assert!(store.get(NOTES_KEY).is_some());
    assert!(store.get(&backup_key(NOTES_KEY)).is_none());
    assert!(store.get(&backup_key(CATEGORIES_KEY)).is_some());
}
