use focusnote_core::{
    CategoryId, CoreConfig, ManualClock, MemoryBlobStore, Note, NoteRepository, Notifier,
};
use std::cmp::Ordering;
use std::sync::Arc;

fn open_repo(clock: Arc<ManualClock>) -> NoteRepository {
    NoteRepository::load(
        Arc::new(MemoryBlobStore::new()),
        clock,
        Notifier::new(),
        &CoreConfig::default(),
    )
}

fn expected_listing(repo: &NoteRepository, category_id: CategoryId) -> Vec<Note> {
    let mut notes = repo
        .notes()
        .iter()
        .filter(|note| note.category_id == category_id)
        .cloned()
        .collect::<Vec<_>>();
    notes.sort_by(|a, b| match b.modified_at.cmp(&a.modified_at) {
        Ordering::Equal => b
            .created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id)),
        other => other,
    });
    notes
}

/// Small deterministic generator so the operation mix is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) % bound
    }
}

#[test]
fn listing_matches_fresh_filter_and_sort_across_random_mutations() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut repo = open_repo(clock.clone());
    let general = repo.categories()[0].id;
    let work = repo.create_category("Work", "briefcase").unwrap().id;
    let home = repo.create_category("Home", "").unwrap().id;
    let categories = [general, work, home];
    let mut rng = Lcg(42);

    for step in 0..400 {
        // Advance by 0..=2 ms so equal timestamps exercise the tie-breaks.
        clock.advance_ms(rng.next(3) as i64);
        let target = categories[rng.next(3) as usize];

        match rng.next(4) {
            0 => {
                repo.create(target).unwrap();
            }
            1 if !repo.notes().is_empty() => {
                let index = rng.next(repo.notes().len() as u64) as usize;
                let mut note = repo.notes()[index].clone();
                note.title = format!("edit {step}");
                if rng.next(2) == 0 {
                    note.category_id = target;
                }
                repo.update(note).unwrap();
            }
            2 if !repo.notes().is_empty() => {
                let index = rng.next(repo.notes().len() as u64) as usize;
                let id = repo.notes()[index].id;
                repo.delete(id).unwrap();
            }
            _ => {}
        }

        let listed = repo.list_by_category(target);
        assert_eq!(listed, expected_listing(&repo, target), "cache miss at step {step}");
        let cached = repo.list_by_category(target);
        assert_eq!(cached, expected_listing(&repo, target), "cache hit at step {step}");
    }

    assert!(repo.cache_stats().hits >= 400);
}

#[test]
fn work_notes_list_newest_first_and_move_to_general_on_delete() {
    let clock = Arc::new(ManualClock::new(0));
    let mut repo = open_repo(clock.clone());
    let general = repo.categories()[0].id;
    let work = repo.create_category("Work", "").unwrap().id;

    let mut created = Vec::new();
    for _ in 0..3 {
        clock.advance_ms(10);
        created.push(repo.create(work).unwrap().id);
    }
    let (t1, t2, t3) = (created[0], created[1], created[2]);

    let listed = repo
        .list_by_category(work)
        .into_iter()
        .map(|note| note.id)
        .collect::<Vec<_>>();
    assert_eq!(listed, vec![t3, t2, t1]);

    let fallback = repo.delete_category(work).unwrap();
    assert_eq!(fallback.id, general);
    assert_eq!(
        repo.categories()
            .iter()
            .map(|category| category.name.as_str())
            .collect::<Vec<_>>(),
        vec!["General"]
    );
    let moved = repo
        .list_by_category(general)
        .into_iter()
        .map(|note| note.id)
        .collect::<Vec<_>>();
    assert_eq!(moved, vec![t3, t2, t1]);
    assert!(repo.list_by_category(work).is_empty());
}

#[test]
fn mutations_drop_only_the_touched_cache_entries() {
    let clock = Arc::new(ManualClock::new(0));
    let mut repo = open_repo(clock.clone());
    let general = repo.categories()[0].id;
    let work = repo.create_category("Work", "").unwrap().id;

    let note = repo.create(general).unwrap();
    repo.list_by_category(general);
    repo.list_by_category(work);
    assert!(repo.is_cached(general) && repo.is_cached(work));

    clock.advance_ms(5);
    repo.create(work).unwrap();
    assert!(repo.is_cached(general));
    assert!(!repo.is_cached(work));

    repo.list_by_category(work);
    let mut moved = note.clone();
    moved.category_id = work;
    repo.update(moved).unwrap();
    assert!(!repo.is_cached(general));
    assert!(!repo.is_cached(work));
    assert_eq!(repo.list_by_category(work).len(), 2);
    assert!(repo.list_by_category(general).is_empty());
}

#[test]
fn unknown_ids_are_not_found() {
    let mut repo = open_repo(Arc::new(ManualClock::new(0)));
    let general = repo.categories()[0].id;
    let mut ghost = Note::new(general, 0);

    assert_eq!(repo.update(ghost.clone()).unwrap_err().code(), "not_found");
    assert_eq!(repo.delete(ghost.id).unwrap_err().code(), "not_found");

    let real = repo.create(general).unwrap();
    ghost.id = real.id;
    ghost.category_id = uuid::Uuid::new_v4();
    assert_eq!(repo.update(ghost).unwrap_err().code(), "not_found");
    assert_eq!(repo.get(real.id).unwrap().category_id, general);
}

#[test]
fn search_ignores_blank_queries_and_ranks_title_hits_first() {
    let clock = Arc::new(ManualClock::new(0));
    let mut repo = open_repo(clock.clone());
    let general = repo.categories()[0].id;

    let mut body_hit = repo.create(general).unwrap();
    body_hit.title = "Groceries".to_string();
    body_hit.body = "buy a focus timer".to_string();
    let body_hit = repo.update(body_hit).unwrap();

    let mut title_hit = repo.create(general).unwrap();
    title_hit.title = "Focus plan".to_string();
    let title_hit = repo.update(title_hit).unwrap();
    assert_eq!(body_hit.modified_at, title_hit.modified_at);

    assert!(repo.search("").is_empty());
    assert!(repo.search("   ").is_empty());
    let ids = repo
        .search("  FOCUS ")
        .into_iter()
        .map(|note| note.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![title_hit.id, body_hit.id]);
}
