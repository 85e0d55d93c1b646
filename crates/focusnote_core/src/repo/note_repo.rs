//! In-memory note/category repository with debounced durable writes.
//!
//! # Responsibility
//! - Provide note CRUD, per-category listing and search.
//! - Validate and persist category changes, rolling back on failure.
//! - Keep the `notes` and `categories` blobs in step with memory.
//!
//! # Invariants
//! - Every note's `category_id` names a live category.
//! - The category set is never empty after `load`.
//! - Cache entries are invalidated before any mutation returns.
//! - Note mutations are written through the debounced autosave; category
//!   mutations are written immediately.
//! - A rolled-back category mutation queues an autosave of the restored
//!   state.
//!
//! # See also
//! - `persist::save_state` for status transitions and retry.
//! - `persist::collections` for the primary/backup blob layout.

use super::cache::{CacheStats, CategoryCache};
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::events::Notifier;
use crate::model::category::{
    names_collide, normalize_icon, validate_category_name, Category, CategoryId,
    CategoryValidationError,
};
use crate::model::note::{recency_order, Note, NoteId};
use crate::persist::{load_collection, save_collection, SaveStateMachine, SaveStatus};
use crate::search::matcher::search_notes;
use crate::storage::{BlobStore, StorageResult, CATEGORIES_KEY, NOTES_KEY};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

pub struct NoteRepository {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    notes: Vec<Note>,
    categories: Vec<Category>,
    cache: CategoryCache,
    save_state: SaveStateMachine,
    fallback_category_name: String,
    default_icon: String,
}

impl NoteRepository {
    /// Decodes persisted notes and categories and repairs structural gaps.
    ///
    /// Never fails: unreadable blobs degrade to backup, then to empty. An
    /// empty category set is seeded with the fallback category, and notes
    /// pointing at unknown categories are moved there.
    pub fn load(
        store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        notifier: Notifier,
        config: &CoreConfig,
    ) -> Self {
        let loaded_notes = load_collection::<Note>(store.as_ref(), clock.as_ref(), NOTES_KEY);
        let loaded_categories =
            load_collection::<Category>(store.as_ref(), clock.as_ref(), CATEGORIES_KEY);

        let save_state = SaveStateMachine::new(
            clock.clone(),
            notifier,
            config.autosave_delay(),
            config.retry,
        );
        let mut repo = Self {
            store,
            clock,
            notes: loaded_notes.items,
            categories: loaded_categories.items,
            cache: CategoryCache::new(),
            save_state,
            fallback_category_name: config.default_category_name.clone(),
            default_icon: config.default_icon.clone(),
        };

        repo.seed_default_category();
        repo.repair_orphan_notes();

        info!(
            "event=repo_load module=repo status=ok notes={} categories={} notes_source={:?} categories_source={:?} load_errors={}",
            repo.notes.len(),
            repo.categories.len(),
            loaded_notes.source,
            loaded_categories.source,
            loaded_notes.errors.len() + loaded_categories.errors.len()
        );
        repo
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn note_count(&self, category_id: CategoryId) -> usize {
        self.notes
            .iter()
            .filter(|note| note.category_id == category_id)
            .count()
    }

    pub fn save_status(&self) -> &SaveStatus {
        self.save_state.status()
    }

    /// Deadline of the pending autosave, if any.
    pub fn deadline_ms(&self) -> Option<i64> {
        self.save_state.deadline_ms()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn is_cached(&self, category_id: CategoryId) -> bool {
        self.cache.contains(category_id)
    }

    /// Creates an empty "Untitled" note in `category_id`.
    pub fn create(&mut self, category_id: CategoryId) -> CoreResult<Note> {
        self.require_category(category_id)?;

        let note = Note::new(category_id, self.clock.now_ms());
        self.notes.push(note.clone());
        self.cache.invalidate(category_id);
        self.save_state.schedule_auto_save();

        info!(
            "event=note_create module=repo status=ok note_id={} category_id={}",
            note.id, category_id
        );
        Ok(note)
    }

    /// Replaces the stored note with `note`, stamping `modified_at = now`.
    ///
    /// `created_at` is kept from the stored copy.
    pub fn update(&mut self, note: Note) -> CoreResult<Note> {
        let index = self.note_index(note.id)?;
        self.require_category(note.category_id)?;

        let previous = &self.notes[index];
        let previous_category = previous.category_id;
        let mut updated = note;
        updated.created_at = previous.created_at;
        updated.modified_at = self.clock.now_ms();

        self.notes[index] = updated.clone();
        self.cache.invalidate(updated.category_id);
        if previous_category != updated.category_id {
            self.cache.invalidate(previous_category);
        }
        self.save_state.schedule_auto_save();

        debug!(
            "event=note_update module=repo status=ok note_id={} moved={}",
            updated.id,
            previous_category != updated.category_id
        );
        Ok(updated)
    }

    pub fn delete(&mut self, id: NoteId) -> CoreResult<Note> {
        let index = self.note_index(id)?;
        let removed = self.notes.remove(index);
        self.cache.invalidate(removed.category_id);
        self.save_state.schedule_auto_save();

        info!(
            "event=note_delete module=repo status=ok note_id={} category_id={}",
            removed.id, removed.category_id
        );
        Ok(removed)
    }

    /// Notes in `category_id`, most recently modified first.
    ///
    /// Unknown categories yield an empty list and are not cached.
    pub fn list_by_category(&mut self, category_id: CategoryId) -> Vec<Note> {
        if let Some(cached) = self.cache.get(category_id) {
            return cached.to_vec();
        }

        let mut listed = self
            .notes
            .iter()
            .filter(|note| note.category_id == category_id)
            .cloned()
            .collect::<Vec<_>>();
        listed.sort_by(recency_order);

        if self.category(category_id).is_some() {
            self.cache.insert(category_id, listed.clone());
        }
        listed
    }

    pub fn search(&self, query: &str) -> Vec<Note> {
        search_notes(&self.notes, query)
    }

    /// Validates, appends and immediately persists a new category.
    pub fn create_category(&mut self, name: &str, icon: &str) -> CoreResult<Category> {
        let name = validate_category_name(name)?;
        self.ensure_unique_name(&name, None)?;

        let icon = normalize_icon(icon, &self.default_icon);
        let category = Category::new(name, icon, self.clock.now_ms());
        self.categories.push(category.clone());

        if let Err(err) = self.persist_now() {
            self.categories.retain(|existing| existing.id != category.id);
            self.schedule_rollback_write();
            warn!(
                "event=category_create module=repo status=rolled_back category_id={} error_kind={}",
                category.id,
                err.kind.as_str()
            );
            return Err(CoreError::SaveFailed(err));
        }

        info!(
            "event=category_create module=repo status=ok category_id={}",
            category.id
        );
        Ok(category)
    }

    /// Renames a category under the same rules as `create_category`.
    pub fn rename_category(&mut self, id: CategoryId, name: &str) -> CoreResult<Category> {
        let index = self.category_index(id)?;
        let name = validate_category_name(name)?;
        self.ensure_unique_name(&name, Some(id))?;

        let previous_name = std::mem::replace(&mut self.categories[index].name, name);
        if let Err(err) = self.persist_now() {
            self.categories[index].name = previous_name;
            self.schedule_rollback_write();
            warn!(
                "event=category_rename module=repo status=rolled_back category_id={} error_kind={}",
                id,
                err.kind.as_str()
            );
            return Err(CoreError::SaveFailed(err));
        }

        info!("event=category_rename module=repo status=ok category_id={id}");
        Ok(self.categories[index].clone())
    }

    /// Deletes a category, moving its notes to the fallback category.
    ///
    /// Returns the fallback. On a failed write the category is restored at
    /// its original position and only the notes moved by this call get
    /// their category back.
    pub fn delete_category(&mut self, id: CategoryId) -> CoreResult<Category> {
        let index = self.category_index(id)?;
        if self.categories.len() <= 1 {
            return Err(CoreError::CannotDeleteLast);
        }
        let fallback = self.pick_fallback(id).ok_or(CoreError::NoFallback)?;

        let moved = self
            .notes
            .iter()
            .filter(|note| note.category_id == id)
            .map(|note| note.id)
            .collect::<HashSet<NoteId>>();
        for note in self.notes.iter_mut().filter(|note| moved.contains(&note.id)) {
            note.category_id = fallback.id;
        }
        let removed = self.categories.remove(index);
        self.cache.invalidate_all();

        if let Err(err) = self.persist_now() {
            self.categories.insert(index, removed);
            for note in self.notes.iter_mut().filter(|note| moved.contains(&note.id)) {
                note.category_id = id;
            }
            self.cache.invalidate_all();
            self.schedule_rollback_write();
            warn!(
                "event=category_delete module=repo status=rolled_back category_id={} restored_notes={} error_kind={}",
                id,
                moved.len(),
                err.kind.as_str()
            );
            return Err(CoreError::SaveFailed(err));
        }

        info!(
            "event=category_delete module=repo status=ok category_id={} fallback_id={} moved_notes={}",
            id,
            fallback.id,
            moved.len()
        );
        Ok(fallback)
    }

    /// Runs the autosave if its debounce window has elapsed.
    pub fn poll(&mut self) -> Option<CoreResult<()>> {
        let (store, categories, notes) = (self.store.as_ref(), &self.categories, &self.notes);
        self.save_state
            .poll(|| write_collections(store, categories, notes))
            .map(|result| result.map_err(CoreError::SaveFailed))
    }

    /// Writes the current state now, cancelling any pending autosave.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.persist_now().map_err(CoreError::SaveFailed)
    }

    /// Drops the pending autosave and forces `Saved`.
    pub fn reset_save_state(&mut self) {
        self.save_state.reset();
    }

    fn persist_now(&mut self) -> StorageResult<()> {
        let (store, categories, notes) = (self.store.as_ref(), &self.categories, &self.notes);
        self.save_state
            .perform_immediate_save(|| write_collections(store, categories, notes))
    }

    /// A failed write may have landed the categories blob but not the notes
    /// blob, and it cancelled any pending autosave. The restored state is
    /// queued so storage converges back to memory.
    fn schedule_rollback_write(&mut self) {
        self.save_state.schedule_auto_save();
    }

    fn note_index(&self, id: NoteId) -> CoreResult<usize> {
        self.notes
            .iter()
            .position(|note| note.id == id)
            .ok_or_else(|| CoreError::note_not_found(id))
    }

    fn category_index(&self, id: CategoryId) -> CoreResult<usize> {
        self.categories
            .iter()
            .position(|category| category.id == id)
            .ok_or_else(|| CoreError::category_not_found(id))
    }

    fn require_category(&self, id: CategoryId) -> CoreResult<()> {
        self.category_index(id).map(|_| ())
    }

    fn ensure_unique_name(&self, name: &str, ignore: Option<CategoryId>) -> CoreResult<()> {
        let taken = self
            .categories
            .iter()
            .filter(|category| Some(category.id) != ignore)
            .any(|category| names_collide(&category.name, name));
        if taken {
            return Err(CategoryValidationError::DuplicateName.into());
        }
        Ok(())
    }

    /// Another category named exactly like the configured fallback, else
    /// the first other category.
    fn pick_fallback(&self, excluded: CategoryId) -> Option<Category> {
        let others = || {
            self.categories
                .iter()
                .filter(move |category| category.id != excluded)
        };
        others()
            .find(|category| category.name == self.fallback_category_name)
            .or_else(|| others().next())
            .cloned()
    }

    fn seed_default_category(&mut self) {
        if !self.categories.is_empty() {
            return;
        }
        let category = Category::new(
            self.fallback_category_name.clone(),
            self.default_icon.clone(),
            self.clock.now_ms(),
        );
        info!(
            "event=category_seed module=repo status=ok category_id={}",
            category.id
        );
        self.categories.push(category);
        self.save_state.schedule_auto_save();
    }

    fn repair_orphan_notes(&mut self) {
        let live = self
            .categories
            .iter()
            .map(|category| category.id)
            .collect::<HashSet<CategoryId>>();
        if self.notes.iter().all(|note| live.contains(&note.category_id)) {
            return;
        }
        let Some(fallback) = self
            .categories
            .iter()
            .find(|category| category.name == self.fallback_category_name)
            .or_else(|| self.categories.first())
            .map(|category| category.id)
        else {
            return;
        };

        let mut repaired = 0usize;
        for note in self
            .notes
            .iter_mut()
            .filter(|note| !live.contains(&note.category_id))
        {
            note.category_id = fallback;
            repaired += 1;
        }
        warn!(
            "event=orphan_repair module=repo status=ok repaired={} fallback_id={}",
            repaired, fallback
        );
        self.save_state.schedule_auto_save();
    }
}

/// Writes both collections, categories first so a reader never sees notes
/// pointing at a category that was not yet written.
fn write_collections(
    store: &dyn BlobStore,
    categories: &[Category],
    notes: &[Note],
) -> StorageResult<()> {
    let categories_receipt = save_collection(store, CATEGORIES_KEY, categories)?;
    let notes_receipt = save_collection(store, NOTES_KEY, notes)?;
    debug!(
        "event=collections_write module=repo status=ok categories={} notes={} backups_complete={}",
        categories.len(),
        notes.len(),
        categories_receipt.is_complete() && notes_receipt.is_complete()
    );
    Ok(())
}

impl std::fmt::Debug for NoteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteRepository")
            .field("notes", &self.notes.len())
            .field("categories", &self.categories.len())
            .field("save_state", &self.save_state)
            .finish_non_exhaustive()
    }
}
