//! The recipe repository.
//!
//! [`RecipeStore`] ties together the row-level [`Storage`], the on-disk
//! [`MediaStore`] and an [`EventBus`]. It owns the in-memory cache of recipes
//! and the profile. The cache is loaded once and then updated in place from
//! each committed change, so nothing is re-read after a commit and a write
//! that landed is never reported as failed.
//!
//! Mutating methods take `&mut self`, so a single store instance can only
//! ever have one mutation in flight. Hosts that need to share it across
//! threads wrap it in a `Mutex`.
//!
//! # Image failures
//!
//! When an image cannot be saved, behavior follows [`ImagePolicy`]:
//! with [`ImagePolicy::Lenient`] the record write still happens and the
//! failure is returned in [`Written::image_warning`]; with
//! [`ImagePolicy::Strict`] the operation fails before any record is written.
//! A failed record write is always returned as an error and leaves the
//! previously committed state in place.
//!
//! # Validation
//!
//! Callers are expected to reject blank names and categories before saving.
//! The store repeats that check when [`StoreOptions::reject_blank_fields`] is
//! set and returns [`Error::Validation`].

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, ImagePolicy};
use crate::error::{Error, Result};
use crate::events::{EventBus, StoreEvent};
use crate::media::MediaStore;
use crate::model::{ImageRef, Profile, Recipe, RecipeDraft, RecipeId, PREDEFINED_CATEGORIES};
use crate::storage::Storage;

/// Behavior switches for a [`RecipeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How image write failures are handled.
    pub image_policy: ImagePolicy,
    /// Reject blank recipe names and categories.
    pub reject_blank_fields: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            image_policy: ImagePolicy::Lenient,
            reject_blank_fields: true,
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            image_policy: config.images.policy,
            reject_blank_fields: config.validation.reject_blank_fields,
        }
    }
}

/// The result of a committed write.
///
/// The record write succeeded; `image_warning` is set when the accompanying
/// image could not be stored or removed.
#[derive(Debug)]
pub struct Written<T> {
    /// The committed record.
    pub value: T,
    /// Image failure that did not prevent the record write.
    pub image_warning: Option<Error>,
}

impl<T> Written<T> {
    /// Check whether the write completed without an image problem.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.image_warning.is_none()
    }

    /// Discard any warning and return the record.
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Summary counts over the whole store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of recipes.
    pub total_recipes: usize,
    /// Number of favorite recipes.
    pub favorite_recipes: usize,
    /// Number of image files in the media directory.
    pub stored_images: usize,
    /// Bytes used by image files.
    pub media_bytes: u64,
    /// Creation time of the oldest recipe.
    pub oldest_recipe: Option<DateTime<Utc>>,
    /// Creation time of the newest recipe.
    pub newest_recipe: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Repository over recipes and the user profile.
#[derive(Debug)]
pub struct RecipeStore {
    storage: Storage,
    media: MediaStore,
    options: StoreOptions,
    events: EventBus,
    recipes: Vec<Recipe>,
    profile: Profile,
}

impl RecipeStore {
    /// Open the database and media directory named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either location cannot be opened or created.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        let media = MediaStore::open(config.media_dir(), config.images.max_bytes)?;
        Self::new(storage, media, StoreOptions::from(config))
    }

    /// Build a store from already-opened parts.
    ///
    /// Creates the default profile if the database has none and loads the
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial reads fail.
    pub fn new(storage: Storage, media: MediaStore, options: StoreOptions) -> Result<Self> {
        let profile = storage.ensure_profile()?;
        let recipes = storage.list_recipes()?;
        info!(
            "Recipe store ready with {} recipes ({})",
            recipes.len(),
            storage.path().display()
        );

        Ok(Self {
            storage,
            media,
            options,
            events: EventBus::new(),
            recipes,
            profile,
        })
    }

    /// The media store used for images.
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // === Recipes ===

    /// Create a recipe from `draft`, optionally with an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for blank fields, the image error under
    /// [`ImagePolicy::Strict`], or a persistence error if the insert fails.
    /// Nothing is left behind on failure.
    pub fn add_recipe(
        &mut self,
        draft: RecipeDraft,
        image: Option<&[u8]>,
    ) -> Result<Written<Recipe>> {
        self.validate(&draft)?;
        let mut recipe = Recipe::from_draft(draft.normalized());
        let mut image_warning = None;

        if let Some(data) = image {
            match self.media.save(data, &recipe.id.to_string()) {
                Ok(path) => recipe.image = ImageRef::Stored(path),
                Err(err) => image_warning = Some(self.image_failure(err)?),
            }
        }

        if let Err(err) = self.storage.insert_recipe(&recipe) {
            error!("Failed to insert recipe {}: {}", recipe.id, err);
            self.discard_image(&ImageRef::None, &recipe.image);
            return Err(err);
        }

        self.cache_insert(recipe.clone());
        info!("Added recipe {} ({})", recipe.id, recipe.name);
        self.events.publish(StoreEvent::RecipeAdded { id: recipe.id });
        Ok(Written {
            value: recipe,
            image_warning,
        })
    }

    /// Overwrite every editable field of an existing recipe.
    ///
    /// With an image, the new file replaces the old one; without, the
    /// current image is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is unknown, [`Error::Validation`]
    /// for blank fields, the image error under [`ImagePolicy::Strict`], or a
    /// persistence error if the update fails. The stored record is unchanged
    /// on error.
    pub fn update_recipe(
        &mut self,
        id: RecipeId,
        draft: RecipeDraft,
        image: Option<&[u8]>,
    ) -> Result<Written<Recipe>> {
        let current = self.require(id)?;
        self.validate(&draft)?;
        let mut updated = current.clone();
        updated.apply(draft.normalized());
        let key = id.to_string();
        let mut image_warning = None;
        let mut overwritten = None;

        if let Some(data) = image {
            // Same key and format means the new file lands on the old path.
            if current.image.path() == Some(self.media.path_for(data, &key).as_path()) {
                overwritten = self.load_image(&current.image);
            }
            match self.media.save(data, &key) {
                Ok(path) => updated.image = ImageRef::Stored(path),
                Err(err) => image_warning = Some(self.image_failure(err)?),
            }
        }

        let failure = match self.storage.update_recipe(&updated) {
            Ok(true) => None,
            Ok(false) => Some(Error::recipe_not_found(id)),
            Err(err) => {
                error!("Failed to update recipe {}: {}", id, err);
                Some(err)
            }
        };
        if let Some(err) = failure {
            match overwritten {
                Some(bytes) => {
                    if let Err(restore) = self.media.save(&bytes, &key) {
                        warn!("Failed to restore image for recipe {}: {}", id, restore);
                    }
                }
                None => self.discard_image(&current.image, &updated.image),
            }
            return Err(err);
        }

        self.discard_image(&updated.image, &current.image);
        self.cache_replace(updated.clone());
        info!("Updated recipe {}", id);
        self.events.publish(StoreEvent::RecipeUpdated { id });
        Ok(Written {
            value: updated,
            image_warning,
        })
    }

    /// Remove a recipe and its image. Returns the removed recipe.
    ///
    /// An image file that is already missing is not an error; any other
    /// failure to remove it is reported in [`Written::image_warning`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is unknown or a persistence error
    /// if the delete fails.
    pub fn delete_recipe(&mut self, id: RecipeId) -> Result<Written<Recipe>> {
        let recipe = self.require(id)?;
        if !self.storage.delete_recipe(id)? {
            return Err(Error::recipe_not_found(id));
        }

        let mut image_warning = None;
        if let Some(path) = recipe.image.path() {
            if let Err(err) = self.media.delete(path) {
                warn!("Failed to delete image {}: {}", path.display(), err);
                image_warning = Some(err);
            }
        }

        self.recipes.retain(|r| r.id != id);
        info!("Deleted recipe {}", id);
        self.events.publish(StoreEvent::RecipeDeleted { id });
        Ok(Written {
            value: recipe,
            image_warning,
        })
    }

    /// Flip a recipe's favorite flag and return the updated recipe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is unknown or a persistence error
    /// if the write fails.
    pub fn toggle_favorite(&mut self, id: RecipeId) -> Result<Recipe> {
        let mut recipe = self.require(id)?;
        recipe.is_favorite = !recipe.is_favorite;

        if !self.storage.set_favorite(id, recipe.is_favorite)? {
            return Err(Error::recipe_not_found(id));
        }

        self.cache_replace(recipe.clone());
        debug!("Recipe {} favorite = {}", id, recipe.is_favorite);
        self.events.publish(StoreEvent::FavoriteToggled {
            id,
            is_favorite: recipe.is_favorite,
        });
        Ok(recipe)
    }

    /// Look up a recipe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is unknown.
    pub fn get_recipe(&self, id: RecipeId) -> Result<Recipe> {
        self.recipes
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::recipe_not_found(id))
    }

    /// Borrow the cached recipes, newest first.
    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// All recipes, newest first; recipes created at the same instant keep
    /// their insertion order.
    #[must_use]
    pub fn list_recipes(&self) -> Vec<Recipe> {
        self.recipes.clone()
    }

    /// Favorite recipes, in the same order as [`RecipeStore::list_recipes`].
    #[must_use]
    pub fn list_favorites(&self) -> Vec<Recipe> {
        self.filtered(|r| r.is_favorite)
    }

    /// Recipes whose category equals `category`.
    #[must_use]
    pub fn recipes_in_category(&self, category: &str) -> Vec<Recipe> {
        self.filtered(|r| r.category == category)
    }

    /// Recipes whose name, category or an ingredient contains `query`,
    /// ignoring case.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Recipe> {
        let query = query.trim();
        self.filtered(|r| r.matches(query))
    }

    /// Distinct categories used by recipes, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.recipes
            .iter()
            .map(|r| r.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Categories in use plus the predefined ones, sorted.
    #[must_use]
    pub fn all_categories(&self) -> Vec<String> {
        let mut all: BTreeSet<String> = self.recipes.iter().map(|r| r.category.clone()).collect();
        all.extend(PREDEFINED_CATEGORIES.iter().map(|c| (*c).to_string()));
        all.into_iter().collect()
    }

    fn filtered(&self, predicate: impl Fn(&Recipe) -> bool) -> Vec<Recipe> {
        self.recipes.iter().filter(|r| predicate(r)).cloned().collect()
    }

    // === Profile ===

    /// Return the profile, creating the default one if it is missing.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the profile cannot be read or created.
    pub fn get_profile(&mut self) -> Result<Profile> {
        self.profile = self.storage.ensure_profile()?;
        Ok(self.profile.clone())
    }

    /// Borrow the cached profile.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Overwrite the profile.
    ///
    /// `Some(image)` replaces the stored avatar; `None` removes it.
    ///
    /// # Errors
    ///
    /// Returns the image error under [`ImagePolicy::Strict`] or a
    /// persistence error if the write fails. The stored profile is unchanged
    /// on error.
    pub fn update_profile(
        &mut self,
        name: impl Into<String>,
        bio: impl Into<String>,
        image: Option<&[u8]>,
    ) -> Result<Written<Profile>> {
        let current = self.storage.ensure_profile()?;
        let mut updated = Profile {
            name: name.into(),
            bio: bio.into(),
            image: ImageRef::None,
        };
        let mut image_warning = None;

        if let Some(data) = image {
            // Each avatar gets a fresh name so the old file survives until
            // the new row is committed.
            match self.media.save(data, &format!("profile-{}", Uuid::new_v4())) {
                Ok(path) => updated.image = ImageRef::Stored(path),
                Err(err) => {
                    image_warning = Some(self.image_failure(err)?);
                    updated.image = current.image.clone();
                }
            }
        }

        if let Err(err) = self.storage.save_profile(&updated) {
            error!("Failed to update profile: {}", err);
            self.discard_image(&current.image, &updated.image);
            return Err(err);
        }

        self.discard_image(&updated.image, &current.image);
        self.profile = updated.clone();
        info!("Updated profile");
        self.events.publish(StoreEvent::ProfileUpdated);
        Ok(Written {
            value: updated,
            image_warning,
        })
    }

    // === Images & maintenance ===

    /// Read the bytes of an image reference, if it points at a readable file.
    #[must_use]
    pub fn load_image(&self, image: &ImageRef) -> Option<Vec<u8>> {
        image.path().and_then(|p| self.media.load(p))
    }

    /// Delete image files that no recipe or profile refers to.
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the referenced paths cannot be read.
    pub fn prune_orphaned_images(&self) -> Result<usize> {
        let keep: HashSet<_> = self.storage.image_paths()?.into_iter().collect();
        let removed = self.media.prune_except(&keep);
        if removed > 0 {
            info!("Pruned {} orphaned images", removed);
        }
        Ok(removed)
    }

    /// Summary counts.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the database cannot be queried.
    pub fn stats(&self) -> Result<StoreStats> {
        let storage = self.storage.stats()?;
        Ok(StoreStats {
            total_recipes: storage.total_recipes,
            favorite_recipes: storage.favorite_recipes,
            stored_images: self.media.list().len(),
            media_bytes: self.media.total_size(),
            oldest_recipe: storage.oldest_recipe,
            newest_recipe: storage.newest_recipe,
            db_size_bytes: storage.db_size_bytes,
        })
    }

    /// Path of the underlying database.
    #[must_use]
    pub fn database_path(&self) -> &Path {
        self.storage.path()
    }

    // === Internals ===

    fn validate(&self, draft: &RecipeDraft) -> Result<()> {
        if !self.options.reject_blank_fields {
            return Ok(());
        }
        if draft.name.trim().is_empty() {
            return Err(Error::validation("name", "must not be blank"));
        }
        if draft.category.trim().is_empty() {
            return Err(Error::validation("category", "must not be blank"));
        }
        Ok(())
    }

    /// Load a recipe from storage, the source of truth for mutations.
    fn require(&self, id: RecipeId) -> Result<Recipe> {
        self.storage
            .get_recipe(id)?
            .ok_or_else(|| Error::recipe_not_found(id))
    }

    /// Apply the image policy to a failed image save.
    ///
    /// Returns the error back as a warning when lenient, or as `Err` when
    /// strict.
    fn image_failure(&self, err: Error) -> Result<Error> {
        match self.options.image_policy {
            ImagePolicy::Strict => Err(err),
            ImagePolicy::Lenient => {
                warn!("Image not stored, keeping record without it: {}", err);
                Ok(err)
            }
        }
    }

    /// Delete the file behind `candidate` unless `keep` points at the same
    /// file.
    fn discard_image(&self, keep: &ImageRef, candidate: &ImageRef) {
        let Some(path) = candidate.path() else {
            return;
        };
        if keep.path() == Some(path) {
            return;
        }
        if let Err(err) = self.media.delete(path) {
            warn!("Failed to delete image {}: {}", path.display(), err);
        }
    }

    /// Add a committed recipe to the cache at its list position.
    ///
    /// Newest first; a recipe sharing a timestamp goes after the ones already
    /// there, matching insertion order in storage.
    fn cache_insert(&mut self, recipe: Recipe) {
        let at = self
            .recipes
            .iter()
            .position(|r| r.created_at < recipe.created_at)
            .unwrap_or(self.recipes.len());
        self.recipes.insert(at, recipe);
    }

    /// Swap in a committed edit. `created_at` never changes, so the position
    /// holds.
    fn cache_replace(&mut self, recipe: Recipe) {
        if let Some(slot) = self.recipes.iter_mut().find(|r| r.id == recipe.id) {
            *slot = recipe;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::error::ErrorKind;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];

    fn create_test_store_with(options: StoreOptions) -> (tempfile::TempDir, RecipeStore) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open_in_memory().unwrap();
        let media = MediaStore::open(dir.path().join("images"), 1 << 20).unwrap();
        let store = RecipeStore::new(storage, media, options).unwrap();
        (dir, store)
    }

    fn create_test_store() -> (tempfile::TempDir, RecipeStore) {
        create_test_store_with(StoreOptions::default())
    }

    fn strict() -> StoreOptions {
        StoreOptions {
            image_policy: ImagePolicy::Strict,
            ..StoreOptions::default()
        }
    }

    fn carbonara() -> RecipeDraft {
        RecipeDraft::new("Pasta Carbonara", "Dinner")
            .with_ingredients(["Spaghetti", "Eggs", "Parmesan"])
            .with_steps(["Cook pasta", "Mix eggs"])
    }

    fn fail_writes(store: &RecipeStore, table: &str, op: &str) {
        store
            .storage
            .connection()
            .execute_batch(&format!(
                "CREATE TRIGGER fail_{op}_{table} BEFORE {op} ON {table} \
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;"
            ))
            .unwrap();
    }

    fn oversized() -> Vec<u8> {
        let mut data = JPEG.to_vec();
        data.resize((1 << 20) + 1, 0);
        data
    }

    fn break_media_dir(store: &RecipeStore) {
        std::fs::remove_dir_all(store.media().dir()).unwrap();
    }

    #[test]
    fn test_add_recipe_scenario() {
        let (_dir, mut store) = create_test_store();

        let added = store.add_recipe(carbonara(), None).unwrap();
        assert!(added.is_clean());

        let recipes = store.list_recipes();
        assert_eq!(recipes.len(), 1);
        let recipe = &recipes[0];
        assert_eq!(recipe.id, added.value.id);
        assert_eq!(recipe.name, "Pasta Carbonara");
        assert_eq!(recipe.category, "Dinner");
        assert_eq!(recipe.ingredients, vec!["Spaghetti", "Eggs", "Parmesan"]);
        assert_eq!(recipe.steps, vec!["Cook pasta", "Mix eggs"]);
        assert!(!recipe.is_favorite);
        assert_eq!(recipe.image, ImageRef::None);
    }

    #[test]
    fn test_add_recipe_unique_ids_newest_first() {
        let (_dir, mut store) = create_test_store();

        let ids: Vec<_> = (0..5)
            .map(|i| {
                store
                    .add_recipe(RecipeDraft::new(format!("Recipe {i}"), "Lunch"), None)
                    .unwrap()
                    .value
                    .id
            })
            .collect();

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 5);

        let listed = store.list_recipes();
        assert_eq!(listed.len(), 5);
        for pair in listed.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        let last = ids.last().unwrap();
        assert_eq!(listed.iter().filter(|r| r.id == *last).count(), 1);
    }

    #[test]
    fn test_add_recipe_with_image() {
        let (_dir, mut store) = create_test_store();

        let recipe = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;

        let path = recipe.image.path().unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("{}.jpg", recipe.id)
        );
        assert_eq!(store.load_image(&recipe.image).as_deref(), Some(JPEG));
    }

    #[test]
    fn test_add_recipe_rejects_blank_fields() {
        let (_dir, mut store) = create_test_store();

        let err = store
            .add_recipe(RecipeDraft::new("   ", "Dinner"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = store
            .add_recipe(RecipeDraft::new("Soup", ""), None)
            .unwrap_err();
        assert!(err.to_string().contains("category"));
        assert!(store.list_recipes().is_empty());
    }

    #[test]
    fn test_blank_fields_allowed_when_validation_disabled() {
        let (_dir, mut store) = create_test_store_with(StoreOptions {
            reject_blank_fields: false,
            ..StoreOptions::default()
        });

        assert!(store.add_recipe(RecipeDraft::new("", ""), None).is_ok());
    }

    #[test]
    fn test_add_recipe_empty_lists_are_valid() {
        let (_dir, mut store) = create_test_store();

        let recipe = store
            .add_recipe(RecipeDraft::new("Water", "Drink"), None)
            .unwrap()
            .value;

        let stored = store.get_recipe(recipe.id).unwrap();
        assert!(stored.ingredients.is_empty());
        assert!(stored.steps.is_empty());
    }

    #[test]
    fn test_add_recipe_insert_failure_rolls_back_and_removes_image() {
        let (_dir, mut store) = create_test_store();
        fail_writes(&store, "recipes", "INSERT");

        let err = store.add_recipe(carbonara(), Some(JPEG)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(store.list_recipes().is_empty());
        assert_eq!(store.storage.count_recipes().unwrap(), 0);
        assert!(store.media().list().is_empty());
    }

    #[test]
    fn test_add_recipe_lenient_image_failure_still_saves_record() {
        let (_dir, mut store) = create_test_store();
        break_media_dir(&store);

        let written = store.add_recipe(carbonara(), Some(JPEG)).unwrap();

        assert!(!written.is_clean());
        assert_eq!(written.image_warning.unwrap().kind(), ErrorKind::Io);
        assert_eq!(written.value.image, ImageRef::None);
        assert_eq!(store.list_recipes().len(), 1);
    }

    #[test]
    fn test_add_recipe_strict_image_failure_aborts() {
        let (_dir, mut store) = create_test_store_with(strict());
        break_media_dir(&store);

        let err = store.add_recipe(carbonara(), Some(JPEG)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(store.list_recipes().is_empty());
    }

    #[test]
    fn test_update_recipe_overwrites_fields() {
        let (_dir, mut store) = create_test_store();
        let original = store.add_recipe(carbonara(), None).unwrap().value;

        let updated = store
            .update_recipe(
                original.id,
                RecipeDraft::new("Carbonara v2", "Lunch")
                    .with_ingredients(["Rigatoni"])
                    .favorite(true),
                None,
            )
            .unwrap()
            .value;

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(store.get_recipe(original.id).unwrap(), updated);
        assert_eq!(updated.name, "Carbonara v2");
        assert!(updated.steps.is_empty());
        assert!(updated.is_favorite);
    }

    #[test]
    fn test_update_recipe_without_image_keeps_existing() {
        let (_dir, mut store) = create_test_store();
        let original = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;

        let updated = store
            .update_recipe(original.id, carbonara(), None)
            .unwrap()
            .value;

        assert_eq!(updated.image, original.image);
        assert!(store.load_image(&updated.image).is_some());
    }

    #[test]
    fn test_update_recipe_new_image_deletes_old() {
        let (_dir, mut store) = create_test_store();
        let original = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;
        let old_path = original.image.path().unwrap().to_path_buf();

        let updated = store
            .update_recipe(original.id, carbonara(), Some(PNG))
            .unwrap()
            .value;

        assert!(store.media().load(&old_path).is_none());
        assert_eq!(store.load_image(&updated.image).as_deref(), Some(PNG));
        assert_eq!(store.media().list().len(), 1);
    }

    #[test]
    fn test_update_recipe_same_format_replaces_in_place() {
        let (_dir, mut store) = create_test_store();
        let original = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;
        let mut newer = JPEG.to_vec();
        newer.extend_from_slice(b"v2");

        let updated = store
            .update_recipe(original.id, carbonara(), Some(&newer))
            .unwrap()
            .value;

        assert_eq!(updated.image, original.image);
        assert_eq!(store.load_image(&updated.image), Some(newer));
    }

    #[test]
    fn test_update_recipe_not_found() {
        let (_dir, mut store) = create_test_store();
        let err = store
            .update_recipe(RecipeId::new(), carbonara(), None)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_recipe_write_failure_keeps_prior_state() {
        let (_dir, mut store) = create_test_store();
        let original = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;
        fail_writes(&store, "recipes", "UPDATE");

        let err = store
            .update_recipe(original.id, RecipeDraft::new("Changed", "Lunch"), Some(PNG))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(store.get_recipe(original.id).unwrap(), original);
        assert_eq!(store.load_image(&original.image).as_deref(), Some(JPEG));
        assert_eq!(store.media().list().len(), 1);
    }

    #[test]
    fn test_update_recipe_write_failure_restores_overwritten_image() {
        let (_dir, mut store) = create_test_store();
        let original = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;
        fail_writes(&store, "recipes", "UPDATE");
        let mut newer = JPEG.to_vec();
        newer.extend_from_slice(b"v2");

        assert!(store
            .update_recipe(original.id, carbonara(), Some(&newer))
            .is_err());

        assert_eq!(store.load_image(&original.image).as_deref(), Some(JPEG));
    }

    #[test]
    fn test_update_recipe_strict_image_failure_aborts() {
        let (_dir, mut store) = create_test_store_with(strict());
        let original = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;

        let err = store
            .update_recipe(
                original.id,
                RecipeDraft::new("Renamed", "Lunch"),
                Some(&oversized()),
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.get_recipe(original.id).unwrap(), original);
        assert_eq!(store.storage.get_recipe(original.id).unwrap(), Some(original.clone()));
        assert_eq!(store.load_image(&original.image).as_deref(), Some(JPEG));
    }

    #[test]
    fn test_update_recipe_lenient_image_failure_keeps_old_image() {
        let (_dir, mut store) = create_test_store();
        let original = store.add_recipe(carbonara(), None).unwrap().value;
        break_media_dir(&store);

        let written = store
            .update_recipe(original.id, RecipeDraft::new("Renamed", "Dinner"), Some(JPEG))
            .unwrap();

        assert!(written.image_warning.is_some());
        assert_eq!(written.value.name, "Renamed");
        assert_eq!(written.value.image, ImageRef::None);
    }

    #[test]
    fn test_delete_recipe_removes_record_and_image() {
        let (_dir, mut store) = create_test_store();
        let recipe = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;

        let removed = store.delete_recipe(recipe.id).unwrap();

        assert!(removed.is_clean());
        assert_eq!(removed.value.id, recipe.id);
        assert!(store.list_recipes().is_empty());
        assert!(store.load_image(&recipe.image).is_none());
    }

    #[test]
    fn test_delete_recipe_with_missing_image_file() {
        let (_dir, mut store) = create_test_store();
        let recipe = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;
        std::fs::remove_file(recipe.image.path().unwrap()).unwrap();

        let removed = store.delete_recipe(recipe.id).unwrap();
        assert!(removed.is_clean());
    }

    #[test]
    fn test_deleted_id_is_not_found_everywhere() {
        let (_dir, mut store) = create_test_store();
        let id = store.add_recipe(carbonara(), None).unwrap().value.id;
        store.delete_recipe(id).unwrap();

        assert!(store.get_recipe(id).unwrap_err().is_not_found());
        assert!(store.delete_recipe(id).unwrap_err().is_not_found());
        assert!(store
            .update_recipe(id, RecipeDraft::new("", "x"), None)
            .unwrap_err()
            .is_not_found());
        assert!(store.toggle_favorite(id).unwrap_err().is_not_found());
        assert!(store
            .update_recipe(id, carbonara(), None)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_delete_failure_keeps_recipe() {
        let (_dir, mut store) = create_test_store();
        let recipe = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;
        fail_writes(&store, "recipes", "DELETE");

        let err = store.delete_recipe(recipe.id).unwrap_err();

        assert!(err.is_persistence());
        assert_eq!(store.list_recipes().len(), 1);
        assert!(store.load_image(&recipe.image).is_some());
    }

    #[test]
    fn test_toggle_favorite_is_an_involution() {
        let (_dir, mut store) = create_test_store();
        let id = store.add_recipe(carbonara(), None).unwrap().value.id;

        assert!(store.toggle_favorite(id).unwrap().is_favorite);
        assert!(store.get_recipe(id).unwrap().is_favorite);
        assert!(!store.toggle_favorite(id).unwrap().is_favorite);
        assert!(!store.get_recipe(id).unwrap().is_favorite);
    }

    #[test]
    fn test_cache_matches_storage_after_mutations() {
        let (_dir, mut store) = create_test_store();
        let first = store.add_recipe(carbonara(), None).unwrap().value;
        let second = store
            .add_recipe(RecipeDraft::new("Toast", "Breakfast"), None)
            .unwrap()
            .value;
        let third = store
            .add_recipe(RecipeDraft::new("Soup", "Lunch"), None)
            .unwrap()
            .value;

        store.toggle_favorite(first.id).unwrap();
        store
            .update_recipe(second.id, RecipeDraft::new("French toast", "Breakfast"), None)
            .unwrap();
        store.delete_recipe(third.id).unwrap();

        assert_eq!(store.recipes(), store.storage.list_recipes().unwrap().as_slice());
    }

    #[test]
    fn test_cache_keeps_insertion_order_for_equal_timestamps() {
        let (_dir, mut store) = create_test_store();
        let first = store.add_recipe(carbonara(), None).unwrap().value;
        store
            .add_recipe(RecipeDraft::new("Toast", "Breakfast"), None)
            .unwrap();

        let mut twin = Recipe::from_draft(RecipeDraft::new("Twin", "Dinner"));
        twin.created_at = first.created_at;
        store.storage.insert_recipe(&twin).unwrap();
        store.cache_insert(twin);

        assert_eq!(store.recipes(), store.storage.list_recipes().unwrap().as_slice());
    }

    #[test]
    fn test_favorites_are_ordered_subset() {
        let (_dir, mut store) = create_test_store();
        for i in 0..6 {
            let draft = RecipeDraft::new(format!("Recipe {i}"), "Snack").favorite(i % 2 == 0);
            store.add_recipe(draft, None).unwrap();
        }

        let all: Vec<_> = store.list_recipes().into_iter().map(|r| r.id).collect();
        let favorites: Vec<_> = store.list_favorites().into_iter().map(|r| r.id).collect();

        assert_eq!(favorites.len(), 3);
        let in_all_order: Vec<_> = all
            .iter()
            .copied()
            .filter(|id| favorites.contains(id))
            .collect();
        assert_eq!(favorites, in_all_order);
    }

    #[test]
    fn test_categories_and_search() {
        let (_dir, mut store) = create_test_store();
        store.add_recipe(carbonara(), None).unwrap();
        store
            .add_recipe(
                RecipeDraft::new("Pancakes", "Breakfast").with_ingredients(["Eggs", "Flour"]),
                None,
            )
            .unwrap();
        store
            .add_recipe(RecipeDraft::new("Mojito", "Cocktail"), None)
            .unwrap();

        assert_eq!(store.categories(), vec!["Breakfast", "Cocktail", "Dinner"]);
        let all = store.all_categories();
        assert!(all.contains(&"Cocktail".to_string()));
        assert!(all.contains(&"Dessert".to_string()));
        assert_eq!(all.len(), 7);

        assert_eq!(store.recipes_in_category("Breakfast").len(), 1);
        assert_eq!(store.search("eggs").len(), 2);
        assert_eq!(store.search("  ").len(), 3);
        assert!(store.search("sushi").is_empty());
    }

    #[test]
    fn test_default_profile_created_once() {
        let (_dir, mut store) = create_test_store();

        let first = store.get_profile().unwrap();
        assert_eq!(first.name, "User Name");
        assert_eq!(first.bio, "Food enthusiast");
        assert_eq!(first.image, ImageRef::None);

        let second = store.get_profile().unwrap();
        assert_eq!(first, second);
        let rows: i64 = store
            .storage
            .connection()
            .query_row("SELECT COUNT(*) FROM profile", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_get_profile_recreates_missing_row() {
        let (_dir, mut store) = create_test_store();
        store
            .storage
            .connection()
            .execute("DELETE FROM profile", [])
            .unwrap();

        assert_eq!(store.get_profile().unwrap(), Profile::default());
    }

    #[test]
    fn test_update_profile_with_image_replaces_old() {
        let (_dir, mut store) = create_test_store();
        let first = store.update_profile("Ann", "Chef", Some(JPEG)).unwrap().value;
        let second = store.update_profile("Ann", "Chef", Some(PNG)).unwrap().value;

        assert_ne!(first.image, second.image);
        assert!(store.load_image(&first.image).is_none());
        assert_eq!(store.load_image(&second.image).as_deref(), Some(PNG));
        assert_eq!(store.profile(), &second);
    }

    #[test]
    fn test_update_profile_without_image_clears_it() {
        let (_dir, mut store) = create_test_store();
        let with_image = store.update_profile("Bob", "Baker", Some(JPEG)).unwrap().value;

        let cleared = store.update_profile("Ann", "Chef", None).unwrap().value;

        assert_eq!(cleared.name, "Ann");
        assert_eq!(cleared.bio, "Chef");
        assert_eq!(cleared.image, ImageRef::None);
        assert!(store.load_image(&with_image.image).is_none());
        assert_eq!(store.get_profile().unwrap(), cleared);
    }

    #[test]
    fn test_update_profile_write_failure_keeps_prior_state() {
        let (_dir, mut store) = create_test_store();
        let before = store.update_profile("Ann", "Chef", Some(JPEG)).unwrap().value;
        fail_writes(&store, "profile", "UPDATE");

        let err = store.update_profile("Bob", "Baker", Some(PNG)).unwrap_err();

        assert!(err.is_persistence());
        assert_eq!(store.get_profile().unwrap(), before);
        assert!(store.load_image(&before.image).is_some());
        assert_eq!(store.media().list().len(), 1);
    }

    #[test]
    fn test_update_profile_lenient_image_failure_keeps_avatar() {
        let (_dir, mut store) = create_test_store();
        let before = store.update_profile("Ann", "Chef", Some(JPEG)).unwrap().value;

        let written = store
            .update_profile("Ann", "Head chef", Some(&oversized()))
            .unwrap();

        assert_eq!(written.image_warning.unwrap().kind(), ErrorKind::Validation);
        assert_eq!(written.value.bio, "Head chef");
        assert_eq!(written.value.image, before.image);
        assert_eq!(store.get_profile().unwrap().image, before.image);
        assert_eq!(store.load_image(&before.image).as_deref(), Some(JPEG));
    }

    #[test]
    fn test_update_profile_strict_image_failure_aborts() {
        let (_dir, mut store) = create_test_store_with(strict());
        break_media_dir(&store);

        let err = store.update_profile("Ann", "Chef", Some(JPEG)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(store.get_profile().unwrap(), Profile::default());
    }

    #[test]
    fn test_events_follow_mutations() {
        let (_dir, mut store) = create_test_store();
        let mut rx = store.subscribe();

        let id = store.add_recipe(carbonara(), None).unwrap().value.id;
        store.toggle_favorite(id).unwrap();
        store.update_recipe(id, carbonara(), None).unwrap();
        store.delete_recipe(id).unwrap();
        store.update_profile("Ann", "Chef", None).unwrap();

        assert_eq!(rx.try_recv().unwrap(), StoreEvent::RecipeAdded { id });
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::FavoriteToggled {
                id,
                is_favorite: true
            }
        );
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::RecipeUpdated { id });
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::RecipeDeleted { id });
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::ProfileUpdated);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_failed_mutation_publishes_nothing() {
        let (_dir, mut store) = create_test_store();
        let mut rx = store.subscribe();
        fail_writes(&store, "recipes", "INSERT");

        assert!(store.add_recipe(carbonara(), None).is_err());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_prune_orphaned_images() {
        let (_dir, mut store) = create_test_store();
        let kept = store.add_recipe(carbonara(), Some(JPEG)).unwrap().value;
        store.update_profile("Ann", "Chef", Some(PNG)).unwrap();
        let stray = store.media().save(JPEG, "stray").unwrap();

        assert_eq!(store.prune_orphaned_images().unwrap(), 1);
        assert!(!stray.exists());
        assert!(store.load_image(&kept.image).is_some());
        assert!(store.load_image(&store.profile().image).is_some());
    }

    #[test]
    fn test_stats() {
        let (_dir, mut store) = create_test_store();
        store.add_recipe(carbonara().favorite(true), Some(JPEG)).unwrap();
        store
            .add_recipe(RecipeDraft::new("Toast", "Breakfast"), None)
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_recipes, 2);
        assert_eq!(stats.favorite_recipes, 1);
        assert_eq!(stats.stored_images, 1);
        assert_eq!(stats.media_bytes, JPEG.len() as u64);
        assert!(stats.oldest_recipe <= stats.newest_recipe);
    }
}
