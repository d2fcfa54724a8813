//! Core record types for recipebox.
//!
//! This module defines the recipe and profile records held by the store,
//! together with the input value used to create and edit recipes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Default profile name used when the profile row is first created.
pub const DEFAULT_PROFILE_NAME: &str = "User Name";

/// Default profile bio used when the profile row is first created.
pub const DEFAULT_PROFILE_BIO: &str = "Food enthusiast";

/// Categories offered even before any recipe uses them.
pub const PREDEFINED_CATEGORIES: &[&str] =
    &["Breakfast", "Lunch", "Dinner", "Dessert", "Snack", "Drink"];

/// Unique, immutable identifier of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

impl RecipeId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecipeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecipeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Association between a record and an image file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ImageRef {
    /// The record has no image.
    #[default]
    None,
    /// The record's image lives at this path.
    Stored(PathBuf),
}

impl ImageRef {
    /// Path of the stored image, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::None => None,
            Self::Stored(path) => Some(path),
        }
    }

    /// Build from a nullable column value.
    #[must_use]
    pub fn from_column(value: Option<String>) -> Self {
        value.map_or(Self::None, |p| Self::Stored(PathBuf::from(p)))
    }

    /// Convert to a nullable column value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the path is not valid UTF-8, since it
    /// could not be read back as the same path.
    pub fn to_column(&self) -> Result<Option<String>, Error> {
        let Some(path) = self.path() else {
            return Ok(None);
        };
        path.to_str().map(|p| Some(p.to_owned())).ok_or_else(|| {
            Error::validation(
                "image",
                format!("path {} is not valid UTF-8", path.display()),
            )
        })
    }
}

/// The editable fields of a recipe.
///
/// Used as the input for both creating and updating a recipe; the store
/// assigns the identifier and creation time itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecipeDraft {
    /// Display name.
    pub name: String,
    /// Free-form category, e.g. "Dinner".
    pub category: String,
    /// Ingredients in display order.
    pub ingredients: Vec<String>,
    /// Preparation steps in display order.
    pub steps: Vec<String>,
    /// Whether the recipe is marked as a favorite.
    pub is_favorite: bool,
}

impl RecipeDraft {
    /// Create a draft with the given name and category and no content.
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    /// Set the ingredient list.
    #[must_use]
    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    /// Set the step list.
    #[must_use]
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Set the favorite flag.
    #[must_use]
    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    /// Drop blank ingredient and step entries, keeping order.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.ingredients.retain(|s| !s.trim().is_empty());
        self.steps.retain(|s| !s.trim().is_empty());
        self
    }
}

/// A stored recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique identifier, fixed at creation.
    pub id: RecipeId,
    /// Display name.
    pub name: String,
    /// Free-form category.
    pub category: String,
    /// Ingredients in display order.
    pub ingredients: Vec<String>,
    /// Preparation steps in display order.
    pub steps: Vec<String>,
    /// Whether the recipe is marked as a favorite.
    pub is_favorite: bool,
    /// When the recipe was created. Never changes.
    pub created_at: DateTime<Utc>,
    /// Associated image, if any.
    pub image: ImageRef,
}

impl Recipe {
    /// Build a new recipe from a draft with a fresh id and the current time.
    ///
    /// The timestamp is truncated to microseconds, the precision it is
    /// persisted with.
    #[must_use]
    pub fn from_draft(draft: RecipeDraft) -> Self {
        let now = Utc::now();
        let created_at = DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now);
        Self {
            id: RecipeId::new(),
            name: draft.name,
            category: draft.category,
            ingredients: draft.ingredients,
            steps: draft.steps,
            is_favorite: draft.is_favorite,
            created_at,
            image: ImageRef::None,
        }
    }

    /// Overwrite every editable field from a draft.
    pub fn apply(&mut self, draft: RecipeDraft) {
        self.name = draft.name;
        self.category = draft.category;
        self.ingredients = draft.ingredients;
        self.steps = draft.steps;
        self.is_favorite = draft.is_favorite;
    }

    /// Case-insensitive match against name, category and ingredients.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.category.to_lowercase().contains(&needle)
            || self
                .ingredients
                .iter()
                .any(|i| i.to_lowercase().contains(&needle))
    }
}

/// The single user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name.
    pub name: String,
    /// Short biography.
    pub bio: String,
    /// Avatar image, if any.
    pub image: ImageRef,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            bio: DEFAULT_PROFILE_BIO.to_string(),
            image: ImageRef::None,
        }
    }
}
