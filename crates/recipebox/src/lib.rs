//! `recipebox` - a local recipe and profile store
//!
//! Recipes and a single user profile are kept in SQLite, with their images as
//! files in a media directory. [`RecipeStore`] is the entry point: it validates
//! input, keeps records and image files consistent, and notifies subscribers
//! after each committed change.
//!
//! ```no_run
//! use recipebox::{Config, RecipeDraft, RecipeStore};
//!
//! let mut store = RecipeStore::open(&Config::load()?)?;
//! let draft = RecipeDraft::new("Pasta Carbonara", "Dinner")
//!     .with_ingredients(["Spaghetti", "Eggs", "Parmesan"])
//!     .with_steps(["Cook pasta", "Mix eggs"]);
//! let recipe = store.add_recipe(draft, None)?.into_inner();
//! store.toggle_favorite(recipe.id)?;
//! # Ok::<(), recipebox::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod media;
pub mod model;
pub mod storage;
pub mod store;

pub use config::{Config, ImagePolicy};
pub use error::{Error, ErrorKind, Result};
pub use events::StoreEvent;
pub use logging::init_logging;
pub use media::MediaStore;
pub use model::{ImageRef, Profile, Recipe, RecipeDraft, RecipeId};
pub use storage::{Storage, StorageStats};
pub use store::{RecipeStore, StoreOptions, StoreStats, Written};
