//! Storage layer for recipebox.
//!
//! This module provides `SQLite`-based persistent storage for recipe and
//! profile rows. It knows nothing about images on disk or the in-memory cache;
//! see [`crate::store::RecipeStore`] for the repository built on top of it.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{ImageRef, Profile, Recipe, RecipeId};

const RECIPE_COLUMNS: &str =
    "id, name, category, ingredients, steps, is_favorite, created_at, image_path";

/// Row-level access to the recipe database.
///
/// Every write runs inside its own transaction, so a failed statement never
/// leaves a partial row behind.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // === Recipes ===

    /// Insert a new recipe row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (including a duplicate id); no
    /// row is written in that case.
    pub fn insert_recipe(&self, recipe: &Recipe) -> Result<()> {
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        let steps = serde_json::to_string(&recipe.steps)?;
        let image_path = recipe.image.to_column()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r"
            INSERT INTO recipes
                (id, name, category, ingredients, steps, is_favorite, created_at, image_path)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                recipe.id.to_string(),
                recipe.name,
                recipe.category,
                ingredients,
                steps,
                recipe.is_favorite,
                recipe.created_at.timestamp_micros(),
                image_path,
            ],
        )?;
        tx.commit()?;

        debug!("Inserted recipe {}", recipe.id);
        Ok(())
    }

    /// Overwrite the mutable columns of an existing recipe.
    ///
    /// `id` and `created_at` are never written. Returns `false` if no row
    /// has the recipe's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails; the row is left unchanged.
    pub fn update_recipe(&self, recipe: &Recipe) -> Result<bool> {
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        let steps = serde_json::to_string(&recipe.steps)?;
        let image_path = recipe.image.to_column()?;

        let tx = self.conn.unchecked_transaction()?;
        let affected = tx.execute(
            r"
            UPDATE recipes
            SET name = ?2, category = ?3, ingredients = ?4, steps = ?5,
                is_favorite = ?6, image_path = ?7
            WHERE id = ?1
            ",
            params![
                recipe.id.to_string(),
                recipe.name,
                recipe.category,
                ingredients,
                steps,
                recipe.is_favorite,
                image_path,
            ],
        )?;
        tx.commit()?;

        debug!("Updated recipe {} ({} rows)", recipe.id, affected);
        Ok(affected > 0)
    }

    /// Set the favorite flag of a recipe.
    ///
    /// Returns `false` if no row has the id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_favorite(&self, id: RecipeId, is_favorite: bool) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE recipes SET is_favorite = ?2 WHERE id = ?1",
            params![id.to_string(), is_favorite],
        )?;
        Ok(affected > 0)
    }

    /// Delete a recipe by id.
    ///
    /// Returns `true` if a recipe was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_recipe(&self, id: RecipeId) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", [id.to_string()])?;
        Ok(affected > 0)
    }

    /// Get a recipe by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
                [id.to_string()],
                Self::row_to_recipe,
            )
            .optional()?;
        Ok(result)
    }

    /// All recipes, newest first, ties in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a row is corrupt.
    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.query_recipes()
    }

    fn query_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at DESC, seq ASC"
        ))?;

        let recipes = stmt
            .query_map([], Self::row_to_recipe)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(recipes)
    }

    /// Count total recipes in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_recipes(&self) -> Result<usize> {
        let count: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count favorite recipes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_favorites(&self) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE is_favorite = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // === Profile ===

    /// Load the profile row, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn load_profile(&self) -> Result<Option<Profile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT name, bio, image_path FROM profile WHERE id = 1",
                [],
                |row| {
                    Ok(Profile {
                        name: row.get(0)?,
                        bio: row.get(1)?,
                        image: ImageRef::from_column(row.get(2)?),
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    /// Create the default profile row unless one already exists, then return
    /// the stored profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn ensure_profile(&self) -> Result<Profile> {
        let defaults = Profile::default();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO profile (id, name, bio, image_path) VALUES (1, ?1, ?2, NULL)",
            params![defaults.name, defaults.bio],
        )?;
        if inserted > 0 {
            info!("Created default profile");
        }

        self.load_profile()?
            .ok_or_else(|| Error::DatabaseMigration {
                message: "profile row missing after creation".to_string(),
            })
    }

    /// Overwrite the profile row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the row is left unchanged.
    pub fn save_profile(&self, profile: &Profile) -> Result<()> {
        let image_path = profile.image.to_column()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r"
            INSERT INTO profile (id, name, bio, image_path) VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE
            SET name = excluded.name, bio = excluded.bio, image_path = excluded.image_path
            ",
            params![profile.name, profile.bio, image_path],
        )?;
        tx.commit()?;
        Ok(())
    }

    // === Maintenance ===

    /// Every image path referenced by a recipe or the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn image_paths(&self) -> Result<Vec<PathBuf>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT image_path FROM recipes WHERE image_path IS NOT NULL
            UNION
            SELECT image_path FROM profile WHERE image_path IS NOT NULL
            ",
        )?;

        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(PathBuf::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(paths)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_recipes = self.count_recipes()?;
        let favorite_recipes = self.count_favorites()?;

        let (oldest, newest): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM recipes",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_recipes,
            favorite_recipes,
            oldest_recipe: oldest.and_then(DateTime::from_timestamp_micros),
            newest_recipe: newest.and_then(DateTime::from_timestamp_micros),
            db_size_bytes,
        })
    }

    /// Convert a database row to a Recipe struct.
    fn row_to_recipe(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        let id_str: String = row.get(0)?;
        let id = id_str
            .parse::<RecipeId>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        let ingredients_json: String = row.get(3)?;
        let ingredients: Vec<String> = serde_json::from_str(&ingredients_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        let steps_json: String = row.get(4)?;
        let steps: Vec<String> = serde_json::from_str(&steps_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        let created_micros: i64 = row.get(6)?;
        let created_at: DateTime<Utc> = DateTime::from_timestamp_micros(created_micros)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(6, created_micros))?;

        Ok(Recipe {
            id,
            name: row.get(1)?,
            category: row.get(2)?,
            ingredients,
            steps,
            is_favorite: row.get(5)?,
            created_at,
            image: ImageRef::from_column(row.get(7)?),
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of recipes stored.
    pub total_recipes: usize,
    /// Number of recipes marked as favorite.
    pub favorite_recipes: usize,
    /// Creation time of the oldest recipe.
    pub oldest_recipe: Option<DateTime<Utc>>,
    /// Creation time of the newest recipe.
    pub newest_recipe: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
