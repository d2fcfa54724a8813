//! `SQLite` schema definitions for recipebox.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the recipes table.
///
/// `seq` records insertion order and breaks ties between recipes created in
/// the same microsecond. `ingredients` and `steps` hold JSON arrays.
pub const CREATE_RECIPES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS recipes (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    ingredients TEXT NOT NULL DEFAULT '[]',
    steps TEXT NOT NULL DEFAULT '[]',
    is_favorite INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    image_path TEXT
)
";

/// SQL statement to create an index on `created_at` for listing.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_recipes_created_at ON recipes(created_at DESC, seq ASC)
";

/// SQL statement to create an index on `is_favorite` for the favorites list.
pub const CREATE_FAVORITE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_recipes_favorite ON recipes(is_favorite)
";

/// SQL statement to create the singleton profile table.
pub const CREATE_PROFILE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS profile (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    name TEXT NOT NULL,
    bio TEXT NOT NULL,
    image_path TEXT
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_RECIPES_TABLE,
    CREATE_CREATED_AT_INDEX,
    CREATE_FAVORITE_INDEX,
    CREATE_PROFILE_TABLE,
    CREATE_METADATA_TABLE,
];
