//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::model::{RecipeDraft, RecipeId};

/// Recipe commands.
#[derive(Debug, Subcommand)]
pub enum RecipeCommand {
    /// Add a new recipe
    Add {
        /// Recipe name
        name: String,

        /// Recipe category (e.g. Dinner)
        #[arg(long)]
        category: String,

        /// Ingredient and step lists
        #[command(flatten)]
        lists: RecipeLists,

        /// Mark as favorite
        #[arg(short, long)]
        favorite: bool,

        /// Image file to attach
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
    },

    /// List all recipes, newest first
    List(OutputArgs),

    /// Show one recipe
    Show {
        /// Recipe id
        id: RecipeId,

        /// Output options
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Edit a recipe; omitted fields keep their current value
    Edit {
        /// Recipe id
        id: RecipeId,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New category
        #[arg(long)]
        category: Option<String>,

        /// Replacement ingredient and step lists
        #[command(flatten)]
        lists: RecipeLists,

        /// Set the favorite flag
        #[arg(long)]
        favorite: Option<bool>,

        /// Replacement image file
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
    },

    /// Delete a recipe and its image
    Delete {
        /// Recipe id
        id: RecipeId,
    },

    /// Toggle a recipe's favorite flag
    Favorite {
        /// Recipe id
        id: RecipeId,
    },
}

/// Ingredient and step lists given on the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct RecipeLists {
    /// Ingredient (repeat for each)
    #[arg(short, long = "ingredient", value_name = "TEXT")]
    pub ingredients: Vec<String>,

    /// Step (repeat for each, in order)
    #[arg(short, long = "step", value_name = "TEXT")]
    pub steps: Vec<String>,
}

impl RecipeLists {
    /// Put the lists into a draft, replacing each list only if it was given.
    #[must_use]
    pub fn apply_to(self, mut draft: RecipeDraft) -> RecipeDraft {
        if !self.ingredients.is_empty() {
            draft.ingredients = self.ingredients;
        }
        if !self.steps.is_empty() {
            draft.steps = self.steps;
        }
        draft
    }
}

/// Profile commands.
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show the profile
    Show(OutputArgs),

    /// Edit the profile; omitted fields keep their current value
    Edit {
        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Short biography
        #[arg(short, long)]
        bio: Option<String>,

        /// New avatar image file
        #[arg(long, value_name = "FILE", conflicts_with = "remove_image")]
        image: Option<PathBuf>,

        /// Remove the avatar image
        #[arg(long)]
        remove_image: bool,
    },
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Text to look for in names, categories and ingredients
    pub query: String,

    /// Only recipes in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Only favorites
    #[arg(short, long)]
    pub favorites: bool,

    /// Output options
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Categories command arguments.
#[derive(Debug, Args)]
pub struct CategoriesCommand {
    /// Include the predefined categories
    #[arg(short, long)]
    pub all: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Output options shared by listing commands.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct OutputArgs {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
