//! Command-line interface for recipebox.
//!
//! This module provides the CLI structure for the `recipebox` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CategoriesCommand, ConfigCommand, OutputArgs, ProfileCommand, RecipeCommand, RecipeLists,
    SearchCommand, StatusCommand,
};

use crate::logging::Verbosity;

/// recipebox - Keep your recipes on your own disk
///
/// Stores recipes, their photos and your cook profile locally.
#[derive(Debug, Parser)]
#[command(name = "recipebox")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add, view, edit and delete recipes
    #[command(subcommand)]
    Recipe(RecipeCommand),

    /// List favorite recipes
    Favorites(OutputArgs),

    /// List recipe categories
    Categories(CategoriesCommand),

    /// Search recipes
    Search(SearchCommand),

    /// View or edit the profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Show store statistics
    Status(StatusCommand),

    /// Delete image files no recipe or profile refers to
    PruneImages,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
