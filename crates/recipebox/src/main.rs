//! `recipebox` - CLI for the recipe store
//!
//! This binary provides the command-line interface for adding, browsing and
//! editing recipes and the cook profile.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use recipebox::cli::{
    CategoriesCommand, Cli, Command, ConfigCommand, OutputArgs, ProfileCommand, RecipeCommand,
    SearchCommand,
};
use recipebox::{init_logging, Config, Recipe, RecipeDraft, RecipeStore, Written};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => run(&config, command),
    }
}

fn run(config: &Config, command: Command) -> Result<()> {
    let mut store = RecipeStore::open(config).context("failed to open recipe store")?;
    let store = &mut store;

    match command {
        Command::Recipe(cmd) => handle_recipe(store, cmd),
        Command::Favorites(output) => print_recipes(&store.list_favorites(), output),
        Command::Categories(cmd) => {
            handle_categories(store, &cmd);
            Ok(())
        }
        Command::Search(cmd) => handle_search(store, &cmd),
        Command::Profile(cmd) => handle_profile(store, cmd),
        Command::Status(cmd) => handle_status(store, cmd.json),
        Command::PruneImages => {
            let removed = store.prune_orphaned_images()?;
            println!("Removed {removed} orphaned image(s).");
            Ok(())
        }
        Command::Config(cmd) => handle_config(config, cmd),
    }
}

fn handle_recipe(store: &mut RecipeStore, cmd: RecipeCommand) -> Result<()> {
    match cmd {
        RecipeCommand::Add {
            name,
            category,
            lists,
            favorite,
            image,
        } => {
            let draft = lists.apply_to(RecipeDraft::new(name, category).favorite(favorite));
            let image = read_image(image.as_deref())?;
            let written = store.add_recipe(draft, image.as_deref())?;
            let recipe = report(written);
            println!("Added {} ({})", recipe.name, recipe.id);
        }
        RecipeCommand::List(output) => print_recipes(&store.list_recipes(), output)?,
        RecipeCommand::Show { id, output } => {
            let recipe = store.get_recipe(id)?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&recipe)?);
            } else {
                print_recipe_details(&recipe);
            }
        }
        RecipeCommand::Edit {
            id,
            name,
            category,
            lists,
            favorite,
            image,
        } => {
            let current = store.get_recipe(id)?;
            let draft = RecipeDraft {
                name: name.unwrap_or(current.name),
                category: category.unwrap_or(current.category),
                ingredients: current.ingredients,
                steps: current.steps,
                is_favorite: favorite.unwrap_or(current.is_favorite),
            };
            let image = read_image(image.as_deref())?;
            let written = store.update_recipe(id, lists.apply_to(draft), image.as_deref())?;
            let recipe = report(written);
            println!("Updated {} ({})", recipe.name, recipe.id);
        }
        RecipeCommand::Delete { id } => {
            let recipe = report(store.delete_recipe(id)?);
            println!("Deleted {} ({})", recipe.name, recipe.id);
        }
        RecipeCommand::Favorite { id } => {
            let recipe = store.toggle_favorite(id)?;
            let state = if recipe.is_favorite {
                "now a favorite"
            } else {
                "no longer a favorite"
            };
            println!("{} is {state}", recipe.name);
        }
    }
    Ok(())
}

fn handle_categories(store: &RecipeStore, cmd: &CategoriesCommand) {
    let categories = if cmd.all {
        store.all_categories()
    } else {
        store.categories()
    };
    for category in categories {
        println!("{category}");
    }
}

fn handle_search(store: &RecipeStore, cmd: &SearchCommand) -> Result<()> {
    let results: Vec<Recipe> = store
        .search(&cmd.query)
        .into_iter()
        .filter(|r| cmd.category.as_ref().map_or(true, |c| &r.category == c))
        .filter(|r| !cmd.favorites || r.is_favorite)
        .collect();
    print_recipes(&results, cmd.output)
}

fn handle_profile(store: &mut RecipeStore, cmd: ProfileCommand) -> Result<()> {
    match cmd {
        ProfileCommand::Show(output) => {
            let profile = store.get_profile()?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                println!("Name:  {}", profile.name);
                println!("Bio:   {}", profile.bio);
                match profile.image.path() {
                    Some(path) => println!("Image: {}", path.display()),
                    None => println!("Image: (none)"),
                }
            }
        }
        ProfileCommand::Edit {
            name,
            bio,
            image,
            remove_image,
        } => {
            let current = store.get_profile()?;
            // Updating without image bytes clears the avatar, so resend the
            // current one unless it is being replaced or removed.
            let image = match (image, remove_image) {
                (Some(path), _) => Some(read_file(&path)?),
                (None, true) => None,
                (None, false) => store.load_image(&current.image),
            };
            let written = store.update_profile(
                name.unwrap_or(current.name),
                bio.unwrap_or(current.bio),
                image.as_deref(),
            )?;
            let profile = report(written);
            println!("Updated profile for {}", profile.name);
        }
    }
    Ok(())
}

fn handle_status(store: &RecipeStore, json: bool) -> Result<()> {
    let stats = store.stats()?;
    if json {
        let status = serde_json::json!({
            "database_path": store.database_path(),
            "media_dir": store.media().dir(),
            "total_recipes": stats.total_recipes,
            "favorite_recipes": stats.favorite_recipes,
            "stored_images": stats.stored_images,
            "media_bytes": stats.media_bytes,
            "db_size_bytes": stats.db_size_bytes,
            "oldest_recipe": stats.oldest_recipe,
            "newest_recipe": stats.newest_recipe,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("recipebox status");
        println!("----------------");
        println!("Database:      {}", store.database_path().display());
        println!("Media:         {}", store.media().dir().display());
        println!("Recipes:       {}", stats.total_recipes);
        println!("Favorites:     {}", stats.favorite_recipes);
        println!(
            "Images:        {} ({} bytes)",
            stats.stored_images, stats.media_bytes
        );
        println!("Database size: {} bytes", stats.db_size_bytes);
        if let (Some(oldest), Some(newest)) = (stats.oldest_recipe, stats.newest_recipe) {
            println!("Oldest:        {}", oldest.format("%Y-%m-%d %H:%M"));
            println!("Newest:        {}", newest.format("%Y-%m-%d %H:%M"));
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:       {}", config.database_path().display());
                println!("  Media directory:     {}", config.media_dir().display());
                println!();
                println!("[Images]");
                println!("  Failure policy:      {}", config.images.policy);
                println!("  Max bytes:           {}", config.images.max_bytes);
                println!();
                println!("[Validation]");
                println!(
                    "  Reject blank fields: {}",
                    config.validation.reject_blank_fields
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Print an image warning, if any, and return the record.
fn report<T>(written: Written<T>) -> T {
    if let Some(warning) = &written.image_warning {
        eprintln!("warning: image not saved: {warning}");
    }
    written.into_inner()
}

fn read_image(path: Option<&Path>) -> Result<Option<Vec<u8>>> {
    path.map(read_file).transpose()
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read image {}", path.display()))
}

fn print_recipes(recipes: &[Recipe], output: OutputArgs) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(recipes)?);
        return Ok(());
    }
    if recipes.is_empty() {
        println!("No recipes.");
        return Ok(());
    }
    for recipe in recipes {
        println!(
            "{}  {}{}  [{}]",
            recipe.id,
            if recipe.is_favorite { "* " } else { "" },
            recipe.name,
            recipe.category
        );
    }
    Ok(())
}

fn print_recipe_details(recipe: &Recipe) {
    println!("{}", recipe.name);
    println!("{}", "=".repeat(recipe.name.chars().count()));
    println!("Id:        {}", recipe.id);
    println!("Category:  {}", recipe.category);
    println!("Favorite:  {}", if recipe.is_favorite { "yes" } else { "no" });
    println!("Created:   {}", recipe.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(path) = recipe.image.path() {
        println!("Image:     {}", path.display());
    }
    println!();
    println!("Ingredients:");
    for ingredient in &recipe.ingredients {
        println!("  - {ingredient}");
    }
    println!();
    println!("Steps:");
    for (n, step) in recipe.steps.iter().enumerate() {
        println!("  {}. {step}", n + 1);
    }
}
