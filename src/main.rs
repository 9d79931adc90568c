use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use catalog_shelf::catalog::CatalogSource;
use catalog_shelf::config::Config;
use catalog_shelf::favorites::Toggle;
use catalog_shelf::models::{Comment, Entity, Identity};
use catalog_shelf::Shelf;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Browse a title catalog and keep favorites, ratings and comments locally")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local account (replaces any existing one)
    Register { email: String, password: String },
    /// Check credentials against the local account
    Login { email: String, password: String },
    /// Fetch the catalog and list titles, optionally filtered by name
    Browse { query: Option<String> },
    /// Show one title with its rating and comments
    Show { id: String },
    /// Toggle a title as favorite
    Favorite { id: String },
    /// List favorites
    Favorites,
    /// Remove a title from favorites
    Unfavorite { id: String },
    /// Rate a title from 1 to 5 stars
    Rate { id: String, stars: i64 },
    /// List comments on a title
    Comments { id: String },
    /// Add, edit or remove your comments
    #[command(subcommand)]
    Comment(CommentCommands),
}

#[derive(Subcommand)]
enum CommentCommands {
    Add { id: String, text: String },
    Edit { id: String, comment_id: Uuid, text: String },
    Remove { id: String, comment_id: Uuid },
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "catalog_shelf=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load();
    let shelf = Shelf::open(&config).context("Failed to open shelf")?;

    match cli.command {
        Commands::Register { email, password } => {
            let identity = shelf.session.register(&email, &password)?;
            println!("Registered {}", identity.email);
        }
        Commands::Login { email, password } => {
            let identity = shelf.session.authenticate(&email, &password)?;
            println!("Welcome back, {}", identity.email);
        }
        Commands::Browse { query } => {
            shelf
                .catalog
                .refresh()
                .await
                .context("Failed to fetch catalog")?;
            let favorites = shelf.favorites.favorite_ids()?;
            let ratings = shelf.ratings.all_ratings()?;

            for entity in shelf.catalog.filter(query.as_deref().unwrap_or("")) {
                let heart = if favorites.contains(&entity.id) { "♥" } else { " " };
                let rating = stars(ratings.get(&entity.id).copied());
                println!(
                    "{} {:>6}  {:<40} {}  {}",
                    heart,
                    entity.id,
                    entity.name,
                    rating,
                    entity.genre_line().unwrap_or_else(|| "No genre".to_string())
                );
            }
        }
        Commands::Show { id } => {
            let entity = find_entity(&shelf, &id).await?;
            print_details(&entity);
            println!("Rating: {}", stars(shelf.ratings.get_rating(&id)?));
            print_comments(&shelf.feedback.list(&id)?);
        }
        Commands::Favorite { id } => {
            refresh_quietly(&shelf).await;
            match shelf.toggle_favorite(&id)? {
                Toggle::Added => println!("Added {} to favorites", id),
                Toggle::Removed => println!("Removed {} from favorites", id),
            }
        }
        Commands::Favorites => {
            let favorites = shelf.favorites.list_favorites()?;
            if favorites.is_empty() {
                println!("No favorites yet");
            }
            for entity in favorites {
                println!(
                    "{:>6}  {:<40} {}",
                    entity.id,
                    entity.name,
                    entity.genre_line().unwrap_or_else(|| "No genre".to_string())
                );
            }
        }
        Commands::Unfavorite { id } => {
            shelf.favorites.remove(&id)?;
            println!("Removed {} from favorites", id);
        }
        Commands::Rate { id, stars: value } => {
            shelf.ratings.set_rating(&id, value)?;
            println!("Rated {} {}", id, stars(Some(value as u8)));
        }
        Commands::Comments { id } => {
            print_comments(&shelf.feedback.list(&id)?);
        }
        Commands::Comment(command) => {
            let identity = shelf.session.current_identity()?;
            run_comment(&shelf, command, identity)?;
        }
    }

    Ok(())
}

fn run_comment<S: CatalogSource>(
    shelf: &Shelf<S>,
    command: CommentCommands,
    identity: Option<Identity>,
) -> Result<()> {
    match command {
        CommentCommands::Add { id, text } => {
            let comment = shelf.feedback.add(&id, identity.as_ref(), &text)?;
            println!("Added comment {}", comment.id);
        }
        CommentCommands::Edit {
            id,
            comment_id,
            text,
        } => {
            let identity = identity.context("Register an account before editing comments")?;
            shelf
                .feedback
                .edit_by_id(&id, comment_id, &identity, &text)?;
            println!("Edited comment {}", comment_id);
        }
        CommentCommands::Remove { id, comment_id } => {
            let identity = identity.context("Register an account before removing comments")?;
            shelf.feedback.remove_by_id(&id, comment_id, &identity)?;
            println!("Removed comment {}", comment_id);
        }
    }
    Ok(())
}

/// Refresh for commands that can fall back to stored favorites.
async fn refresh_quietly<S: CatalogSource>(shelf: &Shelf<S>) {
    if let Err(e) = shelf.catalog.refresh().await {
        tracing::warn!("Continuing without a fresh catalog: {}", e);
    }
}

/// Look in the catalog first, then in favorites so details work offline.
async fn find_entity<S: CatalogSource>(shelf: &Shelf<S>, id: &str) -> Result<Entity> {
    refresh_quietly(shelf).await;
    if let Some(entity) = shelf.catalog.get(id) {
        return Ok(entity);
    }
    shelf
        .favorites
        .list_favorites()?
        .into_iter()
        .find(|e| e.id == id)
        .with_context(|| format!("Title {} not found", id))
}

fn print_details(entity: &Entity) {
    println!("{}", entity.name);
    println!(
        "Genre: {}",
        entity.genre_line().unwrap_or_else(|| "No genre".to_string())
    );
    if let Some(year) = entity.premiere_year() {
        println!("Year: {}", year);
    }
    if let Some(runtime) = &entity.runtime {
        println!("Runtime: {} min", runtime);
    }
    if let Some(summary) = entity.plain_summary() {
        println!("\n{}\n", summary);
    }
}

fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("No comments");
    }
    for (position, comment) in comments.iter().enumerate() {
        let edited = if comment.edited_at.is_some() { " (edited)" } else { "" };
        println!(
            "#{} [{}] {}{}: {}",
            position, comment.id, comment.author, edited, comment.text
        );
    }
}

fn stars(rating: Option<u8>) -> String {
    let filled = rating.unwrap_or(0).min(5) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}
