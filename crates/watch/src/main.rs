//! Notebook images watcher
//!
//! Commands:
//! - follow: print the merged build intents whenever they change (default)
//! - delete: delete a build intent together with its image

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notebook_images_common::CreDetails;
use notebook_images_watch::{ImagesClient, ResourceWatch, Snapshot};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "notebook-images-watch")]
#[command(about = "Follow notebook build intents and the images produced for them")]
struct Cli {
    /// Base URL of the notebook images API
    #[arg(long, env = "IMAGES_API_URL", default_value = "http://127.0.0.1:8080")]
    url: String,

    /// User name forwarded to the API
    #[arg(long, env = "IMAGES_USER")]
    user: Option<String>,

    /// Seconds between polls
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 30)]
    interval_secs: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print build intents whenever they change
    Follow,

    /// Delete a build intent and the image produced for it
    Delete {
        /// Record name of the build intent
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notebook_images_watch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let client = ImagesClient::new(cli.url, cli.user);

    match cli.command.unwrap_or(Commands::Follow) {
        Commands::Follow => follow(client, cli.interval_secs).await?,
        Commands::Delete { id } => delete(&client, &id).await?,
    }

    Ok(())
}

async fn follow(client: ImagesClient, interval_secs: u64) -> Result<()> {
    let watch = ResourceWatch::spawn(client, Duration::from_secs(interval_secs.max(1)));
    let mut updates = watch.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    watch.shutdown().await;
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    if !snapshot.loaded {
        return;
    }
    if let Some(error) = &snapshot.load_error {
        eprintln!("fetch failed: {}", error);
        return;
    }

    println!("{:<20} {:<32} {:<10} IMAGE", "ID", "NAME", "PHASE");
    for resource in &snapshot.resources {
        println!("{}", row(resource));
    }
    println!();
}

fn row(resource: &CreDetails) -> String {
    let phase = resource
        .phase
        .map(|p| format!("{:?}", p))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<20} {:<32} {:<10} {}",
        resource.id,
        resource.name.as_deref().unwrap_or("-"),
        phase,
        resource.image_id.as_deref().unwrap_or("-"),
    )
}

async fn delete(client: &ImagesClient, id: &str) -> Result<()> {
    let resource = client
        .get_resource(id)
        .await?
        .with_context(|| format!("No build intent named {}", id))?;

    let outcome = client.delete_resource_with_image(&resource).await?;
    match outcome.error {
        None if outcome.success => println!("deleted {}", id),
        error => anyhow::bail!(
            "Failed to delete {}: {}",
            id,
            error.unwrap_or_else(|| "unknown error".to_string())
        ),
    }

    Ok(())
}
