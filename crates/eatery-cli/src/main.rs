//! Eatery - command-line front end for the offline-first restaurant directory.
//!
//! Reads are served from the local store when it has data and from the API
//! otherwise. With `--offline`, writes are kept locally and queued instead
//! of being sent.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eatery_core::directory::ALL;
use eatery_core::utils::{format_timestamp, truncate_string};
use eatery_core::{
    CacheStatus, Config, Connectivity, Delivery, Directory, EdgeCacheHandle, FavoriteUpdate,
    HttpGateway, LocalStore, Restaurant, ReqwestTransport, Review, Transport,
};

/// Column width for restaurant names in list output
const NAME_WIDTH: usize = 32;

#[derive(Parser)]
#[command(name = "eatery")]
#[command(version, about = "Offline-first restaurant directory", long_about = None)]
struct Cli {
    /// Keep writes local and queue them instead of sending
    #[arg(long, global = true)]
    offline: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List restaurants, optionally filtered
    Restaurants {
        #[arg(long, default_value = ALL)]
        cuisine: String,
        #[arg(long, default_value = ALL)]
        neighborhood: String,
    },
    /// Show one restaurant
    Restaurant { id: i64 },
    /// List distinct neighborhoods
    Neighborhoods,
    /// List distinct cuisines
    Cuisines,
    /// List reviews for a restaurant
    Reviews { id: i64 },
    /// Post a review
    Review {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        rating: i64,
        #[arg(long)]
        comments: String,
    },
    /// Mark a restaurant as favorite (or clear it with --off)
    Favorite {
        id: i64,
        #[arg(long)]
        off: bool,
    },
    /// Show local cache and queue state
    Status,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    Ok(guard)
}

/// Network transport, routed through the edge cache when it is enabled.
async fn build_transport(config: &Config) -> Result<(Arc<dyn Transport>, Option<EdgeCacheHandle>)> {
    let network: Arc<dyn Transport> = Arc::new(
        ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))
            .context("Failed to build HTTP client")?,
    );
    if !config.edge_cache.enabled {
        return Ok((network, None));
    }

    let edge = EdgeCacheHandle::spawn(config.edge_cache.clone(), network);
    match edge.install().await {
        Ok(report) => info!(
            precached = report.precached,
            removed = report.removed_caches.len(),
            "Edge cache ready"
        ),
        // requests pass straight through an uninstalled worker
        Err(e) => warn!(error = %e, "Edge cache install failed, continuing without it"),
    }
    let transport: Arc<dyn Transport> = Arc::new(edge.clone());
    Ok((transport, Some(edge)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_ref())?;

    let config = Config::load()?;
    info!(api = %config.api_base_url, "Eatery starting");

    let (transport, edge) = build_transport(&config).await?;
    let gateway = Arc::new(HttpGateway::new(transport, &config.api_base_url));
    let store = LocalStore::open(config.store_dir().as_deref()).await;
    let directory = Directory::new(store, gateway, Connectivity::new(!cli.offline));

    run(&cli, &directory).await?;

    if cli.json {
        return Ok(());
    }
    if let (Commands::Status, Some(edge)) = (&cli.command, edge) {
        let stats = edge.stats().await?;
        println!(
            "Edge cache: {} hits, {} misses, {} bypassed",
            stats.hits, stats.misses, stats.bypassed
        );
        for (name, size) in stats.caches {
            println!("  {}: {} entries", name, size);
        }
    }
    Ok(())
}

async fn run(cli: &Cli, directory: &Directory) -> Result<()> {
    match &cli.command {
        Commands::Restaurants {
            cuisine,
            neighborhood,
        } => {
            let restaurants = directory
                .fetch_restaurant_by_cuisine_and_neighborhood(cuisine, neighborhood)
                .await?;
            if cli.json {
                print_json(&restaurants)?;
            } else {
                for restaurant in &restaurants {
                    print_restaurant_line(restaurant);
                }
            }
        }
        Commands::Restaurant { id } => {
            let restaurant = directory.fetch_restaurant_by_id(*id).await?;
            if cli.json {
                print_json(&restaurant)?;
            } else {
                print_restaurant_details(&restaurant);
            }
        }
        Commands::Neighborhoods => print_names(cli, &directory.fetch_neighborhoods().await?)?,
        Commands::Cuisines => print_names(cli, &directory.fetch_cuisines().await?)?,
        Commands::Reviews { id } => {
            let reviews = directory.fetch_reviews_by_restaurant_id(*id).await?;
            if cli.json {
                print_json(&reviews)?;
            } else if reviews.is_empty() {
                println!("No reviews yet");
            } else {
                for review in &reviews {
                    println!(
                        "{} {} ({})",
                        review.stars(),
                        review.name,
                        format_timestamp(&review.created_at)
                    );
                    println!("  {}", review.comments);
                }
            }
        }
        Commands::Review {
            id,
            name,
            rating,
            comments,
        } => {
            let review = Review::new(*id, name, *rating, comments);
            let delivery = directory.post_new_review(review).await?;
            print_delivery(cli, "Review", &delivery, directory)?;
        }
        Commands::Favorite { id, off } => {
            let update = FavoriteUpdate::new(*id, !off);
            let delivery = directory.post_favorite_restaurant(update).await?;
            print_delivery(cli, "Favorite", &delivery, directory)?;
        }
        Commands::Status => {
            let status = directory.cache_status().await;
            if cli.json {
                print_json(&status)?;
            } else {
                print_status(&status);
            }
        }
    }
    Ok(())
}

// ===== Output =====

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_names(cli: &Cli, names: &[String]) -> Result<()> {
    if cli.json {
        return print_json(names);
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn print_restaurant_line(restaurant: &Restaurant) {
    let favorite = if restaurant.is_favorite { "♥" } else { " " };
    println!(
        "{:>4} {} {:<width$} {:<14} {}",
        restaurant.id,
        favorite,
        truncate_string(&restaurant.name, NAME_WIDTH),
        restaurant.neighborhood,
        restaurant.cuisine_type,
        width = NAME_WIDTH,
    );
}

fn print_restaurant_details(restaurant: &Restaurant) {
    println!("{}{}", restaurant.name, if restaurant.is_favorite { " ♥" } else { "" });
    println!("  {}", restaurant.address);
    println!("  {} / {}", restaurant.neighborhood, restaurant.cuisine_type);
    println!("  {:.4}, {:.4}", restaurant.latlng.lat, restaurant.latlng.lng);
    if let Some(image) = restaurant.image_url(false) {
        println!("  Photo: {}", image);
    }
    for (day, hours) in restaurant.operating_hours.iter() {
        println!("  {:<10} {}", day, hours);
    }
}

fn print_delivery(cli: &Cli, what: &str, delivery: &Delivery, directory: &Directory) -> Result<()> {
    if cli.json {
        let (status, reason) = match delivery {
            Delivery::Sent => ("sent", None),
            Delivery::Queued => ("queued", None),
            Delivery::Failed(reason) => ("failed", Some(reason.as_str())),
        };
        return print_json(&serde_json::json!({ "delivery": status, "reason": reason }));
    }
    match delivery {
        Delivery::Sent => println!("{} sent", what),
        Delivery::Queued => {
            // queues live in memory only; this process is about to exit
            println!(
                "{} saved locally; {} write(s) pending until back online",
                what,
                directory.queues().pending()
            );
        }
        Delivery::Failed(reason) => println!("{} saved locally, send failed: {}", what, reason),
    }
    Ok(())
}

fn print_status(status: &CacheStatus) {
    println!(
        "Local store: {}",
        match status.store_version {
            Some(version) if status.store_available => format!("available (version {})", version),
            _ if status.store_available => "available".to_string(),
            _ => "unavailable".to_string(),
        }
    );
    match &status.restaurants_age {
        Some(age) => println!("Restaurants: {} cached, updated {}", status.restaurant_count, age),
        None => println!("Restaurants: none cached"),
    }
    println!(
        "Pending writes: {} review(s), {} favorite(s)",
        status.pending_reviews, status.pending_favorites
    );
    println!("Mode: {}", if status.online { "online" } else { "offline" });
}
