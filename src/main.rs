use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info, warn};
use uuid::Uuid;

use pms_bridge::catalog::CatalogSync;
use pms_bridge::config::Config;
use pms_bridge::domain::Hotel;
use pms_bridge::vendor::simulated::SANDBOX_HOTEL_ID;
use pms_bridge::{logging, metrics, server, webhook, AppState};

#[derive(Parser)]
#[command(name = "pms_bridge")]
#[command(about = "Adapter layer between the hotel platform and external PMS vendors")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = pms_bridge::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (webhooks and catalog endpoints)
    Serve {
        /// Port to run the server on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Refresh upsell catalogs from the PMS and persist them
    SyncCatalog {
        /// Only this hotel; all hotels with a PMS otherwise
        #[arg(long)]
        hotel_id: Option<Uuid>,
    },
    /// Pull reservations arriving on a day into stays
    SyncArrivals {
        /// Check-in day (YYYY-MM-DD); today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only this hotel; all hotels with a PMS otherwise
        #[arg(long)]
        hotel_id: Option<Uuid>,
    },
    /// Dispatch a webhook payload file through a provider, as the HTTP endpoint would
    Normalize {
        /// Provider name, e.g. apaleo
        #[arg(long)]
        provider: String,
        /// JSON payload file
        #[arg(long)]
        file: PathBuf,
    },
    /// Create sample hotels for both providers
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load_from(&cli.config).context("loading configuration")?;
    logging::init_logging(&config.logging);

    let state = AppState::from_config(&config).context("building application state")?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(addr) = config.server.metrics_addr.as_deref() {
                match addr.parse::<SocketAddr>() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(e) => warn!("Invalid metrics address '{}': {}", addr, e),
                }
            }
            let port = port.unwrap_or(config.server.port);
            info!("Starting server on port {}", port);
            server::start_server(state, port).await?;
        }
        Commands::SyncCatalog { hotel_id } => {
            let sync = CatalogSync::new(&state.registry, state.store.as_ref());
            let mut failures = 0;
            for hotel in hotels_with_pms(&state, hotel_id).await? {
                match sync.refresh(&hotel).await {
                    Ok(report) => info!(
                        "{} ({}): {} fetched, {} persisted",
                        hotel.name, hotel.id, report.fetched, report.persisted
                    ),
                    Err(e) => {
                        failures += 1;
                        error!("Catalog refresh failed for {}: {}", hotel.name, e);
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} catalog refresh(es) failed");
            }
        }
        Commands::SyncArrivals { date, hotel_id } => {
            let day = date.unwrap_or_else(|| Local::now().date_naive());
            let mut failures = 0;
            for hotel in hotels_with_pms(&state, hotel_id).await? {
                let result = match state.registry.for_hotel(&hotel) {
                    Ok(provider) => provider.sync_arrivals(&hotel, day, state.store.as_ref()).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(applied) => info!("{} ({}): {} arrivals on {}", hotel.name, hotel.id, applied, day),
                    Err(e) => {
                        failures += 1;
                        error!("Arrivals sync failed for {}: {}", hotel.name, e);
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} arrivals sync(s) failed");
            }
        }
        Commands::Normalize { provider, file } => {
            let payload = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let response = webhook::dispatch(&state, &provider, &payload).await;
            println!("{} {}", response.status(), response.body);
        }
        Commands::Seed => {
            let hotels = [
                Hotel::new("Hotel 1", "Berlin", Some("Apaleo"), SANDBOX_HOTEL_ID),
                Hotel::new("Hotel 2", "London", Some("Guestline"), "LON"),
                Hotel::new("Hotel 3", "Paris", None, ""),
            ];
            let existing = state.store.list_hotels().await?;
            for hotel in &hotels {
                if let Some(found) = existing
                    .iter()
                    .find(|h| h.name == hotel.name && h.city == hotel.city)
                {
                    info!("Hotel {} already seeded as {}", found.name, found.id);
                    continue;
                }
                state.store.create_hotel(hotel).await?;
                println!("{} {} ({})", hotel.id, hotel.name, hotel.city);
            }
        }
    }

    Ok(())
}

/// The requested hotel, or every hotel that has a PMS
async fn hotels_with_pms(state: &AppState, hotel_id: Option<Uuid>) -> anyhow::Result<Vec<Hotel>> {
    let hotels = match hotel_id {
        Some(id) => vec![state
            .store
            .find_hotel(id)
            .await?
            .with_context(|| format!("hotel {id} not found"))?],
        None => state.store.list_hotels().await?,
    };
    Ok(hotels
        .into_iter()
        .filter(|h| h.pms_provider_name.is_some())
        .collect())
}
