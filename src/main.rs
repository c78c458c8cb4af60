mod cache;
mod config;
mod error;
mod metrics;
mod models;
mod permissions;
mod search;
mod sources;

use anyhow::{bail, Context};
use cache::{LocalPropertyIndex, PropertyCache, SystemClock};
use clap::{Parser, Subcommand};
use config::Config;
use metrics::YearMonth;
use permissions::{is_allowed, Action, Role};
use search::PropertySearch;
use sources::OwnerRezClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rental-desk")]
#[command(about = "Booking metrics and property search over the OwnerRez API")]
#[command(version)]
struct Cli {
    /// Role of the caller, as carried by the verified credential
    #[arg(long, value_enum, default_value = "user", global = true)]
    role: Role,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Booking count, revenue and occupancy per month
    Metrics {
        /// First month, as YYYY-MM
        #[arg(short, long)]
        month: String,

        /// Number of consecutive months to report
        #[arg(long, default_value_t = 1)]
        months: u32,
    },

    /// Search properties
    Search {
        /// Filter parameter as key=value (e.g. guests=4, pageSize=50)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Drop the cached property snapshot before searching
        #[arg(long)]
        refresh: bool,
    },
}

/// Shared state owned for the lifetime of the process
struct App {
    config: Config,
    client: OwnerRezClient,
    cache: PropertyCache,
    index: LocalPropertyIndex,
}

impl App {
    async fn new(config: Config) -> anyhow::Result<Self> {
        let client = OwnerRezClient::new(&config).context("Failed to create OwnerRez client")?;
        let cache = PropertyCache::new(config.cache_ttl(), Arc::new(SystemClock));
        let index = match &config.local_properties {
            Some(path) => LocalPropertyIndex::load(path)
                .await
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => LocalPropertyIndex::default(),
        };
        if index.is_empty() {
            info!("No local property records, thumbnails will not be backfilled");
        } else {
            info!("Thumbnail backfill has {} local records", index.len());
        }

        Ok(Self {
            config,
            client,
            cache,
            index,
        })
    }

    async fn metrics(&self, role: Role, month: &str, months: u32) -> anyhow::Result<String> {
        if !is_allowed(role, Action::ViewAllProperties)
            && !is_allowed(role, Action::ViewOwnedProperties)
        {
            bail!("Role {:?} may not view property metrics", role);
        }
        let first = YearMonth::parse(month)
            .with_context(|| format!("Invalid month {month:?}, expected YYYY-MM"))?;
        if months == 0 {
            bail!("--months must be at least 1");
        }

        let mut last = first;
        for _ in 1..months {
            last = last.next();
        }
        let start = first.first_day().format("%Y-%m-%d").to_string();
        let end = last.last_day().format("%Y-%m-%d").to_string();

        let bookings =
            sources::fetch_bookings(&self.client, &start, &end, self.config.page_size).await?;
        let report: Vec<_> =
            metrics::compute_range(&bookings, first, months, self.config.total_properties)
                .into_iter()
                .map(|m| m.redacted_for(role))
                .collect();

        Ok(serde_json::to_string_pretty(&report)?)
    }

    async fn search(
        &self,
        role: Role,
        params: &[String],
        refresh: bool,
    ) -> anyhow::Result<String> {
        if refresh {
            if !is_allowed(role, Action::ClearCache) {
                bail!("Role {:?} may not clear the property cache", role);
            }
            self.cache.clear().await;
        }

        let params = parse_params(params)?;
        let filter = search::parse_filters(&params)?;
        let search = PropertySearch::new(
            &self.client,
            &self.cache,
            &self.index,
            self.config.page_size,
        );
        let results = search.search(&filter).await?;
        Ok(serde_json::to_string_pretty(&results)?)
    }
}

fn parse_params(raw: &[String]) -> anyhow::Result<HashMap<String, String>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .with_context(|| format!("Expected key=value, got {pair:?}"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Missing configuration")?;
    info!("Using OwnerRez at {}", config.base_url);

    let app = App::new(config).await?;

    let run = async {
        match &cli.command {
            Commands::Metrics { month, months } => app.metrics(cli.role, month, *months).await,
            Commands::Search { params, refresh } => app.search(cli.role, params, *refresh).await,
        }
    };

    let output = tokio::select! {
        result = run => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling in-flight requests");
            return Ok(());
        }
    };

    println!("{output}");
    Ok(())
}
