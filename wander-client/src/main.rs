//! Wander - travel destination recommendations from the command line
//!
//! Collects search criteria as flags, submits them to the recommendation
//! service, and prints the ranked results. Bookmarked destinations are kept in
//! the data folder across runs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wander_client::favorites::SaveOutcome;
use wander_client::render;
use wander_client::{
    ClientError, FavoritesStore, FileSlot, HttpGateway, RecommendationGateway,
    SearchOrchestrator, SortKey, SubmitOutcome,
};
use wander_common::config::{
    load_toml_config_or_default, user_config_path, write_toml_config, ConfigOverrides,
    LoggingConfig, ResolvedConfig, TomlConfig,
};
use wander_common::events::{EventBus, LifecyclePhase, SearchEvent};
use wander_common::models::{Location, SearchCriteria};

/// Command-line arguments for wander
#[derive(Parser, Debug)]
#[command(name = "wander")]
#[command(about = "Travel destination recommendations")]
#[command(version)]
struct Args {
    /// Recommendation service base URL
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Folder holding saved destinations
    #[arg(long, global = true)]
    data_folder: Option<PathBuf>,

    /// Config file (default: platform config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the allowed Climate, BudgetLevel and Accessibility values
    Options,

    /// List regions for a location
    Regions {
        /// "India" or "Outside India"
        #[arg(long, default_value = "India")]
        location: Location,
    },

    /// Search for destinations
    Search(SearchArgs),

    /// List saved destinations
    Favorites,

    /// Check the recommendation service
    Health,

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a config file holding the current settings
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// "India" or "Outside India"
    #[arg(long, default_value = "India")]
    location: Location,

    /// Region within India
    #[arg(long)]
    state: Option<String>,

    #[arg(long)]
    climate: Option<String>,

    #[arg(long)]
    budget_level: Option<String>,

    /// Average trip cost in INR
    #[arg(long)]
    avg_cost: Option<String>,

    /// Average temperature in °C
    #[arg(long)]
    avg_temp: Option<String>,

    /// Minimum acceptable safety, 0-10
    #[arg(long)]
    safety_index: Option<String>,

    #[arg(long)]
    accessibility: Option<String>,

    /// Transport cost in INR
    #[arg(long)]
    transport_cost: Option<String>,

    /// Desired popularity, 0-100 (default 50)
    #[arg(long)]
    popularity: Option<String>,

    /// Desired rating, 0-5 (default 3)
    #[arg(long)]
    rating: Option<String>,

    /// Number of results (default 10, at most 50)
    #[arg(long)]
    top_k: Option<u32>,

    /// Sort by rating, cost or popularity
    #[arg(long, default_value = "rating")]
    sort: SortKey,

    /// Show details for these positions (1-based, repeatable)
    #[arg(long, value_delimiter = ',')]
    expand: Vec<usize>,

    /// Save these positions to favorites (1-based, repeatable)
    #[arg(long, value_delimiter = ',')]
    save: Vec<usize>,
}

impl SearchArgs {
    fn criteria(&self) -> SearchCriteria {
        let mut criteria = SearchCriteria::default();
        criteria.set_location(self.location);
        if self.location == Location::India {
            criteria.state = self.state.clone().unwrap_or_default();
        }

        let fill = |target: &mut String, value: &Option<String>| {
            if let Some(value) = value {
                *target = value.clone();
            }
        };
        fill(&mut criteria.climate, &self.climate);
        fill(&mut criteria.budget_level, &self.budget_level);
        fill(&mut criteria.avg_cost_inr, &self.avg_cost);
        fill(&mut criteria.avg_temp_c, &self.avg_temp);
        fill(&mut criteria.safety_index, &self.safety_index);
        fill(&mut criteria.accessibility, &self.accessibility);
        fill(&mut criteria.transport_cost_inr, &self.transport_cost);
        fill(&mut criteria.popularity_score, &self.popularity);
        fill(&mut criteria.rating, &self.rating);
        if self.top_k.is_some() {
            criteria.top_k = self.top_k;
        }
        criteria
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_toml_config_or_default(args.config.as_deref());
    let config = ResolvedConfig::resolve(
        ConfigOverrides {
            service_url: args.service_url.clone(),
            request_timeout_secs: args.timeout_secs,
            data_folder: args.data_folder.clone(),
            log_level: args.log_level.clone(),
        },
        &toml_config,
    );

    init_tracing(&config.logging)?;
    info!(
        service_url = %config.service_url,
        data_folder = %config.data_folder.display(),
        timeout_secs = config.request_timeout.as_secs(),
        "Configuration resolved"
    );

    match args.command {
        Command::Options => run_options(&config).await,
        Command::Regions { location } => run_regions(&config, location).await,
        Command::Search(search) => run_search(&config, &search).await,
        Command::Favorites => run_favorites(&config),
        Command::Health => run_health(&config).await,
        Command::Config {
            action: ConfigAction::Init { force },
        } => run_config_init(args.config, &config, force),
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Output goes to the configured
/// log file, or stderr so stdout carries only results.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,wander={0},wander_client={0},wander_common={0}",
            logging.level
        ))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = match logging.file {
        Some(_) => None,
        None => Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

fn build_gateway(config: &ResolvedConfig) -> Result<Arc<HttpGateway>> {
    let gateway = HttpGateway::new(config.service_url.clone(), config.request_timeout)
        .context("Failed to create HTTP client")?;
    Ok(Arc::new(gateway))
}

async fn run_options(config: &ResolvedConfig) -> Result<()> {
    let orchestrator = SearchOrchestrator::new(build_gateway(config)?);
    let source = orchestrator.load_encoder_options().await;
    let options = orchestrator
        .encoder_options()
        .await
        .ok_or_else(|| anyhow!("Encoder options were not loaded"))?;
    print!("{}", render::render_options(&options, source));
    Ok(())
}

async fn run_regions(config: &ResolvedConfig, location: Location) -> Result<()> {
    let orchestrator = SearchOrchestrator::new(build_gateway(config)?);
    let regions = orchestrator.load_regions(location).await;
    if regions.is_empty() {
        println!("No regions for {}", location);
    }
    for region in regions {
        println!("{}", region);
    }
    Ok(())
}

async fn run_search(config: &ResolvedConfig, search: &SearchArgs) -> Result<()> {
    let event_bus = EventBus::default();
    let indicator = spawn_loading_indicator(&event_bus);
    let orchestrator = SearchOrchestrator::with_event_bus(build_gateway(config)?, event_bus);
    orchestrator.load_encoder_options().await;

    let mut store = FavoritesStore::load(FileSlot::in_folder(&config.data_folder))
        .with_event_bus(orchestrator.event_bus().clone());

    let outcome = match orchestrator.submit(&search.criteria()).await {
        Ok(outcome) => outcome,
        Err(ClientError::Validation(errors)) => {
            eprint!("Please fix the following:\n{}", render::render_field_errors(&errors));
            bail!("Invalid search criteria ({} field errors)", errors.len());
        }
        Err(e) => return Err(e.into()),
    };
    indicator.abort();

    match outcome {
        SubmitOutcome::Completed { .. } => {}
        SubmitOutcome::Failed { message, .. } => bail!("{}", message),
        SubmitOutcome::Superseded { request_id } => {
            bail!("Search {} was superseded by a newer search", request_id)
        }
    }

    let rendered = orchestrator
        .with_results(|view| -> Result<String> {
            view.set_sort_key(search.sort);
            for position in &search.expand {
                if !position.checked_sub(1).is_some_and(|i| view.set_expanded(i, true)) {
                    warn!(position, "No result at position, nothing to expand");
                }
            }
            for position in &search.save {
                match position.checked_sub(1).map(|i| view.save(i, &mut store)) {
                    Some(Ok(Some(SaveOutcome::Saved))) => {
                        info!(position, "Saved to favorites")
                    }
                    Some(Ok(Some(SaveOutcome::AlreadySaved))) => {
                        info!(position, "Already in favorites")
                    }
                    Some(Err(e)) => {
                        return Err(e).context("Failed to save favorite");
                    }
                    Some(Ok(None)) | None => {
                        warn!(position, "No result at position, nothing to save")
                    }
                }
            }
            Ok(render::render_results(view, &store))
        })
        .await
        .ok_or_else(|| anyhow!("Search finished without results"))??;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Print a notice on stderr whenever a search enters `Loading`
fn spawn_loading_indicator(event_bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SearchEvent::StateChanged {
                    new_state: LifecyclePhase::Loading,
                    ..
                }) => eprintln!("Finding your perfect destinations..."),
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn run_favorites(config: &ResolvedConfig) -> Result<()> {
    let store = FavoritesStore::load(FileSlot::in_folder(&config.data_folder));
    print!("{}", render::render_favorites(store.records()));
    Ok(())
}

async fn run_health(config: &ResolvedConfig) -> Result<()> {
    let gateway = build_gateway(config)?;
    let health = gateway
        .health()
        .await
        .with_context(|| format!("Service at {} is not reachable", config.service_url))?;
    print!("{}", render::render_health(&health));
    Ok(())
}

fn run_config_init(path: Option<PathBuf>, config: &ResolvedConfig, force: bool) -> Result<()> {
    let path = path
        .or_else(user_config_path)
        .ok_or_else(|| anyhow!("No config directory on this platform; pass --config"))?;

    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }

    let toml_config = TomlConfig {
        service_url: Some(config.service_url.clone()),
        request_timeout_secs: Some(config.request_timeout.as_secs()),
        data_folder: Some(config.data_folder.clone()),
        logging: config.logging.clone(),
    };
    write_toml_config(&toml_config, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_args(flags: &[&str]) -> SearchArgs {
        let argv = ["wander", "search"].iter().chain(flags).copied();
        match Args::try_parse_from(argv).unwrap().command {
            Command::Search(search) => search,
            other => panic!("expected search command, got {:?}", other),
        }
    }

    #[test]
    fn test_state_is_dropped_outside_india() {
        let criteria = search_args(&["--location", "outside", "--state", "Kerala"]).criteria();

        assert_eq!(criteria.location, Location::OutsideIndia);
        assert_eq!(criteria.state, "");
    }

    #[test]
    fn test_state_is_kept_for_india() {
        let criteria = search_args(&["--state", "Kerala"]).criteria();

        assert_eq!(criteria.location, Location::India);
        assert_eq!(criteria.state, "Kerala");
    }

    #[test]
    fn test_omitted_flags_keep_defaults() {
        let criteria = search_args(&["--climate", "Tropical"]).criteria();

        assert_eq!(criteria.climate, "Tropical");
        assert_eq!(criteria.popularity_score, "50");
        assert_eq!(criteria.rating, "3");
        assert_eq!(criteria.top_k, Some(10));
        assert_eq!(criteria.avg_cost_inr, "");
    }

    #[test]
    fn test_flags_fill_criteria() {
        let criteria = search_args(&[
            "--avg-cost",
            "20000",
            "--popularity",
            "75",
            "--top-k",
            "7",
        ])
        .criteria();

        assert_eq!(criteria.avg_cost_inr, "20000");
        assert_eq!(criteria.popularity_score, "75");
        assert_eq!(criteria.top_k, Some(7));
    }

    #[test]
    fn test_positions_accept_comma_lists() {
        let search = search_args(&["--expand", "1,1", "--save", "2", "--save", "3"]);

        assert_eq!(search.expand, vec![1, 1]);
        assert_eq!(search.save, vec![2, 3]);
        assert_eq!(search.sort, SortKey::Rating);
    }
}
