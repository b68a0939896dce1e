use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use statistics_keeper::registry::SimpleRegistry;
use statistics_keeper::{StatisticsConfig, StatisticsKeeper};
use tracing::info;

mod handlers;
mod load_generator;
mod middleware;
mod scheduler;
mod server;

/// Name of the keeper fed by the request-timing middleware.
pub const HTTP_POINT: &str = "http";

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// One keeper per measurement point, in configuration order.
    pub keepers: IndexMap<String, Arc<StatisticsKeeper>>,

    /// Gauges published by every keeper, polled by `GET /api/metrics`.
    pub registry: SimpleRegistry,

    /// Flag checked by every load-generator worker on each iteration.
    pub load_running: Arc<AtomicBool>,

    /// Handle to the spawned load-generator task so we can await clean shutdown.
    pub load_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl AppState {
    pub fn keeper(&self, name: &str) -> Option<&Arc<StatisticsKeeper>> {
        self.keepers.get(name)
    }

    /// Keepers fed by the load generator (everything but the HTTP timings).
    pub fn pipeline_keepers(&self) -> Vec<Arc<StatisticsKeeper>> {
        self.keepers
            .iter()
            .filter(|(name, _)| name.as_str() != HTTP_POINT)
            .map(|(_, k)| Arc::clone(k))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ObservatoryConfig {
    #[serde(default = "default_bind_addr")]
    bind_addr: String,

    /// Measurement points fed by the simulated pipeline
    #[serde(default = "default_points")]
    points: Vec<String>,

    /// Metric group keepers register their gauges under
    #[serde(default = "default_group")]
    group: String,

    #[serde(default)]
    statistics: StatisticsConfig,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".into()
}
fn default_points() -> Vec<String> {
    vec!["sender.http".into(), "sender.jdbc".into(), "sender.file".into()]
}
fn default_group() -> String {
    "pipeline".into()
}

impl Default for ObservatoryConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            points: default_points(),
            group: default_group(),
            statistics: StatisticsConfig::default(),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ObservatoryConfig> {
    let Some(path) = path else {
        return Ok(ObservatoryConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config: ObservatoryConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config {}", path.display()))?;
    config.statistics.validate()?;
    Ok(config)
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    // ── 1. Configuration ─────────────────────────────────────────
    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref().map(Path::new))?;
    info!(
        basics = %config.statistics.basics,
        boundaries = ?config.statistics.boundaries,
        "statistics observatory starting"
    );

    // ── 2. Keepers + metric registration ─────────────────────────
    let registry = SimpleRegistry::new();
    let mut keepers = IndexMap::new();
    for name in config.points.iter().map(String::as_str).chain([HTTP_POINT]) {
        let keeper = Arc::new(StatisticsKeeper::new(name, &config.statistics)?);
        keeper.init_metrics(&registry, &config.group, &[])?;
        keepers.insert(name.to_string(), keeper);
    }

    // ── 3. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState {
        keepers,
        registry,
        load_running: Arc::new(AtomicBool::new(false)),
        load_handle: tokio::sync::Mutex::new(None),
    });

    // ── 4. Interval scheduler ────────────────────────────────────
    let mark_every = Duration::from_secs(config.statistics.mark_interval_secs.max(1));
    let _marker = scheduler::spawn_mark_full(state.keepers.values().cloned().collect(), mark_every);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let app = server::create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "statistics     → GET /api/statistics");
    info!(addr = %config.bind_addr, "snapshot SSE   → GET /api/statistics/stream");
    info!(addr = %config.bind_addr, "gauges         → GET /api/metrics");

    axum::serve(listener, app).await.context("server exited with error")?;
    Ok(())
}
