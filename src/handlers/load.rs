use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::load_generator::LoadProfile;
use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Concurrent producer tasks per measurement point
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How long the simulated pipeline runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Median simulated latency (ms)
    #[serde(default = "default_median_ms")]
    pub median_ms: u64,

    /// Percentage of calls that take the slow path (0–100)
    #[serde(default = "default_slow_pct")]
    pub slow_pct: u8,
}

fn default_concurrency() -> u32 {
    4
}
fn default_duration() -> u64 {
    30
}
fn default_median_ms() -> u64 {
    40
}
fn default_slow_pct() -> u8 {
    5
}

impl LoadConfig {
    fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 || self.concurrency > 64 {
            return Err(AppError::BadRequest(
                "concurrency must be between 1 and 64".into(),
            ));
        }
        if self.duration_secs == 0 || self.duration_secs > 3600 {
            return Err(AppError::BadRequest(
                "duration_secs must be between 1 and 3600".into(),
            ));
        }
        if self.median_ms == 0 || self.median_ms > 10_000 {
            return Err(AppError::BadRequest(
                "median_ms must be between 1 and 10000".into(),
            ));
        }
        if self.slow_pct > 100 {
            return Err(AppError::BadRequest(
                "slow_pct must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

/// Flip the flag in one step so only one of two racing starts wins.
/// Workers see it set before they are spawned.
fn claim_run(running: &AtomicBool) -> Result<(), AppError> {
    running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .map(|_| ())
        .map_err(|_| AppError::AlreadyRunning)
}

#[derive(Debug, Serialize)]
pub struct LoadStatus {
    pub running: bool,
    pub message: String,
}

// ─── POST /api/load/start ────────────────────────────────────────

pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(config): Json<LoadConfig>,
) -> Result<Json<LoadStatus>, AppError> {
    config.validate()?;
    claim_run(&state.load_running)?;

    let keepers = state.pipeline_keepers();
    let msg = format!(
        "Started: {} points × {} workers × {}s, median {}ms, {}% slow",
        keepers.len(),
        config.concurrency,
        config.duration_secs,
        config.median_ms,
        config.slow_pct,
    );
    info!("{msg}");

    let running = state.load_running.clone();
    let profile = LoadProfile {
        concurrency: config.concurrency,
        duration_secs: config.duration_secs,
        median_ms: config.median_ms,
        slow_pct: config.slow_pct,
    };
    let handle = tokio::spawn(async move {
        crate::load_generator::run(running, keepers, profile).await;
    });

    // Stash the handle so `stop` can await clean shutdown
    let mut guard = state.load_handle.lock().await;
    *guard = Some(handle);

    Ok(Json(LoadStatus {
        running: true,
        message: msg,
    }))
}

// ─── POST /api/load/stop ─────────────────────────────────────────

pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LoadStatus>, AppError> {
    if !state.load_running.load(Ordering::SeqCst) {
        return Ok(Json(LoadStatus {
            running: false,
            message: "No load is running".into(),
        }));
    }

    state.load_running.store(false, Ordering::SeqCst);

    let mut guard = state.load_handle.lock().await;
    if let Some(handle) = guard.take() {
        // the task may have already finished
        let _ = handle.await;
    }

    Ok(Json(LoadStatus {
        running: false,
        message: "Load stopped".into(),
    }))
}

// ─── GET /api/load/status ────────────────────────────────────────

pub async fn status(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    let running = state.load_running.load(Ordering::SeqCst);
    Json(LoadStatus {
        running,
        message: if running {
            "Load in progress".into()
        } else {
            "Idle".into()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LoadConfig {
        LoadConfig {
            concurrency: default_concurrency(),
            duration_secs: default_duration(),
            median_ms: default_median_ms(),
            slow_pct: default_slow_pct(),
        }
    }

    #[test]
    fn only_one_start_claims_the_run() {
        let running = AtomicBool::new(false);
        let winners = std::thread::scope(|s| {
            let racers: Vec<_> = (0..8)
                .map(|_| s.spawn(|| claim_run(&running).is_ok()))
                .collect();
            racers.into_iter().filter_map(|r| r.join().unwrap().then_some(())).count()
        });
        assert_eq!(winners, 1);
        assert!(running.load(Ordering::SeqCst));

        running.store(false, Ordering::SeqCst);
        assert!(claim_run(&running).is_ok());
    }

    #[test]
    fn rejects_out_of_range_config() {
        let mut bad = config();
        bad.slow_pct = 101;
        assert!(matches!(bad.validate(), Err(AppError::BadRequest(_))));
        assert!(config().validate().is_ok());
    }
}
