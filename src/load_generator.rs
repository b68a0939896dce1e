use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use statistics_keeper::StatisticsKeeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Shape of the simulated pipeline traffic.
#[derive(Debug, Clone, Copy)]
pub struct LoadProfile {
    pub concurrency: u32,
    pub duration_secs: u64,
    pub median_ms: u64,
    pub slow_pct: u8,
}

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` producers per keeper, each feeding simulated call
/// latencies until the deadline or the `running` flag is cleared.
pub async fn run(
    running: Arc<AtomicBool>,
    keepers: Vec<Arc<StatisticsKeeper>>,
    profile: LoadProfile,
) {
    let deadline = Instant::now() + Duration::from_secs(profile.duration_secs);

    let mut handles = Vec::with_capacity(keepers.len() * profile.concurrency as usize);
    for (point, keeper) in keepers.iter().enumerate() {
        for worker_id in 0..profile.concurrency {
            let running = running.clone();
            let keeper = keeper.clone();
            let seed = 1000 + (point as u64) * 100 + worker_id as u64;

            handles.push(tokio::spawn(async move {
                producer(seed, running, keeper, deadline, profile).await;
            }));
        }
    }

    for h in handles {
        let _ = h.await;
    }

    running.store(false, Ordering::SeqCst);
}

// ─── Producer loop ───────────────────────────────────────────────

async fn producer(
    seed: u64,
    running: Arc<AtomicBool>,
    keeper: Arc<StatisticsKeeper>,
    deadline: Instant,
    profile: LoadProfile,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut produced = 0u64;

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let latency = simulated_latency(&mut rng, profile.median_ms, profile.slow_pct);

        let t0 = Instant::now();
        tokio::time::sleep(Duration::from_millis(latency)).await;
        keeper.add_duration(t0.elapsed());
        produced += 1;
    }

    debug!(keeper = keeper.name(), seed, produced, "producer finished");
}

/// Spread around `median_ms`; `slow_pct` percent of calls land 10–50× slower.
fn simulated_latency(rng: &mut StdRng, median_ms: u64, slow_pct: u8) -> u64 {
    let jitter: f64 = rng.gen_range(0.5..1.5);
    let base = (median_ms as f64 * jitter).round() as u64;
    if rng.gen_range(0u8..100) < slow_pct {
        base * rng.gen_range(10..=50)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latencies_stay_in_envelope() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let fast = simulated_latency(&mut rng, 40, 0);
            assert!((20..=60).contains(&fast), "{fast}");
        }
        for _ in 0..100 {
            let slow = simulated_latency(&mut rng, 40, 100);
            assert!(slow >= 200, "{slow}");
        }
    }
}
