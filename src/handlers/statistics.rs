use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use indexmap::IndexMap;
use serde::Serialize;
use statistics_keeper::registry::MetricId;
use statistics_keeper::statistics::{ItemType, MapValue, StatisticsSnapshot};
use statistics_keeper::{Action, StatisticsKeeper};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::info;

use crate::AppState;

use super::AppError;

// ─── Response types ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SchemaField {
    pub name: String,
    pub kind: ItemType,
}

#[derive(Debug, Serialize)]
pub struct Schema {
    /// Layout of `GET /api/statistics` rows
    pub map: Vec<SchemaField>,
    /// Indexed items shared by the cumulative and interval views
    pub items: Vec<SchemaField>,
}

#[derive(Debug, Serialize)]
pub struct ActionResult {
    pub keeper: String,
    pub action: String,
    pub closed_count: u64,
}

#[derive(Debug, Serialize)]
pub struct GaugeReading {
    #[serde(flatten)]
    pub id: MetricId,
    pub value: Option<f64>,
}

// ─── GET /api/statistics ─────────────────────────────────────────
/// One display row per keeper.

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<IndexMap<String, MapValue>>> {
    Json(state.keepers.values().map(|k| k.as_map()).collect())
}

// ─── GET /api/statistics/snapshot ────────────────────────────────

pub async fn snapshots(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<StatisticsSnapshot>> {
    Json(state.keepers.values().map(|k| k.snapshot()).collect())
}

// ─── GET /api/statistics/:name ───────────────────────────────────

pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<StatisticsSnapshot>, AppError> {
    let keeper = find(&state, &name)?;
    Ok(Json(keeper.snapshot()))
}

// ─── GET /api/statistics/schema ──────────────────────────────────

pub async fn schema(State(state): State<Arc<AppState>>) -> Json<Schema> {
    let map = StatisticsKeeper::labels()
        .into_iter()
        .zip(StatisticsKeeper::types())
        .map(|(name, kind)| SchemaField { name, kind })
        .collect();
    let items = state
        .keepers
        .values()
        .next()
        .map(|k| {
            k.items()
                .iter()
                .map(|item| SchemaField {
                    name: item.name.clone(),
                    kind: item.kind,
                })
                .collect()
        })
        .unwrap_or_default();
    Json(Schema { map, items })
}

// ─── POST /api/statistics/:name/actions/:action ──────────────────

pub async fn perform_action(
    State(state): State<Arc<AppState>>,
    Path((name, action)): Path<(String, String)>,
) -> Result<Json<ActionResult>, AppError> {
    let keeper = find(&state, &name)?;
    let action: Action = action.parse()?;
    let closed = keeper.perform_action(action);
    info!(keeper = %name, %action, closed = closed.count, "action performed on request");

    Ok(Json(ActionResult {
        keeper: name,
        action: action.to_string(),
        closed_count: closed.count,
    }))
}

// ─── GET /api/metrics ────────────────────────────────────────────
/// Scrape of every registered gauge.

pub async fn gauges(State(state): State<Arc<AppState>>) -> Json<Vec<GaugeReading>> {
    Json(
        state
            .registry
            .scrape()
            .into_iter()
            .map(|(id, value)| GaugeReading { id, value })
            .collect(),
    )
}

// ─── GET /api/statistics/stream ──────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes every keeper's snapshot as JSON every 500 ms.

pub async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshots: Vec<_> = state.keepers.values().map(|k| k.snapshot()).collect();
        let json = serde_json::to_string(&snapshots).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn find<'a>(state: &'a AppState, name: &str) -> Result<&'a Arc<StatisticsKeeper>, AppError> {
    state
        .keeper(name)
        .ok_or_else(|| AppError::NotFound(format!("no statistics for '{name}'")))
}
