use std::{
    collections::VecDeque,
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    analysis::{calculate_animal_value, AnimalValue},
    diff::ChangeSet,
    engine::{Dashboard, DashboardSettings, Refresh},
    farm::{DataSource, FarmSnapshot, FarmStatistics},
    pasture::Pasture,
    snapshot::SnapshotLoader,
};

/// A significant change set as surfaced to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub refreshed_at: DateTime<Utc>,
    pub day: i64,
    pub changes: ChangeSet,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEnvelope {
    pub name: String,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub snapshot: Option<Arc<FarmSnapshot>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastureView {
    #[serde(flatten)]
    pub pasture: Pasture,
    pub total_value: u64,
    pub occupancy: f64,
}

impl From<&Pasture> for PastureView {
    fn from(pasture: &Pasture) -> Self {
        Self {
            total_value: pasture.total_value(),
            occupancy: pasture.occupancy(),
            pasture: pasture.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalValuation {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub value: AnimalValue,
}

/// Latest derived state plus the bounded notification history.
#[derive(Clone)]
pub struct LiveState {
    name: String,
    broadcaster: broadcast::Sender<String>,
    latest: Arc<Mutex<Option<Refresh>>>,
    notifications: Arc<Mutex<VecDeque<Notification>>>,
    history: usize,
}

impl LiveState {
    pub fn new(name: impl Into<String>, history: usize) -> Self {
        let (broadcaster, _) = broadcast::channel::<String>(512);
        Self {
            name: name.into(),
            broadcaster,
            latest: Arc::new(Mutex::new(None)),
            notifications: Arc::new(Mutex::new(VecDeque::new())),
            history,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcaster.subscribe()
    }

    /// Stores the refresh and, when it carries significant changes, records
    /// and broadcasts a notification.
    pub fn apply(&self, refresh: Refresh) {
        let notification = match &refresh.changes {
            Some(changes) if changes.has_significant_changes => Some(Notification {
                refreshed_at: refresh.refreshed_at,
                day: refresh.snapshot.game_time.day,
                changes: changes.clone(),
            }),
            _ => None,
        };
        {
            let mut guard = self.latest.lock().expect("latest state lock poisoned");
            *guard = Some(refresh);
        }

        let Some(notification) = notification else {
            return;
        };
        if let Ok(payload) = serde_json::to_string(&notification) {
            let _ = self.broadcaster.send(payload);
        }
        let mut guard = self
            .notifications
            .lock()
            .expect("notifications lock poisoned");
        guard.push_back(notification);
        while guard.len() > self.history {
            guard.pop_front();
        }
    }

    pub fn snapshot(&self) -> Option<Arc<FarmSnapshot>> {
        self.latest
            .lock()
            .expect("latest state lock poisoned")
            .as_ref()
            .map(|refresh| refresh.snapshot.clone())
    }

    pub fn envelope(&self) -> StateEnvelope {
        let guard = self.latest.lock().expect("latest state lock poisoned");
        StateEnvelope {
            name: self.name.clone(),
            refreshed_at: guard.as_ref().map(|refresh| refresh.refreshed_at),
            snapshot: guard.as_ref().map(|refresh| refresh.snapshot.clone()),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("notifications lock poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

pub struct WebServerConfig {
    pub name: String,
    pub snapshot_path: PathBuf,
    pub source: DataSource,
    pub refresh_seconds: u64,
    pub history: usize,
    pub host: String,
    pub port: u16,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        name,
        snapshot_path,
        source,
        refresh_seconds,
        history,
        host,
        port,
    } = config;

    let state = LiveState::new(name.clone(), history);
    let poller_state = state.clone();
    tokio::spawn(async move {
        let mut dashboard = Dashboard::new(DashboardSettings { name });
        let loader = SnapshotLoader::new(".");
        let mut ticker = tokio::time::interval(Duration::from_secs(refresh_seconds.max(1)));
        loop {
            ticker.tick().await;
            poll_once(&mut dashboard, &loader, &snapshot_path, source, &poller_state).await;
        }
    });

    let router = router(state);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!(%addr, "herd dashboard listening (Ctrl+C to stop)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// A failed read or ingest keeps the previous state.
async fn poll_once(
    dashboard: &mut Dashboard,
    loader: &SnapshotLoader,
    path: &std::path::Path,
    source: DataSource,
    state: &LiveState,
) {
    let mut raw = match loader.load_async(path).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "snapshot read failed");
            return;
        }
    };
    raw.source = source;
    match dashboard.refresh(&raw) {
        Ok(refresh) => state.apply(refresh),
        Err(err) => warn!(error = %err, "snapshot ingest failed"),
    }
}

pub fn router(state: LiveState) -> Router {
    Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/pastures", get(pastures))
        .route("/api/pastures/:id", get(pasture))
        .route("/api/animals/:id/value", get(animal_value))
        .route("/api/statistics", get(statistics))
        .route("/api/notifications", get(notifications))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down herd dashboard");
}

async fn latest_state(State(state): State<LiveState>) -> Json<StateEnvelope> {
    Json(state.envelope())
}

async fn pastures(State(state): State<LiveState>) -> Json<Vec<PastureView>> {
    let views = state
        .snapshot()
        .map(|snapshot| snapshot.pastures.iter().map(PastureView::from).collect())
        .unwrap_or_default();
    Json(views)
}

async fn pasture(
    State(state): State<LiveState>,
    Path(id): Path<String>,
) -> Result<Json<PastureView>, StatusCode> {
    state
        .snapshot()
        .and_then(|snapshot| snapshot.pasture(&id).map(PastureView::from))
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn animal_value(
    State(state): State<LiveState>,
    Path(id): Path<String>,
) -> Result<Json<AnimalValuation>, StatusCode> {
    let snapshot = state.snapshot().ok_or(StatusCode::NOT_FOUND)?;
    let animal = snapshot.animal(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(AnimalValuation {
        id: animal.id.clone(),
        name: animal.display_name().to_string(),
        value: calculate_animal_value(animal),
    }))
}

async fn statistics(State(state): State<LiveState>) -> Json<FarmStatistics> {
    let stats = match state.snapshot() {
        Some(snapshot) => snapshot.statistics(),
        None => FarmSnapshot::default().statistics(),
    };
    Json(stats)
}

async fn notifications(State(state): State<LiveState>) -> Json<Vec<Notification>> {
    Json(state.notifications())
}

async fn stream_events(
    State(state): State<LiveState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().event("changes").data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::RawSnapshot;
    use serde_json::json;

    fn raw(animals: serde_json::Value) -> RawSnapshot {
        serde_json::from_value(json!({
            "gameTime": {"currentDay": 3},
            "husbandries": [{"id": "barn", "name": "Barn", "animals": animals}],
            "animals": []
        }))
        .unwrap()
    }

    #[test]
    fn first_refresh_has_no_notification() {
        let state = LiveState::new("test", 5);
        let mut dashboard = Dashboard::new(DashboardSettings { name: "test".into() });
        state.apply(dashboard.refresh(&raw(json!([{"id": "1", "subType": "COW_HOLSTEIN"}]))).unwrap());
        assert!(state.notifications().is_empty());
        assert!(state.envelope().snapshot.is_some());
    }

    #[test]
    fn history_is_bounded() {
        let state = LiveState::new("test", 2);
        let mut dashboard = Dashboard::new(DashboardSettings { name: "test".into() });
        let mut rx = state.subscribe();
        for n in 1..=4 {
            let herd: Vec<_> = (0..n)
                .map(|i| json!({"id": format!("a{i}"), "subType": "COW_HOLSTEIN"}))
                .collect();
            state.apply(dashboard.refresh(&raw(json!(herd))).unwrap());
        }
        let kept = state.notifications();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].changes.livestock.added.len(), 1);
        assert!(rx.try_recv().is_ok());
    }
}
