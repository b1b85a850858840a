//! ==============================================================================
//! main.rs - gps dashboard host entry point
//! ==============================================================================
//!
//! purpose:
//!     reads gps events from a serial-connected microcontroller and shows the
//!     latest one on a live map behind a (demo) login.
//!
//! responsibilities:
//!     - load configuration and start logging
//!     - seed the dashboard from the record file left by the previous run
//!     - run the serial ingest task on a blocking thread
//!     - run the refresh loop that turns readings into dashboard snapshots
//!     - serve the web dashboard
//!
//! relationships:
//!     - uses: ingest.rs (serial reader), store.rs (record file)
//!     - uses: view.rs (snapshots), web.rs (http), auth.rs (login gate)
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                     rust host (this file)                     │
//!     │  ┌──────────────┐   watch    ┌──────────────┐                │
//!     │  │ serial ingest│ ─────────> │ refresh loop │                │
//!     │  │ (blocking)   │            │ (2s cycle)   │                │
//!     │  └──────┬───────┘            └──────┬───────┘                │
//!     │         │ atomic write              │ write                  │
//!     │         ▼                           ▼                        │
//!     │  coordinates.json           Arc<RwLock<AppState>>            │
//!     │  (seed on restart)                  │ read                   │
//!     │                              ┌──────┴───────┐                │
//!     │                              │  web server  │ <- browser     │
//!     │                              │ (port 3000)  │                │
//!     │                              └──────────────┘                │
//!     └──────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

mod auth;
mod config;
mod domain;
mod ingest;
mod pages;
mod session;
mod store;
mod view;
mod web;

use anyhow::Result;
use domain::LatestReading;
use std::io::BufReader;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing_subscriber::EnvFilter;
use view::DashboardView;

// ==============================================================================
// shared state
// ==============================================================================
// the snapshot shared between:
// - the refresh loop (writes a new snapshot every cycle)
// - the web server (reads for dashboard and api)

#[derive(Clone, Default, serde::Serialize)]
pub struct AppState {
    /// latest reading as received
    pub reading: LatestReading,
    /// what the dashboard renders for it
    pub view: DashboardView,
    /// unix timestamp (ms) of the last reading change
    pub last_update: u64,
}

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    println!("===========================================================");
    println!("  GPS Event Dashboard Host");
    println!("===========================================================");

    // step 1: load configuration and start logging
    let config = config::HostConfig::load_or_default();
    config.print_summary();
    init_tracing(&config.logging.level);

    // step 2: seed shared state from the last persisted reading
    let store = store::RecordStore::new(&config.storage.record_file);
    let seed = store.load();
    tracing::info!("[STARTUP] Last reading from {}: {:?}", store.path().display(), seed);
    let (tx, mut rx) = watch::channel(seed);
    let state = Arc::new(RwLock::new(AppState::default()));
    refresh_snapshot(&state, &mut rx, true).await;

    // step 3: demo login gate
    let auth = match auth::DemoAuth::from_config(&config.auth) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("[STARTUP] Fatal: failed to load credentials: {:#}", e);
            return Err(e);
        }
    };

    // step 4: serial ingest on a blocking thread
    let ingest_config = config.clone();
    tokio::task::spawn_blocking(move || run_ingest(ingest_config, store, tx));

    // step 5: web server in background
    let ctx = web::WebContext {
        state: state.clone(),
        sessions: session::SessionStore::new(),
        auth: Arc::new(auth),
        brand: config.auth.default_section.clone(),
        refresh_ms: config.dashboard.refresh_ms,
        zoom: config.dashboard.zoom,
    };
    let bind_addr = config.dashboard.bind_addr.clone();
    tokio::spawn(async move {
        tracing::info!("[STARTUP] ✓ Dashboard live at http://{}", bind_addr);
        if let Err(e) = web::run_server(ctx, &bind_addr).await {
            tracing::error!("[ERROR] Web server error: {:#}", e);
        }
    });

    // step 6: refresh loop
    tracing::info!("[RUNTIME] Refreshing dashboard every {}ms", config.dashboard.refresh_ms);
    let mut ticker = tokio::time::interval(config.dashboard.refresh_interval());
    loop {
        ticker.tick().await;
        refresh_snapshot(&state, &mut rx, false).await;
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// blocking body of the ingest task
///
/// returns only when the port cannot be opened or the stream closes.
fn run_ingest(config: config::HostConfig, store: store::RecordStore, tx: watch::Sender<LatestReading>) {
    let port = match ingest::open_port(&config.serial) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("[SERIAL] ⚠ {:#} - dashboard will not update", e);
            return;
        }
    };
    tracing::info!("[SERIAL] ✓ Listening on {} @ {} baud", config.serial.port, config.serial.baud_rate);

    let mut state = ingest::IngestState::new(config.ingest.empty_condition);
    let mut sink = ingest::RecordPublisher::new(store, tx);
    ingest::run(
        BufReader::new(port),
        &mut state,
        &mut sink,
        config.serial.retry_pause(),
        config.logging.show_serial_lines,
    );
}

/// rebuild the dashboard snapshot from the latest published reading
///
/// `force` rebuilds even when nothing new was published.
async fn refresh_snapshot(state: &RwLock<AppState>, rx: &mut watch::Receiver<LatestReading>, force: bool) {
    // Err means the ingest task is gone; the last value stays readable
    let changed = rx.has_changed().unwrap_or(false);
    if !changed && !force {
        return;
    }

    let reading = rx.borrow_and_update().clone();
    let view = DashboardView::from_reading(&reading);

    let mut guard = state.write().await;
    guard.reading = reading;
    guard.view = view;
    guard.last_update = timestamp_ms();
}

/// current unix time in milliseconds
fn timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp() {
        let ts = timestamp_ms();
        // should be after 2024
        assert!(ts > 1700000000000, "timestamp should be after 2024");
    }

    #[tokio::test]
    async fn test_refresh_follows_published_reading() {
        let (tx, mut rx) = watch::channel(LatestReading::empty());
        let state = RwLock::new(AppState::default());

        refresh_snapshot(&state, &mut rx, true).await;
        assert_eq!(state.read().await.view, DashboardView::AllClear);
        let first_update = state.read().await.last_update;
        assert!(first_update > 0);

        tx.send_replace(LatestReading {
            condition: "ALERT-tilt".into(),
            lat: "12.5".into(),
            lon: "77.5".into(),
        });
        refresh_snapshot(&state, &mut rx, false).await;
        {
            let guard = state.read().await;
            assert_eq!(guard.reading.condition, "ALERT-tilt");
            assert!(matches!(guard.view, DashboardView::Event { lat, lon, .. } if lat == 12.5 && lon == 77.5));
        }

        tx.send_replace(LatestReading::empty());
        refresh_snapshot(&state, &mut rx, false).await;
        assert_eq!(state.read().await.view, DashboardView::AllClear);
    }

    #[tokio::test]
    async fn test_refresh_after_ingest_stops() {
        let (tx, mut rx) = watch::channel(LatestReading {
            condition: "tilt".into(),
            lat: "1".into(),
            lon: "2".into(),
        });
        drop(tx);

        let state = RwLock::new(AppState::default());
        refresh_snapshot(&state, &mut rx, true).await;
        refresh_snapshot(&state, &mut rx, false).await;
        assert_eq!(state.read().await.reading.condition, "tilt");
    }

    #[tokio::test]
    async fn test_seed_from_record_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store::RecordStore::new(dir.path().join("coordinates.json"));
        let saved = LatestReading { condition: "height".into(), lat: "3".into(), lon: "4".into() };
        store.save(&saved).unwrap();

        let (_tx, mut rx) = watch::channel(store.load());
        let state = RwLock::new(AppState::default());
        refresh_snapshot(&state, &mut rx, true).await;
        assert_eq!(state.read().await.reading, saved);
    }
}
