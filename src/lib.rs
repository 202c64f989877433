//! QR-coded short links: property name → destination URL, served as
//! `<base_url>/<code>` redirects.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::Mutex;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod qr;
pub mod shortcode;
pub mod storage;

use config::{AppConfig, StorageBackend};
use qr::{QrDelivery, QrGenerator};
use storage::{GitSyncStore, JsonFileStore, LinkStore};

/// Path prefix under which on-disk QR images are served.
pub const QR_ROUTE: &str = "/static/qrcodes";

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn LinkStore>,
    pub qr: QrGenerator,
    /// Serializes load → mutate → save for submissions handled by this
    /// process. Separate processes sharing a store still race.
    pub write_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn LinkStore>) -> Self {
        let qr = QrGenerator::new(config.base_url.clone(), config.qr_scale);
        Self {
            config,
            store,
            qr,
            write_lock: Mutex::new(()),
        }
    }
}

/// Build the configured backing store.
pub fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn LinkStore>> {
    Ok(match config.storage {
        StorageBackend::File => Arc::new(JsonFileStore::new(&config.data_file)),
        StorageBackend::Git => {
            let git = config
                .git
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("git storage selected without git settings"))?;
            Arc::new(GitSyncStore::new(git))
        }
    })
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn app(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route(
            "/",
            get(handlers::index::form).post(handlers::index::submit),
        )
        .route("/health", get(|| async { axum::http::StatusCode::OK }));

    if state.config.qr_delivery == QrDelivery::File {
        router = router.nest_service(QR_ROUTE, ServeDir::new(&state.config.qr_dir));
    }

    router
        // Short-link redirect. Static routes above take priority.
        .route("/:code", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
