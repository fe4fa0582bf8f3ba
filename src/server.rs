//!
//! folio-admin HTTP server
//! ------------------------
//! Axum router exposing the collection store and the file gateway to the admin panel.
//!
//! Responsibilities:
//! - Build shared state (collection registry over JSON snapshots, file gateway).
//! - Optional admin-token gate (`x-admin-token`) on every route except the health check.
//! - Render every failure as `{"status":"error","kind","code","message"}`.
//! - Run blocking store/filesystem work on tokio's blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderMap;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tracing::{error, info};

use crate::collections::CollectionRegistry;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::gateway::{ExcludeSet, FileSystemGateway};
use crate::locks::KeyedLocks;
use crate::storage::{JsonFileBackend, SharedBackend};

pub mod collections_api;
pub mod files_api;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
pub const REVISION_HEADER: &str = "x-collection-revision";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub collections: CollectionRegistry,
    pub gateway: Arc<FileSystemGateway>,
    /// When set, every API call must present it in `x-admin-token`.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    /// Wire the default collections over `backend` and a gateway over `content_root`.
    pub fn new(backend: SharedBackend, gateway: FileSystemGateway, admin_token: Option<String>) -> AppResult<Self> {
        let collections = CollectionRegistry::with_defaults(backend, Arc::new(KeyedLocks::new()))?;
        Ok(Self { collections, gateway: Arc::new(gateway), admin_token: admin_token.map(Arc::from) })
    }

    pub fn from_config(cfg: &ServerConfig) -> anyhow::Result<Self> {
        let backend = JsonFileBackend::new(&cfg.data_dir)
            .with_context(|| format!("While opening data dir: {}", cfg.data_dir.display()))?;
        info!(target: "startup", "collection backend: {}", crate::storage::SnapshotBackend::describe(&backend));
        let excludes = ExcludeSet::new(&cfg.excludes).context("While compiling tree exclusions")?;
        let gateway = FileSystemGateway::new(&cfg.content_root, excludes, Arc::new(KeyedLocks::new()))
            .with_context(|| format!("While opening content root: {}", cfg.content_root.display()))?;
        let state = Self::new(Arc::new(backend), gateway, cfg.admin_token.clone())?;
        Ok(state)
    }
}

pub(crate) fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = state.admin_token.as_deref() else { return Ok(()); };
    let provided = headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if provided == Some(expected) {
        Ok(())
    } else {
        Err(AppError::unauthorized("admin_token".to_string(), "missing or invalid admin token".to_string()))
    }
}

/// Run store or filesystem work off the async workers. A panic becomes a 500.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(res) => res,
        Err(join_err) => {
            error!(target: "panic", "request task failed: {}", join_err);
            Err(AppError::internal("internal_panic".to_string(), "internal server error".to_string()))
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "folio-admin ok" }))
        .route("/collections", get(collections_api::list_collections))
        .route("/collections/{name}", get(collections_api::list_items).post(collections_api::add_item))
        .route("/collections/{name}/{id}", patch(collections_api::update_item).delete(collections_api::delete_item))
        .route("/collections/{name}/{id}/reorder", put(collections_api::reorder_item).patch(collections_api::reorder_item))
        .route("/collections/{name}/{id}/visibility", put(collections_api::toggle_item).patch(collections_api::toggle_item))
        .route("/files/tree", get(files_api::list_tree))
        .route("/files", get(files_api::read_file).post(files_api::write_file).delete(files_api::delete_file))
        .route("/files/create", post(files_api::create_file))
        .with_state(state)
}

/// Serve on an already-bound listener.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Start the HTTP server described by `cfg`.
pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "folio-admin starting: addr={}, data_dir='{}', content_root='{}', admin_token={}",
        cfg.socket_addr(), cfg.data_dir.display(), cfg.content_root.display(), cfg.admin_token.is_some()
    );
    let state = AppState::from_config(&cfg)?;
    info!(target: "startup", "collections: {}", state.collections.names().join(", "));
    let addr: SocketAddr = cfg.socket_addr().parse()
        .with_context(|| format!("invalid bind address: {}", cfg.socket_addr()))?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("While binding {}", addr))?;
    serve(listener, state).await
}
