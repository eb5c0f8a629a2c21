use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use bon::Builder;
use tokio_graceful_shutdown::SubsystemHandle;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::models::types::{DigestId, FeedName};
use crate::services::render::Renderer;
use crate::services::settings::FeedConfig;
use crate::traits::digest_store::DigestStore;

/// Shared by every handler
#[derive(Clone, Builder)]
pub struct AppState {
    store: Arc<dyn DigestStore>,
    renderer: Arc<Renderer>,
    feeds: Arc<BTreeMap<FeedName, FeedConfig>>,
}

/// Ошибки обработчиков, отображаемые в HTTP-ответ
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("Not Found: {}", msg)).into_response(),
            ApiError::Internal(msg) => {
                error!(error = %msg, "server: request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
        }
    }
}

impl AppState {
    fn feed(&self, name: &str) -> Result<(FeedName, &FeedConfig), ApiError> {
        let name = FeedName::from(name);
        match self.feeds.get(&name) {
            Some(cfg) => Ok((name, cfg)),
            None => Err(ApiError::NotFound(format!("Couldn't find feed {:?}", name.as_str()))),
        }
    }
}

pub fn build_router(state: AppState, static_dir: Option<&str>) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/feeds/:name", get(feed_page))
        .route("/feeds/:name/", get(feed_page))
        .route("/feeds/:name/rss", get(feed_rss))
        .route("/feeds/:name/digests/:id", get(digest_page));
    if let Some(dir) = static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }
    router.with_state(state).layer(TraceLayer::new_for_http())
}

async fn index() -> &'static str {
    "Welcome!\n"
}

async fn feed_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Html<String>, ApiError> {
    let (name, feed) = state.feed(&name)?;
    let digests = state
        .store
        .get_digests_by_feed(&name)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state
        .renderer
        .render_feed_page(&name, feed, &digests)
        .map(Html)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn feed_rss(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let (name, feed) = state.feed(&name)?;
    let digests = state
        .store
        .get_digests_by_feed(&name)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let xml = state
        .renderer
        .render_rss(&name, feed, &digests)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")], xml).into_response())
}

async fn digest_page(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let (name, feed) = state.feed(&name)?;
    let not_found = || ApiError::NotFound(format!("Couldn't find digest {:?} in feed {:?}", id, name.as_str()));

    let digest_id: DigestId = id.parse().map_err(|_| not_found())?;
    let digest = state
        .store
        .get_digest_by_id(digest_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .filter(|d| d.feed_name == name)
        .ok_or_else(not_found)?;

    state
        .renderer
        .render_digest(feed, &digest)
        .map(Html)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Подсистема HTTP-сервера
#[derive(Builder)]
pub struct ServerSubsystem {
    state: AppState,
    addr: SocketAddr,
    static_dir: Option<String>,
}

impl ServerSubsystem {
    pub async fn run(self, subsys: SubsystemHandle) -> std::io::Result<()> {
        let router = build_router(self.state, self.static_dir.as_deref());
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                subsys.on_shutdown_requested().await;
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
