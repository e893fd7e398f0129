//! REST facade and Telegram webhook endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use cricket_feed::{Match, MatchCache, ScoreProvider};
use logger::EventLogger;
use serde_json::{json, Value};
use subscriber_store::{ChatProfile, SubscriberStore};
use telegram_client::{Messenger, Update};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::dispatcher::CommandDispatcher;
use crate::live_updates::LiveUpdates;
use crate::tasks::TaskSpawner;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MatchCache>,
    pub provider: Arc<dyn ScoreProvider>,
    pub store: Arc<dyn SubscriberStore>,
    pub messenger: Arc<dyn Messenger>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub broadcaster: Arc<Broadcaster>,
    pub live: Arc<LiveUpdates>,
    pub tasks: TaskSpawner,
    pub telegram_enabled: bool,
}

impl AppState {
    /// Wires the cache, live-update registry, dispatcher and broadcaster
    /// around the three external dependencies.
    pub fn new(
        config: &Config,
        provider: Arc<dyn ScoreProvider>,
        store: Arc<dyn SubscriberStore>,
        messenger: Arc<dyn Messenger>,
        events: EventLogger,
    ) -> Self {
        let tasks = TaskSpawner::new();
        let cache = Arc::new(
            MatchCache::new(provider.clone(), config.cache_ttl)
                .with_fetch_timeout(config.http_timeout)
                .with_event_log(events.clone()),
        );
        let live = Arc::new(LiveUpdates::new(
            cache.clone(),
            messenger.clone(),
            tasks.clone(),
            config.live_update_iterations,
            config.live_update_interval,
        ));
        let dispatcher = Arc::new(CommandDispatcher::new(
            cache.clone(),
            store.clone(),
            messenger.clone(),
            live.clone(),
        ));
        let broadcaster = Arc::new(Broadcaster::new(
            cache.clone(),
            store.clone(),
            messenger.clone(),
            config.broadcast_delay,
            events,
        ));

        Self {
            cache,
            provider,
            store,
            messenger,
            dispatcher,
            broadcaster,
            live,
            tasks,
            telegram_enabled: config.telegram_enabled(),
        }
    }
}

// ====================================================================
// Errors
// ====================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what.to_string()),
            ApiError::Internal(e) => {
                error!("request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

// ====================================================================
// Router
// ====================================================================

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api", get(root))
        .route("/api/", get(root))
        .route("/api/matches/current", get(current_matches))
        .route("/api/matches/all", get(all_matches))
        .route("/api/matches/{match_id}", get(match_details))
        .route("/api/series", get(series))
        .route("/api/subscribers", get(subscriber_count).post(add_subscriber))
        .route("/api/subscribers/{chat_id}", delete(remove_subscriber))
        .route("/api/telegram/webhook", post(telegram_webhook))
        .route("/api/telegram/notify", post(notify_subscribers))
        .route("/api/telegram/bot-info", get(bot_info))
        .route("/api/broadcast", post(broadcast))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` allows any origin; otherwise only the listed ones.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_allows_any() {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

// ====================================================================
// Handlers
// ====================================================================

async fn root() -> Json<Value> {
    Json(json!({ "message": "KSP Cricket API", "status": "running" }))
}

async fn current_matches(State(state): State<AppState>) -> Json<Value> {
    let matches = state.cache.get_matches().await;
    list_response(&matches)
}

async fn all_matches(State(state): State<AppState>) -> Json<Value> {
    let matches = state.provider.all_matches().await.unwrap_or_else(|e| {
        warn!("all_matches failed: {:#}", e);
        Vec::new()
    });
    list_response(&matches)
}

async fn match_details(State(state): State<AppState>, Path(match_id): Path<String>) -> ApiResult {
    if let Some(m) = state.cache.find_match(&match_id).await {
        return Ok(Json(json!({ "status": "success", "data": m })));
    }
    match state.provider.match_info(&match_id).await {
        Ok(Some(m)) => Ok(Json(json!({ "status": "success", "data": m }))),
        Ok(None) => Err(ApiError::NotFound("Match not found")),
        Err(e) => {
            warn!("match_info {} failed: {:#}", match_id, e);
            Err(ApiError::NotFound("Match not found"))
        }
    }
}

async fn series(State(state): State<AppState>) -> Json<Value> {
    let series = state.provider.series().await.unwrap_or_else(|e| {
        warn!("series failed: {:#}", e);
        Vec::new()
    });
    Json(json!({ "status": "success", "count": series.len(), "data": series }))
}

async fn subscriber_count(State(state): State<AppState>) -> ApiResult {
    let count = state.store.count_active().await?;
    Ok(Json(json!({ "status": "success", "active_subscribers": count })))
}

async fn add_subscriber(State(state): State<AppState>, Json(profile): Json<ChatProfile>) -> ApiResult {
    let outcome = state.store.upsert_active(&profile).await?;
    let message = if outcome.created { "Subscribed" } else { "Resubscribed" };
    info!("API {}: chat {}", message, profile.chat_id);
    Ok(Json(json!({
        "status": "success",
        "message": message,
        "id": outcome.subscriber.id,
    })))
}

async fn remove_subscriber(State(state): State<AppState>, Path(chat_id): Path<i64>) -> ApiResult {
    // a /live-only chat has an inactive record but may still run a loop
    state.live.cancel(chat_id);
    if !state.store.deactivate(chat_id).await? {
        return Err(ApiError::NotFound("Subscriber not found"));
    }
    Ok(Json(json!({ "status": "success", "message": "Unsubscribed" })))
}

/// Always acknowledges, so Telegram never redelivers. The command itself
/// runs in the background.
async fn telegram_webhook(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            let dispatcher = state.dispatcher.clone();
            state.tasks.spawn("webhook_update", async move {
                dispatcher.handle_update(update).await;
            });
        }
        Err(e) => warn!("Malformed webhook payload ignored: {}", e),
    }
    Json(json!({ "ok": true }))
}

async fn notify_subscribers(State(state): State<AppState>, Json(m): Json<Match>) -> Json<Value> {
    let broadcaster = state.broadcaster.clone();
    state.tasks.spawn("match_notify", async move {
        broadcaster.notify_match(&m).await;
    });
    Json(json!({ "status": "success", "message": "Notifications queued" }))
}

async fn bot_info(State(state): State<AppState>) -> Json<Value> {
    if !state.telegram_enabled {
        return Json(json!({ "status": "error", "message": "Bot not configured" }));
    }
    match state.messenger.get_me().await {
        Ok(me) => Json(json!({
            "status": "success",
            "bot_username": me.username,
            "bot_name": me.first_name,
        })),
        Err(e) => Json(json!({ "status": "error", "message": e.to_string() })),
    }
}

async fn broadcast(State(state): State<AppState>) -> Json<Value> {
    let broadcaster = state.broadcaster.clone();
    state.tasks.spawn("broadcast", async move {
        broadcaster.broadcast().await;
    });
    Json(json!({ "status": "success", "message": "Broadcast queued" }))
}

fn list_response<T: serde::Serialize>(items: &[T]) -> Json<Value> {
    Json(json!({ "status": "success", "count": items.len(), "data": items }))
}
