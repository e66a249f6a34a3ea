use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use equora_core::analytics::forecast::VolatilityModel;
use equora_core::analytics::generator::SnapshotGenerator;
use equora_core::domain::newsletter::{NewsletterPreferences, NewsletterSubscription};
use equora_core::domain::snapshot::{SentimentSnapshot, VolatilityForecast};
use equora_core::ingest::provider::NoopProvider;
use equora_core::notify::{Notification, NotificationLog};
use equora_core::service::feed::{FeedState, SentimentFeed};
use equora_core::storage::kv::{JsonFileStore, KeyValueStore};
use equora_core::storage::map_token::MapTokenStore;
use equora_core::storage::newsletter::NewsletterService;

const NOTIFICATION_HISTORY: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = equora_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let generator = match SnapshotGenerator::from_settings(&settings) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(
                error = %e,
                "market data client unavailable; serving synthetic data only"
            );
            Arc::new(SnapshotGenerator::new(Arc::new(NoopProvider), settings.rng_seed))
        }
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(settings.store_path()));
    let notifications = NotificationLog::new(NOTIFICATION_HISTORY);
    let feed = SentimentFeed::new(generator.clone(), notifications.clone());
    let newsletter = NewsletterService::load(
        store.clone(),
        notifications.clone(),
        settings.newsletter_latency(),
    );

    let state = AppState {
        feed: feed.clone(),
        generator,
        newsletter: Arc::new(newsletter),
        notifications,
        map_token: Arc::new(MapTokenStore::new(store)),
    };

    let _updates = feed.start_real_time_updates(settings.refresh_interval());

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, store = %settings.store_path().display(), "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    feed.dispose();
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/snapshot/latest", get(get_latest_snapshot))
        .route("/feed/state", get(get_feed_state))
        .route("/feed/refresh", post(refresh_feed))
        .route("/forecast/volatility", get(get_volatility_forecast))
        .route("/newsletter/subscribe", post(subscribe_newsletter))
        .route("/newsletter/unsubscribe", post(unsubscribe_newsletter))
        .route("/newsletter/:email", get(get_newsletter_subscription))
        .route("/assistant", get(get_assistant_greeting))
        .route("/assistant/ask", post(ask_assistant))
        .route("/notifications", get(get_notifications))
        .route(
            "/settings/map-token",
            get(get_map_token).put(put_map_token),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    feed: Arc<SentimentFeed>,
    generator: Arc<SnapshotGenerator>,
    newsletter: Arc<NewsletterService>,
    notifications: Arc<NotificationLog>,
    map_token: Arc<MapTokenStore>,
}

async fn get_latest_snapshot(
    State(state): State<AppState>,
) -> Result<Json<SentimentSnapshot>, StatusCode> {
    let snapshot = state.feed.current_data().ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(snapshot.as_ref().clone()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedStatus {
    status: &'static str,
    reason: Option<String>,
    snapshot_timestamp: Option<DateTime<Utc>>,
    updating: bool,
    subscribers: usize,
    provider: &'static str,
}

async fn get_feed_state(State(state): State<AppState>) -> Json<FeedStatus> {
    let feed_state = state.feed.state();
    let reason = match &feed_state {
        FeedState::Error { reason, .. } => Some(reason.clone()),
        _ => None,
    };

    Json(FeedStatus {
        status: feed_state.status(),
        reason,
        snapshot_timestamp: feed_state.snapshot().map(|s| s.timestamp),
        updating: state.feed.is_updating(),
        subscribers: state.feed.subscriber_count(),
        provider: state.generator.provider_name(),
    })
}

async fn refresh_feed(
    State(state): State<AppState>,
) -> Result<Json<SentimentSnapshot>, StatusCode> {
    let snapshot = state
        .feed
        .fetch_latest_data()
        .await
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(snapshot.as_ref().clone()))
}

async fn get_volatility_forecast(
    State(state): State<AppState>,
) -> Result<Json<VolatilityForecast>, StatusCode> {
    let current = state
        .feed
        .current_data()
        .map(|s| s.volatility_index)
        .unwrap_or_else(|| VolatilityModel::default().long_term_mean);

    let forecast = state
        .generator
        .volatility_forecast(Utc::now(), current)
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "volatility forecast failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(forecast))
}

async fn subscribe_newsletter(
    State(state): State<AppState>,
    Json(preferences): Json<NewsletterPreferences>,
) -> Result<Json<NewsletterSubscription>, StatusCode> {
    state
        .newsletter
        .subscribe(preferences)
        .await
        .map(Json)
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)
}

#[derive(Debug, Deserialize)]
struct UnsubscribeRequest {
    email: String,
}

#[derive(Debug, Serialize)]
struct UnsubscribeResponse {
    unsubscribed: bool,
}

async fn unsubscribe_newsletter(
    State(state): State<AppState>,
    Json(req): Json<UnsubscribeRequest>,
) -> Json<UnsubscribeResponse> {
    let unsubscribed = state.newsletter.unsubscribe(&req.email).await;
    Json(UnsubscribeResponse { unsubscribed })
}

async fn get_newsletter_subscription(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<NewsletterSubscription>, StatusCode> {
    state
        .newsletter
        .get_subscription(&email)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: String,
}

async fn get_assistant_greeting() -> Json<AskResponse> {
    Json(AskResponse {
        answer: equora_core::assistant::GREETING.to_string(),
    })
}

async fn ask_assistant(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, StatusCode> {
    if req.question.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let snapshot = state.feed.current_data();
    let answer = equora_core::assistant::answer(&req.question, snapshot.as_deref());
    Ok(Json(AskResponse { answer }))
}

async fn get_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.notifications.recent())
}

#[derive(Debug, Serialize, Deserialize)]
struct MapToken {
    token: Option<String>,
}

async fn get_map_token(State(state): State<AppState>) -> Result<Json<MapToken>, StatusCode> {
    let tokens = state.map_token.clone();
    let token = run_blocking(move || tokens.get()).await?;
    Ok(Json(MapToken { token }))
}

async fn put_map_token(
    State(state): State<AppState>,
    Json(body): Json<MapToken>,
) -> Result<StatusCode, StatusCode> {
    let token = body
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let tokens = state.map_token.clone();
    run_blocking(move || tokens.set(&token)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Runs file-backed store work off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r);
    result.map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = ?e, "store operation failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &equora_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use equora_core::domain::newsletter::Frequency;
    use equora_core::storage::kv::MemoryStore;
    use std::time::Duration;

    fn test_state() -> AppState {
        let generator = Arc::new(SnapshotGenerator::new(Arc::new(NoopProvider), Some(7)));
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let notifications = NotificationLog::new(10);
        AppState {
            feed: SentimentFeed::new(generator.clone(), notifications.clone()),
            generator,
            newsletter: Arc::new(NewsletterService::load(
                store.clone(),
                notifications.clone(),
                Duration::ZERO,
            )),
            notifications,
            map_token: Arc::new(MapTokenStore::new(store)),
        }
    }

    #[tokio::test]
    async fn snapshot_is_missing_until_first_refresh() {
        let state = test_state();
        assert_eq!(
            get_latest_snapshot(State(state.clone())).await.unwrap_err(),
            StatusCode::NOT_FOUND
        );

        let Json(refreshed) = refresh_feed(State(state.clone())).await.unwrap();
        let Json(latest) = get_latest_snapshot(State(state.clone())).await.unwrap();
        assert_eq!(refreshed, latest);

        let Json(status) = get_feed_state(State(state)).await;
        assert_eq!(status.status, "ready");
        assert_eq!(status.provider, "synthetic");
    }

    #[tokio::test]
    async fn newsletter_round_trip_over_handlers() {
        let state = test_state();
        let prefs = NewsletterPreferences {
            email: "reader@example.com".to_string(),
            frequency: Frequency::Weekly,
            include_sector_analysis: true,
            include_top_stocks: false,
            include_news_digest: true,
            include_predictions: false,
        };
        let Json(sub) = subscribe_newsletter(State(state.clone()), Json(prefs))
            .await
            .unwrap();
        let Json(found) =
            get_newsletter_subscription(State(state.clone()), Path(sub.preferences.email.clone()))
                .await
                .unwrap();
        assert_eq!(found.id, sub.id);

        let Json(res) = unsubscribe_newsletter(
            State(state.clone()),
            Json(UnsubscribeRequest {
                email: "reader@example.com".to_string(),
            }),
        )
        .await;
        assert!(res.unsubscribed);

        let Json(notes) = get_notifications(State(state)).await;
        assert_eq!(notes.len(), 2);
    }

    #[tokio::test]
    async fn assistant_and_map_token() {
        let state = test_state();
        let Json(greeting) = get_assistant_greeting().await;
        assert!(greeting.answer.starts_with("Hello!"));

        let Json(reply) = ask_assistant(
            State(state.clone()),
            Json(AskRequest {
                question: "how is the market?".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            reply.answer,
            "I don't have the current market sentiment data available."
        );

        assert_eq!(
            put_map_token(State(state.clone()), Json(MapToken { token: None }))
                .await
                .unwrap_err(),
            StatusCode::BAD_REQUEST
        );
        put_map_token(
            State(state.clone()),
            Json(MapToken {
                token: Some("pk.test".to_string()),
            }),
        )
        .await
        .unwrap();
        let Json(token) = get_map_token(State(state)).await.unwrap();
        assert_eq!(token.token.as_deref(), Some("pk.test"));
    }

    #[tokio::test]
    async fn volatility_forecast_works_without_snapshot() {
        let Json(forecast) = get_volatility_forecast(State(test_state())).await.unwrap();
        assert!(!forecast.forecast.is_empty());
    }
}
