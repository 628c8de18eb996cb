use axum::{
    http::HeaderValue,
    middleware as axum_mw,
    routing::{get, post, put},
    Router,
};
use booking_engine::{BookingEngine, BookingStore, MemoryBookingStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use config::Config;
use middleware::rate_limit::RateLimiter;
use services::{CheckoutManager, HttpBookingStore};

pub type SharedStore = Arc<dyn BookingStore>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine<SharedStore>>,
    pub config: Arc<Config>,
    pub checkouts: CheckoutManager,
    pub rate_limiter: RateLimiter,
    pub submit_rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, store: SharedStore) -> Self {
        let engine = BookingEngine::new(store, config.engine.clone());
        let rate_limiter =
            RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_secs);
        let submit_rate_limiter =
            RateLimiter::new(config.rate_limit.submit_max, config.rate_limit.window_secs);
        Self {
            engine: Arc::new(engine),
            checkouts: CheckoutManager::new(config.checkout.ttl_secs),
            config: Arc::new(config),
            rate_limiter,
            submit_rate_limiter,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn build_router(state: AppState) -> Router {
    let checkout_routes = Router::new()
        .route("/", post(routes::checkout::create_checkout))
        .route(
            "/:id",
            get(routes::checkout::get_checkout).delete(routes::checkout::cancel),
        )
        .route("/:id/equipment", put(routes::checkout::update_equipment))
        .route("/:id/review", post(routes::checkout::review))
        .route("/:id/back", post(routes::checkout::back))
        .route(
            "/:id/submit",
            post(routes::checkout::submit).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::rate_limit::submit_rate_limit,
            )),
        )
        .route(
            "/:id/retry",
            post(routes::checkout::retry).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::rate_limit::submit_rate_limit,
            )),
        );

    let api = Router::new()
        .route("/slots", get(routes::slots::list_slots))
        .route("/availability", get(routes::slots::availability))
        .route("/quote", post(routes::pricing::quote))
        .route("/health", get(routes::health::health))
        .nest("/checkouts", checkout_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health))
        // Global middleware
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_checkout_sweeper(checkouts: CheckoutManager, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            checkouts.sweep().await;
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();

    let store: SharedStore = match HttpBookingStore::new(&config.store) {
        Some(http) => {
            tracing::info!(url = %config.store.url, "Using remote booking store");
            Arc::new(http)
        }
        None => {
            tracing::warn!("BOOKING_STORE_URL not set, using in-memory booking store");
            Arc::new(MemoryBookingStore::new().with_max_ps5_players(config.engine.max_ps5_players))
        }
    };

    let port = config.port;
    let sweep_every = Duration::from_secs(config.checkout.sweep_interval_secs.max(1));
    let state = AppState::new(config, store);
    spawn_checkout_sweeper(state.checkouts.clone(), sweep_every);

    let router = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Lounge booking API listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
