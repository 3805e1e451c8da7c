use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::Database;
use migration::MigratorTrait;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use confluence_backend::handlers;
use confluence_backend::jobs::{
    alert_checks, confluence_sync, esoteric_daily, macro_jobs, market_data, onchain_sync,
    political, sentiment_sync,
};
use confluence_backend::services::config::AppConfig;
use confluence_backend::services::exchange::ExchangeService;
use confluence_backend::services::fear_greed::FearGreedService;
use confluence_backend::services::macro_fetch::MacroService;
use confluence_backend::services::news_fetch::NewsService;
use confluence_backend::services::onchain_fetch::OnchainService;
use confluence_backend::services::political_calendar;
use confluence_backend::services::scheduler::Scheduler;
use confluence_backend::services::snapshot::SnapshotService;
use confluence_backend::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,confluence_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    // Seed the recurring political calendar before the first scoring tick.
    if let Err(e) = political_calendar::seed_current_years(&db).await {
        tracing::error!(error = %e, "Calendar seeding failed");
    }

    // External clients.
    let exchange = ExchangeService::new(config.exchange_base_url.clone());
    let fear_greed = FearGreedService::new(config.fear_greed_base_url.clone());
    let onchain = OnchainService::new(
        config.cryptoquant_api_key.clone(),
        config.glassnode_api_key.clone(),
    );
    let news = NewsService::new(config.newsapi_key.clone(), config.gnews_api_key.clone());
    let macro_service = MacroService::new(config.fred_api_key.clone());

    // Scheduler: one task per logical job, leases in the store, shutdown via
    // the watch channel on ctrl-c.
    let (scheduler, shutdown_tx) = Scheduler::new(db.clone(), config.worker_id.clone());

    market_data::start_market_data_job(&scheduler, exchange);
    onchain_sync::start_onchain_sync_job(&scheduler, onchain);
    sentiment_sync::start_sentiment_sync_job(&scheduler, fear_greed);
    esoteric_daily::start_esoteric_daily_job(&scheduler);
    political::start_political_jobs(&scheduler, news);
    macro_jobs::start_macro_jobs(&scheduler, macro_service);
    confluence_sync::start_confluence_job(&scheduler);
    alert_checks::start_alert_check_job(&scheduler);

    let state = AppState {
        db: db.clone(),
        snapshot: SnapshotService::new(),
        health: scheduler.health(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/api/prices/{symbol}", get(handlers::prices::get_prices))
        .route("/api/signals/ta/{symbol}", get(handlers::signals::get_ta))
        .route("/api/onchain/{symbol}", get(handlers::signals::get_onchain))
        .route("/api/sentiment/{symbol}", get(handlers::signals::get_sentiment))
        .route("/api/political/signal", get(handlers::signals::get_political))
        .route("/api/macro/signal", get(handlers::signals::get_macro))
        .route("/api/snapshot/{symbol}", get(handlers::signals::get_snapshot))
        .route("/api/celestial/current", get(handlers::esoteric::get_celestial_current))
        .route("/api/numerology/current", get(handlers::esoteric::get_numerology_current))
        .route("/api/numerology/{date}", get(handlers::esoteric::get_numerology_for_date))
        .route("/api/gematria/calculate", get(handlers::esoteric::calculate_gematria))
        .route(
            "/api/confluence/weights",
            get(handlers::confluence::get_weights).post(handlers::confluence::update_weights),
        )
        .route("/api/confluence/{symbol}", get(handlers::confluence::get_confluence))
        .route(
            "/api/confluence/{symbol}/history",
            get(handlers::confluence::get_confluence_history),
        )
        .route("/api/alerts", get(handlers::alerts::list_alerts))
        .route("/api/alerts/{id}/acknowledge", post(handlers::alerts::acknowledge_alert))
        .route("/api/alerts/{id}/dismiss", post(handlers::alerts::dismiss_alert))
        .route(
            "/api/cycles",
            get(handlers::cycles::list_cycles).post(handlers::cycles::create_cycle),
        )
        .route("/api/cycles/{id}/status", get(handlers::cycles::cycle_status))
        .route("/api/cycles/check/{date}", get(handlers::cycles::check_date))
        .route("/api/backtest/cycle", post(handlers::backtest::run_cycle_backtest))
        .route("/api/backtest/signals", post(handlers::backtest::run_signal_backtest))
        .route("/api/backtest/results/{id}", get(handlers::backtest::get_backtest_result))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!("Server listening on {}", config.bind_addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = server.await {
        tracing::error!(error = %e, "Server error");
    }
}
