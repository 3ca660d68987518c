use axum::{http::Method, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod config;
mod database;
mod errors;
mod handlers;
mod models;
mod repository;
mod routes;
mod services;
mod state;

use config::{AppConfig, StoreKind};
use database::connection::get_db_client;
use repository::{InMemoryTransactionRepository, MongoTransactionRepository, TransactionRepository};
use services::auth_service::MerchantAuth;
use services::checkout_service::{CheckoutService, CheckoutSettings};
use services::retention::RetentionPolicy;
use services::subscription_bridge::MongoSubscriptionBridge;
use services::transaction_processor::{ProcessorConfig, TransactionProcessor};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Payment gateway config: {}", config.get_config_info());

    let db = get_db_client(&config.database_url, &config.database_name).await?;
    let repository = select_repository(&config, &db).await?;

    spawn_retention_sweep(
        repository.clone(),
        RetentionPolicy::from_days(config.retention_days),
        config.retention_sweep_interval,
    );

    let app_state = initialize_app_state(&config, db, repository);
    let app = build_router(app_state);
    start_server(app, &config).await
}

async fn select_repository(
    config: &AppConfig,
    db: &mongodb::Database,
) -> anyhow::Result<Arc<dyn TransactionRepository>> {
    match config.store {
        StoreKind::Memory => {
            tracing::warn!("Transactions are kept in memory and will not survive a restart");
            let repository: Arc<dyn TransactionRepository> =
                Arc::new(InMemoryTransactionRepository::new());
            Ok(repository)
        }
        StoreKind::MongoDb => {
            let repository = MongoTransactionRepository::new(db);
            repository.ensure_indexes().await?;
            tracing::info!("Transactions are stored in MongoDB");
            let repository: Arc<dyn TransactionRepository> = Arc::new(repository);
            Ok(repository)
        }
    }
}

fn initialize_app_state(
    config: &AppConfig,
    db: mongodb::Database,
    repository: Arc<dyn TransactionRepository>,
) -> AppState {
    let auth = Arc::new(MerchantAuth::new(
        config.auth_login.clone(),
        config.secret_key.clone(),
    ));

    let processor = Arc::new(TransactionProcessor::new(
        ProcessorConfig {
            tiers: config.tiers.clone(),
            bridge_timeout: config.bridge_timeout,
            transaction_timeout_ms: config.transaction_timeout_ms,
            receipt: config.receipt.clone(),
        },
        repository,
        Arc::new(MongoSubscriptionBridge::new(&db)),
        auth.clone(),
    ));

    let checkout = Arc::new(CheckoutService::new(CheckoutSettings {
        merchant_id: config.merchant_id.clone(),
        checkout_url: config.checkout_url.clone(),
        callback_url: config.callback_url.clone(),
        callback_timeout_ms: config.callback_timeout_ms,
        tiers: config.tiers.clone(),
        receipt: config.receipt.clone(),
    }));

    AppState::new(processor, auth, checkout).with_db(db)
}

fn spawn_retention_sweep(
    repository: Arc<dyn TransactionRepository>,
    policy: RetentionPolicy,
    every: Duration,
) {
    if every.is_zero() {
        tracing::warn!("Retention sweep disabled");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp_millis();
            if let Err(e) = policy.sweep(repository.as_ref(), now).await {
                tracing::error!("Retention sweep failed: {}", e);
            }
        }
    });
}

fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/payments", routes::payments::payment_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Payment gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
