//! Server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bod_soft_sensor::service::PredictionService;
use bod_soft_sensor::store::{FileLogStore, LogStore};
use bod_soft_sensor::{config, create_router, model, AppState};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bod_soft_sensor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("BOD soft-sensor server starting...");

    // Fail fast: refuse to serve without a model rather than degrade
    // per-request.
    let artifact = model::load_model(&config.model_path)
        .expect("Failed to load model artifact");
    tracing::info!("Model loaded from: {}", config.model_path);

    let store: Arc<dyn LogStore> = Arc::new(
        FileLogStore::open(&config.log_path).expect("Failed to open prediction log store"),
    );
    tracing::info!("Prediction log: {}", config.log_path);

    let state = AppState {
        service: Arc::new(PredictionService::new(Arc::new(artifact), store.clone())),
        store,
        config: config.clone(),
    };

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
