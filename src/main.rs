use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use papermarket::{
    config::{self, StoreBackend},
    routes,
    services::{
        finnhub::FinnhubClient,
        order_executor,
        quotes::{PacedQuotes, QuoteSource},
        store::{MemoryStore, MongoStore, Store},
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    let store: Arc<dyn Store> = match settings.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, state is lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Mongo => {
            let mongo = MongoStore::connect(&settings.mongodb_uri, &settings.mongodb_db)
                .await
                .expect("Failed to connect to MongoDB");
            mongo.ensure_indexes().await.expect("Failed to create MongoDB indexes");
            Arc::new(mongo)
        }
    };

    if settings.finnhub_api_key.trim().is_empty() {
        tracing::warn!("FINNHUB_API_KEY is not set, every quote will be unavailable");
    }

    let quotes: Arc<dyn QuoteSource> = Arc::new(PacedQuotes::new(
        FinnhubClient::new(settings.finnhub_api_key.clone()),
        Duration::from_millis(settings.quote_min_interval_ms),
        Duration::from_millis(settings.quote_timeout_ms),
    ));

    let state = AppState::new(settings.clone(), store, quotes);

    order_executor::spawn_order_executor(state.clone());
    tracing::info!(
        "order executor running every {}s",
        settings.order_executor_interval_secs
    );

    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
