use std::{env, sync::Arc};

use axum::{routing::get, Router};
use rust_decimal_macros::dec;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creditline_backend::{
    handlers,
    services::{
        prices::{PriceOracle, SpotPriceService, StaticPriceOracle},
        subgraph::SubgraphService,
    },
    AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,creditline_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let subgraph_url = env::var("SUBGRAPH_URL").expect("SUBGRAPH_URL must be set");
    tracing::info!("Using subgraph at {}", subgraph_url);
    let subgraph = SubgraphService::new(subgraph_url);

    let prices: Arc<dyn PriceOracle> = match env::var("PRICE_API_URL") {
        Ok(base_url) => {
            let api_key = env::var("PRICE_API_KEY").unwrap_or_default();
            Arc::new(SpotPriceService::new(api_key, base_url))
        }
        Err(_) => {
            tracing::warn!(
                "PRICE_API_URL not set, valuing events with the fixed placeholder price"
            );
            Arc::new(StaticPriceOracle::with_default(dec!(100000000)))
        }
    };

    let state = AppState { subgraph, prices };

    // Build router
    let app = Router::new()
        .route("/", get(health))
        .route("/lines", get(handlers::line::get_lines))
        .route("/lines/{id}/page", get(handlers::line::get_line_page))
        .route(
            "/portfolio/{address}",
            get(handlers::portfolio::get_user_portfolio),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

async fn health() -> &'static str {
    "creditline-backend up"
}
