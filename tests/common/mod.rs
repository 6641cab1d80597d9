use axum::{routing::post, Json, Router};
use serde_json::Value;

/// Serve one canned GraphQL response on an ephemeral port and return the
/// URL to point a `SubgraphService` at. The server answers every POST with
/// the same body, which is all the single-query tests need.
pub async fn spawn_mock_subgraph(response: Value) -> String {
    let app = Router::new().route(
        "/",
        post(move || {
            let response = response.clone();
            async move { Json(response) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock subgraph");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
