//! Shared fixtures for unit tests: an in-process WebSocket server.

use axum::{
    extract::ws::{WebSocket, WebSocketUpgrade},
    routing::get,
    Router,
};
use std::future::Future;
use tokio::net::TcpListener;

/// Serve `handler` for every connection on `/ws/advanced` at a random local port
///
/// Returns the `ws://` URL to connect to.
pub async fn spawn_ws_server<F, Fut>(handler: F) -> String
where
    F: Fn(WebSocket) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let app = Router::new().route(
        "/ws/advanced",
        get(move |ws: WebSocketUpgrade| {
            let handler = handler.clone();
            async move { ws.on_upgrade(handler) }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{}/ws/advanced", addr)
}

/// A `ws://` URL on a local port nothing is listening on
pub async fn unused_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/ws/advanced", addr)
}
