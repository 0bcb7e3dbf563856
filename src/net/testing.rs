//! In-process mock backend for HTTP tests.

use axum::Router;

use crate::config::ClientConfig;
use crate::net::api::ApiClient;

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub(crate) async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub(crate) async fn dead_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub(crate) fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new(&ClientConfig::new(base_url).unwrap()).unwrap()
}
