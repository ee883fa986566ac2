//! HTTP surface of the counter: the public visit endpoint and the
//! password-gated admin browser, both CORS-wrapped.

mod error;
mod gate;
mod handlers;

pub use error::ApiError;

use anyhow::Context;
use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::app::AppData;
use crate::store::KvStore;

pub fn router<S: KvStore + 'static>(data: AppData<S>) -> Router {
    Router::new()
        .route("/api/visit", get(handlers::record_visit::<S>))
        .route(
            "/api/admin",
            get(handlers::admin_list::<S>).post(handlers::admin_mutate::<S>),
        )
        .layer(middleware::from_fn_with_state(
            data.clone(),
            gate::attach_cors::<S>,
        ))
        .with_state(data)
}

/// Serve the API until ctrl-c.
pub async fn serve<S: KvStore + 'static>(addr: &str, data: AppData<S>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("fail to bind {addr}"))?;

    tracing::info!("visit counter listening on {addr}");

    axum::serve(listener, router(data))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
