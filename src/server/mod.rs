//! The read-only HTTP surface.

pub mod delegate;
pub mod error;
pub mod handlers;
mod middleware;
pub mod validate;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::error::FatalError;
use crate::core::session::Session;

pub use error::ApiError;

/// Builds the route table around an already initialised session.
pub fn build_router(session: Arc<Session>) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/budgets/list", get(handlers::list_budgets))
        .route("/budgets/months", get(handlers::list_budget_months))
        .route("/budgets/months/{month}", get(handlers::get_budget_month))
        .route("/accounts", get(handlers::list_accounts))
        .route("/accounts/{id}/balance", get(handlers::get_account_balance))
        .route("/accounts/{id}/transactions", get(handlers::list_transactions))
        .route("/categories", get(handlers::list_categories))
        .route("/category-groups", get(handlers::list_category_groups))
        .route("/payees", get(handlers::list_payees))
        .route("/rules", get(handlers::list_rules))
        .route("/payees/{id}/rules", get(handlers::list_payee_rules))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .with_state(session)
}

/// Serves until `shutdown` resolves, drains in-flight requests, then
/// releases the session.
pub async fn serve<S>(listener: TcpListener, session: Arc<Session>, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Listening on http://{addr}");

    let served = axum::serve(listener, build_router(Arc::clone(&session)))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed");
    info!("Listener closed");

    let released = session
        .release()
        .await
        .map_err(|source| FatalError::Shutdown { source });
    served?;
    released?;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM (ctrl-c off unix).
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut terminate), Ok(mut interrupt)) => {
                tokio::select! {
                    _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
                    _ = interrupt.recv() => info!("Received SIGINT, shutting down"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Could not install signal handlers, waiting for ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received ctrl-c, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received ctrl-c, shutting down");
    }
}
