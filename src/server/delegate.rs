use std::future::Future;

use crate::core::client::BudgetClient;
use crate::core::session::Session;
use crate::server::error::ApiError;

/// Runs one budget client call under the session's timeout.
///
/// Every handler goes through here, so a failed or stalled call always ends
/// up as the same [`ApiError`].
pub async fn delegate<'a, F, Fut, T>(session: &'a Session, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&'a dyn BudgetClient) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let limit = session.call_timeout();
    match tokio::time::timeout(limit, op(session.client())).await {
        Ok(result) => result.map_err(ApiError::Delegate),
        Err(_) => Err(ApiError::Timeout(limit)),
    }
}
