//! The budget client seam. Every route delegates to exactly one of these
//! calls; results are opaque JSON forwarded as-is.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

#[async_trait]
pub trait BudgetClient: Send + Sync {
    /// Opens the budget identified by `sync_id` into the client's cache.
    async fn load_budget(&self, sync_id: &str, password: Option<&str>) -> Result<()>;

    async fn list_budgets(&self) -> Result<Value>;
    async fn list_budget_months(&self) -> Result<Value>;
    async fn get_budget_month(&self, month: &str) -> Result<Value>;

    async fn list_accounts(&self) -> Result<Value>;
    /// Balance in minor units, as of `cutoff` (inclusive) or the latest data.
    async fn get_account_balance(&self, account_id: &str, cutoff: Option<&str>) -> Result<i64>;
    async fn list_transactions(
        &self,
        account_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value>;

    async fn list_categories(&self) -> Result<Value>;
    async fn list_category_groups(&self) -> Result<Value>;
    async fn list_payees(&self) -> Result<Value>;
    async fn list_rules(&self) -> Result<Value>;
    async fn list_payee_rules(&self, payee_id: &str) -> Result<Value>;

    /// Releases the connection. Called once, at shutdown.
    async fn shutdown(&self) -> Result<()>;
}

/// Opens a connection to a budget server.
#[async_trait]
pub trait BudgetConnector: Send + Sync {
    async fn connect(
        &self,
        server_url: &str,
        password: Option<&str>,
        cache_dir: &Path,
    ) -> Result<Arc<dyn BudgetClient>>;
}
