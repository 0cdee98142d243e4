//! In-process budget client used by the unit tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::client::{BudgetClient, BudgetConnector};

pub(crate) fn sample_transactions() -> Value {
    json!([
        {"id": "t1", "account": "123", "date": "2024-01-05", "amount": -1250, "payee": "p1", "notes": null},
        {"id": "t2", "account": "123", "date": "2024-01-31", "amount": 300000, "payee": "p2", "notes": "Salary"}
    ])
}

#[derive(Default)]
pub(crate) struct FakeClient {
    calls: AtomicUsize,
    shutdowns: AtomicUsize,
    received: Mutex<Vec<String>>,
    loaded: Mutex<Option<(String, Option<String>)>>,
    load_error: Mutex<Option<String>>,
    query_error: Mutex<Option<String>>,
    shutdown_error: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeClient {
    pub(crate) fn fail_load(&self, message: &str) {
        *self.load_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn fail_queries(&self, message: &str) {
        *self.query_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn fail_shutdown(&self, message: &str) {
        *self.shutdown_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn delay_queries(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Number of query calls that reached the client.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Calls as `name(arg, ...)`, in arrival order.
    pub(crate) fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub(crate) fn loaded_budget(&self) -> Option<(String, Option<String>)> {
        self.loaded.lock().unwrap().clone()
    }

    async fn answer<T>(&self, call: String, value: T) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(call);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let error = self.query_error.lock().unwrap().clone();
        match error {
            Some(message) => Err(anyhow!(message)),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl BudgetClient for FakeClient {
    async fn load_budget(&self, sync_id: &str, password: Option<&str>) -> Result<()> {
        let error = self.load_error.lock().unwrap().clone();
        if let Some(message) = error {
            return Err(anyhow!(message));
        }
        *self.loaded.lock().unwrap() = Some((sync_id.to_string(), password.map(str::to_string)));
        Ok(())
    }

    async fn list_budgets(&self) -> Result<Value> {
        let budgets = json!([{"name": "Household", "groupId": "sync-1", "cloudFileId": "f1"}]);
        self.answer("list_budgets()".to_string(), budgets).await
    }

    async fn list_budget_months(&self) -> Result<Value> {
        self.answer("list_budget_months()".to_string(), json!(["2024-01", "2024-02"]))
            .await
    }

    async fn get_budget_month(&self, month: &str) -> Result<Value> {
        let data = json!({"month": month, "totalBudgeted": -50000, "toBudget": 1200});
        self.answer(format!("get_budget_month({month})"), data).await
    }

    async fn list_accounts(&self) -> Result<Value> {
        let accounts = json!([
            {"id": "123", "name": "Checking", "offbudget": false, "closed": false},
            {"id": "456", "name": "Savings", "offbudget": true, "closed": false}
        ]);
        self.answer("list_accounts()".to_string(), accounts).await
    }

    async fn get_account_balance(&self, account_id: &str, cutoff: Option<&str>) -> Result<i64> {
        let call = format!(
            "get_account_balance({account_id}, {})",
            cutoff.unwrap_or("latest")
        );
        self.answer(call, 4200).await
    }

    async fn list_transactions(
        &self,
        account_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value> {
        let call = format!("list_transactions({account_id}, {start_date}, {end_date})");
        self.answer(call, sample_transactions()).await
    }

    async fn list_categories(&self) -> Result<Value> {
        let categories = json!([{"id": "c1", "name": "Groceries", "group_id": "g1"}]);
        self.answer("list_categories()".to_string(), categories).await
    }

    async fn list_category_groups(&self) -> Result<Value> {
        let groups = json!([{
            "id": "g1",
            "name": "Everyday",
            "categories": [{"id": "c1", "name": "Groceries", "group_id": "g1"}]
        }]);
        self.answer("list_category_groups()".to_string(), groups).await
    }

    async fn list_payees(&self) -> Result<Value> {
        let payees = json!([{"id": "p1", "name": "Corner Shop", "transfer_acct": null}]);
        self.answer("list_payees()".to_string(), payees).await
    }

    async fn list_rules(&self) -> Result<Value> {
        let rules = json!([{"id": "r1", "stage": null, "conditionsOp": "and"}]);
        self.answer("list_rules()".to_string(), rules).await
    }

    async fn list_payee_rules(&self, payee_id: &str) -> Result<Value> {
        let rules = json!([{"id": "r2", "conditions": [{"field": "payee", "value": payee_id}]}]);
        self.answer(format!("list_payee_rules({payee_id})"), rules).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        let error = self.shutdown_error.lock().unwrap().clone();
        match error {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}

type ConnectArgs = (String, Option<String>, PathBuf);

pub(crate) struct FakeConnector {
    client: Option<Arc<dyn BudgetClient>>,
    error: Option<String>,
    connected_with: Mutex<Option<ConnectArgs>>,
}

impl FakeConnector {
    pub(crate) fn new(client: Arc<dyn BudgetClient>) -> Self {
        FakeConnector {
            client: Some(client),
            error: None,
            connected_with: Mutex::new(None),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        FakeConnector {
            client: None,
            error: Some(message.to_string()),
            connected_with: Mutex::new(None),
        }
    }

    pub(crate) fn connected_with(&self) -> Option<ConnectArgs> {
        self.connected_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl BudgetConnector for FakeConnector {
    async fn connect(
        &self,
        server_url: &str,
        password: Option<&str>,
        cache_dir: &Path,
    ) -> Result<Arc<dyn BudgetClient>> {
        *self.connected_with.lock().unwrap() = Some((
            server_url.to_string(),
            password.map(str::to_string),
            cache_dir.to_path_buf(),
        ));
        match (&self.client, &self.error) {
            (Some(client), _) => Ok(Arc::clone(client)),
            (None, Some(message)) => Err(anyhow!(message.clone())),
            (None, None) => Err(anyhow!("no client configured")),
        }
    }
}
