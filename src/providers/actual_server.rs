use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::core::client::{BudgetClient, BudgetConnector};

const USER_AGENT: &str = concat!("budget-proxy/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "x-api-key";
const FILE_PASSWORD_HEADER: &str = "budget-encryption-password";

/// Opens [`ActualServerClient`] sessions.
pub struct ActualServerConnector {
    timeout: Duration,
}

impl ActualServerConnector {
    pub fn new(timeout: Duration) -> Self {
        ActualServerConnector { timeout }
    }
}

#[async_trait]
impl BudgetConnector for ActualServerConnector {
    async fn connect(
        &self,
        server_url: &str,
        password: Option<&str>,
        cache_dir: &Path,
    ) -> Result<Arc<dyn BudgetClient>> {
        let client = ActualServerClient::connect(server_url, password, cache_dir, self.timeout).await?;
        Ok(Arc::new(client))
    }
}

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RemoteBudget {
    group_id: Option<String>,
    cloud_file_id: Option<String>,
    name: String,
    encrypt_key_id: Option<String>,
}

#[derive(Debug, Clone)]
struct LoadedBudget {
    sync_id: String,
    file_password: Option<String>,
}

#[derive(Debug)]
struct SessionState {
    open: bool,
    budget: Option<LoadedBudget>,
}

/// Budget client for the Actual HTTP API, the REST wrapper that fronts an
/// Actual budget server.
///
/// Every request carries the API key in `x-api-key`. Budgets are listed at
/// `GET /v1/budgets`, and everything else lives under
/// `/v1/budgets/{syncId}/...` with the file password (if any) in
/// `budget-encryption-password`. Responses are `{"data": ..}` on success
/// and `{"error": ..}` on failure.
pub struct ActualServerClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    cache_dir: PathBuf,
    state: RwLock<SessionState>,
}

impl ActualServerClient {
    /// Checks the API is reachable and accepts the key by listing budgets.
    #[instrument(name = "ActualConnect", skip(api_key, cache_dir, timeout))]
    pub async fn connect(
        server_url: &str,
        api_key: Option<&str>,
        cache_dir: &Path,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(server_url)
            .with_context(|| format!("Invalid server URL: {server_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid server URL: {server_url}");
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        let client = ActualServerClient {
            http,
            base_url,
            api_key: api_key.map(str::to_string),
            cache_dir: cache_dir.to_path_buf(),
            state: RwLock::new(SessionState {
                open: true,
                budget: None,
            }),
        };

        let budgets = client.remote_budgets().await?;
        info!(budgets = budgets.len(), "Connected to budget API");
        Ok(client)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was ruled out in connect
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request error while {what}: {e}"))?;
        let status = response.status();
        debug!(%status, "Received budget API response while {what}");

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response while {what}"))?;

        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => bail!("HTTP error: {status} while {what}"),
            Err(e) => bail!("Failed to parse response while {what}: {e}"),
        };

        if !status.is_success() || envelope.error.is_some() {
            let reason = envelope.error.unwrap_or_else(|| status.to_string());
            bail!("Budget API error while {what}: {reason}");
        }

        envelope
            .data
            .ok_or_else(|| anyhow!("Budget API sent no data while {what}"))
    }

    /// Builds a GET carrying the API key, failing once the session is closed.
    async fn get(&self, url: Url) -> Result<RequestBuilder> {
        if !self.state.read().await.open {
            bail!("Budget session has been released");
        }
        let request = self.http.get(url);
        Ok(match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let budget = self
            .state
            .read()
            .await
            .budget
            .clone()
            .ok_or_else(|| anyhow!("No budget loaded"))?;

        let mut path = vec!["v1", "budgets", budget.sync_id.as_str()];
        path.extend_from_slice(segments);
        let mut url = self.endpoint(&path);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        debug!("Requesting {url}");

        let mut request = self.get(url).await?;
        if let Some(password) = &budget.file_password {
            request = request.header(FILE_PASSWORD_HEADER, password);
        }
        self.send(request, what).await
    }

    async fn budgets(&self) -> Result<Value> {
        let request = self.get(self.endpoint(&["v1", "budgets"])).await?;
        self.send(request, "listing budgets").await
    }

    async fn remote_budgets(&self) -> Result<Vec<RemoteBudget>> {
        serde_json::from_value(self.budgets().await?).context("Failed to parse budget list")
    }

    async fn write_metadata(&self, sync_id: &str, budget: &RemoteBudget) -> Result<PathBuf> {
        let dir = self.cache_dir.join(sync_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let metadata = json!({
            "id": sync_id,
            "groupId": budget.group_id,
            "cloudFileId": budget.cloud_file_id,
            "budgetName": budget.name,
            "encryptKeyId": budget.encrypt_key_id,
            "loadedAt": chrono::Utc::now().to_rfc3339(),
        });
        let path = dir.join("metadata.json");
        tokio::fs::write(&path, serde_json::to_vec_pretty(&metadata)?)
            .await
            .with_context(|| format!("Failed to write budget metadata to {}", path.display()))?;
        Ok(path)
    }
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl BudgetClient for ActualServerClient {
    #[instrument(name = "ActualLoadBudget", skip(self, password))]
    async fn load_budget(&self, sync_id: &str, password: Option<&str>) -> Result<()> {
        if !is_safe_id(sync_id) {
            bail!("Invalid sync id: {sync_id}");
        }

        let budget = self
            .remote_budgets()
            .await?
            .into_iter()
            .find(|b| b.group_id.as_deref() == Some(sync_id))
            .ok_or_else(|| anyhow!("No budget with sync id {sync_id} on the server"))?;

        if budget.encrypt_key_id.is_some() && password.is_none() {
            bail!("Budget {sync_id} is encrypted and no file password was given");
        }

        let metadata = self.write_metadata(sync_id, &budget).await?;
        debug!("Wrote budget metadata to {}", metadata.display());

        self.state.write().await.budget = Some(LoadedBudget {
            sync_id: sync_id.to_string(),
            file_password: password.map(str::to_string),
        });
        info!(budget = %budget.name, "Budget loaded");
        Ok(())
    }

    #[instrument(name = "ActualListBudgets", skip(self))]
    async fn list_budgets(&self) -> Result<Value> {
        self.budgets().await
    }

    #[instrument(name = "ActualListMonths", skip(self))]
    async fn list_budget_months(&self) -> Result<Value> {
        self.query(&["months"], &[], "listing budget months").await
    }

    #[instrument(name = "ActualGetMonth", skip(self))]
    async fn get_budget_month(&self, month: &str) -> Result<Value> {
        self.query(&["months", month], &[], "fetching budget month")
            .await
    }

    #[instrument(name = "ActualListAccounts", skip(self))]
    async fn list_accounts(&self) -> Result<Value> {
        self.query(&["accounts"], &[], "listing accounts").await
    }

    #[instrument(name = "ActualAccountBalance", skip(self))]
    async fn get_account_balance(&self, account_id: &str, cutoff: Option<&str>) -> Result<i64> {
        let params: Vec<(&str, &str)> = cutoff.map(|c| ("cutoff_date", c)).into_iter().collect();
        self.query(
            &["accounts", account_id, "balance"],
            &params,
            "fetching account balance",
        )
        .await
    }

    #[instrument(name = "ActualListTransactions", skip(self))]
    async fn list_transactions(
        &self,
        account_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value> {
        self.query(
            &["accounts", account_id, "transactions"],
            &[("since_date", start_date), ("until_date", end_date)],
            "listing transactions",
        )
        .await
    }

    #[instrument(name = "ActualListCategories", skip(self))]
    async fn list_categories(&self) -> Result<Value> {
        self.query(&["categories"], &[], "listing categories").await
    }

    #[instrument(name = "ActualListCategoryGroups", skip(self))]
    async fn list_category_groups(&self) -> Result<Value> {
        self.query(&["categorygroups"], &[], "listing category groups")
            .await
    }

    #[instrument(name = "ActualListPayees", skip(self))]
    async fn list_payees(&self) -> Result<Value> {
        self.query(&["payees"], &[], "listing payees").await
    }

    #[instrument(name = "ActualListRules", skip(self))]
    async fn list_rules(&self) -> Result<Value> {
        self.query(&["rules"], &[], "listing rules").await
    }

    #[instrument(name = "ActualListPayeeRules", skip(self))]
    async fn list_payee_rules(&self, payee_id: &str) -> Result<Value> {
        self.query(&["payees", payee_id, "rules"], &[], "listing payee rules")
            .await
    }

    async fn shutdown(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.open {
            bail!("Budget session already closed");
        }
        state.open = false;
        state.budget = None;
        info!("Budget session closed");
        Ok(())
    }
}
