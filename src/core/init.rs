//! Startup sequence: validate, prepare the cache, connect, load the budget.
//!
//! Nothing here terminates the process; the caller decides what a
//! [`FatalError`] means.

use std::fmt::Display;
use tracing::{error, info, instrument};

use crate::core::client::BudgetConnector;
use crate::core::config::AppConfig;
use crate::core::error::FatalError;
use crate::core::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unconfigured,
    Validated,
    Connected,
    BudgetLoaded,
    Ready,
    Fatal,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Stage::Unconfigured => "unconfigured",
                Stage::Validated => "validated",
                Stage::Connected => "connected",
                Stage::BudgetLoaded => "budget-loaded",
                Stage::Ready => "ready",
                Stage::Fatal => "fatal",
            }
        )
    }
}

fn advance(from: Stage, to: Stage) -> Stage {
    info!(from = %from, stage = %to, "Startup stage reached");
    to
}

fn fail(from: Stage, err: FatalError) -> FatalError {
    error!(from = %from, stage = %Stage::Fatal, error = ?err, "Startup failed");
    err
}

/// Runs the startup sequence and returns the ready session.
#[instrument(name = "Initialize", skip_all, fields(server = %config.server_url))]
pub async fn initialize(
    config: &AppConfig,
    connector: &dyn BudgetConnector,
) -> Result<Session, FatalError> {
    let stage = Stage::Unconfigured;

    let missing = config.missing_required();
    if !missing.is_empty() {
        return Err(fail(stage, FatalError::Configuration(missing)));
    }
    let stage = advance(stage, Stage::Validated);

    let cache_dir = config.data_dir.as_path();
    if let Err(source) = std::fs::create_dir_all(cache_dir) {
        return Err(fail(
            stage,
            FatalError::CacheDirectory {
                path: cache_dir.to_path_buf(),
                source,
            },
        ));
    }

    let client = match connector
        .connect(
            &config.server_url,
            config.server_password.as_deref(),
            cache_dir,
        )
        .await
    {
        Ok(client) => client,
        Err(source) => {
            return Err(fail(
                stage,
                FatalError::Connection {
                    url: config.server_url.clone(),
                    source,
                },
            ));
        }
    };
    let stage = advance(stage, Stage::Connected);

    if let Err(source) = client
        .load_budget(&config.sync_id, config.file_password.as_deref())
        .await
    {
        return Err(fail(
            stage,
            FatalError::BudgetLoad {
                sync_id: config.sync_id.clone(),
                source,
            },
        ));
    }
    let stage = advance(stage, Stage::BudgetLoaded);

    advance(stage, Stage::Ready);
    Ok(Session::new(client, config.request_timeout()))
}
