use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use crate::core::client::BudgetClient;

/// The connection handle shared by every request handler.
///
/// Created once by [`crate::core::initialize`] and released once at shutdown.
pub struct Session {
    client: Arc<dyn BudgetClient>,
    call_timeout: Duration,
    released: AtomicBool,
}

impl Session {
    pub fn new(client: Arc<dyn BudgetClient>, call_timeout: Duration) -> Self {
        Session {
            client,
            call_timeout,
            released: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &dyn BudgetClient {
        self.client.as_ref()
    }

    /// Upper bound for a single delegated call.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Shuts the client down. Only the first call reaches the client; later
    /// calls return `Ok` without touching it.
    pub async fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            warn!("Budget session already released, ignoring");
            return Ok(());
        }
        info!("Releasing budget session");
        self.client.shutdown().await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("call_timeout", &self.call_timeout)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
