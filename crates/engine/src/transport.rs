use anyhow::Result;
use common::client::ApiClient;
use common::types::{
    ApiListedWallet, ApiPosition, ApiTaskGroup, ApiTokenDocument, ApiTradeRequest,
    ApiWalletBalance, ApiWalletGroup, PositionAction, PositionStatus,
};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Everything the engine needs from the remote service.
pub trait Transport: Send + Sync + 'static {
    fn fetch_positions(
        &self,
        status: PositionStatus,
    ) -> impl Future<Output = Result<Vec<ApiPosition>>> + Send;

    fn fetch_wallets(&self) -> impl Future<Output = Result<Vec<ApiWalletGroup>>> + Send;

    fn fetch_wallet_balance(
        &self,
        wallet_id: &str,
        token: Option<&str>,
    ) -> impl Future<Output = Result<ApiWalletBalance>> + Send;

    fn fetch_token_metadata(
        &self,
        uri: &str,
    ) -> impl Future<Output = Result<ApiTokenDocument>> + Send;

    /// Base token mint of a pool, `None` when the lookup service does not know it yet.
    fn resolve_pool(
        &self,
        pool_address: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    fn set_position_status(
        &self,
        position_id: &str,
        action: PositionAction,
    ) -> impl Future<Output = Result<()>> + Send;

    fn submit_trade(
        &self,
        request: &ApiTradeRequest,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;

    fn check_health(&self) -> impl Future<Output = Result<bool>> + Send;

    fn fetch_task_groups(&self) -> impl Future<Output = Result<Vec<ApiTaskGroup>>> + Send;

    /// Start, stop or delete one task group.
    fn control_task_group(
        &self,
        group_id: &str,
        command: TaskCommand,
    ) -> impl Future<Output = Result<()>> + Send;

    fn fetch_listed_wallets(
        &self,
        group_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ApiListedWallet>>> + Send;

    fn add_listed_wallet(
        &self,
        wallet: &ApiListedWallet,
    ) -> impl Future<Output = Result<()>> + Send;

    fn remove_listed_wallet(
        &self,
        group_id: &str,
        address: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCommand {
    Start,
    Stop,
    Delete,
}

impl TaskCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCommand::Start => "start",
            TaskCommand::Stop => "stop",
            TaskCommand::Delete => "delete",
        }
    }
}

fn record<T>(endpoint: &'static str, start: Instant, res: &Result<T>) {
    let ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("dashboard_api_latency_ms", "endpoint" => endpoint).record(ms);
    let status = if res.is_ok() { "ok" } else { "error" };
    metrics::counter!("dashboard_api_requests_total", "endpoint" => endpoint, "status" => status)
        .increment(1);
}

impl Transport for ApiClient {
    async fn fetch_positions(&self, status: PositionStatus) -> Result<Vec<ApiPosition>> {
        let start = Instant::now();
        let res = ApiClient::fetch_positions(self, status).await;
        record("positions", start, &res);
        res
    }

    async fn fetch_wallets(&self) -> Result<Vec<ApiWalletGroup>> {
        let start = Instant::now();
        let res = ApiClient::fetch_wallets(self).await;
        record("wallets", start, &res);
        res
    }

    async fn fetch_wallet_balance(
        &self,
        wallet_id: &str,
        token: Option<&str>,
    ) -> Result<ApiWalletBalance> {
        let start = Instant::now();
        let res = ApiClient::fetch_wallet_balance(self, wallet_id, token).await;
        record("wallet_balance", start, &res);
        res
    }

    async fn fetch_token_metadata(&self, uri: &str) -> Result<ApiTokenDocument> {
        let start = Instant::now();
        let res = self.fetch_token_document(uri).await;
        record("token_metadata", start, &res);
        res
    }

    async fn resolve_pool(&self, pool_address: &str) -> Result<Option<String>> {
        let start = Instant::now();
        let res = self.lookup_pool(pool_address).await;
        record("pool_lookup", start, &res);
        res
    }

    async fn set_position_status(&self, position_id: &str, action: PositionAction) -> Result<()> {
        let start = Instant::now();
        let res = ApiClient::set_position_status(self, position_id, action).await;
        record("position_action", start, &res);
        res
    }

    async fn submit_trade(&self, request: &ApiTradeRequest) -> Result<serde_json::Value> {
        let start = Instant::now();
        let res = ApiClient::submit_trade(self, request).await;
        record("trade", start, &res);
        res
    }

    async fn check_health(&self) -> Result<bool> {
        let start = Instant::now();
        let res = ApiClient::check_health(self).await;
        record("health", start, &res);
        res
    }

    async fn fetch_task_groups(&self) -> Result<Vec<ApiTaskGroup>> {
        let start = Instant::now();
        let res = ApiClient::fetch_task_groups(self).await;
        record("tasks", start, &res);
        res
    }

    async fn control_task_group(&self, group_id: &str, command: TaskCommand) -> Result<()> {
        let start = Instant::now();
        let res = match command {
            TaskCommand::Start => self.start_task_group(group_id).await,
            TaskCommand::Stop => self.stop_task_group(group_id).await,
            TaskCommand::Delete => self.delete_task_group(group_id).await,
        };
        record("task_control", start, &res);
        res
    }

    async fn fetch_listed_wallets(&self, group_id: Option<&str>) -> Result<Vec<ApiListedWallet>> {
        let start = Instant::now();
        let res = ApiClient::fetch_listed_wallets(self, group_id).await;
        record("wlbl", start, &res);
        res
    }

    async fn add_listed_wallet(&self, wallet: &ApiListedWallet) -> Result<()> {
        let start = Instant::now();
        let res = ApiClient::add_listed_wallet(self, wallet).await;
        record("wlbl_add", start, &res);
        res
    }

    async fn remove_listed_wallet(&self, group_id: &str, address: &str) -> Result<()> {
        let start = Instant::now();
        let res = ApiClient::remove_listed_wallet(self, group_id, address).await;
        record("wlbl_remove", start, &res);
        res
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it yields `Some`, retrying on both `None` and errors.
    pub async fn run<F, Fut, R>(&self, what: &str, mut op: F) -> Option<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<R>>>,
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match op().await {
                Ok(Some(v)) => return Some(v),
                Ok(None) => debug!(what, attempt, "not found"),
                Err(e) => warn!(what, attempt, error = %e, "attempt failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(self.delay).await;
            }
        }
        None
    }
}

/// Resolve a pool address to its token mint under `policy`.
pub async fn resolve_pool_with_retry<T: Transport>(
    transport: &T,
    policy: &RetryPolicy,
    pool_address: &str,
) -> Option<String> {
    policy
        .run("pool lookup", || transport.resolve_pool(pool_address))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_second_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_secs(1),
        };
        let started = tokio::time::Instant::now();
        let got = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Ok(None)
                    } else {
                        Ok(Some("MintA".to_string()))
                    }
                }
            })
            .await;
        assert_eq!(got.as_deref(), Some("MintA"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        };
        let got: Option<String> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow::anyhow!("503")) }
            })
            .await;
        assert!(got.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        let got: Option<u8> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            })
            .await;
        assert!(got.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
