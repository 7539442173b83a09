#![allow(dead_code)] // each test binary uses a different subset

use anyhow::{anyhow, Result};
use common::store::MemoryStore;
use common::types::{
    ApiListedWallet, ApiPosition, ApiTask, ApiTaskGroup, ApiTaskMeta, ApiTokenDocument,
    ApiTokenInfo, ApiTokenMetadata, ApiTradeRequest, ApiWallet, ApiWalletBalance, ApiWalletGroup,
    PositionAction, PositionStatus, TradeDirection,
};
use engine::transport::{RetryPolicy, TaskCommand, Transport};
use engine::{DashboardEngine, EngineOptions};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned remote state. Tests mutate it between ticks.
#[derive(Default)]
pub struct FakeState {
    pub positions: Vec<ApiPosition>,
    pub hidden_positions: Vec<ApiPosition>,
    pub wallets: Vec<String>,
    pub balances: HashMap<String, String>,
    pub icons: HashMap<String, String>,
    pub pools: HashMap<String, String>,
    pub fail_positions: bool,
    pub fail_wallets: bool,
    pub healthy: Option<bool>,
    pub task_groups: Vec<ApiTaskGroup>,
    pub failing_task_groups: HashSet<String>,
    pub task_calls: Vec<(String, TaskCommand)>,
    pub listed: Vec<ApiListedWallet>,
    pub wallet_calls: usize,
    pub failing_trade_wallets: HashSet<String>,
    pub failing_position_ids: HashSet<String>,
    pub trades: Vec<ApiTradeRequest>,
    pub status_calls: Vec<(String, PositionAction)>,
    pub pool_calls: usize,
    pub position_calls: usize,
    pub icon_calls: usize,
}

#[derive(Default)]
pub struct FakeTransport {
    pub state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn with_wallets(ids: &[&str]) -> Arc<Self> {
        let fake = Self::default();
        fake.state.lock().unwrap().wallets = ids.iter().map(|s| (*s).to_string()).collect();
        Arc::new(fake)
    }

    pub fn set_positions(&self, positions: Vec<ApiPosition>) {
        self.state.lock().unwrap().positions = positions;
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn trades(&self) -> Vec<ApiTradeRequest> {
        self.state.lock().unwrap().trades.clone()
    }
}

impl Transport for FakeTransport {
    async fn fetch_positions(&self, status: PositionStatus) -> Result<Vec<ApiPosition>> {
        let mut state = self.state.lock().unwrap();
        state.position_calls += 1;
        if state.fail_positions {
            return Err(anyhow!("positions endpoint returned 503"));
        }
        Ok(match status {
            PositionStatus::Active => state.positions.clone(),
            PositionStatus::Hidden => state.hidden_positions.clone(),
        })
    }

    async fn fetch_wallets(&self) -> Result<Vec<ApiWalletGroup>> {
        let mut state = self.state.lock().unwrap();
        state.wallet_calls += 1;
        if state.fail_wallets {
            return Err(anyhow!("wallets endpoint returned 502"));
        }
        Ok(vec![ApiWalletGroup {
            group_id: Some("main".to_string()),
            wallets: state
                .wallets
                .iter()
                .map(|id| ApiWallet {
                    id: Some(id.clone()),
                    address: Some(format!("{id}-address")),
                })
                .collect(),
        }])
    }

    async fn fetch_wallet_balance(
        &self,
        wallet_id: &str,
        _token: Option<&str>,
    ) -> Result<ApiWalletBalance> {
        let state = self.state.lock().unwrap();
        let amount = state
            .balances
            .get(wallet_id)
            .cloned()
            .ok_or_else(|| anyhow!("no balance for {wallet_id}"))?;
        Ok(ApiWalletBalance {
            amount: Some(amount),
            decimals: None,
            token_info: None,
        })
    }

    async fn fetch_token_metadata(&self, uri: &str) -> Result<ApiTokenDocument> {
        let mut state = self.state.lock().unwrap();
        state.icon_calls += 1;
        let image = state
            .icons
            .get(uri)
            .cloned()
            .ok_or_else(|| anyhow!("metadata fetch failed for {uri}"))?;
        Ok(ApiTokenDocument { image: Some(image) })
    }

    async fn resolve_pool(&self, pool_address: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.pool_calls += 1;
        Ok(state.pools.get(pool_address).cloned())
    }

    async fn set_position_status(&self, position_id: &str, action: PositionAction) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.status_calls.push((position_id.to_string(), action));
        if state.failing_position_ids.contains(position_id) {
            return Err(anyhow!("position {position_id} update rejected"));
        }
        Ok(())
    }

    async fn submit_trade(&self, request: &ApiTradeRequest) -> Result<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        if state.failing_trade_wallets.contains(&request.wallet_id) {
            return Err(anyhow!("insufficient funds in {}", request.wallet_id));
        }
        state.trades.push(request.clone());
        // A full sell closes that wallet's position.
        if request.direction == TradeDirection::Sell && request.amount == "100%" {
            state.positions.retain(|p| {
                !(p.wallet_id.as_deref() == Some(request.wallet_id.as_str())
                    && p.token_info.as_ref().and_then(|t| t.address.as_deref())
                        == Some(request.input.as_str()))
            });
        }
        Ok(serde_json::json!({"success": true}))
    }

    async fn check_health(&self) -> Result<bool> {
        self.state
            .lock()
            .unwrap()
            .healthy
            .ok_or_else(|| anyhow!("connection refused"))
    }

    async fn fetch_task_groups(&self) -> Result<Vec<ApiTaskGroup>> {
        Ok(self.state.lock().unwrap().task_groups.clone())
    }

    async fn control_task_group(&self, group_id: &str, command: TaskCommand) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.task_calls.push((group_id.to_string(), command));
        if state.failing_task_groups.contains(group_id) {
            return Err(anyhow!("task group {group_id} rejected {}", command.as_str()));
        }
        match command {
            TaskCommand::Delete => state
                .task_groups
                .retain(|g| g.id.as_deref() != Some(group_id)),
            TaskCommand::Start | TaskCommand::Stop => {
                let active = command == TaskCommand::Start;
                for group in &mut state.task_groups {
                    if group.id.as_deref() == Some(group_id) {
                        group.meta = Some(ApiTaskMeta {
                            active: Some(active),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    async fn fetch_listed_wallets(&self, group_id: Option<&str>) -> Result<Vec<ApiListedWallet>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .listed
            .iter()
            .filter(|w| group_id.map_or(true, |g| w.group_id == g))
            .cloned()
            .collect())
    }

    async fn add_listed_wallet(&self, wallet: &ApiListedWallet) -> Result<()> {
        self.state.lock().unwrap().listed.push(wallet.clone());
        Ok(())
    }

    async fn remove_listed_wallet(&self, group_id: &str, address: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.listed.len();
        state
            .listed
            .retain(|w| !(w.group_id == group_id && w.address == address));
        if state.listed.len() == before {
            return Err(anyhow!("API error 404 Not Found: no such entry"));
        }
        Ok(())
    }
}

pub fn task_group(id: &str, active: bool, tasks: &[&str]) -> ApiTaskGroup {
    ApiTaskGroup {
        id: Some(id.to_string()),
        meta: Some(ApiTaskMeta {
            active: Some(active),
        }),
        tasks: tasks
            .iter()
            .map(|t| ApiTask {
                id: Some((*t).to_string()),
                name: None,
            })
            .collect(),
    }
}

/// Position of `wallet` in `token`: raw amounts in smallest units with
/// the default 6 token / 9 quote decimals.
pub fn position(wallet: &str, token: &str, raw_balance: u64, pnl: f64, spent_raw: u64) -> ApiPosition {
    ApiPosition {
        id: Some(format!("{wallet}:{token}")),
        wallet_id: Some(wallet.to_string()),
        wallet_name: None,
        token_info: Some(ApiTokenInfo {
            address: Some(token.to_string()),
            decimals: Some(6),
            metadata: Some(ApiTokenMetadata {
                name: Some(format!("{token} coin")),
                symbol: Some(token.to_uppercase()),
                uri: Some(format!("https://meta.example/{token}.json")),
            }),
        }),
        quote_info: Some(ApiTokenInfo {
            address: None,
            decimals: Some(9),
            metadata: None,
        }),
        token_left: Some(raw_balance.to_string()),
        pnl: Some(pnl.to_string()),
        quote_spent: Some(spent_raw.to_string()),
        quote_spent_usd: Some("0".to_string()),
    }
}

pub fn test_options() -> EngineOptions {
    EngineOptions {
        retry: RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(1000),
        },
        settle_delay: Duration::from_secs(2),
    }
}

pub fn engine(transport: &Arc<FakeTransport>) -> (DashboardEngine<FakeTransport>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = DashboardEngine::new(Arc::clone(transport), store.clone(), test_options());
    (engine, store)
}

pub fn selected_wallets(engine: &DashboardEngine<FakeTransport>) -> Vec<String> {
    engine
        .wallets()
        .iter()
        .filter(|w| w.selected)
        .map(|w| w.wallet_id.clone())
        .collect()
}
