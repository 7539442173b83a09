use crate::error::{EngineError, EngineResult};
use crate::normalizer::{parse_raw_amount, scale};
use crate::transport::Transport;
use crate::types::WalletEntry;
use common::types::ApiWalletGroup;
use futures_util::future::join_all;
use std::collections::HashMap;
use tracing::{debug, info};

pub const DEFAULT_NATIVE_DECIMALS: u32 = 9;

/// The user's wallets in roster order, with their selection flags.
#[derive(Debug, Default)]
pub struct WalletRoster {
    entries: Vec<WalletEntry>,
    hidden: Vec<String>,
}

impl WalletRoster {
    pub fn new(hidden: Vec<String>) -> Self {
        Self {
            entries: Vec::new(),
            hidden,
        }
    }

    pub fn entries(&self) -> &[WalletEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [WalletEntry] {
        &mut self.entries
    }

    pub fn hidden_ids(&self) -> &[String] {
        &self.hidden
    }

    /// Replace the roster from a `/wallets/` answer. Wallets seen before
    /// keep their `selected` flag and balance; new ones start selected.
    pub fn load(&mut self, groups: Vec<ApiWalletGroup>) {
        let previous: HashMap<String, WalletEntry> = self
            .entries
            .drain(..)
            .map(|w| (w.wallet_id.clone(), w))
            .collect();

        for wallet in groups.into_iter().flat_map(|g| g.wallets) {
            let Some(id) = wallet.id.filter(|id| !id.is_empty()) else {
                continue;
            };
            if self.entries.iter().any(|w| w.wallet_id == id) {
                continue;
            }
            let prior = previous.get(&id);
            self.entries.push(WalletEntry {
                wallet_name: id.clone(),
                address: wallet.address.unwrap_or_default(),
                selected: prior.map_or(true, |p| p.selected),
                hidden: self.hidden.contains(&id),
                sol_balance: prior.and_then(|p| p.sol_balance),
                wallet_id: id,
            });
        }
        info!(wallets = self.entries.len(), "wallet roster loaded");
    }

    /// Fetch every wallet's native balance in parallel. A failed fetch
    /// leaves that wallet's balance untouched.
    pub async fn load_balances<T: Transport>(&mut self, transport: &T) {
        let ids: Vec<String> = self.entries.iter().map(|w| w.wallet_id.clone()).collect();
        let results = join_all(ids.iter().map(|id| async move {
            match transport.fetch_wallet_balance(id, None).await {
                Ok(balance) => {
                    let decimals = balance.decimals().unwrap_or(DEFAULT_NATIVE_DECIMALS);
                    Some(scale(parse_raw_amount(balance.amount.as_deref()), decimals))
                }
                Err(e) => {
                    debug!(wallet = %id, error = %e, "balance fetch failed");
                    None
                }
            }
        }))
        .await;

        for (wallet, balance) in self.entries.iter_mut().zip(results) {
            if balance.is_some() {
                wallet.sol_balance = balance;
            }
        }
    }

    fn find_mut(&mut self, wallet_id: &str) -> EngineResult<&mut WalletEntry> {
        self.entries
            .iter_mut()
            .find(|w| w.wallet_id == wallet_id)
            .ok_or_else(|| EngineError::UnknownWallet(wallet_id.to_string()))
    }

    pub fn toggle(&mut self, wallet_id: &str) -> EngineResult<bool> {
        let wallet = self.find_mut(wallet_id)?;
        wallet.selected = !wallet.selected;
        Ok(wallet.selected)
    }

    pub fn select_all(&mut self) {
        for w in &mut self.entries {
            w.selected = true;
        }
    }

    pub fn unselect_all(&mut self) {
        for w in &mut self.entries {
            w.selected = false;
        }
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|w| w.selected)
            .map(|w| w.wallet_id.clone())
            .collect()
    }

    /// Returns false when the id was already hidden.
    pub fn hide(&mut self, wallet_id: &str) -> EngineResult<bool> {
        self.find_mut(wallet_id)?.hidden = true;
        if self.hidden.iter().any(|h| h == wallet_id) {
            return Ok(false);
        }
        self.hidden.push(wallet_id.to_string());
        Ok(true)
    }

    /// Hidden ids are kept even for wallets no longer in the roster, so
    /// unhiding an unknown id is allowed.
    pub fn unhide(&mut self, wallet_id: &str) -> bool {
        if let Some(w) = self.entries.iter_mut().find(|w| w.wallet_id == wallet_id) {
            w.hidden = false;
        }
        let before = self.hidden.len();
        self.hidden.retain(|h| h != wallet_id);
        self.hidden.len() != before
    }
}
