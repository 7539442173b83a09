pub mod orders;
pub mod page;
pub mod visibility;

use crate::aggregator::{self, IconCache};
use crate::auto_select::apply_auto_selection;
use crate::error::{EngineError, EngineResult};
use crate::normalizer;
use crate::prefs::{self, Prefs};
use crate::reconcile::{self, ChangeKind, TickOutcome};
use crate::selection::SelectionStore;
use crate::transport::{RetryPolicy, Transport};
use crate::types::{AutoCount, PnlCurrency, SelectionMode, TokenAggregate, WalletEntry};
use crate::view::{self, Snapshot};
use crate::wallets::WalletRoster;
use anyhow::Context;
use chrono::{DateTime, Utc};
use common::config::DashboardConfig;
use common::store::KeyValueStore;
use common::types::PositionStatus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Pool address lookups.
    pub retry: RetryPolicy,
    /// Wait between a submitted trade and the reload that should show it.
    pub settle_delay: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            settle_delay: Duration::from_secs(2),
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            retry: RetryPolicy {
                max_attempts: config.pool_resolution.max_attempts,
                delay: Duration::from_millis(config.pool_resolution.retry_delay_ms),
            },
            ..Self::default()
        }
    }
}

/// Owns the aggregate collection, the wallet roster and the selection.
/// Every mutation goes through a method on this type.
pub struct DashboardEngine<T: Transport> {
    transport: Arc<T>,
    prefs: Prefs,
    selection: SelectionStore,
    aggregates: Vec<TokenAggregate>,
    hidden_aggregates: Vec<TokenAggregate>,
    roster: WalletRoster,
    mode: SelectionMode,
    auto_count: AutoCount,
    pnl_currency: PnlCurrency,
    page_token: Option<String>,
    icons: IconCache,
    wallets_loaded: bool,
    /// Roster arrived during a tick and the view has not been rebuilt since.
    roster_dirty: bool,
    refreshed_at: Option<DateTime<Utc>>,
    options: EngineOptions,
}

impl<T: Transport> DashboardEngine<T> {
    pub fn new(transport: Arc<T>, store: Arc<dyn KeyValueStore>, options: EngineOptions) -> Self {
        let prefs = Prefs::new(store);
        Self {
            transport,
            selection: SelectionStore::new(prefs.clone()),
            aggregates: Vec::new(),
            hidden_aggregates: Vec::new(),
            roster: WalletRoster::new(prefs.hidden_wallets()),
            mode: prefs.mode(),
            auto_count: prefs.auto_count(),
            pnl_currency: prefs.pnl_currency(),
            page_token: None,
            icons: IconCache::default(),
            wallets_loaded: false,
            roster_dirty: false,
            refreshed_at: None,
            options,
            prefs,
        }
    }

    /// Initial load: wallets, positions, selection, then balances.
    pub async fn bootstrap(&mut self) -> EngineResult<()> {
        self.load_wallets().await?;
        self.reload().await?;
        self.load_wallet_balances().await;
        info!(
            tokens = self.aggregates.len(),
            wallets = self.roster.entries().len(),
            mode = %self.mode,
            "dashboard bootstrapped"
        );
        Ok(())
    }

    pub async fn load_wallets(&mut self) -> EngineResult<()> {
        let groups = self
            .transport
            .fetch_wallets()
            .await
            .context("failed to load wallets")?;
        self.roster.load(groups);
        self.wallets_loaded = true;
        self.apply_auto_if_enabled();
        Ok(())
    }

    pub async fn load_wallet_balances(&mut self) {
        self.roster.load_balances(self.transport.as_ref()).await;
    }

    pub fn wallets_loaded(&self) -> bool {
        self.wallets_loaded
    }

    /// Retry the roster if it never loaded.
    async fn ensure_wallets(&mut self) {
        if self.wallets_loaded {
            return;
        }
        match self.load_wallets().await {
            Ok(()) => {
                self.load_wallet_balances().await;
                self.roster_dirty = true;
                info!(wallets = self.roster.entries().len(), "wallet roster loaded");
            }
            Err(e) => warn!(error = %format!("{e:#}"), "wallet roster still unavailable"),
        }
    }

    /// Run the fetch → normalize → aggregate pipeline, icons included.
    /// Returns only once every icon fetch has settled.
    async fn fetch_aggregates(&mut self, status: PositionStatus) -> anyhow::Result<Vec<TokenAggregate>> {
        let raw = self
            .transport
            .fetch_positions(status)
            .await
            .with_context(|| format!("failed to fetch {status} positions"))?;
        metrics::gauge!("dashboard_positions_fetched", "status" => status.as_str())
            .set(raw.len() as f64);

        let facts = normalizer::normalize_all(&raw);
        if facts.len() < raw.len() {
            debug!(dropped = raw.len() - facts.len(), "dropped records without a token address");
        }
        let mut aggregates = aggregator::aggregate(facts);
        aggregator::resolve_icons(&mut aggregates, self.transport.as_ref(), &mut self.icons).await;
        Ok(aggregates)
    }

    /// One reconciliation pass. Nothing is committed until the whole
    /// pipeline has succeeded, so a failed or abandoned tick leaves the
    /// previous snapshot in place.
    pub async fn tick(&mut self) -> TickOutcome {
        self.ensure_wallets().await;
        let next = match self.fetch_aggregates(PositionStatus::Active).await {
            Ok(next) => next,
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(error = %reason, "reconciliation tick failed, keeping previous snapshot");
                let outcome = TickOutcome::Failed(reason);
                metrics::counter!("dashboard_ticks_total", "outcome" => outcome.label()).increment(1);
                return outcome;
            }
        };

        let mut kind = reconcile::classify(&self.aggregates, &next);
        if std::mem::take(&mut self.roster_dirty) && !kind.needs_rebuild() {
            kind = ChangeKind::Roster;
        }
        self.aggregates = next;
        self.refreshed_at = Some(Utc::now());

        let outcome = if kind.needs_rebuild() {
            self.reselect();
            info!(change = kind.as_str(), tokens = self.aggregates.len(), "structural update");
            TickOutcome::Rebuild(kind)
        } else {
            TickOutcome::Refresh
        };
        metrics::counter!("dashboard_ticks_total", "outcome" => outcome.label()).increment(1);
        outcome
    }

    /// User-initiated reload: always re-derives the selection.
    pub async fn reload(&mut self) -> EngineResult<ChangeKind> {
        let next = self.fetch_aggregates(PositionStatus::Active).await?;
        let kind = reconcile::classify(&self.aggregates, &next);
        self.aggregates = next;
        self.refreshed_at = Some(Utc::now());
        self.reselect();
        Ok(kind)
    }

    fn reselect(&mut self) {
        let selected = self.selection.resolve(&self.aggregates);
        if self.mode == SelectionMode::Auto {
            apply_auto_selection(self.roster.entries_mut(), selected, self.auto_count);
        }
    }

    fn apply_auto_if_enabled(&mut self) {
        if self.mode == SelectionMode::Auto {
            let selected = self.selection.selected(&self.aggregates);
            apply_auto_selection(self.roster.entries_mut(), selected, self.auto_count);
        }
    }

    fn ensure_manual(&self) -> EngineResult<()> {
        match self.mode {
            SelectionMode::Manual => Ok(()),
            SelectionMode::Auto => Err(EngineError::ManualOnly),
        }
    }

    pub fn select_token(&mut self, id: &str) -> EngineResult<()> {
        let aggregate = self
            .aggregates
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| EngineError::UnknownToken(id.to_string()))?;
        self.selection.select(aggregate);
        self.apply_auto_if_enabled();
        Ok(())
    }

    pub fn toggle_wallet(&mut self, wallet_id: &str) -> EngineResult<bool> {
        self.ensure_manual()?;
        self.roster.toggle(wallet_id)
    }

    pub fn select_all_wallets(&mut self) -> EngineResult<()> {
        self.ensure_manual()?;
        self.roster.select_all();
        Ok(())
    }

    pub fn unselect_all_wallets(&mut self) -> EngineResult<()> {
        self.ensure_manual()?;
        self.roster.unselect_all();
        Ok(())
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
        self.prefs.set_mode(mode);
        self.apply_auto_if_enabled();
        info!(mode = %mode, "selection mode changed");
    }

    /// 1 → 2 → 3 → 1 while in auto mode; from manual, switch to auto
    /// with the current count.
    pub fn cycle_auto_count(&mut self) -> AutoCount {
        if self.mode == SelectionMode::Manual {
            self.set_mode(SelectionMode::Auto);
            return self.auto_count;
        }
        self.auto_count = self.auto_count.cycle();
        self.prefs.set_auto_count(self.auto_count);
        self.apply_auto_if_enabled();
        self.auto_count
    }

    pub fn toggle_pnl_currency(&mut self) -> PnlCurrency {
        self.pnl_currency = self.pnl_currency.toggled();
        self.prefs.set_pnl_currency(self.pnl_currency);
        self.pnl_currency
    }

    pub fn hide_wallet(&mut self, wallet_id: &str) -> EngineResult<()> {
        if self.roster.hide(wallet_id)? {
            self.prefs.set_hidden_wallets(self.roster.hidden_ids());
        }
        Ok(())
    }

    pub fn unhide_wallet(&mut self, wallet_id: &str) {
        if self.roster.unhide(wallet_id) {
            self.prefs.set_hidden_wallets(self.roster.hidden_ids());
        }
    }

    pub fn buy_presets(&self) -> Vec<f64> {
        self.prefs.buy_presets()
    }

    pub fn sell_presets(&self) -> Vec<f64> {
        self.prefs.sell_presets()
    }

    pub fn set_buy_presets(&mut self, values: &[f64]) -> EngineResult<()> {
        if !prefs::valid_presets(values, None) {
            return Err(EngineError::InvalidPresets(
                "buy amounts must be positive numbers".to_string(),
            ));
        }
        self.prefs.set_buy_presets(values);
        Ok(())
    }

    pub fn set_sell_presets(&mut self, values: &[f64]) -> EngineResult<()> {
        if !prefs::valid_presets(values, Some(100.0)) {
            return Err(EngineError::InvalidPresets(
                "sell percentages must be between 0 and 100".to_string(),
            ));
        }
        self.prefs.set_sell_presets(values);
        Ok(())
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn aggregates(&self) -> &[TokenAggregate] {
        &self.aggregates
    }

    pub fn hidden_aggregates(&self) -> &[TokenAggregate] {
        &self.hidden_aggregates
    }

    pub fn selected(&self) -> Option<&TokenAggregate> {
        self.selection.selected(&self.aggregates)
    }

    pub fn wallets(&self) -> &[WalletEntry] {
        self.roster.entries()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn auto_count(&self) -> AutoCount {
        self.auto_count
    }

    pub fn page_token(&self) -> Option<&str> {
        self.page_token.as_deref()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            aggregates: self.aggregates.clone(),
            selected: self.selected().cloned(),
            wallets: self.roster.entries().to_vec(),
            mode: self.mode,
            auto_count: self.auto_count,
            pnl_currency: self.pnl_currency,
            page_token: self.page_token.clone(),
            refreshed_at: self.refreshed_at,
        }
    }

    /// Selected token's balance summed over the selected wallets.
    pub fn selected_holdings(&self) -> f64 {
        view::holdings(self.selected(), self.roster.entries())
    }
}
