use crate::types::{AutoCount, PnlCurrency, SelectionMode, SelectionRef};
use common::store::KeyValueStore;
use std::sync::Arc;
use tracing::warn;

pub const SELECTED_TOKEN_KEY: &str = "selected-token";
pub const SELECTION_MODE_KEY: &str = "selection-mode";
pub const AUTO_WALLET_COUNT_KEY: &str = "auto-wallet-count";
pub const HIDDEN_WALLETS_KEY: &str = "hidden-wallets";
pub const PNL_CURRENCY_KEY: &str = "pnl-currency";
pub const BUY_PRESETS_KEY: &str = "buy-presets";
pub const SELL_PRESETS_KEY: &str = "sell-presets";

pub const DEFAULT_BUY_PRESETS: [f64; 4] = [0.1, 0.5, 1.0, 2.0];
pub const DEFAULT_SELL_PRESETS: [f64; 4] = [10.0, 25.0, 50.0, 100.0];

/// Typed access to the persisted user preferences. Every reader falls
/// back to its default when the key is absent, unreadable or malformed;
/// write failures are logged and swallowed.
#[derive(Clone)]
pub struct Prefs {
    store: Arc<dyn KeyValueStore>,
}

impl Prefs {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "store read failed, using default");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key, error = %e, "store write failed");
        }
    }

    fn erase(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "store remove failed");
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read(key)?;
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "ignoring malformed stored value");
                None
            }
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(s) => self.write(key, &s),
            Err(e) => warn!(key, error = %e, "failed to encode value"),
        }
    }

    pub fn selection_ref(&self) -> Option<SelectionRef> {
        self.read_json(SELECTED_TOKEN_KEY)
    }

    pub fn set_selection_ref(&self, selection: &SelectionRef) {
        self.write_json(SELECTED_TOKEN_KEY, selection);
    }

    pub fn clear_selection_ref(&self) {
        self.erase(SELECTED_TOKEN_KEY);
    }

    pub fn mode(&self) -> SelectionMode {
        self.read(SELECTION_MODE_KEY)
            .map(|s| SelectionMode::from_str_loose(&s))
            .unwrap_or_default()
    }

    pub fn set_mode(&self, mode: SelectionMode) {
        self.write(SELECTION_MODE_KEY, &mode.to_string());
    }

    pub fn auto_count(&self) -> AutoCount {
        self.read(AUTO_WALLET_COUNT_KEY)
            .map(|s| AutoCount::sanitize(&s))
            .unwrap_or_default()
    }

    pub fn set_auto_count(&self, count: AutoCount) {
        self.write(AUTO_WALLET_COUNT_KEY, &count.to_string());
    }

    pub fn hidden_wallets(&self) -> Vec<String> {
        self.read_json(HIDDEN_WALLETS_KEY).unwrap_or_default()
    }

    pub fn set_hidden_wallets(&self, ids: &[String]) {
        self.write_json(HIDDEN_WALLETS_KEY, ids);
    }

    pub fn pnl_currency(&self) -> PnlCurrency {
        self.read(PNL_CURRENCY_KEY)
            .map(|s| PnlCurrency::from_str_loose(&s))
            .unwrap_or_default()
    }

    pub fn set_pnl_currency(&self, currency: PnlCurrency) {
        self.write(PNL_CURRENCY_KEY, currency.as_str());
    }

    pub fn buy_presets(&self) -> Vec<f64> {
        self.read_json::<Vec<f64>>(BUY_PRESETS_KEY)
            .filter(|v| valid_presets(v, None))
            .unwrap_or_else(|| DEFAULT_BUY_PRESETS.to_vec())
    }

    pub fn set_buy_presets(&self, values: &[f64]) {
        self.write_json(BUY_PRESETS_KEY, values);
    }

    pub fn sell_presets(&self) -> Vec<f64> {
        self.read_json::<Vec<f64>>(SELL_PRESETS_KEY)
            .filter(|v| valid_presets(v, Some(100.0)))
            .unwrap_or_else(|| DEFAULT_SELL_PRESETS.to_vec())
    }

    pub fn set_sell_presets(&self, values: &[f64]) {
        self.write_json(SELL_PRESETS_KEY, values);
    }
}

/// Non-empty, every value positive and finite, and at most `max` if given.
pub fn valid_presets(values: &[f64], max: Option<f64>) -> bool {
    !values.is_empty()
        && values
            .iter()
            .all(|v| v.is_finite() && *v > 0.0 && max.map_or(true, |m| *v <= m))
}
