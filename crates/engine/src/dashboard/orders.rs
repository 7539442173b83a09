use super::DashboardEngine;
use crate::error::{EngineError, EngineResult};
use crate::transport::Transport;
use crate::view::Notice;
use common::types::{ApiTradeRequest, TradeDirection};
use serde::Serialize;
use tracing::{info, warn};

/// A trade ready to be submitted: one request per wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOrder {
    pub direction: TradeDirection,
    pub mint: String,
    pub wallet_ids: Vec<String>,
    /// Quote amount for buys ("0.5"), percentage for sells ("25%").
    pub amount: String,
}

impl TradeOrder {
    fn request(&self, wallet_id: &str) -> ApiTradeRequest {
        ApiTradeRequest {
            wallet_id: wallet_id.to_string(),
            input: self.mint.clone(),
            amount: self.amount.clone(),
            direction: self.direction,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletTradeResult {
    pub wallet_id: String,
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletTradeError {
    pub wallet_id: String,
    pub error: String,
}

/// Per-wallet outcome of one submitted order.
#[derive(Debug, Clone, Serialize)]
pub struct TradeReport {
    pub results: Vec<WalletTradeResult>,
    pub errors: Vec<WalletTradeError>,
    pub success: bool,
    pub message: String,
}

impl TradeReport {
    fn new(
        direction: TradeDirection,
        results: Vec<WalletTradeResult>,
        errors: Vec<WalletTradeError>,
    ) -> Self {
        let message = if errors.is_empty() {
            let verb = match direction {
                TradeDirection::Buy => "Buy",
                TradeDirection::Sell => "Sell",
            };
            format!("{verb} sent to {} wallet(s)", results.len())
        } else {
            format!("Completed with {} error(s)", errors.len())
        };
        Self {
            success: errors.is_empty(),
            results,
            errors,
            message,
        }
    }

    pub fn notice(&self) -> Notice {
        if self.success {
            Notice::success(self.message.clone())
        } else {
            Notice::error(self.message.clone())
        }
    }
}

impl<T: Transport> DashboardEngine<T> {
    /// Buy `amount` of quote asset in every selected wallet. Targets the
    /// page token first, then the selected token.
    pub fn prepare_buy(&self, amount: f64) -> EngineResult<TradeOrder> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EngineError::InvalidAmount(amount));
        }
        let mint = self
            .page_token
            .clone()
            .or_else(|| self.selected().map(|a| a.token_address.clone()))
            .ok_or(EngineError::NoTokenDetected)?;

        let wallet_ids = self.roster.selected_ids();
        if wallet_ids.is_empty() {
            return Err(EngineError::NoWalletsSelected);
        }
        Ok(TradeOrder {
            direction: TradeDirection::Buy,
            mint,
            wallet_ids,
            amount: amount.to_string(),
        })
    }

    /// Sell `percentage` of the selected token from each selected wallet
    /// that actually holds it.
    pub fn prepare_sell(&self, percentage: f64) -> EngineResult<TradeOrder> {
        if !percentage.is_finite() || percentage <= 0.0 || percentage > 100.0 {
            return Err(EngineError::InvalidAmount(percentage));
        }
        let token = self.selected().ok_or(EngineError::NoTokenSelected)?;

        let selected = self.roster.selected_ids();
        if selected.is_empty() {
            return Err(EngineError::NoWalletsSelected);
        }
        let wallet_ids: Vec<String> = selected
            .into_iter()
            .filter(|id| token.member(id).is_some())
            .collect();
        if wallet_ids.is_empty() {
            return Err(EngineError::NoHoldingsInSelection);
        }
        Ok(TradeOrder {
            direction: TradeDirection::Sell,
            mint: token.token_address.clone(),
            wallet_ids,
            amount: format!("{percentage}%"),
        })
    }

    /// Submit the order wallet by wallet. Delivery is at most once per
    /// call; a failed wallet is reported, not retried. After a clean
    /// submission the positions are reloaded once the settle delay passes.
    pub async fn execute(&mut self, order: &TradeOrder) -> TradeReport {
        info!(
            direction = %order.direction,
            token = %order.mint,
            amount = %order.amount,
            wallets = order.wallet_ids.len(),
            "submitting trade"
        );

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for wallet_id in &order.wallet_ids {
            match self.transport.submit_trade(&order.request(wallet_id)).await {
                Ok(response) => results.push(WalletTradeResult {
                    wallet_id: wallet_id.clone(),
                    response,
                }),
                Err(e) => {
                    warn!(wallet = %wallet_id, error = %e, "trade submission failed");
                    errors.push(WalletTradeError {
                        wallet_id: wallet_id.clone(),
                        error: format!("{e:#}"),
                    });
                }
            }
        }
        metrics::counter!("dashboard_trades_submitted_total", "direction" => order.direction.to_string())
            .increment(results.len() as u64);

        let report = TradeReport::new(order.direction, results, errors);
        if report.success {
            tokio::time::sleep(self.options.settle_delay).await;
            self.settle_after_trade(order).await;
        }
        report
    }

    async fn settle_after_trade(&mut self, order: &TradeOrder) {
        if let Err(e) = self.reload().await {
            warn!(error = %e, "reload after trade failed");
            return;
        }
        match order.direction {
            TradeDirection::Buy => {
                if let Some(bought) = self.aggregates.iter().find(|a| a.token_address == order.mint) {
                    self.selection.select(bought);
                    self.apply_auto_if_enabled();
                }
            }
            TradeDirection::Sell => {
                if !self.aggregates.iter().any(|a| a.token_address == order.mint) {
                    info!(token = %order.mint, "position sold out, clearing selection");
                    self.selection.clear();
                    self.reselect();
                }
            }
        }
    }
}
