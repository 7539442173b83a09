use crate::types::{AutoCount, PnlCurrency, SelectionMode, TokenAggregate, WalletEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Read-only copy of everything the presentation layer renders.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub aggregates: Vec<TokenAggregate>,
    pub selected: Option<TokenAggregate>,
    pub wallets: Vec<WalletEntry>,
    pub mode: SelectionMode,
    pub auto_count: AutoCount,
    pub pnl_currency: PnlCurrency,
    pub page_token: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn selected_holdings(&self) -> f64 {
        holdings(self.selected.as_ref(), &self.wallets)
    }
}

/// Sum of `token`'s balance across the selected wallets.
pub fn holdings(token: Option<&TokenAggregate>, wallets: &[WalletEntry]) -> f64 {
    let Some(token) = token else {
        return 0.0;
    };
    wallets
        .iter()
        .filter(|w| w.selected)
        .filter_map(|w| token.member(&w.wallet_id))
        .map(|m| m.balance)
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Passive, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Render instruction pushed to the presentation layer.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    /// Token set or zero-crossing changed: redraw everything.
    Rebuild(Box<Snapshot>),
    /// Same elements, new numbers.
    Refresh(Box<Snapshot>),
    Notice(Notice),
}

/// Signed percent and value strings for one aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlText {
    pub percent: String,
    pub value: String,
    pub positive: bool,
}

pub fn format_pnl(aggregate: &TokenAggregate, currency: PnlCurrency) -> PnlText {
    let pct = aggregate.weighted_pnl_percent;
    let value = match currency {
        PnlCurrency::Quote => {
            let v = aggregate.total_pnl_quote;
            format!("{}{:.2} SOL", sign(v), v.abs())
        }
        PnlCurrency::Display => {
            let v = aggregate.total_pnl_display;
            format!("{}${:.2}", sign(v), v.abs())
        }
    };
    PnlText {
        percent: format!("{}{:.2}%", sign(pct), pct.abs()),
        value,
        positive: pct >= 0.0,
    }
}

fn sign(v: f64) -> &'static str {
    if v < 0.0 {
        "-"
    } else {
        "+"
    }
}
