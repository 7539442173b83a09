use serde::{Deserialize, Serialize};
use std::fmt;

/// One wallet's normalized position in one token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionFact {
    pub wallet_id: String,
    pub wallet_name: String,
    pub position_id: String,
    pub token_address: String,
    pub token_decimals: u32,
    /// Token amount in the smallest unit.
    pub raw_balance: u128,
    /// `raw_balance / 10^token_decimals`.
    pub balance: f64,
    pub pnl_percent: f64,
    /// Quote asset committed, smallest unit of the quote asset.
    pub quote_spent_raw: u128,
    pub quote_decimals: u32,
    /// `quote_spent_raw / 10^quote_decimals`.
    pub quote_spent: f64,
    /// Same spend, already denominated in the display currency.
    pub quote_spent_display: f64,
    pub symbol: String,
    pub display_name: String,
    pub metadata_uri: Option<String>,
}

impl PositionFact {
    pub fn pnl_quote(&self) -> f64 {
        self.quote_spent * self.pnl_percent / 100.0
    }

    pub fn pnl_display(&self) -> f64 {
        self.quote_spent_display * self.pnl_percent / 100.0
    }
}

/// Per-token summary folded from every wallet holding that token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenAggregate {
    pub id: String,
    pub token_address: String,
    pub symbol: String,
    pub display_name: String,
    pub metadata_uri: Option<String>,
    pub image_url: Option<String>,
    pub total_balance: f64,
    pub total_pnl_quote: f64,
    pub total_pnl_display: f64,
    pub total_spent_quote: f64,
    pub total_spent_display: f64,
    pub weighted_pnl_percent: f64,
    pub members: Vec<PositionFact>,
}

impl TokenAggregate {
    pub fn mint_lowercased(&self) -> String {
        self.token_address.to_lowercase()
    }

    pub fn member(&self, wallet_id: &str) -> Option<&PositionFact> {
        self.members.iter().find(|m| m.wallet_id == wallet_id)
    }
}

/// Durable identity of the selected token. Holds no volatile numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRef {
    pub id: Option<String>,
    #[serde(rename = "mint")]
    pub mint_lowercased: Option<String>,
}

impl SelectionRef {
    pub fn for_aggregate(aggregate: &TokenAggregate) -> Self {
        Self {
            id: Some(aggregate.id.clone()),
            mint_lowercased: Some(aggregate.mint_lowercased()),
        }
    }

    /// Match by id first, then by lowercased mint.
    pub fn find_in<'a>(&self, aggregates: &'a [TokenAggregate]) -> Option<&'a TokenAggregate> {
        if let Some(id) = &self.id {
            if let Some(found) = aggregates.iter().find(|a| &a.id == id) {
                return Some(found);
            }
        }
        let mint = self.mint_lowercased.as_ref()?.to_lowercase();
        aggregates
            .iter()
            .find(|a| a.token_address.to_lowercase() == mint)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletEntry {
    pub wallet_id: String,
    pub wallet_name: String,
    pub address: String,
    pub selected: bool,
    pub hidden: bool,
    /// Native quote-asset balance, loaded lazily.
    pub sol_balance: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Manual,
    Auto,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl SelectionMode {
    /// Anything but `auto` reads as manual.
    pub fn from_str_loose(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Manual
        }
    }
}

/// Number of wallets the auto-selector picks: always 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoCount(u8);

impl AutoCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    pub fn new(n: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&n).then_some(Self(n))
    }

    /// Parse a stored value; anything out of range falls back to the default.
    pub fn sanitize(s: &str) -> Self {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .unwrap_or_default()
    }

    /// 1 → 2 → 3 → 1
    pub fn cycle(self) -> Self {
        if self.0 >= Self::MAX {
            Self(Self::MIN)
        } else {
            Self(self.0 + 1)
        }
    }

    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for AutoCount {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl fmt::Display for AutoCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currency used to display P&L values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlCurrency {
    #[default]
    Quote,
    Display,
}

impl PnlCurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Display => "display",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.trim() {
            "display" | "usd" => Self::Display,
            _ => Self::Quote,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Quote => Self::Display,
            Self::Display => Self::Quote,
        }
    }
}
