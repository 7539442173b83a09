use crate::types::PositionFact;
use common::types::ApiPosition;

pub const DEFAULT_TOKEN_DECIMALS: u32 = 6;
pub const DEFAULT_QUOTE_DECIMALS: u32 = 9;

/// Turn one raw position record into a fact. Records without a token
/// address are dropped; unparsable numbers read as zero.
pub fn normalize(raw: &ApiPosition) -> Option<PositionFact> {
    let token = raw.token_info.as_ref()?;
    let token_address = token.address.as_deref().map(str::trim)?;
    if token_address.is_empty() {
        return None;
    }

    let token_decimals = token.decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS);
    let quote_decimals = raw
        .quote_info
        .as_ref()
        .and_then(|q| q.decimals)
        .unwrap_or(DEFAULT_QUOTE_DECIMALS);

    let raw_balance = parse_raw_amount(raw.token_left.as_deref());
    let quote_spent_raw = parse_raw_amount(raw.quote_spent.as_deref());

    let metadata = token.metadata.clone().unwrap_or_default();
    let wallet_id = raw.wallet_id.clone().unwrap_or_default();
    let wallet_name = raw
        .wallet_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Wallet {wallet_id}"));

    Some(PositionFact {
        wallet_id,
        wallet_name,
        position_id: raw.id.clone().unwrap_or_default(),
        token_address: token_address.to_string(),
        token_decimals,
        raw_balance,
        balance: scale(raw_balance, token_decimals),
        pnl_percent: parse_f64(raw.pnl.as_deref()),
        quote_spent_raw,
        quote_decimals,
        quote_spent: scale(quote_spent_raw, quote_decimals),
        quote_spent_display: parse_f64(raw.quote_spent_usd.as_deref()),
        symbol: metadata.symbol.unwrap_or_else(|| "???".to_string()),
        display_name: metadata.name.unwrap_or_else(|| "Unknown".to_string()),
        metadata_uri: metadata.uri.filter(|u| !u.is_empty()),
    })
}

pub fn normalize_all(raw: &[ApiPosition]) -> Vec<PositionFact> {
    raw.iter().filter_map(normalize).collect()
}

/// Smallest-unit amount. Integers parse exactly; decimal strings are
/// truncated; negative or garbage values read as 0.
pub fn parse_raw_amount(s: Option<&str>) -> u128 {
    let Some(s) = s.map(str::trim) else {
        return 0;
    };
    if let Ok(v) = s.parse::<u128>() {
        return v;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v as u128,
        _ => 0,
    }
}

pub fn parse_f64(s: Option<&str>) -> f64 {
    s.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn scale(raw: u128, decimals: u32) -> f64 {
    raw as f64 / 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX))
}
