use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which slice of the remote position book to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Active,
    Hidden,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Hidden => "hidden",
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-position visibility action exposed by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionAction {
    Hide,
    Activate,
    Delete,
}

impl PositionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hide => "hide",
            Self::Activate => "activate",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Token metadata nested under a position's token info.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTokenMetadata {
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub symbol: Option<String>,
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub uri: Option<String>,
}

/// Token (or quote asset) schema attached to a position.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTokenInfo {
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub address: Option<String>,
    #[serde(deserialize_with = "de_opt_u32_any", default)]
    pub decimals: Option<u32>,
    pub metadata: Option<ApiTokenMetadata>,
}

/// One wallet's position in one token, as returned by `/positions/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPosition {
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub id: Option<String>,
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub wallet_id: Option<String>,
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub wallet_name: Option<String>,
    #[serde(rename = "shitcoin_info", alias = "token_info")]
    pub token_info: Option<ApiTokenInfo>,
    #[serde(rename = "stablecoin_info", alias = "quote_info")]
    pub quote_info: Option<ApiTokenInfo>,
    #[serde(
        rename = "shitcoin_left",
        alias = "token_left",
        deserialize_with = "de_opt_string_any",
        default
    )]
    pub token_left: Option<String>,
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub pnl: Option<String>,
    #[serde(
        rename = "stable_spent",
        alias = "quote_spent",
        deserialize_with = "de_opt_string_any",
        default
    )]
    pub quote_spent: Option<String>,
    #[serde(
        rename = "stable_spent_usd",
        alias = "quote_spent_usd",
        deserialize_with = "de_opt_string_any",
        default
    )]
    pub quote_spent_usd: Option<String>,
}

/// `/positions/` answers either `{"positions": [...]}` or a bare array.
/// Records stay raw until [`Self::into_positions`] so one malformed
/// record cannot fail the whole response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiPositionsResponse {
    Wrapped { positions: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl ApiPositionsResponse {
    /// Decode each record on its own, dropping the ones that do not fit.
    pub fn into_positions(self) -> Vec<ApiPosition> {
        let raw = match self {
            Self::Wrapped { positions } => positions,
            Self::Bare(positions) => positions,
        };
        decode_each(raw, "position")
    }
}

fn decode_each<T: serde::de::DeserializeOwned>(raw: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(what, index, error = %e, "dropping malformed record");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiWallet {
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub id: Option<String>,
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiWalletGroup {
    #[serde(rename = "id", alias = "group_id", deserialize_with = "de_opt_string_any", default)]
    pub group_id: Option<String>,
    #[serde(deserialize_with = "de_lenient_vec", default)]
    pub wallets: Vec<ApiWallet>,
}

/// `/wallets/` answers either `{"groups": [...]}` or a bare array of groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiWalletsResponse {
    Wrapped { groups: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl ApiWalletsResponse {
    pub fn into_groups(self) -> Vec<ApiWalletGroup> {
        let raw = match self {
            Self::Wrapped { groups } => groups,
            Self::Bare(groups) => groups,
        };
        decode_each(raw, "wallet group")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiBalanceTokenInfo {
    #[serde(deserialize_with = "de_opt_u32_any", default)]
    pub decimals: Option<u32>,
}

/// Balance of a wallet in native quote asset or a specific token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiWalletBalance {
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub amount: Option<String>,
    #[serde(deserialize_with = "de_opt_u32_any", default)]
    pub decimals: Option<u32>,
    pub token_info: Option<ApiBalanceTokenInfo>,
}

impl ApiWalletBalance {
    /// Decimals may sit at the top level or under `token_info`.
    pub fn decimals(&self) -> Option<u32> {
        self.decimals
            .or_else(|| self.token_info.as_ref().and_then(|t| t.decimals))
    }
}

/// Off-chain JSON document behind a token's metadata URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTokenDocument {
    pub image: Option<String>,
}

/// Body of `POST /trade/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiTradeRequest {
    pub wallet_id: String,
    pub input: String,
    pub amount: String,
    pub direction: TradeDirection,
}

/// Bot task group from `/tasks/`. Tasks are started and stopped per group.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTaskGroup {
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub meta: Option<ApiTaskMeta>,
    #[serde(deserialize_with = "de_lenient_vec", default)]
    pub tasks: Vec<ApiTask>,
}

impl ApiTaskGroup {
    pub fn is_active(&self) -> bool {
        self.meta.as_ref().and_then(|m| m.active).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTaskMeta {
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTask {
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub id: Option<String>,
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTasksResponse {
    #[serde(deserialize_with = "de_lenient_vec", default)]
    pub groups: Vec<ApiTaskGroup>,
}

/// Which wallet list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Whitelist,
    Blacklist,
}

impl ListKind {
    pub fn short(&self) -> &'static str {
        match self {
            Self::Whitelist => "WL",
            Self::Blacklist => "BL",
        }
    }
}

/// One whitelisted or blacklisted wallet address in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiListedWallet {
    #[serde(deserialize_with = "de_string_any", default)]
    pub address: String,
    #[serde(deserialize_with = "de_string_any", default)]
    pub group_id: String,
    #[serde(default)]
    pub is_whitelisted: bool,
    #[serde(default)]
    pub is_blacklisted: bool,
}

impl ApiListedWallet {
    pub fn new(address: &str, group_id: &str, kind: ListKind) -> Self {
        Self {
            address: address.to_string(),
            group_id: group_id.to_string(),
            is_whitelisted: kind == ListKind::Whitelist,
            is_blacklisted: kind == ListKind::Blacklist,
        }
    }

    /// Entries not explicitly whitelisted count as blacklisted.
    pub fn kind(&self) -> ListKind {
        if self.is_whitelisted {
            ListKind::Whitelist
        } else {
            ListKind::Blacklist
        }
    }
}

/// Body of `POST /wlbl`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiListedWalletsRequest {
    pub wallets: Vec<ApiListedWallet>,
}

/// `/wlbl` answers either `{"wallets": [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiListedWalletsResponse {
    Wrapped { wallets: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl ApiListedWalletsResponse {
    pub fn into_wallets(self) -> Vec<ApiListedWallet> {
        let raw = match self {
            Self::Wrapped { wallets } => wallets,
            Self::Bare(wallets) => wallets,
        };
        decode_each(raw, "listed wallet")
    }
}

fn de_string_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(de_opt_string_any(deserializer)?.unwrap_or_default())
}

/// Deserialize a list element by element, skipping elements that do not decode.
pub fn de_lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(decode_each(raw.unwrap_or_default(), std::any::type_name::<T>()))
}

/// Deserialize a count such as token decimals from a number, a numeric
/// string or null. Anything else, including fractional or negative
/// values, becomes `None` instead of an error.
pub fn de_opt_u32_any<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(u32_from_value))
}

fn u32_from_value(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(integral_f64))
            .and_then(|v| u32::try_from(v).ok()),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64).and_then(|v| u32::try_from(v).ok()))
        }
        _ => None,
    }
}

fn integral_f64(v: f64) -> Option<u64> {
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64).then_some(v as u64)
}

/// Deserialize a field that can be either a string or a number into Option<String>.
pub fn de_opt_string_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrNumber;

    impl de::Visitor<'_> for StringOrNumber {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_positions() {
        let json = r#"{"positions":[{
            "id": 17,
            "wallet_id": "snipe1",
            "wallet_name": "Snipe 1",
            "shitcoin_info": {"address": "MintA", "decimals": 6, "metadata": {"name": "Alpha", "symbol": "ALP", "uri": "https://x/a.json"}},
            "stablecoin_info": {"decimals": 9},
            "shitcoin_left": "1000000",
            "pnl": 12.5,
            "stable_spent": 1000000000,
            "stable_spent_usd": "150.0"
        }]}"#;
        let resp: ApiPositionsResponse = serde_json::from_str(json).unwrap();
        let positions = resp.into_positions();
        assert_eq!(positions.len(), 1);
        let p = &positions[0];
        assert_eq!(p.id.as_deref(), Some("17"));
        assert_eq!(p.token_left.as_deref(), Some("1000000"));
        assert_eq!(p.pnl.as_deref(), Some("12.5"));
        assert_eq!(p.quote_spent.as_deref(), Some("1000000000"));
        assert_eq!(
            p.token_info.as_ref().and_then(|t| t.address.as_deref()),
            Some("MintA")
        );
    }

    #[test]
    fn test_parse_bare_positions_with_missing_fields() {
        let json = r#"[{"wallet_id": 3}]"#;
        let resp: ApiPositionsResponse = serde_json::from_str(json).unwrap();
        let positions = resp.into_positions();
        assert_eq!(positions[0].wallet_id.as_deref(), Some("3"));
        assert!(positions[0].token_info.is_none());
        assert!(positions[0].pnl.is_none());
    }

    #[test]
    fn test_malformed_record_is_dropped_not_fatal() {
        let json = r#"[
            {"wallet_id": "w1", "shitcoin_info": {"address": "MintA", "decimals": 6}, "shitcoin_left": "1000000"},
            {"wallet_id": "w2", "shitcoin_info": {"address": "MintB", "decimals": "6"}, "stablecoin_info": {"decimals": 9.0}},
            {"wallet_id": "w3", "shitcoin_info": "not an object"},
            {"wallet_id": "w4", "shitcoin_info": {"address": "MintC", "decimals": "six"}, "stablecoin_info": {"decimals": -1}},
            42
        ]"#;
        let positions = serde_json::from_str::<ApiPositionsResponse>(json)
            .unwrap()
            .into_positions();
        let wallets: Vec<_> = positions.iter().filter_map(|p| p.wallet_id.as_deref()).collect();
        assert_eq!(wallets, vec!["w1", "w2", "w4"]);

        let decimals = |p: &ApiPosition| p.token_info.as_ref().and_then(|t| t.decimals);
        assert_eq!(decimals(&positions[1]), Some(6));
        assert_eq!(positions[1].quote_info.as_ref().and_then(|q| q.decimals), Some(9));
        assert_eq!(decimals(&positions[2]), None);
        assert_eq!(positions[2].quote_info.as_ref().and_then(|q| q.decimals), None);

        let wrapped = r#"{"positions": [{"wallet_id": "w1"}, {"wallet_id": {"nested": true}}]}"#;
        let positions = serde_json::from_str::<ApiPositionsResponse>(wrapped)
            .unwrap()
            .into_positions();
        assert_eq!(positions.len(), 1);
    }

    #[test]
    fn test_lenient_u32_values() {
        use serde_json::json;
        assert_eq!(u32_from_value(&json!(9)), Some(9));
        assert_eq!(u32_from_value(&json!(9.0)), Some(9));
        assert_eq!(u32_from_value(&json!(" 6 ")), Some(6));
        assert_eq!(u32_from_value(&json!("6.0")), Some(6));
        assert_eq!(u32_from_value(&json!(6.5)), None);
        assert_eq!(u32_from_value(&json!(-1)), None);
        assert_eq!(u32_from_value(&json!(true)), None);
        assert_eq!(u32_from_value(&json!(5_000_000_000u64)), None);
    }

    #[test]
    fn test_bad_wallet_entry_keeps_its_group() {
        let json = r#"[{"id": "g1", "wallets": [{"id": "w1", "address": "A1"}, {"id": ["bad"]}, {"id": 7}]}]"#;
        let groups = serde_json::from_str::<ApiWalletsResponse>(json)
            .unwrap()
            .into_groups();
        let ids: Vec<_> = groups[0].wallets.iter().filter_map(|w| w.id.as_deref()).collect();
        assert_eq!(ids, vec!["w1", "7"]);
    }

    #[test]
    fn test_parse_wallet_groups_both_shapes() {
        let wrapped = r#"{"groups":[{"id":"g1","wallets":[{"id":"snipe1","address":"Addr1"}]}]}"#;
        let groups = serde_json::from_str::<ApiWalletsResponse>(wrapped)
            .unwrap()
            .into_groups();
        assert_eq!(groups[0].wallets[0].id.as_deref(), Some("snipe1"));

        let bare = r#"[{"id":"g1","wallets":[]},{"id":"g2"}]"#;
        let groups = serde_json::from_str::<ApiWalletsResponse>(bare)
            .unwrap()
            .into_groups();
        assert_eq!(groups.len(), 2);
        assert!(groups[1].wallets.is_empty());
    }

    #[test]
    fn test_balance_decimals_lookup() {
        let nested: ApiWalletBalance =
            serde_json::from_str(r#"{"amount":"2500000000","token_info":{"decimals":9}}"#).unwrap();
        assert_eq!(nested.decimals(), Some(9));
        let flat: ApiWalletBalance =
            serde_json::from_str(r#"{"amount":5,"decimals":6}"#).unwrap();
        assert_eq!(flat.decimals(), Some(6));
        assert_eq!(flat.amount.as_deref(), Some("5"));
    }

    #[test]
    fn test_parse_task_groups() {
        let json = r#"{"groups": [
            {"id": "snipers", "meta": {"active": true}, "tasks": [{"id": 1, "name": "Sniper A"}, {"id": 2}]},
            {"id": "copy", "tasks": []},
            "garbage"
        ]}"#;
        let resp: ApiTasksResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.groups.len(), 2);
        assert!(resp.groups[0].is_active());
        assert!(!resp.groups[1].is_active());
        assert_eq!(resp.groups[0].tasks[0].id.as_deref(), Some("1"));
        assert_eq!(resp.groups[0].tasks[1].name, None);

        let empty: ApiTasksResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.groups.is_empty());
    }

    #[test]
    fn test_listed_wallets_shapes() {
        let bare = r#"[{"address": "Addr1", "group_id": "g1", "is_whitelisted": true}, {"address": "Addr2", "group_id": "g1"}]"#;
        let wallets = serde_json::from_str::<ApiListedWalletsResponse>(bare)
            .unwrap()
            .into_wallets();
        assert_eq!(wallets[0].kind(), ListKind::Whitelist);
        assert_eq!(wallets[1].kind(), ListKind::Blacklist);

        let wrapped = r#"{"wallets": [{"address": "Addr3", "group_id": 5, "is_blacklisted": true}]}"#;
        let wallets = serde_json::from_str::<ApiListedWalletsResponse>(wrapped)
            .unwrap()
            .into_wallets();
        assert_eq!(wallets[0].group_id, "5");

        let body = serde_json::to_value(ApiListedWalletsRequest {
            wallets: vec![ApiListedWallet::new("Addr1", "g1", ListKind::Blacklist)],
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"wallets": [{"address": "Addr1", "group_id": "g1", "is_whitelisted": false, "is_blacklisted": true}]})
        );
    }

    #[test]
    fn test_trade_request_serializes_direction() {
        let req = ApiTradeRequest {
            wallet_id: "w1".to_string(),
            input: "MintA".to_string(),
            amount: "25%".to_string(),
            direction: TradeDirection::Sell,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["direction"], "sell");
        assert_eq!(json["amount"], "25%");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(PositionStatus::Active.to_string(), "active");
        assert_eq!(PositionStatus::Hidden.as_str(), "hidden");
        assert_eq!(PositionAction::Delete.as_str(), "delete");
    }
}
