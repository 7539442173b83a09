use crate::types::{AutoCount, TokenAggregate, WalletEntry};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Mark the `count` wallets holding the most of `token` as selected and
/// every other wallet as unselected. Wallets without a position count as
/// balance 0; ties keep roster order. With no token selected the first
/// `count` wallets of the roster win.
pub fn apply_auto_selection(
    wallets: &mut [WalletEntry],
    token: Option<&TokenAggregate>,
    count: AutoCount,
) {
    let balances: HashMap<&str, f64> = token
        .map(|agg| {
            agg.members
                .iter()
                .map(|m| (m.wallet_id.as_str(), m.balance))
                .collect()
        })
        .unwrap_or_default();

    let mut ranked: Vec<(usize, f64)> = wallets
        .iter()
        .enumerate()
        .map(|(i, w)| (i, balances.get(w.wallet_id.as_str()).copied().unwrap_or(0.0)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut chosen = vec![false; wallets.len()];
    for (i, _) in ranked.into_iter().take(count.get()) {
        chosen[i] = true;
    }
    for (wallet, pick) in wallets.iter_mut().zip(chosen) {
        wallet.selected = pick;
    }
}
