use crate::transport::Transport;
use crate::types::{PositionFact, TokenAggregate};
use common::client::is_http_url;
use futures_util::future::join_all;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Fold facts into one aggregate per token address, sorted by total
/// balance descending. The sort is stable, so equal balances keep the
/// order in which their tokens first appeared.
pub fn aggregate(facts: Vec<PositionFact>) -> Vec<TokenAggregate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<TokenAggregate> = Vec::new();

    for fact in facts {
        let slot = *index.entry(fact.token_address.clone()).or_insert_with(|| {
            out.push(TokenAggregate {
                id: fact.token_address.clone(),
                token_address: fact.token_address.clone(),
                symbol: fact.symbol.clone(),
                display_name: fact.display_name.clone(),
                metadata_uri: fact.metadata_uri.clone(),
                image_url: None,
                total_balance: 0.0,
                total_pnl_quote: 0.0,
                total_pnl_display: 0.0,
                total_spent_quote: 0.0,
                total_spent_display: 0.0,
                weighted_pnl_percent: 0.0,
                members: Vec::new(),
            });
            out.len() - 1
        });

        let agg = &mut out[slot];
        agg.total_balance += fact.balance;
        agg.total_spent_quote += fact.quote_spent;
        agg.total_spent_display += fact.quote_spent_display;
        agg.total_pnl_quote += fact.pnl_quote();
        agg.total_pnl_display += fact.pnl_display();
        agg.members.push(fact);
    }

    for agg in &mut out {
        agg.weighted_pnl_percent = weighted_pnl_percent(agg.total_pnl_quote, agg.total_spent_quote);
    }

    out.sort_by(|a, b| {
        b.total_balance
            .partial_cmp(&a.total_balance)
            .unwrap_or(Ordering::Equal)
    });
    out
}

/// Spend-weighted P&L percentage; 0 when nothing was spent.
pub fn weighted_pnl_percent(total_pnl_quote: f64, total_spent_quote: f64) -> f64 {
    if total_spent_quote > 0.0 {
        total_pnl_quote / total_spent_quote * 100.0
    } else {
        0.0
    }
}

/// Image URLs resolved so far, keyed by metadata URI. Failed lookups are
/// remembered as `None` so a broken URI is not refetched every tick.
#[derive(Debug, Default)]
pub struct IconCache {
    resolved: HashMap<String, Option<String>>,
}

/// Fill `image_url` on finished aggregates. Unknown URIs are fetched in
/// parallel; this returns once every fetch has settled, and a failed
/// fetch only leaves its own icon empty.
pub async fn resolve_icons<T: Transport>(
    aggregates: &mut [TokenAggregate],
    transport: &T,
    cache: &mut IconCache,
) {
    let mut pending: Vec<String> = aggregates
        .iter()
        .filter_map(|a| a.metadata_uri.clone())
        .filter(|uri| !cache.resolved.contains_key(uri))
        .collect();
    pending.sort();
    pending.dedup();

    if !pending.is_empty() {
        let fetched = join_all(pending.iter().map(|uri| async move {
            match transport.fetch_token_metadata(uri).await {
                Ok(doc) => doc
                    .image
                    .map(|img| img.trim().to_string())
                    .filter(|img| is_http_url(img)),
                Err(e) => {
                    debug!(uri = %uri, error = %e, "icon fetch failed");
                    metrics::counter!("dashboard_icon_fetch_failures_total").increment(1);
                    None
                }
            }
        }))
        .await;

        for (uri, image) in pending.into_iter().zip(fetched) {
            cache.resolved.insert(uri, image);
        }
    }

    for agg in aggregates.iter_mut() {
        agg.image_url = agg
            .metadata_uri
            .as_deref()
            .and_then(|uri| cache.resolved.get(uri).cloned().flatten());
    }
}
