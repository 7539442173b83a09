use crate::types::TokenAggregate;
use std::collections::{HashMap, HashSet};

/// How a freshly aggregated collection differs from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A token appeared or disappeared.
    Structural,
    /// Same tokens, but at least one total balance moved to or from exactly zero.
    ZeroCrossing,
    /// Same tokens, numbers only.
    Incremental,
    /// The wallet roster arrived late; wallet rows must be rebuilt.
    Roster,
}

impl ChangeKind {
    pub fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Incremental)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::ZeroCrossing => "zero_crossing",
            Self::Incremental => "incremental",
            Self::Roster => "roster",
        }
    }
}

/// Result of one reconciliation tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Rebuild(ChangeKind),
    Refresh,
    /// The pipeline failed; the previous snapshot is still current.
    Failed(String),
}

impl TickOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rebuild(_) => "rebuild",
            Self::Refresh => "refresh",
            Self::Failed(_) => "failed",
        }
    }
}

/// Compare the id sets first, then look for zero crossings among the
/// tokens present in both. A partial balance change, however large, is
/// incremental.
pub fn classify(previous: &[TokenAggregate], next: &[TokenAggregate]) -> ChangeKind {
    let old: HashMap<&str, f64> = previous
        .iter()
        .map(|a| (a.id.as_str(), a.total_balance))
        .collect();
    let old_ids: HashSet<&str> = old.keys().copied().collect();
    let new_ids: HashSet<&str> = next.iter().map(|a| a.id.as_str()).collect();
    if old_ids != new_ids {
        return ChangeKind::Structural;
    }

    let crossed = next.iter().any(|agg| {
        old.get(agg.id.as_str())
            .is_some_and(|&before| is_zero(before) != is_zero(agg.total_balance))
    });
    if crossed {
        ChangeKind::ZeroCrossing
    } else {
        ChangeKind::Incremental
    }
}

fn is_zero(balance: f64) -> bool {
    balance <= 0.0
}
