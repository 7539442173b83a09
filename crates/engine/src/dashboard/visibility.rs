use super::DashboardEngine;
use crate::aggregator;
use crate::error::{EngineError, EngineResult};
use crate::normalizer;
use crate::transport::Transport;
use crate::types::TokenAggregate;
use crate::view::Notice;
use common::types::{PositionAction, PositionStatus};
use futures_util::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{info, warn};

/// Outcome of applying one visibility action to every position of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibilityReport {
    pub symbol: String,
    pub action: &'static str,
    pub attempted: usize,
    pub failed: usize,
}

impl VisibilityReport {
    pub fn notice(&self) -> Notice {
        if self.failed > 0 {
            Notice::error(format!(
                "Failed to {} {}/{} positions",
                self.action, self.failed, self.attempted
            ))
        } else {
            let done = match self.action {
                "hide" => "Hidden",
                "activate" => "Activated",
                _ => "Deleted",
            };
            Notice::success(format!("{done} {}", self.symbol))
        }
    }
}

impl<T: Transport> DashboardEngine<T> {
    /// Fetch and aggregate the hidden position set.
    pub async fn load_hidden(&mut self) -> EngineResult<usize> {
        let raw = self.transport.fetch_positions(PositionStatus::Hidden).await?;
        self.hidden_aggregates = aggregator::aggregate(normalizer::normalize_all(&raw));
        Ok(self.hidden_aggregates.len())
    }

    /// Hide every position of an active token. The token leaves the local
    /// collection even if some remote calls failed.
    pub async fn hide_token(&mut self, id: &str) -> EngineResult<VisibilityReport> {
        let idx = position_of(&self.aggregates, id)?;
        let report = self.apply_action(&self.aggregates[idx], PositionAction::Hide).await?;

        let hidden = self.aggregates.remove(idx);
        let was_selected = self.selection.is_selected(&hidden.id);
        self.hidden_aggregates.push(hidden);
        if was_selected {
            self.selection.clear();
            self.reselect();
        }
        Ok(report)
    }

    /// Move a hidden token back into the active collection.
    pub async fn activate_token(&mut self, id: &str) -> EngineResult<VisibilityReport> {
        let idx = position_of(&self.hidden_aggregates, id)?;
        let report = self
            .apply_action(&self.hidden_aggregates[idx], PositionAction::Activate)
            .await?;

        let restored = self.hidden_aggregates.remove(idx);
        let at = self
            .aggregates
            .iter()
            .position(|a| {
                a.total_balance.partial_cmp(&restored.total_balance) == Some(Ordering::Less)
            })
            .unwrap_or(self.aggregates.len());
        self.aggregates.insert(at, restored);
        Ok(report)
    }

    /// Delete a hidden token's positions for good.
    pub async fn delete_token(&mut self, id: &str) -> EngineResult<VisibilityReport> {
        let idx = position_of(&self.hidden_aggregates, id)?;
        let report = self
            .apply_action(&self.hidden_aggregates[idx], PositionAction::Delete)
            .await?;
        self.hidden_aggregates.remove(idx);
        Ok(report)
    }

    async fn apply_action(
        &self,
        token: &TokenAggregate,
        action: PositionAction,
    ) -> EngineResult<VisibilityReport> {
        let ids: Vec<&str> = token
            .members
            .iter()
            .map(|m| m.position_id.as_str())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(EngineError::NothingToUpdate);
        }

        let results = join_all(
            ids.iter()
                .map(|id| self.transport.set_position_status(id, action)),
        )
        .await;
        let failed = results
            .iter()
            .zip(&ids)
            .filter(|(res, id)| match res {
                Ok(()) => false,
                Err(e) => {
                    warn!(position = %id, action = action.as_str(), error = %e, "position update failed");
                    true
                }
            })
            .count();

        info!(
            token = %token.token_address,
            action = action.as_str(),
            attempted = ids.len(),
            failed,
            "visibility action applied"
        );
        Ok(VisibilityReport {
            symbol: token.symbol.clone(),
            action: action.as_str(),
            attempted: ids.len(),
            failed,
        })
    }
}

fn position_of(aggregates: &[TokenAggregate], id: &str) -> EngineResult<usize> {
    aggregates
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| EngineError::UnknownToken(id.to_string()))
}
