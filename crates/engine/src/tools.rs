use crate::dashboard::DashboardEngine;
use crate::error::{EngineError, EngineResult};
use crate::transport::{TaskCommand, Transport};
use crate::view::Notice;
use anyhow::Context;
use common::types::{ApiListedWallet, ApiTaskGroup, ListKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// A task group as the tools panel lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskGroupView {
    pub id: String,
    pub active: bool,
    pub tasks: Vec<String>,
}

impl TaskGroupView {
    fn from_api(group: &ApiTaskGroup) -> Option<Self> {
        let id = group.id.clone().filter(|id| !id.is_empty())?;
        let tasks = group
            .tasks
            .iter()
            .filter_map(|t| t.name.clone().filter(|n| !n.is_empty()).or_else(|| t.id.clone()))
            .collect();
        Some(Self {
            active: group.is_active(),
            id,
            tasks,
        })
    }
}

/// Outcome of starting or stopping every eligible task group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskBatchReport {
    pub command: &'static str,
    pub attempted: usize,
    pub succeeded: usize,
}

impl TaskBatchReport {
    pub fn notice(&self) -> Notice {
        if self.attempted == 0 {
            let state = if self.command == "start" { "idle" } else { "running" };
            return Notice::info(format!("No {state} task groups"));
        }
        let verb = if self.command == "start" { "Started" } else { "Stopped" };
        let message = format!("{verb} {}/{} task groups", self.succeeded, self.attempted);
        if self.succeeded < self.attempted {
            Notice::error(message)
        } else {
            Notice::success(message)
        }
    }
}

/// Service management verbs: health, task groups and the wallet
/// white/blacklists. Holds no dashboard state, so it can run while the
/// engine itself is locked by a tick.
pub struct ToolsPanel<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> DashboardEngine<T> {
    pub fn tools(&self) -> ToolsPanel<T> {
        ToolsPanel::new(Arc::clone(self.transport()))
    }
}

impl<T: Transport> ToolsPanel<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// False on any failure, connection errors included.
    pub async fn check_health(&self) -> bool {
        match self.transport.check_health().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "health check failed");
                false
            }
        }
    }

    pub async fn task_groups(&self) -> EngineResult<Vec<TaskGroupView>> {
        let groups = self
            .transport
            .fetch_task_groups()
            .await
            .context("failed to load task groups")?;
        Ok(groups.iter().filter_map(TaskGroupView::from_api).collect())
    }

    pub async fn start_task_group(&self, group_id: &str) -> EngineResult<()> {
        self.control(group_id, TaskCommand::Start).await
    }

    pub async fn stop_task_group(&self, group_id: &str) -> EngineResult<()> {
        self.control(group_id, TaskCommand::Stop).await
    }

    pub async fn delete_task_group(&self, group_id: &str) -> EngineResult<()> {
        self.control(group_id, TaskCommand::Delete).await
    }

    async fn control(&self, group_id: &str, command: TaskCommand) -> EngineResult<()> {
        let group_id = required("group", group_id)?;
        self.transport
            .control_task_group(group_id, command)
            .await
            .with_context(|| format!("failed to {} task group {group_id}", command.as_str()))?;
        info!(group = group_id, command = command.as_str(), "task group updated");
        Ok(())
    }

    /// Start every group that is not running. One failing group does not
    /// stop the rest.
    pub async fn start_idle_task_groups(&self) -> EngineResult<TaskBatchReport> {
        self.apply_to_groups(TaskCommand::Start, |g| !g.active).await
    }

    /// Stop every running group.
    pub async fn stop_running_task_groups(&self) -> EngineResult<TaskBatchReport> {
        self.apply_to_groups(TaskCommand::Stop, |g| g.active).await
    }

    async fn apply_to_groups(
        &self,
        command: TaskCommand,
        eligible: impl Fn(&TaskGroupView) -> bool,
    ) -> EngineResult<TaskBatchReport> {
        let groups = self.task_groups().await?;
        let mut report = TaskBatchReport {
            command: command.as_str(),
            attempted: 0,
            succeeded: 0,
        };
        for group in groups.iter().filter(|g| eligible(g)) {
            report.attempted += 1;
            match self.transport.control_task_group(&group.id, command).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => warn!(
                    group = %group.id,
                    command = command.as_str(),
                    error = %format!("{e:#}"),
                    "task group command failed"
                ),
            }
        }
        info!(
            command = command.as_str(),
            attempted = report.attempted,
            succeeded = report.succeeded,
            "task groups updated"
        );
        Ok(report)
    }

    /// Every listed wallet, or only one group's when `group_id` is set.
    pub async fn listed_wallets(&self, group_id: Option<&str>) -> EngineResult<Vec<ApiListedWallet>> {
        let group_id = group_id.map(str::trim).filter(|g| !g.is_empty());
        let wallets = self
            .transport
            .fetch_listed_wallets(group_id)
            .await
            .context("failed to load wallet lists")?;
        Ok(wallets)
    }

    pub async fn add_listed_wallet(
        &self,
        address: &str,
        group_id: &str,
        kind: ListKind,
    ) -> EngineResult<ApiListedWallet> {
        let address = required("wallet address", address)?;
        let group_id = required("group name", group_id)?;
        let entry = ApiListedWallet::new(address, group_id, kind);
        self.transport
            .add_listed_wallet(&entry)
            .await
            .with_context(|| format!("failed to add {address} to {}", kind.short()))?;
        info!(address, group = group_id, list = kind.short(), "wallet listed");
        Ok(entry)
    }

    pub async fn remove_listed_wallet(&self, group_id: &str, address: &str) -> EngineResult<()> {
        let address = required("wallet address", address)?;
        let group_id = required("group name", group_id)?;
        self.transport
            .remove_listed_wallet(group_id, address)
            .await
            .with_context(|| format!("failed to remove {address} from group {group_id}"))?;
        info!(address, group = group_id, "wallet unlisted");
        Ok(())
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> EngineResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::MissingField(field));
    }
    Ok(value)
}
