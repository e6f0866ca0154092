//! Agent 存活检测 - 根据 tmux pane 推导 RUN / IDLE / DEAD

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::registry::{AgentRegistry, AgentRegistryEntry};
use crate::error::ProcessControlError;
use crate::infra::tmux::{PaneInfo, TmuxCommandRunner, TmuxExecutor, TmuxManager};

/// Agent 存活状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentState {
    /// pane 存在且前台是 agent 进程
    Run,
    /// pane 存在但前台是 shell 或其他进程
    Idle,
    /// 找不到 pane
    Dead,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Run => write!(f, "RUN"),
            AgentState::Idle => write!(f, "IDLE"),
            AgentState::Dead => write!(f, "DEAD"),
        }
    }
}

/// 某一时刻的 agent 状态，每次调用重新计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub agent_id: String,
    pub name: String,
    pub emoji: String,
    pub state: AgentState,
    /// 时间窗内该 agent 最近一次事件的时间（由 TimelineBuilder 填充）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

/// 根据 pane 列表推导单个 agent 的状态
pub fn derive_state(entry: &AgentRegistryEntry, panes: &[PaneInfo]) -> AgentState {
    match panes.iter().find(|p| p.permanent_id == entry.pane) {
        None => AgentState::Dead,
        Some(pane) if entry.matches_command(&pane.current_command) => AgentState::Run,
        Some(_) => AgentState::Idle,
    }
}

fn status_for(entry: &AgentRegistryEntry, panes: &[PaneInfo]) -> AgentStatus {
    AgentStatus {
        agent_id: entry.agent_id.clone(),
        name: entry.name.clone(),
        emoji: entry.emoji.clone(),
        state: derive_state(entry, panes),
        last_activity: None,
    }
}

/// tmux pane 检查器
pub struct ProcessPaneInspector<R = TmuxExecutor> {
    tmux: TmuxManager<R>,
    registry: AgentRegistry,
    session_name: String,
}

impl<R: TmuxCommandRunner> ProcessPaneInspector<R> {
    pub fn new(tmux: TmuxManager<R>, registry: AgentRegistry, session_name: impl Into<String>) -> Self {
        Self {
            tmux,
            registry,
            session_name: session_name.into(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn send_keys(&self, target: &str, keys: &str) -> Result<(), ProcessControlError> {
        self.tmux.send_keys(target, keys)
    }

    /// 见 [`TmuxManager::send_command`]，非原子
    pub fn send_command(&self, target: &str, command: &str) -> Result<(), ProcessControlError> {
        self.tmux.send_command(target, command)
    }

    pub fn get_panes(&self, session_name: &str) -> Result<Vec<PaneInfo>, ProcessControlError> {
        self.tmux.get_panes(session_name)
    }

    pub fn kill_session(&self, session_name: &str) -> Result<(), ProcessControlError> {
        self.tmux.kill_session(session_name)
    }

    /// 查询单个 agent；未注册返回 `Ok(None)`
    pub fn get_agent_status(&self, agent_id: &str) -> Result<Option<AgentStatus>, ProcessControlError> {
        let Some(entry) = self.registry.get(agent_id) else {
            debug!(agent_id = %agent_id, "Agent not registered");
            return Ok(None);
        };
        let panes = self.live_panes()?;
        Ok(Some(status_for(entry, &panes)))
    }

    /// 按注册表顺序返回所有 agent 状态（包括 DEAD）
    pub fn get_all_agent_status(&self) -> Result<Vec<AgentStatus>, ProcessControlError> {
        let panes = self.live_panes()?;
        Ok(self
            .registry
            .iter()
            .map(|entry| status_for(entry, &panes))
            .collect())
    }

    /// session 不存在时所有 agent 都是 DEAD，不算错误
    fn live_panes(&self) -> Result<Vec<PaneInfo>, ProcessControlError> {
        match self.tmux.get_panes(&self.session_name) {
            Ok(panes) => Ok(panes),
            Err(e) if e.is_target_not_found() => {
                debug!(session = %self.session_name, error = %e, "Session not found, treating all agents as dead");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
