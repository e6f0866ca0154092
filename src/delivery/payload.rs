//! Mission Control 上报载荷 - TimelineReport 的线上格式
//!
//! 与 `TimelineReport` 结构一致，所有时间字段转为 ISO-8601 字符串，
//! 另加 `persisted_locally` 和 `version` 两个协议字段。

use serde::{Deserialize, Serialize};

use crate::agent::{AgentState, AgentStatus};
use crate::timeline::{
    to_iso8601, CompletedTask, ConductorStatus, TimelineEvent, TimelineEventType, TimelineReport,
};

/// 客户端协议版本
pub const PROTOCOL_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadAgentStatus {
    pub agent_id: String,
    pub name: String,
    pub emoji: String,
    pub state: AgentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadAgentStates {
    pub total: usize,
    pub run: usize,
    pub idle: usize,
    pub dead: usize,
    pub agents: Vec<PayloadAgentStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadEvent {
    pub timestamp: String,
    pub event_type: TimelineEventType,
    pub agent_id: String,
    pub agent_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadConductorStatus {
    pub conductor_name: String,
    pub last_cycle: u64,
    pub last_activity: String,
    pub mode: String,
}

/// POST `/timeline/events` 的请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionControlPayload {
    pub generated_at: String,
    pub session_name: String,
    pub agent_states: PayloadAgentStates,
    pub recent_events: Vec<PayloadEvent>,
    pub recent_completions: Vec<CompletedTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conductor_status: Option<PayloadConductorStatus>,
    pub persisted_locally: bool,
    pub version: String,
}

impl From<&AgentStatus> for PayloadAgentStatus {
    fn from(agent: &AgentStatus) -> Self {
        Self {
            agent_id: agent.agent_id.clone(),
            name: agent.name.clone(),
            emoji: agent.emoji.clone(),
            state: agent.state,
            last_activity: agent.last_activity.as_ref().map(to_iso8601),
        }
    }
}

impl From<&TimelineEvent> for PayloadEvent {
    fn from(event: &TimelineEvent) -> Self {
        Self {
            timestamp: to_iso8601(&event.timestamp),
            event_type: event.event_type.clone(),
            agent_id: event.agent_id.clone(),
            agent_name: event.agent_name.clone(),
            issue_number: event.issue_number,
            task_id: event.task_id.clone(),
            description: event.description.clone(),
            metadata: event.metadata.clone(),
        }
    }
}

impl From<&ConductorStatus> for PayloadConductorStatus {
    fn from(status: &ConductorStatus) -> Self {
        Self {
            conductor_name: status.conductor_name.clone(),
            last_cycle: status.last_cycle,
            last_activity: to_iso8601(&status.last_activity),
            mode: status.mode.clone(),
        }
    }
}

/// 纯转换，不修改输入报告
pub fn to_payload(report: &TimelineReport, persisted_locally: bool) -> MissionControlPayload {
    let states = &report.agent_states;
    MissionControlPayload {
        generated_at: to_iso8601(&report.generated_at),
        session_name: report.session_name.clone(),
        agent_states: PayloadAgentStates {
            total: states.total,
            run: states.run,
            idle: states.idle,
            dead: states.dead,
            agents: states.agents.iter().map(PayloadAgentStatus::from).collect(),
        },
        recent_events: report.recent_events.iter().map(PayloadEvent::from).collect(),
        recent_completions: report.recent_completions.clone(),
        conductor_status: report.conductor_status.as_ref().map(PayloadConductorStatus::from),
        persisted_locally,
        version: PROTOCOL_VERSION.to_string(),
    }
}
