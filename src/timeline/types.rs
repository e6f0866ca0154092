//! Timeline 数据模型 - conductor 快照、归一化事件、汇总报告

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::agent::{AgentState, AgentStatus};

/// ISO-8601 时间串（毫秒精度，`Z` 结尾）
pub fn to_iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 本轮完成的任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub issue: u64,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub title: String,
}

/// 新分配的任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 某个 agent 在本轮的分配信息，除 `new_assignment` 外原样保留
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_assignment: Option<NewAssignment>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 一个 conductor 周期快照文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductorEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cycle: u64,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub conductor: String,
    #[serde(default)]
    pub assignments: BTreeMap<String, AgentAssignment>,
    #[serde(default)]
    pub completed_this_cycle: Vec<CompletedTask>,
}

/// Timeline 事件类型
///
/// 未知类型以原始字符串保留，序列化时原样输出。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimelineEventType {
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    AgentIdle,
    AgentDead,
    Other(String),
}

impl TimelineEventType {
    pub fn as_str(&self) -> &str {
        match self {
            TimelineEventType::TaskStarted => "task_started",
            TimelineEventType::TaskCompleted => "task_completed",
            TimelineEventType::TaskFailed => "task_failed",
            TimelineEventType::AgentIdle => "agent_idle",
            TimelineEventType::AgentDead => "agent_dead",
            TimelineEventType::Other(s) => s,
        }
    }
}

impl From<&str> for TimelineEventType {
    fn from(s: &str) -> Self {
        match s {
            "task_started" => TimelineEventType::TaskStarted,
            "task_completed" => TimelineEventType::TaskCompleted,
            "task_failed" => TimelineEventType::TaskFailed,
            "agent_idle" => TimelineEventType::AgentIdle,
            "agent_dead" => TimelineEventType::AgentDead,
            other => TimelineEventType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TimelineEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TimelineEventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TimelineEventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TimelineEventType::from(s.as_str()))
    }
}

/// 归一化后的 timeline 事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
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

/// conductor 最近一次决策的概况
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConductorStatus {
    pub conductor_name: String,
    pub last_cycle: u64,
    pub last_activity: DateTime<Utc>,
    pub mode: String,
}

impl From<&ConductorEvent> for ConductorStatus {
    fn from(event: &ConductorEvent) -> Self {
        Self {
            conductor_name: event.conductor.clone(),
            last_cycle: event.cycle,
            last_activity: event.timestamp,
            mode: event.mode.clone(),
        }
    }
}

/// agent 状态计数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStates {
    pub total: usize,
    pub run: usize,
    pub idle: usize,
    pub dead: usize,
    pub agents: Vec<AgentStatus>,
}

impl AgentStates {
    pub fn from_agents(agents: Vec<AgentStatus>) -> Self {
        let count = |state: AgentState| agents.iter().filter(|a| a.state == state).count();
        Self {
            total: agents.len(),
            run: count(AgentState::Run),
            idle: count(AgentState::Idle),
            dead: count(AgentState::Dead),
            agents,
        }
    }
}

/// 汇总报告，构造后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineReport {
    pub generated_at: DateTime<Utc>,
    pub session_name: String,
    pub agent_states: AgentStates,
    pub recent_events: Vec<TimelineEvent>,
    pub recent_completions: Vec<CompletedTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conductor_status: Option<ConductorStatus>,
}
