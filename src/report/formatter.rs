//! 报告格式化 - 终端展示、单行 JSON 记录、一行摘要
//!
//! 三个函数都是 `TimelineReport` 的纯函数，无 I/O。

use chrono::Local;
use serde_json::json;

use crate::agent::AgentState;
use crate::timeline::{to_iso8601, TimelineEventType, TimelineReport};

/// 终端展示的最近事件条数
pub const DISPLAY_EVENT_LIMIT: usize = 5;

/// 单行记录中的最近事件条数，保证每条记录大小有上限
pub const RECORD_EVENT_LIMIT: usize = 10;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn state_icon(state: AgentState) -> &'static str {
    match state {
        AgentState::Run => "🟢",
        AgentState::Idle => "🟡",
        AgentState::Dead => "🔴",
    }
}

pub fn event_icon(event_type: &TimelineEventType) -> &'static str {
    match event_type {
        TimelineEventType::TaskStarted => "🚀",
        TimelineEventType::TaskCompleted => "✅",
        TimelineEventType::TaskFailed => "❌",
        TimelineEventType::AgentIdle => "⏸️",
        TimelineEventType::AgentDead => "💀",
        TimelineEventType::Other(_) => "📝",
    }
}

/// 多行终端展示
pub fn format_for_display(report: &TimelineReport) -> String {
    let states = &report.agent_states;
    let generated = report.generated_at.with_timezone(&Local);

    let mut out = format!(
        "{rule}\n🤖 Agent Timeline · {}\n{rule}\n📊 Agents: {} total  |  RUN {}  |  IDLE {}  |  DEAD {}\n",
        report.session_name,
        states.total,
        states.run,
        states.idle,
        states.dead,
        rule = RULE,
    );

    for agent in &states.agents {
        out.push_str(&format!(
            "  {} {} {} ({}) {}\n",
            state_icon(agent.state),
            agent.emoji,
            agent.name,
            agent.agent_id,
            agent.state
        ));
    }

    if let Some(conductor) = &report.conductor_status {
        out.push_str(&format!(
            "\n🎼 Conductor: {}\n  Cycle: #{}  |  Mode: {}\n  Last activity: {}\n",
            conductor.conductor_name,
            conductor.last_cycle,
            conductor.mode,
            conductor
                .last_activity
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        ));
    }

    if !report.recent_completions.is_empty() {
        out.push_str("\n✅ Recent completions\n");
        for task in &report.recent_completions {
            out.push_str(&format!("  #{}: {} ({})\n", task.issue, task.title, task.agent));
        }
    }

    if !report.recent_events.is_empty() {
        out.push_str("\n📜 Recent events\n");
        for event in report.recent_events.iter().take(DISPLAY_EVENT_LIMIT) {
            out.push_str(&format!(
                "  {} {} {}: {}\n",
                event_icon(&event.event_type),
                event.timestamp.with_timezone(&Local).format("%H:%M:%S"),
                event.agent_name,
                event.description
            ));
        }
    }

    out.push_str(&format!(
        "{}\nGenerated at {}",
        RULE,
        generated.format("%Y-%m-%d %H:%M:%S")
    ));
    out
}

/// 单行 JSON，用于追加式日志
pub fn format_for_record(report: &TimelineReport) -> String {
    let events: Vec<serde_json::Value> = report
        .recent_events
        .iter()
        .take(RECORD_EVENT_LIMIT)
        .map(|e| {
            json!({
                "timestamp": to_iso8601(&e.timestamp),
                "event_type": e.event_type.as_str(),
                "agent_id": e.agent_id,
                "description": e.description,
            })
        })
        .collect();

    json!({
        "timestamp": to_iso8601(&report.generated_at),
        "session_name": report.session_name,
        "agent_states": {
            "run": report.agent_states.run,
            "idle": report.agent_states.idle,
            "dead": report.agent_states.dead,
        },
        "recent_events": events,
    })
    .to_string()
}

/// 一行摘要
pub fn format_summary(report: &TimelineReport) -> String {
    format!(
        "[{}] RUN:{} IDLE:{} DEAD:{} | Last update: {}",
        report.session_name,
        report.agent_states.run,
        report.agent_states.idle,
        report.agent_states.dead,
        report
            .generated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    )
}
