//! 命令行输出格式

use anyhow::Result;
use serde::Serialize;

use crate::agent::AgentStatus;
use crate::infra::tmux::PaneInfo;
use crate::report::state_icon;

/// `--json` 时输出 JSON，否则用给定的文本渲染
pub fn format_output<T, F>(data: &T, json: bool, text: F) -> Result<String>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    if json {
        Ok(serde_json::to_string_pretty(data)?)
    } else {
        Ok(text(data))
    }
}

pub fn format_status_lines(agents: &[AgentStatus]) -> String {
    if agents.is_empty() {
        return "No agents registered".to_string();
    }
    agents
        .iter()
        .map(|a| {
            format!(
                "{} {} {:<18} {:<12} {}",
                state_icon(a.state),
                a.emoji,
                a.name,
                a.agent_id,
                a.state
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_pane_lines(panes: &[PaneInfo]) -> String {
    if panes.is_empty() {
        return "No panes found".to_string();
    }
    panes
        .iter()
        .map(|p| {
            format!(
                "{:<5} pid={:<8} {:<10} {}",
                p.permanent_id, p.pid, p.current_command, p.current_path
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
