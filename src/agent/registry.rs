//! Agent 注册表 - agent_id 到显示名、emoji、pane 的静态映射
//!
//! 注册表在构造后不可变，由调用方注入到 `ProcessPaneInspector`。

use serde::{Deserialize, Serialize};

/// 未配置 `expected_commands` 时视为"在运行"的前台命令
pub const DEFAULT_AGENT_COMMANDS: &[&str] = &["claude", "node", "codex", "python", "python3"];

/// 注册表条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRegistryEntry {
    pub agent_id: String,
    pub name: String,
    pub emoji: String,
    /// agent 所在 pane 的稳定标识（`%N`）
    pub pane: String,
    /// 期望的前台进程名（精确匹配，忽略大小写）
    #[serde(default)]
    pub expected_commands: Vec<String>,
}

impl AgentRegistryEntry {
    pub fn new(
        agent_id: impl Into<String>,
        name: impl Into<String>,
        emoji: impl Into<String>,
        pane: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            emoji: emoji.into(),
            pane: pane.into(),
            expected_commands: Vec::new(),
        }
    }

    pub fn with_expected_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// 前台命令是否是该 agent 的进程
    pub fn matches_command(&self, command: &str) -> bool {
        if self.expected_commands.is_empty() {
            DEFAULT_AGENT_COMMANDS
                .iter()
                .any(|c| c.eq_ignore_ascii_case(command))
        } else {
            self.expected_commands
                .iter()
                .any(|c| c.eq_ignore_ascii_case(command))
        }
    }
}

/// 有序、只读的注册表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRegistry {
    entries: Vec<AgentRegistryEntry>,
}

impl AgentRegistry {
    /// 按给定顺序构造；重复的 agent_id 只保留第一个
    pub fn new(entries: Vec<AgentRegistryEntry>) -> Self {
        let mut unique: Vec<AgentRegistryEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if unique.iter().any(|e| e.agent_id == entry.agent_id) {
                tracing::warn!(agent_id = %entry.agent_id, "Duplicate registry entry ignored");
                continue;
            }
            unique.push(entry);
        }
        Self { entries: unique }
    }

    /// 内置的 Miyabi agent 编组
    pub fn builtin() -> Self {
        Self::new(vec![
            AgentRegistryEntry::new("conductor", "Conductor", "🎼", "%0"),
            AgentRegistryEntry::new("coordinator", "CoordinatorAgent", "🎯", "%1"),
            AgentRegistryEntry::new("codegen", "CodeGenAgent", "💻", "%2"),
            AgentRegistryEntry::new("review", "ReviewAgent", "🔍", "%3"),
            AgentRegistryEntry::new("issue", "IssueAgent", "📋", "%4"),
            AgentRegistryEntry::new("pr", "PRAgent", "🔀", "%5"),
            AgentRegistryEntry::new("deployment", "DeploymentAgent", "🚀", "%6"),
        ])
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentRegistryEntry> {
        self.entries.iter().find(|e| e.agent_id == agent_id)
    }

    /// 显示名，未注册时返回 agent_id 本身
    pub fn display_name<'a>(&'a self, agent_id: &'a str) -> &'a str {
        self.get(agent_id).map(|e| e.name.as_str()).unwrap_or(agent_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRegistryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_order() {
        let registry = AgentRegistry::builtin();
        let ids: Vec<&str> = registry.iter().map(|e| e.agent_id.as_str()).collect();
        assert_eq!(ids[0], "conductor");
        assert_eq!(ids[1], "coordinator");
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let registry = AgentRegistry::builtin();
        assert!(registry.get("unregistered-id").is_none());
        assert_eq!(registry.display_name("unregistered-id"), "unregistered-id");
        assert_eq!(registry.display_name("review"), "ReviewAgent");
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let registry = AgentRegistry::new(vec![
            AgentRegistryEntry::new("a", "First", "1️⃣", "%0"),
            AgentRegistryEntry::new("a", "Second", "2️⃣", "%1"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().name, "First");
    }

    #[test]
    fn test_matches_command_defaults() {
        let entry = AgentRegistryEntry::new("x", "X", "❌", "%0");
        assert!(entry.matches_command("node"));
        assert!(entry.matches_command("Claude"));
        assert!(!entry.matches_command("bash"));
        assert!(!entry.matches_command("nodemon"));
    }

    #[test]
    fn test_matches_command_custom_list() {
        let entry = AgentRegistryEntry::new("x", "X", "❌", "%0").with_expected_commands(["cargo"]);
        assert!(entry.matches_command("cargo"));
        assert!(!entry.matches_command("node"));
    }

    #[test]
    fn test_entry_deserialization_defaults_commands() {
        let json = r#"{"agent_id":"codegen","name":"CodeGenAgent","emoji":"💻","pane":"%2"}"#;
        let entry: AgentRegistryEntry = serde_json::from_str(json).unwrap();
        assert!(entry.expected_commands.is_empty());
        assert_eq!(entry.pane, "%2");
    }
}
