//! 配置加载
//!
//! 优先级：CLI 参数 > 环境变量 > `~/.config/agent-timeline-monitor/config.json` > 默认值。
//! 核心组件不读配置，只接收构造参数。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::agent::{AgentRegistry, AgentRegistryEntry};
use crate::delivery::DeliveryConfig;
use crate::report::RecordLog;

pub const ENV_LOG_DIR: &str = "ATM_LOG_DIR";
pub const ENV_SESSION: &str = "ATM_SESSION";
pub const ENV_MISSION_CONTROL_URL: &str = "MISSION_CONTROL_URL";
pub const ENV_MISSION_CONTROL_TOKEN: &str = "MISSION_CONTROL_TOKEN";

/// 配置目录 `~/.config/agent-timeline-monitor`
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config").join("agent-timeline-monitor"))
}

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.json"))
}

/// Mission Control 上报配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionControlConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub timeout_secs: u64,
}

impl Default for MissionControlConfig {
    fn default() -> Self {
        let defaults = DeliveryConfig::default();
        Self {
            base_url: defaults.base_url,
            token: None,
            retries: defaults.retries,
            retry_delay_ms: defaults.retry_delay.as_millis() as u64,
            backoff_multiplier: defaults.backoff_multiplier,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

/// 监控配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// conductor 快照目录
    pub log_dir: PathBuf,
    /// 被监控的 tmux session
    pub session_name: String,
    /// 本地 JSONL 记录文件
    pub record_log: PathBuf,
    pub tmux_bin: String,
    /// 覆盖内置 agent 注册表
    pub agents: Option<Vec<AgentRegistryEntry>>,
    pub mission_control: MissionControlConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(".ai/logs/conductor"),
            session_name: "miyabi-refactor".to_string(),
            record_log: RecordLog::default_path(),
            tmux_bin: "tmux".to_string(),
            agents: None,
            mission_control: MissionControlConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// 加载配置文件并应用环境变量
    ///
    /// 显式指定的文件必须存在；默认路径不存在时使用默认值。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// 用环境变量覆盖，空值忽略
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = get(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(session) = get(ENV_SESSION) {
            self.session_name = session;
        }
        if let Some(url) = get(ENV_MISSION_CONTROL_URL) {
            self.mission_control.base_url = url;
        }
        if let Some(token) = get(ENV_MISSION_CONTROL_TOKEN) {
            self.mission_control.token = Some(token);
        }
    }

    pub fn registry(&self) -> AgentRegistry {
        match &self.agents {
            Some(entries) => AgentRegistry::new(entries.clone()),
            None => AgentRegistry::builtin(),
        }
    }

    pub fn delivery_config(&self) -> DeliveryConfig {
        let mc = &self.mission_control;
        DeliveryConfig {
            base_url: mc.base_url.clone(),
            token: mc.token.clone().filter(|t| !t.is_empty()),
            retries: mc.retries,
            retry_delay: Duration::from_millis(mc.retry_delay_ms),
            backoff_multiplier: mc.backoff_multiplier,
            timeout: Duration::from_secs(mc.timeout_secs),
        }
    }
}
