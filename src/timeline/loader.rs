//! Conductor 快照加载 - 读取 `assignment-*.json` / `task-assignment-*.json`
//!
//! 每个文件是 conductor 一个周期的快照。解析失败的文件只记录 warn 并跳过，
//! 目录不存在或没有可用文件都视为"没有数据"，不是错误。

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::types::{CompletedTask, ConductorEvent, TimelineEvent, TimelineEventType};
use crate::agent::AgentRegistry;
use crate::error::SnapshotParseError;

/// 接受的文件名前缀
pub const SNAPSHOT_PREFIXES: &[&str] = &["task-assignment-", "assignment-"];

/// 默认的 completions 时间窗（分钟）
pub const DEFAULT_WINDOW_MINUTES: u32 = 60;

fn snapshot_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:task-)?assignment-.+\.json$").expect("snapshot filename pattern is valid")
    })
}

/// 文件名中去掉前缀后的排序键（内嵌可排序的时间戳）
pub fn snapshot_sort_key(name: &str) -> &str {
    SNAPSHOT_PREFIXES
        .iter()
        .find_map(|p| name.strip_prefix(p))
        .unwrap_or(name)
}

/// 候选快照文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCandidate {
    pub name: String,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
}

/// 快照来源
pub trait SnapshotSource {
    /// 候选文件，新的在前
    fn list_candidates(&self) -> Vec<SnapshotCandidate>;

    /// 解析单个候选文件
    fn parse_one(&self, candidate: &SnapshotCandidate) -> Result<ConductorEvent, SnapshotParseError>;
}

/// 基于目录的快照来源
#[derive(Debug, Clone)]
pub struct DirectorySnapshotSource {
    dir: PathBuf,
}

impl DirectorySnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotSource for DirectorySnapshotSource {
    fn list_candidates(&self) -> Vec<SnapshotCandidate> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "Snapshot directory not readable");
                return Vec::new();
            }
        };

        let mut candidates: Vec<SnapshotCandidate> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                if !snapshot_name_pattern().is_match(&name) {
                    return None;
                }
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                Some(SnapshotCandidate {
                    path: entry.path(),
                    modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                    name,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            snapshot_sort_key(&b.name)
                .cmp(snapshot_sort_key(&a.name))
                .then_with(|| b.name.cmp(&a.name))
        });
        candidates
    }

    fn parse_one(&self, candidate: &SnapshotCandidate) -> Result<ConductorEvent, SnapshotParseError> {
        let content =
            std::fs::read_to_string(&candidate.path).map_err(|source| SnapshotParseError::Io {
                path: candidate.path.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| SnapshotParseError::Json {
            path: candidate.path.clone(),
            source,
        })
    }
}

/// Conductor 事件加载器
pub struct EventLoader<S = DirectorySnapshotSource> {
    source: S,
    registry: AgentRegistry,
}

impl EventLoader<DirectorySnapshotSource> {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(DirectorySnapshotSource::new(dir))
    }
}

impl<S: SnapshotSource> EventLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            registry: AgentRegistry::default(),
        }
    }

    /// 使用注册表解析 agent 显示名
    pub fn with_registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// 唯一的跳过点：解析失败记录 warn 并返回 None
    fn parse_or_skip(&self, candidate: &SnapshotCandidate) -> Option<ConductorEvent> {
        match self.source.parse_one(candidate) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(file = %candidate.name, error = %e, "Skipping unparsable snapshot");
                None
            }
        }
    }

    /// 最新的可解析快照
    pub fn load_latest_assignment(&self) -> Option<ConductorEvent> {
        self.source
            .list_candidates()
            .iter()
            .find_map(|c| self.parse_or_skip(c))
    }

    /// 最近 `window_minutes` 分钟内修改过的快照，按 timestamp 降序
    pub fn load_assignments(&self, window_minutes: u32) -> Vec<ConductorEvent> {
        self.load_assignments_since(Utc::now() - Duration::minutes(i64::from(window_minutes)))
    }

    pub fn load_assignments_since(&self, cutoff: DateTime<Utc>) -> Vec<ConductorEvent> {
        let mut events: Vec<ConductorEvent> = self
            .source
            .list_candidates()
            .iter()
            .filter(|c| c.modified.is_some_and(|m| m >= cutoff))
            .filter_map(|c| self.parse_or_skip(c))
            .collect();

        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        debug!(count = events.len(), cutoff = %cutoff, "Loaded conductor snapshots");
        events
    }

    /// 时间窗内所有完成的任务，最新文件在前，文件内保持原顺序
    pub fn get_recent_completions(&self, window_minutes: u32) -> Vec<CompletedTask> {
        self.load_assignments(window_minutes)
            .into_iter()
            .flat_map(|e| e.completed_this_cycle)
            .collect()
    }

    /// 把快照转换为 timeline 事件，整体按 timestamp 降序
    pub fn to_timeline_events(&self, events: &[ConductorEvent]) -> Vec<TimelineEvent> {
        let mut timeline: Vec<TimelineEvent> = Vec::new();

        for event in events {
            for task in &event.completed_this_cycle {
                timeline.push(TimelineEvent {
                    timestamp: event.timestamp,
                    event_type: TimelineEventType::TaskCompleted,
                    agent_id: task.agent.clone(),
                    agent_name: self.registry.display_name(&task.agent).to_string(),
                    issue_number: Some(task.issue),
                    task_id: Some(format!("issue-{}", task.issue)),
                    description: format!("Completed: {}", task.title),
                    metadata: Some(cycle_metadata(event)),
                });
            }

            for (agent_key, assignment) in &event.assignments {
                let Some(new) = &assignment.new_assignment else {
                    continue;
                };
                let mut metadata = cycle_metadata(event);
                metadata.extend(new.extra.clone());
                timeline.push(TimelineEvent {
                    timestamp: event.timestamp,
                    event_type: TimelineEventType::TaskStarted,
                    agent_id: agent_key.clone(),
                    agent_name: self.registry.display_name(agent_key).to_string(),
                    issue_number: new.issue,
                    task_id: new.issue.map(|i| format!("issue-{}", i)),
                    description: format!(
                        "Started: {}",
                        new.title.as_deref().unwrap_or("Unknown task")
                    ),
                    metadata: Some(metadata),
                });
            }
        }

        // 稳定排序：同一快照内保持 completions 在前
        timeline.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        timeline
    }
}

fn cycle_metadata(event: &ConductorEvent) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("cycle".to_string(), Value::from(event.cycle));
    metadata.insert("mode".to_string(), Value::from(event.mode.clone()));
    metadata.insert("conductor".to_string(), Value::from(event.conductor.clone()));
    metadata
}
