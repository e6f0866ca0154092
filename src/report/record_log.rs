//! 报告记录 - 本地 JSONL 文件追加与读取

use anyhow::Result;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::formatter::format_for_record;
use crate::config::config_dir;
use crate::timeline::TimelineReport;

/// 追加式记录文件，每行一条 `format_for_record` 输出
#[derive(Debug, Clone)]
pub struct RecordLog {
    path: PathBuf,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 默认路径 `~/.config/agent-timeline-monitor/timeline.jsonl`
    pub fn default_path() -> PathBuf {
        config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("timeline.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一份报告（带文件锁）
    pub fn append(&self, report: &TimelineReport) -> Result<()> {
        self.append_line(&format_for_record(report))
    }

    fn append_line(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let written = writeln!(file, "{}", line);
        file.unlock()?;
        written?;

        debug!(path = %self.path.display(), "Timeline record appended");
        Ok(())
    }

    /// 最近 N 条记录，跳过无法解析的行
    pub fn read_recent(&self, n: usize) -> Vec<serde_json::Value> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let records: Vec<serde_json::Value> = BufReader::new(file)
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        let start = records.len().saturating_sub(n);
        records[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::AgentStates;
    use chrono::Utc;
    use tempfile::TempDir;

    fn report(session: &str) -> TimelineReport {
        TimelineReport {
            generated_at: Utc::now(),
            session_name: session.to_string(),
            agent_states: AgentStates::default(),
            recent_events: Vec::new(),
            recent_completions: Vec::new(),
            conductor_status: None,
        }
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let log = RecordLog::new(dir.path().join("nested/deeper/timeline.jsonl"));

        log.append(&report("s1")).unwrap();

        assert!(log.path().exists());
        let records = log.read_recent(10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["session_name"], "s1");
    }

    #[test]
    fn test_read_recent_returns_last_n_and_skips_garbage() {
        let dir = TempDir::new().unwrap();
        let log = RecordLog::new(dir.path().join("timeline.jsonl"));
        log.append(&report("a")).unwrap();
        log.append_line("not json").unwrap();
        log.append(&report("b")).unwrap();
        log.append(&report("c")).unwrap();

        let records = log.read_recent(2);

        let sessions: Vec<&str> = records
            .iter()
            .map(|r| r["session_name"].as_str().unwrap())
            .collect();
        assert_eq!(sessions, vec!["b", "c"]);
    }

    #[test]
    fn test_read_recent_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = RecordLog::new(dir.path().join("missing.jsonl"));
        assert!(log.read_recent(5).is_empty());
    }
}
