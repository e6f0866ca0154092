//! 汇总报告组装 - agent 存活状态 + conductor 历史事件

use chrono::Utc;
use tracing::info;

use super::loader::{EventLoader, SnapshotSource};
use super::types::{AgentStates, ConductorStatus, TimelineEvent, TimelineReport};
use crate::agent::{AgentStatus, ProcessPaneInspector};
use crate::error::ProcessControlError;
use crate::infra::tmux::TmuxCommandRunner;

/// 报告组装器
pub struct TimelineBuilder<'a, R, S> {
    inspector: &'a ProcessPaneInspector<R>,
    loader: &'a EventLoader<S>,
}

impl<'a, R: TmuxCommandRunner, S: SnapshotSource> TimelineBuilder<'a, R, S> {
    pub fn new(inspector: &'a ProcessPaneInspector<R>, loader: &'a EventLoader<S>) -> Self {
        Self { inspector, loader }
    }

    /// 组装一份新报告
    ///
    /// `event_limit` 限制 `recent_events` 条数；completions 不截断。
    pub fn build(&self, window_minutes: u32, event_limit: usize) -> Result<TimelineReport, ProcessControlError> {
        let mut agents = self.inspector.get_all_agent_status()?;

        let snapshots = self.loader.load_assignments(window_minutes);
        let mut events = self.loader.to_timeline_events(&snapshots);
        fill_last_activity(&mut agents, &events);
        events.truncate(event_limit);

        let recent_completions = snapshots
            .iter()
            .flat_map(|e| e.completed_this_cycle.iter().cloned())
            .collect();
        let conductor_status = self
            .loader
            .load_latest_assignment()
            .as_ref()
            .map(ConductorStatus::from);

        let report = TimelineReport {
            generated_at: Utc::now(),
            session_name: self.inspector.session_name().to_string(),
            agent_states: AgentStates::from_agents(agents),
            recent_events: events,
            recent_completions,
            conductor_status,
        };

        info!(
            session = %report.session_name,
            run = report.agent_states.run,
            idle = report.agent_states.idle,
            dead = report.agent_states.dead,
            events = report.recent_events.len(),
            "Timeline report assembled"
        );
        Ok(report)
    }
}

/// events 已按时间降序，第一条匹配即为最近活动
fn fill_last_activity(agents: &mut [AgentStatus], events: &[TimelineEvent]) {
    for agent in agents.iter_mut() {
        agent.last_activity = events
            .iter()
            .find(|e| e.agent_id == agent.agent_id)
            .map(|e| e.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentRegistry, AgentRegistryEntry, AgentState};
    use crate::error::SnapshotParseError;
    use crate::infra::tmux::TmuxManager;
    use crate::timeline::loader::SnapshotCandidate;
    use crate::timeline::types::{CompletedTask, ConductorEvent};
    use chrono::{DateTime, Duration};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    struct PaneOutput(&'static str);

    impl TmuxCommandRunner for PaneOutput {
        fn run(&self, _args: &[&str]) -> Result<String, ProcessControlError> {
            Ok(self.0.to_string())
        }
    }

    struct Snapshots(Vec<ConductorEvent>);

    impl SnapshotSource for Snapshots {
        fn list_candidates(&self) -> Vec<SnapshotCandidate> {
            (0..self.0.len())
                .map(|i| SnapshotCandidate {
                    name: i.to_string(),
                    path: PathBuf::from(i.to_string()),
                    modified: Some(Utc::now()),
                })
                .collect()
        }

        fn parse_one(&self, c: &SnapshotCandidate) -> Result<ConductorEvent, SnapshotParseError> {
            let idx: usize = c.name.parse().unwrap();
            Ok(self.0[idx].clone())
        }
    }

    fn snapshot(minutes_ago: i64, cycle: u64, completions: Vec<CompletedTask>) -> ConductorEvent {
        ConductorEvent {
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            cycle,
            mode: "auto".to_string(),
            conductor: "conductor".to_string(),
            assignments: BTreeMap::new(),
            completed_this_cycle: completions,
        }
    }

    fn task(issue: u64, agent: &str) -> CompletedTask {
        CompletedTask {
            issue,
            agent: agent.to_string(),
            title: format!("task {}", issue),
        }
    }

    #[test]
    fn test_build_assembles_counts_events_and_conductor() {
        // Given: 一个运行中的 agent、一个 DEAD，两份快照
        let inspector = ProcessPaneInspector::new(
            TmuxManager::new(PaneOutput("$0 @0 %1 10 node /w\n")),
            AgentRegistry::new(vec![
                AgentRegistryEntry::new("coordinator", "CoordinatorAgent", "🎯", "%1"),
                AgentRegistryEntry::new("review", "ReviewAgent", "🔍", "%3"),
            ]),
            "miyabi-refactor",
        );
        let newest = snapshot(1, 9, vec![task(5, "coordinator"), task(6, "coordinator")]);
        let newest_ts: DateTime<Utc> = newest.timestamp;
        let loader = EventLoader::new(Snapshots(vec![newest, snapshot(5, 8, vec![task(4, "x")])]));

        // When
        let report = TimelineBuilder::new(&inspector, &loader).build(60, 2).unwrap();

        // Then
        assert_eq!(report.session_name, "miyabi-refactor");
        assert_eq!(report.agent_states.total, 2);
        assert_eq!(report.agent_states.run, 1);
        assert_eq!(report.agent_states.dead, 1);
        assert_eq!(report.recent_events.len(), 2);
        assert_eq!(report.recent_completions.len(), 3);
        assert_eq!(report.recent_completions[0].issue, 5);

        let conductor = report.conductor_status.unwrap();
        assert_eq!(conductor.last_cycle, 9);

        let coordinator = &report.agent_states.agents[0];
        assert_eq!(coordinator.state, AgentState::Run);
        assert_eq!(coordinator.last_activity, Some(newest_ts));
        assert!(report.agent_states.agents[1].last_activity.is_none());
    }
}
