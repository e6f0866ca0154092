//! Timeline - conductor 快照加载、事件归一化与报告组装

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::TimelineBuilder;
pub use loader::{
    snapshot_sort_key, DirectorySnapshotSource, EventLoader, SnapshotCandidate, SnapshotSource,
    DEFAULT_WINDOW_MINUTES, SNAPSHOT_PREFIXES,
};
pub use types::{
    AgentAssignment, AgentStates, CompletedTask, ConductorEvent, ConductorStatus, NewAssignment,
    TimelineEvent, TimelineEventType, TimelineReport, to_iso8601,
};
