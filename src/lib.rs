//! Agent Timeline Monitor - 多 agent tmux 会话的存活检测与时间线上报

pub mod agent;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod infra;
pub mod report;
pub mod timeline;

pub use agent::{AgentRegistry, AgentRegistryEntry, AgentState, AgentStatus, ProcessPaneInspector};
pub use config::{MissionControlConfig, MonitorConfig};
pub use delivery::{
    to_payload, DeliveryConfig, DeliveryResult, HttpTransport, MissionControlPayload,
    ReportDeliveryClient, ReqwestTransport, PROTOCOL_VERSION,
};
pub use error::{AttemptFailure, DeliveryError, ProcessControlError, SnapshotParseError};
pub use infra::{PaneInfo, TmuxCommandRunner, TmuxExecutor, TmuxManager};
pub use report::{format_for_display, format_for_record, format_summary, RecordLog};
pub use timeline::{
    ConductorEvent, EventLoader, TimelineBuilder, TimelineEvent, TimelineEventType, TimelineReport,
};
