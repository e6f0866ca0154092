//! Agent 注册表与存活检测

pub mod inspector;
pub mod registry;

pub use inspector::{derive_state, AgentState, AgentStatus, ProcessPaneInspector};
pub use registry::{AgentRegistry, AgentRegistryEntry, DEFAULT_AGENT_COMMANDS};
