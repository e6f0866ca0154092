//! CLI command handling

pub mod context;
pub mod control;
pub mod output;
pub mod timeline;
pub mod watch;

pub use context::*;
pub use control::*;
pub use output::*;
pub use timeline::*;
pub use watch::*;
