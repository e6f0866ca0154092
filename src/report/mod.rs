//! 报告输出 - 格式化与本地记录

pub mod formatter;
pub mod record_log;

pub use formatter::{
    event_icon, format_for_display, format_for_record, format_summary, state_icon,
    DISPLAY_EVENT_LIMIT, RECORD_EVENT_LIMIT,
};
pub use record_log::RecordLog;
