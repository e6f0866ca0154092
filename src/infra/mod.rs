//! 基础设施层 - tmux 控制与 pane 解析

pub mod tmux;

pub use tmux::{
    parse_list_panes_output, parse_pane_line, PaneInfo, TmuxCommandRunner, TmuxExecutor,
    TmuxManager, LIST_PANES_FORMAT,
};
