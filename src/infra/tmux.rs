//! tmux 管理模块 - 封装 tmux 操作与 pane 列表解析

use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::{debug, error, info};

use crate::error::ProcessControlError;

/// `tmux list-panes -F` 的格式串：固定 6 个空白分隔字段
///
/// session id / window id / pane id / pid / 当前命令 / 当前路径。
/// 路径放在最后，允许包含空格。
pub const LIST_PANES_FORMAT: &str =
    "#{session_id} #{window_id} #{pane_id} #{pane_pid} #{pane_current_command} #{pane_current_path}";

/// 一个 tmux pane 的快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneInfo {
    pub session_id: u32,
    pub window_id: u32,
    pub pane_id: u32,
    /// 稳定的 pane 标识（`%N`），窗口重新编号后仍不变
    pub permanent_id: String,
    pub pid: u32,
    pub current_command: String,
    pub current_path: String,
}

/// 执行 tmux 命令的抽象，便于在测试中注入 mock
pub trait TmuxCommandRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<String, ProcessControlError>;
}

impl<T: TmuxCommandRunner + ?Sized> TmuxCommandRunner for &T {
    fn run(&self, args: &[&str]) -> Result<String, ProcessControlError> {
        (**self).run(args)
    }
}

/// 真实的 tmux 执行器
#[derive(Debug, Clone)]
pub struct TmuxExecutor {
    tmux_bin: String,
}

impl TmuxExecutor {
    pub fn new(tmux_bin: impl Into<String>) -> Self {
        Self {
            tmux_bin: tmux_bin.into(),
        }
    }

    /// tmux 是否在 PATH 中可用
    pub fn is_available(&self) -> bool {
        which::which(&self.tmux_bin).is_ok()
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl TmuxCommandRunner for TmuxExecutor {
    fn run(&self, args: &[&str]) -> Result<String, ProcessControlError> {
        let subcommand = args.first().copied().unwrap_or_default();
        let output = Command::new(&self.tmux_bin).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessControlError::BinaryNotFound(self.tmux_bin.clone())
            } else {
                ProcessControlError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessControlError::from_exit(
                subcommand,
                output.status.code(),
                &stderr,
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// tmux 管理器
pub struct TmuxManager<R = TmuxExecutor> {
    runner: R,
}

impl TmuxManager<TmuxExecutor> {
    pub fn with_binary(tmux_bin: impl Into<String>) -> Self {
        Self::new(TmuxExecutor::new(tmux_bin))
    }
}

impl Default for TmuxManager<TmuxExecutor> {
    fn default() -> Self {
        Self::new(TmuxExecutor::default())
    }
}

impl<R: TmuxCommandRunner> TmuxManager<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// 向 pane 发送按键序列（按键名会被 tmux 解释，如 "Enter"）
    pub fn send_keys(&self, target: &str, keys: &str) -> Result<(), ProcessControlError> {
        debug!(target = %target, keys_len = keys.len(), "Sending keys to tmux pane");
        self.runner
            .run(&["send-keys", "-t", target, keys])
            .map(|_| ())
            .map_err(|e| {
                error!(target = %target, error = %e, "Failed to send keys");
                e
            })
    }

    /// 向 pane 发送字面文本
    /// 使用 -l 标志确保文本被字面解释，避免 "Enter" 等特殊字符串被解释为按键
    pub fn send_literal(&self, target: &str, text: &str) -> Result<(), ProcessControlError> {
        debug!(target = %target, text_len = text.len(), "Sending literal text to tmux pane");
        self.runner
            .run(&["send-keys", "-t", target, "-l", text])
            .map(|_| ())
            .map_err(|e| {
                error!(target = %target, error = %e, "Failed to send text");
                e
            })
    }

    /// 输入命令并回车
    ///
    /// 分两次调用：先发送文本，再单独发送 Enter。这不是原子操作：
    /// 如果 Enter 发送失败，文本会留在 pane 中未提交，错误照常返回。
    pub fn send_command(&self, target: &str, command: &str) -> Result<(), ProcessControlError> {
        self.send_literal(target, command)?;
        debug!(target = %target, "Text sent, now sending Enter");
        self.send_keys(target, "Enter")?;
        info!(target = %target, "Command submitted");
        Ok(())
    }

    /// 列出 session 中所有 pane
    pub fn get_panes(&self, session_name: &str) -> Result<Vec<PaneInfo>, ProcessControlError> {
        let output = self
            .runner
            .run(&["list-panes", "-s", "-t", session_name, "-F", LIST_PANES_FORMAT])?;
        let panes = parse_list_panes_output(&output);
        debug!(session = %session_name, count = panes.len(), "Listed tmux panes");
        Ok(panes)
    }

    /// 终止 session；session 已不存在时视为成功
    pub fn kill_session(&self, session_name: &str) -> Result<(), ProcessControlError> {
        debug!(session = %session_name, "Killing tmux session");
        match self.runner.run(&["kill-session", "-t", session_name]) {
            Ok(_) => {
                info!(session = %session_name, "Tmux session killed");
                Ok(())
            }
            Err(e) if e.is_target_not_found() => {
                debug!(session = %session_name, "Session already gone");
                Ok(())
            }
            Err(e) => {
                error!(session = %session_name, error = %e, "Failed to kill tmux session");
                Err(e)
            }
        }
    }
}

/// 解析 `list-panes` 输出，跳过格式错误的行
pub fn parse_list_panes_output(output: &str) -> Vec<PaneInfo> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let pane = parse_pane_line(line);
            if pane.is_none() {
                debug!(line = %line, "Skipping malformed list-panes line");
            }
            pane
        })
        .collect()
}

/// 解析单行，字段不足或数字无效时返回 None
pub fn parse_pane_line(line: &str) -> Option<PaneInfo> {
    let (session, rest) = next_field(line)?;
    let (window, rest) = next_field(rest)?;
    let (pane, rest) = next_field(rest)?;
    let (pid, rest) = next_field(rest)?;
    let (command, rest) = next_field(rest)?;
    let path = rest.trim();
    if path.is_empty() {
        return None;
    }

    let pane_id = parse_id(pane, '%')?;
    Some(PaneInfo {
        session_id: parse_id(session, '$')?,
        window_id: parse_id(window, '@')?,
        pane_id,
        permanent_id: format!("%{}", pane_id),
        pid: pid.parse().ok()?,
        current_command: command.to_string(),
        current_path: path.to_string(),
    })
}

fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

/// tmux id 带前缀（`$0`、`@1`、`%2`），也接受纯数字
fn parse_id(token: &str, sigil: char) -> Option<u32> {
    token.strip_prefix(sigil).unwrap_or(token).parse().ok()
}
