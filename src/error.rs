//! 错误类型 - tmux 控制、快照解析、上报投递

use std::path::PathBuf;
use thiserror::Error;

/// tmux 控制错误
///
/// 所有 tmux 调用失败都归到这里，保留原始 stderr / exit code。
#[derive(Debug, Error)]
pub enum ProcessControlError {
    #[error("multiplexer binary `{0}` not found")]
    BinaryNotFound(String),

    #[error("tmux {command}: target not found: {stderr}")]
    TargetNotFound { command: String, stderr: String },

    #[error("tmux {command} exited with code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("tmux io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessControlError {
    /// 根据 stderr 把非零退出分类为 TargetNotFound / CommandFailed
    pub fn from_exit(command: &str, code: Option<i32>, stderr: &str) -> Self {
        let stderr = stderr.trim().to_string();
        let lower = stderr.to_lowercase();
        if lower.contains("can't find")
            || lower.contains("no server running")
            || lower.contains("session not found")
        {
            ProcessControlError::TargetNotFound {
                command: command.to_string(),
                stderr,
            }
        } else {
            ProcessControlError::CommandFailed {
                command: command.to_string(),
                code,
                stderr,
            }
        }
    }

    pub fn is_target_not_found(&self) -> bool {
        matches!(self, ProcessControlError::TargetNotFound { .. })
    }
}

/// 快照文件解析错误（仅在 EventLoader 内部使用，不向外抛出）
#[derive(Debug, Error)]
pub enum SnapshotParseError {
    #[error("failed to read snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 单次投递尝试的失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),
}

/// 上报投递错误
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// 重试预算耗尽，携带最后一次失败
    #[error("delivery failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: AttemptFailure },

    /// 服务端返回 2xx 但响应体无法解析
    #[error("HTTP {status} response could not be parsed ({reason}): {body}")]
    InvalidResponse {
        status: u16,
        body: String,
        reason: String,
    },

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to create HTTP client: {0}")]
    Client(String),
}
