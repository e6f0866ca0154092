//! Mission Control 上报客户端
//!
//! 状态机：`Attempting(n) -> Success | Attempting(n+1) | Failed`。
//! 网络失败和非 2xx 都会重试，最多 `retries` 次，每次请求完成后才发起下一次。

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::payload::{to_payload, MissionControlPayload};
use super::transport::{Delay, HttpTransport, ReqwestTransport, TokioDelay, TransportResponse};
use crate::error::{AttemptFailure, DeliveryError};
use crate::timeline::TimelineReport;

/// 上报路径
pub const TIMELINE_EVENTS_PATH: &str = "/timeline/events";

/// 单次等待上限
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// 上报客户端配置
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Mission Control 地址（如 http://localhost:8787）
    pub base_url: String,
    /// Bearer token，为空时不带 Authorization 头
    pub token: Option<String>,
    /// 首次失败后的最大重试次数
    pub retries: u32,
    /// 第一次重试前的等待
    pub retry_delay: Duration,
    /// 每次重试等待的倍数，小于 1 按 1 处理
    pub backoff_multiplier: f64,
    /// 单次请求超时
    pub timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
            token: None,
            retries: 3,
            retry_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DeliveryConfig {
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), TIMELINE_EVENTS_PATH)
    }

    /// 第 `attempt` 次失败后的等待时间（从 0 开始），单调不减
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.retry_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = self.backoff_multiplier.max(1.0).powi(attempt.min(64) as i32);
        let secs = (self.retry_delay.as_secs_f64() * factor).min(MAX_RETRY_DELAY.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// 服务端成功响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub status: String,
    pub stored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

enum AttemptState {
    Attempting(u32),
    Success(DeliveryResult),
    Failed { attempts: u32, last: AttemptFailure },
}

enum AttemptError {
    Retryable(AttemptFailure),
    Fatal(DeliveryError),
}

/// 非 2xx 响应体：JSON 压缩输出，否则原样保留文本
fn failure_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| body.to_string())
}

/// Mission Control 上报客户端
pub struct ReportDeliveryClient<T = ReqwestTransport, D = TokioDelay> {
    config: DeliveryConfig,
    transport: T,
    delay: D,
}

impl ReportDeliveryClient<ReqwestTransport, TokioDelay> {
    /// 使用 reqwest 和 tokio sleep 创建客户端
    pub fn new(config: DeliveryConfig) -> Result<Self, DeliveryError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_parts(config, transport, TokioDelay))
    }
}

impl<T: HttpTransport, D: Delay> ReportDeliveryClient<T, D> {
    pub fn with_parts(config: DeliveryConfig, transport: T, delay: D) -> Self {
        Self {
            config,
            transport,
            delay,
        }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn to_payload(&self, report: &TimelineReport, persisted_locally: bool) -> MissionControlPayload {
        to_payload(report, persisted_locally)
    }

    /// 上报一份报告，重试耗尽后返回最后一次失败
    pub async fn send_timeline(
        &self,
        report: &TimelineReport,
        persisted_locally: bool,
    ) -> Result<DeliveryResult, DeliveryError> {
        let url = self.config.endpoint();
        let body = serde_json::to_string(&self.to_payload(report, persisted_locally))?;
        debug!(url = %url, bytes = body.len(), "Sending timeline report");

        let mut state = AttemptState::Attempting(0);
        loop {
            state = match state {
                AttemptState::Attempting(n) => match self.attempt(&url, &body).await {
                    Ok(result) => AttemptState::Success(result),
                    Err(AttemptError::Fatal(e)) => return Err(e),
                    Err(AttemptError::Retryable(failure)) if n < self.config.retries => {
                        let wait = self.config.delay_for(n);
                        warn!(
                            attempt = n + 1,
                            retries = self.config.retries,
                            wait_ms = wait.as_millis() as u64,
                            error = %failure,
                            "Timeline delivery failed, retrying"
                        );
                        self.delay.sleep(wait).await;
                        AttemptState::Attempting(n + 1)
                    }
                    Err(AttemptError::Retryable(failure)) => AttemptState::Failed {
                        attempts: n + 1,
                        last: failure,
                    },
                },
                AttemptState::Success(result) => {
                    info!(
                        session = %report.session_name,
                        stored = result.stored,
                        status = %result.status,
                        "Timeline report delivered"
                    );
                    return Ok(result);
                }
                AttemptState::Failed { attempts, last } => {
                    error!(attempts, error = %last, "Timeline delivery gave up");
                    return Err(DeliveryError::Exhausted { attempts, last });
                }
            };
        }
    }

    async fn attempt(&self, url: &str, body: &str) -> Result<DeliveryResult, AttemptError> {
        let response = self
            .transport
            .post_json(url, self.config.token.as_deref(), body)
            .await
            .map_err(|e| AttemptError::Retryable(AttemptFailure::Network(e)))?;

        let success = response.is_success();
        let TransportResponse { status, body } = response;
        if !success {
            return Err(AttemptError::Retryable(AttemptFailure::Http {
                status,
                body: failure_body(&body),
            }));
        }

        serde_json::from_str(&body).map_err(|e| {
            AttemptError::Fatal(DeliveryError::InvalidResponse {
                status,
                body,
                reason: e.to_string(),
            })
        })
    }
}
