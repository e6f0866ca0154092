//! `atm watch` - 周期性组装并上报
//!
//! 单个周期失败只记录日志，不终止循环；Ctrl-C 退出。

use anyhow::Result;
use clap::Args;
use std::time::Duration;
use tracing::{error, info};

use super::context::{GlobalArgs, MonitorContext};
use super::timeline::{deliver_report, persist_report, DEFAULT_EVENT_LIMIT};
use crate::delivery::{Delay, HttpTransport, ReportDeliveryClient};
use crate::infra::tmux::TmuxCommandRunner;
use crate::report::{format_summary, RecordLog};
use crate::timeline::{SnapshotSource, DEFAULT_WINDOW_MINUTES};

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// 轮询间隔（秒）
    #[arg(long, short, default_value = "30")]
    pub interval: u64,
    /// 时间窗口（分钟）
    #[arg(long, short, default_value_t = DEFAULT_WINDOW_MINUTES)]
    pub window: u32,
    /// 每次上报的事件数
    #[arg(long, short, default_value_t = DEFAULT_EVENT_LIMIT)]
    pub limit: usize,
    /// 只在本地记录，不上报
    #[arg(long)]
    pub no_send: bool,
}

/// 单个周期的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Delivered,
    RecordedOnly,
    Failed(String),
}

/// 执行一个周期，错误转为 `CycleOutcome::Failed`
pub async fn run_cycle<R, S, T, D>(
    ctx: &MonitorContext<R, S>,
    client: Option<&ReportDeliveryClient<T, D>>,
    record_log: &RecordLog,
    args: &WatchArgs,
) -> CycleOutcome
where
    R: TmuxCommandRunner,
    S: SnapshotSource,
    T: HttpTransport,
    D: Delay,
{
    let report = match ctx.build_report(args.window, args.limit) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to assemble timeline report");
            return CycleOutcome::Failed(e.to_string());
        }
    };
    println!("{}", format_summary(&report));

    match client {
        Some(client) => match deliver_report(client, Some(record_log), &report).await {
            Ok(_) => CycleOutcome::Delivered,
            Err(e) => {
                error!(session = %report.session_name, error = %e, "Timeline delivery failed this cycle");
                CycleOutcome::Failed(e.to_string())
            }
        },
        None => {
            if persist_report(Some(record_log), &report) {
                CycleOutcome::RecordedOnly
            } else {
                CycleOutcome::Failed("record log not written".to_string())
            }
        }
    }
}

/// 处理 watch 命令
pub async fn handle_watch(global: &GlobalArgs, args: &WatchArgs) -> Result<()> {
    let ctx = MonitorContext::from_args(global)?;
    let client = if args.no_send {
        None
    } else {
        Some(ReportDeliveryClient::new(ctx.config.delivery_config())?)
    };
    let record_log = ctx.record_log();

    info!(
        session = %ctx.config.session_name,
        interval_secs = args.interval,
        send = !args.no_send,
        "Watching agent timeline"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut cycle: u64 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                cycle += 1;
                let outcome = run_cycle(&ctx, client.as_ref(), &record_log, args).await;
                info!(cycle, outcome = ?outcome, "Watch cycle finished");
            }
            _ = tokio::signal::ctrl_c() => {
                info!(cycles = cycle, "Watch stopped");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentRegistry, AgentRegistryEntry, ProcessPaneInspector};
    use crate::config::MonitorConfig;
    use crate::delivery::{DeliveryConfig, TransportResponse};
    use crate::error::ProcessControlError;
    use crate::infra::tmux::TmuxManager;
    use crate::timeline::{DirectorySnapshotSource, EventLoader};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Panes(Result<&'static str, ()>);

    impl TmuxCommandRunner for Panes {
        fn run(&self, args: &[&str]) -> Result<String, ProcessControlError> {
            match self.0 {
                Ok(out) => Ok(out.to_string()),
                Err(()) => Err(ProcessControlError::CommandFailed {
                    command: args.join(" "),
                    code: Some(1),
                    stderr: "server exited unexpectedly".to_string(),
                }),
            }
        }
    }

    struct Down;

    #[async_trait]
    impl HttpTransport for Down {
        async fn post_json(&self, _: &str, _: Option<&str>, _: &str) -> Result<TransportResponse, String> {
            Err("connection refused".to_string())
        }
    }

    struct NoDelay;

    #[async_trait]
    impl Delay for NoDelay {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn context(runner: Panes, dir: &TempDir) -> MonitorContext<Panes, DirectorySnapshotSource> {
        let registry = AgentRegistry::new(vec![AgentRegistryEntry::new("codegen", "CodeGenAgent", "💻", "%2")]);
        MonitorContext {
            config: MonitorConfig::default(),
            inspector: ProcessPaneInspector::new(TmuxManager::new(runner), registry.clone(), "miyabi-refactor"),
            loader: EventLoader::from_dir(dir.path().join("conductor")).with_registry(registry),
        }
    }

    fn args() -> WatchArgs {
        WatchArgs {
            interval: 1,
            window: 60,
            limit: 10,
            no_send: false,
        }
    }

    #[tokio::test]
    async fn test_delivery_failure_is_not_fatal() {
        // Given: Mission Control 不可达
        let dir = TempDir::new().unwrap();
        let ctx = context(Panes(Ok("$0 @0 %2 100 claude /repo\n")), &dir);
        let client = ReportDeliveryClient::with_parts(
            DeliveryConfig {
                retries: 1,
                ..DeliveryConfig::default()
            },
            Down,
            NoDelay,
        );
        let log = RecordLog::new(dir.path().join("timeline.jsonl"));

        // When: 连续两个周期
        let first = run_cycle(&ctx, Some(&client), &log, &args()).await;
        let second = run_cycle(&ctx, Some(&client), &log, &args()).await;

        // Then: 都返回失败，本地记录仍写入
        assert!(matches!(first, CycleOutcome::Failed(ref m) if m.contains("connection refused")));
        assert!(matches!(second, CycleOutcome::Failed(_)));
        assert_eq!(log.read_recent(10).len(), 2);
    }

    #[tokio::test]
    async fn test_record_only_cycle() {
        let dir = TempDir::new().unwrap();
        let ctx = context(Panes(Ok("")), &dir);
        let log = RecordLog::new(dir.path().join("timeline.jsonl"));

        let outcome = run_cycle::<_, _, Down, NoDelay>(&ctx, None, &log, &args()).await;

        assert_eq!(outcome, CycleOutcome::RecordedOnly);
        let records = log.read_recent(1);
        assert_eq!(records[0]["agent_states"]["dead"], 1);
    }

    #[tokio::test]
    async fn test_tmux_failure_reported_as_failed_cycle() {
        let dir = TempDir::new().unwrap();
        let ctx = context(Panes(Err(())), &dir);
        let log = RecordLog::new(dir.path().join("timeline.jsonl"));

        let outcome = run_cycle::<_, _, Down, NoDelay>(&ctx, None, &log, &args()).await;

        assert!(matches!(outcome, CycleOutcome::Failed(ref m) if m.contains("server exited")));
        assert!(log.read_recent(10).is_empty());
    }
}
