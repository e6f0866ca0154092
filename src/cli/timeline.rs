//! `atm timeline` / `atm send` - 组装报告、本地记录、上报

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::{info, warn};

use super::context::{GlobalArgs, MonitorContext};
use crate::delivery::{Delay, DeliveryResult, HttpTransport, ReportDeliveryClient};
use crate::report::{format_for_display, format_for_record, format_summary, RecordLog};
use crate::timeline::{TimelineReport, DEFAULT_WINDOW_MINUTES};

/// 默认事件条数
pub const DEFAULT_EVENT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// 多行终端视图
    #[default]
    Display,
    /// 单行 JSON 记录
    Record,
    /// 一行摘要
    Summary,
    /// 完整报告 JSON
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct TimelineArgs {
    /// 时间窗口（分钟）
    #[arg(long, short, default_value_t = DEFAULT_WINDOW_MINUTES)]
    pub window: u32,
    /// 最多显示的事件数
    #[arg(long, short, default_value_t = DEFAULT_EVENT_LIMIT)]
    pub limit: usize,
    /// 输出格式
    #[arg(long, short, value_enum, default_value_t = ReportFormat::Display)]
    pub format: ReportFormat,
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    /// 时间窗口（分钟）
    #[arg(long, short, default_value_t = DEFAULT_WINDOW_MINUTES)]
    pub window: u32,
    /// 最多上报的事件数
    #[arg(long, short, default_value_t = DEFAULT_EVENT_LIMIT)]
    pub limit: usize,
    /// 不写本地记录文件
    #[arg(long)]
    pub no_persist: bool,
}

pub fn render_report(report: &TimelineReport, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Display => format_for_display(report),
        ReportFormat::Record => format_for_record(report),
        ReportFormat::Summary => format_summary(report),
        ReportFormat::Json => serde_json::to_string_pretty(report)?,
    })
}

/// 处理 timeline 命令
pub fn handle_timeline(global: &GlobalArgs, args: &TimelineArgs) -> Result<()> {
    let ctx = MonitorContext::from_args(global)?;
    let report = ctx.build_report(args.window, args.limit)?;
    println!("{}", render_report(&report, args.format)?);
    Ok(())
}

/// 写本地记录，失败只告警；返回是否写入成功
pub fn persist_report(record_log: Option<&RecordLog>, report: &TimelineReport) -> bool {
    let Some(log) = record_log else {
        return false;
    };
    match log.append(report) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %log.path().display(), error = %e, "Failed to persist timeline record");
            false
        }
    }
}

/// 一次完整的上报周期：记录 → 上报
pub async fn deliver_report<T, D>(
    client: &ReportDeliveryClient<T, D>,
    record_log: Option<&RecordLog>,
    report: &TimelineReport,
) -> Result<DeliveryResult>
where
    T: HttpTransport,
    D: Delay,
{
    let persisted = persist_report(record_log, report);
    let result = client.send_timeline(report, persisted).await?;
    Ok(result)
}

/// 处理 send 命令
pub async fn handle_send(global: &GlobalArgs, args: &SendArgs) -> Result<()> {
    let ctx = MonitorContext::from_args(global)?;
    let client = ReportDeliveryClient::new(ctx.config.delivery_config())?;
    let report = ctx.build_report(args.window, args.limit)?;

    let record_log = (!args.no_persist).then(|| ctx.record_log());
    let result = deliver_report(&client, record_log.as_ref(), &report).await?;

    info!(session = %report.session_name, stored = result.stored, "Send complete");
    println!("{}", format_summary(&report));
    match result.path {
        Some(path) => println!("Delivered ({}, stored at {})", result.status, path),
        None => println!("Delivered ({})", result.status),
    }
    Ok(())
}
