//! Agent Timeline Monitor CLI
//!
//! 检测 tmux 中各 agent 的存活状态，汇总 conductor 时间线并上报 Mission Control

use agent_timeline_monitor::cli::{
    handle_kill_session, handle_panes, handle_send, handle_send_command, handle_send_keys,
    handle_status, handle_timeline, handle_watch, GlobalArgs, KillSessionArgs, SendArgs,
    SendCommandArgs, SendKeysArgs, TimelineArgs, WatchArgs,
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "atm")]
#[command(about = "Agent Timeline Monitor - 监控 tmux agent 状态并上报时间线")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 显示所有 agent 的存活状态
    Status {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 列出 session 中的 tmux pane
    Panes {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 组装并打印时间线报告
    Timeline(TimelineArgs),
    /// 组装报告、写本地记录并上报一次
    Send(SendArgs),
    /// 周期性上报
    Watch(WatchArgs),
    /// 向 pane 发送按键
    SendKeys(SendKeysArgs),
    /// 向 pane 输入命令并回车
    SendCommand(SendCommandArgs),
    /// 终止 tmux session
    KillSession(KillSessionArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 控制日志级别，例如: RUST_LOG=debug atm watch
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agent_timeline_monitor=info,atm=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let global = &cli.global;

    match &cli.command {
        Commands::Status { json } => handle_status(global, *json)?,
        Commands::Panes { json } => handle_panes(global, *json)?,
        Commands::Timeline(args) => handle_timeline(global, args)?,
        Commands::Send(args) => handle_send(global, args).await?,
        Commands::Watch(args) => handle_watch(global, args).await?,
        Commands::SendKeys(args) => handle_send_keys(global, args)?,
        Commands::SendCommand(args) => handle_send_command(global, args)?,
        Commands::KillSession(args) => handle_kill_session(global, args)?,
    }

    Ok(())
}
