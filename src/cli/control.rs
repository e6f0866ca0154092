//! `atm status` / `panes` / `send-keys` / `send-command` / `kill-session`

use anyhow::Result;
use clap::Args;

use super::context::{GlobalArgs, MonitorContext};
use super::output::{format_output, format_pane_lines, format_status_lines};

#[derive(Args, Debug, Clone)]
pub struct SendKeysArgs {
    /// 目标 pane（如 %2 或 session:0.1）
    pub target: String,
    /// tmux 按键名（如 Enter、C-c）
    pub keys: String,
}

#[derive(Args, Debug, Clone)]
pub struct SendCommandArgs {
    /// 目标 pane
    pub target: String,
    /// 字面输入的命令文本，随后自动回车
    pub text: String,
}

#[derive(Args, Debug, Clone)]
pub struct KillSessionArgs {
    /// session 名称（默认当前配置的 session）
    pub name: Option<String>,
}

pub fn handle_status(global: &GlobalArgs, json: bool) -> Result<()> {
    let ctx = MonitorContext::from_args(global)?;
    let agents = ctx.inspector.get_all_agent_status()?;
    println!("{}", format_output(&agents, json, |a| format_status_lines(a))?);
    Ok(())
}

pub fn handle_panes(global: &GlobalArgs, json: bool) -> Result<()> {
    let ctx = MonitorContext::from_args(global)?;
    let panes = ctx.inspector.get_panes(&ctx.config.session_name)?;
    println!("{}", format_output(&panes, json, |p| format_pane_lines(p))?);
    Ok(())
}

pub fn handle_send_keys(global: &GlobalArgs, args: &SendKeysArgs) -> Result<()> {
    let ctx = MonitorContext::from_args(global)?;
    ctx.inspector.send_keys(&args.target, &args.keys)?;
    Ok(())
}

pub fn handle_send_command(global: &GlobalArgs, args: &SendCommandArgs) -> Result<()> {
    let ctx = MonitorContext::from_args(global)?;
    ctx.inspector.send_command(&args.target, &args.text)?;
    Ok(())
}

pub fn handle_kill_session(global: &GlobalArgs, args: &KillSessionArgs) -> Result<()> {
    let ctx = MonitorContext::from_args(global)?;
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| ctx.config.session_name.clone());
    ctx.inspector.kill_session(&name)?;
    println!("Session {} terminated", name);
    Ok(())
}
