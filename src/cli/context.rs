//! 命令共享的运行上下文 - 配置合并与组件装配

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::agent::ProcessPaneInspector;
use crate::config::MonitorConfig;
use crate::infra::tmux::{TmuxCommandRunner, TmuxExecutor, TmuxManager};
use crate::report::RecordLog;
use crate::timeline::{DirectorySnapshotSource, EventLoader, SnapshotSource, TimelineBuilder, TimelineReport};

/// 所有子命令共享的全局参数
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// 配置文件路径（默认 ~/.config/agent-timeline-monitor/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// tmux session 名称
    #[arg(long, global = true)]
    pub session: Option<String>,
    /// conductor 快照目录
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

impl GlobalArgs {
    /// 加载配置并用命令行参数覆盖
    pub fn resolve(&self) -> Result<MonitorConfig> {
        let mut config = MonitorConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut MonitorConfig) {
        if let Some(session) = &self.session {
            config.session_name = session.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
    }
}

/// 装配好的组件
pub struct MonitorContext<R = TmuxExecutor, S = DirectorySnapshotSource> {
    pub config: MonitorConfig,
    pub inspector: ProcessPaneInspector<R>,
    pub loader: EventLoader<S>,
}

impl MonitorContext<TmuxExecutor, DirectorySnapshotSource> {
    pub fn from_config(config: MonitorConfig) -> Self {
        let registry = config.registry();
        let executor = TmuxExecutor::new(config.tmux_bin.clone());
        if !executor.is_available() {
            warn!(tmux_bin = %config.tmux_bin, "tmux binary not found in PATH");
        }
        let inspector = ProcessPaneInspector::new(
            TmuxManager::new(executor),
            registry.clone(),
            config.session_name.clone(),
        );
        let loader = EventLoader::from_dir(config.log_dir.clone()).with_registry(registry);
        debug!(
            session = %config.session_name,
            log_dir = %config.log_dir.display(),
            "Monitor context ready"
        );
        Self {
            config,
            inspector,
            loader,
        }
    }

    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        Ok(Self::from_config(args.resolve()?))
    }
}

impl<R: TmuxCommandRunner, S: SnapshotSource> MonitorContext<R, S> {
    pub fn build_report(&self, window_minutes: u32, event_limit: usize) -> Result<TimelineReport> {
        let report = TimelineBuilder::new(&self.inspector, &self.loader).build(window_minutes, event_limit)?;
        Ok(report)
    }

    pub fn record_log(&self) -> RecordLog {
        RecordLog::new(self.config.record_log.clone())
    }
}
