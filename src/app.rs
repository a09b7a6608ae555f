use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use dispatchsim_dispatcher::{Dispatcher, StrategyKind};
use dispatchsim_domain::Task;
use dispatchsim_host::Host;

use crate::config::AppConfig;
use crate::shutdown::ShutdownListener;
use crate::workload::{self, Submission};

/// 一次模拟运行的结果统计
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub submitted: usize,
    pub finished: usize,
    pub unfinished: usize,
}

/// 主应用程序：搭建主机和分发器，按到达时刻提交负载，
/// 等待队列清空后优雅关闭所有主机。
pub struct Application {
    config: AppConfig,
    strategy: StrategyKind,
}

impl Application {
    pub fn new(config: AppConfig) -> Result<Self> {
        let strategy: StrategyKind = config
            .dispatcher
            .strategy
            .parse()
            .with_context(|| format!("无效的分发策略: {}", config.dispatcher.strategy))?;
        Ok(Self { config, strategy })
    }

    pub async fn run(&self, mut shutdown: ShutdownListener) -> Result<RunSummary> {
        info!(
            "启动模拟: 策略={}, 主机数={}",
            self.strategy, self.config.hosts.count
        );

        let hosts: Vec<Arc<Host>> = (0..self.config.hosts.count)
            .map(|id| Arc::new(Host::new(id as u32)))
            .collect();
        let mut handles = Vec::with_capacity(hosts.len());
        for host in &hosts {
            handles.push(host.start()?);
        }

        let dispatcher = Dispatcher::new(self.strategy, hosts);
        let submissions = workload::build(&self.config.workload)?;
        info!("负载共 {} 个任务", submissions.len());

        let started = Instant::now();
        let mut submitted: Vec<Arc<Task>> = Vec::with_capacity(submissions.len());
        let mut aborted = false;
        for Submission { arrival, task } in submissions {
            tokio::select! {
                _ = time::sleep_until(started + arrival) => {
                    debug!("提交任务 {} (到达 {}ms)", task.id(), arrival.as_millis());
                    submitted.push(Arc::clone(&task));
                    dispatcher.submit(task).await;
                }
                _ = shutdown.wait() => {
                    warn!("提交阶段收到关闭信号，剩余任务不再提交");
                    aborted = true;
                    break;
                }
            }
        }

        if !aborted {
            self.wait_for_drain(&dispatcher, &mut shutdown).await;
        }

        for host in dispatcher.hosts() {
            host.shutdown();
        }
        let _ = join_all(handles).await;

        Ok(self.report(&submitted))
    }

    /// 轮询所有主机直到队列全部清空。被丢弃的任务从未入队，
    /// 不会阻塞清空判定。
    async fn wait_for_drain(&self, dispatcher: &Dispatcher, shutdown: &mut ShutdownListener) {
        let interval = Duration::from_millis(self.config.sim.drain_poll_interval_ms);
        loop {
            if dispatcher.hosts().iter().all(|host| host.queue_size() == 0) {
                info!("所有主机的队列已清空");
                return;
            }
            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = shutdown.wait() => {
                    warn!("等待队列清空时收到关闭信号");
                    return;
                }
            }
        }
    }

    fn report(&self, submitted: &[Arc<Task>]) -> RunSummary {
        let finished = submitted.iter().filter(|task| task.is_finished()).count();
        let summary = RunSummary {
            submitted: submitted.len(),
            finished,
            unfinished: submitted.len() - finished,
        };

        info!(
            "模拟结束: 提交 {} 个任务, 完成 {} 个, 未完成 {} 个",
            summary.submitted, summary.finished, summary.unfinished
        );
        for task in submitted.iter().filter(|task| !task.is_finished()) {
            debug!("任务 {} 停留在 {:?} 状态", task.id(), task.state());
        }
        summary
    }
}
