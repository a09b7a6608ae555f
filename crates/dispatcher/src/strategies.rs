use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use dispatchsim_domain::{SimError, Task};
use dispatchsim_host::Host;

/// 分发策略的配置标识，用于配置文件和命令行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    RoundRobin,
    ShortestQueue,
    SizeInterval,
    LeastWorkLeft,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::RoundRobin,
        StrategyKind::ShortestQueue,
        StrategyKind::SizeInterval,
        StrategyKind::LeastWorkLeft,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::RoundRobin => "round_robin",
            StrategyKind::ShortestQueue => "shortest_queue",
            StrategyKind::SizeInterval => "size_interval",
            StrategyKind::LeastWorkLeft => "least_work_left",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(StrategyKind::RoundRobin),
            "shortest_queue" => Ok(StrategyKind::ShortestQueue),
            "size_interval" => Ok(StrategyKind::SizeInterval),
            "least_work_left" => Ok(StrategyKind::LeastWorkLeft),
            other => Err(SimError::config_error(format!("未知的分发策略: {other}"))),
        }
    }
}

/// 分发策略及其运行时状态
///
/// 封闭的变体集合，每个变体只携带自己需要的状态：轮询游标
/// 仅存在于 `RoundRobin` 中，其余策略无状态。
pub enum DispatchStrategy {
    RoundRobin { cursor: usize },
    ShortestQueue,
    SizeInterval,
    LeastWorkLeft,
}

impl DispatchStrategy {
    pub fn from_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::RoundRobin => DispatchStrategy::RoundRobin { cursor: 0 },
            StrategyKind::ShortestQueue => DispatchStrategy::ShortestQueue,
            StrategyKind::SizeInterval => DispatchStrategy::SizeInterval,
            StrategyKind::LeastWorkLeft => DispatchStrategy::LeastWorkLeft,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            DispatchStrategy::RoundRobin { .. } => StrategyKind::RoundRobin,
            DispatchStrategy::ShortestQueue => StrategyKind::ShortestQueue,
            DispatchStrategy::SizeInterval => StrategyKind::SizeInterval,
            DispatchStrategy::LeastWorkLeft => StrategyKind::LeastWorkLeft,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// 为任务选择目标主机，返回主机在列表中的下标。
    /// 返回 `None` 表示本次提交被静默丢弃。
    pub fn select(&mut self, hosts: &[Arc<Host>], task: &Task) -> Option<usize> {
        match self {
            DispatchStrategy::RoundRobin { cursor } => {
                if hosts.is_empty() {
                    debug!("没有可用的主机");
                    return None;
                }
                let index = *cursor % hosts.len();
                *cursor = (index + 1) % hosts.len();
                debug!(
                    "轮询策略选择主机 {} (索引: {}/{})",
                    hosts[index].id(),
                    index,
                    hosts.len()
                );
                Some(index)
            }
            DispatchStrategy::ShortestQueue => {
                if hosts.is_empty() {
                    debug!("没有可用的主机");
                    return None;
                }
                let (index, host) = hosts
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, host)| (host.queue_size(), host.id()))?;
                debug!(
                    "最短队列策略选择主机 {} (队列长度: {})",
                    host.id(),
                    host.queue_size()
                );
                Some(index)
            }
            DispatchStrategy::SizeInterval => {
                let index = task.class().index();
                if index >= hosts.len() {
                    debug!(
                        "规模类别 {} 超出主机数量 {}，任务 {} 被丢弃",
                        task.class(),
                        hosts.len(),
                        task.id()
                    );
                    return None;
                }
                debug!(
                    "SITA策略选择主机 {} (规模类别: {})",
                    hosts[index].id(),
                    task.class()
                );
                Some(index)
            }
            DispatchStrategy::LeastWorkLeft => {
                if hosts.is_empty() {
                    debug!("没有可用的主机");
                    return None;
                }
                let (index, host) = hosts
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, host)| (host.work_left(), host.id()))?;
                debug!(
                    "最少剩余工作量策略选择主机 {} (剩余: {}ms)",
                    host.id(),
                    host.work_left().as_millis()
                );
                Some(index)
            }
        }
    }
}
