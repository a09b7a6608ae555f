use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use dispatchsim_domain::Task;
use dispatchsim_host::Host;

use crate::strategies::{DispatchStrategy, StrategyKind};

/// Central task dispatcher over a fixed set of hosts.
///
/// The host list and strategy choice are immutable after construction.
/// Strategy state lives behind one mutex, and `submit` holds it across
/// selection and forwarding: concurrent submitters observe a strict
/// serial order of assignments, so the round-robin rotation stays exact
/// and the comparing strategies never interleave their scan with a
/// competing assignment.
pub struct Dispatcher {
    hosts: Vec<Arc<Host>>,
    kind: StrategyKind,
    strategy: Mutex<DispatchStrategy>,
}

impl Dispatcher {
    pub fn new(kind: StrategyKind, hosts: Vec<Arc<Host>>) -> Self {
        Self {
            hosts,
            kind,
            strategy: Mutex::new(DispatchStrategy::from_kind(kind)),
        }
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn hosts(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Assigns the task to a host chosen by the configured strategy.
    ///
    /// A task no strategy can place (empty host list, or a size class
    /// beyond the host list under SITA) is dropped silently.
    pub async fn submit(&self, task: Arc<Task>) {
        let mut strategy = self.strategy.lock().await;
        match strategy.select(&self.hosts, &task) {
            Some(index) => self.hosts[index].add_task(task),
            None => debug!("任务 {} 未分配到任何主机", task.id()),
        }
    }
}
