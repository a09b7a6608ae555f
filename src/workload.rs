use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use dispatchsim_domain::{SimError, SimResult, SizeClass, Task};

use crate::config::{RandomWorkloadConfig, TaskSpec, WorkloadConfig};

/// 一次任务提交：任务本体和相对模拟开始的到达时刻
pub struct Submission {
    pub arrival: Duration,
    pub task: Arc<Task>,
}

/// 校验负载定义，随机区间必须非空
pub fn validate(workload: &WorkloadConfig) -> SimResult<()> {
    if let Some(random) = &workload.random {
        if random.size_ms_min > random.size_ms_max {
            return Err(SimError::invalid_workload(format!(
                "size_ms_min ({}) 大于 size_ms_max ({})",
                random.size_ms_min, random.size_ms_max
            )));
        }
        if random.priority_min > random.priority_max {
            return Err(SimError::invalid_workload(format!(
                "priority_min ({}) 大于 priority_max ({})",
                random.priority_min, random.priority_max
            )));
        }
        if !(0.0..=1.0).contains(&random.preemptible_ratio) {
            return Err(SimError::invalid_workload(format!(
                "preemptible_ratio ({}) 必须在 [0, 1] 内",
                random.preemptible_ratio
            )));
        }
    }
    Ok(())
}

/// 把负载定义展开成按到达时刻排序的提交列表。
/// 任务 id 从 1 起连续分配，显式任务在前，随机任务在后。
pub fn build(workload: &WorkloadConfig) -> SimResult<Vec<Submission>> {
    validate(workload)?;

    let mut submissions = Vec::new();
    let mut next_id: u64 = 1;

    for spec in &workload.tasks {
        submissions.push(from_spec(next_id, spec));
        next_id += 1;
    }

    if let Some(random) = &workload.random {
        generate_random(random, &mut next_id, &mut submissions);
    }

    // 稳定排序：同一到达时刻保持 id 升序
    submissions.sort_by_key(|submission| submission.arrival);
    Ok(submissions)
}

fn from_spec(id: u64, spec: &TaskSpec) -> Submission {
    Submission {
        arrival: Duration::from_millis(spec.arrival_ms),
        task: Arc::new(Task::new(
            id,
            spec.class,
            spec.priority,
            spec.preemptible,
            Duration::from_millis(spec.size_ms),
        )),
    }
}

fn generate_random(
    random: &RandomWorkloadConfig,
    next_id: &mut u64,
    out: &mut Vec<Submission>,
) {
    let mut rng = StdRng::seed_from_u64(random.seed);
    debug!("随机负载: {} 个任务, 种子 {}", random.count, random.seed);

    for _ in 0..random.count {
        let class = SizeClass::ALL[rng.random_range(0..SizeClass::ALL.len())];
        let size_ms = rng.random_range(random.size_ms_min..=random.size_ms_max);
        let priority = rng.random_range(random.priority_min..=random.priority_max);
        let preemptible = rng.random_bool(random.preemptible_ratio);
        let arrival_ms = if random.arrival_spread_ms == 0 {
            0
        } else {
            rng.random_range(0..=random.arrival_spread_ms)
        };

        out.push(Submission {
            arrival: Duration::from_millis(arrival_ms),
            task: Arc::new(Task::new(
                *next_id,
                class,
                priority,
                preemptible,
                Duration::from_millis(size_ms),
            )),
        });
        *next_id += 1;
    }
}
