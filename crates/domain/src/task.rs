use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 任务的唯一标识符，由提交方分配
pub type TaskId = u64;

/// 任务规模类别
///
/// 按执行时长将任务划分为三个区间，SITA 分发策略依据类别
/// 的序号选择目标主机。
///
/// # 变体说明
///
/// - `Short`: 短任务（序号 0）
/// - `Medium`: 中等任务（序号 1）
/// - `Long`: 长任务（序号 2）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Short,
    Medium,
    Long,
}

impl SizeClass {
    /// 全部规模类别，按序号排列
    pub const ALL: [SizeClass; 3] = [SizeClass::Short, SizeClass::Medium, SizeClass::Long];

    /// 类别序号，同时是 SITA 策略的目标主机下标
    pub fn index(&self) -> usize {
        match self {
            SizeClass::Short => 0,
            SizeClass::Medium => 1,
            SizeClass::Long => 2,
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeClass::Short => write!(f, "short"),
            SizeClass::Medium => write!(f, "medium"),
            SizeClass::Long => write!(f, "long"),
        }
    }
}

/// 任务生命周期状态
///
/// 状态机：`Queued -> Running -> Finished`；被抢占时发生一次
/// `Running -> Queued` 回退，之后可以重新进入 `Running`。
///
/// # 变体说明
///
/// - `Queued`: 已入队，等待主机执行
/// - `Running`: 占用某台主机的执行槽
/// - `Finished`: 剩余工作量归零，执行结束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    Queued = 0,
    Running = 1,
    Finished = 2,
}

impl TaskState {
    fn from_u8(value: u8) -> TaskState {
        match value {
            0 => TaskState::Queued,
            1 => TaskState::Running,
            _ => TaskState::Finished,
        }
    }
}

/// 任务定义
///
/// 表示一次待模拟执行的工作单元。身份信息在创建后不可变，
/// 剩余工作量和生命周期状态由持有它的主机推进。任务以
/// `Arc<Task>` 的形式在提交方、分发器和主机之间共享，
/// 因此可变部分使用原子量，任意线程都可以读取快照。
///
/// # 字段说明
///
/// - `id`: 任务的唯一标识符
/// - `class`: 规模类别（short/medium/long）
/// - `priority`: 优先级，数值越大越优先
/// - `preemptible`: 是否允许被更高优先级任务抢占
/// - `size`: 总工作量（模拟执行时长）
/// - `remaining_ms`: 剩余工作量（毫秒），抢占时落盘已执行的部分
/// - `state`: 生命周期状态
///
/// # 使用示例
///
/// ```rust
/// use std::time::Duration;
/// use dispatchsim_domain::{SizeClass, Task, TaskState};
///
/// let task = Task::new(1, SizeClass::Short, 5, true, Duration::from_millis(500));
/// assert_eq!(task.state(), TaskState::Queued);
/// assert_eq!(task.remaining(), Duration::from_millis(500));
/// ```
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    class: SizeClass,
    priority: u8,
    preemptible: bool,
    size: Duration,
    remaining_ms: AtomicU64,
    state: AtomicU8,
}

impl Task {
    pub fn new(
        id: TaskId,
        class: SizeClass,
        priority: u8,
        preemptible: bool,
        size: Duration,
    ) -> Self {
        Self {
            id,
            class,
            priority,
            preemptible,
            size,
            remaining_ms: AtomicU64::new(size.as_millis() as u64),
            state: AtomicU8::new(TaskState::Queued as u8),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn class(&self) -> SizeClass {
        self.class
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn preemptible(&self) -> bool {
        self.preemptible
    }

    /// 总工作量
    pub fn size(&self) -> Duration {
        self.size
    }

    /// 剩余工作量快照
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.remaining_ms.load(Ordering::Relaxed))
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Finished
    }

    /// 记录剩余工作量，抢占时由主机写入已执行后的差值
    pub fn set_remaining(&self, remaining: Duration) {
        self.remaining_ms
            .store(remaining.as_millis() as u64, Ordering::Relaxed);
    }

    /// 进入执行槽，`Queued -> Running`
    pub fn mark_running(&self) {
        self.state.store(TaskState::Running as u8, Ordering::Relaxed);
    }

    /// 被抢占让出执行槽，`Running -> Queued`
    pub fn mark_queued(&self) {
        self.state.store(TaskState::Queued as u8, Ordering::Relaxed);
    }

    /// 执行结束，剩余工作量归零
    pub fn finish(&self) {
        self.remaining_ms.store(0, Ordering::Relaxed);
        self.state.store(TaskState::Finished as u8, Ordering::Relaxed);
    }
}
