//! 模拟器领域模型
//!
//! 任务实体与统一错误类型，被dispatcher和host两个crate共享。
//! 本crate只依赖基础库，不依赖其他dispatchsim crates。

pub mod errors;
pub mod task;

pub use errors::{SimError, SimResult};
pub use task::{SizeClass, Task, TaskId, TaskState};
