//! 任务分发器
//!
//! 将提交的任务按可配置的负载均衡策略分发到固定的主机列表上。
//! 四种策略：轮询、最短队列、SITA（按规模类别）、最少剩余工作量。

pub mod dispatcher;
pub mod strategies;


pub use dispatcher::Dispatcher;
pub use strategies::{DispatchStrategy, StrategyKind};
