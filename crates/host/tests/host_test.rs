use std::sync::Arc;
use std::time::Duration;

use dispatchsim_domain::{SimError, SizeClass, Task, TaskState};
use dispatchsim_host::Host;

fn task(id: u64, priority: u8, preemptible: bool, size_ms: u64) -> Arc<Task> {
    Arc::new(Task::new(
        id,
        SizeClass::Short,
        priority,
        preemptible,
        Duration::from_millis(size_ms),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_task_runs_to_completion() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    let t = task(1, 1, true, 500);
    host.add_task(Arc::clone(&t));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(t.state(), TaskState::Running);
    assert_eq!(host.queue_size(), 1);
    assert_eq!(host.work_left(), Duration::from_millis(400));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(t.is_finished());
    assert_eq!(t.remaining(), Duration::ZERO);
    assert_eq!(host.queue_size(), 0);
    assert_eq!(host.work_left(), Duration::ZERO);

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_preemption_requeues_partial_work() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    let low = task(1, 1, true, 500);
    let high = task(2, 5, false, 200);

    host.add_task(Arc::clone(&low));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(low.state(), TaskState::Running);

    // 高优先级任务到达，立即抢占执行槽
    host.add_task(Arc::clone(&high));
    assert_eq!(low.state(), TaskState::Queued);
    assert_eq!(low.remaining(), Duration::from_millis(400));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(high.state(), TaskState::Running);
    assert_eq!(host.queue_size(), 2);

    // high finishes at t=300, then low resumes with its remaining 400ms
    tokio::time::sleep(Duration::from_millis(209)).await;
    assert!(high.is_finished());
    assert_eq!(low.state(), TaskState::Running);
    assert_eq!(host.work_left(), Duration::from_millis(390));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(low.is_finished());
    assert_eq!(host.queue_size(), 0);
    assert_eq!(host.work_left(), Duration::ZERO);

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_non_preemptible_task_is_not_preempted() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    let low = task(1, 1, false, 300);
    let high = task(2, 5, true, 100);

    host.add_task(Arc::clone(&low));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(low.state(), TaskState::Running);

    host.add_task(Arc::clone(&high));
    assert_eq!(low.state(), TaskState::Running);
    assert_eq!(high.state(), TaskState::Queued);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(low.state(), TaskState::Running);
    assert_eq!(high.state(), TaskState::Queued);

    // low completes its full 300ms before high gets the slot
    tokio::time::sleep(Duration::from_millis(170)).await;
    assert!(low.is_finished());
    assert_eq!(high.state(), TaskState::Running);

    tokio::time::sleep(Duration::from_millis(130)).await;
    assert!(high.is_finished());

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_equal_priority_does_not_preempt() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    let first = task(1, 3, true, 200);
    let second = task(2, 3, true, 100);

    host.add_task(Arc::clone(&first));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(first.state(), TaskState::Running);

    host.add_task(Arc::clone(&second));
    assert_eq!(first.state(), TaskState::Running);
    assert_eq!(second.state(), TaskState::Queued);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(first.is_finished());
    assert_eq!(second.state(), TaskState::Running);

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_lower_priority_does_not_preempt() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    let running = task(1, 5, true, 200);
    let lower = task(2, 2, true, 100);

    host.add_task(Arc::clone(&running));
    tokio::time::sleep(Duration::from_millis(50)).await;
    host.add_task(Arc::clone(&lower));

    assert_eq!(running.state(), TaskState::Running);
    assert_eq!(lower.state(), TaskState::Queued);

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_work_left_decreases_while_slot_occupied() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    host.add_task(task(1, 3, true, 300));
    host.add_task(task(2, 3, true, 200));
    assert_eq!(host.work_left(), Duration::from_millis(500));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(host.work_left(), Duration::from_millis(400));
    assert_eq!(host.queue_size(), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(host.work_left(), Duration::from_millis(250));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(host.work_left(), Duration::from_millis(100));
    assert_eq!(host.queue_size(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(host.work_left(), Duration::ZERO);
    assert_eq!(host.queue_size(), 0);

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_equal_priority_runs_in_arrival_order() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    let a = task(1, 3, true, 100);
    let b = task(2, 3, true, 100);
    let c = task(3, 3, true, 100);
    host.add_task(Arc::clone(&a));
    host.add_task(Arc::clone(&b));
    host.add_task(Arc::clone(&c));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(a.is_finished());
    assert_eq!(b.state(), TaskState::Running);
    assert_eq!(c.state(), TaskState::Queued);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(b.is_finished());
    assert_eq!(c.state(), TaskState::Running);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(c.is_finished());

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_is_idempotent_and_completes_in_flight_task() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    let t = task(1, 1, true, 200);
    host.add_task(Arc::clone(&t));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(t.state(), TaskState::Running);

    host.shutdown();
    host.shutdown();
    assert!(!host.is_running());

    // the in-flight task still runs to completion before the loop exits
    handle.await.unwrap();
    assert!(t.is_finished());
    assert_eq!(host.queue_size(), 0);

    host.shutdown();
    assert!(!host.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_tasks_added_after_shutdown_never_start() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    host.shutdown();
    handle.await.unwrap();

    let t = task(1, 9, true, 100);
    host.add_task(Arc::clone(&t));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(t.state(), TaskState::Queued);
    assert_eq!(host.queue_size(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tasks_added_before_start_run_once_started() {
    let host = Arc::new(Host::new(0));

    let t = task(1, 1, true, 100);
    host.add_task(Arc::clone(&t));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(t.state(), TaskState::Queued);
    assert_eq!(host.queue_size(), 1);

    let handle = host.start().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(t.is_finished());

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_zero_size_task_finishes_immediately() {
    let host = Arc::new(Host::new(0));
    let handle = host.start().unwrap();

    let t = task(1, 1, true, 0);
    host.add_task(Arc::clone(&t));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(t.is_finished());
    assert_eq!(host.queue_size(), 0);

    host.shutdown();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_fails() {
    let host = Arc::new(Host::new(7));
    let handle = host.start().unwrap();

    let err = host.start().unwrap_err();
    assert!(matches!(err, SimError::HostAlreadyStarted { id: 7 }));

    host.shutdown();
    handle.await.unwrap();
}
