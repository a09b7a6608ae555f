use tokio::sync::watch;
use tracing::{debug, info};

/// 优雅关闭信号
///
/// 单向的布尔开关：触发是幂等的，所有监听器都会观察到关闭，
/// 包括在触发之后才订阅的。
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// 触发关闭，重复触发是无操作
    pub fn trigger(&self) {
        if self.tx.send_replace(true) {
            debug!("关闭信号已经触发过");
        } else {
            info!("触发关闭信号");
        }
    }

    /// 检查是否已经触发
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// 关闭信号的监听端，可以克隆给多个组件
#[derive(Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// 等待关闭被触发；已经触发时立即返回。
    /// 发送端被析构同样视为关闭。
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|&stop| stop).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}
