use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use tokio::signal;
use tokio::time;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod config;
mod shutdown;
mod workload;

use app::Application;
use config::AppConfig;
use shutdown::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("dispatchsim")
        .version("1.0.0")
        .about("多主机任务分发模拟器")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，缺省时按默认路径搜索"),
        )
        .arg(
            Arg::new("strategy")
                .short('s')
                .long("strategy")
                .value_name("STRATEGY")
                .help("分发策略，覆盖配置文件")
                .value_parser([
                    "round_robin",
                    "shortest_queue",
                    "size_interval",
                    "least_work_left",
                ]),
        )
        .arg(
            Arg::new("hosts")
                .long("hosts")
                .value_name("N")
                .help("主机数量，覆盖配置文件")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .help("随机负载种子，覆盖配置文件")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let log_level = matches.get_one::<String>("log-level").unwrap();
    let log_format = matches.get_one::<String>("log-format").unwrap();

    // 初始化日志系统
    init_logging(log_level, log_format)?;

    info!("启动多主机任务分发模拟器");
    match config_path {
        Some(path) => info!("配置文件: {path}"),
        None => info!("未指定配置文件，按默认路径搜索"),
    }

    // 加载配置
    let mut config = AppConfig::load(config_path.map(String::as_str))
        .with_context(|| format!("加载配置失败: {config_path:?}"))?;

    // 命令行覆盖配置
    let mut overridden = false;
    if let Some(strategy) = matches.get_one::<String>("strategy") {
        config.dispatcher.strategy = strategy.clone();
        overridden = true;
    }
    if let Some(count) = matches.get_one::<usize>("hosts") {
        config.hosts.count = *count;
        overridden = true;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        match &mut config.workload.random {
            Some(random) => {
                random.seed = *seed;
                overridden = true;
            }
            None => warn!("--seed 仅在配置了随机负载时生效"),
        }
    }
    if overridden {
        config.validate().context("命令行覆盖后的配置无效")?;
    }

    let shutdown_timeout = Duration::from_secs(config.sim.shutdown_timeout_seconds);

    // 创建应用实例
    let app = Application::new(config)?;

    // 创建优雅关闭信号
    let shutdown = ShutdownSignal::new();
    let listener = shutdown.subscribe();

    // 启动应用
    let mut app_handle = tokio::spawn(async move { app.run(listener).await });

    tokio::select! {
        result = &mut app_handle => {
            let summary = result.context("应用任务异常退出")??;
            info!("模拟正常结束: 完成 {}/{}", summary.finished, summary.submitted);
        }
        _ = wait_for_shutdown_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
            shutdown.trigger();

            // 等待应用关闭，设置超时
            match time::timeout(shutdown_timeout, &mut app_handle).await {
                Ok(Ok(Ok(summary))) => {
                    info!("应用已优雅关闭: 完成 {}/{}", summary.finished, summary.submitted);
                }
                Ok(Ok(Err(e))) => {
                    error!("应用关闭时发生错误: {e}");
                }
                Ok(Err(e)) => {
                    error!("应用任务join失败: {e}");
                }
                Err(_) => {
                    warn!("应用关闭超时，强制退出");
                }
            }
        }
    }

    info!("多主机任务分发模拟器已退出");
    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("安装Ctrl+C信号处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("安装SIGTERM信号处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
