use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::warn;

use dispatchsim_dispatcher::StrategyKind;
use dispatchsim_domain::{SimError, SimResult, SizeClass};

use crate::workload;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub dispatcher: DispatcherConfig,
    pub hosts: HostsConfig,
    pub sim: SimConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// 分发策略: round_robin | shortest_queue | size_interval | least_work_left
    pub strategy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostsConfig {
    /// 主机数量，主机 id 为 0..count
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// 等待队列清空时的轮询间隔（毫秒）
    pub drain_poll_interval_ms: u64,
    /// 收到关闭信号后等待应用退出的超时（秒）
    pub shutdown_timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// 显式任务列表
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
    /// 随机负载生成，与显式列表可以同时使用
    #[serde(default)]
    pub random: Option<RandomWorkloadConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub class: SizeClass,
    pub size_ms: u64,
    pub priority: u8,
    pub preemptible: bool,
    /// 相对模拟开始的到达时刻（毫秒）
    #[serde(default)]
    pub arrival_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomWorkloadConfig {
    pub count: usize,
    /// 随机种子，相同种子生成相同的负载
    pub seed: u64,
    pub size_ms_min: u64,
    pub size_ms_max: u64,
    pub priority_min: u8,
    pub priority_max: u8,
    /// 可抢占任务的比例，取值 [0, 1]
    pub preemptible_ratio: f64,
    /// 到达时刻均匀分布在 [0, arrival_spread_ms] 内
    pub arrival_spread_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig {
                strategy: "round_robin".to_string(),
            },
            hosts: HostsConfig { count: 4 },
            sim: SimConfig {
                drain_poll_interval_ms: 50,
                shutdown_timeout_seconds: 30,
            },
            workload: WorkloadConfig {
                tasks: vec![],
                random: Some(RandomWorkloadConfig {
                    count: 20,
                    seed: 42,
                    size_ms_min: 50,
                    size_ms_max: 500,
                    priority_min: 0,
                    priority_max: 9,
                    preemptible_ratio: 0.7,
                    arrival_spread_ms: 1000,
                }),
            },
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/dispatchsim.toml",
                "dispatchsim.toml",
                "/etc/dispatchsim/config.toml",
            ];

            let mut config_file_found = false;
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    config_file_found = true;
                    break;
                }
            }

            if !config_file_found {
                builder = builder
                    .set_default("dispatcher.strategy", "round_robin")?
                    .set_default("hosts.count", 4)?
                    .set_default("sim.drain_poll_interval_ms", 50)?
                    .set_default("sim.shutdown_timeout_seconds", 30)?
                    .set_default("workload.random.count", 20)?
                    .set_default("workload.random.seed", 42)?
                    .set_default("workload.random.size_ms_min", 50)?
                    .set_default("workload.random.size_ms_max", 500)?
                    .set_default("workload.random.priority_min", 0)?
                    .set_default("workload.random.priority_max", 9)?
                    .set_default("workload.random.preemptible_ratio", 0.7)?
                    .set_default("workload.random.arrival_spread_ms", 1000)?;
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("DISPATCHSIM")
                .separator("_")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> SimResult<()> {
        self.dispatcher.validate()?;
        self.hosts.validate()?;
        self.sim.validate()?;
        workload::validate(&self.workload)?;

        // SITA 需要主机数量不少于规模类别数量，否则超出的类别会被丢弃
        if self.dispatcher.strategy == StrategyKind::SizeInterval.name()
            && self.hosts.count < SizeClass::ALL.len()
        {
            warn!(
                "SITA策略配置了 {} 台主机，少于 {} 个规模类别，超出的类别会被静默丢弃",
                self.hosts.count,
                SizeClass::ALL.len()
            );
        }
        Ok(())
    }
}

impl DispatcherConfig {
    fn validate(&self) -> SimResult<()> {
        self.strategy.parse::<StrategyKind>()?;
        Ok(())
    }
}

impl HostsConfig {
    fn validate(&self) -> SimResult<()> {
        // 零台主机是合法配置，任务全部被静默丢弃
        if self.count == 0 {
            warn!("主机数量为 0，所有任务都会被丢弃");
        }
        Ok(())
    }
}

impl SimConfig {
    fn validate(&self) -> SimResult<()> {
        if self.drain_poll_interval_ms == 0 {
            return Err(SimError::config_error("drain_poll_interval_ms 必须大于 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.dispatcher.strategy, "round_robin");
        assert_eq!(config.hosts.count, 4);
        assert_eq!(config.sim.drain_poll_interval_ms, 50);
        assert!(config.workload.tasks.is_empty());
        assert!(config.workload.random.is_some());
    }

    #[test]
    fn test_app_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_rejects_unknown_strategy() {
        let mut config = AppConfig::default();
        config.dispatcher.strategy = "first_fit".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sita_host_shortfall_is_only_a_warning() {
        let mut config = AppConfig::default();
        config.dispatcher.strategy = "size_interval".to_string();
        config.hosts.count = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_from_toml() {
        let toml_str = r#"
[dispatcher]
strategy = "least_work_left"

[hosts]
count = 3

[sim]
drain_poll_interval_ms = 20
shutdown_timeout_seconds = 10

[[workload.tasks]]
class = "short"
size_ms = 100
priority = 5
preemptible = true
arrival_ms = 0

[[workload.tasks]]
class = "long"
size_ms = 800
priority = 1
preemptible = false
arrival_ms = 250
"#;

        let config = AppConfig::from_toml(toml_str).expect("Failed to parse TOML");
        assert_eq!(config.dispatcher.strategy, "least_work_left");
        assert_eq!(config.hosts.count, 3);
        assert_eq!(config.workload.tasks.len(), 2);
        assert_eq!(config.workload.tasks[0].class, SizeClass::Short);
        assert_eq!(config.workload.tasks[1].arrival_ms, 250);
        assert!(config.workload.random.is_none());
    }

    #[test]
    fn test_app_config_toml_round_trip() {
        let config = AppConfig::default();
        let serialized = config.to_toml().expect("Failed to serialize");
        let parsed = AppConfig::from_toml(&serialized).expect("Failed to parse");
        assert_eq!(parsed.dispatcher.strategy, config.dispatcher.strategy);
        assert_eq!(parsed.hosts.count, config.hosts.count);
        assert_eq!(
            parsed.workload.random.unwrap().seed,
            config.workload.random.unwrap().seed
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(
            file,
            r#"
[dispatcher]
strategy = "shortest_queue"

[hosts]
count = 2

[sim]
drain_poll_interval_ms = 10
shutdown_timeout_seconds = 5
"#
        )
        .expect("Failed to write temp file");

        let config =
            AppConfig::load(Some(file.path().to_str().unwrap())).expect("Failed to load config");
        assert_eq!(config.dispatcher.strategy, "shortest_queue");
        assert_eq!(config.hosts.count, 2);
        assert!(config.workload.tasks.is_empty());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/dispatchsim.toml")).is_err());
    }
}
