pub mod validate;

use crate::{
    messages::{builders::DEFAULT_LASER_READINGS, MessageKind},
    runtime::{Cadence, LoopOptions},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with_expand_env::with_expand_envs;
use std::{fmt, path::Path, str::FromStr, time::Duration};

use self::validate::validate_config;

/// 发布者的配置文件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// 通信层的部署信息
    #[serde(default)]
    pub deploy: Deploy,
    /// 周期间隔，格式为 `secs/1`、`millis/100` 或 `nanos/500`，最长一天
    #[serde(default)]
    pub interval: Interval,
    #[serde(default)]
    pub cadence: Cadence,
    /// 最多运行的周期数，不设置则一直运行
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<u64>,
    /// 激光扫描的采样点数
    #[serde(default = "default_laser_readings")]
    pub laser_readings: u32,
    #[serde(default)]
    pub on_advertise_error: AdvertisePolicy,
    /// 按顺序发布的 topic
    #[serde(default = "default_topics")]
    pub topics: Vec<TopicConfig>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            deploy: Deploy::default(),
            interval: Interval::default(),
            cadence: Cadence::default(),
            cycles: None,
            laser_readings: default_laser_readings(),
            on_advertise_error: AdvertisePolicy::default(),
            topics: default_topics(),
        }
    }
}

impl PublisherConfig {
    /// 从文件中读取配置
    /// 然后反序列化
    pub fn blocking_read(path: &Path) -> Result<PublisherConfig> {
        let buf = std::fs::read(path)
            .with_context(|| format!("failed to open config `{}`", path.display()))?;
        PublisherConfig::parse(buf)
    }

    pub fn parse(buf: Vec<u8>) -> Result<PublisherConfig> {
        serde_yaml::from_slice(&buf).context("failed to parse publisher config")
    }

    /// 检查配置是否合法
    pub fn validate(&self) -> Result<()> {
        validate_config(self).context("failed to validate publisher config")
    }

    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            interval: self.interval.0,
            cadence: self.cadence,
            max_cycles: self.cycles,
        }
    }
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_laser_readings() -> u32 {
    DEFAULT_LASER_READINGS
}

/// 默认发布全部八种消息，每种一个 topic
fn default_topics() -> Vec<TopicConfig> {
    MessageKind::ALL
        .iter()
        .map(|kind| TopicConfig {
            name: kind.default_topic().to_string(),
            kind: *kind,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicConfig {
    pub name: String,
    pub kind: MessageKind,
}

/// 通信层的部署信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deploy {
    #[serde(default)]
    pub transport: TransportKind,
    /// 通信端点，为空时依靠 zenoh 的 scouting
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<String>,
    /// 通信模式
    /// 指定了反序列化函数 with_expand_envs，会先展开其中的环境变量
    #[serde(default = "default_mode", deserialize_with = "with_expand_envs")]
    pub mode: String,
    /// topic 的前缀
    #[serde(default, deserialize_with = "with_expand_envs")]
    pub namespace: String,
}

impl Default for Deploy {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            endpoints: Vec::new(),
            mode: default_mode(),
            namespace: String::new(),
        }
    }
}

fn default_mode() -> String {
    "peer".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Zenoh,
    /// 进程内总线，不经过网络
    Memory,
}

/// topic 申明失败时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvertisePolicy {
    /// 直接退出
    #[default]
    Abort,
    /// 跳过该 topic，继续注册其余的 topic
    Skip,
}

/// newType模式，以 `secs/1`、`millis/100`、`nanos/500` 的形式读写 Duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval(pub Duration);

impl Default for Interval {
    fn default() -> Self {
        Self(crate::runtime::publisher::DEFAULT_INTERVAL)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.subsec_nanos();
        if nanos == 0 {
            write!(f, "secs/{}", self.0.as_secs())
        } else if nanos % 1_000_000 == 0 {
            write!(f, "millis/{}", self.0.as_millis())
        } else {
            write!(f, "nanos/{}", self.0.as_nanos())
        }
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 匹配 unit/value 的形式
        let (unit, value) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("interval must specify unit and value (e.g. `secs/5` or `millis/100`), got `{s}`"))?;
        let value: u64 = value
            .parse()
            .map_err(|_| format!("{unit} must be an integer (got `{value}`)"))?;
        match unit {
            "secs" => Ok(Self(Duration::from_secs(value))),
            "millis" => Ok(Self(Duration::from_millis(value))),
            "nanos" => Ok(Self(Duration::from_nanos(value))),
            other => Err(format!(
                "interval unit must be one of secs, millis or nanos (got `{other}`)"
            )),
        }
    }
}

/// 直接序列化为str
impl Serialize for Interval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        std::env::set_var("TOPIC_PULSE_TEST_MODE", "client");
        let yaml = r#"
version: "0.1"
deploy:
  transport: memory
  endpoints: ["tcp/127.0.0.1:7447"]
  mode: $TOPIC_PULSE_TEST_MODE
  namespace: ign
interval: secs/1
cadence: rate
cycles: 5
laser_readings: 10
on_advertise_error: skip
topics:
  - name: scan
    kind: laserscan
  - name: field
    kind: magnetometer
"#;
        let config = PublisherConfig::parse(yaml.as_bytes().to_vec()).unwrap();
        assert_eq!(config.deploy.transport, TransportKind::Memory);
        assert_eq!(config.deploy.mode, "client");
        assert_eq!(config.deploy.namespace, "ign");
        assert_eq!(config.interval, Interval(Duration::from_secs(1)));
        assert_eq!(config.cadence, Cadence::Rate);
        assert_eq!(config.on_advertise_error, AdvertisePolicy::Skip);
        assert_eq!(config.topics.len(), 2);
        assert_eq!(config.topics[0].kind, MessageKind::LaserScan);
        assert_eq!(
            config.loop_options(),
            LoopOptions {
                interval: Duration::from_secs(1),
                cadence: Cadence::Rate,
                max_cycles: Some(5),
            }
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PublisherConfig::parse(b"{}".to_vec()).unwrap();
        assert_eq!(config.deploy.transport, TransportKind::Zenoh);
        assert_eq!(config.deploy.mode, "peer");
        assert_eq!(config.interval.0, Duration::from_millis(100));
        assert_eq!(config.laser_readings, 100);
        assert_eq!(config.on_advertise_error, AdvertisePolicy::Abort);
        let names: Vec<_> = config.topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["header", "string", "quaternion", "vector3", "image", "imu", "laserscan", "magnetic"]
        );
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("publisher.yaml");
        let config = PublisherConfig::blocking_read(&path).unwrap();
        config.validate().unwrap();
        let defaults = PublisherConfig::default();
        assert_eq!(config.interval, defaults.interval);
        let kinds: Vec<_> = config.topics.iter().map(|t| (t.name.clone(), t.kind)).collect();
        let default_kinds: Vec<_> = defaults
            .topics
            .iter()
            .map(|t| (t.name.clone(), t.kind))
            .collect();
        assert_eq!(kinds, default_kinds);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(PublisherConfig::parse(b"rate: 10".to_vec()).is_err());
    }

    #[test]
    fn test_interval_format() {
        assert_eq!(
            "millis/100".parse::<Interval>().unwrap(),
            Interval(Duration::from_millis(100))
        );
        assert_eq!(Interval(Duration::from_millis(250)).to_string(), "millis/250");
        assert_eq!(Interval(Duration::from_secs(2)).to_string(), "secs/2");
        let sub_milli = Interval(Duration::new(1, 500));
        assert_eq!(sub_milli.to_string(), "nanos/1000000500");
        assert_eq!(sub_milli.to_string().parse::<Interval>().unwrap(), sub_milli);
        assert_eq!(
            Interval(Duration::from_micros(1500)).to_string(),
            "nanos/1500000"
        );
        assert!("minutes/1".parse::<Interval>().is_err());
        assert!("millis/abc".parse::<Interval>().is_err());
        assert!("100".parse::<Interval>().is_err());
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let config = PublisherConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = PublisherConfig::parse(yaml.into_bytes()).unwrap();
        assert_eq!(parsed.interval, config.interval);
        assert_eq!(parsed.topics.len(), config.topics.len());
    }
}
