pub mod publisher;

use crate::{
    communication::{
        memory::MemoryCommunicationLayer, pub_sub::ZenohCommunicationLayer,
        PubSubCommunicationLayer,
    },
    config::{AdvertisePolicy, Deploy, PublisherConfig, TransportKind},
    error::PublisherError,
    messages::{builders, Header, MessageKind, Quaternion, Vector3d},
};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

pub use publisher::{
    Cadence, CycleReport, LoopOptions, LoopState, LoopStats, PeriodicPublisher, TopicHandle,
};

/// 多个消息共用的子消息，只构造一次
/// 其他消息嵌入的是它们的拷贝
pub struct Samples {
    pub header: Header,
    pub quaternion: Quaternion,
    pub vector3d: Vector3d,
    pub laser_readings: u32,
}

impl Samples {
    pub fn new(laser_readings: u32) -> Self {
        Self {
            header: builders::header(),
            quaternion: builders::quaternion(),
            vector3d: builders::vector3d(),
            laser_readings,
        }
    }
}

/// 按消息种类构造示例消息并注册到 topic `name`
pub fn register_kind(
    publisher: &mut PeriodicPublisher,
    name: &str,
    kind: MessageKind,
    samples: &Samples,
) -> Result<TopicHandle, PublisherError> {
    match kind {
        MessageKind::Header => publisher.register(name, samples.header.clone()),
        MessageKind::String => publisher.register(name, builders::string()),
        MessageKind::Quaternion => publisher.register(name, samples.quaternion.clone()),
        MessageKind::Vector3d => publisher.register(name, samples.vector3d.clone()),
        MessageKind::Image => publisher.register(name, builders::image(&samples.header)),
        MessageKind::Imu => publisher.register(
            name,
            builders::imu(&samples.header, &samples.quaternion, &samples.vector3d),
        ),
        MessageKind::LaserScan => publisher.register(
            name,
            builders::laser_scan(&samples.header, samples.laser_readings),
        ),
        MessageKind::Magnetometer => publisher.register(
            name,
            builders::magnetometer(&samples.header, &samples.vector3d),
        ),
    }
}

/// 根据部署信息创建通信层
pub fn communication_layer(deploy: &Deploy) -> Result<Box<dyn PubSubCommunicationLayer>> {
    match deploy.transport {
        TransportKind::Zenoh => {
            info!(
                "Open zenoh session mode: {} endpoints: {:?}",
                deploy.mode, deploy.endpoints
            );
            let layer =
                ZenohCommunicationLayer::init(&deploy.endpoints, &deploy.mode, &deploy.namespace)
                    .context("failed to open zenoh session")?;
            Ok(Box::new(layer))
        }
        TransportKind::Memory => Ok(Box::new(MemoryCommunicationLayer::new())),
    }
}

/// 注册配置中的所有 topic
/// 申明失败时按 `on_advertise_error` 处理，其余错误直接返回
pub fn build(
    config: &PublisherConfig,
    communication: Box<dyn PubSubCommunicationLayer>,
) -> Result<PeriodicPublisher> {
    let mut publisher = PeriodicPublisher::new(communication, config.loop_options());
    let samples = Samples::new(config.laser_readings);
    for topic in &config.topics {
        match register_kind(&mut publisher, &topic.name, topic.kind, &samples) {
            Ok(_) => {}
            Err(e @ PublisherError::Transport { .. })
                if config.on_advertise_error == AdvertisePolicy::Skip =>
            {
                warn!("skip topic {}: {e}", topic.name);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to register topic `{}`", topic.name))
            }
        }
    }
    if publisher.is_empty() {
        bail!("no topic could be advertised");
    }
    Ok(publisher)
}

/// 注册所有 topic 并运行发布循环，直到 `token` 被取消
pub async fn start(config: PublisherConfig, token: CancellationToken) -> Result<LoopStats> {
    info!("Start Publisher");
    let communication = communication_layer(&config.deploy)?;
    let mut publisher = build(&config, communication)?;
    publisher.run(&token).await;
    Ok(publisher.stats())
}

/// `topics` 命令输出的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub name: String,
    pub type_name: &'static str,
    pub encoded_len: usize,
}

/// 解析配置中的 topic，不连接任何网络
pub fn describe(config: &PublisherConfig) -> Result<Vec<TopicSummary>> {
    let publisher = build(config, Box::new(MemoryCommunicationLayer::new()))?;
    publisher
        .bindings()
        .iter()
        .map(|binding| {
            Ok(TopicSummary {
                name: binding.name().to_string(),
                type_name: binding.type_name(),
                encoded_len: binding.encoded_len()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        communication::{BoxError, Publisher},
        config::TopicConfig,
        messages::{Image, Imu, LaserScan},
    };
    use std::time::Duration;

    fn memory_config() -> PublisherConfig {
        let mut config = PublisherConfig::default();
        config.deploy.transport = TransportKind::Memory;
        config
    }

    #[test]
    fn test_default_topics_in_order() {
        let summaries = describe(&memory_config()).unwrap();
        let names: Vec<_> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "header",
                "string",
                "quaternion",
                "vector3",
                "image",
                "imu",
                "laserscan",
                "magnetic"
            ]
        );
        let image = summaries.iter().find(|s| s.name == "image").unwrap();
        assert_eq!(image.type_name, "ignition.msgs.Image");
        assert!(image.encoded_len > 320 * 240 * 3);
    }

    #[tokio::test]
    async fn test_memory_bus_receives_every_topic() {
        let bus = MemoryCommunicationLayer::new();
        let rx = bus.subscribe_all();
        let mut config = memory_config();
        config.cycles = Some(2);
        config.interval = crate::config::Interval(Duration::from_millis(1));

        let mut publisher = build(&config, Box::new(bus.clone())).unwrap();
        publisher.run(&CancellationToken::new()).await;

        let samples: Vec<_> = rx.try_iter().collect();
        assert_eq!(samples.len(), 16);
        assert_eq!(samples[0].topic, "header");
        assert_eq!(samples[8].topic, "header");

        let imu: Imu = bincode::deserialize(&samples[5].payload).unwrap();
        assert_eq!(imu.header, Some(builders::header()));
        let image: Image = bincode::deserialize(&samples[4].payload).unwrap();
        assert_eq!(image.width, 320);
        assert_eq!(samples[6].type_name, "ignition.msgs.LaserScan");
    }

    #[test]
    fn test_laser_readings_from_config() {
        let mut config = memory_config();
        config.laser_readings = 8;
        config.topics = vec![TopicConfig {
            name: "scan".to_string(),
            kind: MessageKind::LaserScan,
        }];
        let publisher = build(&config, Box::new(MemoryCommunicationLayer::new())).unwrap();
        let scan = publisher
            .payload::<LaserScan>(TopicHandle(0))
            .unwrap()
            .clone();
        assert_eq!(scan.count, 8);
        assert_eq!(scan.ranges.len(), 8);
    }

    /// 只能申明 `image` 以外的 topic
    struct NoImage(MemoryCommunicationLayer);

    impl PubSubCommunicationLayer for NoImage {
        fn publisher(
            &mut self,
            topic: &str,
            type_name: &str,
        ) -> Result<Box<dyn Publisher>, BoxError> {
            if topic == "image" {
                return Err("image topic refused".into());
            }
            self.0.publisher(topic, type_name)
        }
    }

    #[test]
    fn test_advertise_policy() {
        let mut config = memory_config();
        let err = build(&config, Box::new(NoImage(MemoryCommunicationLayer::new())))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("image topic refused"));

        config.on_advertise_error = AdvertisePolicy::Skip;
        let publisher = build(&config, Box::new(NoImage(MemoryCommunicationLayer::new()))).unwrap();
        assert_eq!(publisher.bindings().len(), 7);
        assert!(publisher.bindings().iter().all(|b| b.name() != "image"));
    }

    #[test]
    fn test_all_topics_skipped_is_an_error() {
        let mut config = memory_config();
        config.on_advertise_error = AdvertisePolicy::Skip;
        config.topics = vec![TopicConfig {
            name: "image".to_string(),
            kind: MessageKind::Image,
        }];
        assert!(build(&config, Box::new(NoImage(MemoryCommunicationLayer::new()))).is_err());
    }
}
