use super::{BoxError, PubSubCommunicationLayer, Publisher};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};

/// 进程内总线上传递的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub topic: String,
    pub type_name: String,
    pub payload: Vec<u8>,
}

/// 订阅者，`topic` 为 None 时接收总线上所有 topic 的消息
struct Tap {
    topic: Option<String>,
    tx: flume::Sender<Sample>,
}

#[derive(Default)]
struct Bus {
    /// topic -> type name
    advertised: BTreeMap<String, String>,
    taps: Vec<Tap>,
}

/// Simple in-process bus for tests and runs without a network transport.
/// Clones share the same bus.
#[derive(Clone, Default)]
pub struct MemoryCommunicationLayer {
    bus: Arc<RwLock<Bus>>,
}

impl MemoryCommunicationLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅总线上所有 topic，按发布顺序接收
    pub fn subscribe_all(&self) -> flume::Receiver<Sample> {
        self.tap(None)
    }

    /// 订阅单个 topic
    pub fn subscribe(&self, topic: &str) -> flume::Receiver<Sample> {
        self.tap(Some(topic.to_string()))
    }

    /// 已申明的 topic 及其类型，按 topic 排序
    pub fn advertised(&self) -> Vec<(String, String)> {
        self.bus
            .read()
            .advertised
            .iter()
            .map(|(topic, type_name)| (topic.clone(), type_name.clone()))
            .collect()
    }

    fn tap(&self, topic: Option<String>) -> flume::Receiver<Sample> {
        let (tx, rx) = flume::unbounded();
        self.bus.write().taps.push(Tap { topic, tx });
        rx
    }
}

impl PubSubCommunicationLayer for MemoryCommunicationLayer {
    fn publisher(&mut self, topic: &str, type_name: &str) -> Result<Box<dyn Publisher>, BoxError> {
        let mut bus = self.bus.write();
        match bus.advertised.get(topic).cloned() {
            Some(existing) if existing != type_name => {
                return Err(format!(
                    "topic `{topic}` is already advertised with type {existing}, not {type_name}"
                )
                .into());
            }
            Some(_) => {}
            None => {
                bus.advertised
                    .insert(topic.to_string(), type_name.to_string());
            }
        }
        Ok(Box::new(MemoryPublisher {
            bus: self.bus.clone(),
            topic: topic.to_string(),
            type_name: type_name.to_string(),
        }))
    }
}

#[derive(Clone)]
pub struct MemoryPublisher {
    bus: Arc<RwLock<Bus>>,
    topic: String,
    type_name: String,
}

impl Publisher for MemoryPublisher {
    fn publish(&self, data: &[u8]) -> Result<(), BoxError> {
        let sample = Sample {
            topic: self.topic.clone(),
            type_name: self.type_name.clone(),
            payload: data.to_vec(),
        };
        let mut bus = self.bus.write();
        // 丢弃已经断开的订阅者
        bus.taps.retain(|tap| {
            let wanted = tap.topic.as_deref().map_or(true, |t| t == sample.topic);
            !wanted || tap.tx.send(sample.clone()).is_ok()
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_matching_subscribers() {
        let mut layer = MemoryCommunicationLayer::new();
        let all = layer.subscribe_all();
        let imu = layer.subscribe("imu");

        let imu_pub = layer.publisher("imu", "ignition.msgs.IMU").unwrap();
        let header_pub = layer.publisher("header", "ignition.msgs.Header").unwrap();
        header_pub.publish(b"h").unwrap();
        imu_pub.publish(b"i").unwrap();

        let topics: Vec<_> = all.try_iter().map(|s| s.topic).collect();
        assert_eq!(topics, vec!["header", "imu"]);
        let only_imu: Vec<_> = imu.try_iter().collect();
        assert_eq!(only_imu.len(), 1);
        assert_eq!(only_imu[0].payload, b"i".to_vec());
        assert_eq!(only_imu[0].type_name, "ignition.msgs.IMU");
    }

    #[test]
    fn test_advertise_type_conflict() {
        let mut layer = MemoryCommunicationLayer::new();
        layer.publisher("vector3", "ignition.msgs.Vector3d").unwrap();
        assert!(layer.publisher("vector3", "ignition.msgs.Vector3d").is_ok());
        assert!(layer.publisher("vector3", "ignition.msgs.Quaternion").is_err());
        assert_eq!(
            layer.advertised(),
            vec![("vector3".to_string(), "ignition.msgs.Vector3d".to_string())]
        );
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut layer = MemoryCommunicationLayer::new();
        let rx = layer.subscribe_all();
        drop(rx);
        let publisher = layer.publisher("string", "ignition.msgs.StringMsg").unwrap();
        publisher.publish(b"string").unwrap();
        assert!(layer.bus.read().taps.is_empty());
    }
}
