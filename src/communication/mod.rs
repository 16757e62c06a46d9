pub mod memory;
pub mod pub_sub;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 发布端通信层，负责按 topic 申明(advertise)发布者
pub trait PubSubCommunicationLayer: Send + Sync {
    /// 申明一个 topic，`type_name` 为该 topic 上消息的类型名
    fn publisher(&mut self, topic: &str, type_name: &str) -> Result<Box<dyn Publisher>, BoxError>;
}

/// 已申明 topic 的发布句柄
pub trait Publisher: Send + Sync {
    fn publish(&self, data: &[u8]) -> Result<(), BoxError>;
}
