use crate::communication::BoxError;
use thiserror::Error;

/// 注册和发布 topic 时的错误
#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("topic name must not be empty")]
    EmptyTopic,
    #[error("topic `{0}` is already registered")]
    DuplicateTopic(String),
    /// 申明 topic 失败
    #[error("failed to advertise topic `{topic}` [{type_name}]: {source}")]
    Transport {
        topic: String,
        type_name: &'static str,
        #[source]
        source: BoxError,
    },
    /// 单次发布失败
    #[error("failed to publish on topic `{topic}`: {source}")]
    Publish {
        topic: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to encode {type_name} payload for topic `{topic}`: {source}")]
    Encode {
        topic: String,
        type_name: &'static str,
        #[source]
        source: bincode::Error,
    },
}

impl PublisherError {
    /// 出错的 topic
    pub fn topic(&self) -> Option<&str> {
        match self {
            PublisherError::EmptyTopic => None,
            PublisherError::DuplicateTopic(topic)
            | PublisherError::Transport { topic, .. }
            | PublisherError::Publish { topic, .. }
            | PublisherError::Encode { topic, .. } => Some(topic),
        }
    }
}
