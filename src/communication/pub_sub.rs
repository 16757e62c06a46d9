use super::{BoxError, PubSubCommunicationLayer, Publisher};
use anyhow::{anyhow, Result};
use zenoh::config::{whatami::WhatAmI, ConnectConfig, EndPoint};
use log::{debug, warn};
use std::{str::FromStr, sync::Arc};
use zenoh::prelude::{sync::SyncResolve, *};

/// 基于 Zenoh 实现的 PubSubCommunicationLayer
pub struct ZenohCommunicationLayer {
    /// Zenoh 会话
    session: Arc<zenoh::Session>,
    /// zenoh namespace,用于topic prefix
    namespace: String,
}

#[derive(Clone)]
pub struct ZenohPublisher {
    publisher: zenoh::publication::Publisher<'static>,
}

impl Publisher for ZenohPublisher {
    fn publish(&self, data: &[u8]) -> Result<(), BoxError> {
        self.publisher.put(data).res_sync().map_err(BoxError::from)
    }
}

impl ZenohCommunicationLayer {
    /// 初始化 ZenohCommunicationLayer
    /// 无法解析的 endpoint 会被跳过
    pub fn init(endpoints: &[String], mode: &str, namespace: &str) -> Result<Self> {
        let mut config = ::zenoh::config::Config::default();
        let _ = config.set_mode(WhatAmI::from_str(mode).ok());
        config.connect = ConnectConfig {
            endpoints: endpoints
                .iter()
                .filter_map(|e| match EndPoint::from_str(e) {
                    Ok(endpoint) => Some(endpoint),
                    Err(err) => {
                        warn!("skip invalid zenoh endpoint `{e}`: {err}");
                        None
                    }
                })
                .collect(),
        };
        let session = zenoh::open(config)
            .res_sync()
            .map_err(|e| anyhow!(e))?
            .into_arc();
        Ok(Self {
            session,
            namespace: namespace.to_string(),
        })
    }

    /// 根据topic获取完整的 key expr
    fn prefixed(&self, topic: &str) -> String {
        key_expr(&self.namespace, topic)
    }
}

/// namespace 为空时直接使用 topic
fn key_expr(namespace: &str, topic: &str) -> String {
    let namespace = namespace.trim_end_matches('/');
    if namespace.is_empty() {
        topic.to_string()
    } else {
        format!("{namespace}/{topic}")
    }
}

impl PubSubCommunicationLayer for ZenohCommunicationLayer {
    fn publisher(&mut self, topic: &str, type_name: &str) -> Result<Box<dyn Publisher>, BoxError> {
        let key_expr = self.prefixed(topic);
        debug!("declare zenoh publisher {key_expr} [{type_name}]");
        let publisher = self
            .session
            .declare_publisher(key_expr)
            .congestion_control(CongestionControl::Block)
            .priority(Priority::RealTime)
            .res_sync()
            .map_err(BoxError::from)?;

        Ok(Box::new(ZenohPublisher { publisher }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_expr() {
        assert_eq!(key_expr("ign", "imu"), "ign/imu");
        assert_eq!(key_expr("ign/", "imu"), "ign/imu");
        assert_eq!(key_expr("", "imu"), "imu");
    }
}
