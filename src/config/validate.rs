use super::{Deploy, PublisherConfig, TopicConfig};
use crate::runtime::publisher::MAX_INTERVAL;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeSet;

/// 支持的 zenoh 模式
const MODES: [&str; 3] = ["peer", "client", "router"];

/// 校验整个配置
pub(crate) fn validate_config(config: &PublisherConfig) -> Result<()> {
    if config.version.trim().is_empty() {
        bail!("config version must not be empty");
    }
    if config.interval.0.is_zero() {
        bail!("interval must be greater than zero");
    }
    if config.interval.0 > MAX_INTERVAL {
        bail!(
            "interval {} exceeds the maximum of {}",
            config.interval,
            super::Interval(MAX_INTERVAL)
        );
    }
    if config.cycles == Some(0) {
        bail!("cycles must be greater than zero when set");
    }
    if config.laser_readings == 0 {
        bail!("laser_readings must be greater than zero");
    }
    validate_deploy(&config.deploy).with_context(|| anyhow!("deploy validate error"))?;
    validate_topics(&config.topics)?;
    Ok(())
}

/// 检查deploy
fn validate_deploy(deploy: &Deploy) -> Result<()> {
    if !MODES.contains(&deploy.mode.as_str()) {
        bail!(
            "unknown mode `{}`, expected one of {}",
            deploy.mode,
            MODES.join(", ")
        );
    }
    if let Some(endpoint) = deploy.endpoints.iter().find(|e| e.trim().is_empty()) {
        bail!("endpoint `{endpoint}` must not be blank");
    }
    Ok(())
}

/// topic 名不能为空也不能重复
fn validate_topics(topics: &[TopicConfig]) -> Result<()> {
    if topics.is_empty() {
        bail!("no topic to publish");
    }
    let mut seen = BTreeSet::new();
    for topic in topics {
        if topic.name.trim().is_empty() {
            bail!("topic of kind {} has an empty name", topic.kind);
        }
        if !seen.insert(topic.name.as_str()) {
            bail!("topic `{}` is defined more than once", topic.name);
        }
    }
    Ok(())
}
