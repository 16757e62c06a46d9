use anyhow::{Context, Result};
use config::PublisherConfig;
use log::error;
use std::{
    env::VarError,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio_util::sync::CancellationToken;

pub mod cli;
pub mod communication;
pub mod config;
pub mod error;
pub mod messages;
pub mod runtime;

/// 用于存储发布者配置内容的环境变量
pub const PUBLISHER_CONFIG_ENV: &str = "TOPIC_PULSE_CONFIG";

/// 从环境变量中读取配置内容，未设置时返回 None
pub fn config_from_env() -> Result<Option<PublisherConfig>> {
    let raw = match std::env::var(PUBLISHER_CONFIG_ENV) {
        Ok(raw) => raw,
        Err(VarError::NotPresent) => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("env variable {PUBLISHER_CONFIG_ENV} is invalid"))
        }
    };
    PublisherConfig::parse(raw.into_bytes())
        .with_context(|| format!("failed to deserialize config from {PUBLISHER_CONFIG_ENV}"))
        .map(Some)
}

/// ctrlc 信号处理器，SIGINT 和 SIGTERM 都会取消 `token`
pub fn ctrlc_handler(token: CancellationToken) -> Result<()> {
    // 标记是否已经收到过信号
    let ctrlc_sent = Arc::new(AtomicBool::new(false));

    ctrlc::set_handler(move || {
        if ctrlc_sent.swap(true, Ordering::SeqCst) {
            // 如果已经收到过信号，则立即终止程序
            error!("received second ctrlc signal -> aborting immediately");
            std::process::abort();
        } else {
            error!("received ctrlc signal");
            token.cancel();
        }
    })
    .context("failed to set ctrlc handler")?;

    Ok(())
}
