use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use topic_pulse::{
    cli::{Args, Command},
    config::PublisherConfig,
    config_from_env, ctrlc_handler,
    runtime::{describe, start},
};

/// 读取配置，优先使用命令行指定的文件，其次是环境变量，最后是默认配置
fn load_config(path: Option<&Path>) -> Result<PublisherConfig> {
    match path {
        Some(path) => PublisherConfig::blocking_read(path)
            .with_context(|| format!("failed to read config at `{}`", path.display())),
        None => Ok(config_from_env()?.unwrap_or_default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.init_log();
    match args.command {
        Command::Run {
            config,
            interval,
            cycles,
            transport,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(interval) = interval {
                config.interval = interval;
            }
            if cycles.is_some() {
                config.cycles = cycles;
            }
            if let Some(transport) = transport {
                config.deploy.transport = transport;
            }
            config.validate()?;

            let token = CancellationToken::new();
            ctrlc_handler(token.clone())?;
            let stats = start(config, token).await?;
            info!(
                "Publisher exit after {} cycles ({} published, {} failed)",
                stats.cycles, stats.published, stats.failed
            );
        }
        Command::Topics { config } => {
            let config = load_config(config.as_deref())?;
            config.validate()?;
            println!("{:<16} {:<32} {:>10}", "TOPIC", "TYPE", "BYTES");
            for topic in describe(&config)? {
                println!(
                    "{:<16} {:<32} {:>10}",
                    topic.name, topic.type_name, topic.encoded_len
                );
            }
        }
    }

    Ok(())
}
