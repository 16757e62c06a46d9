use crate::config::{Interval, TransportKind};
use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use log::Level;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(author, bin_name = "topic-pulse", version, about)]
pub struct Args {
    /// 子命令列表
    #[clap(subcommand)]
    pub command: Command,
    /// log level
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

/// periodic multi-topic publisher
#[derive(Debug, Subcommand)]
pub enum Command {
    /// 注册配置中的 topic 并周期性发布，直到收到 ctrl-c 或 SIGTERM
    /// Publish every configured topic periodically.
    Run {
        /// yaml config path
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// 覆盖配置中的周期间隔，例如 `millis/100`
        #[arg(short, long)]
        interval: Option<Interval>,
        /// 运行指定的周期数后退出
        #[arg(long)]
        cycles: Option<u64>,
        /// 覆盖配置中的通信层
        #[arg(short, long, value_enum)]
        transport: Option<TransportKind>,
    },
    /// 查看配置解析出的 topic 列表，不连接网络
    /// Print the resolved topic table.
    Topics {
        /// yaml config path
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Args {
    pub fn init_log(&self) {
        // RUST_LOG 和 -v 中取更详细的日志级别，默认 info
        let level_env = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let level_verbose = match self.verbose {
            0 => "ERROR",
            1 => "INFO",
            2 => "DEBUG",
            _ => "TRACE",
        };
        let level = match (Level::from_str(&level_env), Level::from_str(level_verbose)) {
            (Ok(env), Ok(verbose)) => env.max(verbose).to_string(),
            // RUST_LOG 是 target 过滤表达式时原样使用
            _ => level_env,
        };
        env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let args = Args::parse_from([
            "topic-pulse",
            "-vv",
            "run",
            "--interval",
            "millis/50",
            "--cycles",
            "3",
            "--transport",
            "memory",
        ]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Run {
                config,
                interval,
                cycles,
                transport,
            } => {
                assert!(config.is_none());
                assert_eq!(interval, Some(Interval(Duration::from_millis(50))));
                assert_eq!(cycles, Some(3));
                assert_eq!(transport, Some(TransportKind::Memory));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_interval_rejected() {
        assert!(Args::try_parse_from(["topic-pulse", "run", "--interval", "fast"]).is_err());
    }
}
