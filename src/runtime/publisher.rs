use crate::{
    communication::{PubSubCommunicationLayer, Publisher},
    error::PublisherError,
    messages::{self, Message},
};
use futures::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{any::Any, time::Duration};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;

/// 默认的发布间隔
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
/// 允许的最大发布间隔
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// 类型擦除后的消息，发布集合中保存的就是它
pub trait Payload: Send {
    fn type_name(&self) -> &'static str;
    fn encode(&self) -> Result<Vec<u8>, bincode::Error>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Message> Payload for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        messages::encode(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// topic 名、消息以及申明 topic 得到的发布句柄
pub struct TopicBinding {
    name: String,
    payload: Box<dyn Payload>,
    publisher: Box<dyn Publisher>,
}

impl TopicBinding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }

    /// 编码后的消息长度
    pub fn encoded_len(&self) -> Result<usize, PublisherError> {
        self.encode().map(|bytes| bytes.len())
    }

    fn encode(&self) -> Result<Vec<u8>, PublisherError> {
        self.payload.encode().map_err(|source| PublisherError::Encode {
            topic: self.name.clone(),
            type_name: self.payload.type_name(),
            source,
        })
    }

    fn publish(&self) -> Result<(), PublisherError> {
        let data = self.encode()?;
        self.publisher
            .publish(&data)
            .map_err(|source| PublisherError::Publish {
                topic: self.name.clone(),
                source,
            })
    }
}

/// 注册 topic 后返回的句柄，可以用来修改该 topic 的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopicHandle(pub(crate) usize);

/// 发布循环的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// 已收到停止请求，等待当前周期结束
    Stopping,
    Stopped,
}

/// 周期之间的节奏
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// 每个周期结束后休眠一个 interval
    #[default]
    Delay,
    /// 按固定频率开始每个周期，落后的 tick 直接跳过
    Rate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    pub interval: Duration,
    pub cadence: Cadence,
    /// 运行的最大周期数，None 表示一直运行直到收到停止请求
    pub max_cycles: Option<u64>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            cadence: Cadence::Delay,
            max_cycles: None,
        }
    }
}

/// 单个周期的发布结果
#[derive(Debug, Default)]
pub struct CycleReport {
    pub published: usize,
    pub failures: Vec<PublisherError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub published: u64,
    pub failed: u64,
}

/// 周期性的多 topic 发布者
/// 所有的 topic 按注册顺序在每个周期中各发布一次
pub struct PeriodicPublisher {
    communication: Box<dyn PubSubCommunicationLayer>,
    bindings: Vec<TopicBinding>,
    options: LoopOptions,
    state: LoopState,
    stats: LoopStats,
}

impl PeriodicPublisher {
    pub fn new(communication: Box<dyn PubSubCommunicationLayer>, options: LoopOptions) -> Self {
        Self {
            communication,
            bindings: Vec::new(),
            options,
            state: LoopState::Running,
            stats: LoopStats::default(),
        }
    }

    /// 申明 topic 并保存消息
    /// topic 名不能为空且不能重复，申明失败时不会注册该 topic
    pub fn register<T: Message>(
        &mut self,
        name: &str,
        payload: T,
    ) -> Result<TopicHandle, PublisherError> {
        if name.trim().is_empty() {
            return Err(PublisherError::EmptyTopic);
        }
        if self.bindings.iter().any(|b| b.name == name) {
            return Err(PublisherError::DuplicateTopic(name.to_string()));
        }
        let publisher = self
            .communication
            .publisher(name, T::TYPE_NAME)
            .map_err(|source| PublisherError::Transport {
                topic: name.to_string(),
                type_name: T::TYPE_NAME,
                source,
            })?;
        info!("Advertise topic {name} [{}]", T::TYPE_NAME);
        self.bindings.push(TopicBinding {
            name: name.to_string(),
            payload: Box::new(payload),
            publisher,
        });
        Ok(TopicHandle(self.bindings.len() - 1))
    }

    /// 获取已注册的消息，类型不匹配时返回 None
    pub fn payload<T: Message>(&self, handle: TopicHandle) -> Option<&T> {
        self.bindings
            .get(handle.0)
            .and_then(|b| b.payload.as_any().downcast_ref())
    }

    /// 获取已注册消息的可变引用，修改会在下一个周期发布
    pub fn payload_mut<T: Message>(&mut self, handle: TopicHandle) -> Option<&mut T> {
        self.bindings
            .get_mut(handle.0)
            .and_then(|b| b.payload.as_any_mut().downcast_mut())
    }

    pub fn bindings(&self) -> &[TopicBinding] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// 按注册顺序把每个 topic 发布一次
    /// 单个 topic 失败只记录日志，不影响其他 topic
    pub fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        for binding in &self.bindings {
            match binding.publish() {
                Ok(()) => {
                    debug!("publish {} success", binding.name);
                    report.published += 1;
                }
                Err(e) => {
                    warn!("{e}");
                    report.failures.push(e);
                }
            }
        }
        self.stats.cycles += 1;
        self.stats.published += report.published as u64;
        self.stats.failed += report.failures.len() as u64;
        if !report.failures.is_empty() {
            warn!(
                "cycle {} published {}/{} topics",
                self.stats.cycles,
                report.published,
                self.bindings.len()
            );
        }
        report
    }

    /// 运行发布循环，直到 `token` 被取消或达到最大周期数
    /// 取消不会打断正在进行的周期，每个周期开始前检查一次 `token`
    pub async fn run(&mut self, token: &CancellationToken) -> LoopState {
        self.state = LoopState::Running;
        let interval = self.options.interval;
        let mut ticker = match self.options.cadence {
            Cadence::Delay => None,
            Cadence::Rate => {
                // tokio 的 interval 不接受 0，过大的 period 会让 Instant 溢出
                let period = interval.clamp(Duration::from_millis(1), MAX_INTERVAL);
                let start = Instant::now()
                    .checked_add(period)
                    .unwrap_or_else(Instant::now);
                let mut timer = time::interval_at(start, period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Some(IntervalStream::new(timer))
            }
        };
        info!(
            "Publish {} topics every {:?} ({:?})",
            self.bindings.len(),
            interval,
            self.options.cadence
        );

        let mut cycles = 0u64;
        while self.state == LoopState::Running {
            if token.is_cancelled() {
                info!("shutdown requested, stop publishing");
                self.state = LoopState::Stopping;
                break;
            }
            self.run_cycle();
            cycles += 1;
            if self.options.max_cycles.map_or(false, |max| cycles >= max) {
                info!("reached {cycles} cycles, stop publishing");
                self.state = LoopState::Stopping;
                break;
            }
            match ticker.as_mut() {
                Some(stream) => tokio::select! {
                    _ = stream.next() => {}
                    _ = token.cancelled() => {}
                },
                None => tokio::select! {
                    _ = time::sleep(interval) => {}
                    _ = token.cancelled() => {}
                },
            }
        }

        self.state = LoopState::Stopped;
        info!(
            "Publisher stopped after {} cycles, {} published, {} failed",
            self.stats.cycles, self.stats.published, self.stats.failed
        );
        self.state
    }
}
