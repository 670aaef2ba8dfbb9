//! 场景配置：启动时读取一次，运行期间不可变。

use serde::Serialize;

use super::error::ConfigError;
use super::protocol::TransportProtocol;
use super::schedule::GENERATOR_DELAY;
use crate::engine::{EngineConfig, LinkParams};
use crate::proto::tcp::TcpConfig;
use crate::queue::DEFAULT_QUEUE_PKTS;
use crate::sim::SimTime;

/// 每个星型的最大 spoke 数：每条 spoke 链路占一个 /24，星型地址空间为 `10.x.1.0`–`10.x.255.0`。
pub const MAX_SPOKES: usize = 255;

/// 默认接收端口
pub const DEFAULT_PORT: u16 = 50000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioConfig {
    /// 每个星型的 spoke 数
    pub n_spokes: usize,
    pub protocol: TransportProtocol,
    /// 只影响发送端/接收端应用的信息日志，不影响测量结果
    pub verbose: bool,
    /// 每个发送端的字节上限，0 表示不设上限
    pub max_bytes: u64,
    pub port: u16,
    pub spoke_link: LinkParams,
    pub bottleneck_link: LinkParams,
    /// 接收端启动时刻；发送端晚 1 秒启动
    pub start_time: SimTime,
    /// 仿真停止时刻，同时是吞吐量的分母
    pub stop_time: SimTime,
    pub queue_pkts: usize,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            n_spokes: 8,
            protocol: TransportProtocol::Westwood,
            verbose: true,
            max_bytes: 0,
            port: DEFAULT_PORT,
            spoke_link: LinkParams::mbps(5, SimTime::from_millis(10)),
            bottleneck_link: LinkParams::mbps(1, SimTime::from_millis(20)),
            start_time: SimTime::from_secs(1),
            stop_time: SimTime::from_secs(60),
            queue_pkts: DEFAULT_QUEUE_PKTS,
            seed: 1,
        }
    }
}

impl ScenarioConfig {
    pub fn generator_start(&self) -> SimTime {
        self.start_time.saturating_add(GENERATOR_DELAY)
    }

    /// `<协议名><spoke 数>.txt`，例如 `Westwood8.txt`
    pub fn report_file_name(&self) -> String {
        format!("{}{}.txt", self.protocol.name(), self.n_spokes)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            queue_pkts: self.queue_pkts,
            seed: self.seed,
            tcp: TcpConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_spokes == 0 {
            return Err(ConfigError::NoSpokes);
        }
        if self.n_spokes > MAX_SPOKES {
            return Err(ConfigError::TooManySpokes(self.n_spokes));
        }
        if self.spoke_link.bandwidth_bps == 0 {
            return Err(ConfigError::ZeroBandwidth { which: "spoke" });
        }
        if self.bottleneck_link.bandwidth_bps == 0 {
            return Err(ConfigError::ZeroBandwidth { which: "bottleneck" });
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.queue_pkts == 0 {
            return Err(ConfigError::ZeroQueue);
        }
        if self.stop_time <= self.generator_start() {
            return Err(ConfigError::StopNotAfterStart {
                start: self.generator_start(),
                stop: self.stop_time,
            });
        }
        Ok(())
    }
}
