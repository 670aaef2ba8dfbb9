//! 场景各阶段的错误类型

use std::io;
use std::net::Ipv4Addr;

use thiserror::Error;

use super::Phase;
use crate::engine::EngineError;
use crate::net::{AddressError, Ipv4Block, NodeId};
use crate::sim::SimTime;

/// 配置错误：在创建任何节点之前检出
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("spoke count must be at least 1")]
    NoSpokes,
    #[error("spoke count {0} exceeds the maximum of {max}", max = super::config::MAX_SPOKES)]
    TooManySpokes(usize),
    #[error("unknown transport protocol {name:?}; expected one of: {expected}")]
    UnknownProtocol { name: String, expected: String },
    #[error("{which} link bandwidth must be positive")]
    ZeroBandwidth { which: &'static str },
    #[error("stop time {stop} must be later than the generator start time {start}")]
    StopNotAfterStart { start: SimTime, stop: SimTime },
    #[error("receiver port must be non-zero")]
    ZeroPort,
    #[error("device queues must hold at least one packet")]
    ZeroQueue,
}

/// 拓扑构建期间的内部不变量被破坏
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("{star} star has {actual} spokes, expected {expected}")]
    SpokeCount {
        star: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{star} hub {hub:?} has degree {actual}, expected {expected}")]
    HubDegree {
        star: &'static str,
        hub: NodeId,
        expected: usize,
        actual: usize,
    },
    #[error("stars differ in size: {source_spokes} source spokes vs {sink_spokes} sink spokes")]
    StarMismatch {
        source_spokes: usize,
        sink_spokes: usize,
    },
    #[error("interface address {addr} is outside its link block {block}")]
    OutsideBlock { addr: Ipv4Addr, block: Ipv4Block },
    #[error("address {0} assigned to more than one interface")]
    DuplicateAddress(Ipv4Addr),
    #[error("address block {0} shared by more than one link")]
    SharedBlock(Ipv4Block),
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("topology build failed: {0}")]
    Build(#[from] BuildError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },
    #[error("results are only available after the run halts (current phase {0:?})")]
    NotHalted(Phase),
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode JSON report: {0}")]
    Json(#[from] serde_json::Error),
}
