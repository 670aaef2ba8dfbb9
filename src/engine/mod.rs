//! Simulation-engine interface consumed by the scenario core.
//!
//! The orchestration code only ever talks to [`Engine`]; the virtual clock,
//! event queue, devices and protocol stacks stay behind it. [`NetEngine`] is
//! the reference implementation on top of this crate's simulator.

mod error;
mod net_engine;

use std::net::SocketAddrV4;

use crate::app::{Endpoint, GeneratorId, ReceiverId};
use crate::net::{Interface, Ipv4Block, LinkId, NodeId};
use crate::proto::congestion::SocketType;
use crate::sim::SimTime;

pub use error::EngineError;
pub use net_engine::{EngineConfig, NetEngine};

/// Point-to-point link parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LinkParams {
    pub bandwidth_bps: u64,
    pub delay: SimTime,
}

impl LinkParams {
    pub fn mbps(mbps: u64, delay: SimTime) -> Self {
        Self {
            bandwidth_bps: mbps.saturating_mul(1_000_000),
            delay,
        }
    }
}

pub trait Engine {
    /// Congestion-control behaviour for every TCP socket created afterwards.
    fn set_socket_type(&mut self, socket_type: SocketType);

    fn create_node(&mut self, name: &str) -> NodeId;

    fn create_link(&mut self, a: NodeId, b: NodeId, params: LinkParams) -> Result<LinkId, EngineError>;

    fn install_stack(&mut self, node: NodeId) -> Result<(), EngineError>;

    /// Gives the first end `.1` and the second end `.2` of `block`.
    fn assign_addresses(&mut self, link: LinkId, block: Ipv4Block) -> Result<[Interface; 2], EngineError>;

    /// Bulk sender toward `remote`; `max_bytes == 0` means no limit.
    fn create_generator(
        &mut self,
        node: NodeId,
        remote: SocketAddrV4,
        max_bytes: u64,
    ) -> Result<GeneratorId, EngineError>;

    /// Passive byte counter listening on `port` across any local address.
    fn create_receiver(&mut self, node: NodeId, port: u16) -> Result<ReceiverId, EngineError>;

    fn schedule_start(&mut self, endpoint: Endpoint, at: SimTime) -> Result<(), EngineError>;

    fn compute_global_routes(&mut self);

    fn set_stop_time(&mut self, at: SimTime);

    /// Runs until the stop time or until no events remain; returns the clock.
    fn run(&mut self) -> SimTime;

    fn received_bytes(&self, receiver: ReceiverId) -> Result<u64, EngineError>;

    fn now(&self) -> SimTime;

    /// Drops pending events and endpoint state.
    fn destroy(self)
    where
        Self: Sized;
}
