//! Reference engine: the crate's discrete-event network simulator behind the
//! [`Engine`] trait.

use std::collections::HashSet;
use std::net::SocketAddrV4;

use tracing::{debug, info};

use super::{Engine, EngineError, LinkParams};
use crate::app::{Endpoint, GeneratorId, ReceiverId, StartApplication};
use crate::net::{Interface, Ipv4Block, LinkId, NetWorld, Network, NodeId};
use crate::proto::congestion::SocketType;
use crate::proto::tcp::TcpConfig;
use crate::queue::DEFAULT_QUEUE_PKTS;
use crate::sim::{SimTime, Simulator};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Drop-tail capacity of every device queue, in packets.
    pub queue_pkts: usize,
    /// Salt for equal-cost next-hop selection.
    pub seed: u64,
    pub tcp: TcpConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_pkts: DEFAULT_QUEUE_PKTS,
            seed: 1,
            tcp: TcpConfig::default(),
        }
    }
}

pub struct NetEngine {
    sim: Simulator,
    world: NetWorld,
    stop_at: Option<SimTime>,
    scheduled: HashSet<Endpoint>,
}

impl Default for NetEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl NetEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        let mut net = Network::new(cfg.queue_pkts, cfg.seed);
        net.tcp.set_config(cfg.tcp);
        Self {
            sim: Simulator::default(),
            world: NetWorld::new(net),
            stop_at: None,
            scheduled: HashSet::new(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.world.net
    }

    pub fn stop_time(&self) -> Option<SimTime> {
        self.stop_at
    }

    fn check_node(&self, node: NodeId) -> Result<(), EngineError> {
        self.world
            .net
            .node(node)
            .map(|_| ())
            .ok_or(EngineError::UnknownNode(node))
    }
}

impl Engine for NetEngine {
    fn set_socket_type(&mut self, socket_type: SocketType) {
        debug!(algorithm = socket_type.algorithm.type_id(), options = ?socket_type.options, "socket type set");
        self.world.net.tcp.set_socket_type(socket_type);
    }

    fn create_node(&mut self, name: &str) -> NodeId {
        self.world.net.add_node(name)
    }

    fn create_link(&mut self, a: NodeId, b: NodeId, params: LinkParams) -> Result<LinkId, EngineError> {
        Ok(self
            .world
            .net
            .connect(a, b, params.bandwidth_bps, params.delay)?)
    }

    fn install_stack(&mut self, node: NodeId) -> Result<(), EngineError> {
        Ok(self.world.net.install_stack(node)?)
    }

    fn assign_addresses(&mut self, link: LinkId, block: Ipv4Block) -> Result<[Interface; 2], EngineError> {
        Ok(self.world.net.assign_addresses(link, block)?)
    }

    fn create_generator(
        &mut self,
        node: NodeId,
        remote: SocketAddrV4,
        max_bytes: u64,
    ) -> Result<GeneratorId, EngineError> {
        self.check_node(node)?;
        Ok(self.world.net.apps.add_generator(node, remote, max_bytes))
    }

    fn create_receiver(&mut self, node: NodeId, port: u16) -> Result<ReceiverId, EngineError> {
        self.check_node(node)?;
        let taken = self
            .world
            .net
            .apps
            .receivers()
            .iter()
            .any(|r| r.node() == node && r.port() == port);
        if taken {
            return Err(EngineError::PortInUse { node, port });
        }
        Ok(self.world.net.apps.add_receiver(node, port))
    }

    fn schedule_start(&mut self, endpoint: Endpoint, at: SimTime) -> Result<(), EngineError> {
        let apps = &self.world.net.apps;
        match endpoint {
            Endpoint::Generator(id) => {
                apps.generator(id).ok_or(EngineError::UnknownGenerator(id))?;
            }
            Endpoint::Receiver(id) => {
                apps.receiver(id).ok_or(EngineError::UnknownReceiver(id))?;
            }
        }
        if !self.scheduled.insert(endpoint) {
            return Err(EngineError::AlreadyScheduled(endpoint));
        }
        self.sim.schedule(at, StartApplication { endpoint });
        Ok(())
    }

    fn compute_global_routes(&mut self) {
        self.world.net.compute_routes();
    }

    fn set_stop_time(&mut self, at: SimTime) {
        self.stop_at = Some(at);
    }

    fn run(&mut self) -> SimTime {
        match self.stop_at {
            Some(stop) => self.sim.run_until(stop, &mut self.world),
            None => self.sim.run(&mut self.world),
        }
        let stats = &self.world.net.stats;
        info!(
            now = %self.sim.now(),
            events = self.sim.executed(),
            delivered_pkts = stats.delivered_pkts,
            dropped_pkts = stats.dropped_pkts,
            unroutable_pkts = stats.unroutable_pkts,
            "engine halted"
        );
        self.sim.now()
    }

    fn received_bytes(&self, receiver: ReceiverId) -> Result<u64, EngineError> {
        self.world
            .net
            .apps
            .receiver(receiver)
            .map(|r| r.total_rx())
            .ok_or(EngineError::UnknownReceiver(receiver))
    }

    fn now(&self) -> SimTime {
        self.sim.now()
    }

    fn destroy(mut self) {
        let pending = self.sim.pending();
        self.sim.clear();
        debug!(pending, "engine destroyed");
    }
}
