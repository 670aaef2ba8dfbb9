//! 只记录调用的引擎，用来检查编排顺序

use std::cell::RefCell;
use std::net::SocketAddrV4;
use std::rc::Rc;

use crate::app::{Endpoint, GeneratorId, ReceiverId};
use crate::engine::{Engine, EngineError, LinkParams};
use crate::net::{DeviceId, Interface, Ipv4Block, LinkId, NetError, NodeId};
use crate::proto::congestion::SocketType;
use crate::sim::SimTime;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetSocketType(SocketType),
    CreateNode(String),
    CreateLink(NodeId, NodeId, LinkParams),
    InstallStack(NodeId),
    AssignAddresses(LinkId, Ipv4Block),
    CreateGenerator(NodeId, SocketAddrV4, u64),
    CreateReceiver(NodeId, u16),
    ScheduleStart(Endpoint, SimTime),
    ComputeRoutes,
    SetStopTime(SimTime),
    Run,
    Destroy,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

#[derive(Debug, Default)]
pub struct MockEngine {
    log: CallLog,
    nodes: usize,
    links: Vec<[NodeId; 2]>,
    generators: usize,
    receivers: usize,
    stop: Option<SimTime>,
    /// 第 i 个接收端报告 `rx_step * (i + 1)` 字节
    rx_step: u64,
}

impl MockEngine {
    pub fn new(rx_step: u64) -> (Self, CallLog) {
        let log = CallLog::default();
        let engine = Self {
            log: Rc::clone(&log),
            rx_step,
            ..Self::default()
        };
        (engine, log)
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl Engine for MockEngine {
    fn set_socket_type(&mut self, socket_type: SocketType) {
        self.record(Call::SetSocketType(socket_type));
    }

    fn create_node(&mut self, name: &str) -> NodeId {
        self.record(Call::CreateNode(name.to_string()));
        self.nodes += 1;
        NodeId(self.nodes - 1)
    }

    fn create_link(&mut self, a: NodeId, b: NodeId, params: LinkParams) -> Result<LinkId, EngineError> {
        self.record(Call::CreateLink(a, b, params));
        self.links.push([a, b]);
        Ok(LinkId(self.links.len() - 1))
    }

    fn install_stack(&mut self, node: NodeId) -> Result<(), EngineError> {
        self.record(Call::InstallStack(node));
        Ok(())
    }

    fn assign_addresses(&mut self, link: LinkId, block: Ipv4Block) -> Result<[Interface; 2], EngineError> {
        self.record(Call::AssignAddresses(link, block));
        let nodes = self
            .links
            .get(link.0)
            .copied()
            .ok_or(NetError::UnknownLink(link))?;
        let iface = |end: usize| -> Result<Interface, EngineError> {
            Ok(Interface {
                node: nodes[end],
                device: DeviceId(2 * link.0 + end),
                addr: block
                    .host(end as u32 + 1)
                    .ok_or(NetError::BlockTooSmall(block))?,
                block,
            })
        };
        Ok([iface(0)?, iface(1)?])
    }

    fn create_generator(
        &mut self,
        node: NodeId,
        remote: SocketAddrV4,
        max_bytes: u64,
    ) -> Result<GeneratorId, EngineError> {
        self.record(Call::CreateGenerator(node, remote, max_bytes));
        self.generators += 1;
        Ok(GeneratorId(self.generators - 1))
    }

    fn create_receiver(&mut self, node: NodeId, port: u16) -> Result<ReceiverId, EngineError> {
        self.record(Call::CreateReceiver(node, port));
        self.receivers += 1;
        Ok(ReceiverId(self.receivers - 1))
    }

    fn schedule_start(&mut self, endpoint: Endpoint, at: SimTime) -> Result<(), EngineError> {
        self.record(Call::ScheduleStart(endpoint, at));
        Ok(())
    }

    fn compute_global_routes(&mut self) {
        self.record(Call::ComputeRoutes);
    }

    fn set_stop_time(&mut self, at: SimTime) {
        self.record(Call::SetStopTime(at));
        self.stop = Some(at);
    }

    fn run(&mut self) -> SimTime {
        self.record(Call::Run);
        self.stop.unwrap_or(SimTime::ZERO)
    }

    fn received_bytes(&self, receiver: ReceiverId) -> Result<u64, EngineError> {
        if receiver.0 >= self.receivers {
            return Err(EngineError::UnknownReceiver(receiver));
        }
        Ok(self.rx_step * (receiver.0 as u64 + 1))
    }

    fn now(&self) -> SimTime {
        SimTime::ZERO
    }

    fn destroy(self) {
        self.record(Call::Destroy);
    }
}
