//! 应用层：批量发送端（generator）与计数接收端（receiver）
//!
//! 应用挂在 `Network` 上，由 `StartApplication` 事件在指定仿真时刻启动，
//! 一直运行到仿真停止。日志都在本模块下，便于按 target 整体开关。

mod bulk_send;
mod packet_sink;

use std::net::SocketAddrV4;

use serde::Serialize;
use tracing::warn;

use crate::net::{NetWorld, NodeId};
use crate::sim::{Event, SimTime, Simulator, World};

pub use bulk_send::BulkSend;
pub use packet_sink::PacketSink;

/// 发送端句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GeneratorId(pub usize);

/// 接收端句柄：唯一能查询接收字节数的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ReceiverId(pub usize);

/// 可被调度启动的应用端点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Endpoint {
    Generator(GeneratorId),
    Receiver(ReceiverId),
}

/// 发送端连接的生命周期事件（由 TCP 层通知）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnEvent {
    Connected,
    Refused,
    Failed,
    Completed,
}

#[derive(Debug, Default)]
pub struct Applications {
    generators: Vec<BulkSend>,
    receivers: Vec<PacketSink>,
}

impl Applications {
    pub fn add_generator(&mut self, node: NodeId, remote: SocketAddrV4, max_bytes: u64) -> GeneratorId {
        let id = GeneratorId(self.generators.len());
        self.generators.push(BulkSend::new(id, node, remote, max_bytes));
        id
    }

    pub fn add_receiver(&mut self, node: NodeId, port: u16) -> ReceiverId {
        let id = ReceiverId(self.receivers.len());
        self.receivers.push(PacketSink::new(id, node, port));
        id
    }

    pub fn generator(&self, id: GeneratorId) -> Option<&BulkSend> {
        self.generators.get(id.0)
    }

    pub fn receiver(&self, id: ReceiverId) -> Option<&PacketSink> {
        self.receivers.get(id.0)
    }

    pub fn generators(&self) -> &[BulkSend] {
        &self.generators
    }

    pub fn receivers(&self) -> &[PacketSink] {
        &self.receivers
    }

    pub(crate) fn on_conn_event(&mut self, id: GeneratorId, ev: ConnEvent, now: SimTime) {
        if let Some(g) = self.generators.get_mut(id.0) {
            g.on_conn_event(ev, now);
        }
    }

    pub(crate) fn on_accept(&mut self, id: ReceiverId, from: SocketAddrV4, now: SimTime) {
        if let Some(r) = self.receivers.get_mut(id.0) {
            r.on_accept(from, now);
        }
    }

    pub(crate) fn on_sink_rx(&mut self, id: ReceiverId, bytes: u64, from: SocketAddrV4, now: SimTime) {
        if let Some(r) = self.receivers.get_mut(id.0) {
            r.on_rx(bytes, from, now);
        }
    }
}

/// 事件：启动一个应用端点
#[derive(Debug)]
pub struct StartApplication {
    pub endpoint: Endpoint,
}

impl Event for StartApplication {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let net = NetWorld::net_mut(world);
        let now = sim.now();
        match self.endpoint {
            Endpoint::Receiver(id) => {
                let Some(sink) = net.apps.receiver(id) else {
                    warn!(?id, "启动未知的接收端");
                    return;
                };
                let (node, port) = (sink.node(), sink.port());
                let listening = net.tcp.listen(node, port, id);
                if let Some(sink) = net.apps.receivers.get_mut(id.0) {
                    sink.on_start(listening, now);
                }
            }
            Endpoint::Generator(id) => {
                let Some(g) = net.apps.generator(id) else {
                    warn!(?id, "启动未知的发送端");
                    return;
                };
                let (node, remote, limit) = (g.node(), g.remote(), g.limit());
                if let Some(g) = net.apps.generators.get_mut(id.0) {
                    g.on_start(now);
                }
                // 规避同时借用 `net` 与 `net.tcp`
                let mut tcp = std::mem::take(&mut net.tcp);
                let conn = tcp.connect(node, remote, limit, id, sim, net);
                net.tcp = tcp;
                if let Some(g) = net.apps.generators.get_mut(id.0) {
                    g.attach(conn);
                }
            }
        }
    }
}
