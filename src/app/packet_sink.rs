//! 计数接收端：在端口上被动接受连接，累计按序收到的字节数。

use std::net::SocketAddrV4;

use tracing::{info, warn};

use super::ReceiverId;
use crate::net::NodeId;
use crate::sim::SimTime;

#[derive(Debug)]
pub struct PacketSink {
    id: ReceiverId,
    node: NodeId,
    port: u16,
    listening: bool,
    started_at: Option<SimTime>,
    total_rx: u64,
    first_rx: Option<SimTime>,
    last_rx: Option<SimTime>,
    accepted: u32,
}

impl PacketSink {
    pub(crate) fn new(id: ReceiverId, node: NodeId, port: u16) -> Self {
        Self {
            id,
            node,
            port,
            listening: false,
            started_at: None,
            total_rx: 0,
            first_rx: None,
            last_rx: None,
            accepted: 0,
        }
    }

    pub fn id(&self) -> ReceiverId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn started_at(&self) -> Option<SimTime> {
        self.started_at
    }

    /// 累计接收字节数
    pub fn total_rx(&self) -> u64 {
        self.total_rx
    }

    pub fn first_rx(&self) -> Option<SimTime> {
        self.first_rx
    }

    pub fn last_rx(&self) -> Option<SimTime> {
        self.last_rx
    }

    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    pub(crate) fn on_start(&mut self, listening: bool, now: SimTime) {
        self.started_at = Some(now);
        self.listening = listening;
        if listening {
            info!(receiver = self.id.0, port = self.port, "[{now}] packet sink listening");
        } else {
            warn!(receiver = self.id.0, port = self.port, "[{now}] port already in use");
        }
    }

    pub(crate) fn on_accept(&mut self, from: SocketAddrV4, now: SimTime) {
        self.accepted += 1;
        info!(receiver = self.id.0, %from, "[{now}] connection accepted");
    }

    pub(crate) fn on_rx(&mut self, bytes: u64, from: SocketAddrV4, now: SimTime) {
        self.total_rx = self.total_rx.saturating_add(bytes);
        self.first_rx.get_or_insert(now);
        self.last_rx = Some(now);
        info!(
            receiver = self.id.0,
            "[{now}] packet sink received {bytes} bytes from {from} total Rx {} bytes",
            self.total_rx
        );
    }
}
