//! 批量发送应用：连接建立后尽可能快地发送，直到字节上限（0 表示不设上限）或仿真停止。

use std::net::SocketAddrV4;

use tracing::{info, warn};

use super::{ConnEvent, GeneratorId};
use crate::net::NodeId;
use crate::proto::tcp::TcpConnId;
use crate::sim::SimTime;

#[derive(Debug)]
pub struct BulkSend {
    id: GeneratorId,
    node: NodeId,
    remote: SocketAddrV4,
    max_bytes: u64,
    started_at: Option<SimTime>,
    conn: Option<TcpConnId>,
    last_event: Option<ConnEvent>,
}

impl BulkSend {
    pub(crate) fn new(id: GeneratorId, node: NodeId, remote: SocketAddrV4, max_bytes: u64) -> Self {
        Self {
            id,
            node,
            remote,
            max_bytes,
            started_at: None,
            conn: None,
            last_event: None,
        }
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn remote(&self) -> SocketAddrV4 {
        self.remote
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// 连接层面的字节上限
    pub fn limit(&self) -> Option<u64> {
        (self.max_bytes > 0).then_some(self.max_bytes)
    }

    pub fn started_at(&self) -> Option<SimTime> {
        self.started_at
    }

    pub fn conn(&self) -> Option<TcpConnId> {
        self.conn
    }

    pub fn last_event(&self) -> Option<ConnEvent> {
        self.last_event
    }

    pub(crate) fn on_start(&mut self, now: SimTime) {
        self.started_at = Some(now);
        info!(generator = self.id.0, remote = %self.remote, max_bytes = self.max_bytes, "[{now}] bulk send started");
    }

    pub(crate) fn attach(&mut self, conn: TcpConnId) {
        self.conn = Some(conn);
    }

    pub(crate) fn on_conn_event(&mut self, ev: ConnEvent, now: SimTime) {
        self.last_event = Some(ev);
        match ev {
            ConnEvent::Connected => {
                info!(generator = self.id.0, remote = %self.remote, "[{now}] connection succeeded")
            }
            ConnEvent::Completed => {
                info!(generator = self.id.0, bytes = self.max_bytes, "[{now}] all data acknowledged")
            }
            ConnEvent::Refused => {
                warn!(generator = self.id.0, remote = %self.remote, "[{now}] connection refused")
            }
            ConnEvent::Failed => {
                warn!(generator = self.id.0, remote = %self.remote, "[{now}] connection failed")
            }
        }
    }
}
