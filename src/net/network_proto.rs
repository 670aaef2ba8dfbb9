//! Protocol dispatch hooks for the network.

use crate::sim::Simulator;
use tracing::trace;

use super::{Network, NodeId, Packet};

impl Network {
    /// 包到达目的节点：更新统计并交给 TCP 处理。
    pub(crate) fn on_delivered(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        trace!(pkt_id = pkt.id, flow_id = pkt.flow_id, ?at, hops = pkt.hops, "送达目的节点");

        // 规避同时借用 `self` 与 `self.tcp`
        let mut tcp = std::mem::take(&mut self.tcp);
        tcp.on_packet(at, pkt, sim, self);
        self.tcp = tcp;
    }
}
