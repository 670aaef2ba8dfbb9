//! 网络拓扑管理
//!
//! 持有节点、点对点链路与设备，负责地址分配、全局路由计算与逐跳转发。
//! 传输层（TCP）与应用层（发送端/接收端）状态也挂在这里，事件执行时统一通过
//! `NetWorld` 访问。

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};

use super::addr::{Interface, Ipv4Block};
use super::deliver_packet::DeliverPacket;
use super::device::Device;
use super::device_ready::DeviceReady;
use super::error::NetError;
use super::id::{DeviceId, LinkId, NodeId};
use super::link::Link;
use super::node::Node;
use super::packet::Packet;
use super::routing::RoutingTable;
use super::stats::Stats;
use super::transport::TcpSegment;
use crate::app::Applications;
use crate::proto::tcp::TcpStack;
use crate::queue::{DEFAULT_QUEUE_PKTS, DropTailQueue};
use crate::sim::{SimTime, Simulator};
use tracing::{debug, trace};

/// 网络拓扑
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    devices: Vec<Device>,
    /// (本端节点, 对端节点) -> 本端设备
    edges: HashMap<(NodeId, NodeId), DeviceId>,
    /// 已分配的接口地址 -> 所属节点
    addrs: HashMap<Ipv4Addr, NodeId>,
    routing: RoutingTable,
    queue_pkts: usize,
    next_pkt_id: u64,
    pub tcp: TcpStack,
    pub apps: Applications,
    pub stats: Stats,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_PKTS, 0)
    }
}

impl Network {
    /// `queue_pkts`：每个设备出队列的容量（包）；`seed`：等价路径选择的盐。
    pub fn new(queue_pkts: usize, seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            devices: Vec::new(),
            edges: HashMap::new(),
            addrs: HashMap::new(),
            routing: RoutingTable::new(seed),
            queue_pkts,
            next_pkt_id: 0,
            tcp: TcpStack::default(),
            apps: Applications::default(),
            stats: Stats::default(),
        }
    }

    /// 添加节点（尚未安装协议栈）
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, NetError> {
        self.nodes.get_mut(id.0).ok_or(NetError::UnknownNode(id))
    }

    /// 在节点上安装网络协议栈；分配地址前必须完成。
    pub fn install_stack(&mut self, id: NodeId) -> Result<(), NetError> {
        let node = self.node_mut(id)?;
        if node.has_stack() {
            return Err(NetError::StackAlreadyInstalled(id));
        }
        node.install_stack();
        trace!(node = ?id, "协议栈已安装");
        Ok(())
    }

    /// 用一条点对点链路连接两个节点（两端各建一个设备）。
    pub fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        bandwidth_bps: u64,
        delay: SimTime,
    ) -> Result<LinkId, NetError> {
        if a == b {
            return Err(NetError::SelfLoop(a));
        }
        self.node_mut(a)?;
        self.node_mut(b)?;

        let link_id = LinkId(self.links.len());
        let dev_a = self.add_device(a, b, link_id);
        let dev_b = self.add_device(b, a, link_id);
        self.links.push(Link {
            id: link_id,
            nodes: [a, b],
            devices: [dev_a, dev_b],
            bandwidth_bps,
            delay,
            block: None,
        });
        self.edges.insert((a, b), dev_a);
        self.edges.insert((b, a), dev_b);
        self.routing.invalidate();
        debug!(link = ?link_id, ?a, ?b, bandwidth_bps, delay = %delay, "链路已创建");
        Ok(link_id)
    }

    fn add_device(&mut self, node: NodeId, peer: NodeId, link: LinkId) -> DeviceId {
        let id = DeviceId(self.devices.len());
        self.devices.push(Device {
            id,
            node,
            link,
            peer,
            iface: None,
            queue: Box::new(DropTailQueue::new(self.queue_pkts)),
            busy: false,
            tx_pkts: 0,
            tx_bytes: 0,
        });
        self.nodes[node.0].attach(id);
        id
    }

    /// 从链路的地址块中为两端接口各分配一个地址：第一端 `.1`，第二端 `.2`。
    pub fn assign_addresses(
        &mut self,
        link_id: LinkId,
        block: Ipv4Block,
    ) -> Result<[Interface; 2], NetError> {
        let link = self
            .links
            .get(link_id.0)
            .ok_or(NetError::UnknownLink(link_id))?;
        if link.block.is_some() {
            return Err(NetError::AlreadyAddressed(link_id));
        }
        let nodes = link.nodes;
        let devices = link.devices;
        for n in nodes {
            if !self.nodes[n.0].has_stack() {
                return Err(NetError::NoStack(n));
            }
        }

        let mut ifaces = Vec::with_capacity(2);
        for (i, (node, device)) in nodes.into_iter().zip(devices).enumerate() {
            let addr = block
                .host(i as u32 + 1)
                .ok_or(NetError::BlockTooSmall(block))?;
            if self.addrs.contains_key(&addr) {
                return Err(NetError::DuplicateAddress(addr));
            }
            ifaces.push(Interface {
                node,
                device,
                addr,
                block,
            });
        }

        for iface in &ifaces {
            self.addrs.insert(iface.addr, iface.node);
            self.nodes[iface.node.0].add_addr(iface.addr);
            self.devices[iface.device.0].iface = Some(*iface);
        }
        self.links[link_id.0].block = Some(block);
        self.routing.invalidate();
        debug!(link = ?link_id, %block, "地址已分配");
        Ok([ifaces[0], ifaces[1]])
    }

    /// 地址所属节点
    pub fn addr_owner(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.addrs.get(&addr).copied()
    }

    /// 计算全局路由（所有节点/链路就绪之后调用一次）。
    pub fn compute_routes(&mut self) {
        let mut adj: Vec<Vec<NodeId>> = vec![Vec::new(); self.nodes.len()];
        for link in &self.links {
            let [a, b] = link.nodes;
            if self.nodes[a.0].has_stack() && self.nodes[b.0].has_stack() {
                adj[a.0].push(b);
                adj[b.0].push(a);
            }
        }
        self.routing.build(&adj, self.addrs.clone());
        debug!(nodes = self.nodes.len(), links = self.links.len(), "全局路由已计算");
    }

    pub fn routes_ready(&self) -> bool {
        self.routing.is_built()
    }

    /// 创建数据包
    pub fn make_packet(
        &mut self,
        flow_id: u64,
        size_bytes: u32,
        src: SocketAddrV4,
        dst: SocketAddrV4,
        segment: TcpSegment,
    ) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            flow_id,
            size_bytes,
            src,
            dst,
            segment,
            hops: 0,
        }
    }

    /// 包到达节点：目的地址属于本节点则交付本地协议栈，否则继续转发。
    pub fn deliver(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(node) = self.nodes.get(at.0) else {
            return;
        };
        if !node.has_stack() {
            self.drop_unroutable(at, pkt);
            return;
        }
        if node.owns(*pkt.dst.ip()) {
            self.on_delivered(at, pkt, sim);
        } else {
            self.forward_from(at, pkt, sim);
        }
    }

    /// 从指定节点按路由表把包送往下一跳设备队列
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(next) = self
            .routing
            .next_hop(from, *pkt.dst.ip(), pkt.flow_id)
        else {
            self.drop_unroutable(from, pkt);
            return;
        };
        let Some(&dev_id) = self.edges.get(&(from, next)) else {
            self.drop_unroutable(from, pkt);
            return;
        };

        trace!(pkt_id = pkt.id, ?from, ?next, device = ?dev_id, "转发到下一跳");
        let dev = &mut self.devices[dev_id.0];
        if let Err(pkt) = dev.queue.enqueue(pkt) {
            self.stats.dropped_pkts += 1;
            self.stats.dropped_bytes += pkt.size_bytes as u64;
            debug!(pkt_id = pkt.id, flow_id = pkt.flow_id, device = ?dev_id, "队列已满，丢包");
            return;
        }
        if !dev.busy {
            self.start_tx(dev_id, sim);
        }
    }

    fn drop_unroutable(&mut self, at: NodeId, pkt: Packet) {
        self.stats.unroutable_pkts += 1;
        debug!(pkt_id = pkt.id, ?at, dst = %pkt.dst, "无路由，丢包");
    }

    /// 设备空闲时取出队首包开始序列化：depart 时刻设备再次就绪，arrive 时刻包到达对端。
    fn start_tx(&mut self, dev_id: DeviceId, sim: &mut Simulator) {
        let dev = &mut self.devices[dev_id.0];
        let Some(pkt) = dev.queue.dequeue() else {
            dev.busy = false;
            return;
        };
        let link = &self.links[dev.link.0];
        let now = sim.now();
        let depart = now.saturating_add(link.tx_time(pkt.size_bytes));
        let arrive = depart.saturating_add(link.delay);

        dev.busy = true;
        dev.tx_pkts += 1;
        dev.tx_bytes += pkt.size_bytes as u64;
        let to = dev.peer;

        trace!(pkt_id = pkt.id, device = ?dev_id, depart = ?depart, arrive = ?arrive, "开始发送");
        sim.schedule(depart, DeviceReady { device: dev_id });
        sim.schedule(
            arrive,
            DeliverPacket {
                to,
                pkt: pkt.advance(),
            },
        );
    }

    /// 设备完成一次序列化后调用：继续发送队列中的下一个包。
    pub(crate) fn on_device_ready(&mut self, dev_id: DeviceId, sim: &mut Simulator) {
        let dev = &mut self.devices[dev_id.0];
        dev.busy = false;
        if !dev.queue.is_empty() {
            self.start_tx(dev_id, sim);
        }
    }
}
