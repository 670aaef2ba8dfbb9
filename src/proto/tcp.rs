//! TCP（简化版）协议实现
//!
//! 支持一个批量传输实验所需的功能：
//! - SYN / SYN-ACK 握手；目的端口没有监听者时回 RST（连接被拒绝）
//! - 数据段 / 累计 ACK，接收端缓存乱序段
//! - 可插拔拥塞控制（见 `congestion`），3 dupACK 快速重传 + NewReno 快速恢复
//! - RFC 6298 RTO（Karn 规则、指数退避），超时后 go-back-N
//!
//! 注意：这是仿真用途的“极简 TCP”，不实现窗口通告/选择确认/FIN 关闭等。

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, SocketAddrV4};

use tracing::{debug, trace, warn};

use super::congestion::{CongestionOps, SocketType, Window};
use crate::app::{ConnEvent, GeneratorId, ReceiverId};
use crate::net::{NetWorld, Network, NodeId, Packet, TcpSegment};
use crate::sim::{Event, SimTime, Simulator, World};

/// 一个 TCP 连接的唯一标识（同时作为 packet 的 `flow_id`）。
pub type TcpConnId = u64;

/// 第一个临时端口
const EPHEMERAL_PORT_BASE: u16 = 49153;

#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// MSS（数据段载荷大小，字节）
    pub mss: u32,
    /// TCP/IP 头部 + 点对点链路头部（字节）；ACK/SYN 只有头部
    pub header_bytes: u32,
    /// 初始 cwnd（MSS 个数）
    pub init_cwnd_segments: u64,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u64,
    /// 初始 RTO
    pub init_rto: SimTime,
    pub min_rto: SimTime,
    /// 最大 RTO（用于退避上限）
    pub max_rto: SimTime,
    /// SYN 最多重传次数
    pub syn_retries: u32,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            mss: 536,
            header_bytes: 42,
            init_cwnd_segments: 10,
            init_ssthresh_bytes: u32::MAX as u64,
            init_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_secs(1),
            max_rto: SimTime::from_secs(60),
            syn_retries: 6,
        }
    }
}

/// 发送端连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    SynSent,
    Established,
    /// 所有数据都已被确认（仅限有字节上限的连接）
    Done,
    /// 对端回 RST
    Refused,
    /// SYN 重传次数耗尽，或本端没有可用地址
    Failed,
}

#[derive(Debug, Clone)]
struct SentSeg {
    len: u32,
    sent_at: SimTime,
    retrans: bool,
}

/// RFC 6298 重传超时估计
#[derive(Debug, Clone)]
struct RttEstimator {
    srtt: Option<u64>,
    rttvar: u64,
    rto: u64,
    min_rto: u64,
    max_rto: u64,
}

impl RttEstimator {
    fn new(cfg: &TcpConfig) -> Self {
        Self {
            srtt: None,
            rttvar: 0,
            rto: cfg.init_rto.0,
            min_rto: cfg.min_rto.0,
            max_rto: cfg.max_rto.0,
        }
    }

    fn sample(&mut self, rtt: SimTime) {
        let r = rtt.0;
        match self.srtt {
            None => {
                self.srtt = Some(r);
                self.rttvar = r / 2;
            }
            Some(srtt) => {
                self.rttvar = (3 * self.rttvar + srtt.abs_diff(r)) / 4;
                self.srtt = Some((7 * srtt + r) / 8);
            }
        }
        let srtt = self.srtt.unwrap_or(r);
        self.rto = srtt
            .saturating_add(4 * self.rttvar)
            .clamp(self.min_rto, self.max_rto);
    }

    fn backoff(&mut self) {
        self.rto = self.rto.saturating_mul(2).min(self.max_rto);
    }

    fn rto(&self) -> SimTime {
        SimTime(self.rto)
    }
}

/// 发送端 socket（批量发送应用持有）
#[derive(Debug)]
pub struct TcpSender {
    pub id: TcpConnId,
    pub node: NodeId,
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub app: GeneratorId,
    /// None 表示不设上限
    pub limit: Option<u64>,
    socket_type: SocketType,
    cc: Box<dyn CongestionOps>,
    state: TcpState,
    window: Window,

    snd_una: u64,
    snd_nxt: u64,
    /// 曾经发送过的最高序号；低于它的段都是重传
    high_tx: u64,
    dup_acks: u32,
    /// 快速恢复的退出点
    recover: Option<u64>,
    inflight: BTreeMap<u64, SentSeg>,
    rtt: RttEstimator,
    timer_gen: u64,
    timer_armed: bool,
    syn_attempts: u32,
    retransmits: u64,
}

impl TcpSender {
    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn socket_type(&self) -> &SocketType {
        &self.socket_type
    }

    pub fn congestion_name(&self) -> &'static str {
        self.cc.name()
    }

    pub fn cwnd(&self) -> u64 {
        self.window.cwnd
    }

    pub fn ssthresh(&self) -> u64 {
        self.window.ssthresh
    }

    pub fn bytes_acked(&self) -> u64 {
        self.snd_una
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    fn bytes_in_flight(&self) -> u64 {
        self.snd_nxt - self.snd_una
    }

    fn send(&self, seg: TcpSegment, header_bytes: u32, sim: &mut Simulator, net: &mut Network) {
        let size = header_bytes.saturating_add(seg.payload_len());
        let pkt = net.make_packet(self.id, size, self.local, self.remote, seg);
        net.forward_from(self.node, pkt, sim);
    }

    fn arm_timer(&mut self, sim: &mut Simulator) {
        self.timer_gen = self.timer_gen.wrapping_add(1);
        self.timer_armed = true;
        sim.schedule_in(
            self.rtt.rto(),
            TcpTimer {
                conn_id: self.id,
                generation: self.timer_gen,
            },
        );
    }

    fn cancel_timer(&mut self) {
        self.timer_gen = self.timer_gen.wrapping_add(1);
        self.timer_armed = false;
    }

    /// 在 cwnd 允许的范围内发送新数据
    fn try_send(&mut self, cfg: &TcpConfig, sim: &mut Simulator, net: &mut Network) {
        if self.state != TcpState::Established {
            return;
        }
        let limit = self.limit.unwrap_or(u64::MAX);
        let mss = cfg.mss as u64;
        while self.snd_nxt < limit {
            let len = mss.min(limit - self.snd_nxt);
            if self.bytes_in_flight() + len > self.window.cwnd {
                break;
            }
            let seq = self.snd_nxt;
            let len = len as u32;
            let retrans = seq < self.high_tx;
            if retrans {
                self.retransmits += 1;
            }
            self.snd_nxt += len as u64;
            self.high_tx = self.high_tx.max(self.snd_nxt);
            self.inflight.insert(
                seq,
                SentSeg {
                    len,
                    sent_at: sim.now(),
                    retrans,
                },
            );
            self.send(TcpSegment::Data { seq, len }, cfg.header_bytes, sim, net);
        }
        if !self.inflight.is_empty() && !self.timer_armed {
            self.arm_timer(sim);
        }
    }

    /// 重传最早未确认段
    fn retransmit_first(&mut self, cfg: &TcpConfig, sim: &mut Simulator, net: &mut Network) {
        let now = sim.now();
        let Some((&seq, sent)) = self.inflight.iter_mut().next() else {
            return;
        };
        sent.retrans = true;
        sent.sent_at = now;
        let len = sent.len;
        self.retransmits += 1;
        trace!(conn_id = self.id, seq, "快速重传");
        self.send(TcpSegment::Data { seq, len }, cfg.header_bytes, sim, net);
    }

    fn on_ack(&mut self, ack: u64, cfg: &TcpConfig, sim: &mut Simulator, net: &mut Network) {
        if self.state != TcpState::Established || ack > self.high_tx {
            return;
        }
        // go-back-N 之后，对端可能已经收到了 snd_nxt 之后的数据
        if ack > self.snd_nxt {
            self.snd_nxt = ack;
        }
        let mss = cfg.mss as u64;

        if ack > self.snd_una {
            let acked = ack - self.snd_una;

            // Karn：只用从未重传过的段采样 RTT
            let mut rtt_sample = None;
            while let Some(entry) = self.inflight.first_entry() {
                let end = *entry.key() + entry.get().len as u64;
                if end > ack {
                    break;
                }
                let sent = entry.remove();
                if !sent.retrans {
                    rtt_sample = Some(sim.now().saturating_sub(sent.sent_at));
                }
            }
            if let Some(r) = rtt_sample {
                self.rtt.sample(r);
            }
            self.snd_una = ack;
            self.cc.pkts_acked(&self.window, acked, rtt_sample, sim.now());

            match self.recover {
                Some(recover) if ack >= recover => {
                    // 完整 ACK：退出快速恢复，窗口收缩回 ssthresh
                    self.recover = None;
                    self.dup_acks = 0;
                    self.window.cwnd = self.window.ssthresh;
                }
                Some(_) => {
                    // 部分 ACK：立即重传下一个空洞
                    self.window.cwnd = self.window.cwnd.saturating_sub(acked).saturating_add(mss);
                    self.retransmit_first(cfg, sim, net);
                }
                None => {
                    self.dup_acks = 0;
                    self.cc.increase_window(&mut self.window, acked);
                }
            }

            if self.inflight.is_empty() {
                self.cancel_timer();
            } else {
                self.arm_timer(sim);
            }

            if self.limit.is_some_and(|limit| self.snd_una >= limit) {
                self.state = TcpState::Done;
                self.cancel_timer();
                net.apps.on_conn_event(self.app, ConnEvent::Completed, sim.now());
                return;
            }
            self.try_send(cfg, sim, net);
        } else if ack == self.snd_una && !self.inflight.is_empty() {
            self.dup_acks += 1;
            if self.recover.is_none() && self.dup_acks == 3 {
                let flight = self.bytes_in_flight();
                self.window.ssthresh = self.cc.ssthresh(&self.window, flight);
                self.window.cwnd = self.window.ssthresh.saturating_add(3 * mss);
                self.recover = Some(self.snd_nxt);
                debug!(
                    conn_id = self.id,
                    ssthresh = self.window.ssthresh,
                    cwnd = self.window.cwnd,
                    "3 dupACK，进入快速恢复"
                );
                self.retransmit_first(cfg, sim, net);
            } else if self.recover.is_some() {
                // 快速恢复：每个额外 dupACK 增加 cwnd 一个 MSS
                self.window.cwnd = self.window.cwnd.saturating_add(mss);
                self.try_send(cfg, sim, net);
            }
        }
    }

    fn on_timeout(&mut self, cfg: &TcpConfig, sim: &mut Simulator, net: &mut Network) {
        self.timer_armed = false;
        match self.state {
            TcpState::SynSent => {
                self.syn_attempts += 1;
                if self.syn_attempts > cfg.syn_retries {
                    self.state = TcpState::Failed;
                    net.apps.on_conn_event(self.app, ConnEvent::Failed, sim.now());
                    return;
                }
                self.rtt.backoff();
                self.send(TcpSegment::Syn, cfg.header_bytes, sim, net);
                self.arm_timer(sim);
            }
            TcpState::Established => {
                if self.inflight.is_empty() {
                    return;
                }
                let flight = self.bytes_in_flight();
                self.window.ssthresh = self.cc.ssthresh(&self.window, flight);
                self.window.cwnd = cfg.mss as u64;
                self.recover = None;
                self.dup_acks = 0;
                self.rtt.backoff();
                debug!(conn_id = self.id, seq = self.snd_una, rto = %self.rtt.rto(), "RTO 超时，回到慢启动");

                // go-back-N：从 snd_una 开始重发
                self.inflight.clear();
                self.snd_nxt = self.snd_una;
                self.try_send(cfg, sim, net);
            }
            TcpState::Done | TcpState::Refused | TcpState::Failed => {}
        }
    }
}

/// 接收端已接受的连接
#[derive(Debug)]
struct TcpReceiver {
    flow_id: TcpConnId,
    sink: ReceiverId,
    rcv_nxt: u64,
    /// 乱序段：seq -> len
    ooo: BTreeMap<u64, u32>,
}

impl TcpReceiver {
    /// 返回本次新增的按序字节数
    fn on_data(&mut self, seq: u64, len: u32) -> u64 {
        if seq > self.rcv_nxt {
            self.ooo.entry(seq).or_insert(len);
            return 0;
        }
        let end = seq + len as u64;
        if end <= self.rcv_nxt {
            return 0;
        }
        let mut delivered = end - self.rcv_nxt;
        self.rcv_nxt = end;
        while let Some((&s, &l)) = self.ooo.first_key_value() {
            if s > self.rcv_nxt {
                break;
            }
            self.ooo.pop_first();
            let e = s + l as u64;
            if e > self.rcv_nxt {
                delivered += e - self.rcv_nxt;
                self.rcv_nxt = e;
            }
        }
        delivered
    }
}

/// 整个网络共享的 TCP 层：发送端连接、监听端口与已接受连接。
#[derive(Debug, Default)]
pub struct TcpStack {
    cfg: TcpConfig,
    socket_type: SocketType,
    conns: HashMap<TcpConnId, TcpSender>,
    /// (本端, 对端) -> 发送端连接
    by_tuple: HashMap<(SocketAddrV4, SocketAddrV4), TcpConnId>,
    /// (本端, 对端) -> 接收端连接
    accepted: HashMap<(SocketAddrV4, SocketAddrV4), TcpReceiver>,
    listeners: HashMap<(NodeId, u16), ReceiverId>,
    next_port: HashMap<NodeId, u16>,
    next_conn: TcpConnId,
}

impl TcpStack {
    pub fn config(&self) -> &TcpConfig {
        &self.cfg
    }

    pub fn set_config(&mut self, cfg: TcpConfig) {
        self.cfg = cfg;
    }

    /// 之后创建的所有 socket 都使用这个拥塞控制类型
    pub fn set_socket_type(&mut self, socket_type: SocketType) {
        self.socket_type = socket_type;
    }

    pub fn socket_type(&self) -> &SocketType {
        &self.socket_type
    }

    pub fn conn(&self, id: TcpConnId) -> Option<&TcpSender> {
        self.conns.get(&id)
    }

    pub fn conn_count(&self) -> usize {
        self.conns.len()
    }

    /// 在节点的端口上监听（任意本地地址）。端口已被占用时返回 false。
    pub fn listen(&mut self, node: NodeId, port: u16, sink: ReceiverId) -> bool {
        if self.listeners.contains_key(&(node, port)) {
            return false;
        }
        self.listeners.insert((node, port), sink);
        true
    }

    fn ephemeral_port(&mut self, node: NodeId) -> u16 {
        let port = self.next_port.entry(node).or_insert(EPHEMERAL_PORT_BASE);
        let p = *port;
        *port = port.checked_add(1).unwrap_or(EPHEMERAL_PORT_BASE);
        p
    }

    /// 从节点向 `remote` 发起连接：立即发送 SYN。
    pub fn connect(
        &mut self,
        node: NodeId,
        remote: SocketAddrV4,
        limit: Option<u64>,
        app: GeneratorId,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> TcpConnId {
        let id = self.next_conn;
        self.next_conn += 1;

        let local_ip = net
            .node(node)
            .and_then(|n| n.addrs().first().copied());
        let port = self.ephemeral_port(node);
        let mss = self.cfg.mss as u64;
        let mut conn = TcpSender {
            id,
            node,
            local: SocketAddrV4::new(local_ip.unwrap_or(Ipv4Addr::UNSPECIFIED), port),
            remote,
            app,
            limit,
            socket_type: self.socket_type.clone(),
            cc: self.socket_type.make_ops(),
            state: TcpState::SynSent,
            window: Window {
                cwnd: self.cfg.init_cwnd_segments.max(1).saturating_mul(mss),
                ssthresh: self.cfg.init_ssthresh_bytes.max(2 * mss),
                mss,
            },
            snd_una: 0,
            snd_nxt: 0,
            high_tx: 0,
            dup_acks: 0,
            recover: None,
            inflight: BTreeMap::new(),
            rtt: RttEstimator::new(&self.cfg),
            timer_gen: 0,
            timer_armed: false,
            syn_attempts: 0,
            retransmits: 0,
        };

        if local_ip.is_none() {
            warn!(conn_id = id, ?node, "节点没有接口地址，无法建立连接");
            conn.state = TcpState::Failed;
            net.apps.on_conn_event(app, ConnEvent::Failed, sim.now());
        } else {
            debug!(conn_id = id, local = %conn.local, %remote, cc = conn.cc.name(), "发送 SYN");
            conn.send(TcpSegment::Syn, self.cfg.header_bytes, sim, net);
            conn.arm_timer(sim);
        }

        self.by_tuple.insert((conn.local, remote), id);
        self.conns.insert(id, conn);
        id
    }

    /// 目的节点收到 TCP 段
    pub fn on_packet(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        let local = pkt.dst;
        let remote = pkt.src;
        let hdr = self.cfg.header_bytes;
        match pkt.segment {
            TcpSegment::Syn => {
                let reply = match self.listeners.get(&(at, local.port())) {
                    Some(&sink) => {
                        // 重传的 SYN 不会重复接受
                        if let Entry::Vacant(e) = self.accepted.entry((local, remote)) {
                            e.insert(TcpReceiver {
                                flow_id: pkt.flow_id,
                                sink,
                                rcv_nxt: 0,
                                ooo: BTreeMap::new(),
                            });
                            net.apps.on_accept(sink, remote, sim.now());
                        }
                        TcpSegment::SynAck
                    }
                    None => {
                        debug!(%local, %remote, "端口没有监听者，回 RST");
                        TcpSegment::Rst
                    }
                };
                let pkt = net.make_packet(pkt.flow_id, hdr, local, remote, reply);
                net.forward_from(at, pkt, sim);
            }
            TcpSegment::Data { seq, len } => {
                let Some(rx) = self.accepted.get_mut(&(local, remote)) else {
                    trace!(%local, %remote, "未知连接的数据段，忽略");
                    return;
                };
                let delivered = rx.on_data(seq, len);
                if delivered > 0 {
                    net.apps.on_sink_rx(rx.sink, delivered, remote, sim.now());
                }
                let ack = TcpSegment::Ack { ack: rx.rcv_nxt };
                let pkt = net.make_packet(rx.flow_id, hdr, local, remote, ack);
                net.forward_from(at, pkt, sim);
            }
            TcpSegment::SynAck | TcpSegment::Rst | TcpSegment::Ack { .. } => {
                let Some(&id) = self.by_tuple.get(&(local, remote)) else {
                    return;
                };
                let cfg = self.cfg.clone();
                let Some(conn) = self.conns.get_mut(&id) else {
                    return;
                };
                match pkt.segment {
                    TcpSegment::SynAck if conn.state == TcpState::SynSent => {
                        conn.state = TcpState::Established;
                        conn.cancel_timer();
                        net.apps.on_conn_event(conn.app, ConnEvent::Connected, sim.now());
                        conn.try_send(&cfg, sim, net);
                    }
                    TcpSegment::Rst if conn.state == TcpState::SynSent => {
                        conn.state = TcpState::Refused;
                        conn.cancel_timer();
                        net.apps.on_conn_event(conn.app, ConnEvent::Refused, sim.now());
                    }
                    TcpSegment::Ack { ack } => conn.on_ack(ack, &cfg, sim, net),
                    _ => {}
                }
            }
        }
    }

    fn on_timer(
        &mut self,
        conn_id: TcpConnId,
        generation: u64,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let cfg = self.cfg.clone();
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        // 过期的定时器（已被重新设置或取消）
        if conn.timer_gen != generation || !conn.timer_armed {
            return;
        }
        conn.on_timeout(&cfg, sim, net);
    }
}

/// 重传定时器事件：只有代数与连接当前代数一致时才生效
#[derive(Debug)]
pub struct TcpTimer {
    pub conn_id: TcpConnId,
    pub generation: u64,
}

impl Event for TcpTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpTimer {
            conn_id,
            generation,
        } = *self;
        let net = NetWorld::net_mut(world);
        // 规避同时借用 `net` 与 `net.tcp`
        let mut tcp = std::mem::take(&mut net.tcp);
        tcp.on_timer(conn_id, generation, sim, net);
        net.tcp = tcp;
    }
}
