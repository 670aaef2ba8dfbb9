use std::net::SocketAddrV4;

use crate::app::{ConnEvent, Endpoint, GeneratorId, ReceiverId, StartApplication};
use crate::net::{Ipv4Block, NetWorld, Network, NodeId};
use crate::proto::congestion::{
    CongestionAlgorithm, CongestionOption, SocketType, WestwoodFilter, WestwoodProtocol,
};
use crate::proto::tcp::{TcpSender, TcpState};
use crate::sim::{SimTime, Simulator};

const PORT: u16 = 50000;

struct Pair {
    sim: Simulator,
    world: NetWorld,
    a: NodeId,
    b: NodeId,
    b_addr: std::net::Ipv4Addr,
}

/// a <-> b 一条链路，两端都已安装协议栈、分配地址并计算路由
fn pair(queue_pkts: usize, bandwidth_bps: u64, delay: SimTime) -> Pair {
    let mut world = NetWorld::new(Network::new(queue_pkts, 1));
    let a = world.net.add_node("a");
    let b = world.net.add_node("b");
    world.net.install_stack(a).expect("stack a");
    world.net.install_stack(b).expect("stack b");
    let link = world
        .net
        .connect(a, b, bandwidth_bps, delay)
        .expect("connect");
    let [_, ib] = world
        .net
        .assign_addresses(link, Ipv4Block::slash24(10, 1, 1))
        .expect("addresses");
    world.net.compute_routes();
    Pair {
        sim: Simulator::default(),
        world,
        a,
        b,
        b_addr: ib.addr,
    }
}

impl Pair {
    fn receiver(&mut self, port: u16, at: SimTime) -> ReceiverId {
        let r = self.world.net.apps.add_receiver(self.b, port);
        self.sim.schedule(
            at,
            StartApplication {
                endpoint: Endpoint::Receiver(r),
            },
        );
        r
    }

    fn generator(&mut self, port: u16, max_bytes: u64, at: SimTime) -> GeneratorId {
        let remote = SocketAddrV4::new(self.b_addr, port);
        let g = self.world.net.apps.add_generator(self.a, remote, max_bytes);
        self.sim.schedule(
            at,
            StartApplication {
                endpoint: Endpoint::Generator(g),
            },
        );
        g
    }

    fn sender(&self, g: GeneratorId) -> &TcpSender {
        let conn = self
            .world
            .net
            .apps
            .generator(g)
            .and_then(|g| g.conn())
            .expect("generator started");
        self.world.net.tcp.conn(conn).expect("tcp conn")
    }

    fn rx(&self, r: ReceiverId) -> u64 {
        self.world.net.apps.receiver(r).expect("receiver").total_rx()
    }
}

#[test]
fn bounded_transfer_completes_and_counts_every_byte() {
    let mut p = pair(100, 10_000_000, SimTime::from_millis(1));
    let r = p.receiver(PORT, SimTime::ZERO);
    let g = p.generator(PORT, 100_000, SimTime::from_millis(1));

    p.sim.run(&mut p.world);

    assert_eq!(p.rx(r), 100_000);
    let s = p.sender(g);
    assert_eq!(s.state(), TcpState::Done);
    assert_eq!(s.bytes_acked(), 100_000);
    assert_eq!(s.retransmits(), 0);
    assert_eq!(
        p.world.net.apps.generator(g).expect("gen").last_event(),
        Some(ConnEvent::Completed)
    );
    assert_eq!(
        p.world.net.apps.generator(g).expect("gen").started_at(),
        Some(SimTime::from_millis(1))
    );
    let sink = p.world.net.apps.receiver(r).expect("receiver");
    assert!(sink.is_listening());
    assert_eq!(sink.started_at(), Some(SimTime::ZERO));
    assert_eq!(sink.accepted(), 1);
    let first = sink.first_rx().expect("first rx");
    assert!(first > SimTime::from_millis(1));
    assert!(sink.last_rx().expect("last rx") > first);
    assert_eq!(p.world.net.stats.dropped_pkts, 0);
}

#[test]
fn connection_to_a_port_without_listener_is_refused() {
    let mut p = pair(100, 10_000_000, SimTime::from_millis(1));
    let r = p.receiver(PORT, SimTime::ZERO);
    let g = p.generator(PORT + 1, 10_000, SimTime::from_millis(1));

    p.sim.run(&mut p.world);

    assert_eq!(p.sender(g).state(), TcpState::Refused);
    assert_eq!(
        p.world.net.apps.generator(g).expect("gen").last_event(),
        Some(ConnEvent::Refused)
    );
    assert_eq!(p.rx(r), 0);
}

#[test]
fn syn_arriving_before_the_listener_starts_is_refused() {
    let mut p = pair(100, 10_000_000, SimTime::from_millis(1));
    let g = p.generator(PORT, 10_000, SimTime::ZERO);
    let r = p.receiver(PORT, SimTime::from_millis(100));

    p.sim.run(&mut p.world);

    assert_eq!(p.sender(g).state(), TcpState::Refused);
    assert_eq!(p.rx(r), 0);
}

#[test]
fn losses_at_a_small_queue_are_recovered() {
    let mut p = pair(2, 1_000_000, SimTime::from_millis(5));
    let r = p.receiver(PORT, SimTime::ZERO);
    let g = p.generator(PORT, 50_000, SimTime::from_millis(1));

    p.sim.run(&mut p.world);

    assert!(p.world.net.stats.dropped_pkts > 0, "expected drops at the queue");
    let s = p.sender(g);
    assert!(s.retransmits() > 0);
    assert_eq!(s.state(), TcpState::Done);
    assert_eq!(p.rx(r), 50_000);
}

#[test]
fn unlimited_sender_stops_with_the_clock() {
    let mut p = pair(100, 1_000_000, SimTime::from_millis(5));
    let r = p.receiver(PORT, SimTime::ZERO);
    let g = p.generator(PORT, 0, SimTime::from_millis(1));

    p.sim.run_until(SimTime::from_secs(2), &mut p.world);

    assert_eq!(p.sender(g).state(), TcpState::Established);
    let rx = p.rx(r);
    // 1 Mbps 的链路两秒内最多承载 250 kB
    assert!(rx > 50_000, "rx = {rx}");
    assert!(rx <= 250_000, "rx = {rx}");
    assert!(p.sim.pending() > 0);
}

#[test]
fn sockets_take_the_configured_congestion_control() {
    let mut p = pair(100, 10_000_000, SimTime::from_millis(1));
    p.world.net.tcp.set_socket_type(SocketType::new(
        CongestionAlgorithm::Westwood,
        &[
            CongestionOption::ProtocolType(WestwoodProtocol::WestwoodPlus),
            CongestionOption::FilterType(WestwoodFilter::Tustin),
        ],
    ));
    p.receiver(PORT, SimTime::ZERO);
    let g = p.generator(PORT, 20_000, SimTime::from_millis(1));

    p.sim.run(&mut p.world);

    let s = p.sender(g);
    assert_eq!(s.congestion_name(), "WestwoodPlus");
    assert_eq!(s.socket_type().algorithm, CongestionAlgorithm::Westwood);
    assert_eq!(s.state(), TcpState::Done);
}
