use std::net::{Ipv4Addr, SocketAddrV4};

use crate::net::{Packet, TcpSegment};
use crate::queue::{DEFAULT_QUEUE_PKTS, DropTailQueue, PacketQueue};

fn pkt(id: u64, size_bytes: u32) -> Packet {
    Packet {
        id,
        flow_id: 0,
        size_bytes,
        src: SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 2), 49153),
        dst: SocketAddrV4::new(Ipv4Addr::new(10, 2, 1, 2), 50000),
        segment: TcpSegment::Data { seq: 0, len: 536 },
        hops: 0,
    }
}

#[test]
fn droptail_queue_counts_packets_not_bytes() {
    let mut q = DropTailQueue::new(2);
    assert_eq!(q.capacity_pkts(), 2);
    assert!(q.is_empty());

    assert!(q.enqueue(pkt(1, 578)).is_ok());
    assert!(q.enqueue(pkt(2, 42)).is_ok());
    assert_eq!(q.len(), 2);
    assert_eq!(q.bytes(), 620);

    let dropped = q.enqueue(pkt(3, 42)).expect_err("queue is full");
    assert_eq!(dropped.id, 3);
    assert_eq!(q.len(), 2);
}

#[test]
fn droptail_queue_is_fifo_and_frees_space_on_dequeue() {
    let mut q = DropTailQueue::new(1);
    assert!(q.enqueue(pkt(1, 100)).is_ok());
    assert!(q.enqueue(pkt(2, 100)).is_err());

    assert_eq!(q.dequeue().expect("pkt").id, 1);
    assert_eq!(q.bytes(), 0);
    assert!(q.enqueue(pkt(3, 100)).is_ok());
    assert_eq!(q.dequeue().expect("pkt").id, 3);
    assert!(q.dequeue().is_none());
}

#[test]
fn default_queue_holds_one_hundred_packets() {
    let mut q = DropTailQueue::new(DEFAULT_QUEUE_PKTS);
    for i in 0..100 {
        assert!(q.enqueue(pkt(i, 578)).is_ok());
    }
    assert!(q.enqueue(pkt(100, 578)).is_err());
}
