//! 数据包类型

use std::net::SocketAddrV4;

use super::transport::TcpSegment;

/// 网络数据包：按目的地址逐跳查路由转发，不预先携带路径。
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    /// 所属连接（仅用于日志与 ECMP 选路的稳定 key）
    pub flow_id: u64,
    /// 线路上的总字节数（载荷 + 各层头部）
    pub size_bytes: u32,
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub segment: TcpSegment,
    /// 已经过的跳数
    pub hops: u32,
}

impl Packet {
    /// 前进一跳
    pub fn advance(mut self) -> Self {
        self.hops = self.hops.saturating_add(1);
        self
    }
}
