//! 点对点链路
//!
//! 一条链路连接两个设备，带宽与传播时延对两个方向相同；链路独占一个地址块。

use super::addr::Ipv4Block;
use super::id::{DeviceId, LinkId, NodeId};
use crate::sim::SimTime;

#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub nodes: [NodeId; 2],
    pub devices: [DeviceId; 2],
    pub bandwidth_bps: u64,
    pub delay: SimTime,
    pub block: Option<Ipv4Block>,
}

impl Link {
    /// 计算发送指定字节数所需的序列化时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128) * 8;
        let bps = self.bandwidth_bps as u128;
        let nanos = (bits * 1_000_000_000u128).div_ceil(bps);
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}
