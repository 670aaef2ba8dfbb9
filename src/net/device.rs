//! 网络设备（点对点接口）
//!
//! 每个设备有自己的出队列与发送状态：队列非空且设备空闲时开始序列化下一个包。

use super::addr::Interface;
use super::id::{DeviceId, LinkId, NodeId};
use crate::queue::PacketQueue;

#[derive(Debug)]
pub struct Device {
    pub id: DeviceId,
    pub node: NodeId,
    pub link: LinkId,
    /// 链路对端节点
    pub peer: NodeId,
    pub iface: Option<Interface>,
    pub queue: Box<dyn PacketQueue>,
    /// 正在序列化一个包
    pub busy: bool,
    pub tx_pkts: u64,
    pub tx_bytes: u64,
}
