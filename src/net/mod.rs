//! 网络模拟模块
//!
//! 节点、点对点链路与设备、地址分配、全局路由和数据包转发。

mod addr;
mod deliver_packet;
mod device;
mod device_ready;
mod error;
mod id;
mod link;
mod net_world;
mod network;
mod network_proto;
mod node;
mod packet;
mod routing;
mod stats;
mod transport;

pub use addr::{AddressError, AddressHelper, Interface, Ipv4Block};
pub use deliver_packet::DeliverPacket;
pub use device::Device;
pub use device_ready::DeviceReady;
pub use error::NetError;
pub use id::{DeviceId, LinkId, NodeId};
pub use link::Link;
pub use net_world::NetWorld;
pub use network::Network;
pub use node::Node;
pub use packet::Packet;
pub use routing::RoutingTable;
pub use stats::Stats;
pub use transport::TcpSegment;
