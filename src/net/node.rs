//! 节点：可寻址的仿真主机。hub 与 spoke 都是同一种节点，转发与本地交付由地址决定。

use std::net::Ipv4Addr;

use super::id::{DeviceId, NodeId};

#[derive(Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    stack_installed: bool,
    devices: Vec<DeviceId>,
    addrs: Vec<Ipv4Addr>,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            stack_installed: false,
            devices: Vec::new(),
            addrs: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_stack(&self) -> bool {
        self.stack_installed
    }

    pub(crate) fn install_stack(&mut self) {
        self.stack_installed = true;
    }

    /// 挂在该节点上的设备（度数 = 设备数）
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub(crate) fn attach(&mut self, dev: DeviceId) {
        self.devices.push(dev);
    }

    /// 已分配的接口地址
    pub fn addrs(&self) -> &[Ipv4Addr] {
        &self.addrs
    }

    pub(crate) fn add_addr(&mut self, addr: Ipv4Addr) {
        self.addrs.push(addr);
    }

    pub fn owns(&self, addr: Ipv4Addr) -> bool {
        self.addrs.contains(&addr)
    }
}
