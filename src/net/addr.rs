//! IPv4 地址块与接口地址分配
//!
//! 每条点对点链路独占一个地址块（默认 /24），链路两端各分得块内一个地址。
//! `AddressHelper` 按块顺序发放地址块，并保证整个拓扑内不会重复发放同一块。

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;
use thiserror::Error;

use super::id::{DeviceId, NodeId};

/// IPv4 地址块（网络地址 + 前缀长度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Ipv4Block {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Block {
    /// 构造地址块；主机位会被清零。前缀长度超过 30 时没有可用的点对点地址对，会被截到 30。
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        let prefix_len = prefix_len.min(30);
        let network = Ipv4Addr::from(u32::from(addr) & Self::mask_bits(prefix_len));
        Self {
            network,
            prefix_len,
        }
    }

    /// `a.b.c.0/24`
    pub const fn slash24(a: u8, b: u8, c: u8) -> Self {
        Self {
            network: Ipv4Addr::new(a, b, c, 0),
            prefix_len: 24,
        }
    }

    fn mask_bits(prefix_len: u8) -> u32 {
        if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_len as u32)
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn mask(&self) -> Ipv4Addr {
        Ipv4Addr::from(Self::mask_bits(self.prefix_len))
    }

    fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_len as u32)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & Self::mask_bits(self.prefix_len) == u32::from(self.network)
    }

    /// 块内第 `n` 个主机地址（从 1 开始；不含网络地址与广播地址）。
    pub fn host(&self, n: u32) -> Option<Ipv4Addr> {
        if n == 0 || u64::from(n) >= self.size() - 1 {
            return None;
        }
        Some(Ipv4Addr::from(u32::from(self.network) + n))
    }

    /// 紧随其后的同尺寸地址块；地址空间耗尽时返回 None。
    pub fn next(&self) -> Option<Ipv4Block> {
        let next = u64::from(u32::from(self.network)) + self.size();
        let next = u32::try_from(next).ok()?;
        Some(Ipv4Block {
            network: Ipv4Addr::from(next),
            prefix_len: self.prefix_len,
        })
    }
}

impl fmt::Display for Ipv4Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// 已分配地址的接口（设备）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub node: NodeId,
    pub device: DeviceId,
    pub addr: Ipv4Addr,
    pub block: Ipv4Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address block {0} is already in use")]
    Collision(Ipv4Block),
    #[error("address space exhausted after {0}")]
    Exhausted(Ipv4Block),
    #[error("no base block configured")]
    NoBase,
}

/// 地址块发放器：`set_base` 设定起始块，每次 `allocate` 返回当前块并前进到下一块。
///
/// 所有发放过的块记录在同一个集合里，跨不同起始块也不会重复发放。
#[derive(Debug, Default)]
pub struct AddressHelper {
    next: Option<Ipv4Block>,
    exhausted_after: Option<Ipv4Block>,
    issued: HashSet<Ipv4Block>,
}

impl AddressHelper {
    pub fn set_base(&mut self, base: Ipv4Block) {
        self.next = Some(base);
        self.exhausted_after = None;
    }

    pub fn allocate(&mut self) -> Result<Ipv4Block, AddressError> {
        let Some(block) = self.next else {
            return Err(match self.exhausted_after {
                Some(last) => AddressError::Exhausted(last),
                None => AddressError::NoBase,
            });
        };
        if !self.issued.insert(block) {
            return Err(AddressError::Collision(block));
        }
        self.next = block.next();
        if self.next.is_none() {
            self.exhausted_after = Some(block);
        }
        Ok(block)
    }

    /// 已发放的块数
    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}
