//! 双星拓扑构建
//!
//! 拓扑结构：
//!
//! ```text
//! src spoke 0 ─┐                          ┌─ sink spoke 0
//! src spoke 1 ─┤                          ├─ sink spoke 1
//!      ...     ├─ src hub ══ sink hub ────┤      ...
//! src spoke N-1┘   (bottleneck)           └─ sink spoke N-1
//! ```
//!
//! 地址：源星第 i 条链路 `10.1.(i+1).0/24`，汇星第 i 条链路 `10.2.(i+1).0/24`，
//! 瓶颈链路 `10.3.1.0/24`。每条 spoke 链路 hub 一端是 `.1`，spoke 一端是 `.2`。

use std::collections::HashSet;
use std::net::Ipv4Addr;

use tracing::{debug, info};

use super::error::BuildError;
use crate::engine::{Engine, LinkParams};
use crate::net::{AddressHelper, Interface, Ipv4Block, LinkId, NodeId};

/// 源星地址起始块
pub const SOURCE_BASE: Ipv4Block = Ipv4Block::slash24(10, 1, 1);
/// 汇星地址起始块
pub const SINK_BASE: Ipv4Block = Ipv4Block::slash24(10, 2, 1);
/// 瓶颈链路地址块
pub const BOTTLENECK_BLOCK: Ipv4Block = Ipv4Block::slash24(10, 3, 1);

/// 星型：一个 hub，N 个 spoke，每个 spoke 一条到 hub 的链路
#[derive(Debug, Clone)]
pub struct Star {
    pub hub: NodeId,
    pub spokes: Vec<NodeId>,
    /// `links[i]` 连接 hub 与 `spokes[i]`，hub 是第一端
    pub links: Vec<LinkId>,
    pub hub_ifaces: Vec<Interface>,
    pub spoke_ifaces: Vec<Interface>,
}

impl Star {
    fn create<E: Engine>(
        engine: &mut E,
        prefix: &str,
        n: usize,
        params: LinkParams,
    ) -> Result<Self, BuildError> {
        let hub = engine.create_node(&format!("{prefix}-hub"));
        let mut spokes = Vec::with_capacity(n);
        let mut links = Vec::with_capacity(n);
        for i in 0..n {
            let spoke = engine.create_node(&format!("{prefix}-spoke{i}"));
            links.push(engine.create_link(hub, spoke, params)?);
            spokes.push(spoke);
        }
        Ok(Self {
            hub,
            spokes,
            links,
            hub_ifaces: Vec::new(),
            spoke_ifaces: Vec::new(),
        })
    }

    fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.hub).chain(self.spokes.iter().copied())
    }

    fn assign<E: Engine>(
        &mut self,
        engine: &mut E,
        helper: &mut AddressHelper,
        base: Ipv4Block,
    ) -> Result<(), BuildError> {
        helper.set_base(base);
        for &link in &self.links {
            let block = helper.allocate()?;
            let [hub_if, spoke_if] = engine.assign_addresses(link, block)?;
            self.hub_ifaces.push(hub_if);
            self.spoke_ifaces.push(spoke_if);
        }
        Ok(())
    }

    pub fn spoke_count(&self) -> usize {
        self.spokes.len()
    }

    /// 第 i 个 spoke 在其链路上的地址
    pub fn spoke_addr(&self, i: usize) -> Option<Ipv4Addr> {
        self.spoke_ifaces.get(i).map(|iface| iface.addr)
    }
}

#[derive(Debug, Clone)]
pub struct DualStar {
    pub source: Star,
    pub sink: Star,
    pub bottleneck: LinkId,
    /// `[源 hub 一端, 汇 hub 一端]`
    pub bottleneck_ifaces: [Interface; 2],
}

impl DualStar {
    pub fn spoke_count(&self) -> usize {
        self.source.spoke_count()
    }

    /// 所有链路的地址块，顺序为源星、汇星、瓶颈
    pub fn blocks(&self) -> impl Iterator<Item = Ipv4Block> + '_ {
        self.source
            .hub_ifaces
            .iter()
            .chain(&self.sink.hub_ifaces)
            .chain(std::iter::once(&self.bottleneck_ifaces[0]))
            .map(|iface| iface.block)
    }

    fn interfaces(&self) -> impl Iterator<Item = &Interface> + '_ {
        self.source
            .hub_ifaces
            .iter()
            .chain(&self.source.spoke_ifaces)
            .chain(&self.sink.hub_ifaces)
            .chain(&self.sink.spoke_ifaces)
            .chain(&self.bottleneck_ifaces)
    }

    /// 构建后检查：两侧 spoke 数相等且等于 `n`，hub 度数为 `n + 1`，
    /// 接口地址落在自己链路的块内，地址与块都不重复。
    fn verify(&self, n: usize) -> Result<(), BuildError> {
        for (star, s) in [("source", &self.source), ("sink", &self.sink)] {
            if s.spoke_count() != n {
                return Err(BuildError::SpokeCount {
                    star,
                    expected: n,
                    actual: s.spoke_count(),
                });
            }
            let bottleneck_end = usize::from(self.bottleneck_ifaces.iter().any(|i| i.node == s.hub));
            let degree = s.hub_ifaces.iter().filter(|i| i.node == s.hub).count() + bottleneck_end;
            if degree != n + 1 {
                return Err(BuildError::HubDegree {
                    star,
                    hub: s.hub,
                    expected: n + 1,
                    actual: degree,
                });
            }
        }
        if self.source.spoke_count() != self.sink.spoke_count() {
            return Err(BuildError::StarMismatch {
                source_spokes: self.source.spoke_count(),
                sink_spokes: self.sink.spoke_count(),
            });
        }

        let mut seen = HashSet::new();
        for iface in self.interfaces() {
            if !iface.block.contains(iface.addr) {
                return Err(BuildError::OutsideBlock {
                    addr: iface.addr,
                    block: iface.block,
                });
            }
            if !seen.insert(iface.addr) {
                return Err(BuildError::DuplicateAddress(iface.addr));
            }
        }
        let mut blocks = HashSet::new();
        for block in self.blocks() {
            if !blocks.insert(block) {
                return Err(BuildError::SharedBlock(block));
            }
        }
        Ok(())
    }
}

/// 构建双星拓扑：两个 N-spoke 星型，hub 之间一条瓶颈链路。
///
/// 顺序：创建两个星型 → 所有节点安装协议栈 → 为 spoke 链路分配地址 →
/// 连接两个 hub 并为瓶颈链路分配地址。
pub fn build_dual_star<E: Engine>(
    engine: &mut E,
    n: usize,
    spoke: LinkParams,
    bottleneck: LinkParams,
) -> Result<DualStar, BuildError> {
    info!("Build star topology.");
    let mut source = Star::create(engine, "src", n, spoke)?;
    let mut sink = Star::create(engine, "sink", n, spoke)?;

    info!("Install internet stack on all nodes.");
    for node in source.nodes().chain(sink.nodes()) {
        engine.install_stack(node)?;
    }

    info!("Assign IP Addresses.");
    let mut helper = AddressHelper::default();
    source.assign(engine, &mut helper, SOURCE_BASE)?;
    sink.assign(engine, &mut helper, SINK_BASE)?;

    info!("Linking the hubs.");
    let link = engine.create_link(source.hub, sink.hub, bottleneck)?;
    helper.set_base(BOTTLENECK_BLOCK);
    let block = helper.allocate()?;
    let bottleneck_ifaces = engine.assign_addresses(link, block)?;

    let topo = DualStar {
        source,
        sink,
        bottleneck: link,
        bottleneck_ifaces,
    };
    topo.verify(n)?;
    debug!(spokes = n, blocks = helper.issued(), "dual star built");
    Ok(topo)
}
