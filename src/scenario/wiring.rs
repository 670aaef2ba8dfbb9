//! 流量端点装配：源星第 i 个 spoke 上的发送端 → 汇星第 i 个 spoke 上的接收端。

use std::net::SocketAddrV4;

use serde::Serialize;
use tracing::debug;

use super::error::BuildError;
use super::topology::DualStar;
use crate::app::{GeneratorId, ReceiverId};
use crate::engine::Engine;
use crate::net::NodeId;

/// 一条流：`index` 同时是源 spoke 与汇 spoke 的序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Flow {
    pub index: usize,
    pub generator: GeneratorId,
    pub receiver: ReceiverId,
    pub remote: SocketAddrV4,
    pub source_node: NodeId,
    pub sink_node: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct Flows {
    flows: Vec<Flow>,
}

impl Flows {
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Flow> {
        self.flows.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Flow> {
        self.flows.iter()
    }
}

impl<'a> IntoIterator for &'a Flows {
    type Item = &'a Flow;
    type IntoIter = std::slice::Iter<'a, Flow>;

    fn into_iter(self) -> Self::IntoIter {
        self.flows.iter()
    }
}

/// 先在每个汇 spoke 上创建监听 `port` 的接收端，再在每个源 spoke 上创建
/// 指向对应汇 spoke 地址的发送端。
pub fn wire_flows<E: Engine>(
    engine: &mut E,
    topo: &DualStar,
    port: u16,
    max_bytes: u64,
) -> Result<Flows, BuildError> {
    let n = topo.spoke_count();
    let receivers = topo
        .sink
        .spokes
        .iter()
        .map(|&node| engine.create_receiver(node, port))
        .collect::<Result<Vec<_>, _>>()?;

    let mut flows = Vec::with_capacity(n);
    for (i, receiver) in receivers.into_iter().enumerate() {
        let Some(addr) = topo.sink.spoke_addr(i) else {
            return Err(BuildError::SpokeCount {
                star: "sink",
                expected: n,
                actual: i,
            });
        };
        let remote = SocketAddrV4::new(addr, port);
        let source_node = topo.source.spokes[i];
        let generator = engine.create_generator(source_node, remote, max_bytes)?;
        debug!(flow = i, %remote, "flow wired");
        flows.push(Flow {
            index: i,
            generator,
            receiver,
            remote,
            source_node,
            sink_node: topo.sink.spokes[i],
        });
    }
    Ok(Flows { flows })
}
