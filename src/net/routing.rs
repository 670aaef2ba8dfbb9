//! 全局路由
//!
//! 在拓扑建好之后一次性计算：对每个 (from, dst) 预计算所有等价最短跳数路径的下一跳，
//! 再加上“地址 → 节点”的解析表。转发时按目的地址查表，找不到即丢包。

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;

use super::id::NodeId;

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    built: bool,
    /// (from, dst) -> 多个等价最短路径下一跳
    next_hops: HashMap<(NodeId, NodeId), Vec<NodeId>>,
    /// 接口地址 -> 所属节点
    owners: HashMap<Ipv4Addr, NodeId>,
    /// 用于等价路径选择的盐（来自仿真种子，保证稳定且可控）
    hash_salt: u64,
}

impl RoutingTable {
    pub fn new(hash_salt: u64) -> Self {
        Self {
            hash_salt,
            ..Self::default()
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// 拓扑变化后路由失效，需要重新 `build`。
    pub fn invalidate(&mut self) {
        self.built = false;
        self.next_hops.clear();
        self.owners.clear();
    }

    /// 基于当前拓扑重建路由表。
    ///
    /// `adj[from]` 为从 `from` 出发的所有邻居（链路是双向的，因此反向图与正向图相同）。
    pub fn build(&mut self, adj: &[Vec<NodeId>], owners: HashMap<Ipv4Addr, NodeId>) {
        let n = adj.len();
        self.next_hops.clear();
        self.owners = owners;

        // 对每个 dst 做 BFS 得到最短跳数 dist[*]；
        // 再对每个 from 选出所有满足 dist[next] = dist[from] - 1 的邻居。
        let mut dist: Vec<u32> = vec![u32::MAX; n];
        let mut q: VecDeque<NodeId> = VecDeque::new();

        for dst_idx in 0..n {
            dist.fill(u32::MAX);
            q.clear();
            dist[dst_idx] = 0;
            q.push_back(NodeId(dst_idx));

            while let Some(v) = q.pop_front() {
                let dv = dist[v.0];
                for &pred in &adj[v.0] {
                    if dist[pred.0] == u32::MAX {
                        dist[pred.0] = dv + 1;
                        q.push_back(pred);
                    }
                }
            }

            for from_idx in 0..n {
                let df = dist[from_idx];
                if from_idx == dst_idx || df == u32::MAX {
                    continue;
                }
                let cands: Vec<NodeId> = adj[from_idx]
                    .iter()
                    .copied()
                    .filter(|nh| dist[nh.0] == df - 1)
                    .collect();
                if !cands.is_empty() {
                    self.next_hops.insert((NodeId(from_idx), NodeId(dst_idx)), cands);
                }
            }
        }

        self.built = true;
    }

    /// 目的地址所属节点
    pub fn resolve(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.owners.get(&addr).copied()
    }

    /// (from, dst) 的等价下一跳候选集合
    pub fn next_hops(&self, from: NodeId, dst: NodeId) -> Option<&[NodeId]> {
        self.next_hops.get(&(from, dst)).map(|v| v.as_slice())
    }

    /// 按 flow key 稳定地选一个下一跳；同一条流总是走同一条路径。
    pub fn next_hop(&self, from: NodeId, dst_addr: Ipv4Addr, flow_key: u64) -> Option<NodeId> {
        let dst = self.resolve(dst_addr)?;
        let cands = self.next_hops(from, dst)?;
        if cands.len() == 1 {
            return Some(cands[0]);
        }
        let h = mix64(
            flow_key ^ (from.0 as u64).wrapping_mul(0x9E3779B97F4A7C15)
                ^ (dst.0 as u64)
                ^ self.hash_salt,
        );
        Some(cands[(h as usize) % cands.len()])
    }
}

/// splitmix64：确定性的 64-bit mixing，避免 RandomState 让每次运行结果不同。
fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
