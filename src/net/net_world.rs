//! 网络世界实现：持有 Network，供事件在执行时访问。

use super::network::Network;
use crate::sim::World;
use std::any::Any;

#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
}

impl NetWorld {
    pub fn new(net: Network) -> Self {
        Self { net }
    }

    /// 事件执行时从 `dyn World` 取回网络。
    pub(crate) fn net_mut(world: &mut dyn World) -> &mut Network {
        &mut world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld")
            .net
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
