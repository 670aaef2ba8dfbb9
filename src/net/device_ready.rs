//! 设备就绪事件（用于驱动队列出队）

use super::id::DeviceId;
use super::net_world::NetWorld;
use crate::sim::{Event, Simulator, World};

/// 事件：设备完成一次序列化发送后，在 depart 时刻触发，尝试发送队列中的下一个 packet。
#[derive(Debug)]
pub struct DeviceReady {
    pub device: DeviceId,
}

impl Event for DeviceReady {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeviceReady { device } = *self;
        NetWorld::net_mut(world).on_device_ready(device, sim);
    }
}
