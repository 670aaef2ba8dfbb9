//! 世界 trait：事件执行时可见的业务状态（拓扑、协议栈、应用）。

use super::simulator::Simulator;
use std::any::Any;

pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每执行完一个事件后回调。
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
