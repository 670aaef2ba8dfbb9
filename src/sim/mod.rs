//! 仿真核心模块
//!
//! 事件驱动仿真的核心组件：仿真时间、事件、世界与仿真器（显式持有虚拟时钟）。

mod event;
mod scheduled_event;
mod simulator;
mod time;
mod world;

pub use event::Event;
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
