//! 启动与停止时刻

use tracing::info;

use super::error::ScenarioError;
use super::wiring::Flows;
use crate::app::Endpoint;
use crate::engine::Engine;
use crate::sim::SimTime;

/// 发送端相对接收端的启动延迟
pub const GENERATOR_DELAY: SimTime = SimTime::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub receiver_start: SimTime,
    pub generator_start: SimTime,
    pub stop: SimTime,
}

impl Schedule {
    pub fn new(start: SimTime, stop: SimTime) -> Self {
        Self {
            receiver_start: start,
            generator_start: start.saturating_add(GENERATOR_DELAY),
            stop,
        }
    }
}

/// 安排所有接收端、所有发送端的启动，计算全局路由，设定停止时刻。
pub fn install_schedule<E: Engine>(
    engine: &mut E,
    flows: &Flows,
    schedule: Schedule,
) -> Result<(), ScenarioError> {
    for flow in flows {
        engine.schedule_start(Endpoint::Receiver(flow.receiver), schedule.receiver_start)?;
    }
    for flow in flows {
        engine.schedule_start(Endpoint::Generator(flow.generator), schedule.generator_start)?;
    }

    info!("Initialize Global Routing.");
    engine.compute_global_routes();
    engine.set_stop_time(schedule.stop);
    info!(
        receivers = %schedule.receiver_start,
        generators = %schedule.generator_start,
        stop = %schedule.stop,
        "start and stop times set"
    );
    Ok(())
}
