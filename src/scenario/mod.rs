//! 双星拥塞控制实验
//!
//! 两个 N-spoke 星型由一条瓶颈链路相连；源星每个 spoke 向汇星对应 spoke
//! 发送一条 TCP 批量流。编排流程：
//!
//! 1. `configure`：校验配置，选择拥塞控制算法
//! 2. `build`：构建拓扑并分配地址
//! 3. `wire`：创建接收端与发送端
//! 4. `schedule`：安排启动/停止时刻，计算全局路由
//! 5. `run`：交给引擎执行直到停止时刻
//! 6. `report`：读取接收字节数，输出报告
//!
//! 阶段严格按顺序推进，跳过或重复任何一步都会返回 `InvalidTransition`。
//! 编排代码只通过 [`Engine`] 与仿真器交互。

pub mod config;
pub mod error;
pub mod protocol;
pub mod report;
pub mod schedule;
pub mod topology;
pub mod wiring;

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::engine::Engine;
use crate::sim::SimTime;

pub use config::ScenarioConfig;
pub use error::{BuildError, ConfigError, ScenarioError};
pub use protocol::{install_protocol, TransportProtocol};
pub use report::Report;
pub use schedule::Schedule;
pub use topology::{build_dual_star, DualStar, Star};
pub use wiring::{wire_flows, Flow, Flows};

/// 场景生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Configured,
    Built,
    Wired,
    Scheduled,
    Running,
    Halted,
}

impl Phase {
    fn next(self) -> Option<Phase> {
        match self {
            Phase::Configured => Some(Phase::Built),
            Phase::Built => Some(Phase::Wired),
            Phase::Wired => Some(Phase::Scheduled),
            Phase::Scheduled => Some(Phase::Running),
            Phase::Running => Some(Phase::Halted),
            Phase::Halted => None,
        }
    }
}

pub struct Scenario<E: Engine> {
    config: ScenarioConfig,
    engine: E,
    phase: Phase,
    topology: Option<DualStar>,
    flows: Flows,
    halted_at: Option<SimTime>,
}

impl<E: Engine> Scenario<E> {
    /// 校验配置并把所选协议装进引擎；任何节点都还没有创建。
    pub fn configure(config: ScenarioConfig, mut engine: E) -> Result<Self, ScenarioError> {
        config.validate()?;
        install_protocol(&mut engine, config.protocol);
        Ok(Self {
            config,
            engine,
            phase: Phase::Configured,
            topology: None,
            flows: Flows::default(),
            halted_at: None,
        })
    }

    fn expect_next(&self, to: Phase) -> Result<(), ScenarioError> {
        if self.phase.next() == Some(to) {
            Ok(())
        } else {
            Err(ScenarioError::InvalidTransition { from: self.phase, to })
        }
    }

    pub fn build(&mut self) -> Result<&DualStar, ScenarioError> {
        self.expect_next(Phase::Built)?;
        let topo = build_dual_star(
            &mut self.engine,
            self.config.n_spokes,
            self.config.spoke_link,
            self.config.bottleneck_link,
        )?;
        self.phase = Phase::Built;
        Ok(self.topology.insert(topo))
    }

    pub fn wire(&mut self) -> Result<&Flows, ScenarioError> {
        self.expect_next(Phase::Wired)?;
        let Some(topo) = self.topology.as_ref() else {
            return Err(ScenarioError::InvalidTransition {
                from: self.phase,
                to: Phase::Wired,
            });
        };
        self.flows = wire_flows(&mut self.engine, topo, self.config.port, self.config.max_bytes)?;
        self.phase = Phase::Wired;
        Ok(&self.flows)
    }

    pub fn schedule(&mut self) -> Result<Schedule, ScenarioError> {
        self.expect_next(Phase::Scheduled)?;
        let schedule = Schedule::new(self.config.start_time, self.config.stop_time);
        schedule::install_schedule(&mut self.engine, &self.flows, schedule)?;
        self.phase = Phase::Scheduled;
        Ok(schedule)
    }

    /// 执行直到停止时刻，返回停止时的仿真时钟
    pub fn run(&mut self) -> Result<SimTime, ScenarioError> {
        self.expect_next(Phase::Running)?;
        self.phase = Phase::Running;
        info!("Run Simulation.");
        let now = self.engine.run();
        self.phase = Phase::Halted;
        self.halted_at = Some(now);
        Ok(now)
    }

    pub fn report(&self) -> Result<Report, ScenarioError> {
        if self.phase != Phase::Halted {
            return Err(ScenarioError::NotHalted(self.phase));
        }
        Report::collect(
            &self.engine,
            &self.flows,
            self.config.protocol.name(),
            self.config.stop_time,
        )
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn topology(&self) -> Option<&DualStar> {
        self.topology.as_ref()
    }

    pub fn flows(&self) -> &Flows {
        &self.flows
    }

    pub fn halted_at(&self) -> Option<SimTime> {
        self.halted_at
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub fn destroy(self) {
        self.engine.destroy();
    }
}

/// 完整执行一次实验：报告写到 `console` 和 `out_dir` 下的报告文件。
pub fn run_scenario<E: Engine, W: Write>(
    config: ScenarioConfig,
    engine: E,
    console: W,
    out_dir: &Path,
) -> Result<(Report, PathBuf), ScenarioError> {
    let mut scenario = Scenario::configure(config, engine)?;
    scenario.build()?;
    scenario.wire()?;
    scenario.schedule()?;
    scenario.run()?;
    let report = scenario.report()?;
    let path = report.emit(console, out_dir, &scenario.config().report_file_name())?;
    scenario.destroy();
    Ok((report, path))
}
