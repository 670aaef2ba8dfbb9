//! 双星拓扑拥塞控制实验
//!
//! 源星 N 个 spoke 各向汇星对应 spoke 发送一条 TCP 批量流，全部流共享
//! 两个 hub 之间的瓶颈链路。运行结束后把每条流与汇总的接收量、吞吐量写到
//! stdout 和 `<协议名><N>.txt`。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use dualstar_rs::engine::{LinkParams, NetEngine};
use dualstar_rs::scenario::{run_scenario, ScenarioConfig, ScenarioError, TransportProtocol};
use dualstar_rs::sim::SimTime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dual-star", about = "双星拓扑仿真：N 条 TCP 流共享一条瓶颈链路")]
struct Args {
    /// 每个星型的 spoke 数
    #[arg(long, default_value_t = 8)]
    n_spokes: usize,

    /// 传输协议（NewReno, Hybla, HighSpeed, Htcp, Vegas, Scalable, Veno, Bic, Yeah, Illinois, Westwood, WestwoodPlus）
    #[arg(long, default_value = "Westwood")]
    transport_prot: String,

    /// 输出发送端/接收端应用日志
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    verbose: bool,

    /// 每个发送端最多发送的字节数；0 表示不限
    #[arg(long, default_value_t = 0)]
    max_bytes: u64,

    /// 接收端监听端口
    #[arg(long, default_value_t = 50000)]
    port: u16,

    #[arg(long, default_value_t = 5)]
    spoke_rate_mbps: u64,

    /// spoke 链路单向传播时延（毫秒）
    #[arg(long, default_value_t = 10)]
    spoke_delay_ms: u64,

    #[arg(long, default_value_t = 1)]
    bottleneck_rate_mbps: u64,

    /// 瓶颈链路单向传播时延（毫秒）
    #[arg(long, default_value_t = 20)]
    bottleneck_delay_ms: u64,

    /// 接收端启动时刻（秒）；发送端晚 1 秒启动
    #[arg(long, default_value_t = 1.0)]
    start_time: f64,

    /// 仿真停止时刻（秒），也是吞吐量的分母
    #[arg(long, default_value_t = 60.0)]
    stop_time: f64,

    /// 每个设备的 drop-tail 队列容量（包）
    #[arg(long, default_value_t = 100)]
    queue_pkts: usize,

    /// 等价路径选择的随机种子
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// 文本报告所在目录
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// 额外输出 JSON 报告；不填则不生成
    #[arg(long)]
    json_report: Option<PathBuf>,
}

impl Args {
    fn to_config(&self) -> Result<ScenarioConfig, ScenarioError> {
        let protocol = TransportProtocol::from_name(&self.transport_prot)?;
        let config = ScenarioConfig {
            n_spokes: self.n_spokes,
            protocol,
            verbose: self.verbose,
            max_bytes: self.max_bytes,
            port: self.port,
            spoke_link: LinkParams::mbps(self.spoke_rate_mbps, SimTime::from_millis(self.spoke_delay_ms)),
            bottleneck_link: LinkParams::mbps(
                self.bottleneck_rate_mbps,
                SimTime::from_millis(self.bottleneck_delay_ms),
            ),
            start_time: SimTime::from_secs_f64(self.start_time),
            stop_time: SimTime::from_secs_f64(self.stop_time),
            queue_pkts: self.queue_pkts,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let base = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let app_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_new(format!("{base},dualstar_rs::app={app_level}"))
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,dualstar_rs::app={app_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn run(args: &Args) -> Result<(), ScenarioError> {
    let config = args.to_config()?;
    let engine = NetEngine::new(config.engine_config());
    let stdout = std::io::stdout();
    let (report, _path) = run_scenario(config, engine, stdout.lock(), &args.out_dir)?;
    if let Some(path) = &args.json_report {
        report.write_json(path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
