use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use super::mock_engine::{Call, MockEngine};
use crate::app::Endpoint;
use crate::engine::NetEngine;
use crate::proto::congestion::{CongestionOption, WestwoodProtocol};
use crate::scenario::{
    ConfigError, Phase, Scenario, ScenarioConfig, ScenarioError, TransportProtocol, run_scenario,
};
use crate::sim::SimTime;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dualstar-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// 短时间运行的小拓扑
fn short_config(n: usize, protocol: TransportProtocol) -> ScenarioConfig {
    ScenarioConfig {
        n_spokes: n,
        protocol,
        verbose: false,
        stop_time: SimTime::from_secs(5),
        ..ScenarioConfig::default()
    }
}

#[test]
fn default_config_matches_the_reference_experiment() {
    let cfg = ScenarioConfig::default();
    assert_eq!(cfg.n_spokes, 8);
    assert_eq!(cfg.protocol, TransportProtocol::Westwood);
    assert!(cfg.verbose);
    assert_eq!(cfg.port, 50000);
    assert_eq!(cfg.start_time, SimTime::from_secs(1));
    assert_eq!(cfg.generator_start(), SimTime::from_secs(2));
    assert_eq!(cfg.stop_time, SimTime::from_secs(60));
    assert_eq!(cfg.report_file_name(), "Westwood8.txt");
    assert_eq!(cfg.validate(), Ok(()));
}

#[test]
fn config_validation_rejects_degenerate_values() {
    let base = ScenarioConfig::default();
    let check = |cfg: ScenarioConfig| cfg.validate().expect_err("invalid");

    assert_eq!(
        check(ScenarioConfig { n_spokes: 0, ..base.clone() }),
        ConfigError::NoSpokes
    );
    assert_eq!(
        check(ScenarioConfig { n_spokes: 256, ..base.clone() }),
        ConfigError::TooManySpokes(256)
    );
    assert_eq!(
        check(ScenarioConfig { port: 0, ..base.clone() }),
        ConfigError::ZeroPort
    );
    assert_eq!(
        check(ScenarioConfig { queue_pkts: 0, ..base.clone() }),
        ConfigError::ZeroQueue
    );
    assert!(matches!(
        check(ScenarioConfig {
            stop_time: SimTime::from_secs(2),
            ..base.clone()
        }),
        ConfigError::StopNotAfterStart { .. }
    ));
    let mut no_bw = base.clone();
    no_bw.bottleneck_link.bandwidth_bps = 0;
    assert_eq!(
        check(no_bw),
        ConfigError::ZeroBandwidth { which: "bottleneck" }
    );
    assert_eq!(
        ScenarioConfig { n_spokes: 255, ..base }.validate(),
        Ok(())
    );
}

#[test]
fn report_file_name_uses_the_canonical_protocol_name() {
    let protocol = TransportProtocol::from_name("Westwood-Plus").expect("alias");
    let cfg = ScenarioConfig {
        n_spokes: 4,
        protocol,
        ..ScenarioConfig::default()
    };
    assert_eq!(cfg.report_file_name(), "WestwoodPlus4.txt");
}

#[test]
fn invalid_config_fails_before_the_engine_is_touched() {
    let (engine, log) = MockEngine::new(0);
    let cfg = ScenarioConfig {
        n_spokes: 0,
        ..ScenarioConfig::default()
    };
    let err = Scenario::configure(cfg, engine).err().expect("invalid");
    assert!(matches!(err, ScenarioError::Config(ConfigError::NoSpokes)));
    assert!(log.borrow().is_empty());
}

#[test]
fn protocol_is_selected_before_any_node_exists() {
    for (protocol, plus) in [
        (TransportProtocol::Westwood, false),
        (TransportProtocol::WestwoodPlus, true),
    ] {
        let (engine, log) = MockEngine::new(0);
        let mut s = Scenario::configure(short_config(2, protocol), engine).expect("configure");
        s.build().expect("build");

        let calls = log.borrow();
        let Some(Call::SetSocketType(st)) = calls.first() else {
            panic!("first call must select the socket type: {:?}", calls.first());
        };
        assert_eq!(
            st.options
                .contains(&CongestionOption::ProtocolType(WestwoodProtocol::WestwoodPlus)),
            plus
        );
        assert!(matches!(calls[1], Call::CreateNode(_)));
    }
}

#[test]
fn generator_i_targets_sink_spoke_i() {
    let (engine, log) = MockEngine::new(0);
    let mut s = Scenario::configure(short_config(8, TransportProtocol::Westwood), engine)
        .expect("configure");
    s.build().expect("build");
    let flows = s.wire().expect("wire").clone();
    assert_eq!(flows.len(), 8);

    let topo = s.topology().expect("topology");
    for (i, flow) in flows.iter().enumerate() {
        assert_eq!(flow.index, i);
        let octet = u8::try_from(i + 1).expect("octet");
        assert_eq!(
            flow.remote,
            SocketAddrV4::new(Ipv4Addr::new(10, 2, octet, 2), 50000)
        );
        assert_eq!(topo.sink.spoke_addr(i), Some(*flow.remote.ip()));
        assert_eq!(flow.source_node, topo.source.spokes[i]);
        assert_eq!(flow.sink_node, topo.sink.spokes[i]);
    }

    // 接收端全部在发送端之前创建
    let calls = log.borrow();
    let last_receiver = calls
        .iter()
        .rposition(|c| matches!(c, Call::CreateReceiver(..)))
        .expect("receivers");
    let first_generator = calls
        .iter()
        .position(|c| matches!(c, Call::CreateGenerator(..)))
        .expect("generators");
    assert!(last_receiver < first_generator);
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, Call::CreateGenerator(_, _, 0)))
            .count(),
        8
    );
}

#[test]
fn receivers_start_before_generators_and_routes_precede_the_stop() {
    let (engine, log) = MockEngine::new(0);
    let mut s = Scenario::configure(ScenarioConfig::default(), engine).expect("configure");
    s.build().expect("build");
    s.wire().expect("wire");
    let schedule = s.schedule().expect("schedule");
    assert!(schedule.receiver_start < schedule.generator_start);

    let calls = log.borrow();
    let starts: Vec<(Endpoint, SimTime)> = calls
        .iter()
        .filter_map(|c| match c {
            Call::ScheduleStart(e, at) => Some((*e, *at)),
            _ => None,
        })
        .collect();
    assert_eq!(starts.len(), 16);
    for (e, at) in &starts {
        match e {
            Endpoint::Receiver(_) => assert_eq!(*at, SimTime::from_secs(1)),
            Endpoint::Generator(_) => assert_eq!(*at, SimTime::from_secs(2)),
        }
    }
    assert!(starts[..8].iter().all(|(e, _)| matches!(e, Endpoint::Receiver(_))));

    let n = calls.len();
    assert_eq!(calls[n - 2], Call::ComputeRoutes);
    assert_eq!(calls[n - 1], Call::SetStopTime(SimTime::from_secs(60)));
}

#[test]
fn phases_advance_strictly_in_order() {
    let (engine, _log) = MockEngine::new(0);
    let mut s = Scenario::configure(short_config(1, TransportProtocol::NewReno), engine)
        .expect("configure");
    assert_eq!(s.phase(), Phase::Configured);

    assert!(matches!(
        s.wire(),
        Err(ScenarioError::InvalidTransition {
            from: Phase::Configured,
            to: Phase::Wired
        })
    ));
    assert!(matches!(s.report(), Err(ScenarioError::NotHalted(Phase::Configured))));

    s.build().expect("build");
    assert!(matches!(
        s.build(),
        Err(ScenarioError::InvalidTransition {
            from: Phase::Built,
            to: Phase::Built
        })
    ));
    assert!(matches!(s.run(), Err(ScenarioError::InvalidTransition { .. })));

    s.wire().expect("wire");
    s.schedule().expect("schedule");
    assert_eq!(s.phase(), Phase::Scheduled);
    s.run().expect("run");
    assert_eq!(s.phase(), Phase::Halted);
    assert_eq!(s.halted_at(), Some(SimTime::from_secs(5)));
    assert!(matches!(s.run(), Err(ScenarioError::InvalidTransition { .. })));
    assert!(s.report().is_ok());
}

#[test]
fn report_divides_megabits_by_the_stop_time() {
    let (engine, log) = MockEngine::new(750_000);
    let dir = unique_temp_dir("mock-report");
    let mut console = Vec::new();

    let (report, path) =
        run_scenario(ScenarioConfig::default(), engine, &mut console, &dir).expect("run");

    assert_eq!(path, dir.join("Westwood8.txt"));
    assert_eq!(report.flows.len(), 8);
    for (i, f) in report.flows.iter().enumerate() {
        let mb = 6.0 * (i + 1) as f64;
        assert!((f.rx_megabits - mb).abs() < 1e-9);
        assert!((f.throughput_mbps - mb / 60.0).abs() < 1e-9);
    }
    assert_eq!(report.totals.rx_bytes, 750_000 * 36);

    let text = String::from_utf8(console).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines.iter().filter(|l| !l.is_empty()).count(), 9);
    assert_eq!(lines[0], "Sink 0\tTotalRx: 6.000000Mb\tThroughput: 0.100000Mbps");
    assert_eq!(lines[8], "");
    assert_eq!(lines[9], "Totals\tTotalRx: 216.000000Mb\tThroughput: 3.600000Mbps");
    assert_eq!(fs::read_to_string(&path).expect("report file"), text);
    assert_eq!(log.borrow().last(), Some(&Call::Destroy));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn report_file_error_leaves_console_empty() {
    let (engine, _log) = MockEngine::new(1);
    let dir = unique_temp_dir("missing-dir").join("does-not-exist");
    let mut console = Vec::new();

    let err = run_scenario(ScenarioConfig::default(), engine, &mut console, &dir)
        .err()
        .expect("io error");
    assert!(matches!(err, ScenarioError::Io(_)));
    assert!(console.is_empty());
}

#[test]
fn single_spoke_scenario_runs_on_the_reference_engine() {
    let cfg = short_config(1, TransportProtocol::Westwood);
    let mut s = Scenario::configure(cfg.clone(), NetEngine::new(cfg.engine_config()))
        .expect("configure");
    s.build().expect("build");
    s.wire().expect("wire");
    s.schedule().expect("schedule");
    let halted = s.run().expect("run");
    assert_eq!(halted, SimTime::from_secs(5));

    let report = s.report().expect("report");
    assert_eq!(report.flows.len(), 1);
    let rx = report.flows[0].rx_bytes;
    // 瓶颈 1 Mbps，发送端只有 3 秒
    assert!(rx > 0);
    assert!(rx <= 375_000, "rx = {rx}");

    let engine = s.into_engine();
    assert!(engine.network().stats.delivered_pkts > 0);
    assert_eq!(engine.network().tcp.conn_count(), 1);
}

#[test]
fn every_protocol_moves_data_through_the_bottleneck() {
    for protocol in TransportProtocol::all() {
        let cfg = ScenarioConfig {
            stop_time: SimTime::from_secs(4),
            ..short_config(2, protocol)
        };
        let dir = unique_temp_dir("all-protocols");
        let engine = NetEngine::new(cfg.engine_config());
        let (report, _) = run_scenario(cfg, engine, std::io::sink(), &dir).expect("run");
        assert!(
            report.flows.iter().all(|f| f.rx_bytes > 0),
            "{protocol}: {:?}",
            report.flows
        );
        let _ = fs::remove_dir_all(&dir);
    }
}

#[test]
fn identical_configurations_give_identical_reports() {
    let run = || {
        let cfg = short_config(4, TransportProtocol::WestwoodPlus);
        let dir = unique_temp_dir("repeat");
        let mut console = Vec::new();
        let engine = NetEngine::new(cfg.engine_config());
        run_scenario(cfg, engine, &mut console, &dir).expect("run");
        let _ = fs::remove_dir_all(&dir);
        console
    };
    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}
