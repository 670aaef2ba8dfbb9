//! 拥塞控制
//!
//! `SocketType` 描述“以后创建的 TCP socket 用哪种拥塞控制”：算法标识 + 子选项。
//! 每条连接建立时由 `SocketType::make_ops` 生成自己的 `CongestionOps` 实例。
//!
//! 参考引擎只为 NewReno 与 Westwood 族提供各自的窗口规则；其余算法标识沿用
//! NewReno 的窗口规则，但 socket 仍记录所选算法。

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::sim::SimTime;

/// 引擎可识别的拥塞控制算法标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CongestionAlgorithm {
    NewReno,
    Hybla,
    HighSpeed,
    Htcp,
    Vegas,
    Scalable,
    Veno,
    Bic,
    Yeah,
    Illinois,
    Westwood,
}

impl CongestionAlgorithm {
    pub fn type_id(&self) -> &'static str {
        match self {
            CongestionAlgorithm::NewReno => "tcp::NewReno",
            CongestionAlgorithm::Hybla => "tcp::Hybla",
            CongestionAlgorithm::HighSpeed => "tcp::HighSpeed",
            CongestionAlgorithm::Htcp => "tcp::Htcp",
            CongestionAlgorithm::Vegas => "tcp::Vegas",
            CongestionAlgorithm::Scalable => "tcp::Scalable",
            CongestionAlgorithm::Veno => "tcp::Veno",
            CongestionAlgorithm::Bic => "tcp::Bic",
            CongestionAlgorithm::Yeah => "tcp::Yeah",
            CongestionAlgorithm::Illinois => "tcp::Illinois",
            CongestionAlgorithm::Westwood => "tcp::Westwood",
        }
    }
}

/// Westwood 带宽估计的滤波方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WestwoodFilter {
    None,
    Tustin,
}

/// Westwood 的带宽采样方式：逐 ACK（Westwood）或每 RTT 一次（Westwood+）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WestwoodProtocol {
    Westwood,
    WestwoodPlus,
}

/// 算法子选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CongestionOption {
    FilterType(WestwoodFilter),
    ProtocolType(WestwoodProtocol),
}

/// 新建 TCP socket 使用的拥塞控制类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketType {
    pub algorithm: CongestionAlgorithm,
    pub options: Vec<CongestionOption>,
}

impl Default for SocketType {
    fn default() -> Self {
        Self::new(CongestionAlgorithm::NewReno, &[])
    }
}

impl SocketType {
    pub fn new(algorithm: CongestionAlgorithm, options: &[CongestionOption]) -> Self {
        Self {
            algorithm,
            options: options.to_vec(),
        }
    }

    pub fn westwood_filter(&self) -> WestwoodFilter {
        self.options
            .iter()
            .find_map(|o| match o {
                CongestionOption::FilterType(f) => Some(*f),
                _ => None,
            })
            .unwrap_or(WestwoodFilter::Tustin)
    }

    pub fn westwood_protocol(&self) -> WestwoodProtocol {
        self.options
            .iter()
            .find_map(|o| match o {
                CongestionOption::ProtocolType(p) => Some(*p),
                _ => None,
            })
            .unwrap_or(WestwoodProtocol::Westwood)
    }

    /// 为一条新连接生成拥塞控制实例
    pub fn make_ops(&self) -> Box<dyn CongestionOps> {
        match self.algorithm {
            CongestionAlgorithm::NewReno => Box::new(NewReno),
            CongestionAlgorithm::Westwood => Box::new(Westwood::new(
                self.westwood_protocol(),
                self.westwood_filter(),
            )),
            other => {
                debug!(algorithm = other.type_id(), "使用 NewReno 窗口规则");
                Box::new(NewReno)
            }
        }
    }
}

/// 连接的拥塞窗口状态（字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub cwnd: u64,
    pub ssthresh: u64,
    pub mss: u64,
}

impl Window {
    pub fn in_slow_start(&self) -> bool {
        self.cwnd < self.ssthresh
    }
}

/// 拥塞控制算法接口
pub trait CongestionOps: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    /// 新数据被确认时的窗口增长（不在快速恢复期间调用）
    fn increase_window(&mut self, w: &mut Window, acked_bytes: u64) {
        reno_increase(w, acked_bytes);
    }

    /// 检测到丢包时的新 ssthresh
    fn ssthresh(&mut self, w: &Window, bytes_in_flight: u64) -> u64 {
        (bytes_in_flight / 2).max(2 * w.mss)
    }

    /// 每个推进 snd_una 的 ACK 的采样回调；`rtt` 按 Karn 规则可能缺失。
    fn pkts_acked(&mut self, _w: &Window, _acked_bytes: u64, _rtt: Option<SimTime>, _now: SimTime) {
    }
}

/// 慢启动：每个 ACK 至多增长一个 MSS；拥塞避免：每个 ACK 增长 mss²/cwnd（至少 1 字节）。
fn reno_increase(w: &mut Window, acked_bytes: u64) {
    if w.in_slow_start() {
        w.cwnd = w.cwnd.saturating_add(acked_bytes.min(w.mss));
    } else {
        let inc = (w.mss.saturating_mul(w.mss) / w.cwnd.max(1)).max(1);
        w.cwnd = w.cwnd.saturating_add(inc);
    }
}

#[derive(Debug, Default)]
pub struct NewReno;

impl CongestionOps for NewReno {
    fn name(&self) -> &'static str {
        "NewReno"
    }
}

/// TCP Westwood / Westwood+：用 ACK 速率估计瓶颈带宽，丢包时 ssthresh = BWE × RTTmin。
#[derive(Debug)]
pub struct Westwood {
    protocol: WestwoodProtocol,
    filter: WestwoodFilter,
    /// 带宽估计（字节/秒）
    bw_est: f64,
    last_bw: f64,
    last_sample: f64,
    acked_bytes: u64,
    last_ack: Option<SimTime>,
    min_rtt: Option<SimTime>,
}

impl Westwood {
    const ALPHA: f64 = 0.9;

    pub fn new(protocol: WestwoodProtocol, filter: WestwoodFilter) -> Self {
        Self {
            protocol,
            filter,
            bw_est: 0.0,
            last_bw: 0.0,
            last_sample: 0.0,
            acked_bytes: 0,
            last_ack: None,
            min_rtt: None,
        }
    }

    pub fn bandwidth_estimate(&self) -> f64 {
        self.bw_est
    }

    fn estimate(&mut self, now: SimTime, since: SimTime) {
        let elapsed = now.saturating_sub(since).as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }
        let sample = self.acked_bytes as f64 / elapsed;
        self.acked_bytes = 0;
        self.last_ack = Some(now);
        match self.filter {
            WestwoodFilter::None => self.bw_est = sample,
            WestwoodFilter::Tustin => {
                self.bw_est = Self::ALPHA * self.last_bw
                    + (1.0 - Self::ALPHA) * (sample + self.last_sample) / 2.0;
                self.last_sample = sample;
                self.last_bw = self.bw_est;
            }
        }
    }
}

impl CongestionOps for Westwood {
    fn name(&self) -> &'static str {
        match self.protocol {
            WestwoodProtocol::Westwood => "Westwood",
            WestwoodProtocol::WestwoodPlus => "WestwoodPlus",
        }
    }

    fn pkts_acked(&mut self, _w: &Window, acked_bytes: u64, rtt: Option<SimTime>, now: SimTime) {
        let Some(rtt) = rtt.filter(|r| *r > SimTime::ZERO) else {
            self.acked_bytes = self.acked_bytes.saturating_add(acked_bytes);
            return;
        };
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |m| m.min(rtt)));

        // 第一个 RTT 样本只确定采样区间的起点
        let Some(since) = self.last_ack else {
            self.last_ack = Some(now);
            self.acked_bytes = 0;
            return;
        };
        self.acked_bytes = self.acked_bytes.saturating_add(acked_bytes);
        match self.protocol {
            WestwoodProtocol::Westwood => self.estimate(now, since),
            // 每个 RTT 才采样一次
            WestwoodProtocol::WestwoodPlus => {
                if now.saturating_sub(since) >= rtt {
                    self.estimate(now, since);
                }
            }
        }
    }

    fn ssthresh(&mut self, w: &Window, _bytes_in_flight: u64) -> u64 {
        let min_rtt = self.min_rtt.map_or(0.0, SimTime::as_secs_f64);
        let bdp = (self.bw_est * min_rtt) as u64;
        bdp.max(2 * w.mss)
    }
}
