//! 测量报告
//!
//! 运行结束后按 spoke 顺序读取每个接收端的累计字节数，换算为兆比特与吞吐量，
//! 同时写到控制台和 `<协议名><spoke 数>.txt`。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::error::ScenarioError;
use super::wiring::Flows;
use crate::app::ReceiverId;
use crate::engine::Engine;
use crate::sim::SimTime;

/// 字节 → 兆比特
pub fn megabits(bytes: u64) -> f64 {
    bytes as f64 * 8.0 * 1e-6
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowResult {
    pub index: usize,
    pub receiver: ReceiverId,
    pub rx_bytes: u64,
    pub rx_megabits: f64,
    pub throughput_mbps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub rx_bytes: u64,
    pub rx_megabits: f64,
    pub throughput_mbps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub protocol: &'static str,
    pub n_spokes: usize,
    /// 吞吐量的分母（秒）
    pub run_length_secs: f64,
    pub flows: Vec<FlowResult>,
    pub totals: Totals,
}

impl Report {
    /// 读取计数器并计算结果。计数器不可读说明接收端句柄无效，直接报错。
    pub fn collect<E: Engine>(
        engine: &E,
        flows: &Flows,
        protocol: &'static str,
        run_length: SimTime,
    ) -> Result<Self, ScenarioError> {
        let secs = run_length.as_secs_f64();
        let mut results = Vec::with_capacity(flows.len());
        let mut total_bytes = 0u64;
        for flow in flows {
            let rx_bytes = engine.received_bytes(flow.receiver)?;
            total_bytes = total_bytes.saturating_add(rx_bytes);
            let mb = megabits(rx_bytes);
            results.push(FlowResult {
                index: flow.index,
                receiver: flow.receiver,
                rx_bytes,
                rx_megabits: mb,
                throughput_mbps: mb / secs,
            });
        }
        let total_mb = megabits(total_bytes);
        Ok(Self {
            protocol,
            n_spokes: flows.len(),
            run_length_secs: secs,
            flows: results,
            totals: Totals {
                rx_bytes: total_bytes,
                rx_megabits: total_mb,
                throughput_mbps: total_mb / secs,
            },
        })
    }

    /// 报告正文：每条流一行，空行，汇总一行
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .flows
            .iter()
            .map(|f| {
                format!(
                    "Sink {}\tTotalRx: {:.6}Mb\tThroughput: {:.6}Mbps",
                    f.index, f.rx_megabits, f.throughput_mbps
                )
            })
            .collect();
        lines.push(String::new());
        lines.push(format!(
            "Totals\tTotalRx: {:.6}Mb\tThroughput: {:.6}Mbps",
            self.totals.rx_megabits, self.totals.throughput_mbps
        ));
        lines
    }

    pub fn write_text<W: Write>(&self, mut w: W) -> io::Result<()> {
        for line in self.lines() {
            writeln!(w, "{line}")?;
        }
        w.flush()
    }

    /// 把报告写到 `console` 并写入 `dir` 下的 `file_name`，返回文件路径。
    ///
    /// 文件先打开：打开失败时控制台不会有任何输出。
    pub fn emit<W: Write>(&self, console: W, dir: &Path, file_name: &str) -> Result<PathBuf, ScenarioError> {
        let path = dir.join(file_name);
        let mut file = BufWriter::new(File::create(&path)?);
        let mut console = console;
        for line in self.lines() {
            writeln!(console, "{line}")?;
            writeln!(file, "{line}")?;
        }
        console.flush()?;
        file.flush()?;
        info!(path = %path.display(), "report written");
        Ok(path)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ScenarioError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "json report written");
        Ok(())
    }
}
