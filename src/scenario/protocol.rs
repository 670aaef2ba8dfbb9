//! 传输协议选择
//!
//! 名称 → (引擎拥塞控制算法标识, 子选项集合) 的静态查表。未知名称是一次查表失败，
//! 在构建拓扑之前就报配置错误。

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use super::error::ConfigError;
use crate::engine::Engine;
use crate::proto::congestion::{
    CongestionAlgorithm, CongestionOption, SocketType, WestwoodFilter, WestwoodProtocol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportProtocol {
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
    WestwoodPlus,
}

struct ProtocolEntry {
    protocol: TransportProtocol,
    name: &'static str,
    aliases: &'static [&'static str],
    algorithm: CongestionAlgorithm,
    options: &'static [CongestionOption],
}

const TUSTIN: CongestionOption = CongestionOption::FilterType(WestwoodFilter::Tustin);
const PLUS: CongestionOption = CongestionOption::ProtocolType(WestwoodProtocol::WestwoodPlus);

const fn plain(
    protocol: TransportProtocol,
    name: &'static str,
    aliases: &'static [&'static str],
    algorithm: CongestionAlgorithm,
) -> ProtocolEntry {
    ProtocolEntry {
        protocol,
        name,
        aliases,
        algorithm,
        options: &[],
    }
}

static PROTOCOLS: [ProtocolEntry; 12] = [
    plain(TransportProtocol::NewReno, "NewReno", &["TcpNewReno"], CongestionAlgorithm::NewReno),
    plain(TransportProtocol::Hybla, "Hybla", &["TcpHybla"], CongestionAlgorithm::Hybla),
    plain(TransportProtocol::HighSpeed, "HighSpeed", &["TcpHighSpeed"], CongestionAlgorithm::HighSpeed),
    plain(TransportProtocol::Htcp, "Htcp", &["TcpHtcp"], CongestionAlgorithm::Htcp),
    plain(TransportProtocol::Vegas, "Vegas", &["TcpVegas"], CongestionAlgorithm::Vegas),
    plain(TransportProtocol::Scalable, "Scalable", &["TcpScalable"], CongestionAlgorithm::Scalable),
    plain(TransportProtocol::Veno, "Veno", &["TcpVeno"], CongestionAlgorithm::Veno),
    plain(TransportProtocol::Bic, "Bic", &["TcpBic"], CongestionAlgorithm::Bic),
    plain(TransportProtocol::Yeah, "Yeah", &["TcpYeah"], CongestionAlgorithm::Yeah),
    plain(TransportProtocol::Illinois, "Illinois", &["TcpIllinois"], CongestionAlgorithm::Illinois),
    ProtocolEntry {
        protocol: TransportProtocol::Westwood,
        name: "Westwood",
        aliases: &["TcpWestwood"],
        algorithm: CongestionAlgorithm::Westwood,
        options: &[TUSTIN],
    },
    ProtocolEntry {
        protocol: TransportProtocol::WestwoodPlus,
        name: "WestwoodPlus",
        aliases: &["TcpWestwoodPlus", "Westwood-Plus"],
        algorithm: CongestionAlgorithm::Westwood,
        options: &[PLUS, TUSTIN],
    },
];

impl TransportProtocol {
    fn entry(&self) -> &'static ProtocolEntry {
        // 表按枚举顺序排列
        &PROTOCOLS[*self as usize]
    }

    /// 按名称（或别名）查表
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        PROTOCOLS
            .iter()
            .find(|e| e.name == name || e.aliases.contains(&name))
            .map(|e| e.protocol)
            .ok_or_else(|| ConfigError::UnknownProtocol {
                name: name.to_string(),
                expected: Self::all().map(|p| p.name()).collect::<Vec<_>>().join(", "),
            })
    }

    pub fn all() -> impl Iterator<Item = TransportProtocol> {
        PROTOCOLS.iter().map(|e| e.protocol)
    }

    /// 规范名称（报告文件名使用它）
    pub fn name(&self) -> &'static str {
        self.entry().name
    }

    pub fn socket_type(&self) -> SocketType {
        let e = self.entry();
        SocketType::new(e.algorithm, e.options)
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// 在创建任何连接端点之前，让引擎此后创建的每个 TCP socket 都使用所选拥塞控制。
pub fn install_protocol<E: Engine>(engine: &mut E, protocol: TransportProtocol) {
    let socket_type = protocol.socket_type();
    info!(
        protocol = protocol.name(),
        algorithm = socket_type.algorithm.type_id(),
        "Select TCP variant."
    );
    engine.set_socket_type(socket_type);
}
