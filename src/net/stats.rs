//! 网络统计信息

use serde::Serialize;

/// 网络层统计：送达本地协议栈的包、队列丢包与无路由丢包。
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    pub unroutable_pkts: u64,
}
