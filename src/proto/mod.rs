//! 传输层/协议模块
//!
//! 简化 TCP 与可插拔的拥塞控制（用于仿真实验）。

pub mod congestion;
pub mod tcp;
