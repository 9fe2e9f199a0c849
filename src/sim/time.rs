//! 仿真时间类型
//!
//! 纳秒精度的仿真时间，以及链路/端点时延的换算。

use serde::Serialize;

/// 仿真时间（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    /// 饱和加法，避免超长仿真溢出。
    pub fn after(self, delay: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(delay.0))
    }

    /// 以 `gbps` 串行发送 `bytes` 所需时间（向上取整到纳秒）。
    pub fn serialization(bytes: u64, gbps: f64) -> SimTime {
        if gbps <= 0.0 {
            return SimTime(u64::MAX / 4);
        }
        let ns = (bytes as f64 * 8.0 / gbps).ceil();
        SimTime(ns.min((u64::MAX / 4) as f64) as u64)
    }

    pub fn as_micros_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
