//! 统计信息
//!
//! 集合通信仿真的计数器与 stream 完成记录。

use serde::Serialize;

use crate::cc::StreamId;
use crate::sim::SimTime;
use crate::topo::NodeId;

/// 单个 stream 完成时的记录
#[derive(Debug, Clone, Serialize)]
pub struct StreamRecord {
    pub node: NodeId,
    pub stream: StreamId,
    pub phases: usize,
    pub finished_at: SimTime,
    /// 最后一个 phase 结束后的数据量
    pub data_bytes: u64,
}

/// 仿真统计信息
#[derive(Debug, Default, Serialize)]
pub struct Stats {
    pub bundles: u64,
    pub packets_released: u64,
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub messages_delivered: u64,
    pub total_hops: u64,
    pub phases_completed: u64,
    pub finished: Vec<StreamRecord>,
}

impl Stats {
    /// 最后一个 stream 完成的时间
    pub fn makespan(&self) -> SimTime {
        self.finished
            .iter()
            .map(|r| r.finished_at)
            .max()
            .unwrap_or(SimTime::ZERO)
    }
}
