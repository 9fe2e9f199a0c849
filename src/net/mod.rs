//! 集合通信仿真的网络侧
//!
//! 此模块把集合通信引擎接到事件驱动仿真器上：世界状态、传输层（时延模型
//! 与收发匹配）、事件和统计信息。

// 子模块声明
mod events;
mod stats;
mod transport;
mod world;

// 重新导出公共接口
pub use events::{BundleDone, MessageArrived, PacketReceived, StreamInit};
pub use stats::{Stats, StreamRecord};
pub use transport::{LinkModel, Mailbox, SimTransport};
pub use world::{CollectiveWorld, RunSummary};
