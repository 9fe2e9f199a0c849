//! 世界 trait
//!
//! 事件通过 `as_any_mut` 向下转型拿到具体的世界状态。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：集合通信状态、传输层与路由器的拥有者。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每个事件执行之后调用。
    fn on_tick(&mut self, _sim: &mut Simulator) {}

    /// 出现致命错误后返回 true，仿真器随即清空队列并停止。
    fn halted(&self) -> bool {
        false
    }
}
