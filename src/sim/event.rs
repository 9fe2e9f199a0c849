//! 事件 trait
//!
//! 集合通信中的每一次引擎输入（stream 启动、bundle 完成、消息到达、
//! 接收匹配）都是一个事件。

use super::simulator::Simulator;
use super::world::World;

/// 可调度的事件。`self: Box<Self>` 让事件在执行时交出所携带的数据。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);

    /// 日志中显示的事件名称（类型名最后一段）。
    fn label(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}
