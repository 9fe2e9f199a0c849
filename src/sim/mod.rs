//! 仿真核心模块
//!
//! 事件驱动仿真核心：仿真时间、事件、世界和仿真器。集合通信引擎
//! 与传输层都通过事件在这里推进。

// 子模块声明
mod event;
mod simulator;
mod time;
mod world;

// 重新导出公共接口
pub use event::Event;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
