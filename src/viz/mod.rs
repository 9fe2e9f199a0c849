//! 可视化事件记录（用于离线回放）
//!
//! 用结构化 JSON 事件描述 stream 状态、bundle 释放、消息收发与逐跳路由，
//! 而不是解析文本日志。

mod types;

pub use types::{VizEvent, VizEventKind, VizLogger, VizMeta};
