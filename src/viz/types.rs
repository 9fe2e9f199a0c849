use serde::{Deserialize, Serialize};

/// 可视化事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEventKind {
    /// 仿真/拓扑元信息（作为 t=0 的第一条事件）
    Meta(VizMeta),
    /// stream 状态迁移
    StreamState { state: String, dimension: Option<usize> },
    /// 算法实例释放一批 packet 到内存总线
    Bundle {
        packets: usize,
        processed: bool,
        send_back: bool,
        destination: String,
        lane: String,
    },
    /// 点对点消息发出
    Send {
        src: usize,
        dst: usize,
        vnet: usize,
        bytes: u64,
        hops: usize,
        arrive_ns: u64,
    },
    /// 消息与接收匹配，通知接收方
    Deliver {
        src: usize,
        dst: usize,
        vnet: usize,
        bytes: u64,
    },
    /// 路由器为一条消息做出的逐跳决策
    RouteHop {
        at: usize,
        next: usize,
        direction: String,
        channel: usize,
    },
    /// stream 的所有 phase 完成
    StreamDone { data_bytes: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizMeta {
    pub dims: Vec<usize>,
    pub nodes: usize,
    pub collective: String,
    pub algorithm: String,
    pub routing: String,
    /// 故障链路（无向）
    pub failed_links: Vec<(usize, usize)>,
    /// 单向传播时延（ns）
    pub link_latency_ns: u64,
    pub link_gbps: f64,
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub node: Option<usize>,
    pub stream: Option<u64>,
    #[serde(flatten)]
    pub kind: VizEventKind,
}

/// 一个简单的事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct VizLogger {
    pub events: Vec<VizEvent>,
}

impl VizLogger {
    pub fn push(&mut self, ev: VizEvent) {
        self.events.push(ev);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events)
    }
}
