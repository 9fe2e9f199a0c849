//! 集合通信仿真事件
//!
//! 每个事件把一次引擎输入（StreamInit / General / PacketReceived）或一次
//! 消息到达交给 [`CollectiveWorld`]。

use super::world::CollectiveWorld;
use crate::cc::{AlgorithmHandle, EngineEvent, SimRequest, StreamId};
use crate::sim::{Event, Simulator, World};
use crate::topo::NodeId;
use tracing::trace;

fn collective_world(world: &mut dyn World) -> &mut CollectiveWorld {
    world
        .as_any_mut()
        .downcast_mut::<CollectiveWorld>()
        .expect("world must be CollectiveWorld")
}

/// 事件：新 phase 的算法实例开始注入。
#[derive(Debug)]
pub struct StreamInit {
    pub node: NodeId,
    pub stream: StreamId,
}

impl Event for StreamInit {
    #[tracing::instrument(skip(self, sim, world), fields(node = self.node.0, stream = self.stream.0))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = collective_world(world);
        let res = w.drive(self.node, self.stream, None, EngineEvent::StreamInit, sim);
        w.record(res);
    }
}

/// 事件：一个 bundle 在端点处理完毕，释放一个发送槽位。
#[derive(Debug)]
pub struct BundleDone {
    pub node: NodeId,
    pub stream: StreamId,
    pub notifier: AlgorithmHandle,
}

impl Event for BundleDone {
    #[tracing::instrument(skip(self, sim, world), fields(node = self.node.0, stream = self.stream.0))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = collective_world(world);
        let res = w.drive(
            self.node,
            self.stream,
            Some(self.notifier),
            EngineEvent::General,
            sim,
        );
        w.record(res);
    }
}

/// 事件：消息到达目的节点，等待与接收匹配。
#[derive(Debug)]
pub struct MessageArrived {
    pub req: SimRequest,
}

impl Event for MessageArrived {
    #[tracing::instrument(skip(self, sim, world), fields(src = self.req.src.0, dst = self.req.dst.0))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        trace!(bytes = self.req.size_bytes, vnet = self.req.tag.vnet, "message arrived");
        collective_world(world).on_message(self.req, sim);
    }
}

/// 事件：接收已匹配，通知发起接收的算法实例。
#[derive(Debug)]
pub struct PacketReceived {
    pub node: NodeId,
    pub stream: StreamId,
    pub notifier: AlgorithmHandle,
}

impl Event for PacketReceived {
    #[tracing::instrument(skip(self, sim, world), fields(node = self.node.0, stream = self.stream.0))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = collective_world(world);
        let res = w.drive(
            self.node,
            self.stream,
            Some(self.notifier),
            EngineEvent::PacketReceived,
            sim,
        );
        w.record(res);
    }
}
