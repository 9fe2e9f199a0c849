//! 仿真传输层
//!
//! 把算法实例发出的 send/recv/bundle 变成仿真事件：
//! - 消息时延 = 跳数 · 链路时延 + 串行化时间，跳数由自适应路由器逐跳给出；
//! - bundle 在端点处理时延之后完成；
//! - send 与 recv 按 `(src, dst, tag)` 先进先出匹配。

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace};

use super::events::{BundleDone, MessageArrived, PacketReceived};
use super::stats::Stats;
use crate::cc::{AlgorithmHandle, PacketBundle, SimRequest, TransferTag, Transport};
use crate::error::SimError;
use crate::route::AdaptiveRouter;
use crate::sim::{SimTime, Simulator};
use crate::topo::NodeId;
use crate::viz::{VizEvent, VizEventKind, VizLogger};

/// 链路与端点时延模型
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkModel {
    pub link_latency: SimTime,
    pub link_gbps: f64,
    pub endpoint_delay: SimTime,
}

impl LinkModel {
    /// `hops` 跳、`bytes` 字节的消息端到端时延
    pub fn message_latency(&self, hops: usize, bytes: u64) -> SimTime {
        SimTime(self.link_latency.0.saturating_mul(hops as u64))
            .after(SimTime::serialization(bytes, self.link_gbps))
    }

    /// bundle 完成时延：每经过一个处理阶段（归约、回写）多一个端点时延。
    pub fn bundle_delay(&self, bundle: &PacketBundle) -> SimTime {
        let stages = 1 + u64::from(bundle.processed) + u64::from(bundle.send_back);
        SimTime(self.endpoint_delay.0.saturating_mul(stages))
    }
}

type MatchKey = (NodeId, NodeId, TransferTag);

fn key_of(req: &SimRequest) -> MatchKey {
    (req.src, req.dst, req.tag)
}

#[derive(Debug, Clone, Copy)]
struct PostedRecv {
    notifier: AlgorithmHandle,
}

/// 尚未匹配的接收与已到达的消息
#[derive(Debug, Default)]
pub struct Mailbox {
    posted: HashMap<MatchKey, VecDeque<PostedRecv>>,
    arrived: HashMap<MatchKey, VecDeque<u64>>,
}

impl Mailbox {
    /// 登记一个接收；若已有消息到达则立即取出（返回其字节数）。
    fn post(&mut self, req: &SimRequest, notifier: AlgorithmHandle) -> Option<u64> {
        let key = key_of(req);
        if let Some(bytes) = self.arrived.get_mut(&key).and_then(VecDeque::pop_front) {
            return Some(bytes);
        }
        self.posted
            .entry(key)
            .or_default()
            .push_back(PostedRecv { notifier });
        None
    }

    /// 消息到达；若已有接收在等待则返回它的通知句柄。
    pub(crate) fn arrive(&mut self, req: &SimRequest) -> Option<AlgorithmHandle> {
        let key = key_of(req);
        if let Some(recv) = self.posted.get_mut(&key).and_then(VecDeque::pop_front) {
            return Some(recv.notifier);
        }
        self.arrived.entry(key).or_default().push_back(req.size_bytes);
        None
    }

    pub fn pending_recvs(&self) -> usize {
        self.posted.values().map(VecDeque::len).sum()
    }

    pub fn unmatched_messages(&self) -> usize {
        self.arrived.values().map(VecDeque::len).sum()
    }
}

pub(crate) fn push_viz(viz: &mut Option<VizLogger>, ev: VizEvent) {
    if let Some(v) = viz {
        v.push(ev);
    }
}

pub(crate) fn deliver_event(t: SimTime, req: &SimRequest, bytes: u64) -> VizEvent {
    VizEvent {
        t_ns: t.0,
        node: Some(req.dst.0),
        stream: Some(req.tag.stream.0),
        kind: VizEventKind::Deliver {
            src: req.src.0,
            dst: req.dst.0,
            vnet: req.tag.vnet,
            bytes,
        },
    }
}

/// 一次引擎调用期间借用世界各部分的传输层视图
pub struct SimTransport<'a> {
    pub sim: &'a mut Simulator,
    pub router: &'a mut AdaptiveRouter,
    pub mailbox: &'a mut Mailbox,
    pub links: &'a LinkModel,
    pub stats: &'a mut Stats,
    pub viz: &'a mut Option<VizLogger>,
}

impl Transport for SimTransport<'_> {
    fn send(&mut self, req: SimRequest) -> Result<(), SimError> {
        let now = self.sim.now();
        let route = self.router.trace(req.src, req.dst, req.tag.vnet)?;
        let hops = route.len();
        let arrive = now.after(self.links.message_latency(hops, req.size_bytes));

        if self.viz.is_some() {
            for (at, step) in &route {
                push_viz(
                    self.viz,
                    VizEvent {
                        t_ns: now.0,
                        node: Some(at.0),
                        stream: Some(req.tag.stream.0),
                        kind: VizEventKind::RouteHop {
                            at: at.0,
                            next: step.next.0,
                            direction: step.port.direction.to_string(),
                            channel: step.port.channel,
                        },
                    },
                );
            }
            push_viz(
                self.viz,
                VizEvent {
                    t_ns: now.0,
                    node: Some(req.src.0),
                    stream: Some(req.tag.stream.0),
                    kind: VizEventKind::Send {
                        src: req.src.0,
                        dst: req.dst.0,
                        vnet: req.tag.vnet,
                        bytes: req.size_bytes,
                        hops,
                        arrive_ns: arrive.0,
                    },
                },
            );
        }

        self.stats.messages_sent += 1;
        self.stats.bytes_sent += req.size_bytes;
        self.stats.total_hops += hops as u64;
        debug!(
            src = req.src.0,
            dst = req.dst.0,
            stream = req.tag.stream.0,
            vnet = req.tag.vnet,
            bytes = req.size_bytes,
            hops,
            ?arrive,
            "send"
        );
        self.sim.schedule(arrive, MessageArrived { req });
        Ok(())
    }

    fn recv(&mut self, req: SimRequest, notifier: AlgorithmHandle) -> Result<(), SimError> {
        if let Some(bytes) = self.mailbox.post(&req, notifier) {
            let now = self.sim.now();
            trace!(src = req.src.0, dst = req.dst.0, stream = req.tag.stream.0, "recv matched early arrival");
            self.stats.messages_delivered += 1;
            push_viz(self.viz, deliver_event(now, &req, bytes));
            self.sim.schedule(
                now,
                PacketReceived {
                    node: req.dst,
                    stream: req.tag.stream,
                    notifier,
                },
            );
        }
        Ok(())
    }

    fn notify(&mut self, bundle: PacketBundle) -> Result<(), SimError> {
        let now = self.sim.now();
        let done = now.after(self.links.bundle_delay(&bundle));
        self.stats.bundles += 1;
        self.stats.packets_released += bundle.packets.len() as u64;
        push_viz(
            self.viz,
            VizEvent {
                t_ns: now.0,
                node: Some(bundle.node.0),
                stream: Some(bundle.stream.0),
                kind: VizEventKind::Bundle {
                    packets: bundle.packets.len(),
                    processed: bundle.processed,
                    send_back: bundle.send_back,
                    destination: format!("{:?}", bundle.destination),
                    lane: format!("{:?}", bundle.lane),
                },
            },
        );
        self.sim.schedule(
            done,
            BundleDone {
                node: bundle.node,
                stream: bundle.stream,
                notifier: bundle.notifier,
            },
        );
        Ok(())
    }
}
