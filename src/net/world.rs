//! 集合通信世界
//!
//! [`CollectiveWorld`] 拥有所有 stream、算法实例（arena）、路由器与传输层
//! 状态。事件经由 [`CollectiveWorld::drive`] 把输入交给对应的算法实例，
//! 再根据实例的退出请求推进 stream 的下一个 phase。

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, trace};

use super::events::{PacketReceived, StreamInit};
use super::stats::{Stats, StreamRecord};
use super::transport::{LinkModel, Mailbox, SimTransport, deliver_event, push_viz};
use crate::cc::{
    Algorithm, AlgorithmHandle, AlgorithmSpec, Arena, DimensionScheduler, DistributionTable,
    EngineCtx, EngineEvent, Phase, SimRequest, SizingInputs, Stream, StreamId, StreamOwner,
    StreamState,
};
use crate::config::{SimConfig, SimSetup};
use crate::error::{EngineError, SimError};
use crate::fault::FaultRegistry;
use crate::route::AdaptiveRouter;
use crate::sim::{SimTime, Simulator, World};
use crate::topo::{NodeId, TorusShape};
use crate::viz::{VizEvent, VizEventKind, VizLogger, VizMeta};

/// 记录算法实例在一次调用中提出的 phase 结束请求。
#[derive(Debug, Default)]
struct PhaseOwner {
    advance: bool,
}

impl StreamOwner for PhaseOwner {
    fn declare_ready(&mut self, stream: &mut Stream) {
        stream.change_state(StreamState::Ready);
    }

    fn advance_to_next_dimension(&mut self, _stream: &mut Stream) {
        self.advance = true;
    }
}

/// 运行结束后的汇总
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub nodes: usize,
    pub dims: Vec<usize>,
    pub collective: String,
    pub routing: String,
    pub streams: usize,
    pub finished: usize,
    pub unfinished: usize,
    pub makespan_ns: u64,
    pub events: u64,
    pub bundles: u64,
    pub messages: u64,
    pub bytes: u64,
    pub hops: u64,
    pub phases: u64,
    pub pending_recvs: usize,
    pub unmatched_messages: usize,
}

fn state_name(state: StreamState) -> String {
    format!("{state:?}").to_lowercase()
}

pub struct CollectiveWorld {
    config: SimConfig,
    shape: TorusShape,
    faults: Arc<FaultRegistry>,
    router: AdaptiveRouter,
    scheduler: DimensionScheduler,
    distribution: Option<Arc<DistributionTable>>,
    links: LinkModel,
    mailbox: Mailbox,
    streams: BTreeMap<(NodeId, StreamId), Stream>,
    algorithms: Arena<Algorithm>,
    pub stats: Stats,
    pub viz: Option<VizLogger>,
    error: Option<SimError>,
}

impl CollectiveWorld {
    pub fn new(setup: SimSetup) -> Self {
        let SimSetup {
            config,
            shape,
            faults,
            router,
            scheduler,
            distribution,
        } = setup;
        let links = LinkModel {
            link_latency: SimTime(config.link_latency_ns),
            link_gbps: config.link_gbps,
            endpoint_delay: SimTime(config.endpoint_delay_ns),
        };
        Self {
            config,
            shape,
            faults,
            router,
            scheduler,
            distribution,
            links,
            mailbox: Mailbox::default(),
            streams: BTreeMap::new(),
            algorithms: Arena::default(),
            stats: Stats::default(),
            viz: None,
            error: None,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn shape(&self) -> &TorusShape {
        &self.shape
    }

    pub fn router(&self) -> &AdaptiveRouter {
        &self.router
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn stream(&self, node: NodeId, id: StreamId) -> Option<&Stream> {
        self.streams.get(&(node, id))
    }

    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.streams.values()
    }

    pub fn live_algorithms(&self) -> usize {
        self.algorithms.len()
    }

    pub fn error(&self) -> Option<&SimError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<SimError> {
        self.error.take()
    }

    /// 开启可视化记录并写入 meta 事件。
    pub fn enable_viz(&mut self) {
        let mut viz = VizLogger::default();
        viz.push(VizEvent {
            t_ns: 0,
            node: None,
            stream: None,
            kind: VizEventKind::Meta(VizMeta {
                dims: self.shape.extents().to_vec(),
                nodes: self.shape.len(),
                collective: self.config.collective.name().to_string(),
                algorithm: format!("{:?}", self.config.algorithm).to_lowercase(),
                routing: self.router.algorithm().name().to_string(),
                failed_links: self
                    .faults
                    .links()
                    .iter()
                    .map(|l| {
                        let (a, b) = l.endpoints();
                        (a.0, b.0)
                    })
                    .collect(),
                link_latency_ns: self.links.link_latency.0,
                link_gbps: self.links.link_gbps,
            }),
        });
        self.viz = Some(viz);
    }

    /// 为每个 chunk、每个节点创建 stream，并调度第一个 phase。
    pub fn launch(&mut self, sim: &mut Simulator) -> Result<(), SimError> {
        let splits = self.config.splits.max(1);
        let base = self.config.data_bytes / splits;
        let rem = self.config.data_bytes % splits;
        let nodes: Vec<NodeId> = self.shape.node_ids().collect();
        for chunk in 0..splits {
            let schedule = self.scheduler.get_chunk_scheduling(chunk);
            let bytes = base + u64::from(chunk < rem);
            debug!(chunk, ?schedule, bytes, "chunk schedule");
            let id = StreamId(chunk);
            for &node in &nodes {
                let stream = Stream::new(
                    id,
                    node,
                    bytes,
                    &schedule,
                    self.shape.dims(),
                    self.config.failure_type,
                );
                self.streams.insert((node, id), stream);
                self.start_next_phase(node, id, sim)?;
            }
        }
        info!(
            streams = self.streams.len(),
            nodes = nodes.len(),
            splits,
            "collective launched"
        );
        Ok(())
    }

    fn phase_spec(
        config: &SimConfig,
        shape: &TorusShape,
        faults: &FaultRegistry,
        stream: &Stream,
        phase: Phase,
    ) -> Result<AlgorithmSpec, SimError> {
        let ring = shape.ring(stream.node, phase.dimension)?;
        let sizing = SizingInputs {
            op: config.collective,
            dim: phase.dimension,
            nodes_in_ring: ring.nodes_in_ring(),
            total_nodes: shape.len(),
            dims: shape.dims(),
            max_extent: shape.max_extent(),
            failures_in_dim: faults.failures_in_dimension(phase.dimension),
            failed_ring_nodes: faults.failed_ring_nodes(),
            scheduling: config.link_failure_scheduling,
            failure_type: stream.failure_type,
            chunk_stage: stream.chunk_stage(),
        };
        Ok(AlgorithmSpec {
            variant: config.algorithm,
            op: config.collective,
            ring,
            direction: config.direction,
            injection: config.injection_policy,
            boost_mode: config.boost_mode,
            layer: 0,
            non_uniform: config.non_uniform,
            sizing,
        })
    }

    /// 回收当前 phase 的算法实例，开始下一个 phase；没有剩余 phase 时
    /// stream 结束。
    fn start_next_phase(
        &mut self,
        node: NodeId,
        id: StreamId,
        sim: &mut Simulator,
    ) -> Result<(), SimError> {
        let now = sim.now();
        let stream = self
            .streams
            .get_mut(&(node, id))
            .ok_or(EngineError::UnknownStream(id.0))?;
        if let Some(old) = stream.algorithm.take() {
            let finished = self.algorithms.remove(old)?;
            stream.data_size = finished.final_data_size();
            self.stats.phases_completed += 1;
        }
        let done_phases = stream.current.map(|p| p.queue_id + 1).unwrap_or(0);

        let Some(phase) = stream.next_phase() else {
            stream.change_state(StreamState::Dead);
            debug!(node = node.0, stream = id.0, data = stream.data_size, "stream done");
            self.stats.finished.push(StreamRecord {
                node,
                stream: id,
                phases: done_phases,
                finished_at: now,
                data_bytes: stream.data_size,
            });
            push_viz(
                &mut self.viz,
                VizEvent {
                    t_ns: now.0,
                    node: Some(node.0),
                    stream: Some(id.0),
                    kind: VizEventKind::StreamDone {
                        data_bytes: stream.data_size,
                    },
                },
            );
            return Ok(());
        };

        let spec = Self::phase_spec(&self.config, &self.shape, &self.faults, stream, phase)?;
        let algorithm = Algorithm::new(spec, stream.data_size, self.distribution.clone())?;
        let handle = self.algorithms.insert(algorithm);
        stream.algorithm = Some(handle);
        trace!(node = node.0, stream = id.0, dim = phase.dimension, queue = phase.queue_id, "phase start");
        push_viz(
            &mut self.viz,
            VizEvent {
                t_ns: now.0,
                node: Some(node.0),
                stream: Some(id.0),
                kind: VizEventKind::StreamState {
                    state: state_name(stream.state),
                    dimension: Some(phase.dimension),
                },
            },
        );
        sim.schedule(now, StreamInit { node, stream: id });
        Ok(())
    }

    /// 把一个引擎输入交给 stream 当前的算法实例。
    ///
    /// `notifier` 为 `None` 时使用当前实例；否则必须与当前实例一致。
    pub fn drive(
        &mut self,
        node: NodeId,
        id: StreamId,
        notifier: Option<AlgorithmHandle>,
        event: EngineEvent,
        sim: &mut Simulator,
    ) -> Result<(), SimError> {
        let now = sim.now();
        let stream = self
            .streams
            .get_mut(&(node, id))
            .ok_or(EngineError::UnknownStream(id.0))?;
        let current = stream.algorithm.ok_or(EngineError::UnknownStream(id.0))?;
        let handle = notifier.unwrap_or(current);
        if handle != current {
            return Err(EngineError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            }
            .into());
        }
        let algorithm = self.algorithms.get_mut(handle)?;
        let before = stream.state;

        let mut owner = PhaseOwner::default();
        let mut transport = SimTransport {
            sim: &mut *sim,
            router: &mut self.router,
            mailbox: &mut self.mailbox,
            links: &self.links,
            stats: &mut self.stats,
            viz: &mut self.viz,
        };
        let mut ctx = EngineCtx {
            stream: &mut *stream,
            transport: &mut transport,
            owner: &mut owner,
            handle,
        };
        algorithm.run(event, &mut ctx)?;

        if stream.state != before {
            push_viz(
                &mut self.viz,
                VizEvent {
                    t_ns: now.0,
                    node: Some(node.0),
                    stream: Some(id.0),
                    kind: VizEventKind::StreamState {
                        state: state_name(stream.state),
                        dimension: stream.current.map(|p| p.dimension),
                    },
                },
            );
        }
        if owner.advance {
            self.start_next_phase(node, id, sim)?;
        }
        Ok(())
    }

    /// 消息到达：与等待中的接收匹配，或暂存直到接收被登记。
    pub fn on_message(&mut self, req: SimRequest, sim: &mut Simulator) {
        let Some(notifier) = self.mailbox.arrive(&req) else {
            trace!(src = req.src.0, dst = req.dst.0, "message waits for its receive");
            return;
        };
        let now = sim.now();
        self.stats.messages_delivered += 1;
        push_viz(&mut self.viz, deliver_event(now, &req, req.size_bytes));
        sim.schedule(
            now,
            PacketReceived {
                node: req.dst,
                stream: req.tag.stream,
                notifier,
            },
        );
    }

    /// 保存第一个致命错误；之后仿真器停止。
    pub fn record(&mut self, res: Result<(), SimError>) {
        if let Err(err) = res {
            error!(error = %err, "fatal simulation error");
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
    }

    pub fn unfinished_streams(&self) -> usize {
        self.streams.values().filter(|s| !s.is_dead()).count()
    }

    pub fn summary(&self, sim: &Simulator) -> RunSummary {
        let unfinished = self.unfinished_streams();
        RunSummary {
            nodes: self.shape.len(),
            dims: self.shape.extents().to_vec(),
            collective: self.config.collective.name().to_string(),
            routing: self.router.algorithm().name().to_string(),
            streams: self.streams.len(),
            finished: self.streams.len() - unfinished,
            unfinished,
            makespan_ns: self.stats.makespan().0,
            events: sim.executed(),
            bundles: self.stats.bundles,
            messages: self.stats.messages_sent,
            bytes: self.stats.bytes_sent,
            hops: self.stats.total_hops,
            phases: self.stats.phases_completed,
            pending_recvs: self.mailbox.pending_recvs(),
            unmatched_messages: self.mailbox.unmatched_messages(),
        }
    }
}

impl World for CollectiveWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn halted(&self) -> bool {
        self.error.is_some()
    }
}
