//! One monitored remote-desktop session.
//!
//! [`PerformanceCoordinator`] owns every per-session component and,
//! while started, drives three tokio tasks:
//!
//! | task      | period               | work                                           |
//! |-----------|----------------------|------------------------------------------------|
//! | adapt     | `adapt_interval_ms`  | `adapt_bitrate`, send `BitrateRequest`, health |
//! | dispatch  | `batch_interval_ms`  | `get_batch`, send non-empty batch when online  |
//! | telemetry | inbound broadcast    | acks → input latency, reports → bitrate        |
//!
//! Frame ingestion and rendering are not tasks: the decoder calls
//! [`push_frame`](PerformanceCoordinator::push_frame) and the renderer
//! calls [`pop_frame`](PerformanceCoordinator::pop_frame) directly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::frame_message;
use crate::config::SessionConfig;
use crate::error::RdcError;
use crate::input::event::InputBatch;
use crate::input::gesture::{GestureTranslator, RawInput, RemoteViewport};
use crate::input::optimizer::{InputOptimizer, InputQueueStats};
use crate::message::{ControlMessage, InboundMessage};
use crate::session::frame_buffer::{FrameBufferManager, FrameBufferStats};
use crate::session::pool::{BufferPool, PoolStats};
use crate::session::quality::ConnectionQuality;
use crate::session::transmission::{BitrateDecision, TransmissionOptimizer};
use crate::session::transport::Transport;
use crate::session::types::Frame;

// ── SessionHealth ────────────────────────────────────────────────

/// Aggregate snapshot published by the adapt loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionHealth {
    pub running: bool,
    pub connected: bool,
    pub bitrate_bps: u64,
    pub last_decision: BitrateDecision,
    pub avg_rtt_ms: f64,
    pub avg_bandwidth_bps: f64,
    pub packet_loss_pct: f64,
    /// `None` until the first RTT sample arrives.
    pub quality: Option<ConnectionQuality>,
    pub frames: FrameBufferStats,
    pub frame_drop_ratio: f64,
    pub pool: PoolStats,
    pub input: InputQueueStats,
    pub batches_sent: u64,
    pub bitrate_requests: u64,
    pub send_failures: u64,
    pub meets_requirements: bool,
}

// ── Shared state ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Counters {
    batches_sent: AtomicU64,
    bitrate_requests: AtomicU64,
    send_failures: AtomicU64,
    heartbeats: AtomicU64,
}

struct Shared {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    pool: Arc<BufferPool<Vec<u8>>>,
    frames: FrameBufferManager,
    bitrate: Mutex<TransmissionOptimizer>,
    input: InputOptimizer,
    gestures: Mutex<GestureTranslator>,
    /// Sequence → send time of batches awaiting an ack.
    in_flight: Mutex<HashMap<u64, Instant>>,
    /// Most recent reported packet loss.
    packet_loss_pct: Mutex<f64>,
    counters: Counters,
    health: watch::Sender<SessionHealth>,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

// ── PerformanceCoordinator ───────────────────────────────────────

/// Session context: frame queue, buffer pool, bitrate controller,
/// input pipeline and the loops that tie them to the transport.
pub struct PerformanceCoordinator {
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl PerformanceCoordinator {
    pub fn new(
        config: SessionConfig,
        viewport: RemoteViewport,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, RdcError> {
        config.validate()?;

        let pool = Arc::new(BufferPool::for_frames(
            config.frames.pool_buffers,
            config.frames.buffer_bytes,
        ));
        let frames = FrameBufferManager::with_pool(config.frames.max_buffers, Arc::clone(&pool));
        let bitrate = TransmissionOptimizer::with_config(config.bitrate.clone())?;
        let input = InputOptimizer::with_config(&config.input);
        let gestures = GestureTranslator::new(viewport, config.gesture.clone());

        let initial = SessionHealth {
            running: false,
            connected: transport.is_connected(),
            bitrate_bps: bitrate.current_bitrate(),
            last_decision: BitrateDecision::Hold,
            avg_rtt_ms: 0.0,
            avg_bandwidth_bps: 0.0,
            packet_loss_pct: 0.0,
            quality: None,
            frames: FrameBufferStats::default(),
            frame_drop_ratio: 0.0,
            pool: pool.stats(),
            input: InputQueueStats::default(),
            batches_sent: 0,
            bitrate_requests: 0,
            send_failures: 0,
            meets_requirements: false,
        };
        let (health, _) = watch::channel(initial);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                transport,
                pool,
                frames,
                bitrate: Mutex::new(bitrate),
                input,
                gestures: Mutex::new(gestures),
                in_flight: Mutex::new(HashMap::new()),
                packet_loss_pct: Mutex::new(0.0),
                counters: Counters::default(),
                health,
            }),
            running: Mutex::new(None),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the adapt, dispatch and telemetry tasks on the current
    /// runtime. A no-op if already running.
    pub fn start(&self) -> Result<(), RdcError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RdcError::NoRuntime(e.to_string()))?;

        let mut running = self.lock_running();
        if running.is_some() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        // Subscribe before returning so no inbound message sent after
        // `start` is missed.
        let inbound = self.shared.transport.subscribe();
        let tasks = vec![
            runtime.spawn(adapt_loop(Arc::clone(&self.shared), cancel.clone())),
            runtime.spawn(dispatch_loop(Arc::clone(&self.shared), cancel.clone())),
            runtime.spawn(telemetry_loop(Arc::clone(&self.shared), inbound, cancel.clone())),
        ];
        *running = Some(Running { cancel, tasks });
        drop(running);

        info!(
            adapt_ms = self.shared.config.monitor.adapt_interval_ms,
            batch_ms = self.shared.input.batch_interval_ms(),
            "session monitoring started"
        );
        self.publish_health();
        Ok(())
    }

    /// Cancel the session tasks. Idempotent; queued frames are kept.
    /// The published health reads `running: false` once this returns.
    pub fn stop(&self) {
        let Some(running) = self.lock_running().take() else {
            return;
        };
        running.cancel.cancel();
        info!("session monitoring stopped");
        self.publish_health();
    }

    /// [`stop`](Self::stop), then wait for the tasks to wind down.
    pub async fn shutdown(&self) {
        let running = self.lock_running().take();
        if let Some(running) = running {
            running.cancel.cancel();
            for joined in futures::future::join_all(running.tasks).await {
                if let Err(e) = joined {
                    warn!("session task ended abnormally: {e}");
                }
            }
            info!("session monitoring stopped");
            self.publish_health();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    // ── Frames ───────────────────────────────────────────────────

    /// Payload buffer for the decoder to fill.
    pub fn acquire_buffer(&self) -> Vec<u8> {
        self.shared.pool.acquire()
    }

    pub fn push_frame(&self, frame: Frame) -> bool {
        self.shared.frames.push_frame(frame)
    }

    pub fn pop_frame(&self) -> Option<Frame> {
        self.shared.frames.pop_frame()
    }

    /// Newest queued frame; older ones go back to the pool. For a
    /// renderer that fell behind.
    pub fn pop_latest_frame(&self) -> Option<Frame> {
        self.shared.frames.pop_latest()
    }

    /// Return a rendered frame's payload to the pool.
    pub fn recycle_frame(&self, frame: Frame) {
        self.shared.frames.recycle(frame);
    }

    pub fn frame_stats(&self) -> FrameBufferStats {
        self.shared.frames.stats()
    }

    // ── Input ────────────────────────────────────────────────────

    /// Translate raw platform input and queue the result. Returns the
    /// number of events accepted by the input queue.
    pub fn submit_input(&self, raw: RawInput) -> usize {
        let events = lock(&self.shared.gestures).translate(raw);
        events
            .into_iter()
            .filter(|event| self.shared.input.queue_event(event.clone()))
            .count()
    }

    /// Drain the input queue directly, bypassing the dispatch loop.
    pub fn get_batch(&self) -> InputBatch {
        self.shared.input.get_batch()
    }

    pub fn record_input_latency(&self, ms: f64) {
        self.shared.input.record_latency(ms);
    }

    pub fn meets_latency_requirement(&self) -> bool {
        self.shared.input.meets_latency_requirement()
    }

    /// Replace the viewport after a resolution change.
    pub fn set_viewport(&self, viewport: RemoteViewport) {
        lock(&self.shared.gestures).set_viewport(viewport);
        debug!(?viewport, "viewport updated");
    }

    pub fn viewport(&self) -> RemoteViewport {
        lock(&self.shared.gestures).mapper().viewport()
    }

    // ── Network ──────────────────────────────────────────────────

    pub fn record_network_sample(&self, rtt_ms: f64, bandwidth_bps: f64, packet_loss_pct: f64) {
        self.shared
            .record_network_sample(rtt_ms, bandwidth_bps, packet_loss_pct);
    }

    pub fn current_bitrate(&self) -> u64 {
        lock(&self.shared.bitrate).current_bitrate()
    }

    /// Run one adaptation step outside the adapt loop.
    pub async fn adapt_now(&self) -> u64 {
        self.shared.adapt_step().await
    }

    // ── Health ───────────────────────────────────────────────────

    /// Input latency within budget and frame drops within tolerance.
    /// `false` until a latency sample and a frame exist.
    pub fn meets_requirements(&self) -> bool {
        self.shared.meets_requirements()
    }

    pub fn health(&self) -> SessionHealth {
        self.shared.snapshot(self.is_running())
    }

    /// Receiver updated on every adapt tick and lifecycle change.
    pub fn health_receiver(&self) -> watch::Receiver<SessionHealth> {
        self.shared.health.subscribe()
    }

    pub fn health_json(&self) -> Result<String, RdcError> {
        Ok(serde_json::to_string(&self.health())?)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    fn publish_health(&self) {
        self.shared.health.send_replace(self.health());
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        lock(&self.running)
    }
}

impl Drop for PerformanceCoordinator {
    fn drop(&mut self) {
        if let Some(running) = lock(&self.running).take() {
            running.cancel.cancel();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Shared operations ────────────────────────────────────────────

impl Shared {
    fn record_network_sample(&self, rtt_ms: f64, bandwidth_bps: f64, packet_loss_pct: f64) {
        {
            let mut bitrate = lock(&self.bitrate);
            bitrate.record_latency(rtt_ms);
            bitrate.record_bandwidth(bandwidth_bps);
        }
        if packet_loss_pct.is_finite() {
            *lock(&self.packet_loss_pct) = packet_loss_pct.clamp(0.0, 100.0);
        }
    }

    fn meets_requirements(&self) -> bool {
        let frames = self.frames.stats();
        self.input.meets_latency_requirement()
            && frames.pushed > 0
            && frames.drop_ratio() <= self.config.frames.max_drop_ratio
    }

    fn snapshot(&self, running: bool) -> SessionHealth {
        let (bitrate_bps, last_decision, avg_rtt_ms, avg_bandwidth_bps, rtt_samples) = {
            let b = lock(&self.bitrate);
            (
                b.current_bitrate(),
                b.last_decision(),
                b.avg_latency(),
                b.avg_bandwidth(),
                b.sample_counts().0,
            )
        };
        let packet_loss_pct = *lock(&self.packet_loss_pct);
        let frames = self.frames.stats();

        SessionHealth {
            running,
            connected: self.transport.is_connected(),
            bitrate_bps,
            last_decision,
            avg_rtt_ms,
            avg_bandwidth_bps,
            packet_loss_pct,
            quality: (rtt_samples > 0)
                .then(|| ConnectionQuality::from_metrics(avg_rtt_ms, packet_loss_pct)),
            frame_drop_ratio: frames.drop_ratio(),
            frames,
            pool: self.pool.stats(),
            input: self.input.stats(),
            batches_sent: self.counters.batches_sent.load(Ordering::Relaxed),
            bitrate_requests: self.counters.bitrate_requests.load(Ordering::Relaxed),
            send_failures: self.counters.send_failures.load(Ordering::Relaxed),
            meets_requirements: self.meets_requirements(),
        }
    }

    async fn send(&self, message: &ControlMessage) -> bool {
        let bytes = match frame_message(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(kind = message.kind(), "failed to frame message: {e}");
                return false;
            }
        };
        let ok = self.transport.send(bytes).await;
        if !ok {
            self.counters.send_failures.fetch_add(1, Ordering::Relaxed);
            debug!(kind = message.kind(), "transport rejected send");
        }
        ok
    }

    /// One adaptation step: adapt, then tell the remote side if the
    /// bitrate moved, otherwise keep the link alive.
    async fn adapt_step(&self) -> u64 {
        let (before, after) = {
            let mut bitrate = lock(&self.bitrate);
            let before = bitrate.current_bitrate();
            (before, bitrate.adapt_bitrate())
        };

        if !self.transport.is_connected() {
            return after;
        }
        if after != before {
            let request = ControlMessage::BitrateRequest { bitrate_bps: after };
            if self.send(&request).await {
                self.counters.bitrate_requests.fetch_add(1, Ordering::Relaxed);
                info!(from = before, to = after, "bitrate request sent");
            }
        } else {
            let sequence = self.counters.heartbeats.fetch_add(1, Ordering::Relaxed);
            self.send(&ControlMessage::Heartbeat { sequence }).await;
        }
        after
    }

    async fn dispatch_step(&self) {
        if !self.transport.is_connected() || self.input.pending() == 0 {
            return;
        }
        let batch = self.input.get_batch();
        if batch.is_empty() {
            return;
        }
        let sequence = batch.sequence;
        let len = batch.len();

        self.track_in_flight(sequence);
        if self.send(&ControlMessage::InputBatch(batch)).await {
            self.counters.batches_sent.fetch_add(1, Ordering::Relaxed);
            debug!(sequence, events = len, "input batch sent");
        } else {
            lock(&self.in_flight).remove(&sequence);
        }
    }

    fn track_in_flight(&self, sequence: u64) {
        let mut in_flight = lock(&self.in_flight);
        let max = self.config.monitor.max_in_flight_batches;
        if in_flight.len() >= max {
            // Forget the oldest unacked batch.
            if let Some(&oldest) = in_flight.keys().min() {
                in_flight.remove(&oldest);
            }
        }
        in_flight.insert(sequence, Instant::now());
    }

    fn on_inbound(&self, message: InboundMessage) {
        match message {
            InboundMessage::BatchAck { sequence } => {
                let sent_at = lock(&self.in_flight).remove(&sequence);
                match sent_at {
                    Some(at) => {
                        let ms = at.elapsed().as_secs_f64() * 1_000.0;
                        self.input.record_latency(ms);
                    }
                    None => debug!(sequence, "ack for unknown batch"),
                }
            }
            InboundMessage::NetworkReport {
                rtt_ms,
                bandwidth_bps,
                packet_loss_pct,
            } => self.record_network_sample(rtt_ms, bandwidth_bps, packet_loss_pct),
            InboundMessage::ViewportChanged {
                remote_width,
                remote_height,
            } => {
                if !RemoteViewport::is_plausible_remote(remote_width, remote_height) {
                    warn!(remote_width, remote_height, "ignoring implausible remote resolution");
                    return;
                }
                let mut gestures = lock(&self.gestures);
                let current = gestures.mapper().viewport();
                let viewport = RemoteViewport::new(
                    current.local_width,
                    current.local_height,
                    remote_width,
                    remote_height,
                );
                gestures.set_viewport(viewport);
                info!(remote_width, remote_height, "remote resolution changed");
            }
        }
    }
}

// ── Loops ────────────────────────────────────────────────────────

fn ticker(period_ms: u64) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(Duration::from_millis(period_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn adapt_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut interval = ticker(shared.config.monitor.adapt_interval_ms);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                shared.adapt_step().await;
                // Checked under the watch lock: a `stop` that cancels
                // during the step publishes after this and wins.
                shared
                    .health
                    .send_modify(|health| *health = shared.snapshot(!cancel.is_cancelled()));
            }
        }
    }
}

async fn dispatch_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut interval = ticker(shared.input.batch_interval_ms());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => shared.dispatch_step().await,
        }
    }
}

async fn telemetry_loop(
    shared: Arc<Shared>,
    mut inbound: broadcast::Receiver<InboundMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = inbound.recv() => match received {
                Ok(message) => shared.on_inbound(message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "telemetry receiver lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("inbound channel closed");
                    break;
                }
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::transport::ChannelTransport;
    use crate::session::types::PixelFormat;

    fn coordinator() -> (PerformanceCoordinator, crate::session::transport::RemoteEnd) {
        let (transport, remote) = ChannelTransport::pair();
        let coord = PerformanceCoordinator::new(
            SessionConfig::default(),
            RemoteViewport::new(960, 540, 1920, 1080),
            Arc::new(transport),
        )
        .unwrap();
        (coord, remote)
    }

    fn frame(coord: &PerformanceCoordinator, id: u64) -> Frame {
        let mut payload = coord.acquire_buffer();
        payload.resize(4 * 4 * 4, 0);
        Frame::new(id, payload, 4, 4, PixelFormat::Bgra8)
    }

    #[test]
    fn fresh_session_does_not_meet_requirements() {
        let (coord, _remote) = coordinator();
        assert!(!coord.meets_requirements());
        assert!(!coord.is_running());
        assert!(!coord.health().meets_requirements);
    }

    #[test]
    fn requirements_need_latency_and_frames() {
        let (coord, _remote) = coordinator();
        coord.record_input_latency(40.0);
        assert!(!coord.meets_requirements());
        assert!(coord.push_frame(frame(&coord, 0)));
        assert!(coord.meets_requirements());

        // Overrun the three-slot queue: 3 drops out of 6 pushes.
        for id in 1..6 {
            coord.push_frame(frame(&coord, id));
        }
        assert!(!coord.meets_requirements());
    }

    #[test]
    fn lagging_renderer_skips_to_latest() {
        let (coord, _remote) = coordinator();
        for id in 0..3 {
            assert!(coord.push_frame(frame(&coord, id)));
        }
        let latest = coord.pop_latest_frame().unwrap();
        assert_eq!(latest.id, 2);
        assert!(coord.pop_frame().is_none());
        assert_eq!(coord.health().pool.idle, 2);
        coord.recycle_frame(latest);
        assert_eq!(coord.health().pool.idle, 3);
    }

    #[test]
    fn start_outside_runtime_fails() {
        let (coord, _remote) = coordinator();
        assert!(matches!(coord.start(), Err(RdcError::NoRuntime(_))));
    }

    #[test]
    fn quality_needs_an_rtt_sample() {
        let (coord, _remote) = coordinator();
        assert_eq!(coord.health().quality, None);
        assert!(coord.health_json().unwrap().contains("\"quality\":null"));

        coord.record_network_sample(250.0, 3_000_000.0, 6.0);
        assert_eq!(coord.health().quality, Some(ConnectionQuality::Poor));
    }

    #[test]
    fn health_serializes_to_json() {
        let (coord, _remote) = coordinator();
        coord.record_network_sample(30.0, 8_000_000.0, 0.2);
        let json = coord.health_json().unwrap();
        assert!(json.contains("\"quality\":\"excellent\""));
        assert!(json.contains("\"bitrate_bps\":4000000"));
    }

    #[tokio::test]
    async fn adapt_now_sends_bitrate_request() {
        let (coord, mut remote) = coordinator();
        for _ in 0..5 {
            coord.record_network_sample(300.0, 2_000_000.0, 4.0);
        }
        assert_eq!(coord.adapt_now().await, 3_200_000);
        assert_eq!(
            remote.recv().await.unwrap().unwrap(),
            ControlMessage::BitrateRequest { bitrate_bps: 3_200_000 }
        );
    }

    #[tokio::test]
    async fn unchanged_bitrate_sends_heartbeat() {
        let (coord, mut remote) = coordinator();
        coord.adapt_now().await;
        assert!(matches!(
            remote.recv().await.unwrap().unwrap(),
            ControlMessage::Heartbeat { sequence: 0 }
        ));
    }

    #[test]
    fn implausible_viewport_change_is_ignored() {
        let (coord, _remote) = coordinator();
        coord.shared.on_inbound(InboundMessage::ViewportChanged {
            remote_width: u32::MAX,
            remote_height: 1080,
        });
        assert_eq!(coord.viewport(), RemoteViewport::new(960, 540, 1920, 1080));

        let accepted = coord.submit_input(RawInput::Pointer {
            action: crate::input::gesture::PointerAction::Move,
            x: 10.0,
            y: 10.0,
            timestamp: Instant::now(),
        });
        assert_eq!(accepted, 1);
        let batch = coord.get_batch();
        assert!(matches!(
            batch.events[0].kind,
            crate::input::event::InputEventKind::PointerMove { x: 20, y: 20 }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stopped_session_never_reports_running() {
        let mut config = SessionConfig::default();
        config.monitor.adapt_interval_ms = 1;
        let (transport, _remote) = ChannelTransport::pair();
        let coord = PerformanceCoordinator::new(
            config,
            RemoteViewport::new(960, 540, 1920, 1080),
            Arc::new(transport),
        )
        .unwrap();
        let health = coord.health_receiver();

        for _ in 0..20 {
            coord.start().unwrap();
            tokio::time::sleep(Duration::from_millis(3)).await;
            coord.stop();
            assert!(!health.borrow().running);
            // Let any adapt step that was mid-flight finish.
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert!(!health.borrow().running);
        }
    }

    #[test]
    fn viewport_change_keeps_local_size() {
        let (coord, _remote) = coordinator();
        coord.shared.on_inbound(InboundMessage::ViewportChanged {
            remote_width: 2560,
            remote_height: 1440,
        });
        assert_eq!(coord.viewport(), RemoteViewport::new(960, 540, 2560, 1440));
    }
}
