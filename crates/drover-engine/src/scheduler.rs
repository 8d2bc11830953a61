//! Bounded request queue and the per-tick scheduling step.
//!
//! Requests flow through a bounded multi-producer channel into a FIFO
//! pending queue, stamped with monotonic arrival sequence numbers so
//! ordering stays deterministic across the drain. Each tick,
//! [`process`](RequestScheduler::process) handles up to a fixed budget of
//! requests: cache hit → reuse; miss → demand gate → generate. Everything
//! past the budget waits for the next tick; only the depth cap ever
//! discards work, and that discard is counted and logged as degraded
//! service, never surfaced as an error.

use crate::metrics::TickMetrics;
use crate::spatial::SpatialIndex;
use crossbeam_channel::{bounded, Receiver, Sender};
use drover_core::Vec2;
use drover_field::{
    CacheKey, FieldCache, FieldGenerator, FieldHandle, FieldStore, GenerationRequest, Urgency,
};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// Accepts generation requests, reuses cached fields, and throttles
/// generation to a per-tick budget.
pub struct RequestScheduler {
    tx: Sender<GenerationRequest>,
    rx: Receiver<GenerationRequest>,
    pending: VecDeque<GenerationRequest>,
    /// Keys with a request in flight, mapped to their pending handle.
    /// Collapses duplicate requests before they ever reach the queue.
    in_flight: IndexMap<CacheKey, FieldHandle>,
    tolerance: f32,
    depth_cap: usize,
    max_per_tick: usize,
    min_shared_agents: usize,
    sharing_distance: f32,
    next_seq: u64,
    discarded: u64,
}

impl RequestScheduler {
    /// Create a scheduler.
    ///
    /// `tolerance` is the cache quantization tolerance; the gating
    /// parameters come from the engine config.
    pub fn new(
        tolerance: f32,
        depth_cap: usize,
        max_per_tick: usize,
        min_shared_agents: usize,
        sharing_distance: f32,
    ) -> Self {
        // The channel only bounds in-transit submissions; the semantic
        // depth cap (oldest-first discard) is enforced on the pending
        // queue after the drain, so the channel gets headroom.
        let (tx, rx) = bounded(depth_cap.saturating_mul(2));
        Self {
            tx,
            rx,
            pending: VecDeque::new(),
            in_flight: IndexMap::new(),
            tolerance,
            depth_cap,
            max_per_tick,
            min_shared_agents,
            sharing_distance,
            next_seq: 0,
            discarded: 0,
        }
    }

    /// Resolve a field for the given area: cached handle when one is
    /// live, the in-flight pending handle when an equivalent request is
    /// already queued, otherwise a fresh pending handle whose request is
    /// enqueued. Never blocks.
    ///
    /// When the submission channel itself is saturated the new request is
    /// discarded (degraded service): the returned handle is already
    /// stale and reads as absent, which re-enters the demand loop next
    /// tick.
    #[allow(clippy::too_many_arguments)]
    pub fn request(
        &mut self,
        center: Vec2,
        destination: Vec2,
        radius: f32,
        cell_size: f32,
        urgency: Urgency,
        store: &mut FieldStore,
        cache: &mut FieldCache,
        now: f64,
    ) -> FieldHandle {
        let key = CacheKey::quantize(center, destination, radius, self.tolerance);

        if let Some(cached) = cache.lookup(&key) {
            if store.get(cached).is_some() {
                cache.touch(&key, now);
                return cached;
            }
        }
        if let Some(&pending) = self.in_flight.get(&key) {
            if store.is_pending(pending) {
                return pending;
            }
            self.in_flight.shift_remove(&key);
        }

        let handle = store.allocate_pending();
        let mut request =
            GenerationRequest::new(center, destination, radius, cell_size, self.tolerance, urgency, handle);
        request.arrival_seq = self.next_seq;
        self.next_seq += 1;

        if self.tx.try_send(request).is_err() {
            self.discarded += 1;
            store.invalidate(handle);
            tracing::warn!(
                %handle,
                queued = self.pending.len(),
                "request channel saturated; discarding new request"
            );
        } else {
            self.in_flight.insert(key, handle);
        }
        handle
    }

    /// Drain the channel and handle up to the per-tick budget of
    /// requests. Runs only from the scheduling phase (single writer over
    /// the store and cache).
    pub fn process(
        &mut self,
        now: f64,
        store: &mut FieldStore,
        cache: &mut FieldCache,
        generator: &FieldGenerator,
        spatial: &SpatialIndex,
        metrics: &mut TickMetrics,
    ) {
        while let Ok(request) = self.rx.try_recv() {
            self.pending.push_back(request);
        }
        // FIFO by submission order, stable across the channel drain.
        self.pending
            .make_contiguous()
            .sort_unstable_by_key(|r| r.arrival_seq);

        // Depth cap: shed the oldest excess. Their handles go stale so
        // waiting agents fall back and re-request.
        while self.pending.len() > self.depth_cap {
            let dropped = self.pending.pop_front().expect("len checked");
            self.discarded += 1;
            self.in_flight.shift_remove(&dropped.key);
            store.invalidate(dropped.handle);
            tracing::warn!(
                handle = %dropped.handle,
                depth_cap = self.depth_cap,
                "request queue over depth cap; discarding oldest request"
            );
        }

        for _ in 0..self.max_per_tick {
            let Some(request) = self.pending.pop_front() else {
                break;
            };

            // The slot may have been invalidated while queued.
            if !store.is_pending(request.handle) {
                self.in_flight.shift_remove(&request.key);
                continue;
            }

            // Cache first; only generate on a miss.
            if let Some(cached) = cache.lookup(&request.key) {
                if let Some(field) = store.get(cached).cloned() {
                    cache.touch(&request.key, now);
                    store.fulfil(request.handle, field);
                    self.in_flight.shift_remove(&request.key);
                    metrics.cache_hits += 1;
                    continue;
                }
            }

            // Demand gate: a field is only worth generating when enough
            // agents are clustered to share it.
            if request.urgency == Urgency::Demand {
                let clustered =
                    spatial.count_agents_within(request.center, self.sharing_distance);
                if clustered < self.min_shared_agents {
                    self.in_flight.shift_remove(&request.key);
                    store.invalidate(request.handle);
                    metrics.requests_gated += 1;
                    tracing::debug!(
                        clustered,
                        required = self.min_shared_agents,
                        "demand request gated; agents keep direct steering"
                    );
                    continue;
                }
            }

            metrics.cache_misses += 1;
            let field = Arc::new(generator.generate(&request));
            let handle = if store.fulfil(request.handle, Arc::clone(&field)) {
                request.handle
            } else {
                store.insert_ready(field)
            };
            if let Some(replaced) = cache.insert(request.key, handle, now) {
                if replaced != handle {
                    store.release_cache(replaced);
                }
            }
            store.acquire_cache(handle);
            self.in_flight.shift_remove(&request.key);
            metrics.fields_generated += 1;
        }

        metrics.requests_discarded = self.discarded;
    }

    /// Requests still waiting in the pending queue.
    pub fn queued(&self) -> usize {
        self.pending.len() + self.rx.len()
    }

    /// Cumulative requests discarded by capacity limits.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
