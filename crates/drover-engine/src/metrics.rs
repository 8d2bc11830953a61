//! Per-tick metrics for the guidance pipeline.
//!
//! [`TickMetrics`] captures timing and cache/scheduler behavior for a
//! single tick. Degraded-service conditions (request discards) surface
//! here as cumulative counters — they are never errors.

/// Timing and behavior metrics for one tick.
///
/// Durations are in microseconds. Per-tick fields reset every tick;
/// fields documented as cumulative count since engine construction.
#[derive(Clone, Debug, Default)]
pub struct TickMetrics {
    /// Wall-clock time for the whole tick.
    pub total_us: u64,
    /// Time spent rebuilding the spatial index.
    pub spatial_rebuild_us: u64,
    /// Time spent draining and processing the request queue.
    pub scheduling_us: u64,
    /// Time spent planning and applying movement.
    pub movement_us: u64,
    /// Fields generated this tick.
    pub fields_generated: u32,
    /// Requests satisfied from the cache this tick.
    pub cache_hits: u32,
    /// Requests that missed the cache this tick.
    pub cache_misses: u32,
    /// Requests deferred past demand gating this tick.
    pub requests_gated: u32,
    /// Cache entries evicted this tick.
    pub fields_evicted: u32,
    /// Agents that moved on the fallback path this tick.
    pub agents_on_fallback: u32,
    /// Cumulative requests discarded by the queue depth cap.
    pub requests_discarded: u64,
}

impl TickMetrics {
    /// Reset the per-tick fields, preserving cumulative counters.
    pub(crate) fn begin_tick(&mut self) {
        let discarded = self.requests_discarded;
        *self = Self {
            requests_discarded: discarded,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_tick_preserves_cumulative_counters() {
        let mut m = TickMetrics {
            total_us: 100,
            cache_hits: 3,
            requests_discarded: 7,
            ..Default::default()
        };
        m.begin_tick();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.cache_hits, 0);
        assert_eq!(m.requests_discarded, 7);
    }
}
