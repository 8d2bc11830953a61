//! Field generation requests.

use crate::cache::CacheKey;
use crate::store::FieldHandle;
use drover_core::Vec2;

/// How a request entered the scheduler, which controls demand gating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Urgency {
    /// Produced by the scheduler's own demand analysis. Only honored when
    /// enough agents are clustered near the request center to share the
    /// field; isolated agents keep their fallback instead.
    Demand,
    /// Issued directly by a caller. Bypasses demand gating.
    Explicit,
}

/// A request for one flow field, consumed once a field is produced or
/// reused from the cache.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    /// World-space center of the requested coverage area.
    pub center: Vec2,
    /// World point the field should steer toward.
    pub destination: Vec2,
    /// Half-extent of the square coverage area, in world units.
    pub radius: f32,
    /// Grid cell edge length, in world units.
    pub cell_size: f32,
    /// Quantized cache key derived from center/destination/radius.
    pub key: CacheKey,
    /// Gating class.
    pub urgency: Urgency,
    /// The pending store slot this request fulfils.
    pub handle: FieldHandle,
    /// Monotonic submission sequence number; preserves FIFO order across
    /// the channel drain.
    pub arrival_seq: u64,
}

impl GenerationRequest {
    /// Build a request, deriving its cache key with the given tolerance.
    ///
    /// `arrival_seq` is assigned by the scheduler on submission.
    pub fn new(
        center: Vec2,
        destination: Vec2,
        radius: f32,
        cell_size: f32,
        tolerance: f32,
        urgency: Urgency,
        handle: FieldHandle,
    ) -> Self {
        Self {
            center,
            destination,
            radius,
            cell_size,
            key: CacheKey::quantize(center, destination, radius, tolerance),
            urgency,
            handle,
            arrival_seq: 0,
        }
    }
}
