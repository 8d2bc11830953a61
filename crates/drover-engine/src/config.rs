//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] collects every tunable of the guidance pipeline.
//! [`validate()`](EngineConfig::validate) checks structural invariants at
//! construction; a misconfigured engine is the only condition this
//! subsystem refuses to start from — everything at runtime degrades
//! instead of failing.

use std::error::Error;
use std::fmt;

// ── MovementConfig ────────────────────────────────────────────────

/// Tunables for the per-agent movement step.
#[derive(Clone, Debug)]
pub struct MovementConfig {
    /// Whether the local separation pass runs. Default: true.
    pub use_local_avoidance: bool,
    /// Weight of the separation offset relative to the field step.
    /// Default: 0.6.
    pub separation_strength: f32,
    /// Speed multiplier applied on the no-field fallback path.
    /// Default: 0.25.
    pub fallback_speed_factor: f32,
    /// Direction magnitudes at or below this sample as "no guidance".
    /// Default: 0.01.
    pub direction_epsilon: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            use_local_avoidance: true,
            separation_strength: 0.6,
            fallback_speed_factor: 0.25,
            direction_epsilon: drover_field::DIRECTION_EPSILON,
        }
    }
}

// ── EngineConfig ──────────────────────────────────────────────────

/// Complete configuration for constructing an [`Engine`](crate::Engine).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Spatial index bucket edge length, in world units. Default: 20.0.
    pub spatial_cell_size: f32,
    /// Coordinate quantization tolerance for cache keys, in world units.
    /// Requests within this tolerance share one field. Default: 0.5.
    pub cache_tolerance: f32,
    /// Cache entries untouched longer than this are evicted, in time
    /// units. Matches the field refresh interval. Default: 5.0.
    pub cache_retention: f64,
    /// Maximum field generations per tick. Default: 5.
    pub max_generations_per_tick: usize,
    /// Minimum clustered agents for a demand request to be honored.
    /// Default: 5.
    pub min_shared_agents: usize,
    /// Radius around a request center within which agents count toward
    /// demand. Default: 15.0.
    pub sharing_distance: f32,
    /// Request queue depth cap; oldest-excess requests are discarded (a
    /// degraded-service condition, counted and logged). Default: 256.
    pub queue_depth_cap: usize,
    /// Coverage half-extent used for demand-generated requests.
    /// Default: 24.0.
    pub default_field_radius: f32,
    /// Grid cell size used for demand-generated requests. Default: 1.0.
    pub field_cell_size: f32,
    /// Distance thresholds splitting the four LOD tiers, ascending.
    /// Default: `[30.0, 100.0, 300.0]`.
    pub lod_thresholds: [f32; 3],
    /// Movement worker threads. `None` = auto-detect
    /// (`available_parallelism / 2`, clamped to `[1, 8]`).
    pub worker_count: Option<usize>,
    /// Movement tunables.
    pub movement: MovementConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spatial_cell_size: 20.0,
            cache_tolerance: 0.5,
            cache_retention: 5.0,
            max_generations_per_tick: 5,
            min_shared_agents: 5,
            sharing_distance: 15.0,
            queue_depth_cap: 256,
            default_field_radius: 24.0,
            field_cell_size: 1.0,
            lod_thresholds: [30.0, 100.0, 300.0],
            worker_count: None,
            movement: MovementConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Check all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("spatial_cell_size", self.spatial_cell_size),
            ("cache_tolerance", self.cache_tolerance),
            ("sharing_distance", self.sharing_distance),
            ("default_field_radius", self.default_field_radius),
            ("field_cell_size", self.field_cell_size),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if !self.cache_retention.is_finite() || self.cache_retention <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "cache_retention",
                value: self.cache_retention as f32,
            });
        }
        if self.max_generations_per_tick == 0 {
            return Err(ConfigError::ZeroBudget {
                name: "max_generations_per_tick",
            });
        }
        if self.queue_depth_cap == 0 {
            return Err(ConfigError::ZeroBudget {
                name: "queue_depth_cap",
            });
        }
        let [a, b, c] = self.lod_thresholds;
        if !(a > 0.0 && a < b && b < c) || !c.is_finite() {
            return Err(ConfigError::LodThresholdsNotAscending {
                thresholds: self.lod_thresholds,
            });
        }
        if self.movement.separation_strength < 0.0
            || !self.movement.separation_strength.is_finite()
        {
            return Err(ConfigError::NonPositive {
                name: "separation_strength",
                value: self.movement.separation_strength,
            });
        }
        if self.movement.direction_epsilon < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "direction_epsilon",
                value: self.movement.direction_epsilon,
            });
        }
        Ok(())
    }

    /// Resolve the movement worker count, applying auto-detection when
    /// unset. Explicit values are clamped to `[1, 32]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 32),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                (cpus / 2).clamp(1, 8)
            }
        }
    }
}

// ── ConfigError ───────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A tunable that must be finite and positive is not.
    NonPositive {
        /// Name of the offending tunable.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },
    /// A per-tick budget or capacity is zero.
    ZeroBudget {
        /// Name of the offending tunable.
        name: &'static str,
    },
    /// LOD thresholds must be positive and strictly ascending.
    LodThresholdsNotAscending {
        /// The rejected thresholds.
        thresholds: [f32; 3],
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive { name, value } => {
                write!(f, "{name} must be finite and positive, got {value}")
            }
            Self::ZeroBudget { name } => write!(f, "{name} must be at least 1"),
            Self::LodThresholdsNotAscending { thresholds } => write!(
                f,
                "lod_thresholds must be positive and strictly ascending, got {thresholds:?}"
            ),
        }
    }
}

impl Error for ConfigError {}
