//! Engine configuration, validation, and error types.
//!
//! [`FellConfig`] is shared by every scheduler a [`Dispatcher`] creates.
//! [`validate()`](FellConfig::validate) checks all structural invariants
//! up front so the hot path can rely on them.
//!
//! [`Dispatcher`]: crate::Dispatcher

use std::error::Error;
use std::fmt;
use std::time::Duration;

use fell_core::Implement;

/// Deepest forward-search depth the visit record can carry.
pub const MAX_SEARCH_DEPTH: u8 = 126;

/// Largest search radius relative to a job's origin, per axis.
pub const MAX_SEARCH_RANGE: i32 = 255;

// ── SearchRange ────────────────────────────────────────────────────

/// Bounding box of the searches, relative to the job origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchRange {
    /// Maximum `|dx|` and `|dz|`. Default: 255.
    pub horizontal: i32,
    /// Maximum `|dy|`. Default: 255.
    pub vertical: i32,
}

impl Default for SearchRange {
    fn default() -> Self {
        Self {
            horizontal: MAX_SEARCH_RANGE,
            vertical: MAX_SEARCH_RANGE,
        }
    }
}

impl SearchRange {
    /// Whether a displacement from the origin lies inside the box.
    pub fn contains(&self, (dx, dy, dz): (i32, i32, i32)) -> bool {
        dx.abs() <= self.horizontal && dz.abs() <= self.horizontal && dy.abs() <= self.vertical
    }
}

// ── LogLimitConfig ─────────────────────────────────────────────────

/// How many trunk voxels one job may destroy.
#[derive(Clone, Debug, PartialEq)]
pub struct LogLimitConfig {
    /// Allowance for an actor job before tool bonuses. Default: 64.
    pub base: u32,
    /// Extra allowance per implement tier. Default: 32.
    pub per_tier_bonus: u32,
    /// Fractional increase per felling level. Default: 0.5.
    pub enchantment_bonus: f64,
    /// Cap for jobs without an initiating actor. Default: 256.
    pub non_actor_limit: u32,
}

impl Default for LogLimitConfig {
    fn default() -> Self {
        Self {
            base: 64,
            per_tier_bonus: 32,
            enchantment_bonus: 0.5,
            non_actor_limit: 256,
        }
    }
}

impl LogLimitConfig {
    /// Resolve the cap for a job.
    ///
    /// `implement` only counts when the oracle confirmed it usable.
    pub fn limit_for(&self, has_actor: bool, implement: Option<&Implement>) -> usize {
        if !has_actor {
            return self.non_actor_limit.max(1) as usize;
        }
        let (tier, level) = implement
            .map(|i| (u32::from(i.tier), f64::from(i.felling_level)))
            .unwrap_or((0, 0.0));
        let linear = self.base.saturating_add(self.per_tier_bonus.saturating_mul(tier));
        let scaled = f64::from(linear) * (1.0 + self.enchantment_bonus * level);
        (scaled.floor() as usize).max(1)
    }
}

// ── FoliageConfig ──────────────────────────────────────────────────

/// Foliage discovery and clearing.
#[derive(Clone, Debug, PartialEq)]
pub struct FoliageConfig {
    /// Whether jobs discover and clear foliage at all. Default: true.
    pub enabled: bool,
    /// Largest expected distance the search will propagate to. Default: 8.
    pub max_search_distance: u8,
    /// Cap on foliage voxels claimed by one job. Default: 4096.
    pub max_voxels: usize,
}

impl Default for FoliageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_search_distance: 8,
            max_voxels: 4096,
        }
    }
}

// ── FallConfig ─────────────────────────────────────────────────────

/// How doomed trunk voxels leave the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallMode {
    /// Break every trunk voxel in place.
    Clear,
    /// Lift the trunk out bottom-to-top, then respawn it top-to-bottom as
    /// falling bodies.
    Intact,
}

/// Falling and centre-of-mass parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct FallConfig {
    /// Destruction mode. Default: [`FallMode::Clear`].
    pub mode: FallMode,
    /// Falling bodies allowed in a world at once. Default: 256.
    pub max_falling_bodies: usize,
    /// Horizontal speed per block of height above the origin. Default: 0.05.
    pub velocity_scale: f32,
    /// Centre-of-mass weight of a trunk voxel. Default: 4.
    pub trunk_weight: u32,
    /// Centre-of-mass weight of a foliage voxel. Default: 1.
    pub foliage_weight: u32,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            mode: FallMode::Clear,
            max_falling_bodies: 256,
            velocity_scale: 0.05,
            trunk_weight: 4,
            foliage_weight: 1,
        }
    }
}

// ── DropConfig ─────────────────────────────────────────────────────

/// How item drops are handed to the sink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DropConfig {
    /// Merge all drops into one batch at the origin. Default: false.
    pub consolidate: bool,
    /// Address drops to the initiating actor. Default: false.
    pub deliver_to_actor: bool,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`FellConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// tick_rate_hz is NaN, infinite, zero, or negative.
    InvalidTickRate {
        /// The invalid value.
        value: f64,
    },
    /// tick_time_fraction is outside `(0, 1]`.
    InvalidTickFraction {
        /// The invalid value.
        value: f64,
    },
    /// A count that must be at least 1 is zero.
    ZeroLimit {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A per-second rate is NaN, infinite, zero, or negative.
    InvalidRate {
        /// Name of the offending field.
        field: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// max_search_depth exceeds [`MAX_SEARCH_DEPTH`].
    SearchDepthTooLarge {
        /// The configured depth.
        configured: u8,
    },
    /// A search range axis is negative or exceeds [`MAX_SEARCH_RANGE`].
    InvalidSearchRange {
        /// The configured range.
        range: SearchRange,
    },
    /// LogLimitConfig invariant violated.
    InvalidLogLimit {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// FallConfig invariant violated.
    InvalidFall {
        /// Description of which invariant was violated.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTickRate { value } => {
                write!(f, "tick_rate_hz must be finite and positive, got {value}")
            }
            Self::InvalidTickFraction { value } => {
                write!(f, "tick_time_fraction must be in (0, 1], got {value}")
            }
            Self::ZeroLimit { field } => write!(f, "{field} must be at least 1"),
            Self::InvalidRate { field, value } => {
                write!(f, "{field} must be finite and positive, got {value}")
            }
            Self::SearchDepthTooLarge { configured } => {
                write!(
                    f,
                    "max_search_depth {configured} exceeds maximum of {MAX_SEARCH_DEPTH}"
                )
            }
            Self::InvalidSearchRange { range } => write!(
                f,
                "search range {}x{} outside 0..={MAX_SEARCH_RANGE}",
                range.horizontal, range.vertical
            ),
            Self::InvalidLogLimit { reason } => write!(f, "invalid log limit: {reason}"),
            Self::InvalidFall { reason } => write!(f, "invalid fall config: {reason}"),
        }
    }
}

impl Error for ConfigError {}

// ── FellConfig ─────────────────────────────────────────────────────

/// Complete configuration for the engine, schedulers, and limiters.
#[derive(Clone, Debug, PartialEq)]
pub struct FellConfig {
    /// Host simulation tick rate. Default: 20.
    pub tick_rate_hz: f64,
    /// Fraction of each tick's wall-clock time the engine may use. Default: 0.1.
    pub tick_time_fraction: f64,
    /// Work units between clock reads. Default: 16.
    pub clock_check_interval: u32,
    /// Search probes one engine step may perform. Default: 256.
    pub search_units_per_step: u32,
    /// Jobs running concurrently per space. Default: 4.
    pub max_concurrent_jobs: usize,
    /// Jobs waiting per space before submissions are refused. Default: 256.
    pub max_pending_jobs: usize,
    /// Ticks a job may live before it is forced to finish. Default: 1200.
    pub max_job_age_ticks: u64,
    /// Destructive work (breaks and lifts) allowed per second per space. Default: 160.
    pub breaks_per_second: f64,
    /// Break effects allowed per second per space. Default: 16.
    pub effects_per_second: f64,
    /// Forward-search depth cap. Default: 126.
    pub max_search_depth: u8,
    /// Search bounding box.
    pub search_range: SearchRange,
    /// Trunk destruction cap.
    pub log_limit: LogLimitConfig,
    /// Foliage discovery.
    pub foliage: FoliageConfig,
    /// Falling behaviour.
    pub fall: FallConfig,
    /// Drop emission.
    pub drops: DropConfig,
    /// Seed for the drift fallback when a structure is perfectly balanced.
    pub seed: u64,
}

impl Default for FellConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            tick_time_fraction: 0.1,
            clock_check_interval: 16,
            search_units_per_step: 256,
            max_concurrent_jobs: 4,
            max_pending_jobs: 256,
            max_job_age_ticks: 1200,
            breaks_per_second: 160.0,
            effects_per_second: 16.0,
            max_search_depth: MAX_SEARCH_DEPTH,
            search_range: SearchRange::default(),
            log_limit: LogLimitConfig::default(),
            foliage: FoliageConfig::default(),
            fall: FallConfig::default(),
            drops: DropConfig::default(),
            seed: 0,
        }
    }
}

impl FellConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Tick rate must be finite and positive, and its reciprocal too
        //    (subnormals would overflow Duration::from_secs_f64).
        let hz = self.tick_rate_hz;
        if !hz.is_finite() || hz <= 0.0 || !(1.0 / hz).is_finite() {
            return Err(ConfigError::InvalidTickRate { value: hz });
        }
        // 2. Fraction of the tick the engine may spend.
        let frac = self.tick_time_fraction;
        if !frac.is_finite() || frac <= 0.0 || frac > 1.0 {
            return Err(ConfigError::InvalidTickFraction { value: frac });
        }
        // 3. Counts.
        for (field, value) in [
            ("clock_check_interval", self.clock_check_interval as usize),
            ("search_units_per_step", self.search_units_per_step as usize),
            ("max_concurrent_jobs", self.max_concurrent_jobs),
            ("max_pending_jobs", self.max_pending_jobs),
            ("max_job_age_ticks", self.max_job_age_ticks as usize),
            ("foliage.max_voxels", self.foliage.max_voxels),
            ("fall.max_falling_bodies", self.fall.max_falling_bodies),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }
        // 4. Rates.
        for (field, value) in [
            ("breaks_per_second", self.breaks_per_second),
            ("effects_per_second", self.effects_per_second),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidRate { field, value });
            }
        }
        // 5. Search bounds.
        if self.max_search_depth > MAX_SEARCH_DEPTH {
            return Err(ConfigError::SearchDepthTooLarge {
                configured: self.max_search_depth,
            });
        }
        let r = self.search_range;
        if !(0..=MAX_SEARCH_RANGE).contains(&r.horizontal)
            || !(0..=MAX_SEARCH_RANGE).contains(&r.vertical)
        {
            return Err(ConfigError::InvalidSearchRange { range: r });
        }
        // 6. Log limit.
        let l = &self.log_limit;
        if l.base == 0 {
            return Err(ConfigError::InvalidLogLimit {
                reason: "base must be at least 1".to_string(),
            });
        }
        if l.non_actor_limit == 0 {
            return Err(ConfigError::InvalidLogLimit {
                reason: "non_actor_limit must be at least 1".to_string(),
            });
        }
        if !l.enchantment_bonus.is_finite() || l.enchantment_bonus < 0.0 {
            return Err(ConfigError::InvalidLogLimit {
                reason: format!(
                    "enchantment_bonus must be finite and >= 0.0, got {}",
                    l.enchantment_bonus
                ),
            });
        }
        // 7. Fall parameters.
        let fall = &self.fall;
        if !fall.velocity_scale.is_finite() || fall.velocity_scale < 0.0 {
            return Err(ConfigError::InvalidFall {
                reason: format!(
                    "velocity_scale must be finite and >= 0.0, got {}",
                    fall.velocity_scale
                ),
            });
        }
        if fall.trunk_weight == 0 {
            return Err(ConfigError::InvalidFall {
                reason: "trunk_weight must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Wall-clock duration of one host tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    /// Wall-clock time the engine may spend per space tick.
    pub fn tick_time_budget(&self) -> Duration {
        Duration::from_secs_f64(self.tick_time_fraction / self.tick_rate_hz)
    }
}
