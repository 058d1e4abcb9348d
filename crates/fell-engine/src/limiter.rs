//! Per-tick rate limiters.
//!
//! Three independent pieces of bookkeeping gate how much work a space may
//! do per tick:
//!
//! - [`TickBudget`]: a wall-clock deadline whose clock reads are amortised
//!   over several work units.
//! - [`BreakBudget`]: destructive work (breaks and lifts) per second with a
//!   fractional carry, shared by every job in a space.
//! - [`FeedbackLimiter`]: thins break effects so at most
//!   `effects_per_second` play per one-second window.
//!
//! None of them read the clock on their own; the scheduler passes `now`
//! in or hands them a [`Clock`].

use std::time::Duration;

use fell_core::Clock;

use crate::config::FellConfig;

const WINDOW: Duration = Duration::from_secs(1);

// ── TickBudget ─────────────────────────────────────────────────────

/// Wall-clock deadline for one scheduler tick.
#[derive(Clone, Debug)]
pub struct TickBudget {
    deadline: Duration,
    interval: u32,
    countdown: u32,
    expired: bool,
}

impl TickBudget {
    /// A budget ending `budget` after `now`, checking the clock every
    /// `interval` calls to [`expired`](Self::expired).
    pub fn new(now: Duration, budget: Duration, interval: u32) -> Self {
        let interval = interval.max(1);
        Self {
            deadline: now.saturating_add(budget),
            interval,
            countdown: interval,
            expired: false,
        }
    }

    /// A budget that never expires. Useful for driving an engine outside
    /// a scheduler.
    pub fn unlimited() -> Self {
        Self {
            deadline: Duration::MAX,
            interval: u32::MAX,
            countdown: u32::MAX,
            expired: false,
        }
    }

    /// Amortised deadline check.
    ///
    /// Reads the clock once every `interval` calls. Once the deadline has
    /// been observed the budget stays expired without further reads.
    pub fn expired(&mut self, clock: &dyn Clock) -> bool {
        if self.expired {
            return true;
        }
        self.countdown -= 1;
        if self.countdown > 0 {
            return false;
        }
        self.countdown = self.interval;
        self.expired_now(clock)
    }

    /// Unamortised deadline check: always reads the clock.
    pub fn expired_now(&mut self, clock: &dyn Clock) -> bool {
        if !self.expired && clock.now() >= self.deadline {
            self.expired = true;
        }
        self.expired
    }

    /// Whether the deadline has already been observed.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// The absolute deadline on the clock's timeline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

// ── BreakBudget ────────────────────────────────────────────────────

/// Destructive-work allowance for a space.
///
/// Each tick adds `breaks_per_second / tick_rate_hz` units to a fractional
/// carry, capped at one second's worth. Whole units are handed out.
#[derive(Clone, Debug)]
pub struct BreakBudget {
    per_tick: f64,
    burst: f64,
    carry: f64,
    used_this_tick: u32,
}

impl BreakBudget {
    /// A budget derived from a validated configuration. Starts empty.
    pub fn new(config: &FellConfig) -> Self {
        Self {
            per_tick: config.breaks_per_second / config.tick_rate_hz,
            burst: config.breaks_per_second,
            carry: 0.0,
            used_this_tick: 0,
        }
    }

    /// A budget that always has units available.
    pub fn unlimited() -> Self {
        Self {
            per_tick: f64::INFINITY,
            burst: f64::INFINITY,
            carry: f64::INFINITY,
            used_this_tick: 0,
        }
    }

    /// Add one tick's allowance.
    pub fn refill(&mut self) {
        self.carry = (self.carry + self.per_tick).min(self.burst);
        self.used_this_tick = 0;
    }

    /// Whole units currently available.
    pub fn available(&self) -> u32 {
        self.carry.floor().clamp(0.0, f64::from(u32::MAX)) as u32
    }

    /// Consume one unit if one is available.
    pub fn try_take(&mut self) -> bool {
        if self.carry >= 1.0 {
            self.carry -= 1.0;
            self.used_this_tick = self.used_this_tick.saturating_add(1);
            true
        } else {
            false
        }
    }

    /// Units consumed since the last [`refill`](Self::refill).
    pub fn used_this_tick(&self) -> u32 {
        self.used_this_tick
    }

    /// Drop any accumulated allowance.
    pub fn reset(&mut self) {
        self.carry = 0.0;
        self.used_this_tick = 0;
    }
}

// ── FeedbackLimiter ────────────────────────────────────────────────

/// Thins break effects to `effects_per_second` per window.
///
/// For every break the limiter forecasts how many breaks remain in the
/// current window and spreads the remaining effect budget over them. The
/// per-break probability is added to an accumulator and an effect plays
/// each time the accumulator reaches one, so the outcome is deterministic
/// and tracks the budget on average.
#[derive(Clone, Debug)]
pub struct FeedbackLimiter {
    effects_per_window: f64,
    breaks_per_second: f64,
    window_start: Duration,
    now: Duration,
    emitted_in_window: u32,
    remaining: usize,
    probability: f64,
    accumulator: f64,
    stale: bool,
    emitted_this_tick: u32,
}

impl FeedbackLimiter {
    /// A limiter derived from a validated configuration.
    pub fn new(config: &FellConfig) -> Self {
        Self {
            effects_per_window: config.effects_per_second,
            breaks_per_second: config.breaks_per_second,
            window_start: Duration::ZERO,
            now: Duration::ZERO,
            emitted_in_window: 0,
            remaining: 0,
            probability: 0.0,
            accumulator: 0.0,
            stale: true,
            emitted_this_tick: 0,
        }
    }

    /// Open a tick at `now` with `remaining` destructions outstanding
    /// across the space. Rolls the window over when a second has passed.
    pub fn begin_tick(&mut self, now: Duration, remaining: usize) {
        if now.saturating_sub(self.window_start) >= WINDOW {
            self.window_start = now;
            self.emitted_in_window = 0;
        }
        self.now = now;
        self.remaining = remaining;
        self.emitted_this_tick = 0;
        self.stale = true;
    }

    /// Count `n` more destructions toward the current forecast.
    ///
    /// Jobs that commit mid-tick were not counted at
    /// [`begin_tick`](Self::begin_tick).
    pub fn add_remaining(&mut self, n: usize) {
        self.remaining = self.remaining.saturating_add(n);
        self.stale = true;
    }

    /// Decide whether the next break plays its effect.
    ///
    /// Decrements the outstanding-destruction count and marks the forecast
    /// stale whenever that count changes.
    pub fn should_emit(&mut self) -> bool {
        if self.stale {
            self.probability = self.forecast();
            self.stale = false;
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            self.stale = true;
        }
        self.accumulator += self.probability;
        if self.accumulator >= 1.0 {
            self.accumulator -= 1.0;
            self.emitted_in_window += 1;
            self.emitted_this_tick += 1;
            true
        } else {
            false
        }
    }

    /// Effects played since the last [`begin_tick`](Self::begin_tick).
    pub fn emitted_this_tick(&self) -> u32 {
        self.emitted_this_tick
    }

    fn forecast(&self) -> f64 {
        let left = self.effects_per_window - f64::from(self.emitted_in_window);
        if left <= 0.0 {
            return 0.0;
        }
        let window_left = WINDOW
            .saturating_sub(self.now.saturating_sub(self.window_start))
            .as_secs_f64();
        let by_rate = self.breaks_per_second * window_left;
        let expected = (self.remaining as f64).min(by_rate).max(1.0);
        (left / expected).clamp(0.0, 1.0)
    }
}

// ── SpaceLimits ──────────────────────────────────────────────────

/// The limiters shared by every job in one space.
#[derive(Clone, Debug)]
pub struct SpaceLimits {
    /// Destructive-work allowance.
    pub breaks: BreakBudget,
    /// Break-effect thinning.
    pub feedback: FeedbackLimiter,
}

impl SpaceLimits {
    /// Limiters derived from a validated configuration.
    pub fn new(config: &FellConfig) -> Self {
        Self {
            breaks: BreakBudget::new(config),
            feedback: FeedbackLimiter::new(config),
        }
    }

    /// Limiters with an unlimited break budget. Feedback is still thinned.
    pub fn unlimited(config: &FellConfig) -> Self {
        Self {
            breaks: BreakBudget::unlimited(),
            feedback: FeedbackLimiter::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct StepClock {
        now: Cell<Duration>,
        reads: Cell<u32>,
    }

    impl StepClock {
        fn at(now: Duration) -> Self {
            Self {
                now: Cell::new(now),
                reads: Cell::new(0),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> Duration {
            self.reads.set(self.reads.get() + 1);
            self.now.get()
        }
    }

    #[test]
    fn tick_budget_reads_clock_every_interval() {
        let clock = StepClock::at(Duration::ZERO);
        let mut budget = TickBudget::new(Duration::ZERO, Duration::from_millis(1), 4);
        for _ in 0..8 {
            assert!(!budget.expired(&clock));
        }
        assert_eq!(clock.reads.get(), 2);
    }

    #[test]
    fn tick_budget_expires_at_deadline() {
        let clock = StepClock::at(Duration::ZERO);
        let mut budget = TickBudget::new(Duration::ZERO, Duration::from_millis(1), 1);
        assert!(!budget.expired(&clock));
        clock.now.set(Duration::from_millis(1));
        assert!(budget.expired(&clock));
        // Sticky, no further reads.
        let reads = clock.reads.get();
        clock.now.set(Duration::ZERO);
        assert!(budget.expired(&clock));
        assert!(budget.expired_now(&clock));
        assert_eq!(clock.reads.get(), reads);
    }

    #[test]
    fn unlimited_budget_never_expires() {
        let clock = StepClock::at(Duration::from_secs(1_000_000));
        let mut budget = TickBudget::unlimited();
        assert!(!budget.expired_now(&clock));
    }

    #[test]
    fn break_budget_carries_fractions() {
        let cfg = FellConfig {
            breaks_per_second: 10.0,
            tick_rate_hz: 20.0,
            ..FellConfig::default()
        };
        let mut b = BreakBudget::new(&cfg);
        b.refill();
        assert_eq!(b.available(), 0);
        assert!(!b.try_take());
        b.refill();
        assert_eq!(b.available(), 1);
        assert!(b.try_take());
        assert_eq!(b.used_this_tick(), 1);
        assert!(!b.try_take());
    }

    #[test]
    fn break_budget_burst_is_one_second() {
        let cfg = FellConfig {
            breaks_per_second: 40.0,
            tick_rate_hz: 20.0,
            ..FellConfig::default()
        };
        let mut b = BreakBudget::new(&cfg);
        for _ in 0..100 {
            b.refill();
        }
        assert_eq!(b.available(), 40);
    }

    #[test]
    fn unlimited_break_budget_never_runs_dry() {
        let mut b = BreakBudget::unlimited();
        for _ in 0..10_000 {
            assert!(b.try_take());
        }
        b.refill();
        assert_eq!(b.available(), u32::MAX);
    }

    #[test]
    fn feedback_spreads_budget_over_window() {
        let cfg = FellConfig {
            effects_per_second: 10.0,
            breaks_per_second: 1000.0,
            ..FellConfig::default()
        };
        let mut f = FeedbackLimiter::new(&cfg);
        f.begin_tick(Duration::ZERO, 100);
        let emitted = (0..100).filter(|_| f.should_emit()).count();
        assert_eq!(emitted, 10);
        assert_eq!(f.emitted_this_tick(), 10);
    }

    #[test]
    fn feedback_counts_destructions_committed_mid_tick() {
        let cfg = FellConfig::default();
        let mut f = FeedbackLimiter::new(&cfg);
        f.begin_tick(Duration::ZERO, 0);
        f.add_remaining(40);
        // 16 effects over 40 expected breaks: 0.4 per break.
        let emitted = (0..8).filter(|_| f.should_emit()).count();
        assert!(emitted <= 4, "{emitted} of 8 breaks played effects");
        assert!(emitted >= 2);
    }

    #[test]
    fn feedback_never_exceeds_window_budget() {
        let cfg = FellConfig {
            effects_per_second: 4.0,
            breaks_per_second: 100.0,
            ..FellConfig::default()
        };
        let mut f = FeedbackLimiter::new(&cfg);
        let mut total = 0;
        for tick in 0..10u64 {
            f.begin_tick(Duration::from_millis(tick * 50), 5);
            total += (0..5).filter(|_| f.should_emit()).count();
        }
        assert!(total <= 4, "emitted {total}");
    }

    #[test]
    fn feedback_window_rolls_over() {
        let cfg = FellConfig {
            effects_per_second: 1.0,
            breaks_per_second: 1.0,
            ..FellConfig::default()
        };
        let mut f = FeedbackLimiter::new(&cfg);
        f.begin_tick(Duration::ZERO, 1);
        assert!(f.should_emit());
        f.begin_tick(Duration::from_millis(500), 1);
        assert!(!f.should_emit());
        f.begin_tick(Duration::from_millis(1000), 1);
        assert!(f.should_emit());
    }
}
