use instant::Instant;

/// Which phase of the simulation tick is being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemPhase {
    Growth = 0,
    SpatialRebuild = 1,
    Proximity = 2,
    Lure = 3,
    StopConditions = 4,
    Timers = 5,
    Despawn = 6,
    Movement = 7,
}

const PHASE_COUNT: usize = 8;

impl SystemPhase {
    pub const ALL: [SystemPhase; PHASE_COUNT] = [
        Self::Growth,
        Self::SpatialRebuild,
        Self::Proximity,
        Self::Lure,
        Self::StopConditions,
        Self::Timers,
        Self::Despawn,
        Self::Movement,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Growth => "Growth",
            Self::SpatialRebuild => "Spatial",
            Self::Proximity => "Proximity",
            Self::Lure => "Lure",
            Self::StopConditions => "Stop",
            Self::Timers => "Timers",
            Self::Despawn => "Despawn",
            Self::Movement => "Movement",
        }
    }
}

/// Per-system timing with exponential moving average smoothing.
pub struct SystemTimers {
    /// EMA-smoothed duration in microseconds per phase.
    pub durations_us: [f64; PHASE_COUNT],
    /// Timestamp when `begin()` was called.
    start: Instant,
}

const EMA_ALPHA: f64 = 0.1;

impl SystemTimers {
    pub fn new() -> Self {
        Self {
            durations_us: [0.0; PHASE_COUNT],
            start: Instant::now(),
        }
    }

    /// Call before a system runs.
    pub fn begin(&mut self) {
        self.start = Instant::now();
    }

    /// Call after a system finishes. Records elapsed time for `phase`.
    pub fn end(&mut self, phase: SystemPhase) {
        let elapsed_us = self.start.elapsed().as_secs_f64() * 1_000_000.0;
        self.record(phase, elapsed_us);
    }

    fn record(&mut self, phase: SystemPhase, elapsed_us: f64) {
        let idx = phase as usize;
        self.durations_us[idx] =
            self.durations_us[idx] * (1.0 - EMA_ALPHA) + elapsed_us * EMA_ALPHA;
    }

    /// Sum of all phase durations (microseconds).
    pub fn total_us(&self) -> f64 {
        self.durations_us.iter().sum()
    }

    /// One-line breakdown for the log, e.g. `Growth 1.2us | Spatial 3.4us`.
    pub fn summary(&self) -> String {
        SystemPhase::ALL
            .iter()
            .map(|&phase| format!("{} {:.1}us", phase.label(), self.durations_us[phase as usize]))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl Default for SystemTimers {
    fn default() -> Self {
        Self::new()
    }
}
