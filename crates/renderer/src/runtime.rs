use std::time::{Duration, Instant};

use sceneconfig::ClockMode;

/// Abstraction over where shader time originates from.
pub trait TimeSource: Send {
    /// Shader time for the next frame, in seconds.
    fn sample(&mut self) -> f32;
}

/// Adds a fixed increment per frame, independent of real elapsed time.
///
/// The first sample reports one step, matching a loop that increments before
/// it draws.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepTimeSource {
    step: f32,
    accumulated: f32,
}

impl FixedStepTimeSource {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulated: 0.0,
        }
    }
}

impl TimeSource for FixedStepTimeSource {
    fn sample(&mut self) -> f32 {
        self.accumulated += self.step;
        self.accumulated
    }
}

/// Shader time driven by the monotonic clock, scaled so it advances at the
/// same rate a fixed-step source would at 60 FPS.
#[derive(Debug, Clone, Copy)]
pub struct WallClockTimeSource {
    origin: Instant,
    rate: f32,
}

impl WallClockTimeSource {
    pub fn new(step: f32) -> Self {
        Self {
            origin: Instant::now(),
            rate: step * REFERENCE_FPS,
        }
    }

    fn at(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.origin).as_secs_f32() * self.rate
    }
}

const REFERENCE_FPS: f32 = 60.0;

impl TimeSource for WallClockTimeSource {
    fn sample(&mut self) -> f32 {
        self.at(Instant::now())
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds the time source selected by the scene's `render.clock`.
pub fn time_source_for_clock(clock: ClockMode, step: f32) -> BoxedTimeSource {
    match clock {
        ClockMode::Fixed => Box::new(FixedStepTimeSource::new(step)),
        ClockMode::Wall => Box::new(WallClockTimeSource::new(step)),
    }
}

/// Longest real-time step handed to the clip and the choreographer.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Real elapsed time between redraws.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameDelta {
    last: Option<Instant>,
}

impl FrameDelta {
    /// Time since the previous call; zero on the first.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let delta = self
            .last
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last = Some(now);
        delta.min(MAX_FRAME_DELTA)
    }
}
