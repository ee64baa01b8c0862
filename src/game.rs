use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::Rng;
use serde::Serialize;

use crate::config::GameConfig;
use crate::error::AppError;
use crate::gpio::GpioPort;

pub const STATUS_READY: &str = "Ready to start!";
pub const STATUS_ARMED: &str = "Get ready... Wait for GREEN!";
pub const STATUS_SIGNALED: &str = "GO! Click button or press hardware button!";

pub const LABEL_IDLE: &str = "React!";
pub const LABEL_ARMED: &str = "Wait...";
pub const LABEL_SIGNALED: &str = "REACT NOW!";

pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since construction, immune to wall-clock jumps.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub trait DelaySource {
    fn next_delay(&mut self) -> Duration;
}

/// Uniform delay over a half-open millisecond range.
#[derive(Debug, Clone)]
pub struct RandomDelay {
    range_ms: Range<u64>,
}

impl RandomDelay {
    pub fn new(range_ms: Range<u64>) -> Result<Self, AppError> {
        if range_ms.is_empty() {
            return Err(AppError::Config(format!(
                "empty delay range {}..{}",
                range_ms.start, range_ms.end
            )));
        }
        Ok(Self { range_ms })
    }

    pub fn from_config(config: &GameConfig) -> Result<Self, AppError> {
        Self::new(config.min_delay_ms..config.max_delay_ms)
    }
}

impl DelaySource for RandomDelay {
    fn next_delay(&mut self) -> Duration {
        Duration::from_millis(rand::rng().random_range(self.range_ms.clone()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl DelaySource for FixedDelay {
    fn next_delay(&mut self) -> Duration {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    Armed,
    Signaled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReactionSource {
    Screen,
    Hardware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReactionTier {
    Excellent,
    Great,
    Good,
    KeepPracticing,
}

impl ReactionTier {
    pub fn from_elapsed(elapsed_ms: u64) -> Self {
        match elapsed_ms {
            0..200 => ReactionTier::Excellent,
            200..300 => ReactionTier::Great,
            300..400 => ReactionTier::Good,
            _ => ReactionTier::KeepPracticing,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ReactionTier::Excellent => "Excellent! Lightning fast!",
            ReactionTier::Great => "Great reaction time!",
            ReactionTier::Good => "Good reaction time!",
            ReactionTier::KeepPracticing => "Keep practicing!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reaction {
    pub elapsed_ms: u64,
    pub tier: ReactionTier,
    pub source: ReactionSource,
}

/// Everything a client needs to render the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameView {
    pub phase: Phase,
    pub status: String,
    pub result: Option<String>,
    pub hardware: String,
    pub start_enabled: bool,
    pub react_enabled: bool,
    pub react_label: String,
    pub led: bool,
    pub reaction: Option<Reaction>,
}

/// Round state machine: `Idle -> Armed -> Signaled -> Idle`.
///
/// Timers are owned by whoever drives the game: `start` hands back the delay
/// to schedule and `signal` is called when it elapses.
pub struct ReactionGame {
    port: Box<dyn GpioPort>,
    clock: Box<dyn Clock>,
    delays: Box<dyn DelaySource>,
    phase: Phase,
    start_time: u64,
    led: bool,
    last: Option<Reaction>,
}

impl ReactionGame {
    pub fn new(
        port: Box<dyn GpioPort>,
        clock: Box<dyn Clock>,
        delays: Box<dyn DelaySource>,
    ) -> Self {
        Self {
            port,
            clock,
            delays,
            phase: Phase::Idle,
            start_time: 0,
            led: false,
            last: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Signaled
    }

    pub fn last_reaction(&self) -> Option<Reaction> {
        self.last
    }

    pub fn port(&self) -> &dyn GpioPort {
        self.port.as_ref()
    }

    pub fn start(&mut self) -> Result<Duration, AppError> {
        if self.phase != Phase::Idle {
            return Err(AppError::InvalidState("a round is already in progress".into()));
        }
        self.set_led(false);
        self.last = None;
        self.phase = Phase::Armed;

        let delay = self.delays.next_delay();
        info!("round armed, signal in {} ms", delay.as_millis());
        Ok(delay)
    }

    pub fn signal(&mut self) {
        if self.phase != Phase::Armed {
            debug!("stale signal timer in {:?}, ignored", self.phase);
            return;
        }
        self.set_led(true);
        self.start_time = self.clock.now_ms();
        self.phase = Phase::Signaled;
        info!("signal shown");
    }

    pub fn react(&mut self, source: ReactionSource) -> Option<Reaction> {
        if !self.is_active() {
            debug!("{source:?} reaction while {:?}, ignored", self.phase);
            return None;
        }
        let elapsed_ms = self.clock.now_ms().saturating_sub(self.start_time);
        self.phase = Phase::Idle;
        self.set_led(false);

        let reaction = Reaction {
            elapsed_ms,
            tier: ReactionTier::from_elapsed(elapsed_ms),
            source,
        };
        self.last = Some(reaction);
        info!("reaction time {elapsed_ms} ms via {source:?}");
        Some(reaction)
    }

    /// One poll of the hardware button.
    pub fn poll_button(&mut self) -> Option<Reaction> {
        if self.is_active() && self.port.read_button() {
            self.react(ReactionSource::Hardware)
        } else {
            None
        }
    }

    /// The caller cancels any pending signal timer.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.last = None;
        self.set_led(false);
        info!("game reset");
    }

    pub fn shutdown(&mut self) {
        self.set_led(false);
        self.port.cleanup();
    }

    pub fn view(&self) -> GameView {
        let (status, react_label) = match (self.phase, self.last) {
            (Phase::Idle, None) => (STATUS_READY, LABEL_IDLE),
            (Phase::Idle, Some(reaction)) => (reaction.tier.message(), LABEL_SIGNALED),
            (Phase::Armed, _) => (STATUS_ARMED, LABEL_ARMED),
            (Phase::Signaled, _) => (STATUS_SIGNALED, LABEL_SIGNALED),
        };

        GameView {
            phase: self.phase,
            status: status.to_string(),
            result: self
                .last
                .map(|r| format!("Your reaction time: {} ms", r.elapsed_ms)),
            hardware: self.port.status().to_string(),
            start_enabled: self.phase == Phase::Idle,
            react_enabled: self.phase == Phase::Signaled,
            react_label: react_label.to_string(),
            led: self.led,
            reaction: self.last,
        }
    }

    fn set_led(&mut self, on: bool) {
        self.led = on;
        self.port.set_led(on);
    }
}
