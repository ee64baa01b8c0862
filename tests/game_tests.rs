use std::time::Duration;

use reaction_game::backend::MockGpioBackend;
use reaction_game::game::{DelaySource, LABEL_IDLE, STATUS_ARMED, STATUS_READY, STATUS_SIGNALED};
use reaction_game::{
    AppError, Clock, FixedDelay, GameConfig, GpioConfig, GpioHandler, GpioPort, ManualClock, Phase,
    RandomDelay, ReactionGame, ReactionSource, ReactionTier, SoftwarePort,
};

const LED: u32 = 18;
const BUTTON: u32 = 24;
const POLL_MS: u64 = 50;

/// Single-threaded driver over virtual time: one pending signal deadline and
/// a fixed-period button poll, both dispatched in time order.
struct VirtualLoop {
    game: ReactionGame,
    clock: ManualClock,
    signal_at: Option<u64>,
    next_poll: u64,
}

impl VirtualLoop {
    fn new(game: ReactionGame, clock: ManualClock) -> Self {
        Self {
            game,
            clock,
            signal_at: None,
            next_poll: POLL_MS,
        }
    }

    fn start(&mut self) {
        let delay = self.game.start().expect("start from idle");
        self.signal_at = Some(self.clock.now_ms() + delay.as_millis() as u64);
    }

    fn reset(&mut self) {
        self.signal_at = None;
        self.game.reset();
    }

    fn run_until(&mut self, t: u64) {
        loop {
            let signal = self.signal_at.filter(|at| *at <= t);
            let poll = Some(self.next_poll).filter(|at| *at <= t);
            match (signal, poll) {
                (Some(s), Some(p)) if s <= p => self.fire_signal(s),
                (Some(s), None) => self.fire_signal(s),
                (_, Some(p)) => {
                    self.clock.set(p);
                    self.game.poll_button();
                    self.next_poll += POLL_MS;
                }
                (None, None) => break,
            }
        }
        self.clock.set(t);
    }

    fn fire_signal(&mut self, at: u64) {
        self.clock.set(at);
        self.signal_at = None;
        self.game.signal();
    }
}

fn mock_game(delay_ms: u64) -> (VirtualLoop, MockGpioBackend) {
    let backend = MockGpioBackend::default();
    let port = GpioHandler::open(&backend, &GpioConfig::default());
    let clock = ManualClock::default();
    let game = ReactionGame::new(
        Box::new(port),
        Box::new(clock.clone()),
        Box::new(FixedDelay(Duration::from_millis(delay_ms))),
    );
    (VirtualLoop::new(game, clock), backend)
}

#[test]
fn initial_view_is_ready() {
    let (lp, _) = mock_game(3000);
    let view = lp.game.view();

    assert_eq!(view.phase, Phase::Idle);
    assert_eq!(view.status, STATUS_READY);
    assert_eq!(view.react_label, LABEL_IDLE);
    assert_eq!(view.hardware, "GPIO Enabled");
    assert!(view.start_enabled);
    assert!(!view.react_enabled);
    assert!(view.result.is_none());
}

#[test]
fn end_to_end_round_with_screen_click() {
    let (mut lp, backend) = mock_game(3000);

    lp.start();
    assert_eq!(lp.game.phase(), Phase::Armed);
    assert_eq!(lp.game.view().status, STATUS_ARMED);
    assert_eq!(backend.output(LED), Some(0));

    lp.run_until(2999);
    assert_eq!(lp.game.phase(), Phase::Armed);

    lp.run_until(3000);
    assert!(lp.game.is_active());
    assert_eq!(backend.output(LED), Some(1));
    let view = lp.game.view();
    assert_eq!(view.status, STATUS_SIGNALED);
    assert!(view.react_enabled);
    assert!(!view.start_enabled);

    lp.run_until(3250);
    let reaction = lp.game.react(ReactionSource::Screen).expect("first reaction");
    assert_eq!(reaction.elapsed_ms, 250);
    assert_eq!(reaction.tier, ReactionTier::Great);
    assert_eq!(backend.output(LED), Some(0));

    let view = lp.game.view();
    assert_eq!(view.phase, Phase::Idle);
    assert_eq!(view.status, "Great reaction time!");
    assert_eq!(view.result.as_deref(), Some("Your reaction time: 250 ms"));
    assert!(view.start_enabled);
    assert!(!view.react_enabled);
}

#[test]
fn second_reaction_does_not_change_result() {
    let (mut lp, backend) = mock_game(2000);

    lp.start();
    lp.run_until(2000);
    lp.run_until(2180);
    let first = lp.game.react(ReactionSource::Screen);

    lp.run_until(2600);
    backend.set_input(BUTTON, 0);
    lp.run_until(2700);
    assert!(lp.game.react(ReactionSource::Screen).is_none());

    assert_eq!(lp.game.last_reaction(), first);
    assert_eq!(first.map(|r| r.elapsed_ms), Some(180));
    assert_eq!(first.map(|r| r.tier), Some(ReactionTier::Excellent));
}

#[test]
fn hardware_press_is_seen_on_next_poll() {
    let (mut lp, backend) = mock_game(3000);

    lp.start();
    lp.run_until(3000);
    lp.run_until(3320);
    backend.set_input(BUTTON, 0);
    lp.run_until(3400);

    let reaction = lp.game.last_reaction().expect("hardware reaction");
    assert_eq!(reaction.source, ReactionSource::Hardware);
    // press at 3320 is picked up by the 3350 poll
    assert_eq!(reaction.elapsed_ms, 350);
    assert_eq!(reaction.tier, ReactionTier::Good);
    assert_eq!(backend.output(LED), Some(0));
}

#[test]
fn button_held_before_signal_is_ignored_until_active() {
    let (mut lp, backend) = mock_game(3000);

    lp.start();
    backend.set_input(BUTTON, 0);
    lp.run_until(2950);
    assert_eq!(lp.game.phase(), Phase::Armed);
    assert!(lp.game.last_reaction().is_none());

    lp.run_until(3000);
    let reaction = lp.game.last_reaction().expect("held button counts once active");
    assert_eq!(reaction.elapsed_ms, 0);
}

#[test]
fn reset_before_signal_leaves_led_off() {
    let (mut lp, backend) = mock_game(3000);

    lp.start();
    lp.run_until(1500);
    lp.reset();
    lp.run_until(5000);

    assert_eq!(lp.game.phase(), Phase::Idle);
    assert!(!lp.game.is_active());
    assert_eq!(backend.output(LED), Some(0));
    assert_eq!(lp.game.view().status, STATUS_READY);
}

#[test]
fn stale_signal_after_reset_is_ignored() {
    let (mut lp, backend) = mock_game(3000);

    lp.start();
    lp.game.reset();
    lp.game.signal();

    assert_eq!(lp.game.phase(), Phase::Idle);
    assert_eq!(backend.output(LED), Some(0));
}

#[test]
fn reset_while_signaled_turns_led_off() {
    let (mut lp, backend) = mock_game(2500);

    lp.start();
    lp.run_until(2500);
    assert_eq!(backend.output(LED), Some(1));

    lp.reset();
    assert_eq!(backend.output(LED), Some(0));
    assert!(lp.game.react(ReactionSource::Screen).is_none());
}

#[test]
fn reset_clears_previous_result() {
    let (mut lp, _) = mock_game(2000);

    lp.start();
    lp.run_until(2000);
    lp.run_until(2500);
    lp.game.react(ReactionSource::Screen);
    assert!(lp.game.view().result.is_some());

    lp.reset();
    let view = lp.game.view();
    assert!(view.result.is_none());
    assert!(view.reaction.is_none());
}

#[test]
fn start_rejected_during_round() {
    let (mut lp, _) = mock_game(3000);

    lp.start();
    assert!(matches!(lp.game.start(), Err(AppError::InvalidState(_))));

    lp.run_until(3000);
    assert!(matches!(lp.game.start(), Err(AppError::InvalidState(_))));
}

#[test]
fn react_before_signal_is_noop() {
    let (mut lp, backend) = mock_game(3000);

    lp.start();
    lp.run_until(1000);
    assert!(lp.game.react(ReactionSource::Screen).is_none());
    assert_eq!(lp.game.phase(), Phase::Armed);

    lp.run_until(3000);
    assert_eq!(backend.output(LED), Some(1));
}

#[test]
fn software_mode_plays_with_screen_only() {
    let clock = ManualClock::default();
    let game = ReactionGame::new(
        Box::new(SoftwarePort),
        Box::new(clock.clone()),
        Box::new(FixedDelay(Duration::from_millis(2000))),
    );
    let mut lp = VirtualLoop::new(game, clock);

    assert_eq!(lp.game.view().hardware, "GPIO Disabled (Software Mode)");
    lp.start();
    lp.run_until(2000);
    assert!(lp.game.view().led);
    lp.run_until(2450);

    let reaction = lp.game.react(ReactionSource::Screen).expect("screen reaction");
    assert_eq!(reaction.elapsed_ms, 450);
    assert_eq!(reaction.tier, ReactionTier::KeepPracticing);
}

#[test]
fn shutdown_releases_gpio() {
    let (mut lp, backend) = mock_game(2000);

    lp.start();
    lp.run_until(2000);
    lp.game.shutdown();

    assert_eq!(backend.held_resources(), 0);
    assert!(!lp.game.port().is_enabled());
}

#[test]
fn tiers_follow_thresholds() {
    let cases = [
        (0, ReactionTier::Excellent),
        (199, ReactionTier::Excellent),
        (200, ReactionTier::Great),
        (299, ReactionTier::Great),
        (300, ReactionTier::Good),
        (399, ReactionTier::Good),
        (400, ReactionTier::KeepPracticing),
        (5000, ReactionTier::KeepPracticing),
    ];
    for (elapsed, tier) in cases {
        assert_eq!(ReactionTier::from_elapsed(elapsed), tier, "{elapsed} ms");
    }
    assert_eq!(ReactionTier::Excellent.message(), "Excellent! Lightning fast!");
    assert_eq!(ReactionTier::KeepPracticing.message(), "Keep practicing!");
}

#[test]
fn random_delay_stays_in_range() {
    let mut delays = RandomDelay::from_config(&GameConfig::default()).expect("valid range");
    let mut min = u64::MAX;
    let mut max = 0;

    for _ in 0..10_000 {
        let ms = delays.next_delay().as_millis() as u64;
        assert!((2000..6000).contains(&ms), "delay {ms} out of range");
        min = min.min(ms);
        max = max.max(ms);
    }
    assert!(min < 2500);
    assert!(max > 5500);
}

#[test]
fn empty_delay_range_is_rejected() {
    assert!(matches!(RandomDelay::new(3000..3000), Err(AppError::Config(_))));
}
