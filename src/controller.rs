use std::time::Duration;

use actix::{Actor, ActorContext, AsyncContext, Context, Handler, Message, SpawnHandle};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::GpioConfig;
use crate::error::AppError;
use crate::game::{GameView, ReactionGame, ReactionSource};

#[derive(Message)]
#[rtype(result = "Result<GameView, AppError>")]
pub struct Start;

#[derive(Message)]
#[rtype(result = "Result<GameView, AppError>")]
pub struct React;

#[derive(Message)]
#[rtype(result = "Result<GameView, AppError>")]
pub struct Reset;

#[derive(Message)]
#[rtype(result = "Result<GameView, AppError>")]
pub struct GetView;

/// Stops the controller, turning the LED off and releasing GPIO.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Shutdown;

#[derive(Message)]
#[rtype(result = "Result<HardwareInfo, AppError>")]
pub struct GetHardware;

#[derive(Debug, Clone, Serialize)]
pub struct HardwareInfo {
    pub enabled: bool,
    pub status: String,
    pub chip: String,
    pub led_line: u32,
    pub button_line: u32,
}

/// Event loop for the game. All game and GPIO state lives on this actor's
/// arbiter; the signal delay is a one-shot future and the hardware button is
/// polled on a fixed interval for the actor's lifetime.
pub struct GameController {
    game: ReactionGame,
    gpio: GpioConfig,
    poll_interval: Duration,
    pending_signal: Option<SpawnHandle>,
    events: broadcast::Sender<GameView>,
}

impl GameController {
    pub fn new(
        game: ReactionGame,
        gpio: GpioConfig,
        poll_interval: Duration,
        events: broadcast::Sender<GameView>,
    ) -> Self {
        Self {
            game,
            gpio,
            poll_interval,
            pending_signal: None,
            events,
        }
    }

    fn publish(&self) -> GameView {
        let view = self.game.view();
        // no subscribers is fine
        let _ = self.events.send(view.clone());
        view
    }

    fn cancel_signal(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.pending_signal.take() {
            ctx.cancel_future(handle);
            debug!("pending signal cancelled");
        }
    }
}

impl Actor for GameController {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            "game controller started ({}), polling button every {} ms",
            self.game.port().status(),
            self.poll_interval.as_millis()
        );
        ctx.run_interval(self.poll_interval, |act, _| {
            if act.game.poll_button().is_some() {
                act.publish();
            }
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.game.shutdown();
        info!("game controller stopped, GPIO released");
    }
}

impl Handler<Start> for GameController {
    type Result = Result<GameView, AppError>;

    fn handle(&mut self, _: Start, ctx: &mut Self::Context) -> Self::Result {
        let delay = self.game.start()?;
        self.cancel_signal(ctx);
        self.pending_signal = Some(ctx.run_later(delay, |act, _| {
            act.pending_signal = None;
            act.game.signal();
            act.publish();
        }));
        Ok(self.publish())
    }
}

impl Handler<React> for GameController {
    type Result = Result<GameView, AppError>;

    fn handle(&mut self, _: React, _: &mut Self::Context) -> Self::Result {
        if self.game.react(ReactionSource::Screen).is_some() {
            return Ok(self.publish());
        }
        Ok(self.game.view())
    }
}

impl Handler<Reset> for GameController {
    type Result = Result<GameView, AppError>;

    fn handle(&mut self, _: Reset, ctx: &mut Self::Context) -> Self::Result {
        self.cancel_signal(ctx);
        self.game.reset();
        Ok(self.publish())
    }
}

impl Handler<Shutdown> for GameController {
    type Result = ();

    fn handle(&mut self, _: Shutdown, ctx: &mut Self::Context) {
        self.cancel_signal(ctx);
        ctx.stop();
    }
}

impl Handler<GetView> for GameController {
    type Result = Result<GameView, AppError>;

    fn handle(&mut self, _: GetView, _: &mut Self::Context) -> Self::Result {
        Ok(self.game.view())
    }
}

impl Handler<GetHardware> for GameController {
    type Result = Result<HardwareInfo, AppError>;

    fn handle(&mut self, _: GetHardware, _: &mut Self::Context) -> Self::Result {
        let port = self.game.port();
        Ok(HardwareInfo {
            enabled: port.is_enabled(),
            status: port.status().to_string(),
            chip: self.gpio.chip.clone(),
            led_line: self.gpio.led_line,
            button_line: self.gpio.button_line,
        })
    }
}
