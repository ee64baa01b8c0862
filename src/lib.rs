pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod game;
pub mod gpio;
pub mod routes;

pub use config::{AppConfig, GameConfig, GpioConfig, HttpConfig};
pub use controller::{GameController, HardwareInfo, Shutdown};
pub use error::{AcquireStep, AppError};
pub use game::{
    Clock, DelaySource, FixedDelay, GameView, ManualClock, MonotonicClock, Phase, RandomDelay,
    Reaction, ReactionGame, ReactionSource, ReactionTier,
};
pub use gpio::{GpioBackend, GpioHandler, GpioLine, GpioPort, SoftwarePort, open_port};
pub use routes::AppState;

#[cfg(feature = "hardware-gpio")]
pub use backend::LibgpiodBackend;
pub use backend::MockGpioBackend;
