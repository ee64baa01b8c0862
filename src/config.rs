use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub unix_socket: Option<String>,
    pub host: Option<String>,
    pub path: String,
    pub timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            unix_socket: None,
            host: Some("0.0.0.0:8080".into()),
            path: "/api/v1".into(),
            timeout: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GpioConfig {
    /// Try to acquire hardware at startup; `false` forces software mode.
    pub enabled: bool,
    pub chip: String,
    pub led_line: u32,
    pub button_line: u32,
    pub consumer: String,
}

impl GpioConfig {
    pub fn led_consumer(&self) -> String {
        format!("{}_led", self.consumer)
    }

    pub fn button_consumer(&self) -> String {
        format!("{}_button", self.consumer)
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chip: "gpiochip0".into(),
            led_line: 18,
            button_line: 24,
            consumer: "reaction_game".into(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GameConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub poll_interval_ms: u64,
}

impl GameConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 2000,
            max_delay_ms: 6000,
            poll_interval_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub gpio: GpioConfig,
    pub game: GameConfig,
    pub broadcast_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            gpio: GpioConfig::default(),
            game: GameConfig::default(),
            broadcast_capacity: 16,
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| AppError::Config(format!("Invalid config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// An explicit path must exist; without one the default file is used when
    /// present and built-in defaults otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_PATH)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.game.min_delay_ms >= self.game.max_delay_ms {
            return Err(AppError::Config(format!(
                "min_delay_ms ({}) must be below max_delay_ms ({})",
                self.game.min_delay_ms, self.game.max_delay_ms
            )));
        }
        if self.game.poll_interval_ms == 0 {
            return Err(AppError::Config("poll_interval_ms must be positive".into()));
        }
        if self.gpio.led_line == self.gpio.button_line {
            return Err(AppError::Config(format!(
                "LED and button cannot share line {}",
                self.gpio.led_line
            )));
        }
        if self.http.host.is_none() && self.http.unix_socket.is_none() {
            return Err(AppError::Config(
                "either 'unix_socket' or 'host' must be specified".into(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(AppError::Config("broadcast_capacity must be positive".into()));
        }
        Ok(())
    }
}
