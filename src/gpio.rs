use std::marker::PhantomData;

use log::{debug, error, info, warn};

use crate::config::GpioConfig;
use crate::error::{AcquireStep, AppError};

pub const STATUS_ENABLED: &str = "GPIO Enabled";
pub const STATUS_DISABLED: &str = "GPIO Disabled (Software Mode)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Output { initial: u8 },
    /// Input biased high; reads 1 while nothing pulls it down.
    InputPullUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    pub offset: u32,
    pub consumer: String,
    pub mode: LineMode,
}

impl LineRequest {
    pub fn output(offset: u32, consumer: impl Into<String>, initial: u8) -> Self {
        Self {
            offset,
            consumer: consumer.into(),
            mode: LineMode::Output { initial },
        }
    }

    pub fn input_pull_up(offset: u32, consumer: impl Into<String>) -> Self {
        Self {
            offset,
            consumer: consumer.into(),
            mode: LineMode::InputPullUp,
        }
    }
}

/// A requested line. Dropping it releases the line.
pub trait GpioLine {
    fn value(&self) -> Result<u8, AppError>;
    fn set_value(&mut self, value: u8) -> Result<(), AppError>;
}

/// Chip-level access. Dropping a `Chip` closes it.
pub trait GpioBackend {
    type Chip;
    type Line: GpioLine;

    fn open_chip(&self, path: &str) -> Result<Self::Chip, AppError>;
    fn find_line(&self, chip: &Self::Chip, offset: u32) -> Result<(), AppError>;
    fn request_line(
        &self,
        chip: &Self::Chip,
        request: &LineRequest,
    ) -> Result<Self::Line, AppError>;
}

/// The two-line surface the game needs, with or without hardware behind it.
pub trait GpioPort {
    fn is_enabled(&self) -> bool;
    fn set_led(&mut self, on: bool);
    /// `true` while the button is held down.
    fn read_button(&self) -> bool;
    fn cleanup(&mut self);

    fn status(&self) -> &'static str {
        if self.is_enabled() {
            STATUS_ENABLED
        } else {
            STATUS_DISABLED
        }
    }
}

/// Owns the chip and both line requests. Either everything is held and
/// `enabled` is set, or nothing is held.
pub struct GpioHandler<B: GpioBackend> {
    enabled: bool,
    chip: Option<B::Chip>,
    led: Option<B::Line>,
    button: Option<B::Line>,
    _backend: PhantomData<fn() -> B>,
}

impl<B: GpioBackend> GpioHandler<B> {
    pub fn open(backend: &B, config: &GpioConfig) -> Self {
        match Self::acquire(backend, config) {
            Ok((chip, led, button)) => {
                info!(
                    "GPIO initialized successfully (chip {}, LED line {}, button line {})",
                    config.chip, config.led_line, config.button_line
                );
                Self {
                    enabled: true,
                    chip: Some(chip),
                    led: Some(led),
                    button: Some(button),
                    _backend: PhantomData,
                }
            }
            Err(e) => {
                error!("{e}; continuing in software mode");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            chip: None,
            led: None,
            button: None,
            _backend: PhantomData,
        }
    }

    // locals drop in reverse order, so an early return releases the LED line
    // before closing the chip
    fn acquire(
        backend: &B,
        config: &GpioConfig,
    ) -> Result<(B::Chip, B::Line, B::Line), AppError> {
        let chip = backend
            .open_chip(&config.chip)
            .map_err(AppError::acquire(AcquireStep::OpenChip))?;

        backend
            .find_line(&chip, config.led_line)
            .map_err(AppError::acquire(AcquireStep::FindLedLine))?;
        let led = backend
            .request_line(
                &chip,
                &LineRequest::output(config.led_line, config.led_consumer(), 0),
            )
            .map_err(AppError::acquire(AcquireStep::RequestLedLine))?;

        backend
            .find_line(&chip, config.button_line)
            .map_err(AppError::acquire(AcquireStep::FindButtonLine))?;
        let button = backend
            .request_line(
                &chip,
                &LineRequest::input_pull_up(config.button_line, config.button_consumer()),
            )
            .map_err(AppError::acquire(AcquireStep::RequestButtonLine))?;

        Ok((chip, led, button))
    }
}

impl<B: GpioBackend> GpioPort for GpioHandler<B> {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_led(&mut self, on: bool) {
        if !self.enabled {
            return;
        }
        if let Some(led) = self.led.as_mut()
            && let Err(e) = led.set_value(on as u8)
        {
            warn!("set LED {}: {e}", if on { "on" } else { "off" });
        }
    }

    fn read_button(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.button.as_ref().map(|button| button.value()) {
            Some(Ok(value)) => value == 0,
            Some(Err(e)) => {
                warn!("read button: {e}");
                false
            }
            None => false,
        }
    }

    fn cleanup(&mut self) {
        if let Some(button) = self.button.take() {
            drop(button);
            debug!("released button line");
        }
        if let Some(led) = self.led.take() {
            drop(led);
            debug!("released LED line");
        }
        if let Some(chip) = self.chip.take() {
            drop(chip);
            debug!("closed GPIO chip");
        }
        self.enabled = false;
    }
}

impl<B: GpioBackend> Drop for GpioHandler<B> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Port used when hardware support is not available at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwarePort;

impl GpioPort for SoftwarePort {
    fn is_enabled(&self) -> bool {
        false
    }

    fn set_led(&mut self, _on: bool) {}

    fn read_button(&self) -> bool {
        false
    }

    fn cleanup(&mut self) {}
}

/// Picks the port for this build and configuration.
pub fn open_port(config: &GpioConfig) -> Box<dyn GpioPort> {
    if !config.enabled {
        info!("GPIO disabled by configuration");
        return Box::new(SoftwarePort);
    }

    #[cfg(feature = "hardware-gpio")]
    {
        Box::new(GpioHandler::open(&crate::backend::LibgpiodBackend, config))
    }
    #[cfg(all(not(feature = "hardware-gpio"), feature = "mock-gpio"))]
    {
        info!("Using simulated GPIO chip");
        Box::new(GpioHandler::open(
            &crate::backend::MockGpioBackend::default(),
            config,
        ))
    }
    #[cfg(not(any(feature = "hardware-gpio", feature = "mock-gpio")))]
    {
        info!("GPIO support not compiled in");
        Box::new(SoftwarePort)
    }
}
