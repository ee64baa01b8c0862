use std::path::PathBuf;

use libgpiod::{chip::Chip, line, request};

use crate::error::AppError;
use crate::gpio::{GpioBackend, GpioLine, LineMode, LineRequest};

/// Character-device backend. Chip names without a path resolve under `/dev`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibgpiodBackend;

pub struct LibgpiodLine {
    offset: u32,
    request: request::Request,
}

impl LibgpiodBackend {
    fn chip_path(chip: &str) -> PathBuf {
        if chip.contains('/') {
            PathBuf::from(chip)
        } else {
            PathBuf::from("/dev").join(chip)
        }
    }

    fn make_line_settings(mode: LineMode) -> Result<line::Settings, AppError> {
        let mut ls =
            line::Settings::new().map_err(|e| AppError::Gpio(format!("libgpiod settings: {e}")))?;

        match mode {
            LineMode::Output { initial } => {
                ls.set_direction(line::Direction::Output)
                    .map_err(|e| AppError::Gpio(format!("set direction: {e}")))?;
                ls.set_drive(line::Drive::PushPull)
                    .map_err(|e| AppError::Gpio(format!("set drive: {e}")))?;
                ls.set_output_value(to_line_value(initial))
                    .map_err(|e| AppError::Gpio(format!("set output value: {e}")))?;
            }
            LineMode::InputPullUp => {
                ls.set_direction(line::Direction::Input)
                    .map_err(|e| AppError::Gpio(format!("set direction: {e}")))?;
                ls.set_bias(Some(line::Bias::PullUp))
                    .map_err(|e| AppError::Gpio(format!("set bias: {e}")))?;
            }
        }

        Ok(ls)
    }

    fn make_line_config(offset: u32, settings: line::Settings) -> Result<line::Config, AppError> {
        let mut cfg =
            line::Config::new().map_err(|e| AppError::Gpio(format!("line config: {e}")))?;
        cfg.add_line_settings(&[offset], settings)
            .map_err(|e| AppError::Gpio(format!("line config add settings: {e}")))?;
        Ok(cfg)
    }
}

impl GpioBackend for LibgpiodBackend {
    type Chip = Chip;
    type Line = LibgpiodLine;

    fn open_chip(&self, path: &str) -> Result<Chip, AppError> {
        let p = Self::chip_path(path);
        Chip::open(&p).map_err(|e| AppError::Gpio(format!("open chip {}: {e}", p.display())))
    }

    fn find_line(&self, chip: &Chip, offset: u32) -> Result<(), AppError> {
        let info = chip
            .line_info(offset)
            .map_err(|e| AppError::Gpio(format!("line info {offset}: {e}")))?;
        if info.is_used() {
            let owner = info.consumer().unwrap_or("unknown consumer");
            return Err(AppError::Gpio(format!("line {offset} is busy ({owner})")));
        }
        Ok(())
    }

    fn request_line(&self, chip: &Chip, req: &LineRequest) -> Result<LibgpiodLine, AppError> {
        let line_settings = Self::make_line_settings(req.mode)?;
        let line_cfg = Self::make_line_config(req.offset, line_settings)?;

        let mut req_cfg =
            request::Config::new().map_err(|e| AppError::Gpio(format!("request config: {e}")))?;
        req_cfg
            .set_consumer(&req.consumer)
            .map_err(|e| AppError::Gpio(format!("request consumer: {e}")))?;

        let request = chip
            .request_lines(Some(&req_cfg), &line_cfg)
            .map_err(|e| AppError::Gpio(format!("request lines: {e}")))?;

        Ok(LibgpiodLine {
            offset: req.offset,
            request,
        })
    }
}

impl GpioLine for LibgpiodLine {
    fn value(&self) -> Result<u8, AppError> {
        let value = self
            .request
            .value(self.offset)
            .map_err(|e| AppError::Gpio(format!("get value: {e}")))?;
        Ok(match value {
            line::Value::InActive => 0,
            line::Value::Active => 1,
        })
    }

    fn set_value(&mut self, value: u8) -> Result<(), AppError> {
        self.request
            .set_value(self.offset, to_line_value(value))
            .map_err(|e| AppError::Gpio(format!("set value: {e}")))?;
        Ok(())
    }
}

fn to_line_value(value: u8) -> line::Value {
    match value {
        0 => line::Value::InActive,
        _ => line::Value::Active,
    }
}
