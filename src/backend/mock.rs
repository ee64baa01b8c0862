use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::AppError;
use crate::gpio::{GpioBackend, GpioLine, LineMode, LineRequest};

pub const MOCK_CHIP_LINES: u32 = 58;

/// Failure injected into the next matching operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFault {
    OpenChip,
    FindLine(u32),
    RequestLine(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    OpenChip(String),
    RequestLine { offset: u32, mode: LineMode },
    ReleaseLine(u32),
    CloseChip(String),
}

/// In-memory GPIO chip. Clones share state, so a test can keep one copy to
/// drive inputs and inspect what the handler holds.
#[derive(Clone, Default)]
pub struct MockGpioBackend {
    state: Arc<Mutex<MockChipState>>,
}

struct MockChipState {
    num_lines: u32,
    fault: Option<MockFault>,
    open_chips: usize,
    requested: FxHashMap<u32, LineMode>,
    levels: FxHashMap<u32, u8>, // driven input levels
    outputs: FxHashMap<u32, u8>,
    journal: Vec<MockOp>,
}

impl Default for MockChipState {
    fn default() -> Self {
        Self {
            num_lines: MOCK_CHIP_LINES,
            fault: None,
            open_chips: 0,
            requested: FxHashMap::default(),
            levels: FxHashMap::default(),
            outputs: FxHashMap::default(),
            journal: Vec::new(),
        }
    }
}

impl MockGpioBackend {
    pub fn with_fault(fault: MockFault) -> Self {
        let backend = Self::default();
        backend.state.lock().fault = Some(fault);
        backend
    }

    /// Drives an input line. Undriven inputs float high through the pull-up.
    pub fn set_input(&self, offset: u32, value: u8) {
        self.state.lock().levels.insert(offset, value);
    }

    /// Stops driving an input line, letting the pull-up take it high again.
    pub fn release_input(&self, offset: u32) {
        self.state.lock().levels.remove(&offset);
    }

    pub fn output(&self, offset: u32) -> Option<u8> {
        self.state.lock().outputs.get(&offset).copied()
    }

    pub fn is_requested(&self, offset: u32) -> bool {
        self.state.lock().requested.contains_key(&offset)
    }

    pub fn open_chips(&self) -> usize {
        self.state.lock().open_chips
    }

    /// Chips plus lines currently held.
    pub fn held_resources(&self) -> usize {
        let state = self.state.lock();
        state.open_chips + state.requested.len()
    }

    pub fn journal(&self) -> Vec<MockOp> {
        self.state.lock().journal.clone()
    }

    fn take_fault(&self, fault: MockFault) -> bool {
        let mut state = self.state.lock();
        if state.fault == Some(fault) {
            state.fault = None;
            true
        } else {
            false
        }
    }
}

pub struct MockChip {
    path: String,
    state: Arc<Mutex<MockChipState>>,
}

impl Drop for MockChip {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.open_chips = state.open_chips.saturating_sub(1);
        state.journal.push(MockOp::CloseChip(self.path.clone()));
    }
}

pub struct MockLine {
    offset: u32,
    mode: LineMode,
    state: Arc<Mutex<MockChipState>>,
}

impl GpioLine for MockLine {
    fn value(&self) -> Result<u8, AppError> {
        let state = self.state.lock();
        match self.mode {
            LineMode::Output { .. } => Ok(state.outputs.get(&self.offset).copied().unwrap_or(0)),
            LineMode::InputPullUp => Ok(state.levels.get(&self.offset).copied().unwrap_or(1)),
        }
    }

    fn set_value(&mut self, value: u8) -> Result<(), AppError> {
        if !matches!(self.mode, LineMode::Output { .. }) {
            return Err(AppError::InvalidState(
                "line must be in output mode to set value".into(),
            ));
        }
        if value > 1 {
            return Err(AppError::InvalidValue("Value must be 0 or 1".into()));
        }
        self.state.lock().outputs.insert(self.offset, value);
        Ok(())
    }
}

impl Drop for MockLine {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.requested.remove(&self.offset);
        state.outputs.remove(&self.offset);
        state.journal.push(MockOp::ReleaseLine(self.offset));
    }
}

impl GpioBackend for MockGpioBackend {
    type Chip = MockChip;
    type Line = MockLine;

    fn open_chip(&self, path: &str) -> Result<MockChip, AppError> {
        if self.take_fault(MockFault::OpenChip) {
            return Err(AppError::Gpio(format!("open chip {path}: no such device")));
        }
        let mut state = self.state.lock();
        state.open_chips += 1;
        state.journal.push(MockOp::OpenChip(path.to_string()));
        Ok(MockChip {
            path: path.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn find_line(&self, _chip: &MockChip, offset: u32) -> Result<(), AppError> {
        if self.take_fault(MockFault::FindLine(offset)) {
            return Err(AppError::Gpio(format!("line info {offset}: injected fault")));
        }
        let state = self.state.lock();
        if offset >= state.num_lines {
            return Err(AppError::Gpio(format!(
                "line {offset} out of range (chip has {} lines)",
                state.num_lines
            )));
        }
        if state.requested.contains_key(&offset) {
            return Err(AppError::Gpio(format!("line {offset} is busy")));
        }
        Ok(())
    }

    fn request_line(&self, _chip: &MockChip, request: &LineRequest) -> Result<MockLine, AppError> {
        if self.take_fault(MockFault::RequestLine(request.offset)) {
            return Err(AppError::Gpio(format!(
                "request lines: injected fault on {}",
                request.offset
            )));
        }
        let mut state = self.state.lock();
        state.requested.insert(request.offset, request.mode);
        if let LineMode::Output { initial } = request.mode {
            state.outputs.insert(request.offset, initial);
        }
        state.journal.push(MockOp::RequestLine {
            offset: request.offset,
            mode: request.mode,
        });
        Ok(MockLine {
            offset: request.offset,
            mode: request.mode,
            state: Arc::clone(&self.state),
        })
    }
}
