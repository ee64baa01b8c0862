#[cfg(feature = "hardware-gpio")]
pub mod libgpiod;
pub mod mock;

#[cfg(feature = "hardware-gpio")]
pub use libgpiod::{LibgpiodBackend, LibgpiodLine};
pub use mock::{MockFault, MockGpioBackend, MockOp};
