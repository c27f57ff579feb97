pub mod devices;
pub mod emulator;
pub mod error;
pub mod peripheral;
pub mod psr;
pub mod registers;

pub use emulator::Emulator;
pub use error::{EmulatorError, Result};
