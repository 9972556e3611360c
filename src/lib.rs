//! emuchip: an interpreter for the CHIP-8 virtual machine.
//!
//! 16 8-bit data registers named V0 to VF (VF doubles as the flag register),
//! a 12-bit address register I, 4KB of memory with the font at 0x000 and
//! programs at 0x200, a 16-level call stack and two 60Hz countdown timers.
//! The display is 64x32 monochrome.
//!
//! 35 opcodes, each 2 bytes, big-endian:
//!      NNN: address
//!      NN: 8-bit constant
//!      N: 4-bit constant
//!      X and Y: 4-bit register identifier
//!
//! The [`Emulator`] runs one fetch-decode-execute-timer cycle per call to
//! [`Emulator::cycle`]; rendering, audio and pacing are left to the caller.

pub mod config;
pub mod decode;
pub mod display;
pub mod emulator;
pub mod error;
pub mod keyboard;
pub mod memory;
pub mod registers;
pub mod timer;

pub use config::{Config, Quirks};
pub use decode::Instruction;
pub use emulator::{Cycle, Emulator, RunState};
pub use error::{Error, Result};
