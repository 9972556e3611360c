use crate::memory::TypeAddr;

pub type Result<T> = std::result::Result<T, Error>;

/// Faults surfaced by the engine to whoever drives it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("instruction fetch out of range at pc {pc:#06X}")]
    AddressOutOfRange { pc: TypeAddr },

    #[error("unknown opcode {opcode:#06X} at pc {pc:#06X}")]
    UnknownOpcode { opcode: u16, pc: TypeAddr },

    #[error("call stack overflow at pc {pc:#06X}")]
    StackOverflow { pc: TypeAddr },

    #[error("rom is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("failed to read rom: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the driver may reinitialise and reload the same image.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::AddressOutOfRange { .. })
    }
}
