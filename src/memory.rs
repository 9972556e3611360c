use log::debug;

use crate::error::{Error, Result};
use crate::registers::{IndexRegister, ProgramCounter};

pub type TypeAddr = u16; // in reality u12

pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START: TypeAddr = 0x200;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;
pub const FONT_START: TypeAddr = 0x000;
/// Bytes per font glyph.
pub const GLYPH_HEIGHT: u8 = 5;
pub const STACK_DEPTH: usize = 16;

const ADDR_MASK: TypeAddr = 0x0FFF;

type FontBytes = [u8; GLYPH_HEIGHT as usize * 16];

pub const DEFAULT_FONT: FontBytes = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Address of the sprite for hex digit `digit`. Values above 0xF are not
/// masked, they just point past the font.
pub fn glyph_addr(digit: u8) -> TypeAddr {
    FONT_START + digit as TypeAddr * GLYPH_HEIGHT as TypeAddr
}

pub struct Memory {
    // 4k bytes
    // font data stored from 000 -> 04F, program from 200 onwards
    bytes: [u8; MEMORY_SIZE],
    pub pc: ProgramCounter,
    pub index: IndexRegister,
    pub stack: Stack,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        let mut mem = Self {
            bytes: [0; MEMORY_SIZE],
            pc: ProgramCounter(PROGRAM_START),
            index: IndexRegister(0x0),
            stack: Stack::new(),
        };
        mem.load_font();
        mem
    }

    /// Zero everything, rewind the pc and put the font back.
    pub fn reset(&mut self) {
        self.bytes = [0; MEMORY_SIZE];
        self.pc = ProgramCounter(PROGRAM_START);
        self.index = IndexRegister(0x0);
        self.stack = Stack::new();
        self.load_font();
    }

    // Data accesses go through the 12-bit address bus, so they wrap
    pub fn set(&mut self, addr: TypeAddr, val: u8) {
        self.bytes[(addr & ADDR_MASK) as usize] = val;
    }

    pub fn get(&self, addr: TypeAddr) -> u8 {
        self.bytes[(addr & ADDR_MASK) as usize]
    }

    /// `len` bytes starting at `addr`, wrapping at the end of memory.
    pub fn read(&self, addr: TypeAddr, len: u8) -> Vec<u8> {
        (0..len as TypeAddr)
            .map(|offset| self.get(addr.wrapping_add(offset)))
            .collect()
    }

    /// Big-endian instruction word at the pc. Unlike data accesses this never
    /// wraps: a word hanging off the end of memory is a fault.
    pub fn next_instruction(&self) -> Result<u16> {
        let pc = self.pc.0;
        let (l, r) = match (self.bytes.get(pc as usize), self.bytes.get(pc as usize + 1)) {
            (Some(l), Some(r)) => (*l, *r),
            _ => return Err(Error::AddressOutOfRange { pc }),
        };
        Ok(((l as u16) << 8) | r as u16)
    }

    pub fn set_pc(&mut self, addr: TypeAddr) {
        self.pc.set_addr(addr);
    }

    pub fn set_index(&mut self, addr: TypeAddr) {
        self.index.set_addr(addr);
    }

    // loads program instructions starting at address 0x200
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_ROM_SIZE {
            return Err(Error::RomTooLarge {
                size: bytes.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let start_index = PROGRAM_START as usize;
        self.bytes[start_index..start_index + bytes.len()].copy_from_slice(bytes);
        debug!("loaded {} byte rom at {:#05x}", bytes.len(), PROGRAM_START);
        Ok(())
    }

    fn load_font(&mut self) {
        let start_index = FONT_START as usize;
        self.bytes[start_index..start_index + DEFAULT_FONT.len()].copy_from_slice(&DEFAULT_FONT);
    }
}

/// Return addresses for subroutine calls, fixed at 16 levels.
#[derive(Debug, Clone)]
pub struct Stack {
    addresses: [TypeAddr; STACK_DEPTH],
    sp: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    pub fn new() -> Self {
        Self {
            addresses: [0; STACK_DEPTH],
            sp: 0,
        }
    }

    /// Returns false, leaving the stack untouched, when already full.
    #[must_use]
    pub fn push(&mut self, addr: TypeAddr) -> bool {
        if self.sp == STACK_DEPTH {
            return false;
        }
        self.addresses[self.sp] = addr;
        self.sp += 1;
        true
    }

    pub fn pop(&mut self) -> Option<TypeAddr> {
        if self.sp == 0 {
            return None;
        }
        self.sp -= 1;
        Some(self.addresses[self.sp])
    }

    pub fn len(&self) -> usize {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }
}
