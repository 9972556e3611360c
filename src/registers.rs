use crate::memory::TypeAddr;

pub const REGISTER_COUNT: usize = 16;
/// VF doubles as the carry, borrow and collision flag.
pub const FLAG: u8 = 0xF;

#[derive(Debug, Clone, Default)]
pub struct Registers {
    registers: [u8; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_register(&mut self, reg_num: u8, value: u8) {
        self.registers[(reg_num & 0xF) as usize] = value;
    }

    // no carry out, VF stays untouched
    pub fn add_to_register(&mut self, reg_num: u8, value: u8) {
        let total = self.get(reg_num).wrapping_add(value);
        self.set_register(reg_num, total);
    }

    pub fn set_flag(&mut self, flag: bool) {
        self.set_register(FLAG, flag as u8);
    }

    pub fn get(&self, reg_num: u8) -> u8 {
        self.registers[(reg_num & 0xF) as usize]
    }

    pub fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
    }
}

// Special registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter(pub TypeAddr);

impl ProgramCounter {
    /// Step past the current instruction.
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(2);
    }

    /// Step past the current instruction and the one after it.
    pub fn skip(&mut self) {
        self.0 = self.0.wrapping_add(4);
    }

    pub fn set_addr(&mut self, addr: TypeAddr) {
        self.0 = addr;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRegister(pub TypeAddr);

impl IndexRegister {
    pub fn set_addr(&mut self, addr: TypeAddr) {
        self.0 = addr;
    }

    pub fn offset(&mut self, by: u16) {
        self.0 = self.0.wrapping_add(by);
    }
}
