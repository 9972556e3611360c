use crate::memory::TypeAddr;

/// Instruction word with a cursor over its four nibbles, read left to right.
pub struct RawInstruction {
    code: u16,
    i: u8,
}

impl RawInstruction {
    pub fn new(code: u16) -> Self {
        RawInstruction { code, i: 1 }
    }

    // n is starting digit (1-based from the left), m is length
    pub fn nth_m_digits(&self, n: u8, m: u8) -> u16 {
        // 0110 1100 1111 0001
        // -------------------
        //      1111 1111 1111   n = 2, m = 3
        //           1111 1111   n = 3, m = 2
        let shift_places = (4 - m - (n - 1)) * 4;
        let mask = (1u32 << (m * 4)) - 1;
        (self.code >> shift_places) & mask as u16
    }

    fn take(&mut self, len: u8) -> u16 {
        debug_assert!(self.i + len <= 5, "read past the end of {:04x}", self.code);
        let digits = self.nth_m_digits(self.i, len);
        self.i += len;
        digits
    }

    pub fn start_identifier(&mut self) -> u8 {
        self.take(1) as u8
    }

    pub fn next_register(&mut self) -> u8 {
        self.take(1) as u8
    }

    pub fn next_address(&mut self) -> TypeAddr {
        self.take(3)
    }

    pub fn next_u8(&mut self) -> u8 {
        self.take(2) as u8
    }

    pub fn next_u4(&mut self) -> u8 {
        self.take(1) as u8
    }
}

impl PartialEq<u16> for RawInstruction {
    fn eq(&self, ins: &u16) -> bool {
        ins.eq(&self.code)
    }
}

/// One decoded instruction. Register operands are indices 0x0..=0xF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // 00E0
    // turn all pixels to 0
    ClearScreen,
    // 00EE
    // return from subroutine, or end the program at the outermost level
    Return,
    // 1NNN
    Jump(TypeAddr),
    // 2NNN
    Call(TypeAddr),

    // 3XNN
    SkipEqualConstant(u8, u8),
    // 4XNN
    SkipNotEqualConstant(u8, u8),
    // 5XY0
    SkipEqualRegister(u8, u8),
    // 9XY0
    SkipNotEqualRegister(u8, u8),

    // 6XNN
    SetRegister(u8, u8),
    // 7XNN
    // no carry flag
    AddToRegister(u8, u8),

    // 8XY0
    CopyRegister(u8, u8),
    // 8XY1
    Or(u8, u8),
    // 8XY2
    And(u8, u8),
    // 8XY3
    XOr(u8, u8),
    /// 8XY4: VF is the carry.
    Add(u8, u8),
    /// 8XY5: VX = VX - VY, VF is set when there was no borrow.
    SubtractForward(u8, u8),
    // 8XY6
    RightShift(u8, u8),
    /// 8XY7: VX = VY - VX, VF is set when there was no borrow.
    SubtractBackward(u8, u8),
    // 8XYE
    LeftShift(u8, u8),

    // ANNN
    SetIndexRegister(TypeAddr),
    // BNNN
    JumpWithOffset(TypeAddr),
    // CXNN
    Random(u8, u8),
    // DXYN
    // draw an N pixel tall sprite from I at (VX, VY), XOR onto the screen,
    // VF set if any lit pixel got switched off
    Display(u8, u8, u8),

    // EX9E
    SkipIfPressed(u8),
    // EXA1
    SkipIfNotPressed(u8),

    // FX07
    CopyDelayToRegister(u8),
    // FX0A
    GetKey(u8),
    // FX15
    CopyRegisterToDelay(u8),
    // FX18
    CopyRegisterToSound(u8),
    // FX1E
    AddToIndex(u8),
    // FX29
    PointChar(u8),
    // FX33
    ToDecimal(u8),
    // FX55
    StoreRegisterToMemory(u8),
    // FX65
    LoadRegisterFromMemory(u8),
}

impl Instruction {
    /// Classify an instruction word. `None` when no operation matches.
    pub fn decode(ins: u16) -> Option<Self> {
        let mut raw = RawInstruction::new(ins);

        let decoded = match raw.start_identifier() {
            0x0 => match ins {
                0x00E0 => Self::ClearScreen,
                0x00EE => Self::Return,
                _ => return None,
            },
            0x1 => Self::Jump(raw.next_address()),
            0x2 => Self::Call(raw.next_address()),
            0x3 => Self::SkipEqualConstant(raw.next_register(), raw.next_u8()),
            0x4 => Self::SkipNotEqualConstant(raw.next_register(), raw.next_u8()),
            0x5 => {
                let (x, y) = (raw.next_register(), raw.next_register());
                match raw.next_u4() {
                    0x0 => Self::SkipEqualRegister(x, y),
                    _ => return None,
                }
            }
            0x6 => Self::SetRegister(raw.next_register(), raw.next_u8()),
            0x7 => Self::AddToRegister(raw.next_register(), raw.next_u8()),
            0x8 => {
                let (x, y) = (raw.next_register(), raw.next_register());
                match raw.next_u4() {
                    0x0 => Self::CopyRegister(x, y),
                    0x1 => Self::Or(x, y),
                    0x2 => Self::And(x, y),
                    0x3 => Self::XOr(x, y),
                    0x4 => Self::Add(x, y),
                    0x5 => Self::SubtractForward(x, y),
                    0x6 => Self::RightShift(x, y),
                    0x7 => Self::SubtractBackward(x, y),
                    0xE => Self::LeftShift(x, y),
                    _ => return None,
                }
            }
            0x9 => {
                let (x, y) = (raw.next_register(), raw.next_register());
                match raw.next_u4() {
                    0x0 => Self::SkipNotEqualRegister(x, y),
                    _ => return None,
                }
            }
            0xA => Self::SetIndexRegister(raw.next_address()),
            0xB => Self::JumpWithOffset(raw.next_address()),
            0xC => Self::Random(raw.next_register(), raw.next_u8()),
            0xD => Self::Display(raw.next_register(), raw.next_register(), raw.next_u4()),
            0xE => {
                let x = raw.next_register();
                match raw.next_u8() {
                    0x9E => Self::SkipIfPressed(x),
                    0xA1 => Self::SkipIfNotPressed(x),
                    _ => return None,
                }
            }
            0xF => {
                let x = raw.next_register();
                match raw.next_u8() {
                    0x07 => Self::CopyDelayToRegister(x),
                    0x0A => Self::GetKey(x),
                    0x15 => Self::CopyRegisterToDelay(x),
                    0x18 => Self::CopyRegisterToSound(x),
                    0x1E => Self::AddToIndex(x),
                    0x29 => Self::PointChar(x),
                    0x33 => Self::ToDecimal(x),
                    0x55 => Self::StoreRegisterToMemory(x),
                    0x65 => Self::LoadRegisterFromMemory(x),
                    _ => return None,
                }
            }
            _ => unreachable!("a nibble is at most 0xF"),
        };
        Some(decoded)
    }
}
