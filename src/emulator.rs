use std::path::Path;

use log::{debug, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::Config,
    decode::Instruction,
    display::FrameBuffer,
    error::{Error, Result},
    keyboard::InputLatch,
    memory::{glyph_addr, Memory, TypeAddr},
    registers::{Registers, FLAG},
    timer::Timer,
};

/// What the engine is doing between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Suspended on FX0A until a key is latched; holds the target register.
    AwaitingKey(u8),
    /// The program returned from its outermost level.
    Halted,
}

/// Outcome of a single [`Emulator::cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Executed,
    AwaitingKey,
    Halted,
}

pub struct Emulator {
    pub regs: Registers,
    pub mem: Memory,
    fb: FrameBuffer,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
    input: InputLatch,
    state: RunState,
    beep: bool,
    timer_phase: u32,
    rng: StdRng,
    config: Config,
    rom: Vec<u8>,
}

impl Emulator {
    pub fn new(rom: &[u8]) -> Result<Self> {
        Self::with_config(rom, Config::default())
    }

    pub fn with_config(rom: &[u8], config: Config) -> Result<Self> {
        let mut mem = Memory::new();
        mem.load_rom(rom)?;

        Ok(Self {
            regs: Registers::new(),
            mem,
            fb: FrameBuffer::new(),
            delay_timer: Timer::default(),
            sound_timer: Timer::default(),
            input: InputLatch::new(),
            state: RunState::Running,
            beep: false,
            timer_phase: 0,
            rng: StdRng::from_entropy(),
            config,
            rom: rom.to_vec(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
        let rom = std::fs::read(path)?;
        Self::with_config(&rom, config)
    }

    /// Make `CXNN` deterministic.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Power-on state with the same program image loaded again.
    pub fn reset(&mut self) -> Result<()> {
        debug!("resetting and reloading {} byte rom", self.rom.len());
        self.mem.reset();
        self.mem.load_rom(&self.rom)?;
        self.regs.reset();
        self.fb = FrameBuffer::new();
        self.delay_timer = Timer::default();
        self.sound_timer = Timer::default();
        self.input.clear();
        self.state = RunState::Running;
        self.beep = false;
        self.timer_phase = 0;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run_state(&self) -> RunState {
        self.state
    }

    /// Latch the key observed for the coming cycle, replacing the previous one.
    pub fn set_key(&mut self, key: Option<u8>) {
        self.input.set(key);
    }

    pub fn framebuffer(&self) -> &[u8] {
        self.fb.pixels()
    }

    /// Whether the screen changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        self.fb.take_redraw()
    }

    /// Whether the sound timer ran out since the last call.
    pub fn take_beep(&mut self) -> bool {
        std::mem::take(&mut self.beep)
    }

    pub fn fetch_decode(&self) -> Result<Instruction> {
        let pc = self.mem.pc.0;
        let opcode = self.mem.next_instruction()?;
        let ins = Instruction::decode(opcode).ok_or(Error::UnknownOpcode { opcode, pc })?;
        trace!("{pc:#05x}: {opcode:04x} {ins:?}");
        Ok(ins)
    }

    /// Run one fetch-decode-execute-timer cycle.
    ///
    /// While suspended on a key wait nothing advances, timers included, until
    /// a key is latched.
    pub fn cycle(&mut self) -> Result<Cycle> {
        match self.state {
            RunState::Halted => return Ok(Cycle::Halted),
            RunState::AwaitingKey(vx) => match self.input.get() {
                Some(key) => {
                    trace!("key {key:x} resumes wait into v{vx:x}");
                    self.regs.set_register(vx, key);
                    self.mem.pc.increment();
                    self.state = RunState::Running;
                }
                None => return Ok(Cycle::AwaitingKey),
            },
            RunState::Running => {
                let operation = self.fetch_decode()?;
                self.execute_ins(operation)?;
                match self.state {
                    RunState::Halted => return Ok(Cycle::Halted),
                    RunState::AwaitingKey(_) => return Ok(Cycle::AwaitingKey),
                    RunState::Running => {}
                }
            }
        }
        self.sync_timers();
        Ok(Cycle::Executed)
    }

    pub fn execute_ins(&mut self, ins: Instruction) -> Result<()> {
        let quirks = self.config.quirks;
        match ins {
            Instruction::ClearScreen => self.fb.clear_buffer(),
            Instruction::Return => match self.mem.stack.pop() {
                Some(addr) => {
                    self.mem.set_pc(addr);
                    return Ok(());
                }
                None => {
                    debug!("return with empty stack at {:#05x}, halting", self.mem.pc.0);
                    self.state = RunState::Halted;
                    return Ok(());
                }
            },
            Instruction::Jump(addr) => {
                self.mem.set_pc(addr);
                return Ok(());
            }
            Instruction::Call(addr) => {
                let pc = self.mem.pc.0;
                // store the instruction after the call to return back to
                if !self.mem.stack.push(pc + 2) {
                    return Err(Error::StackOverflow { pc });
                }
                self.mem.set_pc(addr);
                return Ok(());
            }
            Instruction::JumpWithOffset(addr) => {
                self.mem.set_pc(addr + self.regs.get(0) as TypeAddr);
                return Ok(());
            }
            Instruction::SkipEqualConstant(vx, nn) => {
                let cond = self.regs.get(vx) == nn;
                self.skip_if(cond);
                return Ok(());
            }
            Instruction::SkipNotEqualConstant(vx, nn) => {
                let cond = self.regs.get(vx) != nn;
                self.skip_if(cond);
                return Ok(());
            }
            Instruction::SkipEqualRegister(vx, vy) => {
                let cond = self.regs.get(vx) == self.regs.get(vy);
                self.skip_if(cond);
                return Ok(());
            }
            Instruction::SkipNotEqualRegister(vx, vy) => {
                let cond = self.regs.get(vx) != self.regs.get(vy);
                self.skip_if(cond);
                return Ok(());
            }
            Instruction::SkipIfPressed(vx) => {
                let cond = self.input.is_pressed(self.regs.get(vx));
                self.skip_if(cond);
                return Ok(());
            }
            Instruction::SkipIfNotPressed(vx) => {
                let cond = !self.input.is_pressed(self.regs.get(vx));
                self.skip_if(cond);
                return Ok(());
            }
            Instruction::GetKey(vx) => match self.input.get() {
                Some(key) => self.regs.set_register(vx, key),
                None => {
                    self.state = RunState::AwaitingKey(vx);
                    return Ok(());
                }
            },
            Instruction::SetRegister(vx, nn) => self.regs.set_register(vx, nn),
            Instruction::AddToRegister(vx, nn) => self.regs.add_to_register(vx, nn),
            Instruction::CopyRegister(vx, vy) => {
                self.regs.set_register(vx, self.regs.get(vy));
            }
            Instruction::Or(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) | self.regs.get(vy));
            }
            Instruction::And(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) & self.regs.get(vy));
            }
            Instruction::XOr(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) ^ self.regs.get(vy));
            }
            Instruction::Add(vx, vy) => {
                let (z, carry) = self.regs.get(vx).overflowing_add(self.regs.get(vy));
                self.regs.set_register(vx, z);
                self.regs.set_flag(carry);
            }
            Instruction::SubtractForward(vx, vy) => {
                let (x, y) = (self.regs.get(vx), self.regs.get(vy));
                self.regs.set_register(vx, x.wrapping_sub(y));
                self.regs.set_flag(x >= y); // no borrow
            }
            Instruction::SubtractBackward(vx, vy) => {
                let (x, y) = (self.regs.get(vx), self.regs.get(vy));
                self.regs.set_register(vx, y.wrapping_sub(x));
                self.regs.set_flag(y >= x); // no borrow
            }
            Instruction::RightShift(vx, vy) => {
                let src = if quirks.shift_in_place { vx } else { vy };
                let value = self.regs.get(src);
                self.regs.set_register(FLAG, value & 1);
                self.write_shifted(vx, vy, value >> 1);
            }
            Instruction::LeftShift(vx, vy) => {
                let src = if quirks.shift_in_place { vx } else { vy };
                let value = self.regs.get(src);
                self.regs.set_register(FLAG, (value >> 7) & 1);
                self.write_shifted(vx, vy, value << 1);
            }
            Instruction::SetIndexRegister(addr) => self.mem.set_index(addr),
            Instruction::AddToIndex(vx) => {
                self.mem.index.offset(self.regs.get(vx) as u16);
            }
            Instruction::PointChar(vx) => {
                self.mem.set_index(glyph_addr(self.regs.get(vx)));
            }
            Instruction::Random(vx, nn) => {
                let ransuu: u8 = self.rng.gen();
                self.regs.set_register(vx, nn & ransuu);
            }
            Instruction::Display(reg_x, reg_y, height) => {
                let (x, y) = (self.regs.get(reg_x), self.regs.get(reg_y));
                // rows I..I+N, one byte (8 pixels) each
                let sprite = self.mem.read(self.mem.index.0, height);
                let collision = self.fb.paint(x, y, &sprite, quirks.wrap_sprites);
                self.regs.set_flag(collision);
            }
            Instruction::ToDecimal(vx) => {
                let value = self.regs.get(vx);
                let index = self.mem.index.0;
                let digits = [value / 100, (value / 10) % 10, value % 10];
                for (i, digit) in digits.into_iter().enumerate() {
                    self.mem.set(index.wrapping_add(i as u16), digit);
                }
            }
            Instruction::CopyDelayToRegister(vx) => {
                self.regs.set_register(vx, self.delay_timer.count);
            }
            Instruction::CopyRegisterToDelay(vx) => self.delay_timer.set(self.regs.get(vx)),
            Instruction::CopyRegisterToSound(vx) => self.sound_timer.set(self.regs.get(vx)),
            Instruction::StoreRegisterToMemory(vx) => {
                let index = self.mem.index.0;
                for reg in 0..=vx {
                    self.mem.set(index.wrapping_add(reg as u16), self.regs.get(reg));
                }
                self.spill_fill_index(vx);
            }
            Instruction::LoadRegisterFromMemory(vx) => {
                let index = self.mem.index.0;
                for reg in 0..=vx {
                    let reg_val = self.mem.get(index.wrapping_add(reg as u16));
                    self.regs.set_register(reg, reg_val);
                }
                self.spill_fill_index(vx);
            }
        }
        self.mem.pc.increment();
        Ok(())
    }

    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.mem.pc.skip();
        } else {
            self.mem.pc.increment();
        }
    }

    fn write_shifted(&mut self, vx: u8, vy: u8, value: u8) {
        self.regs.set_register(vx, value);
        if !self.config.quirks.shift_in_place {
            self.regs.set_register(vy, value);
        }
    }

    fn spill_fill_index(&mut self, vx: u8) {
        if self.config.quirks.load_store_increments_index {
            self.mem.index.offset(vx as u16 + 1);
        }
    }

    pub fn sync_timers(&mut self) {
        self.timer_phase += 1;
        if self.timer_phase < self.config.cycles_per_timer_tick.max(1) {
            return;
        }
        self.timer_phase = 0;
        self.delay_timer.tick();
        if self.sound_timer.tick() {
            self.beep = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quirks;
    use crate::display::WIDTH;
    use crate::memory::{MAX_ROM_SIZE, PROGRAM_START, STACK_DEPTH};

    fn rom(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    fn boot(words: &[u16]) -> Emulator {
        let mut emu = Emulator::new(&rom(words)).unwrap();
        emu.seed_rng(7);
        emu
    }

    fn emu_with(words: &[u16], quirks: Quirks) -> Emulator {
        let config = Config {
            quirks,
            ..Config::default()
        };
        Emulator::with_config(&rom(words), config).unwrap()
    }

    fn run(emu: &mut Emulator, cycles: usize) {
        for _ in 0..cycles {
            assert_eq!(emu.cycle().unwrap(), Cycle::Executed);
        }
    }

    fn pc(emu: &Emulator) -> TypeAddr {
        emu.mem.pc.0
    }

    #[test]
    fn load_immediate() {
        let mut emu = boot(&[0x6A3C]);
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(0xA), 0x3C);
        assert_eq!(pc(&emu), 0x202);
    }

    #[test]
    fn clear_then_return_on_empty_stack_halts() {
        let mut emu = boot(&[0x00E0, 0x00EE]);
        assert_eq!(emu.cycle().unwrap(), Cycle::Executed);
        assert!(emu.take_redraw());
        assert_eq!(emu.cycle().unwrap(), Cycle::Halted);
        assert_eq!(emu.run_state(), RunState::Halted);
        // stays halted
        assert_eq!(emu.cycle().unwrap(), Cycle::Halted);
    }

    #[test]
    fn skip_equal_twice_skips_twice() {
        let mut emu = boot(&[0x3300, 0x0000, 0x3300, 0x0000]);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x204);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x208);
    }

    #[test]
    fn skips_not_taken_step_by_two() {
        let mut emu = boot(&[0x6105, 0x3106, 0x4105, 0x6205, 0x5120, 0x9120]);
        run(&mut emu, 1);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x204);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x206);
        run(&mut emu, 1);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x20C);

        let mut emu = boot(&[0x6105, 0x9120]);
        run(&mut emu, 2);
        assert_eq!(pc(&emu), 0x206);
    }

    const ZERO_GLYPH: [u8; 5] = [0xF0, 0x90, 0x90, 0x90, 0xF0];

    fn lit_pixels(emu: &Emulator) -> Vec<(usize, usize)> {
        let fb = emu.framebuffer();
        (0..fb.len())
            .filter(|i| fb[*i] == 1)
            .map(|i| (i % WIDTH, i / WIDTH))
            .collect()
    }

    fn zero_glyph_pixels() -> Vec<(usize, usize)> {
        let mut expected = vec![];
        for (y, row) in ZERO_GLYPH.iter().enumerate() {
            for x in 0..8 {
                if (row >> (7 - x)) & 1 == 1 {
                    expected.push((x, y));
                }
            }
        }
        expected
    }

    #[test]
    fn draw_font_glyph_from_program_area() {
        // the glyph for 0 sits right after the two instructions
        let mut image = rom(&[0xA204, 0xD015]);
        image.extend_from_slice(&ZERO_GLYPH);
        let mut emu = Emulator::new(&image).unwrap();
        emu.regs.set_register(0xF, 1);
        run(&mut emu, 2);

        assert_eq!(emu.regs.get(0xF), 0);
        assert_eq!(emu.mem.index.0, 0x204);
        assert!(emu.take_redraw());
        assert_eq!(lit_pixels(&emu), zero_glyph_pixels());
    }

    #[test]
    fn draw_glyph_stored_at_program_start() {
        let mut emu = Emulator::new(&ZERO_GLYPH).unwrap();
        emu.regs.set_register(0xF, 1);
        emu.execute_ins(Instruction::SetIndexRegister(0x200)).unwrap();
        emu.execute_ins(Instruction::Display(0x0, 0x1, 0x5)).unwrap();

        assert_eq!(emu.regs.get(0xF), 0);
        assert_eq!(emu.mem.index.0, 0x200);
        assert_eq!(pc(&emu), 0x204);
        assert_eq!(lit_pixels(&emu), zero_glyph_pixels());
    }

    #[test]
    fn draw_twice_restores_screen_and_sets_collision() {
        let mut emu = boot(&[0x6007, 0x6109, 0xF029, 0xD015, 0xD015]);
        run(&mut emu, 4);
        assert_eq!(emu.regs.get(0xF), 0);
        assert!(emu.framebuffer().iter().any(|p| *p == 1));
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(0xF), 1);
        assert!(emu.framebuffer().iter().all(|p| *p == 0));
    }

    #[test]
    fn add_sets_carry_over_all_pairs() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                let mut emu = boot(&[0x8124]);
                emu.regs.set_register(1, a);
                emu.regs.set_register(2, b);
                run(&mut emu, 1);
                assert_eq!(emu.regs.get(1), a.wrapping_add(b));
                assert_eq!(emu.regs.get(0xF), (a as u16 + b as u16 > 255) as u8);
            }
        }
    }

    #[test]
    fn subtract_flags_no_borrow_over_all_pairs() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                let mut emu = boot(&[0x8125, 0x8347]);
                emu.regs.set_register(1, a);
                emu.regs.set_register(2, b);
                emu.regs.set_register(3, b);
                emu.regs.set_register(4, a);
                run(&mut emu, 1);
                assert_eq!(emu.regs.get(1), a.wrapping_sub(b));
                assert_eq!(emu.regs.get(0xF), (a >= b) as u8);
                // VY - VX with VY = a, VX = b
                run(&mut emu, 1);
                assert_eq!(emu.regs.get(3), a.wrapping_sub(b));
                assert_eq!(emu.regs.get(0xF), (a >= b) as u8);
            }
        }
    }

    #[test]
    fn flag_wins_when_vf_is_the_destination() {
        let mut emu = boot(&[0x8F14]);
        emu.regs.set_register(0xF, 0xFF);
        emu.regs.set_register(0x1, 0x02);
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(0xF), 1);
    }

    #[test]
    fn shifts_move_vy_into_both_registers() {
        for v in 0..=255u8 {
            let mut emu = boot(&[0x8126, 0x834E]);
            emu.regs.set_register(2, v);
            emu.regs.set_register(4, v);
            run(&mut emu, 1);
            assert_eq!(emu.regs.get(1), v >> 1);
            assert_eq!(emu.regs.get(2), v >> 1);
            assert_eq!(emu.regs.get(0xF), v & 1);
            run(&mut emu, 1);
            assert_eq!(emu.regs.get(3), v << 1);
            assert_eq!(emu.regs.get(4), v << 1);
            assert_eq!(emu.regs.get(0xF), v >> 7);
        }
    }

    #[test]
    fn shift_in_place_leaves_vy_alone() {
        let quirks = Quirks {
            shift_in_place: true,
            ..Quirks::default()
        };
        let mut emu = emu_with(&[0x8126, 0x812E], quirks);
        emu.regs.set_register(1, 0b1000_0011);
        emu.regs.set_register(2, 0x55);
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(1), 0b0100_0001);
        assert_eq!(emu.regs.get(2), 0x55);
        assert_eq!(emu.regs.get(0xF), 1);
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(1), 0b1000_0010);
        assert_eq!(emu.regs.get(0xF), 0);
    }

    #[test]
    fn bitwise_ops_and_add_immediate() {
        let mut emu = boot(&[0x61F0, 0x623C, 0x8121, 0x8322, 0x8423, 0x8520, 0x75FF]);
        emu.regs.set_register(3, 0x0F);
        emu.regs.set_register(4, 0xFF);
        emu.regs.set_register(5, 0x01);
        emu.regs.set_register(0xF, 0x9);
        run(&mut emu, 7);
        assert_eq!(emu.regs.get(1), 0xFC);
        assert_eq!(emu.regs.get(3), 0x0C);
        assert_eq!(emu.regs.get(4), 0xC3);
        assert_eq!(emu.regs.get(5), 0x3B);
        // 7XNN leaves VF untouched
        assert_eq!(emu.regs.get(0xF), 0x9);
    }

    #[test]
    fn jumps() {
        let mut emu = boot(&[0x1208, 0x0000, 0x0000, 0x0000, 0x6004, 0xB300]);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x208);
        run(&mut emu, 2);
        assert_eq!(pc(&emu), 0x304);
    }

    #[test]
    fn call_and_return() {
        // 200: call 206; 202: ld v1; 204: halt; 206: ld v2; 208: ret
        let mut emu = boot(&[0x2206, 0x6111, 0x00EE, 0x6222, 0x00EE]);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x206);
        run(&mut emu, 2);
        assert_eq!(pc(&emu), 0x202);
        run(&mut emu, 1);
        assert_eq!(emu.cycle().unwrap(), Cycle::Halted);
        assert_eq!((emu.regs.get(1), emu.regs.get(2)), (0x11, 0x22));
    }

    #[test]
    fn sixteen_calls_nest_and_the_seventeenth_overflows() {
        // each call lands on the next word, which is another call
        let calls: Vec<u16> = (0..=STACK_DEPTH as u16)
            .map(|i| 0x2000 | (PROGRAM_START + 2 * (i + 1)))
            .collect();
        let mut emu = boot(&calls);
        let mut pcs = vec![];
        for _ in 0..STACK_DEPTH {
            pcs.push(pc(&emu));
            run(&mut emu, 1);
        }
        assert_eq!(emu.mem.stack.len(), STACK_DEPTH);
        let overflow_at = pc(&emu);
        assert!(matches!(
            emu.cycle(),
            Err(Error::StackOverflow { pc }) if pc == overflow_at
        ));
        assert_eq!(pc(&emu), overflow_at);

        // unwind by hand, returns come back in reverse order
        for expected in pcs.iter().rev() {
            emu.execute_ins(Instruction::Return).unwrap();
            assert_eq!(pc(&emu), expected + 2);
        }
        assert!(emu.mem.stack.is_empty());
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        let mut emu = boot(&[0x6101, 0x5121]);
        run(&mut emu, 1);
        assert!(matches!(
            emu.cycle(),
            Err(Error::UnknownOpcode { opcode: 0x5121, pc: 0x202 })
        ));
        assert!(!emu.cycle().unwrap_err().is_recoverable());
    }

    #[test]
    fn running_off_the_end_of_memory_is_recoverable() {
        let mut emu = boot(&[0x1FFF]);
        emu.regs.set_register(3, 0x42);
        run(&mut emu, 1);
        let err = emu.cycle().unwrap_err();
        assert!(matches!(err, Error::AddressOutOfRange { pc: 0xFFF }));
        assert!(err.is_recoverable());

        emu.reset().unwrap();
        assert_eq!(pc(&emu), PROGRAM_START);
        assert_eq!(emu.regs.get(3), 0);
        assert_eq!(emu.mem.get(0x200), 0x1F);
        assert_eq!(emu.mem.get(0x000), 0xF0);
    }

    #[test]
    fn oversized_rom_is_rejected() {
        let image = vec![0u8; MAX_ROM_SIZE + 1];
        assert!(matches!(
            Emulator::new(&image),
            Err(Error::RomTooLarge { .. })
        ));
        assert!(Emulator::new(&[]).is_ok());
    }

    #[test]
    fn index_instructions() {
        let mut emu = boot(&[0xA123, 0x6510, 0xF51E, 0x650B, 0xF529]);
        run(&mut emu, 3);
        assert_eq!(emu.mem.index.0, 0x133);
        run(&mut emu, 2);
        assert_eq!(emu.mem.index.0, 55);
    }

    #[test]
    fn sprite_address_uses_the_whole_register() {
        let mut emu = boot(&[0x601A, 0xF029, 0x61FF, 0xF129]);
        run(&mut emu, 2);
        assert_eq!(emu.mem.index.0, 0x1A * 5);
        run(&mut emu, 2);
        assert_eq!(emu.mem.index.0, 0xFF * 5);
    }

    #[test]
    fn bcd() {
        let mut emu = boot(&[0xA300, 0xF033, 0xA310, 0xF133, 0xA320, 0xF233]);
        emu.regs.set_register(0, 254);
        emu.regs.set_register(1, 7);
        emu.regs.set_register(2, 40);
        run(&mut emu, 6);
        assert_eq!(emu.mem.read(0x300, 3), vec![2, 5, 4]);
        assert_eq!(emu.mem.read(0x310, 3), vec![0, 0, 7]);
        assert_eq!(emu.mem.read(0x320, 3), vec![0, 4, 0]);
        assert_eq!(emu.mem.index.0, 0x320);
    }

    #[test]
    fn store_and_load_registers() {
        let mut emu = boot(&[0xA400, 0xF355, 0x6000, 0x6100, 0x6200, 0x6300, 0xA400, 0xF265]);
        for reg in 0..=4 {
            emu.regs.set_register(reg, 0x10 + reg);
        }
        run(&mut emu, 2);
        assert_eq!(emu.mem.read(0x400, 5), vec![0x10, 0x11, 0x12, 0x13, 0]);
        assert_eq!(emu.mem.index.0, 0x404);
        run(&mut emu, 6);
        assert_eq!(
            (0..=3).map(|r| emu.regs.get(r)).collect::<Vec<_>>(),
            vec![0x10, 0x11, 0x12, 0]
        );
        assert_eq!(emu.mem.index.0, 0x403);
    }

    #[test]
    fn store_without_index_increment() {
        let quirks = Quirks {
            load_store_increments_index: false,
            ..Quirks::default()
        };
        let mut emu = emu_with(&[0xA400, 0xF155], quirks);
        run(&mut emu, 2);
        assert_eq!(emu.mem.index.0, 0x400);
    }

    #[test]
    fn random_is_masked() {
        let mut emu = boot(&[0xC10F, 0xC200, 0xC3FF]);
        run(&mut emu, 3);
        assert!(emu.regs.get(1) <= 0x0F);
        assert_eq!(emu.regs.get(2), 0);

        let mut again = Emulator::new(&rom(&[0xC10F, 0xC200, 0xC3FF])).unwrap();
        again.seed_rng(7);
        run(&mut again, 3);
        assert_eq!(again.regs.get(3), emu.regs.get(3));
    }

    #[test]
    fn key_skips_follow_the_latch() {
        let mut emu = boot(&[0x6A05, 0xEA9E, 0x0000, 0xEAA1, 0xEA9E, 0xEAA1]);
        run(&mut emu, 1);
        emu.set_key(Some(0x5));
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x206);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x208);
        emu.set_key(Some(0x6));
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x20A);
        emu.set_key(None);
        run(&mut emu, 1);
        assert_eq!(pc(&emu), 0x20E);
    }

    #[test]
    fn wait_for_key_suspends_without_ticking_timers() {
        let mut emu = boot(&[0x6305, 0xF315, 0xF40A, 0x6501]);
        run(&mut emu, 2);
        assert_eq!(emu.delay_timer.count, 4);

        assert_eq!(emu.cycle().unwrap(), Cycle::AwaitingKey);
        assert_eq!(emu.run_state(), RunState::AwaitingKey(4));
        for _ in 0..5 {
            assert_eq!(emu.cycle().unwrap(), Cycle::AwaitingKey);
        }
        assert_eq!(emu.delay_timer.count, 4);
        assert_eq!(pc(&emu), 0x204);

        emu.set_key(Some(0xB));
        assert_eq!(emu.cycle().unwrap(), Cycle::Executed);
        assert_eq!(emu.regs.get(4), 0xB);
        assert_eq!(pc(&emu), 0x206);
        assert_eq!(emu.delay_timer.count, 3);
        assert_eq!(emu.run_state(), RunState::Running);
    }

    #[test]
    fn wait_for_key_completes_at_once_when_latched() {
        let mut emu = boot(&[0xF20A]);
        emu.set_key(Some(0x3));
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(2), 0x3);
        assert_eq!(pc(&emu), 0x202);
    }

    #[test]
    fn timers_count_down_and_beep_once() {
        let mut emu = boot(&[0x6102, 0xF118, 0xF115, 0xF207, 0x1208]);
        run(&mut emu, 2);
        // the sound timer was set to 2 and ticked once in the same cycle
        assert_eq!(emu.sound_timer.count, 1);
        assert!(!emu.take_beep());
        run(&mut emu, 1);
        assert_eq!(emu.sound_timer.count, 0);
        assert_eq!(emu.delay_timer.count, 1);
        assert!(emu.take_beep());
        assert!(!emu.take_beep());
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(2), 1);
        run(&mut emu, 10);
        assert_eq!(emu.delay_timer.count, 0);
        assert!(!emu.take_beep());
    }

    #[test]
    fn timer_divider_slows_timers() {
        let config = Config {
            cycles_per_timer_tick: 3,
            ..Config::default()
        };
        let mut emu = Emulator::with_config(&rom(&[0x610A, 0xF115, 0x1204]), config).unwrap();
        run(&mut emu, 2);
        assert_eq!(emu.delay_timer.count, 10);
        run(&mut emu, 1);
        assert_eq!(emu.delay_timer.count, 9);
        run(&mut emu, 3);
        assert_eq!(emu.delay_timer.count, 8);
    }

    #[test]
    fn reset_clears_screen_and_suspension() {
        let mut emu = boot(&[0xD005, 0xF00A]);
        run(&mut emu, 1);
        assert_eq!(emu.cycle().unwrap(), Cycle::AwaitingKey);
        emu.reset().unwrap();
        assert_eq!(emu.run_state(), RunState::Running);
        assert!(emu.framebuffer().iter().all(|p| *p == 0));
        assert!(!emu.take_redraw());
    }
}
