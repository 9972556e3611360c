// Separately:
// CPU: --rate cycles per second (600 by default)
// Display: 60 times per second
// Timer: once every --timer-divider cycles, 60 times per second by default

use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};
use minifb::Scale;

use emuchip::{timer::TIMER_DEC_PER_SECOND, Config, Cycle, Emulator, Quirks};
use sound::Sound;
use window::Screen;

mod sound;
mod window;

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 interpreter", long_about = None)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(short, long, default_value_t = 600)]
    rate: u32,

    /// Cycles per timer countdown; 1 ties the timers to the instruction rate
    #[arg(short, long, default_value_t = 10)]
    timer_divider: u32,

    /// Window scale factor (1, 2, 4, 8, 16 or 32)
    #[arg(short, long, default_value_t = 16)]
    scale: u8,

    /// Shift VX in place instead of shifting VY into VX and VY
    #[arg(long)]
    shift_in_place: bool,

    /// Leave I untouched after FX55/FX65
    #[arg(long)]
    no_index_increment: bool,

    /// Clip sprites at the screen edge instead of wrapping them
    #[arg(long)]
    clip_sprites: bool,

    /// Seed for CXNN, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Disable audio
    #[arg(short, long)]
    mute: bool,

    /// Default log level, RUST_LOG takes precedence
    #[arg(long, default_value_t = log::LevelFilter::Warn)]
    log_level: log::LevelFilter,
}

fn scale(factor: u8) -> anyhow::Result<Scale> {
    Ok(match factor {
        1 => Scale::X1,
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        16 => Scale::X16,
        32 => Scale::X32,
        _ => bail!("unsupported scale {factor}"),
    })
}

/// Whether the driver loop should keep going after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Latch `key`, run one cycle and apply the fault policy: fetch faults reload
/// the program, other faults stop it, a halted program ends the run.
fn drive(emu: &mut Emulator, key: Option<u8>) -> anyhow::Result<Flow> {
    emu.set_key(key);
    match emu.cycle() {
        Ok(Cycle::Executed | Cycle::AwaitingKey) => Ok(Flow::Continue),
        Ok(Cycle::Halted) => {
            info!("program finished");
            Ok(Flow::Finished)
        }
        Err(err) if err.is_recoverable() => {
            warn!("{err}, reloading");
            emu.reset()?;
            Ok(Flow::Continue)
        }
        Err(err) => Err(err).context("program stopped"),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .parse_default_env()
        .init();

    if args.rate == 0 {
        bail!("rate must be at least 1");
    }

    let config = Config {
        cycles_per_timer_tick: args.timer_divider.max(1),
        quirks: Quirks {
            shift_in_place: args.shift_in_place,
            load_store_increments_index: !args.no_index_increment,
            wrap_sprites: !args.clip_sprites,
        },
    };
    let mut emu = Emulator::from_file(&args.rom, config)
        .with_context(|| format!("failed to load {}", args.rom.display()))?;
    if let Some(seed) = args.seed {
        emu.seed_rng(seed);
    }
    info!("loaded {} with {config:?}", args.rom.display());

    let mut screen = Screen::new(scale(args.scale)?)?;
    let sound = if args.mute {
        None
    } else {
        Sound::new()
            .map_err(|err| warn!("audio disabled: {err:#}"))
            .ok()
    };

    let cycle_time = Duration::from_secs_f64(1.0 / args.rate as f64);
    let frame_time = Duration::from_secs_f64(1.0 / TIMER_DEC_PER_SECOND as f64);
    let mut next_cycle = Instant::now();
    let mut last_frame = Instant::now();

    while screen.is_open() {
        let key = screen.key();
        if drive(&mut emu, key)? == Flow::Finished {
            if emu.take_redraw() {
                screen.paint(emu.framebuffer())?;
            }
            break;
        }

        if emu.take_beep() {
            if let Some(sound) = &sound {
                sound.beep();
            }
        }

        if last_frame.elapsed() >= frame_time {
            if emu.take_redraw() {
                screen.paint(emu.framebuffer())?;
            } else {
                screen.poll();
            }
            last_frame = Instant::now();
        }

        next_cycle += cycle_time;
        let now = Instant::now();
        if next_cycle > now {
            thread::sleep(next_cycle - now);
        } else {
            next_cycle = now;
        }
    }
    Ok(())
}
