//! Headless runner: loads a ROM, steps it, and prints a JSON report

use anyhow::{Context, bail};
use clap::Parser;
use log::{debug, info};
use nes_core::prelude::*;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Frames run after a state check to compare both machines
const CHECK_FRAMES: usize = 10;

/// Step an iNES ROM frame by frame without a window
#[derive(Parser, Debug)]
#[command(name = "nes-step")]
#[command(about = "Runs an NES ROM headlessly and reports its state", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value = "60")]
    frames: usize,

    /// Use the lightweight pipeline (no pixels are produced)
    #[arg(long)]
    headless: bool,

    /// Serialize into a fresh emulator and check both run identically
    #[arg(long)]
    check_roundtrip: bool,

    /// Backup, run ahead, restore, and check the state came back
    #[arg(long)]
    check_backup: bool,

    /// Buttons held on controller 1, e.g. `a,start` or `right,b`
    #[arg(short, long, value_parser = parse_buttons, default_value = "")]
    press: JoypadButtons,
}

fn parse_buttons(input: &str) -> Result<JoypadButtons, String> {
    let mut buttons = JoypadButtons::empty();
    for name in input.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        buttons |= match name.to_ascii_lowercase().as_str() {
            "a" => JoypadButtons::BUTTON_A,
            "b" => JoypadButtons::BUTTON_B,
            "select" => JoypadButtons::SELECT,
            "start" => JoypadButtons::START,
            "up" => JoypadButtons::UP,
            "down" => JoypadButtons::DOWN,
            "left" => JoypadButtons::LEFT,
            "right" => JoypadButtons::RIGHT,
            other => return Err(format!("unknown button '{other}'")),
        };
    }
    Ok(buttons)
}

#[derive(Serialize)]
struct Report {
    rom: String,
    mapper: u8,
    mirroring: String,
    prg_rom_size: usize,
    chr_rom_size: usize,
    pipeline: String,
    frames: usize,
    cpu_cycles: u64,
    ppu_dots: u64,
    program_counter: u16,
    ram_checksum: String,
    screen_checksum: String,
    state_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    roundtrip_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_ok: Option<bool>,
}

fn checksum<T: Hash + ?Sized>(value: &T) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn run(emulator: &mut Emulator, frames: usize, buttons: JoypadButtons) {
    for _ in 0..frames {
        if let Some(port) = emulator.controller(0) {
            *port = buttons.bits();
        }
        emulator.step();
    }
}

fn check_roundtrip(args: &Args, emulator: &mut Emulator) -> anyhow::Result<bool> {
    let state = emulator.serialize();
    let mut copy = Emulator::from_file(&args.rom, args.headless)
        .with_context(|| format!("reloading {}", args.rom.display()))?;
    copy.deserialize(&state);

    if copy.serialize() != state {
        debug!("Deserialized state re-encodes differently");
        return Ok(false);
    }
    for frame in 0..CHECK_FRAMES {
        run(emulator, 1, args.press);
        run(&mut copy, 1, args.press);
        if emulator.serialize() != copy.serialize() {
            debug!("Round-trip copy diverged at frame {frame}");
            return Ok(false);
        }
    }
    Ok(true)
}

fn check_backup(args: &Args, emulator: &mut Emulator) -> bool {
    let checkpoint = emulator.serialize();
    emulator.backup();
    run(emulator, CHECK_FRAMES, args.press);
    emulator.restore();
    emulator.serialize() == checkpoint
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut emulator = Emulator::from_file(&args.rom, args.headless)
        .with_context(|| format!("loading {}", args.rom.display()))?;

    info!("Running {} frames", args.frames);
    run(&mut emulator, args.frames, args.press);

    let cartridge = emulator.cartridge();
    let mut report = Report {
        rom: args.rom.display().to_string(),
        mapper: emulator.mapper().id(),
        mirroring: format!("{:?}", emulator.mapper().mirroring()),
        prg_rom_size: cartridge.prg_rom.len(),
        chr_rom_size: cartridge.chr_rom.len(),
        pipeline: format!("{:?}", PipelineVariant::from_headless(args.headless)),
        frames: args.frames,
        cpu_cycles: emulator.cpu_cycles(),
        ppu_dots: emulator.ppu_dots(),
        program_counter: emulator.cpu().program_counter,
        ram_checksum: checksum(emulator.memory()),
        screen_checksum: checksum(emulator.screen()),
        state_size: emulator.serialize().len(),
        roundtrip_ok: None,
        backup_ok: None,
    };

    // backup first: it leaves the machine where it was
    if args.check_backup {
        report.backup_ok = Some(check_backup(&args, &mut emulator));
    }
    if args.check_roundtrip {
        report.roundtrip_ok = Some(check_roundtrip(&args, &mut emulator)?);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.backup_ok == Some(false) || report.roundtrip_ok == Some(false) {
        bail!("state check failed");
    }
    Ok(())
}
