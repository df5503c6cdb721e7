pub mod bus;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod ppu;
pub mod serialization;
pub mod tracer;

use bus::main_bus::MainBus;
use bus::picture_bus::PictureBus;
use bus::system_bus::{self, IoPorts, SystemBus};
use cartridge::Mapper;
use cartridge::rom::Cartridge;
use controller::joypad::Joypad;
use cpu::CPU;
use cpu::interrupts;
use error::EmulatorError;
use log::{info, warn};
use ppu::consts::{SCREEN_HEIGHT, SCREEN_WIDTH};
use ppu::{PPU, PipelineVariant};
use serialization::Serializable;
use std::path::Path;
use std::sync::Arc;

/// CPU cycles in one NTSC frame
pub const CYCLES_PER_FRAME: u32 = 29781;
/// Picture unit dots per CPU cycle
pub const DOTS_PER_CYCLE: u32 = 3;

/// Value copy of the machine state taken by `backup()` or `save_state()`.
///
/// Controllers are host input, so they are not part of it.
#[derive(Debug, Clone)]
pub struct SavedState {
    main_bus: MainBus,
    picture_bus: PictureBus,
    cpu: CPU,
    ppu: PPU,
    mapper: Mapper,
}

/// One console with one cartridge inserted.
///
/// The emulator owns every component. The buses never hold references to
/// the mapper or the picture unit; each CPU cycle borrows them through a
/// short-lived [`SystemBus`].
pub struct Emulator {
    cartridge: Arc<Cartridge>,
    mapper: Mapper,
    controllers: [Joypad; 2],
    main_bus: MainBus,
    picture_bus: PictureBus,
    cpu: CPU,
    ppu: PPU,
    snapshot: Option<SavedState>,
}

impl Emulator {
    /// Builds the console around `cartridge` and powers it on.
    pub fn new(cartridge: Cartridge, variant: PipelineVariant) -> Result<Emulator, EmulatorError> {
        let cartridge = Arc::new(cartridge);
        let mapper = Mapper::new(Arc::clone(&cartridge))?;

        let mut emulator = Emulator {
            cartridge,
            mapper,
            controllers: [Joypad::new(), Joypad::new()],
            main_bus: MainBus::new(),
            picture_bus: PictureBus::new(),
            cpu: CPU::new(),
            ppu: PPU::new(variant),
            snapshot: None,
        };
        emulator.main_bus.set_mapper(&emulator.mapper);
        emulator.picture_bus.update_mirroring(&emulator.mapper);
        emulator.setup_callbacks();
        emulator.reset();

        info!(
            "Emulator ready: mapper {}, {:?} mirroring, {:?} pipeline",
            emulator.mapper.id(),
            emulator.mapper.mirroring(),
            variant
        );
        Ok(emulator)
    }

    /// Loads an iNES file. `headless` selects the lightweight pipeline.
    pub fn from_file(path: impl AsRef<Path>, headless: bool) -> Result<Emulator, EmulatorError> {
        let cartridge = Cartridge::from_file(path)?;
        Self::new(cartridge, PipelineVariant::from_headless(headless))
    }

    pub fn from_bytes(raw: &[u8], headless: bool) -> Result<Emulator, EmulatorError> {
        let cartridge = Cartridge::parse(raw)?;
        Self::new(cartridge, PipelineVariant::from_headless(headless))
    }

    /// Binds every memory-mapped register to its handler.
    ///
    /// Must run again after any bulk state replacement, since a replaced
    /// main bus may carry a stale registry.
    pub fn setup_callbacks(&mut self) {
        system_bus::wire_callbacks(&mut self.main_bus);
    }

    /// Re-derives everything the buses compute from the mapper, then
    /// rebinds the register callbacks.
    fn rewire(&mut self) {
        self.main_bus.set_mapper(&self.mapper);
        self.setup_callbacks();
    }

    /// Splits the emulator into the CPU and the bus it executes against
    fn cpu_and_bus(&mut self) -> (&mut CPU, SystemBus<'_>) {
        let bus = SystemBus {
            main_bus: &mut self.main_bus,
            ports: IoPorts {
                picture_bus: &mut self.picture_bus,
                mapper: &mut self.mapper,
                ppu: &mut self.ppu,
                controllers: &mut self.controllers,
                dma_requested: false,
            },
        };
        (&mut self.cpu, bus)
    }

    /// Power-on state for the CPU and the picture unit. The cartridge and
    /// RAM contents are kept.
    pub fn reset(&mut self) {
        let (cpu, mut bus) = self.cpu_and_bus();
        cpu.reset(&mut bus);
        self.ppu.reset();
    }

    /// Runs exactly one frame worth of CPU cycles, three dots before each.
    pub fn step(&mut self) {
        for _ in 0..CYCLES_PER_FRAME {
            for _ in 0..DOTS_PER_CYCLE {
                self.ppu.cycle(&self.picture_bus, &self.mapper);
            }
            let nmi = self.ppu.take_interrupt();
            let (cpu, mut bus) = self.cpu_and_bus();
            if nmi {
                cpu.interrupt(&mut bus, interrupts::NMI);
            }
            cpu.cycle(&mut bus);
        }
    }

    pub fn save_state(&self) -> SavedState {
        SavedState {
            main_bus: self.main_bus.clone(),
            picture_bus: self.picture_bus.clone(),
            cpu: self.cpu.clone(),
            ppu: self.ppu.clone(),
            mapper: self.mapper.clone(),
        }
    }

    /// Copies `state` into the live components. RAM and the screen buffer
    /// are overwritten in place, so views from `memory_mut()` and `screen()`
    /// stay valid.
    pub fn load_state(&mut self, state: &SavedState) {
        self.main_bus.clone_from(&state.main_bus);
        self.picture_bus.clone_from(&state.picture_bus);
        self.cpu.clone_from(&state.cpu);
        self.ppu.clone_from(&state.ppu);
        self.mapper.clone_from(&state.mapper);
        self.rewire();
    }

    /// Keeps one snapshot, replacing any earlier one
    pub fn backup(&mut self) {
        self.snapshot = Some(self.save_state());
    }

    /// Returns to the last `backup()`. Without one this does nothing.
    pub fn restore(&mut self) {
        match self.snapshot.take() {
            Some(snapshot) => {
                self.load_state(&snapshot);
                self.snapshot = Some(snapshot);
            }
            None => warn!("Restore requested without a backup"),
        }
    }

    pub fn has_backup(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Full machine state as a flat byte buffer
    pub fn serialize(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        Serializable::serialize(self, &mut buffer);
        buffer
    }

    /// Loads a buffer produced by `serialize()` on an emulator with the
    /// same cartridge.
    ///
    /// # Panics
    ///
    /// When the buffer is shorter than the encoded state
    pub fn deserialize(&mut self, buffer: &[u8]) {
        let rest = Serializable::deserialize(self, buffer);
        if !rest.is_empty() {
            warn!("{} trailing bytes after emulator state", rest.len());
        }
    }

    pub fn width(&self) -> usize {
        SCREEN_WIDTH
    }

    pub fn height(&self) -> usize {
        SCREEN_HEIGHT
    }

    /// 0x00RRGGBB pixels, row-major. Stays black for the lightweight pipeline.
    pub fn screen(&self) -> &[u32] {
        self.ppu.screen()
    }

    /// The 2 KiB of internal RAM
    pub fn memory(&self) -> &[u8] {
        self.main_bus.ram()
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        self.main_bus.ram_mut()
    }

    /// Button byte for controller `port` (0 or 1)
    pub fn controller(&mut self, port: usize) -> Option<&mut u8> {
        self.controllers.get_mut(port).map(Joypad::buttons_mut)
    }

    pub fn cpu_cycles(&self) -> u64 {
        self.cpu.cycles()
    }

    pub fn ppu_dots(&self) -> u64 {
        self.ppu.total_dots()
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn cpu(&self) -> &CPU {
        &self.cpu
    }

    pub fn ppu(&self) -> &PPU {
        &self.ppu
    }

    pub fn picture_bus(&self) -> &PictureBus {
        &self.picture_bus
    }
}

/// Main bus, picture bus, CPU, picture unit, then the mapper.
impl Serializable for Emulator {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        self.main_bus.serialize(buffer);
        self.picture_bus.serialize(buffer);
        self.cpu.serialize(buffer);
        self.ppu.serialize(buffer);
        self.mapper.serialize(buffer);
    }

    fn deserialize<'a>(&mut self, buffer: &'a [u8]) -> &'a [u8] {
        let buffer = self.main_bus.deserialize(buffer);
        let buffer = self.picture_bus.deserialize(buffer);
        let buffer = self.cpu.deserialize(buffer);
        let buffer = self.ppu.deserialize(buffer);
        let buffer = self.mapper.deserialize(buffer);
        self.rewire();
        buffer
    }
}
