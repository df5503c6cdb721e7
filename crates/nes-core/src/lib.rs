// NES core modules
pub mod nes;
pub mod prelude;

// Re-exports
pub use nes::{CYCLES_PER_FRAME, DOTS_PER_CYCLE, Emulator, SavedState};

pub use nes::cartridge::rom::{Cartridge, Mirroring, RomError};
pub use nes::cartridge::{Mapper, MapperError};
pub use nes::error::EmulatorError;
pub use nes::ppu::PipelineVariant;
