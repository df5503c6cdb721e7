//! Convenient imports for consumers of nes-core
//!
//! Pull in everything commonly needed in one line:
//! ```rust
//! use nes_core::prelude::*;
//! ```

// Emulator API
pub use crate::nes::error::EmulatorError;
pub use crate::nes::ppu::PipelineVariant;
pub use crate::nes::{Emulator, SavedState};

// Cartridges
pub use crate::nes::cartridge::rom::{Cartridge, Mirroring, RomError};
pub use crate::nes::cartridge::{Mapper, MapperError};

// Input
pub use crate::nes::controller::joypad::JoypadButtons;

// State encoding
pub use crate::nes::serialization::Serializable;

// Macros
pub use crate::trace_dump;

// Constants
pub use crate::nes::ppu::consts::{NES_SYSTEM_PALETTE, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use crate::nes::{CYCLES_PER_FRAME, DOTS_PER_CYCLE};
