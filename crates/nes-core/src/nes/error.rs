use crate::nes::cartridge::MapperError;
use crate::nes::cartridge::rom::RomError;
use thiserror::Error;

/// Construction-time failures. Nothing fails once an emulator exists.
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("Invalid cartridge: {0}")]
    Rom(#[from] RomError),

    #[error(transparent)]
    Mapper(#[from] MapperError),
}
