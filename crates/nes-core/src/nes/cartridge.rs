use crate::nes::serialization::Serializable;
use log::info;
use mapper000_nrom::Nrom;
use mapper002_ux_rom::UxRom;
use mapper003_cn_rom::CnRom;
use rom::{Cartridge, Mirroring};
use std::sync::Arc;
use thiserror::Error;

pub mod mapper000_nrom;
pub mod mapper002_ux_rom;
pub mod mapper003_cn_rom;
pub mod rom;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("Unsupported Mapper: {0}")]
    UnsupportedMapper(u8),
}

/// Cartridge address translation for the CPU ($8000-$FFFF) and the picture
/// bus ($0000-$1FFF).
///
/// The set of boards is closed, so dispatch is a plain `match` and the whole
/// mapper can be cloned into a snapshot.
#[derive(Debug, Clone)]
pub enum Mapper {
    Nrom(Nrom),
    UxRom(UxRom),
    CnRom(CnRom),
}

impl Mapper {
    /// Builds the mapper for the cartridge's mapper number.
    pub fn new(cartridge: Arc<Cartridge>) -> Result<Mapper, MapperError> {
        let mapper = match cartridge.mapper {
            0 => Mapper::Nrom(Nrom::new(cartridge)),
            2 => Mapper::UxRom(UxRom::new(cartridge)),
            3 => Mapper::CnRom(CnRom::new(cartridge)),
            id => return Err(MapperError::UnsupportedMapper(id)),
        };
        info!("Using mapper #{}", mapper.id());
        Ok(mapper)
    }

    pub fn id(&self) -> u8 {
        match self {
            Mapper::Nrom(_) => 0,
            Mapper::UxRom(_) => 2,
            Mapper::CnRom(_) => 3,
        }
    }

    pub fn read_prg(&self, address: u16) -> u8 {
        match self {
            Mapper::Nrom(m) => m.read_prg(address),
            Mapper::UxRom(m) => m.read_prg(address),
            Mapper::CnRom(m) => m.read_prg(address),
        }
    }

    pub fn write_prg(&mut self, address: u16, value: u8) {
        match self {
            Mapper::Nrom(m) => m.write_prg(address, value),
            Mapper::UxRom(m) => m.write_prg(address, value),
            Mapper::CnRom(m) => m.write_prg(address, value),
        }
    }

    pub fn read_chr(&self, address: u16) -> u8 {
        match self {
            Mapper::Nrom(m) => m.read_chr(address),
            Mapper::UxRom(m) => m.read_chr(address),
            Mapper::CnRom(m) => m.read_chr(address),
        }
    }

    pub fn write_chr(&mut self, address: u16, value: u8) {
        match self {
            Mapper::Nrom(m) => m.write_chr(address, value),
            Mapper::UxRom(m) => m.write_chr(address, value),
            Mapper::CnRom(m) => m.write_chr(address, value),
        }
    }

    /// True when $6000-$7FFF should be backed by cartridge RAM
    pub fn has_extended_ram(&self) -> bool {
        match self {
            Mapper::Nrom(m) => m.has_extended_ram(),
            Mapper::UxRom(m) => m.has_extended_ram(),
            Mapper::CnRom(m) => m.has_extended_ram(),
        }
    }

    /// Nametable mirroring mode
    pub fn mirroring(&self) -> Mirroring {
        match self {
            Mapper::Nrom(m) => m.mirroring(),
            Mapper::UxRom(m) => m.mirroring(),
            Mapper::CnRom(m) => m.mirroring(),
        }
    }
}

impl Serializable for Mapper {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        match self {
            Mapper::Nrom(m) => m.serialize(buffer),
            Mapper::UxRom(m) => m.serialize(buffer),
            Mapper::CnRom(m) => m.serialize(buffer),
        }
    }

    fn deserialize<'a>(&mut self, buffer: &'a [u8]) -> &'a [u8] {
        match self {
            Mapper::Nrom(m) => m.deserialize(buffer),
            Mapper::UxRom(m) => m.deserialize(buffer),
            Mapper::CnRom(m) => m.deserialize(buffer),
        }
    }
}
