use super::rom::{Cartridge, Mirroring};
use crate::nes::serialization::{self, Serializable};
use log::{debug, info};
use std::sync::Arc;

const CHR_RAM_SIZE: usize = 0x2000;

/// Mapper 0: fixed PRG and CHR banks.
///
/// A single 16 KiB PRG bank is mirrored into both $8000-$BFFF and
/// $C000-$FFFF. Cartridges without CHR ROM get 8 KiB of writable CHR RAM.
#[derive(Debug, Clone)]
pub struct Nrom {
    cartridge: Arc<Cartridge>,
    is_one_bank: bool,
    has_character_ram: bool,
    character_ram: Vec<u8>,
}

impl Nrom {
    pub fn new(cartridge: Arc<Cartridge>) -> Nrom {
        let is_one_bank = cartridge.prg_rom.len() == 0x4000;
        let has_character_ram = cartridge.chr_rom.is_empty();
        let character_ram = if has_character_ram {
            debug!("Uses character RAM");
            vec![0; CHR_RAM_SIZE]
        } else {
            Vec::new()
        };
        Nrom {
            cartridge,
            is_one_bank,
            has_character_ram,
            character_ram,
        }
    }

    pub fn read_prg(&self, address: u16) -> u8 {
        let mut index = (address & 0x7FFF) as usize;
        if self.is_one_bank {
            index &= 0x3FFF;
        }
        self.cartridge.prg_rom[index % self.cartridge.prg_rom.len()]
    }

    pub fn write_prg(&mut self, address: u16, value: u8) {
        debug!("ROM memory write attempt at {address:#06x} to set {value:#04x}");
    }

    pub fn read_chr(&self, address: u16) -> u8 {
        read_fixed_chr(
            &self.cartridge,
            self.has_character_ram,
            &self.character_ram,
            address,
        )
    }

    pub fn write_chr(&mut self, address: u16, value: u8) {
        if self.has_character_ram {
            self.character_ram[(address & 0x1FFF) as usize] = value;
        } else {
            info!("Read-only CHR memory write attempt at {address:#06x}");
        }
    }

    pub fn has_extended_ram(&self) -> bool {
        self.cartridge.has_extended_ram
    }

    pub fn mirroring(&self) -> Mirroring {
        self.cartridge.mirroring
    }
}

/// CHR lookup shared by mappers that never bank-switch pattern memory.
pub(super) fn read_fixed_chr(
    cartridge: &Cartridge,
    has_character_ram: bool,
    character_ram: &[u8],
    address: u16,
) -> u8 {
    let index = (address & 0x1FFF) as usize;
    if has_character_ram {
        character_ram[index]
    } else {
        cartridge.chr_rom[index % cartridge.chr_rom.len()]
    }
}

impl Serializable for Nrom {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        serialization::write_bool(buffer, self.is_one_bank);
        serialization::write_bool(buffer, self.has_character_ram);
        serialization::write_bytes(buffer, &self.character_ram);
    }

    fn deserialize<'a>(&mut self, mut buffer: &'a [u8]) -> &'a [u8] {
        self.is_one_bank = serialization::read_bool(&mut buffer);
        self.has_character_ram = serialization::read_bool(&mut buffer);
        self.character_ram = serialization::read_bytes(&mut buffer);
        buffer
    }
}
