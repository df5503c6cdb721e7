use super::mapper000_nrom::read_fixed_chr;
use super::rom::{Cartridge, Mirroring};
use crate::nes::serialization::{self, Serializable};
use log::{debug, info};
use std::sync::Arc;

const PRG_BANK_SIZE: usize = 0x4000;
const CHR_RAM_SIZE: usize = 0x2000;

/// Mapper 2: switchable 16 KiB bank at $8000, last bank fixed at $C000.
#[derive(Debug, Clone)]
pub struct UxRom {
    cartridge: Arc<Cartridge>,
    has_character_ram: bool,
    last_bank_pointer: usize,
    select_prg: u8,
    character_ram: Vec<u8>,
}

impl UxRom {
    pub fn new(cartridge: Arc<Cartridge>) -> UxRom {
        let has_character_ram = cartridge.chr_rom.is_empty();
        let character_ram = if has_character_ram {
            debug!("Uses character RAM");
            vec![0; CHR_RAM_SIZE]
        } else {
            Vec::new()
        };
        let last_bank_pointer = cartridge.prg_rom.len().saturating_sub(PRG_BANK_SIZE);
        UxRom {
            cartridge,
            has_character_ram,
            last_bank_pointer,
            select_prg: 0,
            character_ram,
        }
    }

    pub fn read_prg(&self, address: u16) -> u8 {
        let prg = &self.cartridge.prg_rom;
        let offset = (address & 0x3FFF) as usize;
        if address < 0xC000 {
            prg[(offset | ((self.select_prg as usize) << 14)) % prg.len()]
        } else {
            prg[(self.last_bank_pointer + offset) % prg.len()]
        }
    }

    pub fn write_prg(&mut self, _address: u16, value: u8) {
        /*
           7  bit  0
           ---- ----
           xxxx pPPP
                ||||
                ++++- Select 16 KB PRG ROM bank for CPU $8000-$BFFF
                     (UNROM uses bits 2-0; UOROM uses bits 3-0)
        */
        self.select_prg = value;
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

    pub fn selected_bank(&self) -> u8 {
        self.select_prg
    }
}

impl Serializable for UxRom {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        serialization::write_bool(buffer, self.has_character_ram);
        serialization::write_usize(buffer, self.last_bank_pointer);
        serialization::write_int(buffer, self.select_prg);
        serialization::write_bytes(buffer, &self.character_ram);
    }

    fn deserialize<'a>(&mut self, mut buffer: &'a [u8]) -> &'a [u8] {
        self.has_character_ram = serialization::read_bool(&mut buffer);
        self.last_bank_pointer = serialization::read_usize(&mut buffer);
        self.select_prg = serialization::read_int(&mut buffer);
        self.character_ram = serialization::read_bytes(&mut buffer);
        buffer
    }
}
