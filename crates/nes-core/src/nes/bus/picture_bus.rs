use super::consts::{NAME_TABLE_SIZE, NAME_TABLES_SIZE, PALETTE_SIZE};
use crate::nes::cartridge::Mapper;
use crate::nes::cartridge::rom::Mirroring;
use crate::nes::serialization::{self, Serializable};
use log::{debug, error};

/// The picture unit's 14-bit address space.
///
/// ```text
///  $0000-$1FFF  pattern tables, owned by the mapper
///  $2000-$3EFF  four logical nametables over 2 KiB of RAM
///  $3F00-$3FFF  32-byte palette, mirrored
/// ```
#[derive(Debug, Clone)]
pub struct PictureBus {
    ram: Vec<u8>,
    palette: Vec<u8>,
    /// Offset into `ram` of each logical nametable
    name_tables: [usize; 4],
}

impl Default for PictureBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PictureBus {
    pub fn new() -> PictureBus {
        PictureBus {
            ram: vec![0; NAME_TABLES_SIZE],
            palette: vec![0; PALETTE_SIZE],
            name_tables: [0; 4],
        }
    }

    pub fn read(&self, mapper: &Mapper, address: u16) -> u8 {
        let address = address & 0x3FFF;
        match address {
            0x0000..=0x1FFF => mapper.read_chr(address),
            0x2000..=0x3EFF => self.ram[self.name_table_offset(address)],
            _ => self.palette[(address & 0x1F) as usize],
        }
    }

    pub fn write(&mut self, mapper: &mut Mapper, address: u16, value: u8) {
        let address = address & 0x3FFF;
        match address {
            0x0000..=0x1FFF => mapper.write_chr(address, value),
            0x2000..=0x3EFF => {
                let offset = self.name_table_offset(address);
                self.ram[offset] = value;
            }
            _ => {
                let index = (address & 0x1F) as usize;
                self.palette[index] = value;
                // the sprite backdrop entry doubles as the universal background
                if index == 0x10 {
                    self.palette[0] = value;
                }
            }
        }
    }

    /// Palette lookup used while rendering.
    ///
    /// Entries $10/$14/$18/$1C mirror $00/$04/$08/$0C.
    pub fn read_palette(&self, index: u8) -> u8 {
        let mut index = (index & 0x1F) as usize;
        if index >= 0x10 && index % 4 == 0 {
            index &= 0x0F;
        }
        self.palette[index]
    }

    fn name_table_offset(&self, address: u16) -> usize {
        // $3000-$3EFF mirrors $2000-$2EFF
        let relative = (address - 0x2000) as usize & 0x0FFF;
        self.name_tables[relative / NAME_TABLE_SIZE] + (relative & (NAME_TABLE_SIZE - 1))
    }

    /// Re-derives the nametable layout from the mapper's mirroring mode.
    pub fn update_mirroring(&mut self, mapper: &Mapper) {
        self.set_mirroring(mapper.mirroring());
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        const LOWER: usize = 0;
        const HIGHER: usize = NAME_TABLE_SIZE;
        self.name_tables = match mirroring {
            Mirroring::Horizontal => [LOWER, LOWER, HIGHER, HIGHER],
            Mirroring::Vertical => [LOWER, HIGHER, LOWER, HIGHER],
            Mirroring::OneScreenLower => [LOWER; 4],
            Mirroring::OneScreenHigher => [HIGHER; 4],
            unsupported => {
                error!("Unsupported name table mirroring: {unsupported:?}");
                [0; 4]
            }
        };
        debug!("Name table mirroring set to {mirroring:?}");
    }

    pub fn name_tables(&self) -> [usize; 4] {
        self.name_tables
    }
}

impl Serializable for PictureBus {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        serialization::write_bytes(buffer, &self.ram);
        serialization::write_bytes(buffer, &self.palette);
        for offset in self.name_tables {
            serialization::write_usize(buffer, offset);
        }
    }

    fn deserialize<'a>(&mut self, mut buffer: &'a [u8]) -> &'a [u8] {
        serialization::read_bytes_into(&mut buffer, &mut self.ram);
        serialization::read_bytes_into(&mut buffer, &mut self.palette);
        for offset in self.name_tables.iter_mut() {
            *offset = serialization::read_usize(&mut buffer);
        }
        buffer
    }
}
