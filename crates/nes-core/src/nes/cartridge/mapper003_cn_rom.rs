use super::rom::{Cartridge, Mirroring};
use crate::nes::serialization::{self, Serializable};
use log::info;
use std::sync::Arc;

const CHR_BANK_SIZE: usize = 0x2000;

/// Mapper 3: fixed PRG, switchable 8 KiB CHR ROM bank.
#[derive(Debug, Clone)]
pub struct CnRom {
    cartridge: Arc<Cartridge>,
    is_one_bank: bool,
    select_chr: u8,
}

impl CnRom {
    pub fn new(cartridge: Arc<Cartridge>) -> CnRom {
        let is_one_bank = cartridge.prg_rom.len() == 0x4000;
        CnRom {
            cartridge,
            is_one_bank,
            select_chr: 0,
        }
    }

    pub fn read_prg(&self, address: u16) -> u8 {
        let mut index = (address & 0x7FFF) as usize;
        if self.is_one_bank {
            index &= 0x3FFF;
        }
        self.cartridge.prg_rom[index % self.cartridge.prg_rom.len()]
    }

    pub fn write_prg(&mut self, _address: u16, value: u8) {
        /*
           7  bit  0
           ---- ----
           cccc xxCC
           |||| ||||
           |||| ||++- Select 8 KB CHR ROM bank for PPU $0000-$1FFF
           ++++------ Security diodes config, unused here
        */
        self.select_chr = value & 0x3;
    }

    pub fn read_chr(&self, address: u16) -> u8 {
        let chr = &self.cartridge.chr_rom;
        if chr.is_empty() {
            return 0;
        }
        let index = (address as usize & (CHR_BANK_SIZE - 1)) | ((self.select_chr as usize) << 13);
        chr[index % chr.len()]
    }

    pub fn write_chr(&mut self, address: u16, _value: u8) {
        info!("Read-only CHR memory write attempt at {address:#06x}");
    }

    pub fn has_extended_ram(&self) -> bool {
        self.cartridge.has_extended_ram
    }

    pub fn mirroring(&self) -> Mirroring {
        self.cartridge.mirroring
    }

    pub fn selected_bank(&self) -> u8 {
        self.select_chr
    }
}

impl Serializable for CnRom {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        serialization::write_bool(buffer, self.is_one_bank);
        serialization::write_int(buffer, self.select_chr);
    }

    fn deserialize<'a>(&mut self, mut buffer: &'a [u8]) -> &'a [u8] {
        self.is_one_bank = serialization::read_bool(&mut buffer);
        self.select_chr = serialization::read_int(&mut buffer);
        buffer
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cn_rom() -> CnRom {
        let chr: Vec<u8> = (0..4u8)
            .flat_map(|bank| std::iter::repeat_n(0x10 + bank, CHR_BANK_SIZE))
            .collect();
        CnRom::new(Arc::new(Cartridge::new_custom(
            vec![0xEA; 0x8000],
            chr,
            3,
            Mirroring::Horizontal,
        )))
    }

    #[test]
    fn test_chr_bank_select_uses_low_two_bits() {
        let mut mapper = cn_rom();
        assert_eq!(mapper.read_chr(0x0000), 0x10);

        mapper.write_prg(0x8000, 0b1111_0110);
        assert_eq!(mapper.selected_bank(), 2);
        assert_eq!(mapper.read_chr(0x0000), 0x12);
        assert_eq!(mapper.read_chr(0x1FFF), 0x12);
    }

    #[test]
    fn test_chr_writes_are_ignored() {
        let mut mapper = cn_rom();
        mapper.write_chr(0x0100, 0xFF);
        assert_eq!(mapper.read_chr(0x0100), 0x10);
    }

    #[test]
    fn test_serialize_keeps_bank_and_bank_count() {
        let mut mapper = cn_rom();
        mapper.write_prg(0x8000, 3);
        let mut buffer = Vec::new();
        mapper.serialize(&mut buffer);
        assert_eq!(buffer, vec![0, 3]);

        let mut restored = cn_rom();
        let rest = restored.deserialize(&buffer);
        assert!(rest.is_empty());
        assert_eq!(restored.selected_bank(), 3);
        assert_eq!(restored.read_chr(0x0000), 0x13);
        assert_eq!(restored.read_prg(0xC000), 0xEA);

        // a one-bank image mirrors $8000 at $C000 after a restore too
        let mut one_bank = CnRom::new(Arc::new(Cartridge::new_custom(
            (0..0x4000).map(|i| (i >> 8) as u8).collect(),
            vec![0; CHR_BANK_SIZE],
            3,
            Mirroring::Vertical,
        )));
        let mut buffer = Vec::new();
        one_bank.serialize(&mut buffer);
        assert_eq!(buffer[0], 1);
        one_bank.deserialize(&buffer);
        assert_eq!(one_bank.read_prg(0xC100), one_bank.read_prg(0x8100));
    }
}
