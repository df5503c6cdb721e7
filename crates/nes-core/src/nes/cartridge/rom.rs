use std::path::Path;
use thiserror::Error;

const NES_MAGIC_BYTES: &[u8; 4] = b"NES\x1A";
const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const PRG_ROM_PAGE_SIZE: usize = 0x4000;
const CHR_ROM_PAGE_SIZE: usize = 0x2000;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("{0}")]
    InvalidFormat(String),

    #[error("Unsupported ROM version: v{0}")]
    UnsupportedVersion(u8),

    #[error("ROM image truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("Failed to read ROM file: {0}")]
    Io(#[from] std::io::Error),
}

/// Nametable arrangement reported by the cartridge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mirroring {
    Horizontal = 0,
    Vertical = 1,
    FourScreen = 8,
    OneScreenLower = 9,
    OneScreenHigher = 10,
}

/// Immutable contents of an iNES image.
///
/// Shared between an emulator and its mappers through `Arc`, so several
/// emulators built from the same file never copy the ROM banks.
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub has_extended_ram: bool,
}

impl Cartridge {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Cartridge, RomError> {
        let raw = std::fs::read(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &[u8]) -> Result<Cartridge, RomError> {
        // Check NES magic bytes
        if raw.len() < HEADER_SIZE || &raw[0..4] != NES_MAGIC_BYTES {
            return Err(RomError::InvalidFormat("Not an iNES file".into()));
        }

        // Values 1 and 3 are neither iNES 1.0 nor NES 2.0
        let ines_ver = (raw[7] >> 2) & 0b11;
        if ines_ver == 1 || ines_ver == 3 {
            return Err(RomError::UnsupportedVersion(ines_ver));
        }

        /*
            Flags 6
            76543210
            ||||||||
            |||||||+- Nametable arrangement: 0: horizontal, 1: vertical
            ||||||+-- 1: Cartridge contains battery-backed PRG RAM ($6000-7FFF)
            |||||+--- 1: 512-byte trainer at $7000-$71FF
            ||||+---- 1: Alternative nametable layout
            ++++----- Lower nybble of mapper number
        */
        let mapper = (raw[7] & 0b1111_0000) | (raw[6] >> 4);
        let four_screen = raw[6] & 0b1000 != 0;
        let vertical_mirroring = raw[6] & 0b1 != 0;
        let mirroring = match (four_screen, vertical_mirroring) {
            (true, _) => Mirroring::FourScreen,
            (false, true) => Mirroring::Vertical,
            (false, false) => Mirroring::Horizontal,
        };
        let has_extended_ram = raw[6] & 0b10 != 0;

        let prg_rom_size = raw[4] as usize * PRG_ROM_PAGE_SIZE;
        let chr_rom_size = raw[5] as usize * CHR_ROM_PAGE_SIZE;

        let skip_trainer = raw[6] & 0b100 != 0;
        let prg_rom_start = HEADER_SIZE + if skip_trainer { TRAINER_SIZE } else { 0 };
        let chr_rom_start = prg_rom_start + prg_rom_size;
        let expected = chr_rom_start + chr_rom_size;
        if raw.len() < expected {
            return Err(RomError::Truncated {
                expected,
                found: raw.len(),
            });
        }
        if prg_rom_size == 0 {
            return Err(RomError::InvalidFormat("ROM has no PRG banks".into()));
        }

        Ok(Cartridge {
            prg_rom: raw[prg_rom_start..chr_rom_start].to_vec(),
            chr_rom: raw[chr_rom_start..expected].to_vec(),
            mapper,
            mirroring,
            has_extended_ram,
        })
    }

    pub fn new_custom(
        prg_rom: Vec<u8>,
        chr_rom: Vec<u8>,
        mapper: u8,
        mirroring: Mirroring,
    ) -> Cartridge {
        Cartridge {
            prg_rom,
            chr_rom,
            mapper,
            mirroring,
            has_extended_ram: false,
        }
    }
}
