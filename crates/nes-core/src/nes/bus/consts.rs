pub const CPU_RAM_SIZE: usize = 0x800;
pub const CPU_RAM_START: u16 = 0x0000;
pub const CPU_RAM_END: u16 = 0x1FFF;

pub const PPU_REGISTERS_START: u16 = 0x2000;
pub const PPU_REGISTERS_END: u16 = 0x3FFF;
pub const PPU_REGISTERS_MASK: u16 = 0x2007;

pub const IO_REGISTERS_START: u16 = 0x4000;
pub const IO_REGISTERS_END: u16 = 0x401F;

pub const EXPANSION_ROM_START: u16 = 0x4020;
pub const EXPANSION_ROM_END: u16 = 0x5FFF;

pub const EXTENDED_RAM_START: u16 = 0x6000;
pub const EXTENDED_RAM_END: u16 = 0x7FFF;
pub const EXTENDED_RAM_SIZE: usize = 0x2000;

pub const PRG_ROM_START: u16 = 0x8000;

pub const PAGE_SIZE: usize = 0x100;

pub const NAME_TABLES_SIZE: usize = 0x800;
pub const NAME_TABLE_SIZE: usize = 0x400;
pub const PALETTE_SIZE: usize = 0x20;
