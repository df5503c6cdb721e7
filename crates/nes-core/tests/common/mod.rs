//! Builds a small NROM test cartridge in memory.
//!
//! The program waits two vertical blanks, loads a palette, fills the first
//! nametable row with a solid tile, places sprite 0 over it through OAM DMA,
//! then turns on rendering and NMI. Its main loop latches controller 1 and
//! stores button A at `$12`. The NMI handler counts frames at `$11`.
//!
//! The banked UxROM image runs the same program from its fixed last bank and
//! also copies `$14` to the bank select register on every loop.
#![allow(dead_code)]

pub const NMI_COUNTER: usize = 0x11;
pub const BUTTON_A_STATE: usize = 0x12;
pub const LOOP_COUNTER: usize = 0x13;
pub const BANK_SELECT: usize = 0x14;

/// Switchable PRG banks of the UxROM image; bank `n` is filled with `n`
pub const SWITCHABLE_BANKS: u8 = 3;

/// Sprite 0 position (OAM y, x). It is drawn one line below its OAM y.
pub const SPRITE_ZERO: (u8, u8) = (2, 20);

pub const BACKDROP_COLOR: u8 = 0x0F;
pub const TILE_COLOR: u8 = 0x30;
pub const SPRITE_COLOR: u8 = 0x16;

const PRG_BANK_SIZE: usize = 0x4000;

mod op {
    pub const SEI: u8 = 0x78;
    pub const CLD: u8 = 0xD8;
    pub const TXS: u8 = 0x9A;
    pub const DEX: u8 = 0xCA;
    pub const RTI: u8 = 0x40;
    pub const LDA_IMM: u8 = 0xA9;
    pub const LDX_IMM: u8 = 0xA2;
    pub const AND_IMM: u8 = 0x29;
    pub const LDA_ABS: u8 = 0xAD;
    pub const STA_ABS: u8 = 0x8D;
    pub const BIT_ABS: u8 = 0x2C;
    pub const JMP_ABS: u8 = 0x4C;
    pub const LDA_ZP: u8 = 0xA5;
    pub const STA_ZP: u8 = 0x85;
    pub const INC_ZP: u8 = 0xE6;
    pub const BPL: u8 = 0x10;
    pub const BNE: u8 = 0xD0;
}

struct Assembler {
    origin: u16,
    bytes: Vec<u8>,
}

impl Assembler {
    fn new(origin: u16) -> Assembler {
        Assembler {
            origin,
            bytes: Vec::new(),
        }
    }

    fn pc(&self) -> u16 {
        self.origin + self.bytes.len() as u16
    }

    fn implied(&mut self, opcode: u8) -> &mut Self {
        self.bytes.push(opcode);
        self
    }

    fn imm(&mut self, opcode: u8, value: u8) -> &mut Self {
        self.bytes.extend_from_slice(&[opcode, value]);
        self
    }

    fn zp(&mut self, opcode: u8, address: u8) -> &mut Self {
        self.bytes.extend_from_slice(&[opcode, address]);
        self
    }

    fn abs(&mut self, opcode: u8, address: u16) -> &mut Self {
        self.bytes
            .extend_from_slice(&[opcode, address as u8, (address >> 8) as u8]);
        self
    }

    fn branch(&mut self, opcode: u8, target: u16) -> &mut Self {
        let offset = target as i32 - (self.pc() as i32 + 2);
        assert!((-128..=127).contains(&offset), "branch out of range");
        self.bytes.extend_from_slice(&[opcode, offset as i8 as u8]);
        self
    }

    fn store(&mut self, address: u16, value: u8) -> &mut Self {
        self.imm(op::LDA_IMM, value).abs(op::STA_ABS, address)
    }

    fn ppu_address(&mut self, address: u16) -> &mut Self {
        self.store(0x2006, (address >> 8) as u8)
            .store(0x2006, address as u8)
    }
}

/// Assembles the program for `origin`, returning its bytes and the NMI entry
fn program(origin: u16, bank_switching: bool) -> (Vec<u8>, u16) {
    let mut asm = Assembler::new(origin);

    asm.implied(op::SEI)
        .implied(op::CLD)
        .imm(op::LDX_IMM, 0xFF)
        .implied(op::TXS)
        .store(0x2000, 0x00)
        .store(0x2001, 0x00);

    for _ in 0..2 {
        let wait = asm.pc();
        asm.abs(op::BIT_ABS, 0x2002).branch(op::BPL, wait);
    }

    asm.ppu_address(0x3F00)
        .store(0x2007, BACKDROP_COLOR)
        .store(0x2007, TILE_COLOR)
        .ppu_address(0x3F11)
        .store(0x2007, SPRITE_COLOR);

    asm.ppu_address(0x2000)
        .imm(op::LDA_IMM, 0x01)
        .imm(op::LDX_IMM, 32);
    let fill = asm.pc();
    asm.abs(op::STA_ABS, 0x2007)
        .implied(op::DEX)
        .branch(op::BNE, fill);

    let (sprite_y, sprite_x) = SPRITE_ZERO;
    asm.store(0x0200, sprite_y)
        .store(0x0201, 0x01)
        .store(0x0202, 0x00)
        .store(0x0203, sprite_x)
        .store(0x4014, 0x02);

    asm.store(0x2005, 0x00)
        .store(0x2005, 0x00)
        .store(0x2000, 0x80)
        .store(0x2001, 0x1E);

    let main = asm.pc();
    asm.store(0x4016, 0x01)
        .store(0x4016, 0x00)
        .abs(op::LDA_ABS, 0x4016)
        .imm(op::AND_IMM, 0x01)
        .zp(op::STA_ZP, BUTTON_A_STATE as u8)
        .zp(op::INC_ZP, LOOP_COUNTER as u8);
    if bank_switching {
        asm.zp(op::LDA_ZP, BANK_SELECT as u8).abs(op::STA_ABS, 0x8000);
    }
    asm.abs(op::JMP_ABS, main);

    let nmi = asm.pc();
    asm.zp(op::INC_ZP, NMI_COUNTER as u8).implied(op::RTI);

    (asm.bytes, nmi)
}

/// One 16 KiB bank holding the program at `origin`, with vectors
fn program_bank(origin: u16, bank_switching: bool) -> Vec<u8> {
    let (code, nmi) = program(origin, bank_switching);

    let mut bank = vec![0xEA; PRG_BANK_SIZE];
    bank[..code.len()].copy_from_slice(&code);
    for (vector, target) in [(0x3FFA, nmi), (0x3FFC, origin), (0x3FFE, nmi)] {
        bank[vector] = target as u8;
        bank[vector + 1] = (target >> 8) as u8;
    }
    bank
}

fn ines(mapper: u8, prg: &[u8]) -> Vec<u8> {
    // tile 1 is solid color 1, tile 0 is transparent
    let mut chr = vec![0; 0x2000];
    chr[16..24].fill(0xFF);

    let prg_banks = (prg.len() / PRG_BANK_SIZE) as u8;
    let mut rom = vec![b'N', b'E', b'S', 0x1A, prg_banks, 1, (mapper & 0x0F) << 4, mapper & 0xF0];
    rom.resize(16, 0);
    rom.extend_from_slice(prg);
    rom.extend_from_slice(&chr);
    rom
}

/// iNES image with one 16 KiB PRG bank and one 8 KiB CHR bank
pub fn test_rom_with_mapper(mapper: u8) -> Vec<u8> {
    ines(mapper, &program_bank(0x8000, false))
}

pub fn test_rom() -> Vec<u8> {
    test_rom_with_mapper(0)
}

/// Mapper 2 image: three filler banks, then the program in the fixed bank
pub fn ux_rom_test_rom() -> Vec<u8> {
    let mut prg: Vec<u8> = (0..SWITCHABLE_BANKS)
        .flat_map(|bank| std::iter::repeat_n(bank, PRG_BANK_SIZE))
        .collect();
    prg.extend_from_slice(&program_bank(0xC000, true));
    ines(2, &prg)
}
