use super::consts::*;
use crate::nes::cartridge::Mapper;
use crate::nes::serialization::{self, Serializable};
use log::{debug, error};
use std::collections::HashMap;

/// Memory-mapped I/O registers that can carry a callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum IoRegister {
    PpuCtrl = 0x2000,
    PpuMask = 0x2001,
    PpuStatus = 0x2002,
    OamAddr = 0x2003,
    OamData = 0x2004,
    PpuScroll = 0x2005,
    PpuAddr = 0x2006,
    PpuData = 0x2007,
    OamDma = 0x4014,
    Joy1 = 0x4016,
    Joy2 = 0x4017,
}

impl IoRegister {
    pub fn from_address(address: u16) -> Option<IoRegister> {
        let register = match address {
            0x2000 => IoRegister::PpuCtrl,
            0x2001 => IoRegister::PpuMask,
            0x2002 => IoRegister::PpuStatus,
            0x2003 => IoRegister::OamAddr,
            0x2004 => IoRegister::OamData,
            0x2005 => IoRegister::PpuScroll,
            0x2006 => IoRegister::PpuAddr,
            0x2007 => IoRegister::PpuData,
            0x4014 => IoRegister::OamDma,
            0x4016 => IoRegister::Joy1,
            0x4017 => IoRegister::Joy2,
            _ => return None,
        };
        Some(register)
    }
}

/// Handler invoked for a register read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadCallback {
    PpuStatus,
    PpuData,
    OamData,
    Controller(usize),
}

/// Handler invoked for a register write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteCallback {
    PpuControl,
    PpuMask,
    OamAddress,
    OamData,
    PpuScroll,
    PpuAddress,
    PpuData,
    OamDma,
    ControllerStrobe,
}

/// Everything the main bus reaches that it does not own: the mapper for
/// program memory and the devices behind the register callbacks.
pub trait MainBusInterface {
    fn read_prg(&mut self, address: u16) -> u8;
    fn write_prg(&mut self, address: u16, value: u8);
    fn read_register(&mut self, callback: ReadCallback) -> u8;
    /// `bus` is handed back so a handler can pull a RAM page (OAM DMA)
    fn write_register(&mut self, callback: WriteCallback, value: u8, bus: &MainBus);
}

/// CPU-visible address space.
///
/// ```text
///  $0000-$1FFF  2 KiB internal RAM, mirrored every $800
///  $2000-$3FFF  picture registers, mirrored every 8 bytes
///  $4014-$4017  DMA and controller registers
///  $4020-$5FFF  expansion ROM (unsupported)
///  $6000-$7FFF  cartridge extended RAM, when the mapper has it
///  $8000-$FFFF  mapper program memory
/// ```
///
/// Internal RAM lives in one fixed allocation for the life of the bus. State
/// loads copy into it, so a pointer taken from [`MainBus::ram_mut`] stays
/// valid across `clone_from` and `deserialize`.
#[derive(Debug)]
pub struct MainBus {
    ram: Box<[u8; CPU_RAM_SIZE]>,
    extended_ram: Vec<u8>,
    has_extended_ram: bool,
    read_callbacks: HashMap<IoRegister, ReadCallback>,
    write_callbacks: HashMap<IoRegister, WriteCallback>,
}

impl Clone for MainBus {
    fn clone(&self) -> Self {
        MainBus {
            ram: self.ram.clone(),
            extended_ram: self.extended_ram.clone(),
            has_extended_ram: self.has_extended_ram,
            read_callbacks: self.read_callbacks.clone(),
            write_callbacks: self.write_callbacks.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.ram.copy_from_slice(&source.ram[..]);
        self.extended_ram.clone_from(&source.extended_ram);
        self.has_extended_ram = source.has_extended_ram;
        self.read_callbacks.clone_from(&source.read_callbacks);
        self.write_callbacks.clone_from(&source.write_callbacks);
    }
}

impl Default for MainBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MainBus {
    pub fn new() -> MainBus {
        MainBus {
            ram: Box::new([0; CPU_RAM_SIZE]),
            extended_ram: Vec::new(),
            has_extended_ram: false,
            read_callbacks: HashMap::new(),
            write_callbacks: HashMap::new(),
        }
    }

    pub fn read(&self, address: u16, port: &mut impl MainBusInterface) -> u8 {
        match address {
            CPU_RAM_START..=CPU_RAM_END => self.ram[address as usize & (CPU_RAM_SIZE - 1)],
            PPU_REGISTERS_START..=PPU_REGISTERS_END => {
                self.read_register(address & PPU_REGISTERS_MASK, port)
            }
            0x4014..=0x4017 => self.read_register(address, port),
            IO_REGISTERS_START..=EXPANSION_ROM_END => {
                debug!("Unmapped read attempt at: {address:#06x}");
                0
            }
            EXTENDED_RAM_START..=EXTENDED_RAM_END => {
                if self.has_extended_ram {
                    self.extended_ram[(address - EXTENDED_RAM_START) as usize]
                } else {
                    0
                }
            }
            PRG_ROM_START..=0xFFFF => port.read_prg(address),
        }
    }

    pub fn write(&mut self, address: u16, value: u8, port: &mut impl MainBusInterface) {
        match address {
            CPU_RAM_START..=CPU_RAM_END => {
                self.ram[address as usize & (CPU_RAM_SIZE - 1)] = value;
            }
            PPU_REGISTERS_START..=PPU_REGISTERS_END => {
                self.write_register(address & PPU_REGISTERS_MASK, value, port)
            }
            0x4014..=0x4016 => self.write_register(address, value, port),
            IO_REGISTERS_START..=EXPANSION_ROM_END => {
                debug!("Unmapped write attempt at: {address:#06x} with {value:#04x}");
            }
            EXTENDED_RAM_START..=EXTENDED_RAM_END => {
                if self.has_extended_ram {
                    self.extended_ram[(address - EXTENDED_RAM_START) as usize] = value;
                }
            }
            PRG_ROM_START..=0xFFFF => port.write_prg(address, value),
        }
    }

    fn read_register(&self, address: u16, port: &mut impl MainBusInterface) -> u8 {
        let callback = IoRegister::from_address(address)
            .and_then(|register| self.read_callbacks.get(&register).copied());
        match callback {
            Some(callback) => port.read_register(callback),
            None => {
                debug!("No read callback registered for I/O register at: {address:#06x}");
                0
            }
        }
    }

    fn write_register(&self, address: u16, value: u8, port: &mut impl MainBusInterface) {
        let callback = IoRegister::from_address(address)
            .and_then(|register| self.write_callbacks.get(&register).copied());
        match callback {
            Some(callback) => port.write_register(callback, value, self),
            None => {
                debug!("No write callback registered for I/O register at: {address:#06x}");
            }
        }
    }

    /// One 256-byte page of RAM or extended RAM, used by OAM DMA.
    ///
    /// # Returns
    ///
    /// `None` for pages outside internal or extended RAM
    pub fn page(&self, page: u8) -> Option<&[u8]> {
        let address = (page as u16) << 8;
        match address {
            CPU_RAM_START..=CPU_RAM_END => {
                let start = address as usize & (CPU_RAM_SIZE - 1);
                Some(&self.ram[start..start + PAGE_SIZE])
            }
            EXTENDED_RAM_START..=EXTENDED_RAM_END if self.has_extended_ram => {
                let start = (address - EXTENDED_RAM_START) as usize;
                Some(&self.extended_ram[start..start + PAGE_SIZE])
            }
            _ => {
                error!("Page pointer access attempt outside RAM: {address:#06x}");
                None
            }
        }
    }

    /// Rebinds the cartridge, deriving whether extended RAM is mapped.
    pub fn set_mapper(&mut self, mapper: &Mapper) {
        self.has_extended_ram = mapper.has_extended_ram();
        if self.has_extended_ram && self.extended_ram.len() != EXTENDED_RAM_SIZE {
            self.extended_ram.resize(EXTENDED_RAM_SIZE, 0);
        }
    }

    pub fn set_read_callback(&mut self, register: IoRegister, callback: ReadCallback) {
        self.read_callbacks.insert(register, callback);
    }

    pub fn set_write_callback(&mut self, register: IoRegister, callback: WriteCallback) {
        self.write_callbacks.insert(register, callback);
    }

    pub fn clear_callbacks(&mut self) {
        self.read_callbacks.clear();
        self.write_callbacks.clear();
    }

    pub fn has_extended_ram(&self) -> bool {
        self.has_extended_ram
    }

    /// Internal RAM, without mirrors
    pub fn ram(&self) -> &[u8] {
        &self.ram[..]
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram[..]
    }
}

impl Serializable for MainBus {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        serialization::write_bytes(buffer, &self.ram[..]);
        serialization::write_bytes(buffer, &self.extended_ram);
    }

    fn deserialize<'a>(&mut self, mut buffer: &'a [u8]) -> &'a [u8] {
        serialization::read_bytes_into(&mut buffer, &mut self.ram[..]);
        self.extended_ram = serialization::read_bytes(&mut buffer);
        buffer
    }
}
