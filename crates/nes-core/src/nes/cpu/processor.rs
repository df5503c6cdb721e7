use super::interrupts::{self, Interrupt, InterruptKind};
use super::opcodes::{self, Opcode};
use super::{
    AddressingMode, CPU, CPU_RESET_VECTOR, CPU_STACK_BASE, CPU_STACK_RESET, CpuBusInterface, Flags,
    OAM_DMA_CYCLES,
};
use crate::nes::serialization::{self, Serializable};
use crate::trace;
use log::error;

impl Default for CPU {
    fn default() -> Self {
        Self::new()
    }
}

impl CPU {
    pub fn new() -> CPU {
        CPU {
            register_a: 0,
            register_x: 0,
            register_y: 0,
            stack_pointer: CPU_STACK_RESET,
            status: Flags::from_bits_truncate(0b0010_0100),
            program_counter: 0,
            skip_cycles: 0,
            cycles: 0,
            extra_cycles: 0,
            skip_pc_advance: false,
        }
    }

    /// Power-on state, with the program counter loaded from the reset vector.
    pub fn reset(&mut self, bus: &mut dyn CpuBusInterface) {
        self.register_a = 0;
        self.register_x = 0;
        self.register_y = 0;
        self.stack_pointer = CPU_STACK_RESET;
        self.status = Flags::from_bits_truncate(0b0010_0100);
        self.program_counter = self.read_u16(bus, CPU_RESET_VECTOR);
        self.skip_cycles = 0;
        self.cycles = 0;
    }

    /// Runs one CPU cycle.
    ///
    /// Cycles still owed by the previous instruction (or a DMA stall) are
    /// consumed first. Otherwise the next instruction executes in full.
    pub fn cycle(&mut self, bus: &mut dyn CpuBusInterface) {
        self.cycles += 1;
        if self.skip_cycles > 1 {
            self.skip_cycles -= 1;
            return;
        }
        self.skip_cycles = 0;
        self.execute_next(bus);
    }

    fn execute_next(&mut self, bus: &mut dyn CpuBusInterface) {
        let code = bus.cpu_bus_read(self.program_counter);
        let opcode = match opcodes::OPCODES_MAP.get(&code).copied() {
            Some(op) => op,
            None => {
                error!(
                    "Unknown opcode {code:#04x} at {:#06x}, executing as NOP",
                    self.program_counter
                );
                self.advance_program_counter();
                self.skip_cycles += 2;
                return;
            }
        };

        trace!(
            "PC:{:04X} {} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.program_counter,
            opcode.name,
            self.register_a,
            self.register_x,
            self.register_y,
            self.status.bits(),
            self.stack_pointer,
            self.cycles
        );

        self.advance_program_counter();
        self.extra_cycles = 0;
        self.skip_pc_advance = false;
        self.execute(bus, opcode);

        // If the opcode didn't move PC by some call/ret/branch, then
        // we step it forward by the size of the opcode - 1
        // since we've already stepped it forward one byte when reading it
        if !self.skip_pc_advance {
            self.program_counter = self
                .program_counter
                .wrapping_add((opcode.size - 1) as u16);
        }
        self.skip_cycles += opcode.cycles as u32 + self.extra_cycles;

        if bus.take_dma_request() {
            self.skip_dma_cycles();
        }
    }

    /// Stalls for an OAM DMA transfer.
    pub fn skip_dma_cycles(&mut self) {
        self.skip_cycles += OAM_DMA_CYCLES + (self.cycles & 1) as u32;
    }

    /// Services an interrupt: pushes PC and status, then jumps through the
    /// interrupt's vector. IRQs are ignored while interrupts are disabled.
    pub fn interrupt(&mut self, bus: &mut dyn CpuBusInterface, interrupt: Interrupt) {
        if interrupt.is_maskable() && self.status.contains(Flags::INTERRUPT_DISABLE) {
            return;
        }
        if interrupt.kind == InterruptKind::Brk {
            self.advance_program_counter();
        }
        trace!("[CPU] interrupt {:?}", interrupt.kind);
        self.push_interrupt(bus, interrupt);
        self.skip_cycles += interrupt.cycles as u32;
    }

    pub(super) fn push_interrupt(&mut self, bus: &mut dyn CpuBusInterface, interrupt: Interrupt) {
        self.stack_push_u16(bus, self.program_counter);
        self.stack_push(bus, self.status.bits() | interrupt.pushed_flags);
        self.status.insert(Flags::INTERRUPT_DISABLE);
        self.program_counter = self.read_u16(bus, interrupt.vector);
    }

    /// CPU cycles executed since the last reset
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycles still owed before the next instruction starts
    pub fn pending_cycles(&self) -> u32 {
        self.skip_cycles
    }

    fn execute(&mut self, bus: &mut dyn CpuBusInterface, opcode: &Opcode) {
        match opcode.code {
            0x00 => self.brk(bus),
            0xEA => {} // NOP

            0x4C | 0x6C => self.jmp(bus, opcode),
            0x20 => self.jsr(bus, opcode),
            0x60 => self.rts(bus),
            0x40 => self.rti(bus),

            0xAA => self.tax(),
            0xA8 => self.tay(),
            0xBA => self.tsx(),
            0x8A => self.txa(),
            0x9A => self.txs(),
            0x98 => self.tya(),

            0xD8 => self.cld(),
            0x58 => self.cli(),
            0xB8 => self.clv(),
            0x18 => self.clc(),
            0x38 => self.sec(),
            0x78 => self.sei(),
            0xF8 => self.sed(),

            0xD0 => self.branch(bus, opcode, !self.status.contains(Flags::ZERO)), // BNE
            0xF0 => self.branch(bus, opcode, self.status.contains(Flags::ZERO)), // BEQ
            0x70 => self.branch(bus, opcode, self.status.contains(Flags::OVERFLOW)), // BVS
            0x50 => self.branch(bus, opcode, !self.status.contains(Flags::OVERFLOW)), // BVC
            0x30 => self.branch(bus, opcode, self.status.contains(Flags::NEGATIVE)), // BMI
            0x10 => self.branch(bus, opcode, !self.status.contains(Flags::NEGATIVE)), // BPL
            0xB0 => self.branch(bus, opcode, self.status.contains(Flags::CARRY)), // BCS
            0x90 => self.branch(bus, opcode, !self.status.contains(Flags::CARRY)), // BCC

            0xE8 => self.inx(),
            0xC8 => self.iny(),
            0xCA => self.dex(),
            0x88 => self.dey(),

            0x48 => self.pha(bus),
            0x68 => self.pla(bus),
            0x08 => self.php(bus),
            0x28 => self.plp(bus),

            0x24 | 0x2C => self.bit(bus, opcode),

            0xA9 | 0xA5 | 0xB5 | 0xAD | 0xBD | 0xB9 | 0xA1 | 0xB1 => self.lda(bus, opcode),
            0xA2 | 0xA6 | 0xB6 | 0xAE | 0xBE => self.ldx(bus, opcode),
            0xA0 | 0xA4 | 0xB4 | 0xAC | 0xBC => self.ldy(bus, opcode),
            0x85 | 0x95 | 0x8D | 0x9D | 0x99 | 0x81 | 0x91 => self.sta(bus, opcode),
            0x86 | 0x96 | 0x8E => self.stx(bus, opcode),
            0x84 | 0x94 | 0x8C => self.sty(bus, opcode),

            0x0A | 0x06 | 0x16 | 0x0E | 0x1E => {
                self.asl(bus, opcode);
            }
            0x4A | 0x46 | 0x56 | 0x4E | 0x5E => {
                self.lsr(bus, opcode);
            }
            0x2A | 0x26 | 0x36 | 0x2E | 0x3E => {
                self.rol(bus, opcode);
            }
            0x6A | 0x66 | 0x76 | 0x6E | 0x7E => {
                self.ror(bus, opcode);
            }
            0xE6 | 0xF6 | 0xEE | 0xFE => {
                self.inc(bus, opcode);
            }
            0xC6 | 0xD6 | 0xCE | 0xDE => {
                self.dec(bus, opcode);
            }

            0xC9 | 0xC5 | 0xD5 | 0xCD | 0xDD | 0xD9 | 0xC1 | 0xD1 => {
                self.compare(bus, opcode, self.register_a) // CMP
            }
            0xE0 | 0xE4 | 0xEC => self.compare(bus, opcode, self.register_x), // CPX
            0xC0 | 0xC4 | 0xCC => self.compare(bus, opcode, self.register_y), // CPY

            0x69 | 0x65 | 0x75 | 0x6D | 0x7D | 0x79 | 0x61 | 0x71 => self.adc(bus, opcode),
            0xE9 | 0xE5 | 0xF5 | 0xED | 0xFD | 0xF9 | 0xE1 | 0xF1 | 0xEB => self.sbc(bus, opcode),
            0x29 | 0x25 | 0x35 | 0x2D | 0x3D | 0x39 | 0x21 | 0x31 => self.and(bus, opcode),
            0x49 | 0x45 | 0x55 | 0x4D | 0x5D | 0x59 | 0x41 | 0x51 => self.eor(bus, opcode),
            0x09 | 0x05 | 0x15 | 0x0D | 0x1D | 0x19 | 0x01 | 0x11 => self.ora(bus, opcode),

            // Unofficial opcodes
            0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA | 0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 | 0x04
            | 0x44 | 0x64 | 0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 | 0x0C | 0x1C | 0x3C | 0x5C
            | 0x7C | 0xDC | 0xFC => self.nop_read(bus, opcode),

            0xC7 | 0xD7 | 0xCF | 0xDF | 0xDB | 0xC3 | 0xD3 => self.dcp(bus, opcode),
            0xE7 | 0xF7 | 0xEF | 0xFF | 0xFB | 0xE3 | 0xF3 => self.isc(bus, opcode),
            0x07 | 0x17 | 0x0F | 0x1F | 0x1B | 0x03 | 0x13 => self.slo(bus, opcode),
            0x27 | 0x37 | 0x2F | 0x3F | 0x3B | 0x23 | 0x33 => self.rla(bus, opcode),
            0x47 | 0x57 | 0x4F | 0x5F | 0x5B | 0x43 | 0x53 => self.sre(bus, opcode),
            0x67 | 0x77 | 0x6F | 0x7F | 0x7B | 0x63 | 0x73 => self.rra(bus, opcode),
            0xA7 | 0xB7 | 0xAF | 0xBF | 0xA3 | 0xB3 => self.lax(bus, opcode),
            0x87 | 0x97 | 0x8F | 0x83 => self.sax(bus, opcode),
            0x0B | 0x2B => self.anc(bus, opcode),
            0x4B => self.alr(bus, opcode),
            0x6B => self.arr(bus, opcode),
            0xCB => self.sbx(bus, opcode),

            code => error!("Opcode {code:#04x} has no handler"),
        }
    }

    // Utility functions
    /////////////////////
    pub(super) fn advance_program_counter(&mut self) {
        self.program_counter = self.program_counter.wrapping_add(1);
    }

    pub(super) fn read_u16(&self, bus: &mut dyn CpuBusInterface, addr: u16) -> u16 {
        let lo = bus.cpu_bus_read(addr) as u16;
        let hi = bus.cpu_bus_read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Resolves the operand address for `mode`, with the program counter
    /// pointing at the first operand byte.
    ///
    /// # Returns
    ///
    /// The address and whether indexing crossed a page boundary
    pub(super) fn get_parameter_address(
        &mut self,
        bus: &mut dyn CpuBusInterface,
        mode: AddressingMode,
    ) -> (u16, bool) {
        let pc = self.program_counter;
        match mode {
            AddressingMode::Immediate => (pc, false),
            AddressingMode::ZeroPage => (bus.cpu_bus_read(pc) as u16, false),
            AddressingMode::ZeroPageX => {
                let base = bus.cpu_bus_read(pc);
                (base.wrapping_add(self.register_x) as u16, false)
            }
            AddressingMode::ZeroPageY => {
                let base = bus.cpu_bus_read(pc);
                (base.wrapping_add(self.register_y) as u16, false)
            }
            AddressingMode::Absolute => (self.read_u16(bus, pc), false),
            AddressingMode::AbsoluteX => {
                let base = self.read_u16(bus, pc);
                let addr = base.wrapping_add(self.register_x as u16);
                (addr, is_boundary_crossed(base, addr))
            }
            AddressingMode::AbsoluteY => {
                let base = self.read_u16(bus, pc);
                let addr = base.wrapping_add(self.register_y as u16);
                (addr, is_boundary_crossed(base, addr))
            }
            AddressingMode::IndirectX => {
                let base = bus.cpu_bus_read(pc);
                let ptr = base.wrapping_add(self.register_x); // Zero-page wrapping
                let lo = bus.cpu_bus_read(ptr as u16) as u16;
                let hi = bus.cpu_bus_read(ptr.wrapping_add(1) as u16) as u16;
                ((hi << 8) | lo, false)
            }
            AddressingMode::IndirectY => {
                let base = bus.cpu_bus_read(pc);
                let lo = bus.cpu_bus_read(base as u16) as u16;
                let hi = bus.cpu_bus_read(base.wrapping_add(1) as u16) as u16;
                let dynamic_base = (hi << 8) | lo;
                let addr = dynamic_base.wrapping_add(self.register_y as u16);
                (addr, is_boundary_crossed(dynamic_base, addr))
            }
            AddressingMode::Indirect => {
                /* NOTE:
                  An original 6502 does not correctly fetch the target address if the indirect vector falls
                  on a page boundary (e.g. $xxFF where xx is any value from $00 to $FF). In this case fetches
                  the LSB from $xxFF as expected but takes the MSB from $xx00.
                */
                let indirect_vec = self.read_u16(bus, pc);
                let lo = bus.cpu_bus_read(indirect_vec) as u16;
                let hi_addr = (indirect_vec & 0xFF00) | (indirect_vec.wrapping_add(1) & 0x00FF);
                let hi = bus.cpu_bus_read(hi_addr) as u16;
                ((hi << 8) | lo, false)
            }
            AddressingMode::Relative => {
                let offset = bus.cpu_bus_read(pc) as i8;
                // the relative address is based on a PC /after/ the current opcode
                let base_pc = pc.wrapping_add(1);
                let target = base_pc.wrapping_add_signed(offset as i16);
                (target, is_boundary_crossed(base_pc, target))
            }
            AddressingMode::Accumulator | AddressingMode::None => {
                error!("Addressing mode {mode:?} has no operand address");
                (0, false)
            }
        }
    }

    pub(super) fn set_register_a(&mut self, value: u8) {
        self.register_a = value;
        self.update_zero_and_negative_flags(value);
    }

    pub(super) fn set_register_x(&mut self, value: u8) {
        self.register_x = value;
        self.update_zero_and_negative_flags(value);
    }

    pub(super) fn set_register_y(&mut self, value: u8) {
        self.register_y = value;
        self.update_zero_and_negative_flags(value);
    }

    pub(super) fn set_program_counter(&mut self, address: u16) {
        self.program_counter = address;
        self.skip_pc_advance = true;
    }

    pub(super) fn add_extra_cycles(&mut self, cycles: u32) {
        self.extra_cycles += cycles;
    }

    pub(super) fn stack_push(&mut self, bus: &mut dyn CpuBusInterface, value: u8) {
        let address = CPU_STACK_BASE.wrapping_add(self.stack_pointer as u16);
        bus.cpu_bus_write(address, value);
        self.stack_pointer = self.stack_pointer.wrapping_sub(1);
    }

    pub(super) fn stack_push_u16(&mut self, bus: &mut dyn CpuBusInterface, value: u16) {
        self.stack_push(bus, (value >> 8) as u8);
        self.stack_push(bus, value as u8);
    }

    pub(super) fn stack_pop(&mut self, bus: &mut dyn CpuBusInterface) -> u8 {
        self.stack_pointer = self.stack_pointer.wrapping_add(1);
        bus.cpu_bus_read(CPU_STACK_BASE.wrapping_add(self.stack_pointer as u16))
    }

    pub(super) fn stack_pop_u16(&mut self, bus: &mut dyn CpuBusInterface) -> u16 {
        let lo = self.stack_pop(bus) as u16;
        let hi = self.stack_pop(bus) as u16;
        (hi << 8) | lo
    }

    pub(super) fn update_zero_and_negative_flags(&mut self, result: u8) {
        self.status.set(Flags::ZERO, result == 0);
        self.status.set(Flags::NEGATIVE, result & 0b1000_0000 != 0);
    }

    pub(super) fn brk(&mut self, bus: &mut dyn CpuBusInterface) {
        // BRK skips the padding byte after the opcode
        self.advance_program_counter();
        self.push_interrupt(bus, interrupts::BRK);
        self.skip_pc_advance = true;
    }
}

fn is_boundary_crossed(addr1: u16, addr2: u16) -> bool {
    addr1 & 0xFF00 != addr2 & 0xFF00
}

impl Serializable for CPU {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        serialization::write_int(buffer, self.program_counter);
        serialization::write_int(buffer, self.stack_pointer);
        serialization::write_int(buffer, self.register_a);
        serialization::write_int(buffer, self.register_x);
        serialization::write_int(buffer, self.register_y);
        serialization::write_int(buffer, self.status.bits());
        serialization::write_int(buffer, self.skip_cycles);
        serialization::write_int(buffer, self.cycles);
    }

    fn deserialize<'a>(&mut self, mut buffer: &'a [u8]) -> &'a [u8] {
        self.program_counter = serialization::read_int(&mut buffer);
        self.stack_pointer = serialization::read_int(&mut buffer);
        self.register_a = serialization::read_int(&mut buffer);
        self.register_x = serialization::read_int(&mut buffer);
        self.register_y = serialization::read_int(&mut buffer);
        self.status = Flags::from_bits_truncate(serialization::read_int(&mut buffer));
        self.skip_cycles = serialization::read_int(&mut buffer);
        self.cycles = serialization::read_int(&mut buffer);
        buffer
    }
}
