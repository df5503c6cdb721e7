use bitflags::bitflags;

pub mod instruction_handlers;
pub mod interrupts;
pub mod opcodes;
pub mod processor;

#[cfg(test)]
mod processor_tests;

pub const CPU_STACK_RESET: u8 = 0xFD;
pub const CPU_STACK_BASE: u16 = 0x0100;
pub const CPU_RESET_VECTOR: u16 = 0xFFFC;

/// OAM DMA halts the CPU for 513 cycles, plus one when it starts on an odd cycle
pub const OAM_DMA_CYCLES: u32 = 513;

bitflags! {
    /* https://www.nesdev.org/wiki/Status_flags
            7  bit  0
        ---- ----
        NV1B DIZC
        |||| ||||
        |||| |||+- Carry
        |||| ||+-- Zero
        |||| |+--- Interrupt Disable
        |||| +---- Decimal
        |||+------ (No CPU effect; see: the B flag)
        ||+------- (No CPU effect; always pushed as 1)
        |+-------- Overflow
        +--------- Negative
     */
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Flags: u8 {
        const CARRY             = 1<<0;
        const ZERO              = 1<<1;
        const INTERRUPT_DISABLE = 1<<2;
        const DECIMAL_MODE      = 1<<3;
        const BREAK             = 1<<4;
        const BREAK2            = 1<<5;
        const OVERFLOW          = 1<<6;
        const NEGATIVE          = 1<<7;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndirectX,
    IndirectY,
    Indirect,    // Only JMP supports this mode
    Relative,    // The branch instructions exclusively use this mode
    Accumulator, // Shifts and rotates on register A
    None,
}

/// The CPU's view of the main bus.
pub trait CpuBusInterface {
    fn cpu_bus_read(&mut self, addr: u16) -> u8;
    fn cpu_bus_write(&mut self, addr: u16, value: u8);

    /// True once after a write that started an OAM DMA transfer
    fn take_dma_request(&mut self) -> bool {
        false
    }
}

/// 6502 core with instruction-granular timing.
///
/// An instruction executes in full on the first cycle it is due; the
/// remaining cycles it costs are burned off through `skip_cycles`.
#[derive(Debug, Clone)]
pub struct CPU {
    pub register_a: u8,
    pub register_x: u8,
    pub register_y: u8,
    pub stack_pointer: u8,
    pub status: Flags,
    pub program_counter: u16,

    skip_cycles: u32,
    cycles: u64,

    extra_cycles: u32,
    skip_pc_advance: bool,
}
