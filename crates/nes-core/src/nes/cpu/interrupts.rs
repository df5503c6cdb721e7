// See: https://www.nesdev.org/wiki/CPU_interrupts

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InterruptKind {
    /// Picture unit entering vblank with NMI enabled
    Nmi,
    /// Maskable; nothing on this console raises it yet
    Irq,
    /// Software break, opcode $00
    Brk,
}

/// How the CPU enters one kind of interrupt
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Interrupt {
    pub kind: InterruptKind,
    pub vector: u16,
    /// Bits forced on in the pushed copy of the status register
    pub pushed_flags: u8,
    pub cycles: u8,
}

impl Interrupt {
    pub fn is_maskable(&self) -> bool {
        self.kind == InterruptKind::Irq
    }
}

pub const NMI: Interrupt = Interrupt {
    kind: InterruptKind::Nmi,
    vector: 0xFFFA,
    pushed_flags: 0b0010_0000,
    cycles: 7,
};

pub const IRQ: Interrupt = Interrupt {
    kind: InterruptKind::Irq,
    vector: 0xFFFE,
    pushed_flags: 0b0010_0000,
    cycles: 7,
};

/// Shares the IRQ vector; handlers tell them apart by the pushed B bit
pub const BRK: Interrupt = Interrupt {
    kind: InterruptKind::Brk,
    vector: 0xFFFE,
    pushed_flags: 0b0011_0000,
    cycles: 7,
};
