use super::interrupts;
use super::{CPU, CpuBusInterface, Flags};
use crate::nes::serialization::Serializable;

/// Flat 64 KiB of RAM; a write to $4014 raises a DMA request.
struct TestBus {
    memory: Vec<u8>,
    dma_requested: bool,
}

impl TestBus {
    fn with_program(origin: u16, program: &[u8]) -> TestBus {
        let mut memory = vec![0; 0x10000];
        memory[origin as usize..origin as usize + program.len()].copy_from_slice(program);
        memory[0xFFFC] = origin as u8;
        memory[0xFFFD] = (origin >> 8) as u8;
        TestBus {
            memory,
            dma_requested: false,
        }
    }

    fn set_vector(&mut self, vector: u16, target: u16) {
        self.memory[vector as usize] = target as u8;
        self.memory[vector as usize + 1] = (target >> 8) as u8;
    }
}

impl CpuBusInterface for TestBus {
    fn cpu_bus_read(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn cpu_bus_write(&mut self, addr: u16, value: u8) {
        if addr == 0x4014 {
            self.dma_requested = true;
        }
        self.memory[addr as usize] = value;
    }

    fn take_dma_request(&mut self) -> bool {
        std::mem::take(&mut self.dma_requested)
    }
}

fn init(origin: u16, program: &[u8]) -> (CPU, TestBus) {
    let mut bus = TestBus::with_program(origin, program);
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    (cpu, bus)
}

/// Runs exactly one instruction and returns the cycles it took
fn run_instruction(cpu: &mut CPU, bus: &mut TestBus) -> u64 {
    let start = cpu.cycles();
    cpu.cycle(bus);
    while cpu.pending_cycles() > 1 {
        cpu.cycle(bus);
    }
    cpu.cycles() - start
}

#[test]
fn test_reset_loads_vector() {
    let (cpu, _) = init(0x8123, &[0xEA]);
    assert_eq!(cpu.program_counter, 0x8123);
    assert_eq!(cpu.stack_pointer, 0xFD);
    assert_eq!(cpu.status.bits(), 0x24);
    assert_eq!(cpu.cycles(), 0);
}

#[test]
fn test_lda_immediate_sets_flags() {
    let (mut cpu, mut bus) = init(0x8000, &[0xA9, 0x00, 0xA9, 0x80]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.register_a, 0);
    assert!(cpu.status.contains(Flags::ZERO));

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.register_a, 0x80);
    assert!(!cpu.status.contains(Flags::ZERO));
    assert!(cpu.status.contains(Flags::NEGATIVE));
    assert_eq!(cpu.program_counter, 0x8004);
}

#[test]
fn test_adc_signed_overflow() {
    let (mut cpu, mut bus) = init(0x8000, &[0xA9, 0x50, 0x69, 0x50]);
    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.register_a, 0xA0);
    assert!(cpu.status.contains(Flags::OVERFLOW));
    assert!(cpu.status.contains(Flags::NEGATIVE));
    assert!(!cpu.status.contains(Flags::CARRY));
}

#[test]
fn test_sbc_with_carry_set() {
    let (mut cpu, mut bus) = init(0x8000, &[0x38, 0xA9, 0x05, 0xE9, 0x03]);
    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.register_a, 0x02);
    assert!(cpu.status.contains(Flags::CARRY));
}

#[test]
fn test_asl_accumulator() {
    let (mut cpu, mut bus) = init(0x8000, &[0xA9, 0x81, 0x0A]);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.register_a, 0x02);
    assert!(cpu.status.contains(Flags::CARRY));
}

#[test]
fn test_branch_cycle_costs() {
    // not taken
    let (mut cpu, mut bus) = init(0x8000, &[0xA2, 0x00, 0xD0, 0x02]);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.program_counter, 0x8004);

    // taken, same page
    let (mut cpu, mut bus) = init(0x8000, &[0xA2, 0x01, 0xD0, 0x02]);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.program_counter, 0x8006);

    // taken, into the next page
    let (mut cpu, mut bus) = init(0x80FB, &[0xA2, 0x01, 0xD0, 0x10]);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.program_counter, 0x810F);
}

#[test]
fn test_page_cross_penalty_only_for_reads() {
    let (mut cpu, mut bus) = init(0x8000, &[0xA2, 0x01, 0xBD, 0xFF, 0x80, 0x9D, 0xFF, 0x02]);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 5); // LDA $80FF,X
    assert_eq!(run_instruction(&mut cpu, &mut bus), 5); // STA $02FF,X
    assert_eq!(bus.memory[0x0300], cpu.register_a);
}

#[test]
fn test_jsr_and_rts() {
    let (mut cpu, mut bus) = init(0x8000, &[0x20, 0x00, 0x90]);
    bus.memory[0x9000] = 0x60;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.program_counter, 0x9000);
    assert_eq!(cpu.stack_pointer, 0xFB);
    assert_eq!(bus.memory[0x01FD], 0x80);
    assert_eq!(bus.memory[0x01FC], 0x02);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.program_counter, 0x8003);
    assert_eq!(cpu.stack_pointer, 0xFD);
}

#[test]
fn test_jmp_indirect_page_bug() {
    let (mut cpu, mut bus) = init(0x8000, &[0x6C, 0xFF, 0x02]);
    bus.memory[0x02FF] = 0x00;
    bus.memory[0x0200] = 0x90;
    bus.memory[0x0300] = 0x50;
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.program_counter, 0x9000);
}

#[test]
fn test_php_pushes_break_bits() {
    let (mut cpu, mut bus) = init(0x8000, &[0x08, 0x28]);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.memory[0x01FD], 0x34);

    run_instruction(&mut cpu, &mut bus);
    assert!(!cpu.status.contains(Flags::BREAK));
    assert!(cpu.status.contains(Flags::BREAK2));
}

#[test]
fn test_brk_jumps_through_irq_vector() {
    let (mut cpu, mut bus) = init(0x8000, &[0x00, 0xEA]);
    bus.set_vector(0xFFFE, 0x9000);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.program_counter, 0x9000);
    assert_eq!(bus.memory[0x01FD], 0x80);
    assert_eq!(bus.memory[0x01FC], 0x02);
    assert_eq!(bus.memory[0x01FB] & 0x10, 0x10);
    assert!(cpu.status.contains(Flags::INTERRUPT_DISABLE));
}

#[test]
fn test_nmi_pushes_state_and_jumps() {
    let (mut cpu, mut bus) = init(0x8000, &[0xEA]);
    bus.set_vector(0xFFFA, 0x9000);

    cpu.interrupt(&mut bus, interrupts::NMI);
    assert_eq!(cpu.program_counter, 0x9000);
    assert_eq!(cpu.stack_pointer, 0xFA);
    assert_eq!(bus.memory[0x01FD], 0x80);
    assert_eq!(bus.memory[0x01FC], 0x00);
    assert_eq!(bus.memory[0x01FB] & 0x30, 0x20);
    assert_eq!(cpu.pending_cycles(), 7);
}

#[test]
fn test_irq_ignored_while_disabled() {
    let (mut cpu, mut bus) = init(0x8000, &[0x58]);
    bus.set_vector(0xFFFE, 0x9000);

    cpu.interrupt(&mut bus, interrupts::IRQ);
    assert_eq!(cpu.program_counter, 0x8000);
    assert_eq!(cpu.stack_pointer, 0xFD);

    run_instruction(&mut cpu, &mut bus); // CLI
    cpu.interrupt(&mut bus, interrupts::IRQ);
    assert_eq!(cpu.program_counter, 0x9000);
}

#[test]
fn test_dma_request_stalls_cpu() {
    let (mut cpu, mut bus) = init(0x8000, &[0x8D, 0x14, 0x40]);
    // Executes on cycle 1, which is odd
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4 + 513 + 1);
}

#[test]
fn test_unknown_opcode_runs_as_nop() {
    let (mut cpu, mut bus) = init(0x8000, &[0x02, 0xA9, 0x07]);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.program_counter, 0x8001);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.register_a, 0x07);
}

#[test]
fn test_unofficial_lax_and_dcp() {
    let (mut cpu, mut bus) = init(0x8000, &[0xA7, 0x10, 0xC7, 0x10]);
    bus.memory[0x10] = 0x33;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.register_a, 0x33);
    assert_eq!(cpu.register_x, 0x33);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.memory[0x10], 0x32);
    assert!(cpu.status.contains(Flags::CARRY));
    assert!(!cpu.status.contains(Flags::ZERO));
}

#[test]
fn test_serialize_restores_registers_and_counters() {
    let (mut cpu, mut bus) = init(0x8000, &[0xA9, 0x42, 0xA2, 0x17, 0x38, 0xEA]);
    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }
    cpu.cycle(&mut bus); // start the NOP, leaving a cycle pending

    let mut buffer = Vec::new();
    cpu.serialize(&mut buffer);

    let mut restored = CPU::new();
    let rest = restored.deserialize(&buffer);
    assert!(rest.is_empty());
    assert_eq!(restored.register_a, 0x42);
    assert_eq!(restored.register_x, 0x17);
    assert_eq!(restored.program_counter, cpu.program_counter);
    assert_eq!(restored.status, cpu.status);
    assert_eq!(restored.cycles(), cpu.cycles());
    assert_eq!(restored.pending_cycles(), cpu.pending_cycles());
}
