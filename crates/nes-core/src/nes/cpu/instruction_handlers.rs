use super::opcodes::Opcode;
use super::{AddressingMode, CPU, CpuBusInterface, Flags};

type Bus<'a> = &'a mut dyn CpuBusInterface;

impl CPU {
    fn read_operand(&mut self, bus: Bus, opcode: &Opcode) -> u8 {
        let (address, boundary_cross) = self.get_parameter_address(bus, opcode.mode);
        self.add_extra_cycles(boundary_cross as u32); // boundary_cross adds 1 extra cycle
        bus.cpu_bus_read(address)
    }

    /// Read-modify-write on memory or, in accumulator mode, on register A.
    fn modify(&mut self, bus: Bus, opcode: &Opcode, op: impl FnOnce(&mut CPU, u8) -> u8) -> u8 {
        if opcode.mode == AddressingMode::Accumulator {
            let value = self.register_a;
            let result = op(self, value);
            self.set_register_a(result);
            return result;
        }
        let (address, _) = self.get_parameter_address(bus, opcode.mode);
        let value = bus.cpu_bus_read(address);
        let result = op(self, value);
        bus.cpu_bus_write(address, result);
        self.update_zero_and_negative_flags(result);
        result
    }

    fn add_to_register_a(&mut self, value: u8) {
        let curr_carry = self.status.contains(Flags::CARRY) as u16;
        let sum = self.register_a as u16 + value as u16 + curr_carry;
        let result = sum as u8;

        // OVERFLOW when both inputs share a sign the result does not
        let signed_overflow =
            ((self.register_a ^ result) & 0x80 != 0) && ((self.register_a ^ value) & 0x80 == 0);

        self.status.set(Flags::OVERFLOW, signed_overflow);
        self.status.set(Flags::CARRY, sum > 0xFF);
        self.set_register_a(result);
    }

    pub(super) fn compare(&mut self, bus: Bus, opcode: &Opcode, compare_value: u8) {
        let value = self.read_operand(bus, opcode);
        self.status.set(Flags::CARRY, compare_value >= value);
        self.update_zero_and_negative_flags(compare_value.wrapping_sub(value));
    }

    pub(super) fn branch(&mut self, bus: Bus, opcode: &Opcode, condition: bool) {
        let (address, boundary_crossed) = self.get_parameter_address(bus, opcode.mode);
        if condition {
            self.set_program_counter(address);
            self.add_extra_cycles(1 + boundary_crossed as u32);
        }
    }

    // Loads and stores
    ////////////////////
    pub(super) fn lda(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.set_register_a(value);
    }

    pub(super) fn ldx(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.set_register_x(value);
    }

    pub(super) fn ldy(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.set_register_y(value);
    }

    pub(super) fn sta(&mut self, bus: Bus, opcode: &Opcode) {
        let (address, _) = self.get_parameter_address(bus, opcode.mode);
        bus.cpu_bus_write(address, self.register_a);
    }

    pub(super) fn stx(&mut self, bus: Bus, opcode: &Opcode) {
        let (address, _) = self.get_parameter_address(bus, opcode.mode);
        bus.cpu_bus_write(address, self.register_x);
    }

    pub(super) fn sty(&mut self, bus: Bus, opcode: &Opcode) {
        let (address, _) = self.get_parameter_address(bus, opcode.mode);
        bus.cpu_bus_write(address, self.register_y);
    }

    // Transfers
    /////////////
    pub(super) fn tax(&mut self) {
        self.set_register_x(self.register_a);
    }

    pub(super) fn tay(&mut self) {
        self.set_register_y(self.register_a);
    }

    pub(super) fn tsx(&mut self) {
        self.set_register_x(self.stack_pointer);
    }

    pub(super) fn txa(&mut self) {
        self.set_register_a(self.register_x);
    }

    pub(super) fn txs(&mut self) {
        self.stack_pointer = self.register_x;
    }

    pub(super) fn tya(&mut self) {
        self.set_register_a(self.register_y);
    }

    // Flags
    /////////
    pub(super) fn cld(&mut self) {
        self.status.remove(Flags::DECIMAL_MODE);
    }

    pub(super) fn cli(&mut self) {
        self.status.remove(Flags::INTERRUPT_DISABLE);
    }

    pub(super) fn clv(&mut self) {
        self.status.remove(Flags::OVERFLOW);
    }

    pub(super) fn clc(&mut self) {
        self.status.remove(Flags::CARRY);
    }

    pub(super) fn sec(&mut self) {
        self.status.insert(Flags::CARRY);
    }

    pub(super) fn sei(&mut self) {
        self.status.insert(Flags::INTERRUPT_DISABLE);
    }

    pub(super) fn sed(&mut self) {
        self.status.insert(Flags::DECIMAL_MODE);
    }

    // Increments and decrements
    /////////////////////////////
    pub(super) fn inx(&mut self) {
        self.set_register_x(self.register_x.wrapping_add(1));
    }

    pub(super) fn iny(&mut self) {
        self.set_register_y(self.register_y.wrapping_add(1));
    }

    pub(super) fn dex(&mut self) {
        self.set_register_x(self.register_x.wrapping_sub(1));
    }

    pub(super) fn dey(&mut self) {
        self.set_register_y(self.register_y.wrapping_sub(1));
    }

    pub(super) fn inc(&mut self, bus: Bus, opcode: &Opcode) -> u8 {
        self.modify(bus, opcode, |_, value| value.wrapping_add(1))
    }

    pub(super) fn dec(&mut self, bus: Bus, opcode: &Opcode) -> u8 {
        self.modify(bus, opcode, |_, value| value.wrapping_sub(1))
    }

    // Stack
    /////////
    pub(super) fn pha(&mut self, bus: Bus) {
        self.stack_push(bus, self.register_a);
    }

    pub(super) fn pla(&mut self, bus: Bus) {
        let value = self.stack_pop(bus);
        self.set_register_a(value);
    }

    pub(super) fn php(&mut self, bus: Bus) {
        // https://www.nesdev.org/wiki/Status_flags
        // B flag is pushed as 1, but not affected on the CPU
        let status = self.status | Flags::BREAK | Flags::BREAK2;
        self.stack_push(bus, status.bits());
    }

    pub(super) fn plp(&mut self, bus: Bus) {
        self.status = Flags::from_bits_truncate(self.stack_pop(bus));
        self.status.remove(Flags::BREAK);
        self.status.insert(Flags::BREAK2);
    }

    // Jumps and subroutines
    /////////////////////////
    pub(super) fn jmp(&mut self, bus: Bus, opcode: &Opcode) {
        let (address, _) = self.get_parameter_address(bus, opcode.mode);
        self.set_program_counter(address);
    }

    pub(super) fn jsr(&mut self, bus: Bus, opcode: &Opcode) {
        let (address, _) = self.get_parameter_address(bus, opcode.mode);
        // Return address is the last byte of the JSR instruction
        self.stack_push_u16(bus, self.program_counter.wrapping_add(1));
        self.set_program_counter(address);
    }

    pub(super) fn rts(&mut self, bus: Bus) {
        let address = self.stack_pop_u16(bus).wrapping_add(1);
        self.set_program_counter(address);
    }

    pub(super) fn rti(&mut self, bus: Bus) {
        self.plp(bus);
        let address = self.stack_pop_u16(bus);
        self.set_program_counter(address);
    }

    // Arithmetic and logic
    ////////////////////////
    pub(super) fn adc(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.add_to_register_a(value);
    }

    pub(super) fn sbc(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.add_to_register_a(!value);
    }

    pub(super) fn and(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.set_register_a(self.register_a & value);
    }

    pub(super) fn eor(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.set_register_a(self.register_a ^ value);
    }

    pub(super) fn ora(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.set_register_a(self.register_a | value);
    }

    pub(super) fn bit(&mut self, bus: Bus, opcode: &Opcode) {
        let (address, _) = self.get_parameter_address(bus, opcode.mode);
        let value = bus.cpu_bus_read(address);
        self.status.set(Flags::ZERO, self.register_a & value == 0);
        self.status.set(Flags::OVERFLOW, value & 0b0100_0000 != 0);
        self.status.set(Flags::NEGATIVE, value & 0b1000_0000 != 0);
    }

    // Shifts and rotates
    //////////////////////
    pub(super) fn asl(&mut self, bus: Bus, opcode: &Opcode) -> u8 {
        self.modify(bus, opcode, |cpu, value| {
            cpu.status.set(Flags::CARRY, value & 0x80 != 0);
            value << 1
        })
    }

    pub(super) fn lsr(&mut self, bus: Bus, opcode: &Opcode) -> u8 {
        self.modify(bus, opcode, |cpu, value| {
            cpu.status.set(Flags::CARRY, value & 0x01 != 0);
            value >> 1
        })
    }

    pub(super) fn rol(&mut self, bus: Bus, opcode: &Opcode) -> u8 {
        self.modify(bus, opcode, |cpu, value| {
            let carry_in = cpu.status.contains(Flags::CARRY) as u8;
            cpu.status.set(Flags::CARRY, value & 0x80 != 0);
            (value << 1) | carry_in
        })
    }

    pub(super) fn ror(&mut self, bus: Bus, opcode: &Opcode) -> u8 {
        self.modify(bus, opcode, |cpu, value| {
            let carry_in = (cpu.status.contains(Flags::CARRY) as u8) << 7;
            cpu.status.set(Flags::CARRY, value & 0x01 != 0);
            (value >> 1) | carry_in
        })
    }

    // Unofficial opcodes
    //////////////////////

    /// Multi-byte NOPs still pay the page-cross penalty of their read
    pub(super) fn nop_read(&mut self, bus: Bus, opcode: &Opcode) {
        if opcode.mode != AddressingMode::None {
            self.read_operand(bus, opcode);
        }
    }

    /// DCP => DEC oper + CMP oper
    pub(super) fn dcp(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.dec(bus, opcode);
        self.status.set(Flags::CARRY, self.register_a >= value);
        self.update_zero_and_negative_flags(self.register_a.wrapping_sub(value));
    }

    /// ISC => INC oper + SBC oper
    pub(super) fn isc(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.inc(bus, opcode);
        self.add_to_register_a(!value);
    }

    /// SLO => ASL oper + ORA oper
    pub(super) fn slo(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.asl(bus, opcode);
        self.set_register_a(self.register_a | value);
    }

    /// RLA => ROL oper + AND oper
    pub(super) fn rla(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.rol(bus, opcode);
        self.set_register_a(self.register_a & value);
    }

    /// SRE => LSR oper + EOR oper
    pub(super) fn sre(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.lsr(bus, opcode);
        self.set_register_a(self.register_a ^ value);
    }

    /// RRA => ROR oper + ADC oper
    pub(super) fn rra(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.ror(bus, opcode);
        self.add_to_register_a(value);
    }

    /// LAX => LDA oper + LDX oper
    pub(super) fn lax(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        self.set_register_a(value);
        self.set_register_x(value);
    }

    /// SAX => A AND X -> M
    pub(super) fn sax(&mut self, bus: Bus, opcode: &Opcode) {
        let (address, _) = self.get_parameter_address(bus, opcode.mode);
        bus.cpu_bus_write(address, self.register_a & self.register_x);
    }

    /// ANC => A AND oper, bit(7) -> C
    pub(super) fn anc(&mut self, bus: Bus, opcode: &Opcode) {
        self.and(bus, opcode);
        self.status.set(Flags::CARRY, self.register_a & 0x80 != 0);
    }

    /// ALR => AND oper + LSR A
    pub(super) fn alr(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode) & self.register_a;
        self.status.set(Flags::CARRY, value & 0x01 != 0);
        self.set_register_a(value >> 1);
    }

    /// ARR => AND oper + ROR A, with C and V taken from bits 6 and 5
    pub(super) fn arr(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode) & self.register_a;
        let carry_in = (self.status.contains(Flags::CARRY) as u8) << 7;
        let result = (value >> 1) | carry_in;
        self.set_register_a(result);
        self.status.set(Flags::CARRY, result & 0x40 != 0);
        self.status
            .set(Flags::OVERFLOW, ((result >> 6) ^ (result >> 5)) & 1 != 0);
    }

    /// SBX => (A AND X) - oper -> X, flags like CMP
    pub(super) fn sbx(&mut self, bus: Bus, opcode: &Opcode) {
        let value = self.read_operand(bus, opcode);
        let and = self.register_a & self.register_x;
        self.status.set(Flags::CARRY, and >= value);
        self.set_register_x(and.wrapping_sub(value));
    }
}
