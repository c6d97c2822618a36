use crate::core::Bus;
use crate::cpu::z80::{Flag, Z80};

// The repeat forms execute one iteration per decoded instruction and back
// PC up over the ED-prefixed opcode while work remains, so a host stepping
// the CPU sees consistent state between iterations.

impl Z80 {
    fn block_delta(opcode: u8) -> u16 {
        // Bit 3 distinguishes the decrementing forms (LDD/CPD/IND/OUTD).
        if opcode & 0x08 != 0 { 0xFFFF } else { 1 }
    }

    /// One LDI/LDD iteration: (DE) <- (HL), pointers move, BC decrements.
    /// P/V = (BC != 0), H = N = 0; S, Z, C preserved.
    fn block_transfer<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let delta = Self::block_delta(opcode);
        let val = bus.read(self.get_hl());
        bus.write(self.get_de(), val);

        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_de(self.get_de().wrapping_add(delta));
        self.set_bc(self.get_bc().wrapping_sub(1));

        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::C as u8);
        if self.get_bc() != 0 { f |= Flag::PV as u8; }
        let n = val.wrapping_add(self.a);
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.f = f;
    }

    /// LDI (ED A0) / LDD (ED A8) — 16 T.
    pub(crate) fn op_ldi_ldd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        self.block_transfer(opcode, bus);
        self.cycles += 16;
    }

    /// LDIR (ED B0) / LDDR (ED B8) — 21 T per repeating step, 16 T on the
    /// terminating step.
    pub(crate) fn op_ldir_lddr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        self.block_transfer(opcode, bus);
        if self.get_bc() != 0 {
            self.pc = self.pc.wrapping_sub(2);
            self.memptr = self.pc.wrapping_add(1);
            self.cycles += 21;
        } else {
            self.cycles += 16;
        }
    }

    /// One CPI/CPD iteration: compare A with (HL), HL moves, BC decrements.
    /// N = 1; Z, S and H from the subtraction against the byte read before
    /// the pointer moved; P/V = (BC != 0); C preserved.
    fn block_compare<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let delta = Self::block_delta(opcode);
        let val = bus.read(self.get_hl());
        let result = self.a.wrapping_sub(val);
        let half = (self.a & 0x0F) < (val & 0x0F);

        self.set_hl(self.get_hl().wrapping_add(delta));
        self.set_bc(self.get_bc().wrapping_sub(1));
        self.memptr = self.memptr.wrapping_add(delta);

        let mut f = (self.f & Flag::C as u8) | Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if half { f |= Flag::H as u8; }
        if self.get_bc() != 0 { f |= Flag::PV as u8; }
        let n = result.wrapping_sub(if half { 1 } else { 0 });
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.f = f;
    }

    /// CPI (ED A1) / CPD (ED A9) — 16 T.
    pub(crate) fn op_cpi_cpd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        self.block_compare(opcode, bus);
        self.cycles += 16;
    }

    /// CPIR (ED B1) / CPDR (ED B9) — repeats until BC = 0 or a match.
    pub(crate) fn op_cpir_cpdr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        self.block_compare(opcode, bus);
        let matched = (self.f & Flag::Z as u8) != 0;
        if self.get_bc() != 0 && !matched {
            self.pc = self.pc.wrapping_sub(2);
            self.memptr = self.pc.wrapping_add(1);
            self.cycles += 21;
        } else {
            self.cycles += 16;
        }
    }

    /// One INI/IND iteration: (HL) <- port(C), HL moves, B decrements.
    /// Z set iff B = 0 after; N = 1; S copies B's sign; C preserved.
    fn block_in<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let delta = Self::block_delta(opcode);
        let val = bus.io_read(self.c);
        bus.write(self.get_hl(), val);
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.b = self.b.wrapping_sub(1);
        self.f = self.block_io_flags();
    }

    /// INI (ED A2) / IND (ED AA) — 16 T.
    pub(crate) fn op_ini_ind<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        self.block_in(opcode, bus);
        self.cycles += 16;
    }

    /// INIR (ED B2) / INDR (ED BA) — repeats until B = 0.
    pub(crate) fn op_inir_indr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        self.block_in(opcode, bus);
        self.repeat_while_b();
    }

    /// One OUTI/OUTD iteration: port(C) <- (HL), HL moves, B decrements.
    fn block_out<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let delta = Self::block_delta(opcode);
        let val = bus.read(self.get_hl());
        self.set_hl(self.get_hl().wrapping_add(delta));
        self.b = self.b.wrapping_sub(1);
        bus.io_write(self.c, val);
        self.f = self.block_io_flags();
    }

    /// OUTI (ED A3) / OUTD (ED AB) — 16 T.
    pub(crate) fn op_outi_outd<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        self.block_out(opcode, bus);
        self.cycles += 16;
    }

    /// OTIR (ED B3) / OTDR (ED BB) — repeats until B = 0.
    pub(crate) fn op_otir_otdr<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        self.block_out(opcode, bus);
        self.repeat_while_b();
    }

    fn block_io_flags(&self) -> u8 {
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8;
        if self.b == 0 { f |= Flag::Z as u8; }
        if (self.b & 0x80) != 0 { f |= Flag::S as u8; }
        f | (self.b & (Flag::X as u8 | Flag::Y as u8))
    }

    fn repeat_while_b(&mut self) {
        if self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
            self.cycles += 21;
        } else {
            self.cycles += 16;
        }
    }
}
