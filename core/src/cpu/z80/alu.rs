use crate::core::Bus;
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    // --- Flag helpers ---

    fn update_flags_logic(&mut self, result: u8, is_and: bool) {
        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        if is_and { f |= Flag::H as u8; } // AND sets H, XOR/OR clear it
        // N = 0, C = 0
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    /// ADD/ADC: half-carry from bit 3, signed overflow into P/V, carry
    /// from bit 7.
    fn do_add(&mut self, val: u8, with_carry: bool) {
        let a = self.a;
        let c = if with_carry && (self.f & Flag::C as u8) != 0 { 1u8 } else { 0 };
        let wide = (a as u16) + (val as u16) + (c as u16);
        let result = wide as u8;

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0x0F) + (val & 0x0F) + c > 0x0F { f |= Flag::H as u8; }
        if ((a ^ result) & (val ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if wide > 0xFF { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
    }

    /// SUB/SBC: half-borrow from bit 4, signed overflow into P/V, borrow
    /// into C.
    fn do_sub(&mut self, val: u8, with_carry: bool) {
        let a = self.a;
        let c = if with_carry && (self.f & Flag::C as u8) != 0 { 1u8 } else { 0 };
        let wide = (a as u16).wrapping_sub(val as u16).wrapping_sub(c as u16);
        let result = wide as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0x0F) < (val & 0x0F) + c { f |= Flag::H as u8; }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if wide > 0xFF { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
    }

    /// CP is SUB with the result discarded; bits 3/5 of F come from the
    /// operand rather than the result.
    fn do_cp(&mut self, val: u8) {
        let a = self.a;
        self.do_sub(val, false);
        self.a = a;
        self.f = (self.f & !(Flag::X as u8 | Flag::Y as u8))
            | (val & (Flag::X as u8 | Flag::Y as u8));
    }

    /// INC leaves C untouched; P/V flags the 0x7F -> 0x80 transition.
    fn do_inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = self.f & Flag::C as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0x0F) == 0x0F { f |= Flag::H as u8; }
        if val == 0x7F { f |= Flag::PV as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        result
    }

    /// DEC leaves C untouched; P/V flags the 0x80 -> 0x7F transition.
    fn do_dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0x0F) == 0 { f |= Flag::H as u8; }
        if val == 0x80 { f |= Flag::PV as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        result
    }

    fn alu_dispatch(&mut self, op: u8, val: u8) {
        match op {
            0 => self.do_add(val, false),          // ADD
            1 => self.do_add(val, true),           // ADC
            2 => self.do_sub(val, false),          // SUB
            3 => self.do_sub(val, true),           // SBC
            4 => { let r = self.a & val; self.a = r; self.update_flags_logic(r, true) }
            5 => { let r = self.a ^ val; self.a = r; self.update_flags_logic(r, false) }
            6 => { let r = self.a | val; self.a = r; self.update_flags_logic(r, false) }
            7 => self.do_cp(val),                  // CP
            _ => unreachable!(),
        }
    }

    // --- 8-bit arithmetic/logic group (0x80-0xBF) ---

    /// ADD/ADC/SUB/SBC/AND/XOR/OR/CP A,r — 4 T register, 7 T through (HL),
    /// 19 T through (IX+d)/(IY+d).
    /// Opcode mask: 10 ooo rrr
    pub(crate) fn op_alu_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let src = opcode & 0x07;
        let val = if src == 6 {
            let addr = self.effective_addr(bus);
            self.cycles += self.mem_cycles();
            bus.read(addr)
        } else {
            self.cycles += 4;
            self.read_reg8(src)
        };
        self.alu_dispatch((opcode >> 3) & 0x07, val);
    }

    /// Same operations against an 8-bit immediate — 7 T.
    pub(crate) fn op_alu_n<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let val = self.fetch8(bus);
        self.alu_dispatch((opcode >> 3) & 0x07, val);
        self.cycles += 7;
    }

    /// INC r — 4 T; INC (HL) — 11 T; INC (IX+d) — 23 T.
    /// Opcode mask: 00 rrr 100
    pub(crate) fn op_inc_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            let addr = self.effective_addr(bus);
            let val = bus.read(addr);
            let result = self.do_inc(val);
            bus.write(addr, result);
            self.cycles += if self.index_prefixed() { 23 } else { 11 };
        } else {
            let result = self.do_inc(self.read_reg8(r));
            self.write_reg8(r, result);
            self.cycles += 4;
        }
    }

    /// DEC r — 4 T; DEC (HL) — 11 T; DEC (IX+d) — 23 T.
    /// Opcode mask: 00 rrr 101
    pub(crate) fn op_dec_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            let addr = self.effective_addr(bus);
            let val = bus.read(addr);
            let result = self.do_dec(val);
            bus.write(addr, result);
            self.cycles += if self.index_prefixed() { 23 } else { 11 };
        } else {
            let result = self.do_dec(self.read_reg8(r));
            self.write_reg8(r, result);
            self.cycles += 4;
        }
    }

    // --- 16-bit arithmetic ---

    /// INC rr — 6 T, no flags.
    pub(crate) fn op_inc_rr(&mut self, opcode: u8) {
        let rp = (opcode >> 4) & 0x03;
        let val = self.read_rp(rp).wrapping_add(1);
        self.write_rp(rp, val);
        self.cycles += 6;
    }

    /// DEC rr — 6 T, no flags.
    pub(crate) fn op_dec_rr(&mut self, opcode: u8) {
        let rp = (opcode >> 4) & 0x03;
        let val = self.read_rp(rp).wrapping_sub(1);
        self.write_rp(rp, val);
        self.cycles += 6;
    }

    /// ADD HL,rr — 11 T (15 T as ADD IX,rr / ADD IY,rr).
    /// C from bit 15, H from bit 11, N = 0; S, Z, P/V preserved.
    pub(crate) fn op_add_hl_rr(&mut self, opcode: u8) {
        let rp = (opcode >> 4) & 0x03;
        let hl = self.effective_pair();
        let rr = self.read_rp(rp);
        let wide = (hl as u32) + (rr as u32);
        let result = wide as u16;
        self.memptr = hl.wrapping_add(1);

        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if ((hl & 0x0FFF) + (rr & 0x0FFF)) & 0x1000 != 0 { f |= Flag::H as u8; }
        if wide & 0x1_0000 != 0 { f |= Flag::C as u8; }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;

        self.set_effective_pair(result);
        self.cycles += if self.index_prefixed() { 15 } else { 11 };
    }

    /// SBC HL,rr (ED plane) — 15 T. Full 16-bit flag derivation: S and Z
    /// from the result, H from bit 11 borrow, P/V from signed overflow at
    /// bit 15, C from bit 16.
    pub(crate) fn op_sbc_hl_rr(&mut self, opcode: u8) {
        let rr = self.read_rp((opcode >> 4) & 0x03);
        let hl = self.get_hl();
        let c = if (self.f & Flag::C as u8) != 0 { 1u16 } else { 0 };
        let wide = (hl as u32).wrapping_sub(rr as u32).wrapping_sub(c as u32);
        let result = wide as u16;
        self.memptr = hl.wrapping_add(1);

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x8000) != 0 { f |= Flag::S as u8; }
        if (hl & 0x0FFF) < (rr & 0x0FFF) + c { f |= Flag::H as u8; }
        if ((hl ^ rr) & (hl ^ result) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if wide > 0xFFFF { f |= Flag::C as u8; }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;

        self.set_hl(result);
        self.cycles += 15;
    }

    /// ADC HL,rr (ED plane) — 15 T. Full 16-bit flag derivation.
    pub(crate) fn op_adc_hl_rr(&mut self, opcode: u8) {
        let rr = self.read_rp((opcode >> 4) & 0x03);
        let hl = self.get_hl();
        let c = if (self.f & Flag::C as u8) != 0 { 1u16 } else { 0 };
        let wide = (hl as u32) + (rr as u32) + (c as u32);
        let result = wide as u16;
        self.memptr = hl.wrapping_add(1);

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x8000) != 0 { f |= Flag::S as u8; }
        if ((hl & 0x0FFF) + (rr & 0x0FFF) + c) & 0x1000 != 0 { f |= Flag::H as u8; }
        if (!(hl ^ rr) & (hl ^ result) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if wide > 0xFFFF { f |= Flag::C as u8; }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;

        self.set_hl(result);
        self.cycles += 15;
    }

    // --- Accumulator housekeeping ---

    /// NEG (ED, eight aliases) — 8 T. A <- 0 - A; C set unless A was 0,
    /// P/V set only for A = 0x80.
    pub(crate) fn op_neg(&mut self) {
        let old = self.a;
        let result = 0u8.wrapping_sub(old);

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (old & 0x0F) != 0 { f |= Flag::H as u8; }
        if old == 0x80 { f |= Flag::PV as u8; }
        if old != 0 { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
        self.cycles += 8;
    }

    /// DAA — 4 T. BCD correction steered by N, C and H from the preceding
    /// operation: +/-0x06 for a dirty low nibble, +/-0x60 (setting C) for a
    /// dirty high nibble. N is left as found.
    pub(crate) fn op_daa(&mut self) {
        let a = self.a;
        let n = (self.f & Flag::N as u8) != 0;
        let mut carry = (self.f & Flag::C as u8) != 0;

        let mut correction = 0u8;
        if (a & 0x0F) > 9 || (self.f & Flag::H as u8) != 0 {
            correction |= 0x06;
        }
        if a > 0x99 || carry {
            correction |= 0x60;
            carry = true;
        }

        let result = if n { a.wrapping_sub(correction) } else { a.wrapping_add(correction) };

        let mut f = self.f & Flag::N as u8;
        if carry { f |= Flag::C as u8; }
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        let half = if n {
            (a & 0x0F) < (correction & 0x0F)
        } else {
            (a & 0x0F) > 9
        };
        if half { f |= Flag::H as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
        self.cycles += 4;
    }

    /// CPL — 4 T. A <- !A; H = N = 1, other flags preserved.
    pub(crate) fn op_cpl(&mut self) {
        self.a = !self.a;
        self.f = (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8))
            | Flag::H as u8
            | Flag::N as u8
            | (self.a & (Flag::X as u8 | Flag::Y as u8));
        self.cycles += 4;
    }

    /// SCF — 4 T. C = 1, H = N = 0; S, Z, P/V preserved.
    pub(crate) fn op_scf(&mut self) {
        self.f = (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8))
            | Flag::C as u8
            | (self.a & (Flag::X as u8 | Flag::Y as u8));
        self.cycles += 4;
    }

    /// CCF — 4 T. C inverted, old C copied into H, N = 0.
    pub(crate) fn op_ccf(&mut self) {
        let old_c = (self.f & Flag::C as u8) != 0;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if old_c { f |= Flag::H as u8; } else { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.cycles += 4;
    }
}
