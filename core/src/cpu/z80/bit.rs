use crate::core::Bus;
use crate::cpu::z80::{Flag, Prefix, Z80};

impl Z80 {
    /// Perform a CB rotate/shift operation on a value.
    /// op: 0=RLC, 1=RRC, 2=RL, 3=RR, 4=SLA, 5=SRA, 6=SLL(undoc), 7=SRL.
    /// Flags: S, Z, PV(parity) from the result, C from the shifted-out bit,
    /// H = 0, N = 0.
    fn do_rotate_shift(&mut self, op: u8, val: u8) -> u8 {
        let (result, carry) = match op {
            0 => {
                // RLC: rotate left circular
                let c = (val >> 7) & 1;
                ((val << 1) | c, c)
            }
            1 => {
                // RRC: rotate right circular
                let c = val & 1;
                ((val >> 1) | (c << 7), c)
            }
            2 => {
                // RL: rotate left through carry
                let old_c = if (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
                ((val << 1) | old_c, (val >> 7) & 1)
            }
            3 => {
                // RR: rotate right through carry
                let old_c = if (self.f & Flag::C as u8) != 0 { 0x80 } else { 0 };
                ((val >> 1) | old_c, val & 1)
            }
            4 => {
                // SLA: shift left arithmetic
                (val << 1, (val >> 7) & 1)
            }
            5 => {
                // SRA: shift right arithmetic (preserves sign)
                (((val as i8) >> 1) as u8, val & 1)
            }
            6 => {
                // SLL: shift left logical, bit 0 forced to 1 (undocumented)
                ((val << 1) | 1, (val >> 7) & 1)
            }
            7 => {
                // SRL: shift right logical
                (val >> 1, val & 1)
            }
            _ => unreachable!(),
        };

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        if carry != 0 { f |= Flag::C as u8; }
        // H = 0, N = 0
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;

        result
    }

    /// BIT b: Z = inverted bit, P/V = Z, H = 1, N = 0, S only for a set
    /// bit 7, C preserved. The target is not written.
    fn do_bit(&mut self, bit: u8, val: u8) {
        let set = val & (1 << bit) != 0;
        let mut f = self.f & Flag::C as u8;
        f |= Flag::H as u8;
        if !set {
            f |= Flag::Z as u8 | Flag::PV as u8;
        }
        if bit == 7 && set {
            f |= Flag::S as u8;
        }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    /// Decode and execute a CB-plane opcode: `oo bbb rrr`.
    ///
    /// Plain CB works on registers or (HL). Under DD-CB/FD-CB every form
    /// reads memory at IX/IY+d; a register field other than (HL) receives a
    /// copy of the written result (undocumented store-both), except for BIT,
    /// which writes nothing. The inner register field always names the true
    /// H/L.
    pub(crate) fn execute_cb<B: Bus + ?Sized>(&mut self, op: u8, bus: &mut B) {
        let group = (op >> 6) & 0x03; // 0=rot/shift, 1=BIT, 2=RES, 3=SET
        let yyy = (op >> 3) & 0x07; // shift op or bit number
        let r = op & 0x07;

        if matches!(self.prefix, Prefix::DdCb | Prefix::FdCb) {
            let addr = self.effective_addr(bus);
            let val = bus.read(addr);
            if group == 1 {
                self.do_bit(yyy, val);
                self.cycles += 20;
            } else {
                let result = match group {
                    0 => self.do_rotate_shift(yyy, val),
                    2 => val & !(1 << yyy),
                    3 => val | (1 << yyy),
                    _ => unreachable!(),
                };
                bus.write(addr, result);
                if r != 6 {
                    self.write_reg8_plain(r, result);
                }
                self.cycles += 23;
            }
            return;
        }

        if r == 6 {
            let addr = self.get_hl();
            let val = bus.read(addr);
            match group {
                0 => {
                    let result = self.do_rotate_shift(yyy, val);
                    bus.write(addr, result);
                    self.cycles += 15;
                }
                1 => {
                    self.do_bit(yyy, val);
                    self.cycles += 12;
                }
                2 => {
                    bus.write(addr, val & !(1 << yyy));
                    self.cycles += 15;
                }
                3 => {
                    bus.write(addr, val | (1 << yyy));
                    self.cycles += 15;
                }
                _ => unreachable!(),
            }
        } else {
            let val = self.read_reg8_plain(r);
            match group {
                0 => {
                    let result = self.do_rotate_shift(yyy, val);
                    self.write_reg8_plain(r, result);
                }
                1 => self.do_bit(yyy, val),
                2 => self.write_reg8_plain(r, val & !(1 << yyy)),
                3 => self.write_reg8_plain(r, val | (1 << yyy)),
                _ => unreachable!(),
            }
            self.cycles += 8;
        }
    }

    // --- Accumulator rotates (unprefixed plane) ---
    // All four preserve S, Z and P/V; H = N = 0; C takes the rotated-out bit.

    /// RLCA — 4 T.
    pub(crate) fn op_rlca(&mut self) {
        let carry = self.a >> 7;
        self.a = (self.a << 1) | carry;
        self.f = (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8))
            | carry
            | (self.a & (Flag::X as u8 | Flag::Y as u8));
        self.cycles += 4;
    }

    /// RRCA — 4 T.
    pub(crate) fn op_rrca(&mut self) {
        let carry = self.a & 1;
        self.a = (self.a >> 1) | (carry << 7);
        self.f = (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8))
            | carry
            | (self.a & (Flag::X as u8 | Flag::Y as u8));
        self.cycles += 4;
    }

    /// RLA — 4 T.
    pub(crate) fn op_rla(&mut self) {
        let old_c = self.f & Flag::C as u8;
        let carry = self.a >> 7;
        self.a = (self.a << 1) | old_c;
        self.f = (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8))
            | carry
            | (self.a & (Flag::X as u8 | Flag::Y as u8));
        self.cycles += 4;
    }

    /// RRA — 4 T.
    pub(crate) fn op_rra(&mut self) {
        let old_c = (self.f & Flag::C as u8) << 7;
        let carry = self.a & 1;
        self.a = (self.a >> 1) | old_c;
        self.f = (self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8))
            | carry
            | (self.a & (Flag::X as u8 | Flag::Y as u8));
        self.cycles += 4;
    }

    // --- Nibble rotates through A and (HL) ---

    /// RRD (ED 67) — 18 T. Low nibble of (HL) into A, A's low nibble into
    /// the high nibble of (HL). High nibble of A preserved. S, Z, parity
    /// from the new A; H = N = 0; C unchanged.
    pub(crate) fn op_rrd<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.get_hl();
        let mem = bus.read(addr);
        let a_low = self.a & 0x0F;
        self.a = (self.a & 0xF0) | (mem & 0x0F);
        bus.write(addr, (a_low << 4) | (mem >> 4));
        self.f = self.nibble_rotate_flags();
        self.memptr = addr.wrapping_add(1);
        self.cycles += 18;
    }

    /// RLD (ED 6F) — 18 T. Mirror of RRD: high nibble of (HL) into A, A's
    /// low nibble into the low nibble of (HL).
    pub(crate) fn op_rld<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.get_hl();
        let mem = bus.read(addr);
        let a_low = self.a & 0x0F;
        self.a = (self.a & 0xF0) | (mem >> 4);
        bus.write(addr, (mem << 4) | a_low);
        self.f = self.nibble_rotate_flags();
        self.memptr = addr.wrapping_add(1);
        self.cycles += 18;
    }

    fn nibble_rotate_flags(&self) -> u8 {
        let mut f = self.f & Flag::C as u8;
        if self.a == 0 { f |= Flag::Z as u8; }
        if (self.a & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(self.a) { f |= Flag::PV as u8; }
        f | (self.a & (Flag::X as u8 | Flag::Y as u8))
    }

    /// SLL (HL) (ED 76, undocumented) — 15 T. Shift left with bit 0 forced
    /// to 1; flags as a CB shift-left.
    pub(crate) fn op_sll_mhl<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.get_hl();
        let val = bus.read(addr);
        let result = self.do_rotate_shift(6, val);
        bus.write(addr, result);
        self.cycles += 15;
    }
}
