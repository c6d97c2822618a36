use crate::core::Bus;
use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    /// LD r,r' — 4 T; LD r,(HL) / LD (HL),r — 7 T; indexed forms — 19 T.
    /// Opcode mask: 01 dst src
    ///
    /// In the mixed forms the register side always names the true H/L:
    /// DD 66 is LD H,(IX+d), not LD IXH,(IX+d).
    pub(crate) fn op_ld_r_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let dst = (opcode >> 3) & 0x07;
        let src = opcode & 0x07;

        if src == 6 {
            let addr = self.effective_addr(bus);
            let val = bus.read(addr);
            self.write_reg8_plain(dst, val);
            self.cycles += self.mem_cycles();
        } else if dst == 6 {
            let val = self.read_reg8_plain(src);
            let addr = self.effective_addr(bus);
            bus.write(addr, val);
            self.cycles += self.mem_cycles();
        } else {
            let val = self.read_reg8(src);
            self.write_reg8(dst, val);
            self.cycles += 4;
        }
    }

    /// LD r,n — 7 T; LD (HL),n — 10 T; LD (IX+d),n — 22 T.
    /// Opcode mask: 00 rrr 110
    pub(crate) fn op_ld_r_n<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let r = (opcode >> 3) & 0x07;
        if r == 6 {
            // Displacement precedes the immediate in the byte stream.
            let addr = self.effective_addr(bus);
            let val = self.fetch8(bus);
            bus.write(addr, val);
            self.cycles += self.mem_cycles() + 3;
        } else {
            let val = self.fetch8(bus);
            self.write_reg8(r, val);
            self.cycles += 7;
        }
    }

    /// LD rr,nn — 10 T.
    /// Opcode mask: 00 rr0 001 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=SP)
    pub(crate) fn op_ld_rr_nn<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let rp = (opcode >> 4) & 0x03;
        let val = self.fetch16(bus);
        self.write_rp(rp, val);
        self.cycles += 10;
    }

    /// LD A,(BC) — 7 T.
    pub(crate) fn op_ld_a_bc<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.get_bc();
        self.a = bus.read(addr);
        self.memptr = addr.wrapping_add(1);
        self.cycles += 7;
    }

    /// LD A,(DE) — 7 T.
    pub(crate) fn op_ld_a_de<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.get_de();
        self.a = bus.read(addr);
        self.memptr = addr.wrapping_add(1);
        self.cycles += 7;
    }

    /// LD (BC),A — 7 T.
    pub(crate) fn op_ld_bc_a<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.get_bc();
        bus.write(addr, self.a);
        self.memptr = ((self.a as u16) << 8) | (addr.wrapping_add(1) & 0xFF);
        self.cycles += 7;
    }

    /// LD (DE),A — 7 T.
    pub(crate) fn op_ld_de_a<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.get_de();
        bus.write(addr, self.a);
        self.memptr = ((self.a as u16) << 8) | (addr.wrapping_add(1) & 0xFF);
        self.cycles += 7;
    }

    /// LD A,(nn) — 13 T.
    pub(crate) fn op_ld_a_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch16(bus);
        self.a = bus.read(addr);
        self.memptr = addr.wrapping_add(1);
        self.cycles += 13;
    }

    /// LD (nn),A — 13 T.
    pub(crate) fn op_ld_nn_a<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch16(bus);
        bus.write(addr, self.a);
        self.memptr = ((self.a as u16) << 8) | (addr.wrapping_add(1) & 0xFF);
        self.cycles += 13;
    }

    /// LD (nn),HL — 16 T, little-endian. HL follows the prefix.
    pub(crate) fn op_ld_nn_hl<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch16(bus);
        let val = self.effective_pair();
        bus.write(addr, val as u8);
        bus.write(addr.wrapping_add(1), (val >> 8) as u8);
        self.memptr = addr.wrapping_add(1);
        self.cycles += 16;
    }

    /// LD HL,(nn) — 16 T, little-endian. HL follows the prefix.
    pub(crate) fn op_ld_hl_nn_ind<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.fetch16(bus);
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        self.set_effective_pair((hi << 8) | lo);
        self.memptr = addr.wrapping_add(1);
        self.cycles += 16;
    }

    /// LD SP,HL — 6 T. HL follows the prefix.
    pub(crate) fn op_ld_sp_hl(&mut self) {
        self.sp = self.effective_pair();
        self.cycles += 6;
    }

    // --- Exchanges ---

    /// EX AF,AF' — 4 T.
    pub(crate) fn op_ex_af_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
        self.cycles += 4;
    }

    /// EXX — 4 T.
    pub(crate) fn op_exx(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
        self.cycles += 4;
    }

    /// EX DE,HL — 4 T. Always exchanges with the true HL, prefix or not.
    pub(crate) fn op_ex_de_hl(&mut self) {
        std::mem::swap(&mut self.d, &mut self.h);
        std::mem::swap(&mut self.e, &mut self.l);
        self.cycles += 4;
    }

    /// EX (SP),HL — 19 T. HL follows the prefix.
    pub(crate) fn op_ex_sp_hl<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let lo = bus.read(self.sp) as u16;
        let hi = bus.read(self.sp.wrapping_add(1)) as u16;
        let val = self.effective_pair();
        bus.write(self.sp, val as u8);
        bus.write(self.sp.wrapping_add(1), (val >> 8) as u8);
        let stacked = (hi << 8) | lo;
        self.set_effective_pair(stacked);
        self.memptr = stacked;
        self.cycles += 19;
    }

    // --- ED-plane register transfers ---

    /// LD I,A — 9 T.
    pub(crate) fn op_ld_i_a(&mut self) {
        self.i = self.a;
        self.cycles += 9;
    }

    /// LD R,A — 9 T.
    pub(crate) fn op_ld_r_a(&mut self) {
        self.r = self.a;
        self.cycles += 9;
    }

    /// LD A,I — 9 T. S and Z from the loaded value, H = N = 0, P/V = IFF2,
    /// C preserved.
    pub(crate) fn op_ld_a_i(&mut self) {
        self.a = self.i;
        self.f = self.iff_load_flags(self.a);
        self.cycles += 9;
    }

    /// LD A,R — 9 T. Same flag rule as LD A,I.
    pub(crate) fn op_ld_a_r(&mut self) {
        self.a = self.r;
        self.f = self.iff_load_flags(self.a);
        self.cycles += 9;
    }

    fn iff_load_flags(&self, val: u8) -> u8 {
        let mut f = self.f & Flag::C as u8;
        if val == 0 { f |= Flag::Z as u8; }
        if (val & 0x80) != 0 { f |= Flag::S as u8; }
        if self.iff2 { f |= Flag::PV as u8; }
        f | (val & (Flag::X as u8 | Flag::Y as u8))
    }

    /// LD (nn),rr (ED plane) — 20 T, little-endian.
    /// Opcode mask: 01 rr0 011
    pub(crate) fn op_ld_nn_rr_ed<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let rp = (opcode >> 4) & 0x03;
        let addr = self.fetch16(bus);
        let val = self.read_rp(rp);
        bus.write(addr, val as u8);
        bus.write(addr.wrapping_add(1), (val >> 8) as u8);
        self.memptr = addr.wrapping_add(1);
        self.cycles += 20;
    }

    /// LD rr,(nn) (ED plane) — 20 T, little-endian.
    /// Opcode mask: 01 rr1 011
    pub(crate) fn op_ld_rr_nn_ed<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let rp = (opcode >> 4) & 0x03;
        let addr = self.fetch16(bus);
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        self.write_rp(rp, (hi << 8) | lo);
        self.memptr = addr.wrapping_add(1);
        self.cycles += 20;
    }

    // --- I/O ---

    /// OUT (n),A — 11 T.
    pub(crate) fn op_out_n_a<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let port = self.fetch8(bus);
        bus.io_write(port, self.a);
        self.cycles += 11;
    }

    /// IN A,(n) — 11 T, no flags.
    pub(crate) fn op_in_a_n<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let port = self.fetch8(bus);
        self.a = bus.io_read(port);
        self.cycles += 11;
    }

    /// IN r,(C) — 12 T. S, Z and parity from the byte read, H = N = 0, C
    /// preserved. r = 6 is the flag-only form IN (C).
    pub(crate) fn op_in_r_c<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let val = bus.io_read(self.c);
        let r = (opcode >> 3) & 0x07;
        if r != 6 {
            self.write_reg8_plain(r, val);
        }

        let mut f = self.f & Flag::C as u8;
        if val == 0 { f |= Flag::Z as u8; }
        if (val & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(val) { f |= Flag::PV as u8; }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;

        self.memptr = self.get_bc().wrapping_add(1);
        self.cycles += 12;
    }

    /// OUT (C),r — 12 T, no flags. r = 6 is the undocumented OUT (C),0.
    pub(crate) fn op_out_c_r<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        let r = (opcode >> 3) & 0x07;
        let val = if r == 6 { 0 } else { self.read_reg8_plain(r) };
        bus.io_write(self.c, val);
        self.memptr = self.get_bc().wrapping_add(1);
        self.cycles += 12;
    }
}
