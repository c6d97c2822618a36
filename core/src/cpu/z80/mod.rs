mod alu;
mod bit;
mod block;
mod branch;
mod load_store;
mod stack;

use crate::core::Bus;
use crate::cpu::state::{CpuStateTrait, Z80State};

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Unused (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Unused (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

/// Prefix decode state.
///
/// A prefix byte does not execute by itself: it moves the CPU into one of
/// these states and charges 4 T-states, and the next fetched byte is decoded
/// against it. `Dd`/`Fd` redirect HL to IX/IY for the following opcode,
/// `Cb`/`Ed` select the secondary opcode planes, and `DdCb`/`FdCb` mark a
/// displacement byte pending before an indexed CB opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prefix {
    None,
    Cb,
    Dd,
    Ed,
    Fd,
    DdCb,
    FdCb,
}

pub struct Z80 {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
    pub sp: u16,
    pub pc: u16,

    // Internal state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub memptr: u16, // Hidden WZ register
    pub halted: bool,

    /// Total T-states executed.
    pub cycles: u64,

    // Prefix handling
    prefix: Prefix,
    pub(crate) displacement: i8,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        Self {
            a: 0,
            f: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            a_prime: 0,
            f_prime: 0,
            b_prime: 0,
            c_prime: 0,
            d_prime: 0,
            e_prime: 0,
            h_prime: 0,
            l_prime: 0,
            ix: 0,
            iy: 0,
            i: 0,
            r: 0,
            sp: 0xFFFF,
            pc: 0x0000,
            iff1: false,
            iff2: false,
            im: 0,
            memptr: 0,
            halted: false,
            cycles: 0,
            prefix: Prefix::None,
            displacement: 0,
        }
    }

    /// Reset to power-on state: all registers zero except SP = 0xFFFF.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Prefix state as observable between steps.
    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    // Helpers for 16-bit register access
    pub fn get_bc(&self) -> u16 { ((self.b as u16) << 8) | self.c as u16 }
    pub fn set_bc(&mut self, val: u16) { self.b = (val >> 8) as u8; self.c = val as u8; }

    pub fn get_de(&self) -> u16 { ((self.d as u16) << 8) | self.e as u16 }
    pub fn set_de(&mut self, val: u16) { self.d = (val >> 8) as u8; self.e = val as u8; }

    pub fn get_hl(&self) -> u16 { ((self.h as u16) << 8) | self.l as u16 }
    pub fn set_hl(&mut self, val: u16) { self.h = (val >> 8) as u8; self.l = val as u8; }

    pub fn get_af(&self) -> u16 { ((self.a as u16) << 8) | self.f as u16 }
    pub fn set_af(&mut self, val: u16) { self.a = (val >> 8) as u8; self.f = val as u8; }

    /// Fetch one byte at PC and advance.
    pub(crate) fn fetch8<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let val = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    /// Fetch a little-endian word at PC and advance.
    pub(crate) fn fetch16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus) as u16;
        let hi = self.fetch8(bus) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn get_parity(val: u8) -> bool {
        val.count_ones() % 2 == 0
    }

    pub(crate) fn index_prefixed(&self) -> bool {
        matches!(self.prefix, Prefix::Dd | Prefix::Fd)
    }

    /// Cycle cost of a memory operand: 7 through HL, 19 through IX+d/IY+d
    /// (the displacement fetch and address computation add 12).
    pub(crate) fn mem_cycles(&self) -> u64 {
        if self.index_prefixed() { 19 } else { 7 }
    }

    // --- Effective HL resolution ---
    //
    // Under DD/FD, an operand that goes through memory via HL becomes
    // IX+d/IY+d (consuming the displacement byte), while H and L as plain
    // registers become the index register halves. The CB plane is the
    // exception: there H and L always mean the true H and L.

    /// Effective address for a memory operand. Consumes the displacement
    /// byte under DD/FD; uses the stored displacement under DD-CB/FD-CB.
    pub(crate) fn effective_addr<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        match self.prefix {
            Prefix::Dd => {
                let d = self.fetch8(bus) as i8;
                let addr = self.ix.wrapping_add(d as i16 as u16);
                self.memptr = addr;
                addr
            }
            Prefix::Fd => {
                let d = self.fetch8(bus) as i8;
                let addr = self.iy.wrapping_add(d as i16 as u16);
                self.memptr = addr;
                addr
            }
            Prefix::DdCb => {
                let addr = self.ix.wrapping_add(self.displacement as i16 as u16);
                self.memptr = addr;
                addr
            }
            Prefix::FdCb => {
                let addr = self.iy.wrapping_add(self.displacement as i16 as u16);
                self.memptr = addr;
                addr
            }
            _ => self.get_hl(),
        }
    }

    /// The pair the current opcode treats as HL: HL, IX or IY.
    pub(crate) fn effective_pair(&self) -> u16 {
        match self.prefix {
            Prefix::Dd => self.ix,
            Prefix::Fd => self.iy,
            _ => self.get_hl(),
        }
    }

    pub(crate) fn set_effective_pair(&mut self, val: u16) {
        match self.prefix {
            Prefix::Dd => self.ix = val,
            Prefix::Fd => self.iy = val,
            _ => self.set_hl(val),
        }
    }

    pub(crate) fn effective_h(&self) -> u8 {
        match self.prefix {
            Prefix::Dd => (self.ix >> 8) as u8, // IXH
            Prefix::Fd => (self.iy >> 8) as u8, // IYH
            _ => self.h,
        }
    }

    pub(crate) fn set_effective_h(&mut self, val: u8) {
        match self.prefix {
            Prefix::Dd => self.ix = (self.ix & 0x00FF) | ((val as u16) << 8),
            Prefix::Fd => self.iy = (self.iy & 0x00FF) | ((val as u16) << 8),
            _ => self.h = val,
        }
    }

    pub(crate) fn effective_l(&self) -> u8 {
        match self.prefix {
            Prefix::Dd => self.ix as u8, // IXL
            Prefix::Fd => self.iy as u8, // IYL
            _ => self.l,
        }
    }

    pub(crate) fn set_effective_l(&mut self, val: u8) {
        match self.prefix {
            Prefix::Dd => self.ix = (self.ix & 0xFF00) | val as u16,
            Prefix::Fd => self.iy = (self.iy & 0xFF00) | val as u16,
            _ => self.l = val,
        }
    }

    /// 8-bit register selected by a 3-bit opcode field, honoring DD/FD
    /// remapping of H and L. Field value 6 is the memory operand and is
    /// handled by the caller.
    pub(crate) fn read_reg8(&self, r: u8) -> u8 {
        match r {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.effective_h(),
            5 => self.effective_l(),
            7 => self.a,
            _ => unreachable!(),
        }
    }

    pub(crate) fn write_reg8(&mut self, r: u8, val: u8) {
        match r {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.set_effective_h(val),
            5 => self.set_effective_l(val),
            7 => self.a = val,
            _ => unreachable!(),
        }
    }

    /// Plain register access used where the index prefix never applies
    /// (the CB plane and mixed memory/register forms of LD r,r').
    pub(crate) fn read_reg8_plain(&self, r: u8) -> u8 {
        match r {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => unreachable!(),
        }
    }

    pub(crate) fn write_reg8_plain(&mut self, r: u8, val: u8) {
        match r {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => unreachable!(),
        }
    }

    /// 16-bit pair selected by a 2-bit opcode field (SP variant).
    pub(crate) fn read_rp(&self, rp: u8) -> u16 {
        match rp {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.effective_pair(),
            3 => self.sp,
            _ => unreachable!(),
        }
    }

    pub(crate) fn write_rp(&mut self, rp: u8, val: u16) {
        match rp {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_effective_pair(val),
            3 => self.sp = val,
            _ => unreachable!(),
        }
    }

    /// 16-bit pair for PUSH/POP (AF in place of SP).
    pub(crate) fn read_rp_af(&self, rp: u8) -> u16 {
        match rp {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.effective_pair(),
            3 => self.get_af(),
            _ => unreachable!(),
        }
    }

    pub(crate) fn write_rp_af(&mut self, rp: u8, val: u16) {
        match rp {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_effective_pair(val),
            3 => self.set_af(val),
            _ => unreachable!(),
        }
    }

    /// Execute one instruction or one prefix byte.
    ///
    /// A pure prefix byte advances PC by one and charges 4 T-states; the
    /// prefix state is then observable until the next step. A halted CPU
    /// does nothing — PC stays one past the HALT opcode and the cycle
    /// counter is frozen.
    pub fn step<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        if self.halted {
            return;
        }

        let opcode = self.fetch8(bus);

        match self.prefix {
            Prefix::None => match opcode {
                0xCB => { self.prefix = Prefix::Cb; self.cycles += 4; }
                0xDD => { self.prefix = Prefix::Dd; self.cycles += 4; }
                0xED => { self.prefix = Prefix::Ed; self.cycles += 4; }
                0xFD => { self.prefix = Prefix::Fd; self.cycles += 4; }
                _ => self.execute_unprefixed(opcode, bus),
            },
            Prefix::Cb => {
                self.execute_cb(opcode, bus);
                self.prefix = Prefix::None;
            }
            Prefix::Ed => {
                self.execute_ed(opcode, bus);
                self.prefix = Prefix::None;
            }
            Prefix::Dd => match opcode {
                0xCB => { self.prefix = Prefix::DdCb; self.cycles += 4; }
                0xDD => { self.cycles += 4; } // re-enter
                0xED => { self.prefix = Prefix::Ed; self.cycles += 4; } // ED wins
                0xFD => { self.prefix = Prefix::Fd; self.cycles += 4; } // override
                _ => {
                    self.execute_unprefixed(opcode, bus);
                    self.prefix = Prefix::None;
                }
            },
            Prefix::Fd => match opcode {
                0xCB => { self.prefix = Prefix::FdCb; self.cycles += 4; }
                0xDD => { self.prefix = Prefix::Dd; self.cycles += 4; }
                0xED => { self.prefix = Prefix::Ed; self.cycles += 4; }
                0xFD => { self.cycles += 4; } // re-enter
                _ => {
                    self.execute_unprefixed(opcode, bus);
                    self.prefix = Prefix::None;
                }
            },
            Prefix::DdCb | Prefix::FdCb => {
                // Layout is DD CB d op: the byte just fetched is the
                // displacement, the CB opcode follows it.
                self.displacement = opcode as i8;
                let cb_opcode = self.fetch8(bus);
                self.execute_cb(cb_opcode, bus);
                self.prefix = Prefix::None;
            }
        }
    }

    /// Step until the cycle counter reaches `target` or the CPU halts.
    pub fn run_until_cycle<B: Bus + ?Sized>(&mut self, bus: &mut B, target: u64) {
        while self.cycles < target && !self.halted {
            self.step(bus);
        }
    }

    fn execute_unprefixed<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        match opcode {
            0x00 => self.cycles += 4, // NOP

            // --- 16-bit loads and arithmetic ---
            0x01 | 0x11 | 0x21 | 0x31 => self.op_ld_rr_nn(opcode, bus),
            0x03 | 0x13 | 0x23 | 0x33 => self.op_inc_rr(opcode),
            0x0B | 0x1B | 0x2B | 0x3B => self.op_dec_rr(opcode),
            0x09 | 0x19 | 0x29 | 0x39 => self.op_add_hl_rr(opcode),
            0x22 => self.op_ld_nn_hl(bus),
            0x2A => self.op_ld_hl_nn_ind(bus),
            0xF9 => self.op_ld_sp_hl(),

            // --- A <-> memory through pairs and absolute addresses ---
            0x02 => self.op_ld_bc_a(bus),
            0x12 => self.op_ld_de_a(bus),
            0x0A => self.op_ld_a_bc(bus),
            0x1A => self.op_ld_a_de(bus),
            0x32 => self.op_ld_nn_a(bus),
            0x3A => self.op_ld_a_nn(bus),

            // --- 8-bit INC/DEC and immediate loads ---
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                self.op_inc_r(opcode, bus)
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                self.op_dec_r(opcode, bus)
            }
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                self.op_ld_r_n(opcode, bus)
            }

            // --- Rotates on A ---
            0x07 => self.op_rlca(),
            0x0F => self.op_rrca(),
            0x17 => self.op_rla(),
            0x1F => self.op_rra(),

            // --- Relative jumps ---
            0x10 => self.op_djnz(bus),
            0x18 => self.op_jr(bus),
            0x20 | 0x28 | 0x30 | 0x38 => self.op_jr_cc(opcode, bus),

            // --- Accumulator / flag housekeeping ---
            0x27 => self.op_daa(),
            0x2F => self.op_cpl(),
            0x37 => self.op_scf(),
            0x3F => self.op_ccf(),

            // --- Exchanges ---
            0x08 => self.op_ex_af_af(),
            0xD9 => self.op_exx(),
            0xEB => self.op_ex_de_hl(),
            0xE3 => self.op_ex_sp_hl(bus),

            // --- 8-bit load matrix and ALU block ---
            0x76 => self.op_halt(),
            0x40..=0x7F => self.op_ld_r_r(opcode, bus),
            0x80..=0xBF => self.op_alu_r(opcode, bus),
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                self.op_alu_n(opcode, bus)
            }

            // --- Jumps, calls, returns ---
            0xC3 => self.op_jp_nn(bus),
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                self.op_jp_cc_nn(opcode, bus)
            }
            0xE9 => self.op_jp_hl(),
            0xCD => self.op_call_nn(bus),
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                self.op_call_cc_nn(opcode, bus)
            }
            0xC9 => self.op_ret(bus),
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                self.op_ret_cc(opcode, bus)
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.op_rst(opcode, bus)
            }

            // --- Stack ---
            0xC5 | 0xD5 | 0xE5 | 0xF5 => self.op_push(opcode, bus),
            0xC1 | 0xD1 | 0xE1 | 0xF1 => self.op_pop(opcode, bus),

            // --- I/O with immediate port ---
            0xD3 => self.op_out_n_a(bus),
            0xDB => self.op_in_a_n(bus),

            // --- Interrupt control ---
            0xF3 => self.op_di(),
            0xFB => self.op_ei(),

            // Prefix bytes are consumed by step() before dispatch.
            0xCB | 0xDD | 0xED | 0xFD => unreachable!(),
        }
    }

    fn execute_ed<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) {
        match opcode {
            // I/O through register C
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                self.op_in_r_c(opcode, bus)
            }
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                self.op_out_c_r(opcode, bus)
            }

            // 16-bit arithmetic on HL
            0x42 | 0x52 | 0x62 | 0x72 => self.op_sbc_hl_rr(opcode),
            0x4A | 0x5A | 0x6A | 0x7A => self.op_adc_hl_rr(opcode),

            // 16-bit absolute load/store
            0x43 | 0x53 | 0x63 | 0x73 => self.op_ld_nn_rr_ed(opcode, bus),
            0x4B | 0x5B | 0x6B | 0x7B => self.op_ld_rr_nn_ed(opcode, bus),

            // NEG occupies every 0x?4/0x?C slot in the 0x40-0x7F quadrant
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => self.op_neg(),

            0x45 => self.op_retn(bus),
            0x4D => self.op_reti(bus),

            0x46 => self.op_im(0),
            0x56 => self.op_im(1),
            0x5E => self.op_im(2),

            // I/R register transfers
            0x47 => self.op_ld_i_a(),
            0x4F => self.op_ld_r_a(),
            0x57 => self.op_ld_a_i(),
            0x5F => self.op_ld_a_r(),

            // Nibble rotates
            0x67 => self.op_rrd(bus),
            0x6F => self.op_rld(bus),

            // Undocumented SLL (HL)
            0x76 => self.op_sll_mhl(bus),

            // Block transfer / compare / I/O
            0xA0 | 0xA8 => self.op_ldi_ldd(opcode, bus),
            0xB0 | 0xB8 => self.op_ldir_lddr(opcode, bus),
            0xA1 | 0xA9 => self.op_cpi_cpd(opcode, bus),
            0xB1 | 0xB9 => self.op_cpir_cpdr(opcode, bus),
            0xA2 | 0xAA => self.op_ini_ind(opcode, bus),
            0xB2 | 0xBA => self.op_inir_indr(opcode, bus),
            0xA3 | 0xAB => self.op_outi_outd(opcode, bus),
            0xB3 | 0xBB => self.op_otir_otdr(opcode, bus),

            // Everything else in the ED plane is an 8-cycle NOP.
            _ => self.cycles += 8,
        }
    }

    fn op_halt(&mut self) {
        self.halted = true;
        self.cycles += 4;
    }

    fn op_di(&mut self) {
        self.iff1 = false;
        self.iff2 = false;
        self.cycles += 4;
    }

    fn op_ei(&mut self) {
        self.iff1 = true;
        self.iff2 = true;
        self.cycles += 4;
    }

    fn op_im(&mut self, mode: u8) {
        self.im = mode;
        self.cycles += 8;
    }
}

impl CpuStateTrait for Z80 {
    type Snapshot = Z80State;

    fn snapshot(&self) -> Z80State {
        Z80State {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            b_prime: self.b_prime,
            c_prime: self.c_prime,
            d_prime: self.d_prime,
            e_prime: self.e_prime,
            h_prime: self.h_prime,
            l_prime: self.l_prime,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            memptr: self.memptr,
            halted: self.halted,
            cycles: self.cycles,
        }
    }
}
