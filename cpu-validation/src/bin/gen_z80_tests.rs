//! Generate single-step regression vectors for the Z80 core.
//!
//! For every instruction in the table below, this runs a batch of randomized
//! initial states through the core and records the resulting state as a JSON
//! test case. The vectors pin today's behavior so later refactors can be
//! checked against them with the replay test.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use galena_core::cpu::z80::Z80;
use galena_cpu_validation::{
    apply_state, capture_state, step_instruction, BusOp, TracingBus, Z80CpuState, Z80TestCase,
};
use rand::Rng;

const NUM_TESTS: usize = 200;

struct InstrDef {
    /// Prefix bytes emitted before the opcode (empty, ED, DD, FD, DD CB...).
    prefix: &'static [u8],
    opcode: u8,
    /// Operand bytes following the opcode, filled with random data.
    operands: u8,
    /// DD CB / FD CB layout: displacement byte sits between prefix and opcode.
    index_cb: bool,
}

impl InstrDef {
    fn file_stem(&self) -> String {
        let mut stem = String::new();
        for b in self.prefix {
            stem.push_str(&format!("{:02x}", b));
        }
        stem.push_str(&format!("{:02x}", self.opcode));
        stem
    }
}

fn all_instructions() -> Vec<InstrDef> {
    let mut v = Vec::new();

    let mut add = |prefix: &'static [u8], opcodes: &[u8], operands: u8, index_cb: bool| {
        for &op in opcodes {
            v.push(InstrDef { prefix, opcode: op, operands, index_cb });
        }
    };

    // ============================================================
    // Unprefixed plane
    // ============================================================

    // 8-bit register loads and ALU (register forms)
    add(&[], &[0x41, 0x57, 0x6C, 0x7D], 0, false); // LD r,r'
    add(&[], &[0x80, 0x89, 0x92, 0x9B, 0xA4, 0xAD, 0xB7, 0xB8], 0, false);
    add(&[], &[0x86, 0x8E, 0x96, 0x9E, 0xA6, 0xAE, 0xB6, 0xBE], 0, false); // ALU (HL)
    add(&[], &[0xC6, 0xCE, 0xD6, 0xDE, 0xE6, 0xEE, 0xF6, 0xFE], 1, false); // ALU n

    // INC/DEC, immediate loads
    add(&[], &[0x04, 0x0D, 0x24, 0x2D, 0x34, 0x35, 0x3C, 0x3D], 0, false);
    add(&[], &[0x06, 0x0E, 0x26, 0x2E, 0x3E], 1, false);
    add(&[], &[0x36], 1, false); // LD (HL),n

    // 16-bit loads and arithmetic
    add(&[], &[0x01, 0x11, 0x21, 0x31], 2, false);
    add(&[], &[0x03, 0x0B, 0x13, 0x1B, 0x23, 0x2B, 0x33, 0x3B], 0, false);
    add(&[], &[0x09, 0x19, 0x29, 0x39], 0, false);
    add(&[], &[0x22, 0x2A, 0x32, 0x3A], 2, false);
    add(&[], &[0xF9], 0, false);

    // Rotates, flag ops, DAA
    add(&[], &[0x07, 0x0F, 0x17, 0x1F, 0x27, 0x2F, 0x37, 0x3F], 0, false);

    // Exchanges and stack
    add(&[], &[0x08, 0xD9, 0xEB, 0xE3], 0, false);
    add(&[], &[0xC1, 0xC5, 0xD1, 0xD5, 0xE1, 0xE5, 0xF1, 0xF5], 0, false);

    // Jumps, calls, returns
    add(&[], &[0x10, 0x18, 0x20, 0x28, 0x30, 0x38], 1, false);
    add(&[], &[0xC3, 0xC2, 0xCA, 0xD2, 0xDA, 0xE2, 0xEA, 0xF2, 0xFA], 2, false);
    add(&[], &[0xCD, 0xC4, 0xCC, 0xD4, 0xDC, 0xE4, 0xEC, 0xF4, 0xFC], 2, false);
    add(&[], &[0xC9, 0xC0, 0xC8, 0xD0, 0xD8, 0xE0, 0xE8, 0xF0, 0xF8], 0, false);
    add(&[], &[0xC7, 0xD7, 0xE7, 0xFF], 0, false);
    add(&[], &[0xE9], 0, false);

    // I/O and interrupt control
    add(&[], &[0xD3, 0xDB], 1, false);
    add(&[], &[0xF3, 0xFB, 0x00], 0, false);

    // ============================================================
    // CB plane
    // ============================================================

    add(&[0xCB], &[0x00, 0x0A, 0x14, 0x1D, 0x27, 0x28, 0x33, 0x3F], 0, false);
    add(&[0xCB], &[0x06, 0x16, 0x26, 0x3E], 0, false); // shifts on (HL)
    add(&[0xCB], &[0x40, 0x5A, 0x7F, 0x46, 0x7E], 0, false); // BIT
    add(&[0xCB], &[0x80, 0x9E, 0xC1, 0xFE], 0, false); // RES/SET

    // ============================================================
    // ED plane
    // ============================================================

    add(&[0xED], &[0x42, 0x4A, 0x52, 0x5A, 0x62, 0x6A, 0x72, 0x7A], 0, false);
    add(&[0xED], &[0x43, 0x4B, 0x53, 0x5B, 0x63, 0x6B, 0x73, 0x7B], 2, false);
    add(&[0xED], &[0x44, 0x4C, 0x74], 0, false); // NEG aliases
    add(&[0xED], &[0x45, 0x4D], 0, false); // RETN/RETI
    add(&[0xED], &[0x46, 0x56, 0x5E], 0, false); // IM
    add(&[0xED], &[0x47, 0x4F, 0x57, 0x5F], 0, false); // I/R transfers
    add(&[0xED], &[0x67, 0x6F, 0x76], 0, false); // RRD/RLD/SLL (HL)
    add(&[0xED], &[0x40, 0x48, 0x70, 0x78, 0x41, 0x51, 0x71, 0x79], 0, false);
    add(&[0xED], &[0xA0, 0xA1, 0xA2, 0xA3, 0xA8, 0xA9, 0xAA, 0xAB], 0, false);
    add(&[0xED], &[0xB0, 0xB1, 0xB8, 0xB9, 0xB2, 0xB3, 0xBA, 0xBB], 0, false);
    add(&[0xED], &[0x77], 0, false); // an ED-NOP slot

    // ============================================================
    // DD/FD planes (IX/IY)
    // ============================================================

    add(&[0xDD], &[0x21, 0x22, 0x2A], 2, false);
    add(&[0xDD], &[0x23, 0x2B, 0x09, 0x29, 0xE1, 0xE5, 0xE3, 0xE9, 0xF9], 0, false);
    add(&[0xDD], &[0x46, 0x70, 0x86, 0x96, 0xBE, 0x34, 0x35], 1, false); // (IX+d)
    add(&[0xDD], &[0x36], 2, false); // LD (IX+d),n
    add(&[0xDD], &[0x44, 0x65, 0x7C, 0x7D, 0x26, 0x2E], 0, false); // IXH/IXL forms
    add(&[0xFD], &[0x21, 0x09, 0x46, 0x77, 0x7C], 1, false);
    add(&[0xDD, 0xCB], &[0x06, 0x05, 0x4E, 0x47, 0x86, 0xC6, 0xCF], 0, true);
    add(&[0xFD, 0xCB], &[0x0E, 0x7E, 0x96, 0xD7], 0, true);

    v
}

fn random_state(rng: &mut impl Rng) -> Z80CpuState {
    Z80CpuState {
        a: rng.gen(),
        f: rng.gen(),
        b: rng.gen(),
        c: rng.gen(),
        d: rng.gen(),
        e: rng.gen(),
        h: rng.gen(),
        l: rng.gen(),
        i: rng.gen(),
        r: rng.gen(),
        af_prime: rng.gen(),
        bc_prime: rng.gen(),
        de_prime: rng.gen(),
        hl_prime: rng.gen(),
        ix: rng.gen(),
        iy: rng.gen(),
        sp: rng.gen(),
        // Keep the instruction clear of the address-space wraparound.
        pc: rng.gen_range(0x0100..0xFF00),
        wz: rng.gen(),
        iff1: rng.gen_range(0..2),
        iff2: rng.gen_range(0..2),
        im: rng.gen_range(0..3),
        halted: 0,
        ram: Vec::new(),
    }
}

fn generate_for(def: &InstrDef, rng: &mut impl Rng) -> Vec<Z80TestCase> {
    let mut cases = Vec::with_capacity(NUM_TESTS);

    for n in 0..NUM_TESTS {
        let mut cpu = Z80::new();
        let mut bus = TracingBus::new();

        for byte in bus.memory.iter_mut() {
            *byte = rng.gen();
        }
        for port in bus.ports.iter_mut() {
            *port = rng.gen();
        }

        let mut initial = random_state(rng);
        apply_state(&mut cpu, &initial);

        // Lay down the instruction bytes at PC.
        let mut addr = initial.pc;
        let put = |bus: &mut TracingBus, b: u8, addr: &mut u16| {
            bus.memory[*addr as usize] = b;
            *addr = addr.wrapping_add(1);
        };
        for &b in def.prefix {
            put(&mut bus, b, &mut addr);
        }
        if def.index_cb {
            put(&mut bus, rng.gen(), &mut addr); // displacement
        }
        put(&mut bus, def.opcode, &mut addr);
        for _ in 0..def.operands {
            put(&mut bus, rng.gen(), &mut addr);
        }

        let memory_before = bus.memory.clone();
        let ports_before = bus.ports;

        step_instruction(&mut cpu, &mut bus);

        // Every address the instruction touched, plus the opcode bytes.
        let mut touched: BTreeSet<u16> = bus.cycles.iter()
            .filter(|c| matches!(c.op, BusOp::Read | BusOp::Write))
            .map(|c| c.addr)
            .collect();
        for offset in 0..(def.prefix.len() as u16 + 1 + def.operands as u16 + def.index_cb as u16) {
            touched.insert(initial.pc.wrapping_add(offset));
        }
        let touched: Vec<u16> = touched.into_iter().collect();

        initial.ram = touched.iter().map(|&a| (a, memory_before[a as usize])).collect();
        let ports: Vec<(u8, u8)> = bus.cycles.iter()
            .filter(|c| c.op == BusOp::IoRead)
            .map(|c| (c.addr as u8, ports_before[c.addr as usize & 0xFF]))
            .collect();

        let final_state = capture_state(&cpu, &bus, &touched);

        cases.push(Z80TestCase {
            name: format!("{} #{:04}", def.file_stem(), n),
            initial,
            final_state,
            cycles: cpu.cycles,
            ports,
        });
    }

    cases
}

fn main() {
    let out_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/generated".to_string());
    let out_dir = Path::new(&out_dir);
    fs::create_dir_all(out_dir).expect("create output directory");

    let mut rng = rand::thread_rng();
    let defs = all_instructions();

    for def in &defs {
        let cases = generate_for(def, &mut rng);
        let json = serde_json::to_string_pretty(&cases).expect("serialize cases");
        let path = out_dir.join(format!("{}.json", def.file_stem()));
        fs::write(&path, json).unwrap_or_else(|e| panic!("write {:?}: {}", path, e));
    }

    println!(
        "wrote {} vector files ({} cases each) to {}",
        defs.len(),
        NUM_TESTS,
        out_dir.display()
    );
}
