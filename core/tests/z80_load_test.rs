use galena_core::cpu::z80::Z80;
mod common;
use common::{run_one, TestBus};

// ============================================================
// LD r,r'
// ============================================================

#[test]
fn test_ld_r_r() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0x99;
    bus.load(0, &[0x47]); // LD B,A

    let cycles = run_one(&mut cpu, &mut bus);
    assert_eq!(cycles, 4, "register-register load should be 4 T-states");
    assert_eq!(cpu.b, 0x99);
    assert_eq!(cpu.a, 0x99, "source unchanged");
}

#[test]
fn test_ld_r_r_identity() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.d = 0x5A;
    bus.load(0, &[0x52]); // LD D,D

    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.d, 0x5A);
    assert_eq!(cpu.pc, 1);
}

#[test]
fn test_ld_r_mem_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x8000);
    bus.memory[0x8000] = 0x77;
    bus.load(0, &[0x4E, 0x71]); // LD C,(HL); LD (HL),C

    let cycles = run_one(&mut cpu, &mut bus);
    assert_eq!(cycles, 7, "LD r,(HL) should be 7 T-states");
    assert_eq!(cpu.c, 0x77);

    bus.memory[0x8000] = 0;
    let cycles = run_one(&mut cpu, &mut bus);
    assert_eq!(cycles, 7, "LD (HL),r should be 7 T-states");
    assert_eq!(bus.memory[0x8000], 0x77);
}

#[test]
fn test_ld_mhl_n() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x3000);
    bus.load(0, &[0x36, 0xBE]); // LD (HL),0xBE

    let cycles = run_one(&mut cpu, &mut bus);
    assert_eq!(cycles, 10, "LD (HL),n should be 10 T-states");
    assert_eq!(bus.memory[0x3000], 0xBE);
}

// ============================================================
// 16-bit immediate and absolute loads
// ============================================================

#[test]
fn test_ld_rr_nn() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x01, 0x34, 0x12, 0x11, 0x78, 0x56, 0x21, 0xBC, 0x9A, 0x31, 0xF0, 0xDE]);

    let cycles = run_one(&mut cpu, &mut bus);
    assert_eq!(cycles, 10, "LD rr,nn should be 10 T-states");
    assert_eq!(cpu.get_bc(), 0x1234, "operand is little-endian");
    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.get_de(), 0x5678);
    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.get_hl(), 0x9ABC);
    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.sp, 0xDEF0);
}

#[test]
fn test_ld_nn_hl_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0xBEEF);
    bus.load(0, &[0x22, 0x00, 0x40, 0x21, 0x00, 0x00, 0x2A, 0x00, 0x40]);

    let cycles = run_one(&mut cpu, &mut bus); // LD (0x4000),HL
    assert_eq!(cycles, 16, "LD (nn),HL should be 16 T-states");
    assert_eq!(bus.memory[0x4000], 0xEF, "low byte first");
    assert_eq!(bus.memory[0x4001], 0xBE);

    run_one(&mut cpu, &mut bus); // LD HL,0
    assert_eq!(cpu.get_hl(), 0);
    let cycles = run_one(&mut cpu, &mut bus); // LD HL,(0x4000)
    assert_eq!(cycles, 16, "LD HL,(nn) should be 16 T-states");
    assert_eq!(cpu.get_hl(), 0xBEEF);
}

#[test]
fn test_ld_nn_a_and_back() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.a = 0xAB;
    bus.load(0, &[0x32, 0x00, 0x80, 0x3E, 0x00, 0x3A, 0x00, 0x80]);

    let cycles = run_one(&mut cpu, &mut bus); // LD (0x8000),A
    assert_eq!(cycles, 13, "LD (nn),A should be 13 T-states");
    assert_eq!(bus.memory[0x8000], 0xAB);

    run_one(&mut cpu, &mut bus); // LD A,0
    let cycles = run_one(&mut cpu, &mut bus); // LD A,(0x8000)
    assert_eq!(cycles, 13, "LD A,(nn) should be 13 T-states");
    assert_eq!(cpu.a, 0xAB);
}

#[test]
fn test_ld_a_through_bc_de() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_bc(0x2000);
    cpu.set_de(0x2001);
    cpu.a = 0x11;
    bus.load(0, &[0x02, 0x3E, 0x22, 0x12, 0x0A, 0x47, 0x1A]);
    bus.memory[0x2000] = 0;

    run_one(&mut cpu, &mut bus); // LD (BC),A
    assert_eq!(bus.memory[0x2000], 0x11);
    run_one(&mut cpu, &mut bus); // LD A,0x22
    run_one(&mut cpu, &mut bus); // LD (DE),A
    assert_eq!(bus.memory[0x2001], 0x22);
    let cycles = run_one(&mut cpu, &mut bus); // LD A,(BC)
    assert_eq!(cycles, 7, "LD A,(BC) should be 7 T-states");
    assert_eq!(cpu.a, 0x11);
    run_one(&mut cpu, &mut bus); // LD B,A
    run_one(&mut cpu, &mut bus); // LD A,(DE)
    assert_eq!(cpu.a, 0x22);
}

#[test]
fn test_ld_sp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x8F00);
    bus.load(0, &[0xF9]); // LD SP,HL

    let cycles = run_one(&mut cpu, &mut bus);
    assert_eq!(cycles, 6, "LD SP,HL should be 6 T-states");
    assert_eq!(cpu.sp, 0x8F00);
}

// ============================================================
// Exchanges
// ============================================================

#[test]
fn test_ex_af_af() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_af(0x1234);
    cpu.a_prime = 0xAB;
    cpu.f_prime = 0xCD;
    bus.load(0, &[0x08]); // EX AF,AF'

    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.get_af(), 0xABCD);
    assert_eq!(cpu.a_prime, 0x12);
    assert_eq!(cpu.f_prime, 0x34);
}

#[test]
fn test_exx() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_bc(0x1111);
    cpu.set_de(0x2222);
    cpu.set_hl(0x3333);
    cpu.b_prime = 0xAA; cpu.c_prime = 0xBB;
    cpu.d_prime = 0xCC; cpu.e_prime = 0xDD;
    cpu.h_prime = 0xEE; cpu.l_prime = 0xFF;
    bus.load(0, &[0xD9]); // EXX

    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.get_bc(), 0xAABB);
    assert_eq!(cpu.get_de(), 0xCCDD);
    assert_eq!(cpu.get_hl(), 0xEEFF);
    assert_eq!(cpu.b_prime, 0x11, "main bank swapped into the shadow bank");
}

#[test]
fn test_ex_de_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_de(0x1234);
    cpu.set_hl(0x5678);
    bus.load(0, &[0xEB]); // EX DE,HL

    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.get_de(), 0x5678);
    assert_eq!(cpu.get_hl(), 0x1234);
}

#[test]
fn test_ex_de_hl_ignores_prefix() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_de(0x1234);
    cpu.set_hl(0x5678);
    cpu.ix = 0x9999;
    bus.load(0, &[0xDD, 0xEB]); // DD EX DE,HL

    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.get_hl(), 0x1234, "always the true HL");
    assert_eq!(cpu.ix, 0x9999, "IX untouched");
}

#[test]
fn test_ex_sp_hl() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x1234);
    cpu.sp = 0x8000;
    bus.memory[0x8000] = 0x78;
    bus.memory[0x8001] = 0x56;
    bus.load(0, &[0xE3]); // EX (SP),HL

    let cycles = run_one(&mut cpu, &mut bus);
    assert_eq!(cycles, 19, "EX (SP),HL should be 19 T-states");
    assert_eq!(cpu.get_hl(), 0x5678);
    assert_eq!(bus.memory[0x8000], 0x34);
    assert_eq!(bus.memory[0x8001], 0x12);
    assert_eq!(cpu.sp, 0x8000, "SP itself does not move");
}

// ============================================================
// Shadow bank is storage-only
// ============================================================

#[test]
fn test_shadow_bank_never_used_directly() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    cpu.b = 0x01;
    cpu.b_prime = 0x99;
    bus.load(0, &[0x78]); // LD A,B

    run_one(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x01, "operands always come from the main bank");
    assert_eq!(cpu.b_prime, 0x99);
}
