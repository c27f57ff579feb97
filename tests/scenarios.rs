//! End-to-end pipeline scenarios, mirroring
//! `original_source/tests/test-cpu.cpp` exactly (same opcodes, same
//! expected register/flag state).

use arm_m0_emulator::emulator::PC_INIT_ADDRESS;
use arm_m0_emulator::Emulator;

fn emulator_with_code(code: &[(u32, u16)]) -> Emulator {
    let mut emu = Emulator::new(4096, 4096);
    emu.mmu.write32(PC_INIT_ADDRESS, 0x58);
    for &(addr, word) in code {
        emu.mmu.write16(addr, word);
    }
    emu.reset();
    emu
}

#[test]
fn mov_add() {
    let mut emu = emulator_with_code(&[
        (0x58, 0x200C), // MOV R0, #12
        (0x5A, 0x2101), // MOV R1, #1
        (0x5C, 0x1840), // ADD R0, R1, R0
    ]);
    emu.run_n(3).unwrap();
    assert_eq!(emu.registers.get(0), 13);
    assert_eq!(emu.registers.get(1), 1);
    assert!(!emu.psr.n);
    assert!(!emu.psr.z);
    assert!(!emu.psr.c);
    assert!(!emu.psr.v);
    assert!(emu.psr.t);
}

#[test]
fn mov_sub_underflows_to_negative() {
    let mut emu = emulator_with_code(&[
        (0x58, 0x200C), // MOV R0, #12
        (0x5A, 0x210D), // MOV R1, #13
        (0x5C, 0x1A40), // SUB R0, R1, R0
    ]);
    emu.run_n(3).unwrap();
    assert_eq!(emu.registers.get(0), 0xFFFF_FFFF);
    assert_eq!(emu.registers.get(1), 13);
    assert!(emu.psr.n);
    assert!(!emu.psr.z);
    assert!(!emu.psr.c);
    assert!(!emu.psr.v);
    assert!(emu.psr.t);
}

#[test]
fn countdown_loop_via_conditional_branch_and_bx() {
    let mut emu = emulator_with_code(&[
        (0x58, 0x200C), // MOV R0, #12
        (0x5A, 0x2101), // MOV R1, #1
        (0x5C, 0x467A), // MOV R2, PC
        (0x5E, 0x3201), // ADD R2, #1
        (0x60, 0x1A40), // SUB R0, R1, R0
        (0x62, 0xD000), // BEQ +0
        (0x64, 0x4710), // BX R2
    ]);
    emu.run_n(39).unwrap();
    assert_eq!(emu.registers.get(0), 0);
    assert_eq!(emu.registers.get(1), 1);
    assert!(!emu.psr.n);
    assert!(emu.psr.z);
    assert!(!emu.psr.c);
    assert!(!emu.psr.v);
    assert!(emu.psr.t);
}

#[test]
fn the_thumb_flag_is_never_cleared_across_a_run() {
    let mut emu = emulator_with_code(&[
        (0x58, 0x200C),
        (0x5A, 0x2101),
        (0x5C, 0x1840),
        (0x5E, 0x1A40),
    ]);
    for _ in 0..4 {
        emu.step().unwrap();
        assert!(emu.psr.t, "Thumb mode must never be cleared");
    }
}

#[test]
fn unimplemented_instructions_surface_as_errors_not_panics() {
    let mut emu = emulator_with_code(&[(0x58, 0xDF00)]); // SVC 0
    let err = emu.step().unwrap_err();
    assert!(err.to_string().contains("SVC"));
}
