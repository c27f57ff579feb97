//! One executor per Thumb instruction form. Semantics are grounded in
//! `original_source/cpu/cpu.cpp` where it implements a form (move-shifted-
//! register, add/subtract, mov/cmp/add/sub immediate, ALU ops, hi-register
//! ops), corrected per the bug list in SPEC_FULL.md §9, and written fresh
//! from SPEC_FULL.md §4.6 for every form the source left as an empty stub.

use super::decode::{self, ThumbForm};
use super::flags;
use crate::emulator::Emulator;
use crate::error::{EmulatorError, Result};
use crate::psr::Rlist;
use crate::registers::{LR, PC, SP};

fn lowreg(instr: u16, shift: u32) -> usize {
    ((instr as u32 >> shift) & 0x7) as usize
}

/// Sign-extends the low `bits` bits of `value` to a full 32-bit value.
fn sign_extend(value: u32, bits: u32) -> u32 {
    let shift = 32 - bits;
    (((value << shift) as i32) >> shift) as u32
}

pub fn execute(emu: &mut Emulator, instr: u16) -> Result<()> {
    use ThumbForm::*;
    match decode::classify(instr) {
        Nop => Ok(()),
        CpsidCpsie => unimplemented(emu, instr, "CPSID/CPSIE"),
        WfiWfe => unimplemented(emu, instr, "WFI/WFE"),
        Sev => unimplemented(emu, instr, "SEV"),
        Svc => unimplemented(emu, instr, "SVC"),
        Bkpt => unimplemented(emu, instr, "BKPT"),
        AddSubSpImm => add_sub_sp_imm(emu, instr),
        LoadStoreRegOffset => load_store_reg_offset(emu, instr),
        LoadStoreSignExtended => load_store_sign_extended(emu, instr),
        PushPop => push_pop(emu, instr),
        Alu => alu_operations(emu, instr),
        HiRegOps => hi_register_ops(emu, instr),
        AddSub => add_subtract(emu, instr),
        PcRelativeLoad => pc_relative_load(emu, instr),
        UnconditionalBranch => unconditional_branch(emu, instr),
        LoadStoreHalfwordImm => load_store_halfword_imm(emu, instr),
        SpRelativeLoadStore => sp_relative_load_store(emu, instr),
        LoadAddress => load_address(emu, instr),
        LdmStm => ldm_stm(emu, instr),
        ConditionalBranch => conditional_branch(emu, instr),
        LongBranchLink => long_branch_with_link(emu, instr),
        MovCmpAddSubImm => mov_cmp_add_sub_imm(emu, instr),
        MoveShiftedRegister => move_shifted_register(emu, instr),
        LoadStoreImmOffset => load_store_imm_offset(emu, instr),
        Illegal => Err(EmulatorError::IllegalOpcode {
            opcode: instr,
            pc: emu.current_instr_addr(),
        }),
    }
}

fn unimplemented(emu: &Emulator, instr: u16, mnemonic: &'static str) -> Result<()> {
    Err(EmulatorError::UnimplementedInstruction {
        opcode: instr,
        mnemonic,
        pc: emu.current_instr_addr(),
    })
}

// ---- shifts, add/sub, immediates -----------------------------------------

fn move_shifted_register(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = lowreg(instr, 0);
    let rs = lowreg(instr, 3);
    let off5 = (instr as u32 >> 6) & 0x1F;
    let op = (instr >> 11) & 0x3;
    let value = emu.registers.get(rs);

    let (result, carry) = match op {
        0b00 => {
            // LSL
            if off5 == 0 {
                (value, emu.psr.c)
            } else {
                let carry = (value >> (32 - off5)) & 1 != 0;
                (value << off5, carry)
            }
        }
        0b01 => {
            // LSR, Off5=0 encodes a shift of 32
            if off5 == 0 {
                (0u32, value & 0x8000_0000 != 0)
            } else {
                let carry = (value >> (off5 - 1)) & 1 != 0;
                (value >> off5, carry)
            }
        }
        0b10 => {
            // ASR, Off5=0 encodes a shift of 32
            if off5 == 0 {
                let carry = value & 0x8000_0000 != 0;
                (if carry { 0xFFFF_FFFF } else { 0 }, carry)
            } else {
                let carry = ((value as i32) >> (off5 - 1)) & 1 != 0;
                (((value as i32) >> off5) as u32, carry)
            }
        }
        _ => unreachable!("op==0b11 is routed to the add/subtract form by the decoder"),
    };

    emu.registers.set_raw(rd, result);
    emu.psr.set_nzc(result, carry);
    Ok(())
}

fn add_subtract(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = lowreg(instr, 0);
    let rs = lowreg(instr, 3);
    let rn_off3 = (instr as u32 >> 6) & 0x7;
    let op = (instr >> 9) & 1;
    let imm = (instr >> 10) & 1;

    let a = emu.registers.get(rs);
    let b = if imm == 0 {
        emu.registers.get(rn_off3 as usize)
    } else {
        rn_off3
    };

    if op == 0 {
        let result = a.wrapping_add(b);
        emu.registers.set_raw(rd, result);
        emu.psr
            .set_nzcv(result, flags::add_carry(a, b, result), flags::add_overflow(a, b, result));
    } else {
        let result = a.wrapping_sub(b);
        emu.registers.set_raw(rd, result);
        emu.psr
            .set_nzcv(result, flags::sub_carry(a, b, result), flags::sub_overflow(a, b, result));
    }
    Ok(())
}

fn mov_cmp_add_sub_imm(emu: &mut Emulator, instr: u16) -> Result<()> {
    let off8 = (instr & 0xFF) as u32;
    let rd = ((instr >> 8) & 0x7) as usize;
    let op = (instr >> 11) & 0x3;

    match op {
        0b00 => {
            // MOV: N is always false (an 8-bit immediate never has bit 31 set); C/V unchanged.
            emu.registers.set_raw(rd, off8);
            emu.psr.n = false;
            emu.psr.z = off8 == 0;
        }
        0b01 => {
            // CMP: no writeback.
            let lhs = emu.registers.get(rd);
            let result = lhs.wrapping_sub(off8);
            emu.psr.set_nzcv(
                result,
                flags::sub_carry(lhs, off8, result),
                flags::sub_overflow(lhs, off8, result),
            );
        }
        0b10 => {
            let lhs = emu.registers.get(rd);
            let result = lhs.wrapping_add(off8);
            emu.registers.set_raw(rd, result);
            emu.psr.set_nzcv(
                result,
                flags::add_carry(lhs, off8, result),
                flags::add_overflow(lhs, off8, result),
            );
        }
        0b11 => {
            // SUB: the source uses add_carry here, which is a bug — see SPEC_FULL.md §9.
            let lhs = emu.registers.get(rd);
            let result = lhs.wrapping_sub(off8);
            emu.registers.set_raw(rd, result);
            emu.psr.set_nzcv(
                result,
                flags::sub_carry(lhs, off8, result),
                flags::sub_overflow(lhs, off8, result),
            );
        }
        _ => unreachable!(),
    }
    Ok(())
}

// ---- ALU ops --------------------------------------------------------------

fn alu_operations(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = lowreg(instr, 0);
    let rs = lowreg(instr, 3);
    let op = (instr as u32 >> 6) & 0xF;

    match op {
        0b0000 => {
            // AND
            let v = emu.registers.get(rd) & emu.registers.get(rs);
            emu.registers.set_raw(rd, v);
            emu.psr.set_nz(v);
        }
        0b0001 => {
            // EOR
            let v = emu.registers.get(rd) ^ emu.registers.get(rs);
            emu.registers.set_raw(rd, v);
            emu.psr.set_nz(v);
        }
        0b0010 => {
            // LSL Rd, Rs: shift amount is the low byte of Rs.
            let shift = emu.registers.byte(rs, 0) as u32;
            if shift != 0 {
                let rdv = emu.registers.get(rd);
                let (result, carry) = if shift == 32 {
                    (0u32, rdv & 1 != 0)
                } else if shift < 32 {
                    (rdv << shift, (rdv >> (32 - shift)) & 1 != 0)
                } else {
                    (0u32, false)
                };
                emu.registers.set_raw(rd, result);
                emu.psr.c = carry;
            }
            emu.psr.set_nz(emu.registers.get(rd));
        }
        0b0011 => {
            // LSR Rd, Rs
            let shift = emu.registers.byte(rs, 0) as u32;
            if shift != 0 {
                let rdv = emu.registers.get(rd);
                let (result, carry) = if shift == 32 {
                    (0u32, rdv & 0x8000_0000 != 0)
                } else if shift < 32 {
                    (rdv >> shift, (rdv >> (shift - 1)) & 1 != 0)
                } else {
                    (0u32, false)
                };
                emu.registers.set_raw(rd, result);
                emu.psr.c = carry;
            }
            emu.psr.set_nz(emu.registers.get(rd));
        }
        0b0100 => {
            // ASR Rd, Rs
            let shift = emu.registers.byte(rs, 0) as i32;
            if shift != 0 {
                let rdv = emu.registers.get(rd) as i32;
                if shift < 32 {
                    let carry = ((rdv >> (shift - 1)) & 1) != 0;
                    emu.registers.set_raw(rd, (rdv >> shift) as u32);
                    emu.psr.c = carry;
                } else if rdv < 0 {
                    emu.registers.set_raw(rd, 0xFFFF_FFFF);
                    emu.psr.c = true;
                } else {
                    emu.registers.set_raw(rd, 0);
                    emu.psr.c = false;
                }
            }
            emu.psr.set_nz(emu.registers.get(rd));
        }
        0b0101 => {
            // ADC
            let lhs = emu.registers.get(rd);
            let rhs = emu.registers.get(rs);
            let result = lhs.wrapping_add(rhs).wrapping_add(emu.psr.c as u32);
            emu.registers.set_raw(rd, result);
            emu.psr
                .set_nzcv(result, flags::add_carry(lhs, rhs, result), flags::add_overflow(lhs, rhs, result));
        }
        0b0110 => {
            // SBC: Rd - Rs - NOT(carry)
            let lhs = emu.registers.get(rd);
            let rhs = emu.registers.get(rs);
            let borrow = if emu.psr.c { 0u32 } else { 1u32 };
            let result = lhs.wrapping_sub(rhs).wrapping_sub(borrow);
            emu.registers.set_raw(rd, result);
            emu.psr
                .set_nzcv(result, flags::sub_carry(lhs, rhs, result), flags::sub_overflow(lhs, rhs, result));
        }
        0b0111 => {
            // ROR Rd, Rs
            let raw = emu.registers.byte(rs, 0) as u32;
            if raw != 0 {
                let amount = raw & 0x1F;
                let rdv = emu.registers.get(rd);
                if amount == 0 {
                    emu.psr.c = rdv & 0x8000_0000 != 0;
                } else {
                    emu.psr.c = (rdv >> (amount - 1)) & 1 != 0;
                    emu.registers.set_raw(rd, rdv.rotate_right(amount));
                }
            }
            emu.psr.set_nz(emu.registers.get(rd));
        }
        0b1000 => {
            // TST: the source duplicates ROR here instead of implementing TST — see SPEC_FULL.md §9.
            let v = emu.registers.get(rd) & emu.registers.get(rs);
            emu.psr.set_nz(v);
        }
        0b1001 => {
            // NEG: 0 - Rs into Rd.
            let rhs = emu.registers.get(rs);
            let result = 0u32.wrapping_sub(rhs);
            emu.registers.set_raw(rd, result);
            emu.psr
                .set_nzcv(result, flags::sub_carry(0, rhs, result), flags::sub_overflow(0, rhs, result));
        }
        0b1010 => {
            // CMP: no writeback.
            let lhs = emu.registers.get(rd);
            let rhs = emu.registers.get(rs);
            let result = lhs.wrapping_sub(rhs);
            emu.psr
                .set_nzcv(result, flags::sub_carry(lhs, rhs, result), flags::sub_overflow(lhs, rhs, result));
        }
        0b1011 => {
            // CMN: no writeback.
            let lhs = emu.registers.get(rd);
            let rhs = emu.registers.get(rs);
            let result = lhs.wrapping_add(rhs);
            emu.psr
                .set_nzcv(result, flags::add_carry(lhs, rhs, result), flags::add_overflow(lhs, rhs, result));
        }
        0b1100 => {
            // ORR
            let v = emu.registers.get(rd) | emu.registers.get(rs);
            emu.registers.set_raw(rd, v);
            emu.psr.set_nz(v);
        }
        0b1101 => {
            // MUL: updates only N and Z.
            let v = emu.registers.get(rd).wrapping_mul(emu.registers.get(rs));
            emu.registers.set_raw(rd, v);
            emu.psr.set_nz(v);
        }
        0b1110 => {
            // BIC
            let v = emu.registers.get(rd) & !emu.registers.get(rs);
            emu.registers.set_raw(rd, v);
            emu.psr.set_nz(v);
        }
        0b1111 => {
            // MVN
            let v = !emu.registers.get(rs);
            emu.registers.set_raw(rd, v);
            emu.psr.set_nz(v);
        }
        _ => unreachable!(),
    }
    Ok(())
}

// ---- hi-register ops / BX / BLX -------------------------------------------

fn hi_register_ops(emu: &mut Emulator, instr: u16) -> Result<()> {
    // The source masks this field with `0x1111` in one place and `0b1111`
    // in another; the correct mask is `0xF` — see SPEC_FULL.md §9.
    let field = (instr as u32 >> 6) & 0xF;
    let op2 = (field >> 2) & 0b11;
    let h1 = (field >> 1) & 1;
    let h2 = field & 1;
    let rd = ((h1 << 3) | (instr as u32 & 7)) as usize;
    let rs = ((h2 << 3) | ((instr as u32 >> 3) & 7)) as usize;

    match op2 {
        0b00 => {
            // ADD Rd/Hd, Rs/Hs — no flag update.
            let result = emu.registers.get(rd).wrapping_add(emu.registers.get(rs));
            emu.write_reg(rd, result);
        }
        0b01 => {
            // CMP Rd/Hd, Rs/Hs
            let lhs = emu.registers.get(rd);
            let rhs = emu.registers.get(rs);
            let result = lhs.wrapping_sub(rhs);
            emu.psr
                .set_nzcv(result, flags::sub_carry(lhs, rhs, result), flags::sub_overflow(lhs, rhs, result));
        }
        0b10 => {
            // MOV Rd/Hd, Rs/Hs — no flag update.
            let value = emu.registers.get(rs);
            emu.write_reg(rd, value);
        }
        0b11 => {
            // BX / BLX. The source never checks the target's low bit and
            // leaves BLX as an empty stub — both are fixed here.
            let target = emu.registers.get(rs);
            if target & 1 == 0 {
                return Err(EmulatorError::UnsupportedModeTransition { target });
            }
            if h1 == 1 {
                // BLX: LR = current PC before branching.
                let return_addr = emu.registers.get(PC);
                emu.registers.set_raw(LR, return_addr);
            }
            emu.write_reg(PC, target);
        }
        _ => unreachable!(),
    }
    Ok(())
}

// ---- loads and stores ------------------------------------------------------

fn pc_relative_load(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = ((instr >> 8) & 0x7) as usize;
    let off8 = (instr & 0xFF) as u32;
    let base = emu.registers.get(PC) & !0x3;
    let addr = base.wrapping_add(off8 << 2);
    let value = emu.mmu.read32(addr);
    emu.registers.set_raw(rd, value);
    Ok(())
}

fn load_store_reg_offset(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = lowreg(instr, 0);
    let rb = lowreg(instr, 3);
    let ro = lowreg(instr, 6);
    let l = (instr >> 11) & 1;
    let b = (instr >> 10) & 1;
    let addr = emu.registers.get(rb).wrapping_add(emu.registers.get(ro));

    match (l, b) {
        (0, 0) => emu.mmu.write32(addr, emu.registers.get(rd)), // STR
        (0, 1) => emu.mmu.write8(addr, emu.registers.byte(rd, 0)), // STRB
        (1, 0) => {
            let v = emu.mmu.read32(addr);
            emu.registers.set_raw(rd, v);
        } // LDR
        (1, 1) => {
            let v = emu.mmu.read8(addr);
            emu.registers.set_raw(rd, v as u32);
        } // LDRB
        _ => unreachable!(),
    }
    Ok(())
}

fn load_store_sign_extended(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = lowreg(instr, 0);
    let rb = lowreg(instr, 3);
    let ro = lowreg(instr, 6);
    let h = (instr >> 11) & 1;
    let s = (instr >> 10) & 1;
    let addr = emu.registers.get(rb).wrapping_add(emu.registers.get(ro));

    match (h, s) {
        (0, 0) => emu.mmu.write16(addr, emu.registers.halfword(rd, 0)), // STRH
        (0, 1) => {
            let v = emu.mmu.read16(addr);
            emu.registers.set_raw(rd, v as u32);
        } // LDRH, zero-extended
        (1, 0) => {
            let v = emu.mmu.read8(addr) as i8;
            emu.registers.set_raw(rd, v as i32 as u32);
        } // LDSB, sign-extended
        (1, 1) => {
            let v = emu.mmu.read16_signed(addr);
            emu.registers.set_raw(rd, v as i32 as u32);
        } // LDSH, sign-extended
        _ => unreachable!(),
    }
    Ok(())
}

fn load_store_imm_offset(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = lowreg(instr, 0);
    let rb = lowreg(instr, 3);
    let off5 = (instr as u32 >> 6) & 0x1F;
    let b = (instr >> 12) & 1;
    let l = (instr >> 11) & 1;

    // Word accesses scale the 5-bit offset by 4; byte accesses don't scale
    // it at all. The source's `(instr >> 6) & 7` is wrong on both counts —
    // see SPEC_FULL.md §9.
    let offset = if b == 0 { off5 << 2 } else { off5 };
    let addr = emu.registers.get(rb).wrapping_add(offset);

    match (b, l) {
        (0, 0) => emu.mmu.write32(addr, emu.registers.get(rd)), // STR
        (0, 1) => {
            let v = emu.mmu.read32(addr);
            emu.registers.set_raw(rd, v);
        } // LDR
        (1, 0) => emu.mmu.write8(addr, emu.registers.byte(rd, 0)), // STRB
        (1, 1) => {
            let v = emu.mmu.read8(addr);
            emu.registers.set_raw(rd, v as u32);
        } // LDRB
        _ => unreachable!(),
    }
    Ok(())
}

fn load_store_halfword_imm(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = lowreg(instr, 0);
    let rb = lowreg(instr, 3);
    let off5 = (instr as u32 >> 6) & 0x1F;
    let l = (instr >> 11) & 1;
    let addr = emu.registers.get(rb).wrapping_add(off5 << 1);

    if l == 0 {
        emu.mmu.write16(addr, emu.registers.halfword(rd, 0));
    } else {
        let v = emu.mmu.read16(addr);
        emu.registers.set_raw(rd, v as u32);
    }
    Ok(())
}

fn sp_relative_load_store(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = ((instr >> 8) & 0x7) as usize;
    let off8 = (instr & 0xFF) as u32;
    let l = (instr >> 11) & 1;
    let addr = emu.registers.get(SP).wrapping_add(off8 << 2);

    if l == 0 {
        emu.mmu.write32(addr, emu.registers.get(rd));
    } else {
        let v = emu.mmu.read32(addr);
        emu.registers.set_raw(rd, v);
    }
    Ok(())
}

fn load_address(emu: &mut Emulator, instr: u16) -> Result<()> {
    let rd = ((instr >> 8) & 0x7) as usize;
    let off8 = (instr & 0xFF) as u32;
    let sp_flag = (instr >> 11) & 1;

    let value = if sp_flag == 0 {
        (emu.registers.get(PC) & !0x3).wrapping_add(off8 << 2)
    } else {
        emu.registers.get(SP).wrapping_add(off8 << 2)
    };
    emu.registers.set_raw(rd, value);
    Ok(())
}

fn add_sub_sp_imm(emu: &mut Emulator, instr: u16) -> Result<()> {
    let off7 = (instr & 0x7F) as u32;
    let s = (instr >> 7) & 1;
    let delta = off7 << 2;
    let sp = emu.registers.get(SP);
    let result = if s == 0 { sp.wrapping_add(delta) } else { sp.wrapping_sub(delta) };
    emu.registers.set_raw(SP, result);
    Ok(())
}

fn push_pop(emu: &mut Emulator, instr: u16) -> Result<()> {
    let l = (instr >> 11) & 1;
    let r = (instr >> 8) & 1;
    let rlist = Rlist::from_bits_truncate((instr & 0xFF) as u8);

    if l == 0 {
        // PUSH: decrement SP first, then write ascending R0..R7, then LR.
        let count = rlist.register_count() + r as u32;
        let mut addr = emu.registers.get(SP).wrapping_sub(count * 4);
        emu.registers.set_raw(SP, addr);
        for reg in rlist.iter_registers() {
            emu.mmu.write32(addr, emu.registers.get(reg));
            addr = addr.wrapping_add(4);
        }
        if r == 1 {
            emu.mmu.write32(addr, emu.registers.get(LR));
        }
    } else {
        // POP: read ascending R0..R7, then PC, branching when R=1.
        let mut addr = emu.registers.get(SP);
        for reg in rlist.iter_registers() {
            let v = emu.mmu.read32(addr);
            emu.registers.set_raw(reg, v);
            addr = addr.wrapping_add(4);
        }
        if r == 1 {
            let v = emu.mmu.read32(addr);
            addr = addr.wrapping_add(4);
            emu.registers.set_raw(SP, addr);
            emu.write_reg(PC, v);
        } else {
            emu.registers.set_raw(SP, addr);
        }
    }
    Ok(())
}

fn ldm_stm(emu: &mut Emulator, instr: u16) -> Result<()> {
    let l = (instr >> 11) & 1;
    let rb = ((instr >> 8) & 0x7) as usize;
    let rlist = Rlist::from_bits_truncate((instr & 0xFF) as u8);
    let rb_in_list = rlist.iter_registers().any(|r| r == rb);

    let mut addr = emu.registers.get(rb);
    for reg in rlist.iter_registers() {
        if l == 0 {
            emu.mmu.write32(addr, emu.registers.get(reg));
        } else {
            let v = emu.mmu.read32(addr);
            emu.registers.set_raw(reg, v);
        }
        addr = addr.wrapping_add(4);
    }
    // STMIA always writes back; LDMIA only if Rb was not itself in the list.
    if l == 0 || !rb_in_list {
        emu.registers.set_raw(rb, addr);
    }
    Ok(())
}

// ---- branches ---------------------------------------------------------

fn conditional_branch(emu: &mut Emulator, instr: u16) -> Result<()> {
    let cond = ((instr >> 8) & 0xF) as u8;
    let off8 = (instr & 0xFF) as u32;
    if emu.psr.condition_holds(cond) {
        let offset = sign_extend(off8, 8) << 1;
        let target = emu.registers.get(PC).wrapping_add(offset);
        emu.write_reg(PC, target);
    }
    Ok(())
}

fn unconditional_branch(emu: &mut Emulator, instr: u16) -> Result<()> {
    let off11 = (instr & 0x7FF) as u32;
    let offset = sign_extend(off11, 11) << 1;
    let target = emu.registers.get(PC).wrapping_add(offset);
    emu.write_reg(PC, target);
    Ok(())
}

fn long_branch_with_link(emu: &mut Emulator, instr: u16) -> Result<()> {
    let is_second_half = (instr >> 11) & 1 == 1;
    let off11 = (instr & 0x7FF) as u32;

    if !is_second_half {
        // First half: LR = PC + sign_extend(off11 << 12).
        let offset = sign_extend(off11, 11) << 12;
        let lr = emu.registers.get(PC).wrapping_add(offset);
        emu.registers.set_raw(LR, lr);
    } else {
        // Second half: target = (LR + (off11 << 1)) & ~1; LR = return address | 1; branch.
        let lr = emu.registers.get(LR);
        let target = lr.wrapping_add(off11 << 1) & !1;
        let return_addr = emu.registers.get(PC).wrapping_sub(2) | 1;
        emu.registers.set_raw(LR, return_addr);
        emu.write_reg(PC, target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::Emulator;

    fn emu_at(pc_init: u32) -> Emulator {
        let mut emu = Emulator::new(4096, 4096);
        emu.mmu.write32(crate::emulator::PC_INIT_ADDRESS, pc_init);
        emu
    }

    #[test]
    fn s1_mov_add() {
        let mut emu = emu_at(0x58);
        emu.mmu.write16(0x58, 0x200C); // MOV R0, #12
        emu.mmu.write16(0x5A, 0x2101); // MOV R1, #1
        emu.mmu.write16(0x5C, 0x1840); // ADD R0, R1
        emu.reset();
        emu.run_n(3).unwrap();
        assert_eq!(emu.registers.get(0), 13);
        assert_eq!(emu.registers.get(1), 1);
        assert!(!emu.psr.n && !emu.psr.z && !emu.psr.c && !emu.psr.v && emu.psr.t);
    }

    #[test]
    fn s2_mov_sub_negative() {
        let mut emu = emu_at(0x58);
        emu.mmu.write16(0x58, 0x200C); // MOV R0, #12
        emu.mmu.write16(0x5A, 0x210D); // MOV R1, #13
        emu.mmu.write16(0x5C, 0x1A40); // SUB R0, R1
        emu.reset();
        emu.run_n(3).unwrap();
        assert_eq!(emu.registers.get(0), 0xFFFF_FFFF);
        assert_eq!(emu.registers.get(1), 13);
        assert!(emu.psr.n && !emu.psr.z && !emu.psr.c && !emu.psr.v && emu.psr.t);
    }

    #[test]
    fn s3_countdown_loop_with_bx() {
        let mut emu = emu_at(0x58);
        emu.mmu.write16(0x58, 0x200C); // MOV R0, #12
        emu.mmu.write16(0x5A, 0x2101); // MOV R1, #1
        emu.mmu.write16(0x5C, 0x467A); // MOV R2, R15
        emu.mmu.write16(0x5E, 0x3201); // ADD R2, #1
        emu.mmu.write16(0x60, 0x1A40); // SUB R0, R1
        emu.mmu.write16(0x62, 0xD000); // BEQ +0
        emu.mmu.write16(0x64, 0x4710); // BX R2
        emu.reset();
        emu.run_n(39).unwrap();
        assert_eq!(emu.registers.get(0), 0);
        assert_eq!(emu.registers.get(1), 1);
        assert!(!emu.psr.n && emu.psr.z && !emu.psr.c && !emu.psr.v && emu.psr.t);
    }

    #[test]
    fn bx_to_even_address_is_fatal() {
        let mut emu = emu_at(0x58);
        // MOV R0, #0 then BX R0 (even address -> ARM state -> fatal).
        emu.mmu.write16(0x58, 0x2000); // MOV R0, #0
        emu.mmu.write16(0x5A, 0x4700); // BX R0
        emu.reset();
        emu.step().unwrap();
        let err = emu.step().unwrap_err();
        assert!(matches!(err, EmulatorError::UnsupportedModeTransition { target: 0 }));
    }

    #[test]
    fn illegal_opcode_surfaces_as_error() {
        let mut emu = emu_at(0x58);
        // 0xDE00..0xDEFF is BKPT (unimplemented, not illegal); use an opcode
        // that truly falls outside every table entry is hard to construct
        // since the 3-bit prefixes fully partition the space, so this
        // instead checks an explicitly unimplemented stub surfaces an error
        // rather than silently altering state.
        emu.mmu.write16(0x58, 0xDF00); // SVC 0
        emu.reset();
        let err = emu.step().unwrap_err();
        assert!(matches!(err, EmulatorError::UnimplementedInstruction { .. }));
    }

    #[test]
    fn push_then_pop_round_trips_registers() {
        let mut emu = emu_at(0x58);
        emu.mmu.write16(0x58, 0xB50F); // PUSH {R0-R3, LR}
        emu.mmu.write16(0x5A, 0xBD0F); // POP {R0-R3, PC}
        emu.reset();
        for i in 0..4 {
            emu.registers.set_raw(i, 0x1000 + i as u32);
        }
        let sp_before = emu.registers.get(SP);
        emu.step().unwrap(); // PUSH
        assert_eq!(emu.registers.get(SP), sp_before - 5 * 4);
        for i in 0..4u32 {
            emu.registers.set_raw(i as usize, 0); // clobber before POP
        }
        emu.step().unwrap(); // POP — also branches via the popped PC
        for i in 0..4u32 {
            assert_eq!(emu.registers.get(i as usize), 0x1000 + i);
        }
        assert_eq!(emu.registers.get(SP), sp_before);
    }
}
