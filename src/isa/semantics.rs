//! Per-mnemonic state transformers (spec.md §4.5). Grouped into small
//! generic helpers parameterized by the scalar operation, per DESIGN
//! NOTES §9 ("macro-generated execute bodies -> generic helpers") —
//! the catalogs wire these up via zero-capture closures that coerce to
//! plain `fn` pointers, one per `(mnemonic, ISA version)` pair.

use crate::cpu::change_stream::{Change, ChangeKind};
use crate::cpu::keymem::KeyOp;
use crate::cpu::wide_int::{U256, U512};
use crate::cpu::CpuModel;

use super::encoding::Fields;
use super::{ControlEffect, IsaVersion};

// Fixed moduli for the non-R31 modular family members.
fn p25519() -> U256 {
    // 2^255 - 19
    (U256::one() << 255) - U256::from(19u64)
}

fn p256() -> U256 {
    // NIST P-256: 2^256 - 2^224 + 2^192 + 2^96 - 1. `U256` arithmetic
    // wraps modulo 2^256 (spec.md §4.1), so `zero() - (1 << 224)`
    // already yields `2^256 - 2^224` without an explicit 2^256 term.
    U256::zero() - (U256::one() << 224) + (U256::one() << 192) + (U256::one() << 96) - U256::one()
}

fn check_modular_precondition(a: U256, b: U256, modulus: U256) {
    if modulus.is_zero() || modulus == U256::one() || a >= modulus || b >= modulus {
        tracing::warn!("modular precondition violated (operand >= modulus, or modulus in {{0,1}})");
    }
}

// ---- R-type / I-type 32-bit arithmetic (ADD, SUB, CMP, ADDI, SUBI, CMPI) ----

#[derive(Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
}

fn arith32(model: &mut CpuModel, op1: u8, a_low: u32, b_low: u32, op: ArithOp, store: bool) -> ControlEffect {
    let result_low = match op {
        ArithOp::Add => a_low.wrapping_add(b_low),
        ArithOp::Sub => a_low.wrapping_sub(b_low),
    };
    if store {
        model.set_gpr(op1, U256::from(result_low as u64));
    }
    model.set_flag_z(result_low == 0);
    ControlEffect::Advance
}

pub fn r_arith(model: &mut CpuModel, f: Fields, op: ArithOp, store: bool) -> ControlEffect {
    let a = model.gpr(f.op2).low_u32();
    let b = model.gpr(f.op3).low_u32();
    arith32(model, f.op1, a, b, op, store)
}

pub fn i_arith(model: &mut CpuModel, f: Fields, op: ArithOp, store: bool) -> ControlEffect {
    let a = model.gpr(f.op2).low_u32();
    arith32(model, f.op1, a, f.immediate as u32, op, store)
}

// ---- R-type / I-type logic (AND, OR, XOR, NOT, ANDI, ORI, XORI) ----

#[derive(Clone, Copy)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

fn apply_logic32(op: LogicOp, a: u32, b: u32) -> u32 {
    match op {
        LogicOp::And => a & b,
        LogicOp::Or => a | b,
        LogicOp::Xor => a ^ b,
    }
}

fn apply_logic256(op: LogicOp, a: U256, b: U256) -> U256 {
    match op {
        LogicOp::And => a & b,
        LogicOp::Or => a | b,
        LogicOp::Xor => a ^ b,
    }
}

fn logic_result(version: IsaVersion, op: LogicOp, a: U256, b: U256) -> (U256, bool) {
    match version {
        IsaVersion::V1 => {
            let low = apply_logic32(op, a.low_u32(), b.low_u32());
            let mut words = a.to_le_words();
            words[0] = low;
            let result = U256::from_le_words(words);
            (result, low == 0)
        }
        IsaVersion::V2 => {
            let result = apply_logic256(op, a, b);
            let z = result.is_zero();
            (result, z)
        }
    }
}

pub fn r_logic(model: &mut CpuModel, f: Fields, op: LogicOp, version: IsaVersion) -> ControlEffect {
    let (result, z) = logic_result(version, op, model.gpr(f.op2), model.gpr(f.op3));
    model.set_gpr(f.op1, result);
    model.set_flag_z(z);
    ControlEffect::Advance
}

pub fn i_logic(model: &mut CpuModel, f: Fields, op: LogicOp, version: IsaVersion) -> ControlEffect {
    let imm = U256::from(f.immediate as u64);
    let (result, z) = logic_result(version, op, model.gpr(f.op2), imm);
    model.set_gpr(f.op1, result);
    model.set_flag_z(z);
    ControlEffect::Advance
}

pub fn not_op(model: &mut CpuModel, f: Fields, version: IsaVersion) -> ControlEffect {
    let a = model.gpr(f.op2);
    let (result, z) = match version {
        IsaVersion::V1 => {
            let mut words = a.to_le_words();
            words[0] = !words[0];
            let result = U256::from_le_words(words);
            let z = words[0] == 0;
            (result, z)
        }
        IsaVersion::V2 => {
            let result = !a;
            (result, result.is_zero())
        }
    };
    model.set_gpr(f.op1, result);
    model.set_flag_z(z);
    ControlEffect::Advance
}

// ---- Bit ops (SBIT/CBIT, V2) ----

pub fn bit_op(model: &mut CpuModel, f: Fields, set: bool) -> ControlEffect {
    let shift = (model.gpr(f.op3).low_u32() & 0xFF) as usize;
    let mask = U256::one() << shift;
    let a = model.gpr(f.op2);
    let result = if set { a | mask } else { a & !mask };
    model.set_gpr(f.op1, result);
    ControlEffect::Advance
}

// ---- Shifts / rotates ----

pub fn lsl(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let a = model.gpr(f.op2);
    let out = a.bit(255);
    model.set_gpr(f.op1, a << 1);
    model.set_flag_c(out);
    ControlEffect::Advance
}

pub fn lsr(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let a = model.gpr(f.op2);
    let out = a.bit(0);
    model.set_gpr(f.op1, a >> 1);
    model.set_flag_c(out);
    ControlEffect::Advance
}

pub fn rol(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let a = model.gpr(f.op2);
    let out = a.bit(255);
    let result = (a << 1) | if out { U256::one() } else { U256::zero() };
    model.set_gpr(f.op1, result);
    model.set_flag_c(out);
    ControlEffect::Advance
}

pub fn ror(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let a = model.gpr(f.op2);
    let out = a.bit(0);
    let result = (a >> 1) | if out { U256::one() << 255 } else { U256::zero() };
    model.set_gpr(f.op1, result);
    model.set_flag_c(out);
    ControlEffect::Advance
}

pub fn rol8(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let a = model.gpr(f.op2);
    model.set_gpr(f.op1, (a << 8) | (a >> 248));
    ControlEffect::Advance
}

pub fn ror8(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let a = model.gpr(f.op2);
    model.set_gpr(f.op1, (a >> 8) | (a << 248));
    ControlEffect::Advance
}

pub fn rolin(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let a = model.gpr(f.op2);
    let b = model.gpr(f.op3);
    model.set_gpr(f.op1, (a << 8) | (b >> 248));
    ControlEffect::Advance
}

pub fn rorin(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let a = model.gpr(f.op2);
    let b = model.gpr(f.op3);
    model.set_gpr(f.op1, (a >> 8) | (b << 248));
    ControlEffect::Advance
}

// ---- SWE: reverse the 32 bytes of R[op2] ----

pub fn swe(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let words = model.gpr(f.op2).to_le_words();
    let mut bytes = [0u8; 32];
    for (i, w) in words.iter().enumerate() {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
    }
    bytes.reverse();
    let mut out = [0u32; 8];
    for (i, word) in out.iter_mut().enumerate() {
        *word = u32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]]);
    }
    model.set_gpr(f.op1, U256::from_le_words(out));
    ControlEffect::Advance
}

// ---- MOV / MOVI ----

pub fn mov(model: &mut CpuModel, f: Fields) -> ControlEffect {
    model.set_gpr(f.op1, model.gpr(f.op2));
    ControlEffect::Advance
}

pub fn movi(model: &mut CpuModel, f: Fields) -> ControlEffect {
    model.set_gpr(f.op1, U256::from(f.immediate as u64));
    ControlEffect::Advance
}

// ---- Data load/store (LDR/STR register-addressed, LD/ST M-type absolute) ----

pub fn ldr(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let addr = model.gpr(f.op2).low_u32() as u16;
    let value = model.load_wide(addr);
    model.set_gpr(f.op1, value);
    ControlEffect::Advance
}

pub fn str_(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let addr = model.gpr(f.op2).low_u32() as u16;
    let value = model.gpr(f.op1);
    model.store_wide(addr, value);
    ControlEffect::Advance
}

pub fn ld_m(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let value = model.load_wide(f.addr);
    model.set_gpr(f.op1, value);
    ControlEffect::Advance
}

pub fn st_m(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let value = model.gpr(f.op1);
    model.store_wide(f.addr, value);
    ControlEffect::Advance
}

// ---- CSWAP / ZSWAP ----

fn swap_if(model: &mut CpuModel, f: Fields, flag: bool) -> ControlEffect {
    if flag {
        let a = model.gpr(f.op1);
        let b = model.gpr(f.op2);
        model.set_gpr(f.op1, b);
        model.set_gpr(f.op2, a);
    }
    ControlEffect::Advance
}

pub fn cswap(model: &mut CpuModel, f: Fields) -> ControlEffect {
    swap_if(model, f, model.flag_c())
}

pub fn zswap(model: &mut CpuModel, f: Fields) -> ControlEffect {
    swap_if(model, f, model.flag_z())
}

// ---- SHA-512 (HASH / HASH_IT) ----

fn reg_to_be_bytes(value: U256) -> [u8; 32] {
    let words = value.to_le_words();
    let mut bytes = [0u8; 32];
    for (i, w) in words.iter().enumerate() {
        bytes[(7 - i) * 4..(7 - i) * 4 + 4].copy_from_slice(&w.to_be_bytes());
    }
    bytes
}

fn be_bytes_to_reg(bytes: &[u8]) -> U256 {
    let mut words = [0u32; 8];
    for i in 0..8 {
        words[7 - i] = u32::from_be_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]]);
    }
    U256::from_le_words(words)
}

/// Packs four 64-bit words (`words[0]` most significant) into a 256-bit
/// register, matching the hash context readback's big-endian concatenation.
fn pack_be_u64s(words: &[u64]) -> U256 {
    U256([words[3], words[2], words[1], words[0]])
}

pub fn hash_it(model: &mut CpuModel, _f: Fields) -> ControlEffect {
    model.hash_engine().reset();
    ControlEffect::Advance
}

/// Packs `R[op2+3]..R[op2]` (indices mod 32) into 128 message bytes,
/// highest-index register first, and absorbs them as one SHA-512 block.
pub fn hash(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let mut block = [0u8; 128];
    for slot in 0..4u16 {
        let idx = ((f.op2 as u16 + (3 - slot)) % 32) as u8;
        let bytes = reg_to_be_bytes(model.gpr(idx));
        let off = slot as usize * 32;
        block[off..off + 32].copy_from_slice(&bytes);
    }
    model.hash_engine().absorb(&block);
    let ctx = model.hash_engine().context();
    model.set_gpr(f.op1, pack_be_u64s(&ctx[4..8]));
    model.set_gpr(((f.op1 as u16 + 1) % 32) as u8, pack_be_u64s(&ctx[0..4]));
    ControlEffect::Advance
}

// ---- Keccak sponge (TMAC_IT / TMAC_IS / TMAC_UP / TMAC_RD) ----

pub fn tmac_it(model: &mut CpuModel, _f: Fields) -> ControlEffect {
    model.keccak().init();
    ControlEffect::Advance
}

pub fn tmac_is(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let nonce = (f.immediate & 0xFF) as u8;
    let key = reg_to_be_bytes(model.gpr(f.op2));
    let mut init = [0u8; 36];
    init[0] = nonce;
    init[1] = 0x20;
    init[2..34].copy_from_slice(&key);
    init[34] = 0x00;
    init[35] = 0x00;
    let mut block1 = [0u8; 18];
    let mut block2 = [0u8; 18];
    block1.copy_from_slice(&init[..18]);
    block2.copy_from_slice(&init[18..]);
    model.keccak().absorb_block(&block1);
    model.keccak().absorb_block(&block2);
    ControlEffect::Advance
}

pub fn tmac_up(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let bytes = reg_to_be_bytes(model.gpr(f.op2));
    let mut block = [0u8; 18];
    block.copy_from_slice(&bytes[14..32]);
    model.keccak().absorb_block(&block);
    ControlEffect::Advance
}

pub fn tmac_rd(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let block = model.keccak().squeeze_block();
    model.set_gpr(f.op1, be_bytes_to_reg(&block));
    ControlEffect::Advance
}

// ---- GRV: entropy queue -> register, with V2 RBUS tagging ----

pub fn grv(model: &mut CpuModel, f: Fields, version: IsaVersion) -> ControlEffect {
    let mut words = [0u32; 8];
    for (i, w) in words.iter_mut().enumerate() {
        *w = model.pop_entropy();
        if version == IsaVersion::V2 {
            let tag = if i == 0 { 0 } else { 1 }; // 0 = FRESH, 1 = NO_FRESH
            model.report_change(Change::scalar(ChangeKind::Rbus, tag, 0, *w));
        }
    }
    model.set_gpr(f.op1, U256::from_le_words(words));
    ControlEffect::Advance
}

// ---- SCB: side-channel-protected scalar blinding ----

pub fn scb(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let mask = (U256::one() << 255) | (U256::one() << 223);
    let blinded = model.gpr(f.op3) | mask;
    let product = blinded.widening_mul(model.modulus());
    let sum = product + U512::from(model.gpr(f.op2));
    let (low, high) = sum.split();
    model.set_gpr(f.op1, low);
    model.set_gpr(((f.op1 as u16 + 1) % 32) as u8, high);
    ControlEffect::Advance
}

// ---- Modular family ----

pub fn mul_fixed(model: &mut CpuModel, f: Fields, fixed_modulus: fn() -> U256) -> ControlEffect {
    let modulus = fixed_modulus();
    let a = model.gpr(f.op2);
    let b = model.gpr(f.op3);
    check_modular_precondition(a, b, modulus);
    let product = a.widening_mul(b);
    let result = product % U512::from(modulus);
    model.set_gpr(f.op1, U256::try_from(result).expect("reduction mod a 256-bit modulus fits in 256 bits"));
    ControlEffect::Advance
}

pub fn addp(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let modulus = model.modulus();
    let a = model.gpr(f.op2);
    let b = model.gpr(f.op3);
    check_modular_precondition(a, b, modulus);
    let sum = U512::from(a) + U512::from(b);
    let result = sum % U512::from(modulus);
    model.set_gpr(f.op1, U256::try_from(result).expect("reduction mod a 256-bit modulus fits in 256 bits"));
    ControlEffect::Advance
}

pub fn subp(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let modulus = model.modulus();
    let a = model.gpr(f.op2);
    let b = model.gpr(f.op3);
    check_modular_precondition(a, b, modulus);
    model.set_gpr(f.op1, a.sub_mod(b, modulus));
    ControlEffect::Advance
}

pub fn mulp(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let modulus = model.modulus();
    let a = model.gpr(f.op2);
    let b = model.gpr(f.op3);
    check_modular_precondition(a, b, modulus);
    let product = a.widening_mul(b);
    let result = product % U512::from(modulus);
    model.set_gpr(f.op1, U256::try_from(result).expect("reduction mod a 256-bit modulus fits in 256 bits"));
    ControlEffect::Advance
}

pub fn redp(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let modulus = model.modulus();
    let high = model.gpr(f.op2);
    let low = model.gpr(f.op3);
    let dividend = U512::from_parts(high, low);
    let result = dividend % U512::from(modulus);
    model.set_gpr(f.op1, U256::try_from(result).expect("reduction mod a 256-bit modulus fits in 256 bits"));
    ControlEffect::Advance
}

pub fn mul25519(model: &mut CpuModel, f: Fields) -> ControlEffect {
    mul_fixed(model, f, p25519)
}

pub fn mul256(model: &mut CpuModel, f: Fields) -> ControlEffect {
    mul_fixed(model, f, p256)
}

// ---- CMPA (V1): full 256-bit compare against zero-extended immediate ----

pub fn cmpa(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let imm = U256::from(f.immediate as u64);
    let z = model.gpr(f.op2) == imm;
    model.set_flag_z(z);
    ControlEffect::Advance
}

// ---- Key queue (GPK V1) / key-bus reads+writes (LDK/STK/KBO, V2) ----

pub fn gpk(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let mut words = [0u32; 8];
    for w in words.iter_mut() {
        *w = model.pop_key();
    }
    model.set_gpr(f.op1, U256::from_le_words(words));
    ControlEffect::Advance
}

fn kbus_object(op: u8, ty: u8, slot: u8, offset: u8) -> u32 {
    ((op as u32) << 24) | ((ty as u32) << 16) | ((slot as u32) << 8) | (offset as u32)
}

pub fn ldk(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let slot = (model.gpr(f.op2).low_u32() & 0xFF) as u8;
    let ty = ((f.immediate >> 8) & 0xF) as u8;
    let offset_base = (f.immediate & 0x1F) as u8;
    let mut words = [0u32; 8];
    let mut aborted = false;
    for (i, w) in words.iter_mut().enumerate() {
        if aborted {
            break;
        }
        let offset = offset_base.wrapping_mul(8).wrapping_add(i as u8);
        let word = model.pop_key();
        *w = word;
        model.report_change(Change::scalar(ChangeKind::Kbus, kbus_object(1, ty, slot, offset), 0, word));
        if model.pop_kbus_error() {
            model.set_flag_e(true);
            aborted = true;
        }
    }
    model.set_gpr(f.op1, U256::from_le_words(words));
    ControlEffect::Advance
}

pub fn stk(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let slot = (model.gpr(f.op2).low_u32() & 0xFF) as u8;
    let ty = ((f.immediate >> 8) & 0xF) as u8;
    let offset_base = (f.immediate & 0x1F) as u8;
    let words = model.gpr(f.op1).to_le_words();
    for (i, word) in words.iter().enumerate() {
        let offset = offset_base.wrapping_mul(8).wrapping_add(i as u8);
        model.report_change(Change::scalar(ChangeKind::Kbus, kbus_object(0, ty, slot, offset), 0, *word));
        if model.pop_kbus_error() {
            model.set_flag_e(true);
            break;
        }
    }
    ControlEffect::Advance
}

pub fn kbo(model: &mut CpuModel, f: Fields) -> ControlEffect {
    let op_nibble = (f.immediate & 0xF) as u8;
    let ty = ((f.immediate >> 8) & 0xF) as u8;
    let slot = (model.gpr(f.op2).low_u32() & 0xFF) as u8;
    let write_word = model.gpr(f.op1).low_u32();

    let keyop = KeyOp::from_nibble(op_nibble).unwrap_or(KeyOp::Flush);
    let err = match keyop {
        KeyOp::Write => model.keymem().write(ty, slot, 0, write_word),
        KeyOp::Read => model.keymem().read(ty, slot, 0).1,
        KeyOp::Program => model.keymem().program(ty, slot),
        KeyOp::Erase => model.keymem().erase(ty, slot),
        KeyOp::Verify => model.keymem().verify(ty, slot),
        KeyOp::Flush => model.keymem().flush(),
    };
    model.report_change(Change::scalar(ChangeKind::Kbus, kbus_object(op_nibble, ty, slot, 0), 0, 0));
    model.set_flag_e(err);
    ControlEffect::Advance
}

// ---- J-type control flow ----

pub fn call(model: &mut CpuModel, f: Fields) -> ControlEffect {
    model.rar_push(model.pc().wrapping_add(4));
    model.set_pc(f.new_pc);
    ControlEffect::Jumped
}

pub fn ret(model: &mut CpuModel, _f: Fields) -> ControlEffect {
    let pc = model.rar_pop();
    model.set_pc(pc);
    ControlEffect::Jumped
}

fn branch_if(model: &mut CpuModel, f: Fields, taken: bool) -> ControlEffect {
    if taken {
        model.set_pc(f.new_pc);
        ControlEffect::Jumped
    } else {
        ControlEffect::Advance
    }
}

pub fn brz(model: &mut CpuModel, f: Fields) -> ControlEffect {
    branch_if(model, f, model.flag_z())
}

pub fn brnz(model: &mut CpuModel, f: Fields) -> ControlEffect {
    branch_if(model, f, !model.flag_z())
}

pub fn brc(model: &mut CpuModel, f: Fields) -> ControlEffect {
    branch_if(model, f, model.flag_c())
}

pub fn brnc(model: &mut CpuModel, f: Fields) -> ControlEffect {
    branch_if(model, f, !model.flag_c())
}

pub fn bre(model: &mut CpuModel, f: Fields) -> ControlEffect {
    branch_if(model, f, model.flag_e())
}

pub fn brne(model: &mut CpuModel, f: Fields) -> ControlEffect {
    branch_if(model, f, !model.flag_e())
}

pub fn jmp(model: &mut CpuModel, f: Fields) -> ControlEffect {
    model.set_pc(f.new_pc);
    ControlEffect::Jumped
}

/// `END`: V1 additionally copies R31 into SRR before terminating (the
/// open question in spec.md §9 is resolved as: SRR exists in V2 but is
/// never written by `END`).
pub fn end(model: &mut CpuModel, _f: Fields, version: IsaVersion) -> ControlEffect {
    if version == IsaVersion::V1 {
        model.set_srr(model.modulus());
    }
    ControlEffect::Ended
}

pub fn nop(_model: &mut CpuModel, _f: Fields) -> ControlEffect {
    ControlEffect::Advance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::encoding::ParityMode;

    fn fresh(version: IsaVersion) -> CpuModel {
        CpuModel::new(version, ParityMode::None)
    }

    #[test]
    fn addp_reduces_modulo_r31() {
        let mut cpu = fresh(IsaVersion::V2);
        cpu.set_gpr(31, U256::from(17u64));
        cpu.set_gpr(2, U256::from(32u64));
        cpu.set_gpr(3, U256::from(30u64));
        addp(&mut cpu, Fields::r(0, 0, 1, 2, 3));
        assert_eq!(cpu.gpr(1), U256::from(11u64));
    }

    #[test]
    fn subp_avoids_underflow() {
        let mut cpu = fresh(IsaVersion::V2);
        cpu.set_gpr(31, U256::from(7u64));
        cpu.set_gpr(2, U256::from(5u64));
        cpu.set_gpr(3, U256::from(10u64));
        subp(&mut cpu, Fields::r(0, 0, 1, 2, 3));
        assert_eq!(cpu.gpr(1), U256::from(2u64));
    }

    #[test]
    fn v1_logic_passes_through_high_bits() {
        let mut cpu = fresh(IsaVersion::V1);
        cpu.set_gpr(2, U256::from_le_words([0xF0F0F0F0, 1, 2, 3, 4, 5, 6, 7]));
        cpu.set_gpr(3, U256::from(0x0F0F0F0Fu64));
        r_logic(&mut cpu, Fields::r(0, 0, 1, 2, 3), LogicOp::And, IsaVersion::V1);
        let words = cpu.gpr(1).to_le_words();
        assert_eq!(words[0], 0);
        assert_eq!(&words[1..], &[1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn v2_logic_is_full_width() {
        let mut cpu = fresh(IsaVersion::V2);
        cpu.set_gpr(2, U256::from_le_words([0xFFFFFFFF; 8]));
        cpu.set_gpr(3, U256::zero());
        r_logic(&mut cpu, Fields::r(0, 0, 1, 2, 3), LogicOp::And, IsaVersion::V2);
        assert!(cpu.flag_z());
    }

    #[test]
    fn grv_assembles_little_endian_from_queue() {
        let mut cpu = fresh(IsaVersion::V2);
        for w in [0x11111111u32, 0x22222222, 0x33333333, 0x44444444, 0x55555555, 0x66666666, 0x77777777, 0x88888888] {
            cpu.push_entropy(w);
        }
        grv(&mut cpu, Fields::r(0, 0, 1, 0, 0), IsaVersion::V2);
        assert_eq!(cpu.gpr(1).to_le_words()[0], 0x11111111);
        assert_eq!(cpu.gpr(1).to_le_words()[7], 0x88888888);
    }

    #[test]
    fn pack_be_u64s_orders_words_most_significant_first() {
        let reg = pack_be_u64s(&[1u64, 2, 3, 4]);
        let words = reg.to_le_words();
        assert_eq!(words[7], 0);
        assert_eq!(words[6], 1);
        assert_eq!(words[5], 0);
        assert_eq!(words[4], 2);
        assert_eq!(words[3], 0);
        assert_eq!(words[2], 3);
        assert_eq!(words[1], 0);
        assert_eq!(words[0], 4);
    }

    #[test]
    fn hash_splits_context_four_words_per_register() {
        let mut cpu = fresh(IsaVersion::V2);
        cpu.set_gpr(2, U256::from(1u64));
        cpu.set_gpr(3, U256::from(2u64));
        cpu.set_gpr(4, U256::from(3u64));
        cpu.set_gpr(5, U256::from(4u64));
        hash(&mut cpu, Fields::r(0, 0, 1, 2, 0));
        let expected = cpu.hash_engine().context();
        assert_eq!(cpu.gpr(1), pack_be_u64s(&expected[4..8]));
        assert_eq!(cpu.gpr(2), pack_be_u64s(&expected[0..4]));
    }

    #[test]
    fn tmac_up_absorbs_low_144_bits_not_high_144_bits() {
        // A bit set only in the top 112 bits (bit 200, above bit 143)
        // must not change the absorbed block versus an all-zero register.
        let mut hi = fresh(IsaVersion::V2);
        hi.set_gpr(2, U256::one() << 200);
        tmac_up(&mut hi, Fields::r(0, 0, 0, 2, 0));
        tmac_rd(&mut hi, Fields::r(0, 0, 1, 0, 0));

        let mut baseline = fresh(IsaVersion::V2);
        baseline.set_gpr(2, U256::zero());
        tmac_up(&mut baseline, Fields::r(0, 0, 0, 2, 0));
        tmac_rd(&mut baseline, Fields::r(0, 0, 1, 0, 0));

        assert_eq!(hi.gpr(1), baseline.gpr(1));

        // A bit inside the low 144 bits (bit 100) must change it.
        let mut low = fresh(IsaVersion::V2);
        low.set_gpr(2, U256::one() << 100);
        tmac_up(&mut low, Fields::r(0, 0, 0, 2, 0));
        tmac_rd(&mut low, Fields::r(0, 0, 1, 0, 0));
        assert_ne!(low.gpr(1), baseline.gpr(1));
    }

    #[test]
    fn ldk_reports_kbus_offsets_in_eight_word_blocks() {
        let mut cpu = fresh(IsaVersion::V2);
        cpu.set_change_reporting(true);
        cpu.set_gpr(2, U256::from(0u64));
        // immediate: type=0, offset_base=3 -> word offsets 24..32
        ldk(&mut cpu, Fields::i(0, 0, 1, 2, 3));
        let first = cpu.pop_change().unwrap();
        assert_eq!(first.object & 0xFF, 24);
        for expected_offset in 25u32..32 {
            let change = cpu.pop_change().unwrap();
            assert_eq!(change.object & 0xFF, expected_offset);
        }
    }

    #[test]
    fn call_then_ret_restores_rar_sp() {
        let mut cpu = fresh(IsaVersion::V2);
        cpu.set_pc(0x8000);
        call(&mut cpu, Fields::j(0, 0, 0x8100));
        assert_eq!(cpu.pc(), 0x8100);
        assert_eq!(cpu.rar_sp(), 1);
        ret(&mut cpu, Fields::j(0, 0, 0));
        assert_eq!(cpu.pc(), 0x8004);
        assert_eq!(cpu.rar_sp(), 0);
    }
}
