//! V2 instruction catalog — the authoritative ISA version for most
//! semantic families (spec.md §4.5).

use super::encoding::InstrType;
use super::semantics::{self, ArithOp, LogicOp};
use super::{Catalog, CatalogEntry, IsaVersion, MASK_OP1, MASK_OP2, MASK_OP3};

#[derive(Default)]
struct Counters {
    r: (u8, u8),
    i: (u8, u8),
    m: (u8, u8),
    j: (u8, u8),
}

impl Counters {
    fn next(&mut self, ty: InstrType) -> (u8, u8) {
        let slot = match ty {
            InstrType::R => &mut self.r,
            InstrType::I => &mut self.i,
            InstrType::M => &mut self.m,
            InstrType::J => &mut self.j,
        };
        let current = *slot;
        slot.1 += 1;
        if slot.1 > 7 {
            slot.1 = 0;
            slot.0 += 1;
        }
        current
    }
}

pub fn build() -> Catalog {
    let mut catalog = Catalog::new();
    let mut c = Counters::default();

    macro_rules! push {
        ($mnemonic:expr, $ty:expr, $mask:expr, $r31:expr, $ct:expr, $exec:expr) => {{
            let (opcode, func) = c.next($ty);
            catalog.push(CatalogEntry {
                mnemonic: $mnemonic,
                ty: $ty,
                opcode,
                func,
                operand_mask: $mask,
                r31_dependent: $r31,
                constant_time: $ct,
                execute: $exec,
            });
        }};
    }

    push!("ADD", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, |m, f| {
        semantics::r_arith(m, f, ArithOp::Add, true)
    });
    push!("SUB", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, |m, f| {
        semantics::r_arith(m, f, ArithOp::Sub, true)
    });
    push!("CMP", InstrType::R, MASK_OP2 | MASK_OP3, false, false, |m, f| {
        semantics::r_arith(m, f, ArithOp::Sub, false)
    });
    push!("AND", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, |m, f| {
        semantics::r_logic(m, f, LogicOp::And, IsaVersion::V2)
    });
    push!("OR", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, |m, f| {
        semantics::r_logic(m, f, LogicOp::Or, IsaVersion::V2)
    });
    push!("XOR", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, |m, f| {
        semantics::r_logic(m, f, LogicOp::Xor, IsaVersion::V2)
    });
    push!("NOT", InstrType::R, MASK_OP1 | MASK_OP2, false, false, |m, f| {
        semantics::not_op(m, f, IsaVersion::V2)
    });
    push!("SBIT", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, |m, f| {
        semantics::bit_op(m, f, true)
    });
    push!("CBIT", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, |m, f| {
        semantics::bit_op(m, f, false)
    });
    push!("LSL", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::lsl);
    push!("LSR", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::lsr);
    push!("ROL", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::rol);
    push!("ROR", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::ror);
    push!("ROL8", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::rol8);
    push!("ROR8", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::ror8);
    push!("ROLIN", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, semantics::rolin);
    push!("RORIN", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, false, semantics::rorin);
    push!("SWE", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::swe);
    push!("MOV", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::mov);
    push!("LDR", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::ldr);
    push!("STR", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::str_);
    push!("CSWAP", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::cswap);
    push!("ZSWAP", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::zswap);
    push!("HASH", InstrType::R, MASK_OP1 | MASK_OP2, false, false, semantics::hash);
    push!("HASH_IT", InstrType::R, 0, false, false, semantics::hash_it);
    push!("TMAC_IT", InstrType::R, 0, false, false, semantics::tmac_it);
    push!("TMAC_IS", InstrType::R, MASK_OP2, false, false, semantics::tmac_is);
    push!("TMAC_UP", InstrType::R, MASK_OP2, false, false, semantics::tmac_up);
    push!("TMAC_RD", InstrType::R, MASK_OP1, false, false, semantics::tmac_rd);
    push!("GRV", InstrType::R, MASK_OP1, false, false, |m, f| {
        semantics::grv(m, f, IsaVersion::V2)
    });
    push!("SCB", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, true, true, semantics::scb);
    push!("MUL25519", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, true, semantics::mul25519);
    push!("MUL256", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, false, true, semantics::mul256);
    push!("ADDP", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, true, true, semantics::addp);
    push!("SUBP", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, true, true, semantics::subp);
    push!("MULP", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, true, true, semantics::mulp);
    push!("REDP", InstrType::R, MASK_OP1 | MASK_OP2 | MASK_OP3, true, true, semantics::redp);

    push!("ADDI", InstrType::I, MASK_OP1 | MASK_OP2, false, false, |m, f| {
        semantics::i_arith(m, f, ArithOp::Add, true)
    });
    push!("SUBI", InstrType::I, MASK_OP1 | MASK_OP2, false, false, |m, f| {
        semantics::i_arith(m, f, ArithOp::Sub, true)
    });
    push!("CMPI", InstrType::I, MASK_OP2, false, false, |m, f| {
        semantics::i_arith(m, f, ArithOp::Sub, false)
    });
    push!("ANDI", InstrType::I, MASK_OP1 | MASK_OP2, false, false, |m, f| {
        semantics::i_logic(m, f, LogicOp::And, IsaVersion::V2)
    });
    push!("ORI", InstrType::I, MASK_OP1 | MASK_OP2, false, false, |m, f| {
        semantics::i_logic(m, f, LogicOp::Or, IsaVersion::V2)
    });
    push!("XORI", InstrType::I, MASK_OP1 | MASK_OP2, false, false, |m, f| {
        semantics::i_logic(m, f, LogicOp::Xor, IsaVersion::V2)
    });
    push!("MOVI", InstrType::I, MASK_OP1, false, false, semantics::movi);
    push!("LDK", InstrType::I, MASK_OP1 | MASK_OP2, false, false, semantics::ldk);
    push!("STK", InstrType::I, MASK_OP1 | MASK_OP2, false, false, semantics::stk);
    push!("KBO", InstrType::I, MASK_OP1 | MASK_OP2, false, false, semantics::kbo);

    push!("LD", InstrType::M, MASK_OP1, false, false, semantics::ld_m);
    push!("ST", InstrType::M, MASK_OP1, false, false, semantics::st_m);

    push!("CALL", InstrType::J, 0, false, false, semantics::call);
    push!("RET", InstrType::J, 0, false, false, semantics::ret);
    push!("BRZ", InstrType::J, 0, false, false, semantics::brz);
    push!("BRNZ", InstrType::J, 0, false, false, semantics::brnz);
    push!("BRC", InstrType::J, 0, false, false, semantics::brc);
    push!("BRNC", InstrType::J, 0, false, false, semantics::brnc);
    push!("BRE", InstrType::J, 0, false, false, semantics::bre);
    push!("BRNE", InstrType::J, 0, false, false, semantics::brne);
    push!("JMP", InstrType::J, 0, false, false, semantics::jmp);
    push!("END", InstrType::J, 0, false, false, |m, f| semantics::end(m, f, IsaVersion::V2));
    push!("NOP", InstrType::J, 0, false, false, semantics::nop);

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_has_keccak_and_ldk() {
        let catalog = build();
        assert!(catalog.by_mnemonic("TMAC_RD").is_some());
        assert!(catalog.by_mnemonic("LDK").is_some());
        assert!(catalog.by_mnemonic("GPK").is_none());
    }
}
