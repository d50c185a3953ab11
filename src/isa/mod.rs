//! C5 — InstructionCatalog. Per-ISA-version registry mapping mnemonic
//! <-> encoding <-> semantic transformer (spec.md §4.5). Per DESIGN
//! NOTES §9 ("version-parametric catalog"), a `Catalog` is plain data
//! carried by the model instance, not a process-global singleton —
//! two `Catalog`s (V1, V2) can coexist in the same process.

pub mod catalog_v1;
pub mod catalog_v2;
pub mod encoding;
pub mod semantics;

use crate::cpu::CpuModel;
use encoding::{Fields, InstrType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsaVersion {
    V1,
    V2,
}

/// What happened to the program counter after an instruction executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEffect {
    /// PC <- PC + 4.
    Advance,
    /// The instruction already set PC (a taken branch/call/ret/jmp).
    Jumped,
    /// Program termination (`END`).
    Ended,
}

pub type ExecuteFn = fn(&mut CpuModel, Fields) -> ControlEffect;

/// The `r[31:17]`/operand mask bits from spec.md §4.4: one bit per
/// positional operand slot (op1, op2, op3), set when that slot is
/// required in the source text for this mnemonic.
pub const MASK_OP1: u8 = 0b100;
pub const MASK_OP2: u8 = 0b010;
pub const MASK_OP3: u8 = 0b001;

#[derive(Clone, Copy)]
pub struct CatalogEntry {
    pub mnemonic: &'static str,
    pub ty: InstrType,
    pub opcode: u8,
    pub func: u8,
    pub operand_mask: u8,
    pub r31_dependent: bool,
    pub constant_time: bool,
    pub execute: ExecuteFn,
}

#[derive(Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog { entries: Vec::new() }
    }

    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    pub fn by_mnemonic(&self, mnemonic: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.mnemonic.eq_ignore_ascii_case(mnemonic))
    }

    pub fn by_fields(&self, ty: InstrType, opcode: u8, func: u8) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.ty == ty && e.opcode == opcode && e.func == func)
    }
}

pub fn catalog_for(version: IsaVersion) -> Catalog {
    match version {
        IsaVersion::V1 => catalog_v1::build(),
        IsaVersion::V2 => catalog_v2::build(),
    }
}
