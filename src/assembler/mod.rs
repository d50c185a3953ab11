/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! C4 — Assembler. Two-pass assembly over the flattened, preprocessed
//! line stream (spec.md §4.4): pass 1 walks the instruction stream
//! building the symbol table and per-instruction records; pass 2
//! resolves deferred symbol references and emits encoded words into
//! the target [`CpuModel`]'s INSTR_MEM.

pub mod preprocessor;
pub mod records;
pub mod source_file;
pub mod symbol_table;

use crate::ast::Operand;
use crate::cpu::memory::{region_of, Region};
use crate::cpu::CpuModel;
use crate::errors::{AssemblyError, AssemblyWarning, SourcePos};
use crate::isa::encoding::{encode, Fields, InstrType, ParityMode};
use crate::isa::{Catalog, CatalogEntry, MASK_OP1, MASK_OP2, MASK_OP3};
use preprocessor::ExpandedLine;
use records::{FieldKind, InstructionRecord, SymbolRef};
use symbol_table::{SymbolKind, SymbolTable};

const INSTR_MEM_END: u16 = 0xAFFF;

/// Pass 1: walks the preprocessed line stream, building the symbol
/// table (labels and `.eq` constants get addresses/values immediately)
/// and one [`InstructionRecord`] per instruction. Operand identifiers
/// that aren't yet defined become unresolved symbol references,
/// carried forward to pass 2.
pub fn build_records(
    lines: &[ExpandedLine],
    first_addr: u16,
    catalog: &Catalog,
    symbols: &mut SymbolTable,
    warnings: &mut Vec<AssemblyWarning>,
) -> Result<Vec<InstructionRecord>, AssemblyError> {
    let mut records = Vec::new();
    let mut addr = first_addr;

    if region_of(addr) != Region::InstrMem {
        return Err(AssemblyError::Structural {
            pos: lines
                .first()
                .map(|l| l.pos.clone())
                .unwrap_or_else(|| SourcePos::new("", 0)),
            reason: format!("first address 0x{addr:04x} does not lie inside INSTR_MEM"),
        });
    }

    for line in lines {
        if let Some(label) = &line.label {
            define_symbol(symbols, label, SymbolKind::Label, addr as i64, line.pos.clone())?;
        }
        if let Some((ident, value)) = &line.constdef {
            define_symbol(symbols, ident, SymbolKind::Constant, value.raw, line.pos.clone())?;
        }
        if let Some(instr) = &line.instruction {
            if region_of(addr) != Region::InstrMem || addr > INSTR_MEM_END - 3 {
                return Err(AssemblyError::NotEnoughSpace {
                    pos: line.pos.clone(),
                    addr: addr as u32,
                });
            }
            let entry = catalog.by_mnemonic(&instr.mnemonic).ok_or_else(|| AssemblyError::Structural {
                pos: line.pos.clone(),
                reason: format!("unknown mnemonic \"{}\"", instr.mnemonic),
            })?;
            let record = build_record(entry, instr, addr, &line.pos, symbols, warnings)?;
            records.push(record);
            addr = addr.wrapping_add(4);
        }
    }

    Ok(records)
}

/// Defines a label or `.eq` constant at its definition point. If an
/// earlier forward reference already created an unresolved placeholder
/// (via `add_unresolved`), fills it in through `SymbolTable::resolve`;
/// otherwise (first mention is the definition itself, or the identifier
/// is already resolved and this is a redefinition) defers to
/// `add_resolved`, which also performs the duplicate-definition check.
fn define_symbol(
    symbols: &mut SymbolTable,
    ident: &str,
    kind: SymbolKind,
    value: i64,
    pos: SourcePos,
) -> Result<(), AssemblyError> {
    if symbols.lookup(ident).is_some_and(|s| !s.resolved) {
        symbols.resolve(ident, kind, value);
        Ok(())
    } else {
        symbols.add_resolved(ident, kind, value, pos)
    }
}

fn register_slots(mask: u8) -> Vec<u8> {
    let mut slots = Vec::new();
    if mask & MASK_OP1 != 0 {
        slots.push(1);
    }
    if mask & MASK_OP2 != 0 {
        slots.push(2);
    }
    if mask & MASK_OP3 != 0 {
        slots.push(3);
    }
    slots
}

/// Whether this catalog entry takes one trailing value/symbol operand
/// beyond its register slots. True for every I/M-type entry; for
/// J-type, true except for the zero-operand control instructions —
/// J-type entries carry no operand mask (their register fields are
/// always unused), so this is the one place the assembler special-cases
/// by mnemonic, an Open Question resolution recorded in DESIGN.md.
fn takes_trailing_operand(entry: &CatalogEntry) -> bool {
    match entry.ty {
        InstrType::R => false,
        InstrType::I | InstrType::M => true,
        InstrType::J => !matches!(entry.mnemonic, "RET" | "END" | "NOP"),
    }
}

fn build_record(
    entry: &CatalogEntry,
    instr: &crate::ast::RawInstruction,
    address: u16,
    pos: &SourcePos,
    symbols: &mut SymbolTable,
    warnings: &mut Vec<AssemblyWarning>,
) -> Result<InstructionRecord, AssemblyError> {
    let reg_slots = register_slots(entry.operand_mask);
    let trailing = takes_trailing_operand(entry);
    let expected = reg_slots.len() + trailing as usize;

    if instr.operands.len() != expected {
        return Err(AssemblyError::Structural {
            pos: pos.clone(),
            reason: format!(
                "\"{}\" expects {expected} operand(s), found {}",
                entry.mnemonic,
                instr.operands.len()
            ),
        });
    }

    let mut op1 = 0u8;
    let mut op2 = 0u8;
    let mut op3 = 0u8;
    for (idx, slot) in reg_slots.iter().enumerate() {
        let reg = match &instr.operands[idx] {
            Operand::Register(r) => *r,
            _ => {
                return Err(AssemblyError::Structural {
                    pos: pos.clone(),
                    reason: format!(
                        "\"{}\" operand {} must be a register",
                        entry.mnemonic,
                        idx + 1
                    ),
                });
            }
        };
        match slot {
            1 => op1 = reg,
            2 => op2 = reg,
            3 => op3 = reg,
            _ => unreachable!("register_slots only yields 1..=3"),
        }
    }

    let mut immediate = 0u16;
    let mut addr_field = 0u16;
    let mut new_pc = 0u16;
    let mut symbol_ref = None;

    if trailing {
        let (field, width_bits) = match entry.ty {
            InstrType::I => (FieldKind::Immediate, 12u32),
            InstrType::M => (FieldKind::Addr, 16u32),
            InstrType::J => (FieldKind::NewPc, 16u32),
            InstrType::R => unreachable!("R-type never takes a trailing operand"),
        };
        match &instr.operands[reg_slots.len()] {
            Operand::Value(v) => {
                let mask = (1u64 << width_bits) - 1;
                let truncated = (v.raw as u64 & mask) as u16;
                if v.bits_used > width_bits {
                    warnings.push(AssemblyWarning::ValueOverflow {
                        pos: pos.clone(),
                        value: v.raw,
                        field_bits: width_bits,
                    });
                }
                match field {
                    FieldKind::Immediate => immediate = truncated,
                    FieldKind::Addr => addr_field = truncated,
                    FieldKind::NewPc => new_pc = truncated,
                }
            }
            Operand::Ident(ident) => {
                symbols.add_unresolved(ident, pos.clone());
                symbol_ref = Some(SymbolRef {
                    ident: ident.clone(),
                    field,
                    width_bits,
                });
            }
            Operand::Register(_) => {
                return Err(AssemblyError::Structural {
                    pos: pos.clone(),
                    reason: format!(
                        "\"{}\" trailing operand must be a value or symbol",
                        entry.mnemonic
                    ),
                });
            }
        }
    }

    Ok(InstructionRecord {
        pos: pos.clone(),
        ty: entry.ty,
        opcode: entry.opcode,
        func: entry.func,
        address,
        op1,
        op2,
        op3,
        immediate,
        addr: addr_field,
        new_pc,
        symbol_ref,
    })
}

/// Pass 2: resolves every record's deferred symbol reference, encodes
/// the final word, and writes it into `cpu`'s INSTR_MEM via the AHB
/// write path (spec.md §4.4 "Assembly output").
pub fn resolve_and_emit(
    records: &[InstructionRecord],
    symbols: &SymbolTable,
    cpu: &mut CpuModel,
    parity_mode: ParityMode,
) -> Result<Vec<AssemblyWarning>, AssemblyError> {
    let mut warnings = Vec::new();

    for record in records {
        let mut immediate = record.immediate;
        let mut addr = record.addr;
        let mut new_pc = record.new_pc;

        if let Some(symref) = &record.symbol_ref {
            let symbol = symbols.lookup(&symref.ident).filter(|s| s.resolved).ok_or_else(|| {
                AssemblyError::UndefinedSymbol {
                    ident: symref.ident.clone(),
                    use_pos: record.pos.clone(),
                }
            })?;

            if symref.field == FieldKind::Immediate && symbol.kind == SymbolKind::Label {
                warnings.push(AssemblyWarning::LabelUsedAsImmediate {
                    pos: record.pos.clone(),
                    ident: symref.ident.clone(),
                });
            }

            let mask = (1u64 << symref.width_bits) - 1;
            let truncated = (symbol.value as u64 & mask) as u16;
            if (symbol.value as u64) & !mask != 0 {
                warnings.push(AssemblyWarning::ValueOverflow {
                    pos: record.pos.clone(),
                    value: symbol.value,
                    field_bits: symref.width_bits,
                });
            }
            match symref.field {
                FieldKind::Immediate => immediate = truncated,
                FieldKind::Addr => addr = truncated,
                FieldKind::NewPc => new_pc = truncated,
            }
        }

        let fields = match record.ty {
            InstrType::R => Fields::r(record.opcode, record.func, record.op1, record.op2, record.op3),
            InstrType::I => Fields::i(record.opcode, record.func, record.op1, record.op2, immediate),
            InstrType::M => Fields::m(record.opcode, record.func, record.op1, addr),
            InstrType::J => Fields::j(record.opcode, record.func, new_pc),
        };
        let word = encode(&fields, parity_mode);
        cpu.write_ahb(record.address, word);
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{catalog_for, IsaVersion};

    fn line(pos_line: usize, label: Option<&str>, mnemonic: &str, operands: Vec<Operand>) -> ExpandedLine {
        ExpandedLine {
            pos: SourcePos::new("t.asm", pos_line),
            label: label.map(str::to_string),
            instruction: Some(crate::ast::RawInstruction {
                mnemonic: mnemonic.to_string(),
                operands,
            }),
            constdef: None,
        }
    }

    #[test]
    fn forward_label_reference_resolves_in_pass_two() {
        let catalog = catalog_for(IsaVersion::V2);
        let lines = vec![
            line(1, None, "BRZ", vec![Operand::Ident("END_LBL".to_string())]),
            line(2, Some("END_LBL"), "END", vec![]),
        ];
        let mut symbols = SymbolTable::new();
        let mut warnings = Vec::new();
        let records = build_records(&lines, 0x8000, &catalog, &mut symbols, &mut warnings).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].address, 0x8004);

        let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
        let warnings = resolve_and_emit(&records, &symbols, &mut cpu, ParityMode::None).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(cpu.fetch(0x8004), encode(&Fields::j(records[1].opcode, records[1].func, 0), ParityMode::None));
    }

    #[test]
    fn undefined_symbol_is_an_error() {
        let catalog = catalog_for(IsaVersion::V2);
        let lines = vec![line(1, None, "BRZ", vec![Operand::Ident("NOWHERE".to_string())])];
        let mut symbols = SymbolTable::new();
        let mut warnings = Vec::new();
        let records = build_records(&lines, 0x8000, &catalog, &mut symbols, &mut warnings).unwrap();
        let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
        let err = resolve_and_emit(&records, &symbols, &mut cpu, ParityMode::None).unwrap_err();
        assert!(matches!(err, AssemblyError::UndefinedSymbol { .. }));
    }

    #[test]
    fn duplicate_label_definition_is_an_error() {
        let catalog = catalog_for(IsaVersion::V2);
        let lines = vec![
            line(1, Some("L"), "NOP", vec![]),
            line(2, Some("L"), "END", vec![]),
        ];
        let mut symbols = SymbolTable::new();
        let mut warnings = Vec::new();
        let err = build_records(&lines, 0x8000, &catalog, &mut symbols, &mut warnings).unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicateSymbol { .. }));
    }

    #[test]
    fn forward_reference_resolves_through_resolve_not_overwrite() {
        let catalog = catalog_for(IsaVersion::V2);
        let lines = vec![
            line(1, None, "BRZ", vec![Operand::Ident("L".to_string())]),
            line(2, Some("L"), "NOP", vec![]),
        ];
        let mut symbols = SymbolTable::new();
        let mut warnings = Vec::new();
        build_records(&lines, 0x8000, &catalog, &mut symbols, &mut warnings).unwrap();
        let sym = symbols.lookup("L").unwrap();
        assert!(sym.resolved);
        assert_eq!(sym.value, 0x8004);
        assert_eq!(sym.kind, SymbolKind::Label);
    }

    #[test]
    fn running_past_instr_mem_end_is_not_enough_space() {
        let catalog = catalog_for(IsaVersion::V2);
        let lines = vec![line(1, None, "NOP", vec![])];
        let mut symbols = SymbolTable::new();
        let mut warnings = Vec::new();
        let err = build_records(&lines, 0xAFFE, &catalog, &mut symbols, &mut warnings).unwrap_err();
        assert!(matches!(err, AssemblyError::NotEnoughSpace { .. }));
    }
}
