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

//! One instruction record per assembled line: the resolved encoding
//! fields plus, where an operand was a bare identifier, a back-reference
//! into the symbol table carrying a width cap (spec.md §4.4 "Operand
//! parsing" / "Pass 2 (relocation)").

use crate::errors::SourcePos;
use crate::isa::encoding::InstrType;

/// Which field of the record a deferred symbol reference writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Immediate,
    Addr,
    NewPc,
}

#[derive(Debug, Clone)]
pub struct SymbolRef {
    pub ident: String,
    pub field: FieldKind,
    pub width_bits: u32,
}

pub struct InstructionRecord {
    pub pos: SourcePos,
    pub ty: InstrType,
    pub opcode: u8,
    pub func: u8,
    pub address: u16,
    pub op1: u8,
    pub op2: u8,
    pub op3: u8,
    pub immediate: u16,
    pub addr: u16,
    pub new_pc: u16,
    pub symbol_ref: Option<SymbolRef>,
}
