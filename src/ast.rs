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

//! Parse-tree types produced by [`crate::parser`] and consumed by
//! [`crate::assembler`]. The grammar (spec.md §4.4) is intentionally small:
//! a line carries at most one optional label, and at most one of a
//! directive or an instruction.

/// A numeric literal as it appeared in the source, before any symbol
/// substitution or width truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value {
    pub raw: i64,
    /// Number of significant bits the source literal actually spelled out,
    /// used only for overflow diagnostics (e.g. `0x1000` written with four
    /// hex digits vs. zero-padded to eight).
    pub bits_used: u32,
}

impl Value {
    pub fn new(raw: i64, bits_used: u32) -> Self {
        Self { raw, bits_used }
    }
}

/// One operand slot of an instruction: a register, a bare numeric value, or
/// an identifier (a label or a `.eq` constant — which one it resolves to is
/// decided later, by the symbol table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    Value(Value),
    Ident(String),
}

/// A raw, unresolved instruction as written in the source: a mnemonic plus
/// its operand list. The catalog (C5) is consulted in assembler pass 1 to
/// learn the expected operand count/shape for this mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstruction {
    pub mnemonic: String,
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    IfDef(String),
    Else,
    EndIf,
    Define(String),
    ConstDef { ident: String, value: Value },
    Include(String),
}

/// A single line of source, after parsing but before any preprocessing
/// (conditional compilation / `.include` expansion / constant folding).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLine {
    pub line_number: usize,
    pub label: Option<String>,
    pub directive: Option<Directive>,
    pub instruction: Option<RawInstruction>,
}
