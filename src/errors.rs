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

use std::path::PathBuf;
use thiserror::Error;

/// A source position: which logical file and which 1-based line within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePos {
    pub file: PathBuf,
    pub line: usize,
}

impl SourcePos {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl std::fmt::Display for SourcePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Fatal assembler errors. Every fallible assembler routine returns one of
/// these (or a success); the CLI front end is the only thing that formats
/// them for a human.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Syntax error in {pos}: {reason}")]
    Syntax { pos: SourcePos, reason: String },

    #[error("{pos}: {reason}")]
    Structural { pos: SourcePos, reason: String },

    #[error("{pos}: duplicate definition of symbol \"{ident}\" (first defined at {first_pos})")]
    DuplicateSymbol {
        ident: String,
        pos: SourcePos,
        first_pos: SourcePos,
    },

    #[error("{use_pos}: undefined symbol \"{ident}\" (first referenced at {use_pos})")]
    UndefinedSymbol { ident: String, use_pos: SourcePos },

    #[error(
        "assembly ran past the end of instruction memory at {pos} (address 0x{addr:04x})"
    )]
    NotEnoughSpace { pos: SourcePos, addr: u32 },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::sync::Arc<std::io::Error>,
    },
}

/// Non-fatal assembler diagnostics: assembly still produces an output, but
/// the caller should surface these to the user (spec.md §7: "warn +
/// truncate; continue").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyWarning {
    ValueOverflow {
        pos: SourcePos,
        value: i64,
        field_bits: u32,
    },
    LabelUsedAsImmediate {
        pos: SourcePos,
        ident: String,
    },
}

impl std::fmt::Display for AssemblyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssemblyWarning::ValueOverflow {
                pos,
                value,
                field_bits,
            } => write!(
                f,
                "{pos}: value 0x{value:x} overflows {field_bits}-bit field, truncating"
            ),
            AssemblyWarning::LabelUsedAsImmediate { pos, ident } => write!(
                f,
                "{pos}: label \"{ident}\" used as an immediate value, not a jump/addr target"
            ),
        }
    }
}
