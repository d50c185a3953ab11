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

//! `spect-core`: assembler and instruction-set simulator core for
//! SPECT, a 32-register 256-bit cryptographic processor. See `spec.md`
//! / `SPEC_FULL.md` for the governing specification.

pub mod assembler;
pub mod ast;
pub mod cpu;
pub mod errors;
pub mod file_reader;
pub mod isa;
pub mod parser;

use std::path::Path;

use anyhow::{Context, Result};

use assembler::preprocessor;
use assembler::source_file::SourceFiles;
use assembler::symbol_table::SymbolTable;
use cpu::CpuModel;
use errors::AssemblyWarning;
use file_reader::FileReader;
use isa::encoding::ParityMode;
use isa::{catalog_for, IsaVersion};

/// Assembles `source_path` (and any files it `.include`s, via `reader`)
/// into `cpu`'s INSTR_MEM starting at `first_addr`, using the
/// instruction catalog for `version` and the given `parity_mode`
/// (spec.md §4.4). Returns the non-fatal warnings collected along the
/// way ("warn + truncate; continue", §7); fatal errors are returned as
/// `Err`.
pub fn assemble<F: FileReader>(
    source_path: &Path,
    first_addr: u16,
    version: IsaVersion,
    parity_mode: ParityMode,
    reader: &F,
    cpu: &mut CpuModel,
) -> Result<Vec<AssemblyWarning>> {
    let mut sources = SourceFiles::new();
    let lines = preprocessor::expand(source_path, reader, &mut sources)
        .context("failed while preprocessing source (parsing / .include expansion)")?;

    let catalog = catalog_for(version);
    let mut symbols = SymbolTable::new();
    let mut warnings = Vec::new();

    let records = assembler::build_records(&lines, first_addr, &catalog, &mut symbols, &mut warnings)
        .context("failed during assembler pass 1 (symbol table / instruction records)")?;

    let pass2_warnings = assembler::resolve_and_emit(&records, &symbols, cpu, parity_mode)
        .context("failed during assembler pass 2 (symbol relocation / emission)")?;
    warnings.extend(pass2_warnings);

    Ok(warnings)
}
