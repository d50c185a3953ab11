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

//! Black-box end-to-end tests for the scenarios in spec.md §8, driven
//! entirely through the public `assemble()` + `CpuModel` API.

use spect_core::assemble;
use spect_core::cpu::wide_int::U256;
use spect_core::cpu::CpuModel;
use spect_core::file_reader::MockFileReader;
use spect_core::isa::encoding::ParityMode;
use spect_core::isa::IsaVersion;
use std::path::Path;

const FIRST_ADDR: u16 = 0x8000;

fn run_program(source: &str, version: IsaVersion, parity: ParityMode) -> CpuModel {
    let mut reader = MockFileReader::default();
    reader.add_file("main.asm", source);
    let mut cpu = CpuModel::new(version, parity);
    let warnings = assemble(Path::new("main.asm"), FIRST_ADDR, version, parity, &reader, &mut cpu)
        .expect("assembly should succeed");
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    cpu.set_start_pc(FIRST_ADDR);
    cpu.run_until_end();
    cpu
}

#[test]
fn scenario_a_load_store_round_trip_v2() {
    let source = "\
_start:  MOVI R1, 0x123\n\
         MOVI R2, 0x200\n\
         STR  R1, R2\n\
         LDR  R3, R2\n\
         END\n";
    let cpu = run_program(source, IsaVersion::V2, ParityMode::None);
    assert!(cpu.is_finished());
    assert_eq!(cpu.gpr(3).to_le_words()[0], 0x123);
    assert_eq!(&cpu.gpr(3).to_le_words()[1..], &[0u32; 7]);
    assert_eq!(cpu.read_core_data(0x200), 0x123);
}

#[test]
fn scenario_b_call_ret_balance() {
    let source = "\
_start: CALL sub\n\
        END\n\
sub:    MOVI R1, 1\n\
        RET\n";
    let cpu = run_program(source, IsaVersion::V2, ParityMode::None);
    assert!(cpu.is_finished());
    assert_eq!(cpu.gpr(1).to_le_words()[0], 1);
    assert_eq!(cpu.rar_sp(), 0);
}

#[test]
fn scenario_c_modular_reduction() {
    let source = "ADDP R1, R2, R3\nEND\n";
    let mut reader = MockFileReader::default();
    reader.add_file("main.asm", source);
    let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
    assemble(
        Path::new("main.asm"),
        FIRST_ADDR,
        IsaVersion::V2,
        ParityMode::None,
        &reader,
        &mut cpu,
    )
    .unwrap();
    cpu.set_gpr(31, U256::from(0x11u64));
    cpu.set_gpr(2, U256::from(0x20u64));
    cpu.set_gpr(3, U256::from(0x1Eu64));
    cpu.set_start_pc(FIRST_ADDR);
    cpu.run_until_end();
    assert_eq!(cpu.gpr(1), U256::from(0x0Bu64));
}

#[test]
fn scenario_d_grv_with_entropy_queue() {
    let source = "GRV R1\nEND\n";
    let mut reader = MockFileReader::default();
    reader.add_file("main.asm", source);
    let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
    assemble(
        Path::new("main.asm"),
        FIRST_ADDR,
        IsaVersion::V2,
        ParityMode::None,
        &reader,
        &mut cpu,
    )
    .unwrap();
    for w in [
        0x11111111u32, 0x22222222, 0x33333333, 0x44444444, 0x55555555, 0x66666666, 0x77777777,
        0x88888888,
    ] {
        cpu.push_entropy(w);
    }
    cpu.set_start_pc(FIRST_ADDR);
    cpu.run_until_end();
    let words = cpu.gpr(1).to_le_words();
    assert_eq!(words[0], 0x11111111);
    assert_eq!(words[7], 0x88888888);
}

#[test]
fn scenario_e_conditional_compile() {
    let source = "\
.define A\n\
.ifdef A\n\
   MOVI R1, 1\n\
.else\n\
   MOVI R1, 2\n\
.endif\n\
END\n";
    let cpu = run_program(source, IsaVersion::V2, ParityMode::None);
    assert_eq!(cpu.gpr(1).to_le_words()[0], 1);
}

#[test]
fn scenario_f_parity_round_trip() {
    let source = "\
_start:  MOVI R1, 0x123\n\
         MOVI R2, 0x200\n\
         STR  R1, R2\n\
         LDR  R3, R2\n\
         END\n";
    for parity in [ParityMode::None, ParityMode::Odd, ParityMode::Even] {
        let cpu = run_program(source, IsaVersion::V2, parity);
        assert_eq!(cpu.gpr(3).to_le_words()[0], 0x123, "mismatch under parity {parity:?}");
    }
}

#[test]
fn value_overflow_warning_truncates_but_still_assembles() {
    let source = "MOVI R1, 0x1000\nEND\n";
    let mut reader = MockFileReader::default();
    reader.add_file("main.asm", source);
    let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
    let warnings = assemble(
        Path::new("main.asm"),
        FIRST_ADDR,
        IsaVersion::V2,
        ParityMode::None,
        &reader,
        &mut cpu,
    )
    .unwrap();
    assert_eq!(warnings.len(), 1);
    cpu.set_start_pc(FIRST_ADDR);
    cpu.run_until_end();
    assert_eq!(cpu.gpr(1).to_le_words()[0], 0);
}

#[test]
fn not_enough_space_is_reported_near_instr_mem_end() {
    let source = "NOP\nNOP\nNOP\n";
    let mut reader = MockFileReader::default();
    reader.add_file("main.asm", source);
    let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
    let err = assemble(
        Path::new("main.asm"),
        0xAFFC,
        IsaVersion::V2,
        ParityMode::None,
        &reader,
        &mut cpu,
    )
    .unwrap_err();
    let msg = format!("{err:#}").to_lowercase();
    assert!(msg.contains("space") || msg.contains("instr_mem"));
}

#[test]
fn include_directive_pulls_in_a_second_file() {
    let mut reader = MockFileReader::default();
    reader.add_file("main.asm", ".include \"helper.asm\"\nEND\n");
    reader.add_file("helper.asm", "MOVI R1, 7\n");
    let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
    assemble(
        Path::new("main.asm"),
        FIRST_ADDR,
        IsaVersion::V2,
        ParityMode::None,
        &reader,
        &mut cpu,
    )
    .unwrap();
    cpu.set_start_pc(FIRST_ADDR);
    cpu.run_until_end();
    assert_eq!(cpu.gpr(1).to_le_words()[0], 7);
}
