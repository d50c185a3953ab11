//! C6 — CpuModel. Owns all architectural state (registers, flags, PC,
//! RAR stack, flat memory, hash/sponge contexts, config-register
//! block, queues) and the fetch-decode-execute loop (spec.md §4.6).

pub mod change_stream;
pub mod context;
pub mod hash_engine;
pub mod keccak_sponge;
pub mod keymem;
pub mod memory;
pub mod wide_int;

use std::collections::VecDeque;

use crate::isa::encoding::{decode, DecodeError, ParityMode};
use crate::isa::{catalog_for, Catalog, ControlEffect, IsaVersion};
use change_stream::{Change, ChangeKind, ChangeStream};
use context::ModelContext;
use hash_engine::HashEngine;
use keccak_sponge::KeccakSponge;
use keymem::KeyMemory;
use memory::Memory;
use wide_int::U256;

pub const RAR_DEPTH: usize = 5;
const STATUS_ADDR: u16 = 0x2000;
const COMMAND_ADDR: u16 = 0x2004;
const INT_ENA_ADDR: u16 = 0x2008;

pub struct CpuModel {
    version: IsaVersion,
    catalog: Catalog,
    parity_mode: ParityMode,
    gpr: [U256; 32],
    srr: U256,
    flag_z: bool,
    flag_c: bool,
    flag_e: bool,
    pc: u16,
    rar: [u16; RAR_DEPTH],
    rar_sp: usize,
    memory: Memory,
    hash: HashEngine,
    keccak: KeccakSponge,
    keymem: KeyMemory,
    entropy_queue: VecDeque<u32>,
    key_queue: VecDeque<u32>,
    kbus_error_queue: VecDeque<bool>,
    changes: ChangeStream,
    finished: bool,
    last_int: u32,
}

impl CpuModel {
    pub fn new(version: IsaVersion, parity_mode: ParityMode) -> Self {
        CpuModel {
            version,
            catalog: catalog_for(version),
            parity_mode,
            gpr: [U256::zero(); 32],
            srr: U256::zero(),
            flag_z: false,
            flag_c: false,
            flag_e: false,
            pc: 0,
            rar: [0; RAR_DEPTH],
            rar_sp: 0,
            memory: Memory::new(),
            hash: HashEngine::new(),
            keccak: KeccakSponge::new(),
            keymem: KeyMemory::new(),
            entropy_queue: VecDeque::new(),
            key_queue: VecDeque::new(),
            kbus_error_queue: VecDeque::new(),
            changes: ChangeStream::new(),
            finished: false,
            last_int: 0,
        }
    }

    pub fn version(&self) -> IsaVersion {
        self.version
    }

    /// `reset()`: zero registers, clear flags, SRR, RAR and its SP,
    /// hash/sponge state, and config registers; memory is untouched
    /// (matches HW uninitialized-SRAM behavior, spec.md §3 "Lifecycles").
    pub fn reset(&mut self) {
        for i in 0..32 {
            self.set_gpr(i as u8, U256::zero());
        }
        self.set_srr(U256::zero());
        self.set_flag_z(false);
        self.set_flag_c(false);
        self.set_flag_e(false);
        self.pc = 0;
        self.rar = [0; RAR_DEPTH];
        self.rar_sp = 0;
        self.hash.reset();
        self.keccak = KeccakSponge::new();
        self.finished = false;
    }

    pub fn set_start_pc(&mut self, addr: u16) {
        self.pc = addr;
    }

    pub fn start(&mut self) {
        self.finished = false;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn run_until_end(&mut self) {
        self.step(u64::MAX);
    }

    /// Executes at most `max_instr_cnt` instructions, or until `END`.
    /// On budget exhaustion the interpreter returns without setting
    /// `finished` (spec.md §5 "Cancellation / timeouts").
    pub fn step(&mut self, max_instr_cnt: u64) {
        let mut executed = 0u64;
        while !self.finished && executed < max_instr_cnt {
            self.step_one();
            executed += 1;
        }
    }

    fn step_one(&mut self) {
        let word = self.memory.fetch(self.pc);
        tracing::trace!(pc = self.pc, word, "fetch");
        let fields = match decode(word, self.parity_mode) {
            Ok(f) => f,
            Err(err) => {
                tracing::debug!(pc = self.pc, ?err, "decode failed");
                self.finish(1);
                return;
            }
        };
        let entry = match self.catalog.by_fields(fields.ty, fields.opcode, fields.func) {
            Some(e) => *e,
            None => {
                let err = DecodeError::UnknownInstruction;
                tracing::debug!(pc = self.pc, ?err, "decode failed");
                self.finish(1);
                return;
            }
        };
        tracing::trace!(mnemonic = entry.mnemonic, "dispatch");
        let effect = (entry.execute)(self, fields);
        match effect {
            ControlEffect::Advance => self.pc = self.pc.wrapping_add(4),
            ControlEffect::Jumped => {}
            ControlEffect::Ended => self.finish(0),
        }
    }

    /// `Finish(status_err)`: STATUS[IDLE]=1, STATUS[DONE]=1,
    /// STATUS[ERR]=status_err; reevaluates interrupts (spec.md §4.5).
    fn finish(&mut self, status_err: u8) {
        self.finished = true;
        let old = self.memory.get(STATUS_ADDR);
        let mut new = old | 0b011;
        new = (new & !(0xF << 2)) | ((status_err as u32 & 0xF) << 2);
        if old != new {
            self.memory.set(STATUS_ADDR, new);
            self.changes.report(Change::scalar(ChangeKind::Mem, STATUS_ADDR as u32, old, new));
        }
        self.recompute_interrupts();
    }

    fn recompute_interrupts(&mut self) {
        let status = self.memory.get(STATUS_ADDR);
        let int_ena = self.memory.get(INT_ENA_ADDR);
        let status_done = (status >> 1) & 1;
        let status_err = (status >> 2) & 1;
        let ena_done = int_ena & 1;
        let ena_err = (int_ena >> 1) & 1;
        let new_int = (ena_done & status_done) | ((ena_err & status_err) << 1);
        if new_int != self.last_int {
            self.changes
                .report(Change::scalar(ChangeKind::Int, 0, self.last_int, new_int));
            self.last_int = new_int;
        }
    }

    // -- register file / flags --------------------------------------

    pub fn gpr(&self, idx: u8) -> U256 {
        self.gpr[idx as usize % 32]
    }

    pub fn set_gpr(&mut self, idx: u8, value: U256) {
        let i = idx as usize % 32;
        let old = self.gpr[i];
        if old != value {
            self.changes.report(Change::wide(
                ChangeKind::Gpr,
                i as u32,
                old.to_le_words(),
                value.to_le_words(),
            ));
        }
        self.gpr[i] = value;
    }

    /// R31 doubles as the modulus for modular operations.
    pub fn modulus(&self) -> U256 {
        self.gpr(31)
    }

    pub fn srr(&self) -> U256 {
        self.srr
    }

    pub fn set_srr(&mut self, value: U256) {
        let old = self.srr;
        if old != value {
            self.changes.report(Change::wide(
                ChangeKind::Srr,
                0,
                old.to_le_words(),
                value.to_le_words(),
            ));
        }
        self.srr = value;
    }

    pub fn flag_z(&self) -> bool {
        self.flag_z
    }

    pub fn set_flag_z(&mut self, value: bool) {
        if self.flag_z != value {
            self.changes
                .report(Change::scalar(ChangeKind::Flag, 0, self.flag_z as u32, value as u32));
        }
        self.flag_z = value;
    }

    pub fn flag_c(&self) -> bool {
        self.flag_c
    }

    pub fn set_flag_c(&mut self, value: bool) {
        if self.flag_c != value {
            self.changes
                .report(Change::scalar(ChangeKind::Flag, 1, self.flag_c as u32, value as u32));
        }
        self.flag_c = value;
    }

    /// Flag E (error) is V2-only, but tracked unconditionally; V1
    /// catalogs simply never reference it.
    pub fn flag_e(&self) -> bool {
        self.flag_e
    }

    pub fn set_flag_e(&mut self, value: bool) {
        if self.flag_e != value {
            self.changes
                .report(Change::scalar(ChangeKind::Flag, 2, self.flag_e as u32, value as u32));
        }
        self.flag_e = value;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    // -- return-address stack ----------------------------------------

    /// Overflow/underflow are design errors: logs and continues with
    /// undefined state (spec.md §3 "Return-address stack").
    pub fn rar_push(&mut self, value: u16) {
        if self.rar_sp >= RAR_DEPTH {
            tracing::warn!("RAR overflow, continuing with undefined state");
            return;
        }
        self.rar[self.rar_sp] = value;
        self.rar_sp += 1;
        self.changes
            .report(Change::scalar(ChangeKind::Rar, 0, 0, value as u32));
    }

    pub fn rar_pop(&mut self) -> u16 {
        if self.rar_sp == 0 {
            tracing::warn!("RAR underflow, continuing with undefined state");
            return 0;
        }
        self.rar_sp -= 1;
        let value = self.rar[self.rar_sp];
        self.changes
            .report(Change::scalar(ChangeKind::Rar, 1, 0, value as u32));
        value
    }

    pub fn rar_sp(&self) -> usize {
        self.rar_sp
    }

    // -- memory --------------------------------------------------------

    pub fn read_memory(&self, addr: u16) -> u32 {
        self.memory.get(addr)
    }

    pub fn write_memory(&mut self, addr: u16, data: u32) {
        self.memory.set(addr, data);
    }

    pub fn read_ahb(&self, addr: u16) -> u32 {
        self.memory.read_ahb(addr)
    }

    pub fn write_ahb(&mut self, addr: u16, data: u32) {
        if let Some(old) = self.memory.write_ahb(addr, data) {
            if old != data {
                self.changes
                    .report(Change::scalar(ChangeKind::Mem, addr as u32, old, data));
            }
            self.handle_config_write(addr, data);
        }
    }

    fn handle_config_write(&mut self, addr: u16, new_data: u32) {
        match addr {
            STATUS_ADDR => {
                if (new_data >> 3) & 1 == 1 {
                    self.start();
                }
            }
            COMMAND_ADDR => {
                if new_data & 1 == 1 {
                    self.reset();
                }
            }
            _ => {}
        }
        self.recompute_interrupts();
    }

    pub fn read_core_data(&self, addr: u16) -> u32 {
        self.memory.read_core_data(addr)
    }

    pub fn write_core_data(&mut self, addr: u16, data: u32) {
        if let Some(old) = self.memory.write_core_data(addr, data) {
            if old != data {
                self.changes
                    .report(Change::scalar(ChangeKind::Mem, addr as u32, old, data));
            }
        }
    }

    pub fn fetch(&self, addr: u16) -> u32 {
        self.memory.fetch(addr)
    }

    /// Load a 256-bit value from 8 consecutive little-endian 32-bit
    /// words starting at `addr` (spec.md §4.5 "LDR/STR").
    pub fn load_wide(&self, addr: u16) -> U256 {
        let mut words = [0u32; 8];
        for (i, w) in words.iter_mut().enumerate() {
            *w = self.read_core_data(addr.wrapping_add((i * 4) as u16));
        }
        U256::from_le_words(words)
    }

    pub fn store_wide(&mut self, addr: u16, value: U256) {
        let words = value.to_le_words();
        for (i, w) in words.iter().enumerate() {
            self.write_core_data(addr.wrapping_add((i * 4) as u16), *w);
        }
    }

    // -- hash / sponge --------------------------------------------------

    pub fn hash_engine(&mut self) -> &mut HashEngine {
        &mut self.hash
    }

    pub fn keccak(&mut self) -> &mut KeccakSponge {
        &mut self.keccak
    }

    // -- key memory -------------------------------------------------------

    pub fn keymem(&mut self) -> &mut KeyMemory {
        &mut self.keymem
    }

    // -- queues -----------------------------------------------------------

    pub fn push_entropy(&mut self, word: u32) {
        self.entropy_queue.push_back(word);
    }

    pub fn push_key(&mut self, word: u32) {
        self.key_queue.push_back(word);
    }

    pub fn push_kbus_error(&mut self, bit: bool) {
        self.kbus_error_queue.push_back(bit);
    }

    pub fn pop_entropy(&mut self) -> u32 {
        self.entropy_queue.pop_front().unwrap_or_else(|| {
            tracing::warn!("entropy queue underflow, yielding zero");
            0
        })
    }

    pub fn pop_key(&mut self) -> u32 {
        self.key_queue.pop_front().unwrap_or_else(|| {
            tracing::warn!("key queue underflow, yielding zero");
            0
        })
    }

    pub fn pop_kbus_error(&mut self) -> bool {
        self.kbus_error_queue.pop_front().unwrap_or_else(|| {
            tracing::warn!("key-bus error queue underflow, yielding false");
            false
        })
    }

    // -- change stream ------------------------------------------------------

    pub fn set_change_reporting(&mut self, enabled: bool) {
        self.changes.set_enabled(enabled);
    }

    pub fn pop_change(&mut self) -> Option<Change> {
        self.changes.pop()
    }

    pub(crate) fn report_change(&mut self, change: Change) {
        self.changes.report(change);
    }

    // -- snapshot / restore ----------------------------------------------

    pub fn dump_context(&self) -> ModelContext {
        ModelContext {
            registers: self.gpr.iter().map(|r| r.to_le_words()).collect(),
            srr: self.srr.to_le_words(),
            flag_z: self.flag_z,
            flag_c: self.flag_c,
            flag_e: self.flag_e,
            pc: self.pc,
            rar_stack: self.rar.to_vec(),
            rar_sp: self.rar_sp,
            hash_context: self.hash.context(),
            memory: self.memory.as_bytes().to_vec(),
        }
    }

    pub fn load_context(&mut self, ctx: ModelContext) {
        for (i, words) in ctx.registers.into_iter().enumerate().take(32) {
            self.gpr[i] = U256::from_le_words(words);
        }
        self.srr = U256::from_le_words(ctx.srr);
        self.flag_z = ctx.flag_z;
        self.flag_c = ctx.flag_c;
        self.flag_e = ctx.flag_e;
        self.pc = ctx.pc;
        for (i, v) in ctx.rar_stack.into_iter().enumerate().take(RAR_DEPTH) {
            self.rar[i] = v;
        }
        self.rar_sp = ctx.rar_sp.min(RAR_DEPTH);
        self.memory.load_bytes(ctx.memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_idempotent_and_preserves_memory() {
        let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
        cpu.set_gpr(1, U256::from(42u64));
        cpu.write_core_data(0x0100, 0xDEAD);
        cpu.reset();
        let after_first = cpu.gpr(1);
        cpu.reset();
        assert_eq!(cpu.gpr(1), after_first);
        assert_eq!(cpu.gpr(1), U256::zero());
        assert_eq!(cpu.read_core_data(0x0100), 0xDEAD);
    }

    #[test]
    fn queue_underflow_yields_zero() {
        let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
        assert_eq!(cpu.pop_entropy(), 0);
    }

    #[test]
    fn status_start_bit_triggers_start() {
        let mut cpu = CpuModel::new(IsaVersion::V2, ParityMode::None);
        cpu.finished = true;
        cpu.write_ahb(STATUS_ADDR, 1 << 3);
        assert!(!cpu.is_finished());
    }
}
