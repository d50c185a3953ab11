//! Supplements spec.md §6 "Persisted state": in-memory snapshot types
//! an external CLI can serialize to whatever on-disk format it likes.
//! Grounded in the original's `CpuModel.h` `DumpContext`/`LoadContext`,
//! reusing the teacher's `serde`/`serde_json` dependency pair instead
//! of picking a file layout ourselves.

use serde::{Deserialize, Serialize};

/// A full architectural snapshot: register file, flags, PC, RAR + SP,
/// hash context, and memory contents — sufficient to resume a run
/// bit-exactly (spec.md §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelContext {
    pub registers: Vec<[u32; 8]>,
    pub srr: [u32; 8],
    pub flag_z: bool,
    pub flag_c: bool,
    pub flag_e: bool,
    pub pc: u16,
    pub rar_stack: Vec<u16>,
    pub rar_sp: usize,
    pub hash_context: [u64; 8],
    pub memory: Vec<u8>,
}

/// The key-memory array and its per-slot status, dumped separately
/// from the rest of the architectural state (spec.md §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMemoryImage {
    pub words: Vec<u32>,
    pub status: Vec<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_context_round_trips_through_json() {
        let ctx = ModelContext {
            registers: vec![[0; 8]; 32],
            srr: [1, 2, 3, 4, 5, 6, 7, 8],
            flag_z: true,
            flag_c: false,
            flag_e: false,
            pc: 0x8000,
            rar_stack: vec![0, 0, 0, 0, 0],
            rar_sp: 0,
            hash_context: [0; 8],
            memory: vec![0u8; 16],
        };
        let json = serde_json::to_string(&ctx).unwrap();
        let back: ModelContext = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx, back);
    }
}
