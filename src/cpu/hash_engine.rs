//! SHA-512 engine backing `HASH`/`HASH_IT` (spec.md §3 "Hash/sponge
//! state", §4.5 "HASH"). Grounded in the original's `Sha512.h`, which
//! calls `update()`/`getContext()` and never finalizes — the hardware
//! exposes the raw running compression state, not a finished digest.
//! `sha2::compress512` is the RustCrypto crate's public low-level
//! compression-function entry point, the same shape.

use sha2::compress512;

const SHA512_IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

/// The SHA-512 engine's running 8-word context. `HASH` absorbs one
/// 1024-bit (128-byte) message block at a time and never applies
/// Merkle-Damgard padding or a length suffix — the context can be read
/// back mid-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEngine {
    state: [u64; 8],
}

impl Default for HashEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HashEngine {
    pub fn new() -> Self {
        HashEngine { state: SHA512_IV }
    }

    /// `HASH_IT`: reset the running context back to the SHA-512 IV.
    pub fn reset(&mut self) {
        self.state = SHA512_IV;
    }

    /// `HASH`: absorb one 128-byte (1024-bit) message block.
    pub fn absorb(&mut self, block: &[u8; 128]) {
        let block = sha2::digest::generic_array::GenericArray::clone_from_slice(block);
        compress512(&mut self.state, &[block]);
    }

    /// The current 8 context words, in compression order (`HASH` packs
    /// words 0..4 into `R[op1+1]` and words 4..8 into `R[op1]`, each
    /// group of four concatenated big-endian into one 256-bit value).
    pub fn context(&self) -> [u64; 8] {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_iv() {
        let mut h = HashEngine::new();
        h.absorb(&[0u8; 128]);
        assert_ne!(h.context(), SHA512_IV);
        h.reset();
        assert_eq!(h.context(), SHA512_IV);
    }

    #[test]
    fn absorbing_all_zero_block_changes_state_deterministically() {
        let mut a = HashEngine::new();
        let mut b = HashEngine::new();
        a.absorb(&[0u8; 128]);
        b.absorb(&[0u8; 128]);
        assert_eq!(a.context(), b.context());
    }
}
