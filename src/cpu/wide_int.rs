//! C1 — ArbitraryWidthInt. Fixed-width unsigned integers (spec.md §4.1)
//! built on the `uint` crate's `construct_uint!`, the same limb-array
//! family `primitive-types` builds `U256` on top of elsewhere in the
//! corpus. All three widths wrap modulo 2^N and share the same
//! operator set; only `U256`/`U512` are used directly by the
//! instruction semantics, `U1024` exists for the widest modular
//! intermediate headroom spec.md §4.1 reserves.

use uint::construct_uint;

construct_uint! {
    pub struct U256(4);
}

construct_uint! {
    pub struct U512(8);
}

construct_uint! {
    pub struct U1024(16);
}

impl U256 {
    pub fn to_le_words(self) -> [u32; 8] {
        let mut out = [0u32; 8];
        for (i, word) in out.iter_mut().enumerate() {
            *word = (self.0[i / 2] >> (32 * (i % 2))) as u32;
        }
        out
    }

    pub fn from_le_words(words: [u32; 8]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, &w) in words.iter().enumerate() {
            limbs[i / 2] |= (w as u64) << (32 * (i % 2));
        }
        U256(limbs)
    }

    pub fn widening_mul(self, other: Self) -> U512 {
        let a = U512::from(self);
        let b = U512::from(other);
        a * b
    }

    /// `self + modulus - rhs`, reduced mod `modulus` — avoids the unsigned
    /// underflow a plain `self - rhs` would hit when `rhs > self`.
    pub fn sub_mod(self, rhs: Self, modulus: Self) -> Self {
        let sum = U512::from(self) + U512::from(modulus) - U512::from(rhs);
        let m = U512::from(modulus);
        U256::try_from(sum % m).expect("reduction mod a 256-bit value fits in 256 bits")
    }
}

impl U512 {
    /// Splits into (low 256 bits, high 256 bits).
    pub fn split(self) -> (U256, U256) {
        let mut low = [0u64; 4];
        let mut high = [0u64; 4];
        low.copy_from_slice(&self.0[..4]);
        high.copy_from_slice(&self.0[4..]);
        (U256(low), U256(high))
    }

    /// Builds a 512-bit value from a 256-bit high part and a 256-bit
    /// low part, as `REDP`'s concatenated `(op2 ∥ op3)` dividend does.
    pub fn from_parts(high: U256, low: U256) -> Self {
        let mut limbs = [0u64; 8];
        limbs[..4].copy_from_slice(&low.0);
        limbs[4..].copy_from_slice(&high.0);
        U512(limbs)
    }
}

impl From<U256> for U512 {
    fn from(v: U256) -> Self {
        let mut limbs = [0u64; 8];
        limbs[..4].copy_from_slice(&v.0);
        U512(limbs)
    }
}

impl TryFrom<U512> for U256 {
    type Error = &'static str;

    fn try_from(v: U512) -> Result<Self, Self::Error> {
        if v.0[4..].iter().any(|&limb| limb != 0) {
            return Err("value does not fit in 256 bits");
        }
        let mut limbs = [0u64; 4];
        limbs.copy_from_slice(&v.0[..4]);
        Ok(U256(limbs))
    }
}
