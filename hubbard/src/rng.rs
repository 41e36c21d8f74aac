//! Splittable pseudorandom stream used to seed ensemble replicas
//!
//! The generator is xorshift1024* (16 words of state plus a cursor),
//! seeded through splitmix64. `jump` advances a state by 2^512 draws so
//! that one seed can hand out non-overlapping streams to many replicas.
//!
//! References:
//! * <http://xoroshiro.di.unimi.it/splitmix64.c>
//! * <http://xoroshiro.di.unimi.it/xorshift1024star.c>

use rand::RngCore;
use rand_core::impls;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const MIX_1: u64 = 0xBF58_476D_1CE4_E5B9;
const MIX_2: u64 = 0x94D0_49BB_1331_11EB;
const STAR: u64 = 1_181_783_497_276_652_981;

/// Jump polynomial for 2^512 steps of xorshift1024.
const JUMP: [u64; 16] = [
    0x84242f96eca9c41d,
    0xa3c65b8776f96855,
    0x5b34a39f070b5837,
    0x4489affce4f31a1e,
    0x2ffeeb0a48316f40,
    0xdc2d9891fe68c022,
    0x3659132bb12fea70,
    0xaac17d8efa43cab8,
    0xc4cb815590989b13,
    0x5ee975283d71c93b,
    0x691548c86c1bd540,
    0x7910c41d10a1e6a5,
    0x0b5fc64563b3e2a8,
    0x047f7684e9fc949d,
    0xb99181f2d8f685ca,
    0x284600e3f30e38c3,
];

/// Number of words persisted for a generator: 16 state words and the cursor.
pub const STATE_WORDS: usize = 17;

/// xorshift1024* generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngState {
    words: [u64; 16],
    cursor: u64,
}

impl RngState {
    /// Fill the 16 generator words with consecutive splitmix64 outputs of `x`.
    pub fn seed(mut x: u64) -> Self {
        let mut words = [0u64; 16];
        for w in words.iter_mut() {
            x = x.wrapping_add(GOLDEN_GAMMA);
            let mut z = (x ^ (x >> 30)).wrapping_mul(MIX_1);
            z = (z ^ (z >> 27)).wrapping_mul(MIX_2);
            *w = z ^ (z >> 31);
        }
        Self { words, cursor: 0 }
    }

    /// Rebuild a state from its persisted 17-word form.
    pub fn from_words(raw: [u64; STATE_WORDS]) -> Self {
        let mut words = [0u64; 16];
        words.copy_from_slice(&raw[..16]);
        Self {
            words,
            cursor: raw[16] & 15,
        }
    }

    /// Persisted form: the 16 generator words followed by the cursor.
    pub fn to_words(&self) -> [u64; STATE_WORDS] {
        let mut raw = [0u64; STATE_WORDS];
        raw[..16].copy_from_slice(&self.words);
        raw[16] = self.cursor;
        raw
    }

    pub fn cursor(&self) -> usize {
        self.cursor as usize
    }

    /// Draw the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.words[self.cursor as usize];
        let p = ((self.cursor + 1) & 15) as usize;
        self.cursor = p as u64;
        let mut s1 = self.words[p];
        s1 ^= s1 << 31;
        self.words[p] = s1 ^ s0 ^ (s1 >> 11) ^ (s0 >> 30);
        self.words[p].wrapping_mul(STAR)
    }

    /// Top bit of one draw. The low bits of xorshift* are the weakest, so
    /// only the sign bit is ever used for binary variables.
    pub fn next_bit(&mut self) -> u8 {
        (self.next_u64() >> 63) as u8
    }

    /// Advance the state by 2^512 draws.
    pub fn jump(&mut self) {
        let mut acc = [0u64; 16];
        for &mask in JUMP.iter() {
            for b in 0..64 {
                if mask & (1u64 << b) != 0 {
                    for (j, t) in acc.iter_mut().enumerate() {
                        *t ^= self.words[self.rotated(j)];
                    }
                }
                self.next_u64();
            }
        }
        for (j, t) in acc.into_iter().enumerate() {
            let idx = self.rotated(j);
            self.words[idx] = t;
        }
    }

    /// Return a copy advanced by `k` sequential jumps.
    pub fn jumped(&self, k: usize) -> Self {
        let mut state = *self;
        for _ in 0..k {
            state.jump();
        }
        state
    }

    fn rotated(&self, j: usize) -> usize {
        (j + self.cursor as usize) & 15
    }
}

/// Lets the stream drive `rand` distributions. Every method consumes whole
/// 64-bit draws, so the stream position stays countable.
impl RngCore for RngState {
    fn next_u32(&mut self) -> u32 {
        (RngState::next_u64(self) >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        RngState::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
