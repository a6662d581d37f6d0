//! Dense binary hypervectors: `D` bits packed into 32-bit words.
//!
//! `bind` is XOR (associative, commutative, self-inverse); `bundle` is a
//! per-bit majority vote with deterministic tie-breaking; `similarity` is
//! normalized Hamming similarity. Deterministic vector creation from a name
//! uses a SplitMix64 stream seeded from a hash of the name — no external
//! randomness, just a reproducible bit-expansion, matching spec.md's
//! "deterministic; same inputs -> bit-identical output" requirement.
//!
//! Grounded on `vector_ops::hamming_distance`'s int8 Hamming metric,
//! generalized here to a packed-bit representation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseVec {
    pub dimensions: usize,
    pub words: Vec<u32>,
}

/// SplitMix64: a fast, deterministic, non-cryptographic bit mixer. Used only
/// to *expand* a seed into a vector's bits, never for anything the spec
/// calls "random" — the seed itself is a pure function of the atom name.
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        SplitMix64 { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

impl DenseVec {
    #[must_use]
    pub fn from_name(name: &str, dimensions: usize) -> Self {
        let seed = fnv1a64(name.as_bytes());
        let num_words = dimensions.div_ceil(32);
        let mut rng = SplitMix64::new(seed);
        let mut words = Vec::with_capacity(num_words);
        for _ in 0..num_words {
            words.push((rng.next_u64() & 0xFFFF_FFFF) as u32);
        }
        mask_trailing(&mut words, dimensions);
        DenseVec { dimensions, words }
    }

    fn bit(&self, i: usize) -> bool {
        let word = self.words[i / 32];
        (word >> (i % 32)) & 1 == 1
    }
}

fn mask_trailing(words: &mut [u32], dimensions: usize) {
    let used_bits_in_last_word = dimensions % 32;
    if used_bits_in_last_word != 0 {
        if let Some(last) = words.last_mut() {
            *last &= (1u32 << used_bits_in_last_word) - 1;
        }
    }
}

#[must_use]
pub fn bind(a: &DenseVec, b: &DenseVec) -> DenseVec {
    let words = a
        .words
        .iter()
        .zip(b.words.iter())
        .map(|(x, y)| x ^ y)
        .collect();
    DenseVec {
        dimensions: a.dimensions,
        words,
    }
}

/// XOR is self-inverse: `unbind(bind(a,b), b) = a` exactly.
#[must_use]
pub fn unbind(c: &DenseVec, b: &DenseVec) -> DenseVec {
    bind(c, b)
}

/// Per-bit majority vote. Ties are broken by the lexicographically smallest
/// input vector's bit at that position (compared by its word array), a
/// deterministic canonical-form tie-break independent of argument order
/// beyond the values themselves.
#[must_use]
pub fn bundle(vs: &[&DenseVec]) -> DenseVec {
    assert!(!vs.is_empty(), "bundle requires at least one vector");
    let dimensions = vs[0].dimensions;
    let num_words = vs[0].words.len();

    let tie_breaker = vs
        .iter()
        .min_by(|a, b| a.words.cmp(&b.words))
        .expect("non-empty");

    let mut words = vec![0u32; num_words];
    for bit_idx in 0..dimensions {
        let ones = vs.iter().filter(|v| v.bit(bit_idx)).count();
        let zeros = vs.len() - ones;
        let set = match ones.cmp(&zeros) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => tie_breaker.bit(bit_idx),
        };
        if set {
            words[bit_idx / 32] |= 1 << (bit_idx % 32);
        }
    }
    DenseVec { dimensions, words }
}

#[must_use]
pub fn similarity(a: &DenseVec, b: &DenseVec) -> f64 {
    if a.dimensions == 0 {
        return 1.0;
    }
    let hamming: u32 = a
        .words
        .iter()
        .zip(b.words.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    1.0 - f64::from(hamming) / a.dimensions as f64
}
