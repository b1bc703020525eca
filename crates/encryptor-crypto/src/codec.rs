//! Conversion between byte buffers and 32-bit word arrays.
//!
//! Key material flows through the key-derivation layer as big-endian 32-bit
//! words (key sizes are expressed in words), and is unpacked to bytes at the
//! cipher boundary. The byte length is carried alongside the words so buffers
//! whose length is not a multiple of 4 survive the round trip exactly.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Big-endian 32-bit words plus the number of significant bytes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WordArray {
    words: Vec<u32>,
    sig_bytes: usize,
}

impl WordArray {
    /// Build from raw words and a significant byte count.
    ///
    /// `sig_bytes` may be smaller than `4 * words.len()`; trailing bytes are
    /// treated as padding.
    pub fn new(words: Vec<u32>, sig_bytes: usize) -> Self {
        Self { words, sig_bytes }
    }

    /// The packed words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Number of significant bytes.
    pub fn sig_bytes(&self) -> usize {
        self.sig_bytes
    }

    /// Unpack to exactly `sig_bytes` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        words_to_bytes(&self.words, self.sig_bytes)
    }
}

impl std::fmt::Debug for WordArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordArray")
            .field("words", &self.words.len())
            .field("sig_bytes", &self.sig_bytes)
            .finish()
    }
}

/// Pack bytes into big-endian words, zero-padding the final group.
pub fn bytes_to_words(bytes: &[u8]) -> WordArray {
    let words = bytes
        .chunks(4)
        .map(|chunk| {
            let mut group = [0u8; 4];
            group[..chunk.len()].copy_from_slice(chunk);
            u32::from_be_bytes(group)
        })
        .collect();

    WordArray {
        words,
        sig_bytes: bytes.len(),
    }
}

/// Unpack words to exactly `exact_len` bytes.
///
/// Padding introduced by [`bytes_to_words`] is discarded. If `words` is too
/// short for `exact_len`, the missing bytes read as zero.
pub fn words_to_bytes(words: &[u32], exact_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(exact_len);
    for word in words {
        if out.len() >= exact_len {
            break;
        }
        let remaining = exact_len - out.len();
        let bytes = word.to_be_bytes();
        out.extend_from_slice(&bytes[..remaining.min(4)]);
    }
    out.resize(exact_len, 0);
    out
}
