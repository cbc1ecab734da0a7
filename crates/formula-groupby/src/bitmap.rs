/// Packed validity bits for a column.
///
/// Bits are stored little-endian within each `u64` word (bit 0 is the LSB of word 0). A set bit
/// marks a valid (non-null) element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    words: Vec<u64>,
    len: usize,
    valid: usize,
}

impl Bitmap {
    pub fn all_valid(len: usize) -> Self {
        let mut words = vec![u64::MAX; len.div_ceil(64)];
        let rem = len % 64;
        if rem != 0 {
            if let Some(last) = words.last_mut() {
                *last = (1u64 << rem) - 1;
            }
        }
        Self {
            words,
            len,
            valid: len,
        }
    }

    pub fn all_null(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(64)],
            len,
            valid: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_valid(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "Bitmap index out of bounds");
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    pub fn set_valid(&mut self, index: usize, valid: bool) {
        debug_assert!(index < self.len, "Bitmap index out of bounds");
        let word = &mut self.words[index / 64];
        let mask = 1u64 << (index % 64);
        let was_valid = *word & mask != 0;
        if valid && !was_valid {
            *word |= mask;
            self.valid += 1;
        } else if !valid && was_valid {
            *word &= !mask;
            self.valid -= 1;
        }
    }

    pub fn null_count(&self) -> usize {
        self.len - self.valid
    }

    pub fn as_words(&self) -> &[u64] {
        &self.words
    }

    /// Bytes occupied by the packed words.
    pub(crate) fn byte_len(len: usize) -> usize {
        len.div_ceil(64) * std::mem::size_of::<u64>()
    }
}

impl FromIterator<bool> for Bitmap {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut words = Vec::with_capacity(iter.size_hint().0.div_ceil(64));
        let mut len = 0usize;
        let mut valid = 0usize;
        for bit in iter {
            if len % 64 == 0 {
                words.push(0);
            }
            if bit {
                if let Some(word) = words.last_mut() {
                    *word |= 1u64 << (len % 64);
                }
                valid += 1;
            }
            len += 1;
        }
        Self { words, len, valid }
    }
}

/// Validity of `index` in an optional bitmap; a missing bitmap means every element is valid.
#[inline]
pub(crate) fn is_valid(bitmap: Option<&Bitmap>, index: usize) -> bool {
    bitmap.map_or(true, |b| b.is_valid(index))
}
