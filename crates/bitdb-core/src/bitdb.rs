//! A packed batch of equal-width bitsets stored contiguously.
//!
//! Slot `i` occupies words `[i * nwords(length), (i + 1) * nwords(length))`
//! of a single flat `Vec<u64>` (or borrowed slice), so batched kernels can
//! walk the whole container with simple strided indexing instead of
//! chasing `nelem` separate allocations.

use crate::bit::{check_length, nwords, Bit, Storage};
use crate::error::Error;

pub struct BitDB<'a> {
    length: usize,
    nelem: usize,
    storage: Storage<'a>,
}

/// `nelem` must be positive, matching `BitDB_new`'s
/// `assert(num_of_bitsets > 0);` in the original C library.
fn check_nelem(nelem: usize) {
    assert!(nelem > 0, "batch element count must be positive, got {nelem}");
}

impl<'a> BitDB<'a> {
    /// Allocates a new, library-owned batch of `nelem` bitsets, each
    /// `length` bits wide, all clear.
    ///
    /// `length` and `nelem` must both be positive; violating this is a
    /// programmer error and panics, matching `BitDB_new`'s
    /// `assert(length > 0); assert(num_of_bitsets > 0);` in the original.
    pub fn new(length: usize, nelem: usize) -> Self {
        check_length(length);
        check_nelem(nelem);
        BitDB {
            length,
            nelem,
            storage: Storage::Owned(vec![0u64; nwords(length) * nelem]),
        }
    }

    /// Wraps a caller-supplied word buffer as a batch without taking
    /// ownership of it.
    pub fn load(length: usize, nelem: usize, buffer: &'a mut [u64]) -> Result<Self, Error> {
        check_length(length);
        check_nelem(nelem);
        let need = nwords(length) * nelem;
        if buffer.len() < need {
            return Err(Error::BufferTooSmall {
                need: need * 8,
                got: buffer.len() * 8,
            });
        }
        let mut db = BitDB {
            length,
            nelem,
            storage: Storage::Borrowed(buffer),
        };
        db.mask_padding();
        Ok(db)
    }

    /// Zeroes the padding bits in every slot's last word, mirroring
    /// `Bit::load`'s defensive mask at the adoption boundary.
    fn mask_padding(&mut self) {
        let rem = self.length % 64;
        if rem == 0 {
            return;
        }
        let w = self.slot_words();
        let mask = (1u64 << rem) - 1;
        for slot in self.storage.as_mut_slice().chunks_mut(w) {
            if let Some(last) = slot.last_mut() {
                *last &= mask;
            }
        }
    }

    pub fn free(self) -> Option<Vec<u64>> {
        match self.storage {
            Storage::Owned(v) => Some(v),
            Storage::Borrowed(_) => None,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn nelem(&self) -> usize {
        self.nelem
    }

    pub fn words(&self) -> &[u64] {
        self.storage.as_slice()
    }

    pub fn words_mut(&mut self) -> &mut [u64] {
        self.storage.as_mut_slice()
    }

    fn slot_words(&self) -> usize {
        nwords(self.length)
    }

    fn check_index(&self, i: usize) {
        assert!(i < self.nelem, "index {i} out of range for {} elements", self.nelem);
    }

    fn slot(&self, i: usize) -> &[u64] {
        self.check_index(i);
        let w = self.slot_words();
        &self.storage.as_slice()[i * w..(i + 1) * w]
    }

    fn slot_mut(&mut self, i: usize) -> &mut [u64] {
        self.check_index(i);
        let w = self.slot_words();
        &mut self.storage.as_mut_slice()[i * w..(i + 1) * w]
    }

    /// Copies slot `i` out as a standalone, owned [`Bit`].
    pub fn get_from(&self, i: usize) -> Bit<'static> {
        let mut out = Bit::new(self.length);
        out.words_mut().copy_from_slice(self.slot(i));
        out
    }

    /// Overwrites slot `i` with the contents of `bit`.
    pub fn put_at(&mut self, i: usize, bit: &Bit<'_>) {
        assert_eq!(bit.length(), self.length, "bit length does not match batch width");
        self.slot_mut(i).copy_from_slice(bit.words());
    }

    /// Copies slot `i`'s bytes into a new buffer.
    pub fn extract_from(&self, i: usize) -> Vec<u8> {
        let mut out = vec![0u8; crate::bit::buffer_size(self.length)];
        self.extract_into(i, &mut out);
        out
    }

    /// Copies slot `i`'s bytes into `buf`. Returns the number of bytes
    /// written.
    pub fn extract_into(&self, i: usize, buf: &mut [u8]) -> usize {
        let need = crate::bit::buffer_size(self.length);
        assert!(buf.len() >= need, "destination buffer too small");
        for (w, word) in self.slot(i).iter().enumerate() {
            buf[w * 8..w * 8 + 8].copy_from_slice(&word.to_le_bytes());
        }
        need
    }

    /// Overwrites slot `i` from a little-endian byte buffer of at least
    /// [`buffer_size`](crate::bit::buffer_size)`(self.length())` bytes.
    pub fn replace_at(&mut self, i: usize, bytes: &[u8]) {
        let need = crate::bit::buffer_size(self.length);
        assert!(bytes.len() >= need, "source buffer too small");
        let slot = self.slot_mut(i);
        for (w, word) in slot.iter_mut().enumerate() {
            *word = u64::from_le_bytes(bytes[w * 8..w * 8 + 8].try_into().unwrap());
        }
    }

    /// Clears every bit in slot `i`.
    pub fn clear_at(&mut self, i: usize) {
        for w in self.slot_mut(i) {
            *w = 0;
        }
    }

    /// Clears every slot.
    pub fn clear(&mut self) {
        for w in self.storage.as_mut_slice() {
            *w = 0;
        }
    }

    /// Popcount of slot `i`.
    pub fn count_at(&self, i: usize) -> u32 {
        self.slot(i).iter().map(|w| w.count_ones()).sum()
    }

    /// Popcount of every slot, in order.
    pub fn count(&self) -> Vec<u32> {
        (0..self.nelem).map(|i| self.count_at(i)).collect()
    }
}
