use bitvec::prelude::*;
use tracing::warn;

/// Words in the address space.
pub const MEMORY_WORDS: usize = 64 * 1024;

/// Flat 64K-word image. Fixed size, zero-initialised.
#[derive(Clone)]
pub struct MemoryImage {
    words: Vec<u16>,
    // Which words have been written during this assembly.
    written: BitVec,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self {
            words: vec![0; MEMORY_WORDS],
            written: bitvec![0; MEMORY_WORDS],
        }
    }

    /// Store `data` starting at `addr`. Addresses wrap at the top of memory.
    pub fn write(&mut self, addr: u32, data: &[u16]) {
        for (i, &w) in data.iter().enumerate() {
            let a = (addr as usize).wrapping_add(i) & (MEMORY_WORDS - 1);
            if self.written[a] {
                warn!("overwriting previously assembled word at {a:#06x}");
            }
            self.words[a] = w;
            self.written.set(a, true);
        }
    }

    pub fn read(&self, addr: u16) -> u16 {
        self.words[addr as usize]
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Number of distinct words written so far.
    pub fn used(&self) -> usize {
        self.written.count_ones()
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImage").field("used", &self.used()).finish()
    }
}
