//! Core memory and address-compare tap points (spec component B).

use std::collections::BTreeSet;

use rand::Rng;

use crate::word::Word;

pub const WORD_COUNT: usize = 4096;

/// 4096 words of core, with a single shared set of tapped addresses used for
/// both reads and writes during instruction execution.
pub struct Memory {
    words: Vec<Word>,
    taps: BTreeSet<u16>,
}

impl Memory {
    /// Power-on state: every word's sign and magnitude independently
    /// randomized, matching the original simulator's cold-start behavior.
    pub fn new_randomized(rng: &mut impl Rng) -> Memory {
        let words = (0..WORD_COUNT)
            .map(|_| Word::new(rng.gen(), rng.gen::<u32>()))
            .collect();
        Memory {
            words,
            taps: BTreeSet::new(),
        }
    }

    /// All-zero core, useful for deterministic tests.
    pub fn new_zeroed() -> Memory {
        Memory {
            words: vec![Word::POSITIVE_ZERO; WORD_COUNT],
            taps: BTreeSet::new(),
        }
    }

    fn wrap(addr: u16) -> usize {
        (addr as usize) % WORD_COUNT
    }

    /// Reads a word, returning whether this access hit a tapped address.
    pub fn read_tapped(&self, addr: u16) -> (Word, bool) {
        (self.words[Self::wrap(addr)], self.taps.contains(&addr))
    }

    /// Writes a word, returning whether this access hit a tapped address.
    pub fn write_tapped(&mut self, addr: u16, value: Word) -> bool {
        let hit = self.taps.contains(&addr);
        self.words[Self::wrap(addr)] = value;
        hit
    }

    /// Non-tapping read, for supervisor examine and status rendering.
    pub fn peek(&self, addr: u16) -> Word {
        self.words[Self::wrap(addr)]
    }

    /// Non-tapping write, for supervisor deposit.
    pub fn poke(&mut self, addr: u16, value: Word) {
        self.words[Self::wrap(addr)] = value;
    }

    pub fn set_tap(&mut self, addr: u16) {
        self.taps.insert(addr);
    }

    pub fn clear_tap(&mut self, addr: u16) {
        self.taps.remove(&addr);
    }

    pub fn is_tapped(&self, addr: u16) -> bool {
        self.taps.contains(&addr)
    }

    /// Tapped addresses in ascending order, for status rendering.
    pub fn sorted_taps(&self) -> Vec<u16> {
        self.taps.iter().copied().collect()
    }
}
