//! Growable bit set keyed by catalog id or rule index.

use std::fmt;

const WORD_BITS: usize = 64;

/// Compact set of small integers.
///
/// Trailing zero words are trimmed after every mutation so that two sets with
/// the same members compare equal regardless of how they were built.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bits {
    words: Vec<u64>,
}

impl Bits {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    pub fn with_bit(mut self, index: usize) -> Self {
        self.set(index);
        self
    }

    pub fn set(&mut self, index: usize) {
        let (word, mask) = Self::locate(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= mask;
    }

    pub fn clear(&mut self, index: usize) {
        let (word, mask) = Self::locate(index);
        if let Some(slot) = self.words.get_mut(word) {
            *slot &= !mask;
            self.trim();
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        self.words.get(word).is_some_and(|bits| bits & mask != 0)
    }

    /// True when every member of `other` is also a member of `self`.
    pub fn contains_all(&self, other: &Bits) -> bool {
        other.words.iter().enumerate().all(|(i, &theirs)| {
            let ours = self.words.get(i).copied().unwrap_or(0);
            ours & theirs == theirs
        })
    }

    pub fn intersects(&self, other: &Bits) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(ours, theirs)| ours & theirs != 0)
    }

    pub fn union(&self, other: &Bits) -> Bits {
        let len = self.words.len().max(other.words.len());
        let words = (0..len)
            .map(|i| {
                self.words.get(i).copied().unwrap_or(0) | other.words.get(i).copied().unwrap_or(0)
            })
            .collect();
        Bits { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Members in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| i * WORD_BITS + bit)
        })
    }

    #[inline]
    fn locate(index: usize) -> (usize, u64) {
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl FromIterator<usize> for Bits {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bits = Bits::new();
        for index in iter {
            bits.set(index);
        }
        bits
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_across_words() {
        let mut bits = Bits::new();
        bits.set(3);
        bits.set(130);
        assert!(bits.contains(3));
        assert!(bits.contains(130));
        assert!(!bits.contains(64));
        assert_eq!(bits.len(), 2);

        bits.clear(130);
        assert!(!bits.contains(130));
        assert_eq!(bits, Bits::new().with_bit(3));

        bits.clear(3);
        assert!(bits.is_empty());
        // clearing something never set is harmless
        bits.clear(1000);
        assert!(bits.is_empty());
    }

    #[test]
    fn contains_all_checks_subset() {
        let entity: Bits = [1, 5, 70].into_iter().collect();
        let rule: Bits = [5, 70].into_iter().collect();
        let other: Bits = [5, 71].into_iter().collect();

        assert!(entity.contains_all(&rule));
        assert!(!entity.contains_all(&other));
        assert!(entity.contains_all(&Bits::new()));
        assert!(!Bits::new().contains_all(&rule));
    }

    #[test]
    fn intersects_and_union() {
        let a: Bits = [1, 2].into_iter().collect();
        let b: Bits = [2, 200].into_iter().collect();
        let c: Bits = [3].into_iter().collect();

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.union(&b).iter_ones().collect::<Vec<_>>(), vec![1, 2, 200]);
    }
}
