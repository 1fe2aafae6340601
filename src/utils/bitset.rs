//! Fixed-capacity bit set keyed by small integer ids.
//!
//! Dominator computation, liveness and phi placement all track sets of
//! blocks or registers identified by dense indices. This bit set packs
//! them 64 per word and supports the in-place lattice operations those
//! passes need (union, intersection, subtraction), each reporting whether
//! the receiver changed so fixed-point loops can detect convergence.

/// A fixed-capacity set of small integer ids backed by `u64` words.
///
/// Capacity is fixed at construction; all binary operations require both
/// operands to have the same capacity.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl BitSet {
    /// Creates an empty set able to hold ids `0..capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        BitSet {
            words: vec![0; capacity.div_ceil(64)],
            capacity,
        }
    }

    /// Creates a set with every id in `0..capacity` present.
    #[must_use]
    pub fn all(capacity: usize) -> Self {
        let mut set = BitSet::with_capacity(capacity);
        set.insert_all();
        set
    }

    /// Number of ids this set can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if no id is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of ids present.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Adds `id` to the set.
    ///
    /// # Panics
    ///
    /// Panics if `id >= capacity`.
    pub fn insert(&mut self, id: usize) {
        assert!(id < self.capacity, "id {id} out of range");
        self.words[id / 64] |= 1u64 << (id % 64);
    }

    /// Removes `id` from the set.
    ///
    /// # Panics
    ///
    /// Panics if `id >= capacity`.
    pub fn remove(&mut self, id: usize) {
        assert!(id < self.capacity, "id {id} out of range");
        self.words[id / 64] &= !(1u64 << (id % 64));
    }

    /// Returns `true` if `id` is present.
    ///
    /// Ids at or beyond the capacity are reported as absent.
    #[must_use]
    pub fn contains(&self, id: usize) -> bool {
        if id >= self.capacity {
            return false;
        }
        self.words[id / 64] & (1u64 << (id % 64)) != 0
    }

    /// Removes every id.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Adds every id in `0..capacity`.
    pub fn insert_all(&mut self) {
        self.words.fill(u64::MAX);
        let tail = self.capacity % 64;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    /// In-place union. Returns `true` if `self` gained any id.
    pub fn union_with(&mut self, other: &BitSet) -> bool {
        debug_assert_eq!(self.capacity, other.capacity);
        let mut changed = false;
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            let merged = *w | *o;
            changed |= merged != *w;
            *w = merged;
        }
        changed
    }

    /// In-place intersection. Returns `true` if `self` lost any id.
    pub fn intersect_with(&mut self, other: &BitSet) -> bool {
        debug_assert_eq!(self.capacity, other.capacity);
        let mut changed = false;
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            let kept = *w & *o;
            changed |= kept != *w;
            *w = kept;
        }
        changed
    }

    /// In-place subtraction of `other` from `self`. Returns `true` on change.
    pub fn subtract(&mut self, other: &BitSet) -> bool {
        debug_assert_eq!(self.capacity, other.capacity);
        let mut changed = false;
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            let kept = *w & !*o;
            changed |= kept != *w;
            *w = kept;
        }
        changed
    }

    /// Smallest id present, if any.
    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.ones().next()
    }

    /// Iterates over the present ids in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * 64 + bit)
            })
        })
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

impl FromIterator<usize> for BitSet {
    /// Collects ids into a set sized to the largest id seen.
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let ids: Vec<usize> = iter.into_iter().collect();
        let capacity = ids.iter().max().map_or(0, |m| m + 1);
        let mut set = BitSet::with_capacity(capacity);
        for id in ids {
            set.insert(id);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_remove() {
        let mut set = BitSet::with_capacity(130);
        assert!(set.is_empty());

        set.insert(0);
        set.insert(64);
        set.insert(129);
        assert_eq!(set.count(), 3);
        assert!(set.contains(64));
        assert!(!set.contains(63));

        set.remove(64);
        assert!(!set.contains(64));
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn all_respects_capacity_tail() {
        let set = BitSet::all(70);
        assert_eq!(set.count(), 70);
        assert!(set.contains(69));
        assert!(!set.contains(70));
    }

    #[test]
    fn union_reports_change() {
        let mut a = BitSet::with_capacity(16);
        let mut b = BitSet::with_capacity(16);
        a.insert(1);
        b.insert(1);
        b.insert(2);

        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.count(), 2);
    }

    #[test]
    fn intersect_converges() {
        let mut a = BitSet::all(8);
        let mut b = BitSet::with_capacity(8);
        b.insert(3);
        b.insert(5);

        assert!(a.intersect_with(&b));
        assert!(!a.intersect_with(&b));
        assert_eq!(a.ones().collect::<Vec<_>>(), vec![3, 5]);
    }

    #[test]
    fn subtract_removes_only_shared() {
        let mut a = BitSet::with_capacity(8);
        a.insert(1);
        a.insert(2);
        let mut b = BitSet::with_capacity(8);
        b.insert(2);
        b.insert(3);

        assert!(a.subtract(&b));
        assert_eq!(a.ones().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn ones_crosses_word_boundaries() {
        let mut set = BitSet::with_capacity(200);
        for id in [0, 63, 64, 127, 128, 199] {
            set.insert(id);
        }
        assert_eq!(set.ones().collect::<Vec<_>>(), vec![0, 63, 64, 127, 128, 199]);
        assert_eq!(set.first(), Some(0));
    }

    #[test]
    fn from_iterator_sizes_to_max() {
        let set: BitSet = [4usize, 9, 2].into_iter().collect();
        assert_eq!(set.capacity(), 10);
        assert_eq!(set.ones().collect::<Vec<_>>(), vec![2, 4, 9]);
    }
}
