//! Persistent element sets for the cut hyperedges and the border nodes.
//!
//! During most-balanced-cut refinement the entries found up to the first
//! balanced cut are locked in as persistent; everything added afterwards is
//! speculative and thrown away by [`PersistentSet::recover`] when the
//! refinement rewinds to the saved state.

use bitvec::vec::BitVec;
use rand::rngs::SmallRng;
use rand::Rng;

/// Append-only set over dense ids with O(1) membership, bulk cleanup and
/// a persistent/speculative split for rewinding.
#[derive(Debug, Clone)]
pub struct PersistentSet {
    persistent_mode: bool,
    persistent_front: usize,
    persistent_end: usize,
    non_persistent_front: usize,
    was_added: BitVec,
    entries: Vec<usize>,
}

impl PersistentSet {
    pub fn new(universe: usize) -> Self {
        PersistentSet {
            persistent_mode: true,
            persistent_front: 0,
            persistent_end: 0,
            non_persistent_front: 0,
            was_added: BitVec::repeat(false, universe),
            entries: Vec::new(),
        }
    }

    pub fn was_added(&self, x: usize) -> bool {
        self.was_added[x]
    }

    pub fn add(&mut self, x: usize) {
        debug_assert!(!self.was_added(x));
        self.was_added.set(x, true);
        self.entries.push(x);
    }

    pub fn is_empty(&self) -> bool {
        self.persistent_front == self.persistent_end
            && self.non_persistent_front == self.entries.len()
    }

    /// Iterates the still-active entries, persistent ones first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries[self.persistent_front..self.persistent_end]
            .iter()
            .chain(self.entries[self.non_persistent_front..].iter())
            .copied()
    }

    /// All entries while no persistent split is active.
    pub fn entries_in_persistent_mode(&self) -> &[usize] {
        debug_assert!(self.persistent_mode);
        &self.entries
    }

    /// Removes every entry satisfying `remove`. In persistent mode entries
    /// are dropped for good; afterwards they are only moved out of the
    /// active windows so [`PersistentSet::recover`] can bring them back.
    pub fn clean_up(&mut self, mut remove: impl FnMut(usize) -> bool) {
        if self.persistent_mode {
            let was_added = &mut self.was_added;
            self.entries.retain(|&x| {
                if remove(x) {
                    was_added.set(x, false);
                    false
                } else {
                    true
                }
            });
        } else {
            self.persistent_front = Self::move_to_front_if(
                &mut self.entries,
                self.persistent_front,
                self.persistent_end,
                &mut remove,
            );
            let entries_len = self.entries.len();
            self.non_persistent_front = Self::move_to_front_if(
                &mut self.entries,
                self.non_persistent_front,
                entries_len,
                &mut remove,
            );
        }
    }

    fn move_to_front_if(
        entries: &mut [usize],
        mut front: usize,
        end: usize,
        remove: &mut impl FnMut(usize) -> bool,
    ) -> usize {
        for i in front..end {
            if remove(entries[i]) {
                entries.swap(i, front);
                front += 1;
            }
        }
        front
    }

    /// Freezes the current entries as persistent; subsequent additions are
    /// speculative.
    pub fn lock_in_persistent_entries(&mut self) {
        self.persistent_mode = false;
        self.persistent_end = self.entries.len();
        self.non_persistent_front = self.persistent_end;
    }

    /// Drops all speculative entries and re-activates every persistent one,
    /// including those consumed by popping or cleanup.
    pub fn recover(&mut self) {
        while self.entries.len() > self.persistent_end {
            let x = self.entries.pop().unwrap();
            self.was_added.set(x, false);
        }
        self.non_persistent_front = self.persistent_end;
        self.persistent_front = 0;
    }

    /// Pops a uniformly random active entry, exhausting the persistent
    /// window before touching speculative entries.
    pub fn pop_random_entry_preferring_persistent(&mut self, rng: &mut SmallRng) -> Option<usize> {
        debug_assert!(!self.persistent_mode);
        if self.persistent_front < self.persistent_end {
            let ind = rng.gen_range(self.persistent_front..self.persistent_end);
            self.entries.swap(ind, self.persistent_front);
            let x = self.entries[self.persistent_front];
            self.persistent_front += 1;
            Some(x)
        } else if self.non_persistent_front < self.entries.len() {
            let ind = rng.gen_range(self.non_persistent_front..self.entries.len());
            self.entries.swap(ind, self.non_persistent_front);
            let x = self.entries[self.non_persistent_front];
            self.non_persistent_front += 1;
            Some(x)
        } else {
            None
        }
    }
}

/// A pair of [`PersistentSet`]s whose source/target roles follow the view
/// direction.
#[derive(Debug, Clone)]
pub struct Borders {
    pub source_side: PersistentSet,
    pub target_side: PersistentSet,
}

impl Borders {
    pub fn new(universe: usize) -> Self {
        Borders {
            source_side: PersistentSet::new(universe),
            target_side: PersistentSet::new(universe),
        }
    }

    pub fn flip_view_direction(&mut self) {
        std::mem::swap(&mut self.source_side, &mut self.target_side);
    }

    pub fn enter_most_balanced_cut_mode(&mut self) {
        self.source_side.lock_in_persistent_entries();
        self.target_side.lock_in_persistent_entries();
    }

    pub fn reset_for_most_balanced_cut(&mut self) {
        self.source_side.recover();
        self.target_side.recover();
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::PersistentSet;

    #[test]
    fn recover_restores_persistent_entries_and_drops_speculative_ones() {
        let mut s = PersistentSet::new(10);
        s.add(1);
        s.add(2);
        s.lock_in_persistent_entries();
        s.add(7);

        let mut rng = SmallRng::seed_from_u64(0);
        let mut popped = Vec::new();
        while let Some(x) = s.pop_random_entry_preferring_persistent(&mut rng) {
            popped.push(x);
        }
        assert_eq!(popped.len(), 3);
        assert!(popped[..2].contains(&1) && popped[..2].contains(&2));
        assert_eq!(popped[2], 7);

        s.recover();
        assert!(s.was_added(1) && s.was_added(2));
        assert!(!s.was_added(7));
        assert_eq!(s.iter().count(), 2);
    }

    #[test]
    fn clean_up_outside_persistent_mode_is_reversible() {
        let mut s = PersistentSet::new(10);
        s.add(1);
        s.add(2);
        s.add(3);
        s.lock_in_persistent_entries();
        s.clean_up(|x| x == 2);
        assert_eq!(s.iter().count(), 2);
        s.recover();
        assert_eq!(s.iter().count(), 3);
    }
}
