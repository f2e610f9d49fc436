//! Neighborhood geometry and the probe walk.
//!
//! A neighborhood is the run of slots that shares one cache line. A hash picks
//! its *home* slot; the probe then visits every slot of the home's line exactly
//! once, starting at the home and wrapping around inside the line:
//!
//! ```text
//!  line base                         home = hash & mask
//!      │                                  │
//!      ▼                                  ▼
//!   ┌────┬────┬────┬────┬────┬────┬────┬────┬────┬────┐
//!   │ 0  │ 1  │ 2  │ .. │ .. │ .. │ .. │ 11 │ .. │ 15 │
//!   └────┴────┴────┴────┴────┴────┴────┴────┴────┴────┘
//!   walk:  11, 12, 13, 14, 15, 0, 1, ... , 10
//! ```
//!
//! The walk never leaves the line, so a probe touches exactly one cache line.

/// Slot grouping derived from the cache line size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood {
    /// `slots - 1`; slots per line is always a power of two.
    offset_mask: usize,
}

impl Neighborhood {
    /// Creates the geometry for `slots` slots per line.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is not a power of two.
    pub fn new(slots: usize) -> Self {
        assert!(
            slots.is_power_of_two(),
            "neighborhood size must be a power of two"
        );
        Neighborhood {
            offset_mask: slots - 1,
        }
    }

    /// Number of slots in one neighborhood.
    #[inline]
    pub fn slots(&self) -> usize {
        self.offset_mask + 1
    }

    /// First slot of the neighborhood containing `index`.
    #[inline]
    pub fn base(&self, index: usize) -> usize {
        index & !self.offset_mask
    }

    /// Slot following `index`, wrapping inside its neighborhood.
    #[inline]
    pub fn next(&self, index: usize) -> usize {
        self.base(index) | (index.wrapping_add(1) & self.offset_mask)
    }

    /// Visits every slot of `home`'s neighborhood once, starting at `home`.
    #[inline]
    pub fn walk(&self, home: usize) -> Walk {
        Walk {
            geometry: *self,
            home,
            next: Some(home),
        }
    }
}

/// Iterator over the slots of one neighborhood. See [`Neighborhood::walk`].
#[derive(Debug, Clone)]
pub struct Walk {
    geometry: Neighborhood,
    home: usize,
    next: Option<usize>,
}

impl Iterator for Walk {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        let following = self.geometry.next(current);
        self.next = (following != self.home).then_some(following);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use alloc::vec::Vec;
    use test_log::test;

    #[test]
    fn test_walk_from_line_start() {
        let hood = Neighborhood::new(16);
        let visited: Vec<usize> = hood.walk(32).collect();
        assert_eq!(visited, (32..48).collect::<Vec<_>>());
    }

    #[test]
    fn test_walk_wraps_inside_line() {
        let hood = Neighborhood::new(16);
        let visited: Vec<usize> = hood.walk(43).collect();
        let mut expected: Vec<usize> = (43..48).collect();
        expected.extend(32..43);
        assert_eq!(visited, expected);
    }

    #[test]
    fn test_walk_visits_each_slot_once() {
        let hood = Neighborhood::new(8);
        for home in 0..64 {
            let mut visited: Vec<usize> = hood.walk(home).collect();
            assert_eq!(visited.len(), 8);
            visited.sort_unstable();
            visited.dedup();
            assert_eq!(visited.len(), 8);
            assert!(visited.iter().all(|&slot| hood.base(slot) == hood.base(home)));
        }
    }

    #[test]
    fn test_single_slot_neighborhood() {
        let hood = Neighborhood::new(1);
        assert_eq!(hood.walk(5).collect::<Vec<_>>(), [5]);
        assert_eq!(hood.next(5), 5);
    }

    #[test]
    fn test_base_and_next() {
        let hood = Neighborhood::new(16);
        assert_eq!(hood.slots(), 16);
        assert_eq!(hood.base(0x1f), 0x10);
        assert_eq!(hood.next(0x1f), 0x10);
        assert_eq!(hood.next(0x13), 0x14);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_rejects_odd_size() {
        Neighborhood::new(12);
    }
}
