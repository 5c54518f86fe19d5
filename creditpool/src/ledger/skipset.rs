//{{ Liquid }}
//Copyright (C) {{ 2015,2016,2017,2018 }}  {{ Blockstream }}

//This program is free software: you can redistribute it and/or modify
//it under the terms of the GNU Affero General Public License as published by
//the Free Software Foundation, either version 3 of the License, or
//(at your option) any later version.

//This program is distributed in the hope that it will be useful,
//but WITHOUT ANY WARRANTY; without even the implied warranty of
//MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//GNU Affero General Public License for more details.

//You should have received a copy of the GNU Affero General Public License
//along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Spent withdrawal indices
//!
//! Indices are mostly used in increasing order, so instead of every used
//! index we store the highest one and the few below it that were skipped.
//!

use std::collections::BTreeSet;

/// Why an index can not be added.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AddError {
    /// The index is already in the set.
    Spent,
    /// Adding the index would skip more indices than we are willing to track.
    TooFar,
}

/// Set of used withdrawal indices.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SkipSet {
    /// One past the highest index ever added.
    current_max: u64,
    /// Indices below `current_max` that were never added.
    skipped: BTreeSet<u64>,
    /// Maximum size of `skipped`.
    capacity_limit: u64,
}

impl SkipSet {
    /// Create an empty set.
    pub fn new(capacity_limit: u64) -> SkipSet {
        SkipSet {
            current_max: 0,
            skipped: BTreeSet::new(),
            capacity_limit: capacity_limit,
        }
    }

    /// Whether the index was added before.
    pub fn contains(&self, index: u64) -> bool {
        index < self.current_max && !self.skipped.contains(&index)
    }

    /// Number of skipped indices that would have to be tracked after
    /// adding `index`, which is not below `current_max`.
    fn capacity_after(&self, index: u64) -> u64 {
        self.capacity().saturating_add(index - self.current_max)
    }

    /// Check whether `add` would succeed.
    pub fn can_be_added(&self, index: u64) -> Result<(), AddError> {
        if self.contains(index) {
            return Err(AddError::Spent);
        }
        if self.skipped.contains(&index) {
            return Ok(());
        }
        if self.capacity_after(index) > self.capacity_limit {
            return Err(AddError::TooFar);
        }
        Ok(())
    }

    /// Add an index. The set is unchanged on error.
    pub fn add(&mut self, index: u64) -> Result<(), AddError> {
        self.can_be_added(index)?;
        if self.skipped.remove(&index) {
            return Ok(());
        }
        self.skipped.extend(self.current_max..index);
        self.current_max = index + 1;
        Ok(())
    }

    /// Number of indices in the set.
    pub fn size(&self) -> u64 {
        self.current_max - self.capacity()
    }

    /// Number of skipped indices being tracked.
    pub fn capacity(&self) -> u64 {
        self.skipped.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order() {
        let mut set = SkipSet::new(10);
        for i in 0..5 {
            assert!(!set.contains(i));
            set.add(i).unwrap();
            assert!(set.contains(i));
        }
        assert_eq!(set.size(), 5);
        assert_eq!(set.capacity(), 0);
        assert_eq!(set.add(3), Err(AddError::Spent));
    }

    #[test]
    fn skip_and_fill() {
        let mut set = SkipSet::new(10);
        set.add(4).unwrap();
        assert_eq!(set.size(), 1);
        assert_eq!(set.capacity(), 4);
        assert!(!set.contains(0));
        assert!(set.contains(4));

        set.add(2).unwrap();
        assert!(set.contains(2));
        assert_eq!(set.size(), 2);
        assert_eq!(set.capacity(), 3);
        assert_eq!(set.add(2), Err(AddError::Spent));
    }

    #[test]
    fn capacity_limit() {
        let mut set = SkipSet::new(10);
        assert_eq!(set.can_be_added(11), Err(AddError::TooFar));
        assert_eq!(set.add(11), Err(AddError::TooFar));
        assert_eq!(set.size(), 0);

        set.add(10).unwrap();
        assert_eq!(set.capacity(), 10);
        // the gap is full, only skipped indices and the next one fit
        assert_eq!(set.can_be_added(12), Err(AddError::TooFar));
        assert_eq!(set.can_be_added(11), Ok(()));
        assert_eq!(set.can_be_added(5), Ok(()));
        set.add(5).unwrap();
        set.add(12).unwrap();
        assert_eq!(set.capacity(), 10);
        assert_eq!(set.can_be_added(u64::max_value()), Err(AddError::TooFar));
    }
}
