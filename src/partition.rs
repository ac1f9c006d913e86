//! Contiguous block partitioning of a global index range across ranks.
//!
//! Every participant derives its own range from quantities it already knows
//! (global size, group size, own rank), so partitions are never transmitted.

use crate::error::{DistMulError, Result};
use std::ops::Range;

/// Half-open index range `[start, end)` owned by one rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    pub rank: usize,
    pub start: usize,
    pub end: usize,
}

impl Partition {
    /// Computes the block owned by `rank`.
    ///
    /// Every rank gets `global_size / workers` indices and the last rank also
    /// takes the remainder. When `workers > global_size` the leading ranks get
    /// empty ranges and the last rank owns everything.
    pub fn for_rank(global_size: usize, workers: usize, rank: usize) -> Result<Self> {
        if workers == 0 {
            return Err(DistMulError::InvalidParameters(
                "partition requires at least one worker".to_string(),
            ));
        }
        if rank >= workers {
            return Err(DistMulError::InvalidRank { rank, size: workers });
        }

        let chunk = global_size / workers;
        let start = rank * chunk;
        let end = if rank == workers - 1 {
            global_size
        } else {
            start + chunk
        };

        Ok(Self { rank, start, end })
    }

    /// Number of indices owned; zero for an empty range.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True when `start >= end`, as for leading ranks of an oversubscribed group.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The owned indices as a range; never inverted.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end.max(self.start)
    }
}

/// All partitions of `global_size` over `workers` ranks, in rank order.
pub fn partitions(global_size: usize, workers: usize) -> Result<Vec<Partition>> {
    (0..workers)
        .map(|rank| Partition::for_rank(global_size, workers, rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_last_rank_absorbs_remainder() {
        let parts = partitions(10, 3).unwrap();
        assert_eq!(parts[0].range(), 0..3);
        assert_eq!(parts[1].range(), 3..6);
        assert_eq!(parts[2].range(), 6..10);
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn test_more_workers_than_indices() {
        let parts = partitions(2, 5).unwrap();
        for part in &parts[..4] {
            assert!(part.is_empty());
            assert_eq!(part.len(), 0);
        }
        assert_eq!(parts[4].range(), 0..2);
    }

    #[test]
    fn test_empty_global_range() {
        let parts = partitions(0, 3).unwrap();
        assert!(parts.iter().all(Partition::is_empty));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Partition::for_rank(10, 0, 0).is_err());
        assert!(matches!(
            Partition::for_rank(10, 2, 2),
            Err(DistMulError::InvalidRank { rank: 2, size: 2 })
        ));
    }

    proptest! {
        #[test]
        fn test_partitions_cover_exactly_once(
            global_size in 0..500usize,
            workers in 1..40usize,
        ) {
            let parts = partitions(global_size, workers).unwrap();
            let mut owners = vec![0u32; global_size];
            for part in &parts {
                for i in part.range() {
                    owners[i] += 1;
                }
            }
            prop_assert!(owners.iter().all(|&count| count == 1));

            let covered: usize = parts.iter().map(Partition::len).sum();
            prop_assert_eq!(covered, global_size);
        }
    }
}
