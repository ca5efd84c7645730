//! Single-slot elevation cache
//!
//! Interpolated reads need the elevation sub-volume for the requested
//! horizontal block range at full vertical extent. The access pattern is one
//! region at a time, revisited across variables and grid heights, so a single
//! slot keyed by (timestep, refinement level, block bounds) is enough. A miss
//! refills the whole requested range; there is no partial-range bookkeeping.

use crate::types::BlockCoord;

/// Identity of the elevation sub-volume currently resident.
///
/// The refinement level is part of the tag: block bounds coincide across
/// levels, so timestep and bounds alone would alias entries from different
/// resolutions.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CacheState {
    Empty,
    Filled {
        timestep: usize,
        reflevel: usize,
        bmin: BlockCoord,
        bmax: BlockCoord,
    },
}

/// Holds the most recently fetched elevation sub-volume
#[derive(Debug)]
pub struct ElevationCache {
    state: CacheState,
    buf: Vec<f32>,
}

impl ElevationCache {
    pub fn new() -> Self {
        Self {
            state: CacheState::Empty,
            buf: Vec::new(),
        }
    }

    /// True iff the requested block bounds are fully contained in the cached
    /// entry and the timestep and refinement level match
    pub fn check(
        &self,
        timestep: usize,
        reflevel: usize,
        bmin: BlockCoord,
        bmax: BlockCoord,
    ) -> bool {
        match &self.state {
            CacheState::Empty => false,
            CacheState::Filled {
                timestep: ts,
                reflevel: rl,
                bmin: cmin,
                bmax: cmax,
            } => {
                *ts == timestep
                    && *rl == reflevel
                    && (0..3).all(|i| bmin[i] >= cmin[i] && bmax[i] <= cmax[i])
            }
        }
    }

    /// Record a new cache key after a successful elevation fill
    pub fn set(&mut self, timestep: usize, reflevel: usize, bmin: BlockCoord, bmax: BlockCoord) {
        self.state = CacheState::Filled {
            timestep,
            reflevel,
            bmin,
            bmax,
        };
    }

    /// Invalidate the slot without deallocating, so a same-size refill can
    /// reuse the buffer
    pub fn clear(&mut self) {
        self.state = CacheState::Empty;
    }

    /// Bounds of the resident entry, if any
    pub fn entry(&self) -> Option<(usize, usize, BlockCoord, BlockCoord)> {
        match &self.state {
            CacheState::Empty => None,
            CacheState::Filled {
                timestep,
                reflevel,
                bmin,
                bmax,
            } => Some((*timestep, *reflevel, *bmin, *bmax)),
        }
    }

    /// The elevation data buffer, sized for a refill of `len` voxels
    pub fn buffer_mut(&mut self, len: usize) -> &mut Vec<f32> {
        self.buf.resize(len, 0.0);
        &mut self.buf
    }

    /// The resident elevation data
    pub fn data(&self) -> &[f32] {
        &self.buf
    }
}

impl Default for ElevationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_misses() {
        let cache = ElevationCache::new();
        assert!(!cache.check(0, 0, [0, 0, 0], [1, 1, 1]));
        assert!(cache.entry().is_none());
    }

    #[test]
    fn test_exact_bounds_hit() {
        let mut cache = ElevationCache::new();
        cache.set(2, 1, [0, 0, 0], [3, 3, 1]);
        assert!(cache.check(2, 1, [0, 0, 0], [3, 3, 1]));
    }

    #[test]
    fn test_subset_bounds_hit() {
        let mut cache = ElevationCache::new();
        cache.set(2, 1, [0, 0, 0], [3, 3, 1]);
        assert!(cache.check(2, 1, [1, 1, 0], [2, 2, 1]));
    }

    #[test]
    fn test_superset_bounds_miss() {
        let mut cache = ElevationCache::new();
        cache.set(2, 1, [1, 1, 0], [2, 2, 1]);
        assert!(!cache.check(2, 1, [0, 0, 0], [3, 3, 1]));
    }

    #[test]
    fn test_timestep_mismatch_misses_despite_bounds() {
        let mut cache = ElevationCache::new();
        cache.set(2, 1, [0, 0, 0], [3, 3, 1]);
        assert!(!cache.check(3, 1, [0, 0, 0], [3, 3, 1]));
    }

    #[test]
    fn test_reflevel_mismatch_misses_despite_bounds() {
        let mut cache = ElevationCache::new();
        cache.set(2, 1, [0, 0, 0], [3, 3, 1]);
        assert!(!cache.check(2, 0, [0, 0, 0], [3, 3, 1]));
    }

    #[test]
    fn test_clear_retains_capacity() {
        let mut cache = ElevationCache::new();
        cache.buffer_mut(4096).fill(1.5);
        cache.set(0, 0, [0, 0, 0], [1, 1, 1]);
        let cap = cache.data().len();

        cache.clear();
        assert!(!cache.check(0, 0, [0, 0, 0], [1, 1, 1]));
        assert!(cache.buffer_mut(cap).capacity() >= cap);
    }
}
