//! Canonical deduplicator
//!
//! Keeps one representative per rotation class. Fingerprints act as the fast
//! filter: a candidate whose rotation hashes to an accepted fingerprint is a
//! duplicate. With verification on (the default) a hit is confirmed by
//! comparing the rotated candidate with the stored grid cell by cell, and a
//! mismatch is counted as a collision instead of silently merging two shapes.

use crate::fingerprint::Fingerprint;
use crate::grid::Grid;
use crate::orientation::Orientation;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Candidates offered
    pub candidates: usize,
    pub accepted: usize,
    pub duplicates: usize,
    /// Fingerprint hits that turned out to be different shapes
    pub collisions: usize,
}

/// Accumulates the representatives of one generation.
#[derive(Debug)]
pub struct Deduplicator {
    shapes: Vec<Grid>,
    /// Fingerprint -> indices into `shapes`
    index: HashMap<Fingerprint, Vec<usize>>,
    verify_matches: bool,
    stats: DedupStats,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            index: HashMap::new(),
            verify_matches: true,
            stats: DedupStats::default(),
        }
    }

    /// Toggle cell-by-cell confirmation of fingerprint hits.
    pub fn with_verification(mut self, verify_matches: bool) -> Self {
        self.verify_matches = verify_matches;
        self
    }

    /// Offer a candidate. Returns true if it was accepted as a new representative.
    ///
    /// Orientations are tried in [`Orientation::all`] order and the search
    /// stops at the first confirmed match.
    pub fn offer(&mut self, candidate: Grid) -> bool {
        self.stats.candidates += 1;

        let mut own = None;
        for orientation in Orientation::all() {
            let fingerprint = orientation.fingerprint(&candidate);
            if own.is_none() {
                own = Some(fingerprint);
            }
            let Some(bucket) = self.index.get(&fingerprint) else {
                continue;
            };
            if !self.verify_matches || self.confirms(bucket, orientation, &candidate) {
                self.stats.duplicates += 1;
                return false;
            }
            self.stats.collisions += 1;
            warn!(%fingerprint, "fingerprint collision between distinct shapes");
        }

        let fingerprint = own.unwrap_or_else(|| Fingerprint::of(&candidate));
        self.index
            .entry(fingerprint)
            .or_default()
            .push(self.shapes.len());
        self.shapes.push(candidate);
        self.stats.accepted += 1;
        true
    }

    fn confirms(&self, bucket: &[usize], orientation: &Orientation, candidate: &Grid) -> bool {
        let rotated = orientation.apply(candidate);
        bucket.iter().any(|&i| self.shapes[i] == rotated)
    }

    pub fn stats(&self) -> DedupStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shapes(&self) -> &[Grid] {
        &self.shapes
    }

    pub fn into_shapes(self) -> Vec<Grid> {
        self.shapes
    }
}

/// One representative per rotation class, in first-seen order.
pub fn dedup(candidates: impl IntoIterator<Item = Grid>) -> Vec<Grid> {
    let mut deduplicator = Deduplicator::new();
    for candidate in candidates {
        deduplicator.offer(candidate);
    }
    deduplicator.into_shapes()
}
