//! Rotation fingerprints
//!
//! A fingerprint is the SHA-256 digest of a grid's extent (three little-endian
//! `u32`) followed by its occupancy bytes in row-major order. The digest is
//! deterministic across processes and platforms, so fingerprints stay valid
//! when generations are persisted and reloaded by a later run.

use crate::grid::Grid;
use glam::UVec3;
use sha2::{Digest, Sha256};
use std::fmt;

/// Bytes hashed per `Sha256::update` call
const CHUNK: usize = 64;

/// Content digest of a grid's extent and occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(grid: &Grid) -> Self {
        Self::from_parts(grid.extent(), grid.cells().iter().copied())
    }

    /// Digest an extent and a row-major occupancy stream without materializing a grid.
    pub fn from_parts(extent: UVec3, cells: impl IntoIterator<Item = u8>) -> Self {
        let mut hasher = Sha256::new();
        for e in extent.to_array() {
            hasher.update(e.to_le_bytes());
        }

        let mut buf = [0u8; CHUNK];
        let mut len = 0;
        for cell in cells {
            buf[len] = cell;
            len += 1;
            if len == CHUNK {
                hasher.update(buf);
                len = 0;
            }
        }
        hasher.update(&buf[..len]);

        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    #[test]
    fn test_unit_cube_digest_is_stable() {
        assert_eq!(
            Fingerprint::of(&Grid::unit()).to_string(),
            "a466f3ebbac1163ec69280afd1efae0ac32f1e3717a193af56201b34407894fa"
        );
    }

    #[test]
    fn test_extent_is_part_of_digest() {
        // Same occupancy bytes, different box
        let a = Grid::from_cells(&[IVec3::new(0, 0, 0), IVec3::new(1, 0, 0)]);
        let b = Grid::from_cells(&[IVec3::new(0, 0, 0), IVec3::new(0, 1, 0)]);
        assert_eq!(a.cells(), b.cells());
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_from_parts_matches_of_across_chunks() {
        let cells: Vec<IVec3> = (0..70).map(|z| IVec3::new(0, 0, z)).collect();
        let grid = Grid::from_cells(&cells);
        assert_eq!(
            Fingerprint::of(&grid),
            Fingerprint::from_parts(grid.extent(), vec![1u8; 70])
        );
    }
}
