use crate::error::{PolycubeError, Result};
use crate::fingerprint::Fingerprint;
use crate::grid::Grid;
use crate::orientation::Orientation;
use std::collections::BTreeSet;

/// The complete set of rotation-distinct polycubes with `n` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub n: usize,
    pub shapes: Vec<Grid>,
}

impl Generation {
    pub fn new(n: usize, shapes: Vec<Grid>) -> Self {
        Self { n, shapes }
    }

    /// Generation 1: the unit cube.
    pub fn seed() -> Self {
        Self::new(1, vec![Grid::unit()])
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Rotation-invariant key per shape: the smallest fingerprint over all orientations.
    ///
    /// Two generations hold the same equivalence classes iff these sets are equal.
    pub fn class_keys(&self) -> BTreeSet<Fingerprint> {
        self.shapes.iter().map(class_key).collect()
    }
}

/// Smallest fingerprint among the 24 orientations of `grid`.
pub fn class_key(grid: &Grid) -> Fingerprint {
    Orientation::all()
        .iter()
        .map(|o| o.fingerprint(grid))
        .min()
        .unwrap_or_else(|| Fingerprint::of(grid))
}

/// Check that every shape is a tight, connected polycube of `n` cells.
pub fn validate_shapes(n: usize, shapes: &[Grid]) -> Result<()> {
    for (i, shape) in shapes.iter().enumerate() {
        let cells = shape.cell_count();
        let reason = if cells != n {
            format!("shape {i} has {cells} cells")
        } else if !shape.is_connected() {
            format!("shape {i} is not connected")
        } else if !shape.is_tight() {
            format!("shape {i} is not a tight bounding box")
        } else {
            continue;
        };
        return Err(PolycubeError::CorruptGeneration { n, reason });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    #[test]
    fn test_seed() {
        let seed = Generation::seed();
        assert_eq!(seed.n, 1);
        assert_eq!(seed.len(), 1);
        assert!(validate_shapes(1, &seed.shapes).is_ok());
    }

    #[test]
    fn test_class_key_is_rotation_invariant() {
        let shape = Grid::from_cells(&[IVec3::new(0, 0, 0), IVec3::new(1, 0, 0), IVec3::new(1, 1, 0)]);
        let key = class_key(&shape);
        for o in Orientation::all() {
            assert_eq!(class_key(&o.apply(&shape)), key);
        }
    }

    #[test]
    fn test_validate_rejects_wrong_size_and_gaps() {
        let domino = Grid::from_cells(&[IVec3::new(0, 0, 0), IVec3::new(1, 0, 0)]);
        assert!(matches!(
            validate_shapes(3, &[domino]),
            Err(PolycubeError::CorruptGeneration { n: 3, .. })
        ));

        let split = Grid::from_cells(&[IVec3::new(0, 0, 0), IVec3::new(2, 0, 0)]);
        assert!(validate_shapes(2, &[split]).is_err());
    }
}
