//! Shape grower
//!
//! Produces every grid obtained by adding one face-adjacent cell to a shape.
//! Cells are scanned in ascending (x, y, z) order and each cell tries the six
//! directions in [`Direction::ALL`] order, so the emission order is fixed.

use crate::direction::Direction;
use crate::error::Result;
use crate::grid::Grid;
use glam::IVec3;

/// Lazy sequence of single-cell extensions of one shape.
pub struct Grower<'a> {
    shape: &'a Grid,
    cells: Vec<IVec3>,
    cell: usize,
    direction: usize,
}

impl<'a> Grower<'a> {
    pub fn new(shape: &'a Grid) -> Self {
        Self {
            shape,
            cells: shape.occupied_cells().collect(),
            cell: 0,
            direction: 0,
        }
    }
}

impl Iterator for Grower<'_> {
    type Item = Result<Grid>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&pos) = self.cells.get(self.cell) {
            let direction = Direction::ALL[self.direction];
            self.direction += 1;
            if self.direction == Direction::ALL.len() {
                self.direction = 0;
                self.cell += 1;
            }

            match extend(self.shape, pos + direction.offset()) {
                Ok(Some(grid)) => return Some(Ok(grid)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

/// Occupy `neighbor`, padding the extent if it lies just outside.
///
/// Returns `None` when the neighbor is already occupied.
fn extend(shape: &Grid, neighbor: IVec3) -> Result<Option<Grid>> {
    match shape.escape(neighbor) {
        Some((axis, positive)) => {
            let direction = Direction::from_axis_side(axis, positive)?;
            let mut grid = shape.padded(direction);
            let mut pos = neighbor;
            if !positive {
                pos[axis] += 1;
            }
            grid.set(pos);
            Ok(Some(grid))
        }
        None if shape.is_occupied(neighbor) => Ok(None),
        None => {
            let mut grid = shape.clone();
            grid.set(neighbor);
            Ok(Some(grid))
        }
    }
}

/// All single-cell extensions of `shape`, in scan order.
pub fn grow(shape: &Grid) -> Result<Vec<Grid>> {
    Grower::new(shape).collect()
}
