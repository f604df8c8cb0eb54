//! Grid - Dense occupancy grid holding one polycube
//!
//! A grid stores binary occupancy for a box of `extent.x * extent.y * extent.z`
//! cells in row-major order: axis 0 (`x`) varies slowest, axis 2 (`z`) fastest.
//! Grids produced by the grower are always the tight bounding box of their
//! occupied cells.
//!
//! # Wire format
//!
//! ```text
//! extent: [u32; 3]
//! bits:   occupancy packed LSB-first, row-major, ceil(volume / 8) bytes
//! ```
//!
//! `Grid` serializes through [`GridRecord`], so any serde format (bincode in
//! the file store) round-trips it exactly.

use crate::direction::Direction;
use glam::{IVec3, UVec3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Binary occupancy grid of one polycube.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "GridRecord", try_from = "GridRecord")]
pub struct Grid {
    extent: UVec3,
    /// One byte per cell, 0 or 1, row-major
    cells: Vec<u8>,
}

impl Grid {
    /// Create an empty grid. Zero extents are clamped to 1.
    pub fn new(extent: UVec3) -> Self {
        let extent = extent.max(UVec3::ONE);
        let volume = (extent.x * extent.y * extent.z) as usize;
        Self {
            extent,
            cells: vec![0; volume],
        }
    }

    /// The size-1 polycube: a single occupied cell.
    pub fn unit() -> Self {
        let mut grid = Self::new(UVec3::ONE);
        grid.cells[0] = 1;
        grid
    }

    /// Build the tight grid around a set of cells (translated so the minimum corner is the origin).
    pub fn from_cells(cells: &[IVec3]) -> Self {
        let Some(first) = cells.first() else {
            return Self::new(UVec3::ONE);
        };
        let (min, max) = cells
            .iter()
            .fold((*first, *first), |(lo, hi), c| (lo.min(*c), hi.max(*c)));
        let mut grid = Self::new((max - min + IVec3::ONE).as_uvec3());
        for cell in cells {
            grid.set(*cell - min);
        }
        grid
    }

    pub fn extent(&self) -> UVec3 {
        self.extent
    }

    /// Number of cells in the box (occupied or not)
    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    /// Raw occupancy bytes in row-major order.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    pub fn contains(&self, pos: IVec3) -> bool {
        pos.cmpge(IVec3::ZERO).all() && pos.cmplt(self.extent.as_ivec3()).all()
    }

    #[inline]
    fn index(&self, pos: IVec3) -> usize {
        let e = self.extent;
        ((pos.x as u32 * e.y + pos.y as u32) * e.z + pos.z as u32) as usize
    }

    #[inline]
    fn position(&self, index: usize) -> IVec3 {
        let e = self.extent;
        let index = index as u32;
        IVec3::new(
            (index / (e.y * e.z)) as i32,
            ((index / e.z) % e.y) as i32,
            (index % e.z) as i32,
        )
    }

    /// Returns false for positions outside the extent.
    pub fn is_occupied(&self, pos: IVec3) -> bool {
        self.contains(pos) && self.cells[self.index(pos)] != 0
    }

    /// Mark a cell occupied. Positions outside the extent are ignored.
    pub fn set(&mut self, pos: IVec3) {
        if self.contains(pos) {
            let index = self.index(pos);
            self.cells[index] = 1;
        }
    }

    /// Mark cells occupied by row-major index.
    pub(crate) fn set_indices(&mut self, indices: &[usize]) {
        for &index in indices {
            self.cells[index] = 1;
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Occupied cells in ascending scan order (x, then y, then z).
    pub fn occupied_cells(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(|(i, _)| self.position(i))
    }

    /// If `pos` lies exactly one layer outside the extent, the side it escapes through.
    ///
    /// Returns `(axis, positive)`; `None` when `pos` is inside the extent.
    pub fn escape(&self, pos: IVec3) -> Option<(usize, bool)> {
        let extent = self.extent.as_ivec3();
        (0..3).find_map(|axis| {
            if pos[axis] < 0 {
                Some((axis, false))
            } else if pos[axis] >= extent[axis] {
                Some((axis, true))
            } else {
                None
            }
        })
    }

    /// Copy of this grid with one empty layer added on the given side.
    ///
    /// The new extent is sized once and the original cells are copied at an
    /// offset of one along the axis when the layer goes on the negative side.
    pub fn padded(&self, direction: Direction) -> Self {
        let axis = direction.axis();
        let mut extent = self.extent;
        extent[axis] += 1;

        let mut offset = IVec3::ZERO;
        if !direction.is_positive() {
            offset[axis] = 1;
        }

        let mut grid = Self::new(extent);
        // Rows along z stay contiguous in both grids, copy them whole.
        let row = self.extent.z as usize;
        for x in 0..self.extent.x as i32 {
            for y in 0..self.extent.y as i32 {
                let src = self.index(IVec3::new(x, y, 0));
                let dst = grid.index(IVec3::new(x, y, 0) + offset);
                grid.cells[dst..dst + row].copy_from_slice(&self.cells[src..src + row]);
            }
        }
        grid
    }

    /// Whether all occupied cells form one face-connected component.
    ///
    /// An empty grid is not connected.
    pub fn is_connected(&self) -> bool {
        let total = self.cell_count();
        let Some(start) = self.occupied_cells().next() else {
            return false;
        };

        let mut seen = vec![false; self.cells.len()];
        let mut queue = VecDeque::from([start]);
        seen[self.index(start)] = true;
        let mut reached = 1;

        while let Some(pos) = queue.pop_front() {
            for dir in Direction::ALL {
                let next = pos + dir.offset();
                if !self.is_occupied(next) {
                    continue;
                }
                let index = self.index(next);
                if !seen[index] {
                    seen[index] = true;
                    reached += 1;
                    queue.push_back(next);
                }
            }
        }

        reached == total
    }

    /// Whether every boundary layer holds at least one occupied cell.
    pub fn is_tight(&self) -> bool {
        let extent = self.extent.as_ivec3();
        let mut touched = [[false; 2]; 3];
        for pos in self.occupied_cells() {
            for axis in 0..3 {
                if pos[axis] == 0 {
                    touched[axis][0] = true;
                }
                if pos[axis] == extent[axis] - 1 {
                    touched[axis][1] = true;
                }
            }
        }
        touched.iter().all(|sides| sides[0] && sides[1])
    }

    /// Encode into the persisted representation.
    pub fn to_record(&self) -> GridRecord {
        let mut bits = vec![0u8; self.cells.len().div_ceil(8)];
        for (i, &cell) in self.cells.iter().enumerate() {
            if cell != 0 {
                bits[i / 8] |= 1 << (i % 8);
            }
        }
        GridRecord {
            extent: self.extent.to_array(),
            bits,
        }
    }
}

impl fmt::Display for Grid {
    /// Layers along x, each printed as y rows of z columns.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for x in 0..self.extent.x as i32 {
            if x > 0 {
                writeln!(f)?;
            }
            for y in 0..self.extent.y as i32 {
                for z in 0..self.extent.z as i32 {
                    let c = if self.is_occupied(IVec3::new(x, y, z)) {
                        '#'
                    } else {
                        '.'
                    };
                    write!(f, "{c}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Errors decoding a [`GridRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridDecodeError {
    #[error("zero extent {0:?}")]
    ZeroExtent([u32; 3]),

    #[error("extent {0:?} is too large")]
    ExtentOverflow([u32; 3]),

    #[error("expected {expected} occupancy bytes, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("padding bits past the last cell are set")]
    TrailingBits,
}

/// Persisted form of a [`Grid`]: extent plus packed occupancy bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRecord {
    pub extent: [u32; 3],
    pub bits: Vec<u8>,
}

impl From<Grid> for GridRecord {
    fn from(grid: Grid) -> Self {
        grid.to_record()
    }
}

impl TryFrom<GridRecord> for Grid {
    type Error = GridDecodeError;

    fn try_from(record: GridRecord) -> Result<Self, Self::Error> {
        let [x, y, z] = record.extent;
        if x == 0 || y == 0 || z == 0 {
            return Err(GridDecodeError::ZeroExtent(record.extent));
        }
        let volume = x
            .checked_mul(y)
            .and_then(|v| v.checked_mul(z))
            .ok_or(GridDecodeError::ExtentOverflow(record.extent))? as usize;

        let expected = volume.div_ceil(8);
        if record.bits.len() != expected {
            return Err(GridDecodeError::LengthMismatch {
                expected,
                found: record.bits.len(),
            });
        }
        if volume % 8 != 0 && record.bits[expected - 1] >> (volume % 8) != 0 {
            return Err(GridDecodeError::TrailingBits);
        }

        let cells = (0..volume)
            .map(|i| (record.bits[i / 8] >> (i % 8)) & 1)
            .collect();
        Ok(Self {
            extent: UVec3::from_array(record.extent),
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_tromino() -> Grid {
        Grid::from_cells(&[IVec3::new(0, 0, 0), IVec3::new(1, 0, 0), IVec3::new(1, 1, 0)])
    }

    #[test]
    fn test_unit() {
        let grid = Grid::unit();
        assert_eq!(grid.extent(), UVec3::ONE);
        assert_eq!(grid.cell_count(), 1);
        assert!(grid.is_connected());
        assert!(grid.is_tight());
    }

    #[test]
    fn test_from_cells_normalizes_origin() {
        let grid = Grid::from_cells(&[IVec3::new(-2, 5, 1), IVec3::new(-1, 5, 1)]);
        assert_eq!(grid.extent(), UVec3::new(2, 1, 1));
        assert!(grid.is_occupied(IVec3::ZERO));
        assert!(grid.is_occupied(IVec3::X));
    }

    #[test]
    fn test_row_major_layout() {
        let mut grid = Grid::new(UVec3::new(2, 3, 4));
        grid.set(IVec3::new(1, 2, 3));
        assert_eq!(grid.cells()[23], 1);
        grid.set(IVec3::new(0, 0, 1));
        assert_eq!(grid.cells()[1], 1);
        assert_eq!(
            grid.occupied_cells().collect::<Vec<_>>(),
            vec![IVec3::new(0, 0, 1), IVec3::new(1, 2, 3)]
        );
    }

    #[test]
    fn test_out_of_bounds_queries() {
        let grid = Grid::unit();
        assert!(!grid.is_occupied(IVec3::NEG_X));
        assert!(!grid.is_occupied(IVec3::new(0, 1, 0)));
        assert_eq!(grid.escape(IVec3::ZERO), None);
        assert_eq!(grid.escape(IVec3::NEG_Y), Some((1, false)));
        assert_eq!(grid.escape(IVec3::Z), Some((2, true)));
    }

    #[test]
    fn test_padded_positive_side_keeps_positions() {
        let grid = l_tromino();
        let padded = grid.padded(Direction::PosZ);
        assert_eq!(padded.extent(), UVec3::new(2, 2, 2));
        assert_eq!(padded.cell_count(), 3);
        for pos in grid.occupied_cells() {
            assert!(padded.is_occupied(pos));
        }
    }

    #[test]
    fn test_padded_negative_side_shifts_cells() {
        let grid = l_tromino();
        let padded = grid.padded(Direction::NegX);
        assert_eq!(padded.extent(), UVec3::new(3, 2, 1));
        for pos in grid.occupied_cells() {
            assert!(padded.is_occupied(pos + IVec3::X));
        }
        assert!(!padded.is_tight());
    }

    #[test]
    fn test_disconnected_grid() {
        let grid = Grid::from_cells(&[IVec3::new(0, 0, 0), IVec3::new(2, 0, 0)]);
        assert!(!grid.is_connected());

        // Edge-diagonal cells only share an edge, not a face
        let grid = Grid::from_cells(&[IVec3::new(0, 0, 0), IVec3::new(1, 1, 0)]);
        assert!(!grid.is_connected());
    }

    #[test]
    fn test_record_roundtrip() {
        let grid = Grid::from_cells(&[
            IVec3::new(0, 0, 0),
            IVec3::new(0, 1, 0),
            IVec3::new(1, 1, 0),
            IVec3::new(1, 1, 1),
            IVec3::new(2, 1, 1),
        ]);
        let record = grid.to_record();
        assert_eq!(record.extent, [3, 2, 2]);
        assert_eq!(record.bits.len(), 2);
        assert_eq!(Grid::try_from(record).unwrap(), grid);
    }

    #[test]
    fn test_record_rejects_bad_lengths() {
        let record = GridRecord {
            extent: [2, 2, 2],
            bits: vec![0xFF, 0x00],
        };
        assert_eq!(
            Grid::try_from(record),
            Err(GridDecodeError::LengthMismatch {
                expected: 1,
                found: 2
            })
        );

        let record = GridRecord {
            extent: [3, 1, 1],
            bits: vec![0b1000_0111],
        };
        assert_eq!(Grid::try_from(record), Err(GridDecodeError::TrailingBits));

        let record = GridRecord {
            extent: [0, 1, 1],
            bits: vec![],
        };
        assert_eq!(
            Grid::try_from(record),
            Err(GridDecodeError::ZeroExtent([0, 1, 1]))
        );
    }

    #[test]
    fn test_bincode_roundtrip() {
        let grid = l_tromino();
        let bytes = bincode::serialize(&grid).unwrap();
        let decoded: Grid = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_display() {
        let grid = l_tromino();
        assert_eq!(grid.to_string(), "#\n.\n\n#\n#\n");
    }
}
