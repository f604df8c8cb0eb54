use crate::error::{PolycubeError, Result};
use glam::IVec3;

/// Axis-aligned neighbor direction, in grower scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosY,
        Direction::NegY,
        Direction::PosZ,
        Direction::NegZ,
    ];

    /// Build a direction from an axis index (0..3) and a side.
    pub fn from_axis_side(axis: usize, positive: bool) -> Result<Self> {
        match (axis, positive) {
            (0, true) => Ok(Direction::PosX),
            (0, false) => Ok(Direction::NegX),
            (1, true) => Ok(Direction::PosY),
            (1, false) => Ok(Direction::NegY),
            (2, true) => Ok(Direction::PosZ),
            (2, false) => Ok(Direction::NegZ),
            _ => Err(PolycubeError::InvalidDirection { axis, positive }),
        }
    }

    /// Unit offset of the neighbor cell
    pub fn offset(self) -> IVec3 {
        match self {
            Direction::PosX => IVec3::X,
            Direction::NegX => IVec3::NEG_X,
            Direction::PosY => IVec3::Y,
            Direction::NegY => IVec3::NEG_Y,
            Direction::PosZ => IVec3::Z,
            Direction::NegZ => IVec3::NEG_Z,
        }
    }

    pub fn axis(self) -> usize {
        match self {
            Direction::PosX | Direction::NegX => 0,
            Direction::PosY | Direction::NegY => 1,
            Direction::PosZ | Direction::NegZ => 2,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Direction::PosX | Direction::PosY | Direction::PosZ)
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::PosX => Direction::NegX,
            Direction::NegX => Direction::PosX,
            Direction::PosY => Direction::NegY,
            Direction::NegY => Direction::PosY,
            Direction::PosZ => Direction::NegZ,
            Direction::NegZ => Direction::PosZ,
        }
    }
}
