//! Orientation group of the cube
//!
//! The 24 proper rotations are represented as signed axis permutations: output
//! axis `i` reads input axis `perm[i]`, reversed when `flip[i]` is set. They are
//! built from quarter turns in the three coordinate planes: four spins about one
//! axis, composed with the six ways of pointing that axis.

use crate::fingerprint::Fingerprint;
use crate::grid::Grid;
use glam::UVec3;
use std::sync::OnceLock;

/// A proper rotation of the grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation {
    perm: [usize; 3],
    flip: [bool; 3],
}

impl Orientation {
    pub const IDENTITY: Orientation = Orientation {
        perm: [0, 1, 2],
        flip: [false; 3],
    };

    /// 90° turn in the plane of axes `(a, b)`, turning axis `a` towards axis `b`.
    ///
    /// Output axis `a` reads input axis `b` reversed; output axis `b` reads input axis `a`.
    pub fn quarter_turn(a: usize, b: usize) -> Self {
        debug_assert!(a < 3 && b < 3 && a != b);
        let mut turn = Self::IDENTITY;
        turn.perm[a] = b;
        turn.flip[a] = true;
        turn.perm[b] = a;
        turn
    }

    /// `turns` quarter turns in the plane `(a, b)`. Negative counts turn the other way.
    pub fn turns(a: usize, b: usize, turns: i32) -> Self {
        (0..turns.rem_euclid(4)).fold(Self::IDENTITY, |acc, _| {
            acc.then(Self::quarter_turn(a, b))
        })
    }

    /// Apply `self` first, then `next`.
    pub fn then(self, next: Orientation) -> Self {
        let mut out = Self::IDENTITY;
        for i in 0..3 {
            out.perm[i] = self.perm[next.perm[i]];
            out.flip[i] = next.flip[i] ^ self.flip[next.perm[i]];
        }
        out
    }

    /// All 24 proper rotations, identity first, in a fixed order.
    pub fn all() -> &'static [Orientation; 24] {
        static ALL: OnceLock<[Orientation; 24]> = OnceLock::new();
        ALL.get_or_init(|| {
            // Where the spin axis ends up, and the plane each spin turns in
            let frames = [
                (Self::IDENTITY, (1, 2)),
                (Self::turns(0, 2, 2), (1, 2)),
                (Self::turns(0, 2, 1), (0, 1)),
                (Self::turns(0, 2, -1), (0, 1)),
                (Self::turns(0, 1, 1), (0, 2)),
                (Self::turns(0, 1, -1), (0, 2)),
            ];
            let mut all = [Self::IDENTITY; 24];
            for (f, (frame, (a, b))) in frames.into_iter().enumerate() {
                for spin in 0..4 {
                    all[f * 4 + spin] = frame.then(Self::turns(a, b, spin as i32));
                }
            }
            all
        })
    }

    /// +1 for rotations, -1 for reflections.
    pub fn determinant(&self) -> i32 {
        let mut sign = 1;
        let mut perm = self.perm;
        for i in 0..3 {
            while perm[i] != i {
                let j = perm[i];
                perm.swap(i, j);
                sign = -sign;
            }
        }
        self.flip.iter().fold(sign, |s, &f| if f { -s } else { s })
    }

    /// Extent of a grid after rotation
    pub fn extent_of(&self, extent: UVec3) -> UVec3 {
        UVec3::new(
            extent[self.perm[0]],
            extent[self.perm[1]],
            extent[self.perm[2]],
        )
    }

    /// Source cell indices visited in the rotated grid's row-major order.
    fn source_indices(&self, grid: &Grid) -> impl Iterator<Item = usize> {
        let input = grid.extent();
        let strides = [(input.y * input.z) as isize, input.z as isize, 1];
        let out = self.extent_of(input);

        let mut base = 0isize;
        let mut step = [0isize; 3];
        for i in 0..3 {
            let stride = strides[self.perm[i]];
            if self.flip[i] {
                base += (out[i] as isize - 1) * stride;
                step[i] = -stride;
            } else {
                step[i] = stride;
            }
        }

        let (nx, ny, nz) = (out.x as isize, out.y as isize, out.z as isize);
        (0..nx).flat_map(move |x| {
            (0..ny).flat_map(move |y| {
                (0..nz).map(move |z| (base + x * step[0] + y * step[1] + z * step[2]) as usize)
            })
        })
    }

    /// Materialize the rotated grid.
    pub fn apply(&self, grid: &Grid) -> Grid {
        let mut rotated = Grid::new(self.extent_of(grid.extent()));
        let cells = grid.cells();
        let occupied: Vec<usize> = self
            .source_indices(grid)
            .enumerate()
            .filter(|&(_, src)| cells[src] != 0)
            .map(|(dst, _)| dst)
            .collect();
        rotated.set_indices(&occupied);
        rotated
    }

    /// Fingerprint of the rotated grid, computed without building it.
    pub fn fingerprint(&self, grid: &Grid) -> Fingerprint {
        let cells = grid.cells();
        Fingerprint::from_parts(
            self.extent_of(grid.extent()),
            self.source_indices(grid).map(|src| cells[src]),
        )
    }
}

/// The grid under every orientation, identity first. Lazy; stop early freely.
pub fn orientations(grid: &Grid) -> impl Iterator<Item = Grid> + '_ {
    Orientation::all().iter().map(move |o| o.apply(grid))
}
