//! Grid-checked helpers for 3-D image volumes.
//!
//! Volumes are plain `ndarray` arrays; nothing here owns acquisition
//! metadata. Shape agreement between volumes is always checked, never
//! coerced.

use ndarray::{Array3, Zip};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

pub type ComplexVolume = Array3<Complex64>;
pub type ScalarVolume = Array3<f64>;
pub type MaskVolume = Array3<bool>;

pub type Shape3 = (usize, usize, usize);

pub fn same_grid<A, B>(a: &Array3<A>, b: &Array3<B>) -> bool {
    a.dim() == b.dim()
}

/// Number of `true` voxels in a mask.
pub fn mask_count(mask: &MaskVolume) -> usize {
    mask.iter().filter(|&&m| m).count()
}

/// Values of `volume` at masked voxels, in row-major order.
pub fn masked_values(volume: &ScalarVolume, mask: &MaskVolume) -> Vec<f64> {
    debug_assert!(same_grid(volume, mask));
    volume
        .iter()
        .zip(mask.iter())
        .filter_map(|(&v, &m)| if m { Some(v) } else { None })
        .collect()
}

/// Magnitude image of a complex volume.
pub fn magnitude(volume: &ComplexVolume) -> ScalarVolume {
    volume.mapv(|v| v.norm())
}

/// Voxelwise mean of two same-grid volumes.
pub fn mean_of(a: &ScalarVolume, b: &ScalarVolume) -> ScalarVolume {
    debug_assert!(same_grid(a, b));
    let mut out = a.clone();
    Zip::from(&mut out).and(b).for_each(|o, &v| *o = (*o + v) / 2.0);
    out
}

/// Row-major 4x4 affine mapping output-grid voxel coordinates to
/// input-grid voxel coordinates (pull-back convention, so resampling
/// needs no matrix inversion).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine3 {
    pub matrix: [[f64; 4]; 4],
}

impl Affine3 {
    pub fn identity() -> Self {
        let mut matrix = [[0.0; 4]; 4];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { matrix }
    }

    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut t = Self::identity();
        t.matrix[0][3] = dx;
        t.matrix[1][3] = dy;
        t.matrix[2][3] = dz;
        t
    }

    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        let mut out = [0.0; 3];
        for (i, o) in out.iter_mut().enumerate() {
            *o = m[i][0] * p[0] + m[i][1] * p[1] + m[i][2] * p[2] + m[i][3];
        }
        out
    }
}

/// Trilinear resampling of a scalar volume through an affine.
///
/// Output voxels mapping outside the source grid become 0.
pub fn resample_trilinear(src: &ScalarVolume, affine: &Affine3, out_shape: Shape3) -> ScalarVolume {
    let (nx, ny, nz) = src.dim();
    let mut out = ScalarVolume::zeros(out_shape);
    for ((i, j, k), o) in out.indexed_iter_mut() {
        let [x, y, z] = affine.apply([i as f64, j as f64, k as f64]);
        if x < 0.0 || y < 0.0 || z < 0.0 {
            continue;
        }
        let (x0, y0, z0) = (x.floor() as usize, y.floor() as usize, z.floor() as usize);
        if x0 + 1 >= nx || y0 + 1 >= ny || z0 + 1 >= nz {
            // clamp exact upper-edge hits, drop everything past the grid
            if x0 < nx && y0 < ny && z0 < nz && x == x0 as f64 && y == y0 as f64 && z == z0 as f64 {
                *o = src[(x0, y0, z0)];
            }
            continue;
        }
        let (fx, fy, fz) = (x - x0 as f64, y - y0 as f64, z - z0 as f64);
        let mut acc = 0.0;
        for (dx, wx) in [(0, 1.0 - fx), (1, fx)] {
            for (dy, wy) in [(0, 1.0 - fy), (1, fy)] {
                for (dz, wz) in [(0, 1.0 - fz), (1, fz)] {
                    acc += wx * wy * wz * src[(x0 + dx, y0 + dy, z0 + dz)];
                }
            }
        }
        *o = acc;
    }
    out
}

/// Nearest-neighbor resampling of a mask through an affine.
pub fn resample_nearest(src: &MaskVolume, affine: &Affine3, out_shape: Shape3) -> MaskVolume {
    let (nx, ny, nz) = src.dim();
    let mut out = MaskVolume::from_elem(out_shape, false);
    for ((i, j, k), o) in out.indexed_iter_mut() {
        let [x, y, z] = affine.apply([i as f64, j as f64, k as f64]);
        let (xi, yi, zi) = (x.round(), y.round(), z.round());
        if xi < 0.0 || yi < 0.0 || zi < 0.0 {
            continue;
        }
        let (xi, yi, zi) = (xi as usize, yi as usize, zi as usize);
        if xi < nx && yi < ny && zi < nz {
            *o = src[(xi, yi, zi)];
        }
    }
    out
}
