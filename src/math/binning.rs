//! Linear threshold binning of biomarker maps.
//!
//! A map with `n` thresholds bins into `n + 1` classes numbered 1..=n+1;
//! voxels outside the mask are bin 0. Bin 1 is the defect class, bin 2
//! the low class, and the top bins the high classes.

use ndarray::{Array3, Zip};

use crate::volume::{MaskVolume, ScalarVolume};

pub type BinVolume = Array3<u8>;

/// Bin every masked voxel against ascending thresholds.
pub fn linear_bin(image: &ScalarVolume, mask: &MaskVolume, thresholds: &[f64]) -> BinVolume {
    debug_assert!(thresholds.windows(2).all(|w| w[0] <= w[1]));
    let mut out = BinVolume::zeros(image.dim());
    Zip::from(&mut out).and(image).and(mask).for_each(|o, &v, &m| {
        if m {
            *o = 1 + thresholds.iter().filter(|&&t| v > t).count() as u8;
        }
    });
    out
}

/// Percentage of masked voxels falling in any of `bins`.
pub fn bin_percentage(binned: &BinVolume, bins: &[u8], mask: &MaskVolume) -> f64 {
    let mut total = 0usize;
    let mut hit = 0usize;
    Zip::from(binned).and(mask).for_each(|&b, &m| {
        if m {
            total += 1;
            if bins.contains(&b) {
                hit += 1;
            }
        }
    });
    if total == 0 {
        0.0
    } else {
        100.0 * hit as f64 / total as f64
    }
}

/// Masked voxels whose bin exceeds the defect class.
pub fn ventilated_mask(binned: &BinVolume, mask: &MaskVolume) -> MaskVolume {
    let mut out = MaskVolume::from_elem(binned.dim(), false);
    Zip::from(&mut out).and(binned).and(mask).for_each(|o, &b, &m| {
        *o = m && b > 1;
    });
    out
}
