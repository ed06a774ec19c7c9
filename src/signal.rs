//! Signal-model primitives for one-point Dixon gas-exchange imaging.
//!
//! Pure functions only; every transform here is deterministic for a given
//! input. Field-dependent decay constants are for 3 T scanners.

use num_complex::Complex64;

use crate::volume::{ComplexVolume, MaskVolume};

/// T2* of RBC-bound dissolved 129Xe at 3 T, seconds.
pub const T2STAR_RBC_3T: f64 = 1.0502e-3;
/// T2* of membrane-bound dissolved 129Xe at 3 T, seconds.
pub const T2STAR_MEMBRANE_3T: f64 = 1.1416e-3;

/// Hemoglobin correction coefficients (Bechtel et al., MRM 2023).
pub const HB_REF: f64 = 14.0;
const HB_R1: f64 = 0.288;
const HB_M1: f64 = 0.029;
const HB_M2: f64 = 0.011;

/// Normalize an angle to `[-pi, pi]`.
pub fn wrap_phase(phase: f64) -> f64 {
    let mut p = phase.rem_euclid(2.0 * std::f64::consts::PI);
    if p > std::f64::consts::PI {
        p -= 2.0 * std::f64::consts::PI;
    }
    p
}

/// Bulk phase of the summed complex signal, in `[-pi, pi]`.
///
/// With a mask, only masked voxels contribute to the sum.
pub fn bulk_phase(volume: &ComplexVolume, mask: Option<&MaskVolume>) -> f64 {
    let total: Complex64 = match mask {
        Some(mask) => volume
            .iter()
            .zip(mask.iter())
            .filter_map(|(&v, &m)| if m { Some(v) } else { None })
            .sum(),
        None => volume.iter().copied().sum(),
    };
    total.im.atan2(total.re)
}

/// Target rotation angle that puts the membrane signal on the real axis
/// and the RBC signal at `atan2(ratio, 1)` on the imaginary side.
pub fn target_angle(rbc_m_ratio: f64) -> f64 {
    rbc_m_ratio.atan2(1.0)
}

/// Remove B0-inhomogeneity phase from a dissolved-phase voxel using the
/// gas-phase voxel acquired in the same excitation.
pub fn b0_demodulate(dissolved: Complex64, gas: Complex64) -> Complex64 {
    dissolved * Complex64::from_polar(1.0, -gas.arg())
}

/// Flip-angle decay correction between the gas and dissolved excitations.
///
/// Angles are in degrees as stored in acquisition metadata.
pub fn flip_angle_correction(fa_gas_deg: f64, fa_dis_deg: f64) -> f64 {
    fa_gas_deg.to_radians().sin() / fa_dis_deg.to_radians().sin()
}

/// T2* decay compensation for signal sampled at `te90` seconds.
pub fn t2star_correction(te90_s: f64, t2star_s: f64) -> f64 {
    (te90_s / t2star_s).exp()
}

/// Hemoglobin correction factors `(rbc, membrane)`.
///
/// Both factors are 1.0 at the reference hemoglobin of 14 g/dL.
pub fn hb_correction(hb_g_dl: f64) -> (f64, f64) {
    let d = hb_g_dl / HB_REF - 1.0;
    let rbc = 1.0 / (1.0 + HB_R1 * d);
    let membrane = 1.0 / (1.0 + HB_M1 * d + HB_M2 * d * d);
    (rbc, membrane)
}
