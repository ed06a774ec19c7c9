//! RBC:M ratio and dissolved-phase calibration.
//!
//! Three sources, first match wins: an explicit config ratio, a dedicated
//! calibration scan, or self-statistics of the Dixon acquisition. The
//! dissolved-phase angle and noise floor always come from the best
//! available scan, even when the ratio itself is supplied.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::acquisition::{Acquisition, DixonPair};
use crate::error::PipelineError;
use crate::signal;
use crate::volume::ComplexVolume;

/// Relative disagreement between a config-supplied ratio and the
/// self-calibrated ratio that triggers a warning.
const SELF_CAL_TOLERANCE: f64 = 0.20;

/// Fraction of the lowest-magnitude samples treated as noise when
/// estimating the floor.
const NOISE_TAIL_FRACTION: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSource {
    Config,
    CalibrationScan,
    DixonSelf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// RBC:membrane signal ratio, in `(0, 1]`.
    pub rbc_m_ratio: f64,
    /// Bulk dissolved-phase angle, radians in `[-pi, pi]`.
    pub dissolved_phase: f64,
    /// Magnitude below which dissolved voxels are treated as noise.
    pub noise_floor: f64,
    pub source: CalibrationSource,
    /// Caveats raised during resolution, surfaced in the report.
    pub warnings: Vec<String>,
}

/// Resolve the calibration for one subject.
///
/// Fails with a calibration error when no source yields a ratio in
/// `(0, 1]`; out-of-range ratios are never clamped.
pub fn resolve(
    config_ratio: Option<f64>,
    dixon: &DixonPair,
    calibration_scan: Option<&Acquisition>,
) -> Result<CalibrationResult, PipelineError> {
    let scan_fit = calibration_scan.map(|scan| fit_scan(&scan.volume));
    let self_fit = fit_scan(&dixon.dissolved);

    // Phase and noise floor come from the calibration scan when present,
    // else from the Dixon data itself.
    let reference = scan_fit.as_ref().unwrap_or(&self_fit);
    let dissolved_phase = reference.phase;
    let noise_floor = reference.noise_floor;

    let mut warnings = Vec::new();

    if let Some(ratio) = config_ratio {
        validate_ratio(ratio, "config")?;
        if self_fit.ratio_valid() {
            let rel = (ratio - self_fit.ratio).abs() / ratio;
            if rel > SELF_CAL_TOLERANCE {
                let msg = format!(
                    "config rbc_m_ratio {:.3} disagrees with self-calibration {:.3} ({:.0}%)",
                    ratio,
                    self_fit.ratio,
                    rel * 100.0
                );
                warn!(config_ratio = ratio, self_ratio = self_fit.ratio, "rbc_m_ratio_disagreement");
                warnings.push(msg);
            }
        }
        info!(ratio, "rbc_m_ratio_from_config");
        return Ok(CalibrationResult {
            rbc_m_ratio: ratio,
            dissolved_phase,
            noise_floor,
            source: CalibrationSource::Config,
            warnings,
        });
    }

    if let Some(fit) = scan_fit {
        validate_ratio(fit.ratio, "calibration scan")?;
        info!(ratio = fit.ratio, "rbc_m_ratio_from_calibration_scan");
        return Ok(CalibrationResult {
            rbc_m_ratio: fit.ratio,
            dissolved_phase: fit.phase,
            noise_floor: fit.noise_floor,
            source: CalibrationSource::CalibrationScan,
            warnings,
        });
    }

    validate_ratio(self_fit.ratio, "dixon self-calibration")?;
    warn!(ratio = self_fit.ratio, "rbc_m_ratio_from_dixon_self");
    warnings.push("rbc:m ratio derived from dixon self-calibration".to_string());
    Ok(CalibrationResult {
        rbc_m_ratio: self_fit.ratio,
        dissolved_phase: self_fit.phase,
        noise_floor: self_fit.noise_floor,
        source: CalibrationSource::DixonSelf,
        warnings,
    })
}

fn validate_ratio(ratio: f64, source: &str) -> Result<(), PipelineError> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
        return Err(PipelineError::Calibration(format!(
            "{source} rbc:m ratio {ratio} outside (0, 1]"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct ScanFit {
    ratio: f64,
    phase: f64,
    noise_floor: f64,
}

impl ScanFit {
    fn ratio_valid(&self) -> bool {
        self.ratio.is_finite() && self.ratio > 0.0 && self.ratio <= 1.0
    }
}

/// Fit ratio, bulk phase, and noise floor from complex sample statistics.
///
/// The bulk signal is rotated onto the membrane (real) axis; the ratio is
/// the imaginary-to-real quotient of the high-signal samples after that
/// rotation. The noise floor is twice the median magnitude of the lowest
/// tail.
fn fit_scan(volume: &ComplexVolume) -> ScanFit {
    let phase = signal::bulk_phase(volume, None);

    let mut magnitudes: Vec<f64> = volume.iter().map(|v| v.norm()).collect();
    magnitudes.sort_unstable_by(f64::total_cmp);
    let n = magnitudes.len();
    let tail = ((n as f64 * NOISE_TAIL_FRACTION) as usize).max(1).min(n);
    let noise_floor = 2.0 * magnitudes[tail / 2];

    // High-signal samples only: the top quartile by magnitude.
    let cutoff = magnitudes[n - (n / 4).max(1)];
    let rotation = num_complex::Complex64::from_polar(1.0, -phase);
    let mut re_sum = 0.0;
    let mut im_sum = 0.0;
    for v in volume.iter() {
        if v.norm() >= cutoff {
            let r = v * rotation;
            re_sum += r.re.abs();
            im_sum += r.im.abs();
        }
    }
    let ratio = if re_sum > 0.0 { im_sum / re_sum } else { f64::NAN };

    ScanFit { ratio, phase: signal::wrap_phase(phase), noise_floor }
}
