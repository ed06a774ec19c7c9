//! Masked statistical primitives.
//!
//! Note: sorting-based functions may reorder the input slice.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentile of a sorted slice, `p` in `[0, 1]`.
pub fn percentile_sorted(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() - 1) as f64 * p).floor() as usize;
    values[idx]
}

/// Signal-to-noise estimate: mean of the signal samples over the
/// standard deviation of the background samples.
///
/// Returns 0 when the background is empty or silent.
pub fn snr(signal: &[f64], background: &[f64]) -> f64 {
    let noise = std_dev(background);
    if noise == 0.0 {
        return 0.0;
    }
    mean(signal) / noise
}
