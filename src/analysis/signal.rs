//! Small numeric helpers shared by the detectors.

use std::cmp::Ordering;

/// Discrete derivative with unit spacing: central differences inside,
/// one-sided differences at both ends. Sequences shorter than two samples
/// have a zero derivative.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    (values[i + 1] - values[i - 1]) / 2.0
                }
            })
            .collect(),
    }
}

/// Indices of local maxima.
///
/// A sample is a peak when it is strictly greater than both neighbours.
/// A flat run of equal samples that is strictly greater than the samples on
/// either side counts as one peak, reported at the middle of the run
/// (rounded down). Endpoints are never peaks, and NaN never compares
/// greater, so NaN neighbours suppress a peak.
pub fn find_peaks(values: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if values.len() < 3 {
        return peaks;
    }
    let last = values.len() - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Fill NaN gaps by linear interpolation between the surrounding samples.
/// Trailing gaps repeat the last valid sample; leading gaps stay NaN.
pub fn interpolate_nan(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    let mut previous: Option<usize> = None;
    for i in 0..out.len() {
        if out[i].is_nan() {
            continue;
        }
        if let Some(p) = previous {
            let gap = i - p;
            for k in 1..gap {
                out[p + k] = out[p] + (out[i] - out[p]) * k as f64 / gap as f64;
            }
        }
        previous = Some(i);
    }
    if let Some(p) = previous {
        let fill = out[p];
        for v in &mut out[p + 1..] {
            *v = fill;
        }
    }
    out
}

/// Arithmetic mean ignoring NaN; `None` when nothing is left.
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Largest value ignoring NaN.
pub fn nan_max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

/// Empirical CDF: values sorted ascending, each paired with `k / n`.
/// NaN values are left out.
pub fn empirical_cdf(values: &[f64]) -> Vec<(f64, f64)> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    sorted
        .into_iter()
        .enumerate()
        .map(|(k, v)| (v, (k + 1) as f64 / n))
        .collect()
}
