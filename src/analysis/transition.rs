//! Switching-voltage extraction for a single sweep segment.
//!
//! The memristive switching event shows up as a sharp change of the
//! resistance `R = |V| / |I|` along the forward branch of a sweep. The
//! detector looks for peaks of `d(ln R)/dn`, signed so that the event is a
//! positive peak for both polarities, and reports the voltage of the latest
//! strong peak.

use serde::{Deserialize, Serialize};

use super::signal::{find_peaks, gradient};
use crate::data::model::{Polarity, SweepSlice, TransitionResult};
use crate::error::{AnalysisError, Result};

/// Detector tunables (see [`crate::config::AnalysisConfig`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub activation_threshold: f64,
    pub peak_ratio: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            activation_threshold: 0.05,
            peak_ratio: 0.7,
        }
    }
}

/// The forward-branch samples of a segment that detection runs on.
struct Branch {
    voltage: Vec<f64>,
    time: Vec<f64>,
    log_resistance: Vec<f64>,
}

/// Detect the transition voltage of one segment.
///
/// Steps:
/// 1. keep samples whose voltage slope (taken over the whole segment) has the
///    sign of `polarity` and whose voltage lies beyond the activation
///    threshold on that side;
/// 2. drop samples whose resistance is not finite (zero or missing current);
/// 3. `dR = ∓ gradient(ln R)` over the kept samples (negated for `Rising`);
/// 4. among the peaks of `dR` that reach `peak_ratio` of the highest one,
///    take the latest in time, the later sample on equal times.
///
/// A selected voltage within the activation threshold of zero is replaced by
/// the last kept sample. Step 1 already keeps only samples beyond the
/// threshold, so this guard never fires on a kept sample.
///
/// Without a qualifying peak the kept voltage closest to zero is returned
/// (the minimum for `Rising`, the maximum for `Falling`) with
/// `no_peak_fallback` set.
pub fn detect(
    samples: SweepSlice<'_>,
    polarity: Polarity,
    settings: &DetectorSettings,
) -> Result<TransitionResult> {
    let branch = forward_branch(samples, polarity, settings.activation_threshold)?;

    let mut d_r = gradient(&branch.log_resistance);
    if polarity == Polarity::Rising {
        d_r.iter_mut().for_each(|v| *v = -*v);
    }

    let peaks = find_peaks(&d_r);
    let highest = peaks
        .iter()
        .map(|&p| d_r[p])
        .fold(f64::NEG_INFINITY, f64::max);
    let threshold = settings.peak_ratio * highest;

    // `max_by` keeps the last of equal elements, so ties go to the later peak.
    let selected = peaks
        .iter()
        .copied()
        .filter(|&p| d_r[p] >= threshold)
        .max_by(|&a, &b| branch.time[a].total_cmp(&branch.time[b]));

    let Some(peak) = selected else {
        let voltage = closest_to_zero(&branch.voltage, polarity);
        log::debug!(
            "{polarity}: no dR peak among {} samples, falling back to {voltage:.3} V",
            branch.voltage.len()
        );
        return Ok(TransitionResult {
            transition_voltage: voltage,
            no_peak_fallback: true,
        });
    };

    let mut voltage = branch.voltage[peak];
    if voltage.abs() < settings.activation_threshold {
        if let Some(&last) = branch.voltage.last() {
            voltage = last;
        }
    }
    Ok(TransitionResult {
        transition_voltage: voltage,
        no_peak_fallback: false,
    })
}

fn forward_branch(
    samples: SweepSlice<'_>,
    polarity: Polarity,
    activation_threshold: f64,
) -> Result<Branch> {
    let slope = gradient(samples.voltage);
    let sign = polarity.sign();

    let eligible: Vec<usize> = (0..samples.len())
        .filter(|&i| slope[i] * sign > 0.0 && samples.voltage[i] * sign > activation_threshold)
        .collect();
    if eligible.is_empty() {
        return Err(AnalysisError::NoEligibleSamples { polarity });
    }

    let mut branch = Branch {
        voltage: Vec::with_capacity(eligible.len()),
        time: Vec::with_capacity(eligible.len()),
        log_resistance: Vec::with_capacity(eligible.len()),
    };
    for &i in &eligible {
        let log_r = (samples.voltage[i].abs() / samples.current[i].abs()).ln();
        if !log_r.is_finite() {
            continue;
        }
        branch.voltage.push(samples.voltage[i]);
        branch.time.push(samples.time[i]);
        branch.log_resistance.push(log_r);
    }

    let excluded = eligible.len() - branch.voltage.len();
    if branch.voltage.is_empty() {
        return Err(AnalysisError::DegenerateResistance { polarity });
    }
    if excluded > 0 {
        log::debug!("{polarity}: excluded {excluded} samples with undefined resistance");
    }
    Ok(branch)
}

/// `Falling` takes the maximum (least negative) voltage, not the minimum, so
/// a mirrored sweep falls back to the mirrored voltage.
fn closest_to_zero(voltage: &[f64], polarity: Polarity) -> f64 {
    let (init, pick): (f64, fn(f64, f64) -> f64) = match polarity {
        Polarity::Rising => (f64::INFINITY, f64::min),
        Polarity::Falling => (f64::NEG_INFINITY, f64::max),
    };
    voltage.iter().copied().fold(init, pick)
}
