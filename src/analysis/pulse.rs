//! ON/OFF levels and switching times of a pulse measurement.
//!
//! A pulse trace holds a train of closely spaced voltage peaks (the write
//! pulse) followed by smaller read peaks. The ON level is averaged over the
//! second half of the write pulse, the OFF level over the second half of the
//! read phase that follows it.

use serde::{Deserialize, Serialize};

use super::signal::{find_peaks, interpolate_nan, nan_max, nan_mean};
use crate::config::{AnalysisConfig, ChannelNames};
use crate::data::filter::measurement_sheets;
use crate::data::model::Sweep;
use crate::data::table::Sheet;
use crate::error::{AnalysisError, Result};

/// How the current channel is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurrentSign {
    /// Use the signed current as recorded (instruments reporting `Imeas`).
    Raw,
    /// Use `|I|`; for channels recorded with inverted sign.
    #[default]
    Absolute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseSettings {
    pub channels: ChannelNames,
    pub current_sign: CurrentSign,
    /// Peaks above this fraction of the maximum voltage belong to the pulse.
    pub height_ratio: f64,
    /// The first two pulse peaks must be at most this many samples apart.
    pub max_peak_gap: usize,
    /// Fraction of the ON current that marks the end of the turn-on.
    pub on_fraction: f64,
    /// Fraction of the ON-OFF swing above OFF that marks the end of the
    /// turn-off.
    pub off_fraction: f64,
}

impl Default for PulseSettings {
    fn default() -> Self {
        Self {
            channels: ChannelNames::pulse(),
            current_sign: CurrentSign::Absolute,
            height_ratio: 0.9,
            max_peak_gap: 20,
            on_fraction: 0.9,
            off_fraction: 0.1,
        }
    }
}

/// Averages over one resistance state plus the time the state was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateLevel {
    pub current: f64,
    pub voltage: f64,
    pub resistance: f64,
    pub switching_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PulseMetrics {
    pub on: StateLevel,
    pub off: StateLevel,
}

/// A pulse trace with gaps filled and the current sign normalised.
struct Trace {
    time: Vec<f64>,
    voltage: Vec<f64>,
    current: Vec<f64>,
    peaks: Vec<usize>,
    pulse_peaks: Vec<usize>,
}

impl Trace {
    fn prepare(sweep: &Sweep, settings: &PulseSettings) -> Result<Self> {
        let voltage = interpolate_nan(&sweep.voltage);
        let mut current = interpolate_nan(&sweep.current);
        if settings.current_sign == CurrentSign::Absolute {
            current.iter_mut().for_each(|i| *i = i.abs());
        }

        let peaks = find_peaks(&voltage);
        let max_voltage = nan_max(&voltage).ok_or_else(|| no_pulse("trace has no voltage"))?;
        let height = settings.height_ratio * max_voltage;
        let pulse_peaks: Vec<usize> = peaks.iter().copied().filter(|&p| voltage[p] > height).collect();

        match pulse_peaks.as_slice() {
            [first, second, ..] if second - first > settings.max_peak_gap => {
                return Err(no_pulse("pulse peaks are too far apart"));
            }
            [_, _, ..] => {}
            _ => return Err(no_pulse("fewer than two peaks near the maximum voltage")),
        }
        Ok(Self {
            time: sweep.time.clone(),
            voltage,
            current,
            peaks,
            pulse_peaks,
        })
    }

    /// Mean current and voltage over the second half of `start..end`.
    fn level(&self, start: usize, end: usize) -> Result<(f64, f64)> {
        let mid = start + (end - start) / 2;
        let current = nan_mean(self.current[mid..end].iter().copied());
        let voltage = nan_mean(self.voltage[mid..end].iter().copied());
        current
            .zip(voltage)
            .ok_or_else(|| no_pulse("empty averaging window"))
    }

    fn on_state(&self, settings: &PulseSettings) -> Result<StateLevel> {
        let start = self.pulse_peaks[0];
        let end = self.pulse_peaks[self.pulse_peaks.len() - 1];
        let (current, voltage) = self.level(start, end)?;

        let target = settings.on_fraction * current;
        let reached = (start..end)
            .find(|&k| self.current[k] >= target)
            .ok_or_else(|| no_pulse("current never reaches the ON level"))?;

        Ok(StateLevel {
            current,
            voltage,
            resistance: (voltage / current).abs(),
            switching_time: self.time[reached],
        })
    }

    fn off_state(&self, on_current: f64, settings: &PulseSettings) -> Result<StateLevel> {
        let last_pulse = self.pulse_peaks[self.pulse_peaks.len() - 1];
        let start = self
            .peaks
            .iter()
            .copied()
            .find(|&p| p > last_pulse)
            .ok_or_else(|| no_pulse("no read peak after the pulse"))?;
        let end = self.peaks[self.peaks.len() - 1];
        if end <= start {
            return Err(no_pulse("read phase is a single peak"));
        }
        let (current, voltage) = self.level(start, end)?;

        let target = current + settings.off_fraction * (on_current - current);
        // t10 is the crossing sample itself, with no one-sample step back.
        let half = self.current.len() / 2;
        let reached = (half..self.current.len())
            .find(|&k| self.current[k] <= target)
            .ok_or_else(|| no_pulse("current never relaxes to the OFF level"))?;

        Ok(StateLevel {
            current,
            voltage,
            resistance: (voltage / current).abs(),
            switching_time: self.time[reached],
        })
    }
}

fn no_pulse(reason: &str) -> AnalysisError {
    AnalysisError::NoPulse {
        reason: reason.to_string(),
    }
}

/// Extract ON/OFF levels from one pulse sheet.
pub fn analyze_pulse(sweep: &Sweep, settings: &PulseSettings) -> Result<PulseMetrics> {
    let trace = Trace::prepare(sweep, settings)?;
    let on = trace.on_state(settings)?;
    let off = trace.off_state(on.current, settings)?;
    log::debug!(
        "pulse: Ron {:.3e} Ω at {:.3e} s, Roff {:.3e} Ω at {:.3e} s",
        on.resistance,
        on.switching_time,
        off.resistance,
        off.switching_time
    );
    Ok(PulseMetrics { on, off })
}

/// Analyse every pulse sheet except the `excluded_sheets`, each on its own:
/// a sheet that fails does not hide the results of the others.
pub fn analyze_sheets<'a>(
    sheets: &'a [Sheet],
    config: &AnalysisConfig,
) -> Vec<(&'a str, Result<PulseMetrics>)> {
    measurement_sheets(sheets, config)
        .into_iter()
        .map(|sheet| {
            let metrics = Sweep::from_table(&sheet.table, &config.pulse.channels)
                .and_then(|sweep| analyze_pulse(&sweep, &config.pulse));
            (sheet.name.as_str(), metrics)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Table;

    /// Write pulse of five 1 V peaks (samples 10..=18), then read peaks of
    /// 0.2 V every 10 samples. The device conducts 1 mA from sample 12 on
    /// during the pulse and relaxes to 1 µA by sample 40.
    fn pulse_trace() -> Sweep {
        let n = 100;
        let mut voltage = vec![0.0; n];
        for k in 10..=18 {
            voltage[k] = if k % 2 == 0 { 1.0 } else { 0.95 };
        }
        for p in (30..n - 1).step_by(10) {
            voltage[p] = 0.2;
        }
        let current = (0..n)
            .map(|k| match k {
                12..=18 => -1e-3,
                10..=11 => -1e-4,
                _ if k < 40 => -1e-5,
                _ => -1e-6,
            })
            .collect();
        let time = (0..n).map(|k| k as f64 * 1e-6).collect();
        Sweep::new(time, voltage, current).unwrap()
    }

    #[test]
    fn on_and_off_levels() {
        let metrics = analyze_pulse(&pulse_trace(), &PulseSettings::default()).unwrap();

        // ON window is samples 10..18, averaged over 14..18.
        assert!((metrics.on.current - 1e-3).abs() < 1e-15);
        assert!((metrics.on.voltage - 0.975).abs() < 1e-12);
        assert!((metrics.on.resistance - 975.0).abs() < 1e-6);
        assert_eq!(metrics.on.switching_time, 12.0 * 1e-6);

        // OFF window is samples 30..90, averaged over 60..90.
        assert!((metrics.off.current - 1e-6).abs() < 1e-18);
        assert!((metrics.off.voltage - 0.02).abs() < 1e-12);
        assert!(metrics.off.resistance > metrics.on.resistance);
        // First sample in the second half below the 10 % mark.
        assert_eq!(metrics.off.switching_time, 50.0 * 1e-6);
    }

    #[test]
    fn raw_sign_uses_current_as_recorded() {
        let mut positive = pulse_trace();
        positive.current.iter_mut().for_each(|i| *i = -*i);
        let raw = PulseSettings {
            current_sign: CurrentSign::Raw,
            ..PulseSettings::default()
        };
        assert_eq!(
            analyze_pulse(&positive, &raw).unwrap(),
            analyze_pulse(&pulse_trace(), &PulseSettings::default()).unwrap()
        );

        // Read raw, the inverted trace never relaxes below its OFF mark.
        assert!(matches!(
            analyze_pulse(&pulse_trace(), &raw),
            Err(AnalysisError::NoPulse { .. })
        ));
    }

    #[test]
    fn isolated_peaks_are_not_a_pulse() {
        let mut sweep = pulse_trace();
        for k in 11..=18 {
            sweep.voltage[k] = 0.0;
        }
        sweep.voltage[40] = 1.0;
        let err = analyze_pulse(&sweep, &PulseSettings::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::NoPulse {
                reason: "pulse peaks are too far apart".into()
            }
        );
    }

    #[test]
    fn settings_sheet_is_skipped_when_analysing_sheets() {
        let trace = pulse_trace();
        let n = trace.len();
        let data = Sheet::new(
            "Pulse1",
            Table::new()
                .with_column("VMeasCh2", trace.voltage.clone())
                .with_column("IMeasCh1", trace.current.clone())
                .with_column("Time", trace.time.clone()),
        );
        let settings = Sheet::new(
            "Settings",
            Table::new().with_column("Key", vec![1.0; n]),
        );
        let sheets = vec![settings, data];

        let results = analyze_sheets(&sheets, &AnalysisConfig::default());
        assert_eq!(results.len(), 1);
        let (name, metrics) = &results[0];
        assert_eq!(*name, "Pulse1");
        assert_eq!(
            metrics.as_ref().unwrap(),
            &analyze_pulse(&trace, &PulseSettings::default()).unwrap()
        );
    }

    #[test]
    fn gaps_are_interpolated_before_peak_search() {
        let mut sweep = pulse_trace();
        sweep.voltage[13] = f64::NAN;
        sweep.current[15] = f64::NAN;
        let metrics = analyze_pulse(&sweep, &PulseSettings::default()).unwrap();
        assert!((metrics.on.current - 1e-3).abs() < 1e-15);
        assert_eq!(metrics.on.switching_time, 12.0 * 1e-6);
    }
}
