use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::pulse::PulseSettings;
use crate::analysis::retention::RetentionChannels;
use crate::analysis::transition::DetectorSettings;

// ---------------------------------------------------------------------------
// Channel names
// ---------------------------------------------------------------------------

/// Column names of the voltage, current and time channels.
///
/// Instruments disagree on the time column, so several candidates are
/// accepted and the first one present wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelNames {
    pub voltage: String,
    pub current: String,
    pub time: Vec<String>,
}

impl ChannelNames {
    /// IV sweep exports: `Voltage` / `Current`.
    pub fn iv_sweep() -> Self {
        Self::named("Voltage", "Current")
    }

    /// Volatile-switching transistor sweeps: `DrainV` / `DrainI`.
    pub fn volatile() -> Self {
        Self::named("DrainV", "DrainI")
    }

    /// Pulse measurements: `VMeasCh2` / `IMeasCh1`.
    pub fn pulse() -> Self {
        Self::named("VMeasCh2", "IMeasCh1")
    }

    fn named(voltage: &str, current: &str) -> Self {
        Self {
            voltage: voltage.to_string(),
            current: current.to_string(),
            time: vec!["TimeOutput".to_string(), "Time".to_string()],
        }
    }
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self::iv_sweep()
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Every tunable of the analysis. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples with `|V|` at or below this (volts) never take part in
    /// detection, and a detected voltage below it is replaced.
    pub activation_threshold: f64,
    /// Peaks at or above `peak_ratio * highest peak` survive selection.
    pub peak_ratio: f64,
    /// Drop sheets whose recorded SET and RESET counts disagree.
    pub ignore_faulty_sheets: bool,
    /// Sheet names that never hold measurement data.
    pub excluded_sheets: Vec<String>,
    pub channels: ChannelNames,
    pub pulse: PulseSettings,
    pub retention: RetentionChannels,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.05,
            peak_ratio: 0.7,
            ignore_faulty_sheets: false,
            excluded_sheets: vec!["Calc".to_string(), "Settings".to_string()],
            channels: ChannelNames::iv_sweep(),
            pulse: PulseSettings::default(),
            retention: RetentionChannels::default(),
        }
    }
}

impl AnalysisConfig {
    /// Defaults with the volatile-sweep channel names.
    pub fn volatile() -> Self {
        Self {
            channels: ChannelNames::volatile(),
            ..Self::default()
        }
    }

    /// Read a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing config JSON")
    }

    pub fn detector(&self) -> DetectorSettings {
        DetectorSettings {
            activation_threshold: self.activation_threshold,
            peak_ratio: self.peak_ratio,
        }
    }
}
