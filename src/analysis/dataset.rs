use std::io::Write;

use anyhow::Context;
use serde::Serialize;

use super::cycles::{classify, CycleSet};
use super::signal::{empirical_cdf, nan_mean};
use super::transition::detect;
use crate::config::AnalysisConfig;
use crate::data::filter::filter_sheets;
use crate::data::model::{Polarity, SheetRecord, Sweep, SweepSlice, TransitionResult};
use crate::data::table::Sheet;
use crate::error::{AnalysisError, CycleFailure, Result};

// ---------------------------------------------------------------------------
// Per-cycle outcome
// ---------------------------------------------------------------------------

/// A successfully detected transition and the half-cycle it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleTransition {
    /// Zero-based position within the polarity group.
    pub cycle: usize,
    pub result: TransitionResult,
}

pub type CycleOutcome = std::result::Result<CycleTransition, CycleFailure>;

/// Run the detector over each `(samples, polarity)` pair, keeping failures
/// alongside successes.
pub(crate) fn detect_all<'a>(
    segments: impl IntoIterator<Item = (SweepSlice<'a>, Polarity)>,
    config: &AnalysisConfig,
) -> Vec<CycleOutcome> {
    let settings = config.detector();
    segments
        .into_iter()
        .enumerate()
        .map(|(cycle, (samples, polarity))| {
            detect(samples, polarity, &settings)
                .map(|result| CycleTransition { cycle, result })
                .map_err(|source| {
                    let failure = CycleFailure {
                        polarity,
                        cycle,
                        source,
                    };
                    log::warn!("{failure}: {}", failure.source);
                    failure
                })
        })
        .collect()
}

/// Mean transition voltage over the successful outcomes.
pub(crate) fn mean_voltage(outcomes: &[CycleOutcome]) -> Option<f64> {
    nan_mean(
        outcomes
            .iter()
            .filter_map(|o| o.as_ref().ok())
            .map(|t| t.result.transition_voltage),
    )
}

// ---------------------------------------------------------------------------
// IvAnalysis – everything derived from one IV-sweep upload
// ---------------------------------------------------------------------------

/// The analysis of one uploaded IV-sweep dataset.
///
/// Built in one go from the uploaded sheets and never mutated afterwards; a
/// new upload builds a new value. SET and RESET results are kept as two
/// independent sequences, as are the recorded resistances, so a cycle that
/// lacks one of the events never shifts the other sequence.
#[derive(Debug, Clone)]
pub struct IvAnalysis {
    /// All kept sheets concatenated in upload order.
    pub sweep: Sweep,
    pub cycles: CycleSet,
    pub set: Vec<CycleOutcome>,
    pub reset: Vec<CycleOutcome>,
    /// Instrument-recorded low-resistance state after each SET.
    pub set_resistance: Vec<f64>,
    /// Instrument-recorded high-resistance state after each RESET.
    pub reset_resistance: Vec<f64>,
    pub dropped_sheets: Vec<String>,
}

impl IvAnalysis {
    /// Filter, concatenate, classify and detect.
    ///
    /// Fails only on dataset-level problems (no usable sheet, missing
    /// columns, fewer than two cycle markers). Cycles without a detectable
    /// transition are recorded as failures and skipped by the aggregates.
    pub fn build(sheets: Vec<Sheet>, config: &AnalysisConfig) -> Result<Self> {
        let selection = filter_sheets(sheets, config);
        if selection.kept.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let mut sweeps = Vec::with_capacity(selection.kept.len());
        let mut set_resistance = Vec::new();
        let mut reset_resistance = Vec::new();
        for sheet in &selection.kept {
            sweeps.push(Sweep::from_table(&sheet.table, &config.channels)?);
            let record = SheetRecord::from_table(&sheet.table);
            set_resistance.extend(record.resistances(Polarity::Rising));
            reset_resistance.extend(record.resistances(Polarity::Falling));
        }
        let sweep = Sweep::concat(&sweeps);
        let cycles = classify(&sweep)?;

        let outcomes = |polarity: Polarity| {
            detect_all(
                cycles
                    .segments(polarity)
                    .iter()
                    .map(|segment| (segment.samples(&sweep), segment.polarity)),
                config,
            )
        };
        let set = outcomes(Polarity::Rising);
        let reset = outcomes(Polarity::Falling);

        let analysis = Self {
            sweep,
            cycles,
            set,
            reset,
            set_resistance,
            reset_resistance,
            dropped_sheets: selection.dropped.into_iter().map(|(name, _)| name).collect(),
        };
        log::info!(
            "analysed {} sheets: {} cycles, Vset {:?}, Vreset {:?}",
            selection.kept.len(),
            analysis.total_cycles(),
            analysis.mean_transition(Polarity::Rising),
            analysis.mean_transition(Polarity::Falling),
        );
        Ok(analysis)
    }

    pub fn outcomes(&self, polarity: Polarity) -> &[CycleOutcome] {
        match polarity {
            Polarity::Rising => &self.set,
            Polarity::Falling => &self.reset,
        }
    }

    /// Detected transition voltages, failed cycles skipped.
    pub fn transition_voltages(&self, polarity: Polarity) -> Vec<f64> {
        self.outcomes(polarity)
            .iter()
            .filter_map(|o| o.as_ref().ok())
            .map(|t| t.result.transition_voltage)
            .collect()
    }

    pub fn failures(&self, polarity: Polarity) -> impl Iterator<Item = &CycleFailure> {
        self.outcomes(polarity).iter().filter_map(|o| o.as_ref().err())
    }

    /// Mean Vset (`Rising`) or Vreset (`Falling`) over successful cycles.
    pub fn mean_transition(&self, polarity: Polarity) -> Option<f64> {
        mean_voltage(self.outcomes(polarity))
    }

    pub fn resistances(&self, polarity: Polarity) -> &[f64] {
        match polarity {
            Polarity::Rising => &self.set_resistance,
            Polarity::Falling => &self.reset_resistance,
        }
    }

    pub fn voltage_cdf(&self, polarity: Polarity) -> Vec<(f64, f64)> {
        empirical_cdf(&self.transition_voltages(polarity))
    }

    pub fn resistance_cdf(&self, polarity: Polarity) -> Vec<(f64, f64)> {
        empirical_cdf(self.resistances(polarity))
    }

    /// `(cycle number, resistance)` with cycles counted from 1.
    pub fn resistance_series(&self, polarity: Polarity) -> Vec<(usize, f64)> {
        self.resistances(polarity)
            .iter()
            .enumerate()
            .map(|(i, r)| (i + 1, *r))
            .collect()
    }

    pub fn half_cycles(&self) -> usize {
        self.cycles.half_cycles
    }

    /// Full SET+RESET cycles; a trailing lone half-cycle counts as one half.
    pub fn total_cycles(&self) -> f64 {
        self.cycles.half_cycles as f64 / 2.0
    }

    pub fn export_table(&self) -> ExportTable {
        ExportTable::new(
            self.transition_voltages(Polarity::Falling),
            self.transition_voltages(Polarity::Rising),
            self.set_resistance.clone(),
            self.reset_resistance.clone(),
        )
    }
}

// ---------------------------------------------------------------------------
// ExportTable – the four result columns, padded to equal length
// ---------------------------------------------------------------------------

/// `Vreset, Vset, Rset, Rreset` columns, NaN-padded to the longest.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub vreset: Vec<f64>,
    pub vset: Vec<f64>,
    pub rset: Vec<f64>,
    pub rreset: Vec<f64>,
}

impl ExportTable {
    pub const HEADERS: [&'static str; 4] = ["Vreset", "Vset", "Rset", "Rreset"];

    pub fn new(vreset: Vec<f64>, vset: Vec<f64>, rset: Vec<f64>, rreset: Vec<f64>) -> Self {
        let rows = [&vreset, &vset, &rset, &rreset]
            .iter()
            .map(|c| c.len())
            .max()
            .unwrap_or(0);
        let pad = |mut column: Vec<f64>| {
            column.resize(rows, f64::NAN);
            column
        };
        Self {
            vreset: pad(vreset),
            vset: pad(vset),
            rset: pad(rset),
            rreset: pad(rreset),
        }
    }

    pub fn row_count(&self) -> usize {
        self.vset.len()
    }

    /// Write as CSV; NaN padding becomes an empty cell.
    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(Self::HEADERS)
            .context("writing export header")?;
        for row in 0..self.row_count() {
            let cells = [self.vreset[row], self.vset[row], self.rset[row], self.rreset[row]]
                .map(|v| if v.is_nan() { String::new() } else { v.to_string() });
            out.write_record(&cells)
                .with_context(|| format!("writing export row {row}"))?;
        }
        out.flush().context("flushing export")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Table;

    /// One full cycle (SET then RESET) of `span` samples per half, with a
    /// sharp resistance change at `switch` of the way up each branch.
    fn cycle_sheet(name: &str, span: usize, apex: f64, switch: f64) -> Sheet {
        let mut voltage = Vec::new();
        let mut current = Vec::new();
        for sign in [1.0, -1.0] {
            for k in 0..span {
                let phase = k as f64 / span as f64;
                let v = sign * apex * (1.0 - (2.0 * phase - 1.0).abs());
                let rising = phase < 0.5;
                let switched = if rising { 2.0 * phase >= switch } else { true };
                // SET lowers resistance, RESET raises it.
                let r = match (sign > 0.0, switched) {
                    (true, false) | (false, true) => 1e5,
                    (true, true) | (false, false) => 1e3,
                };
                voltage.push(v);
                current.push(v / r);
            }
        }
        let n = voltage.len();
        let table = Table::new()
            .with_column("Voltage", voltage)
            .with_column("Current", current)
            .with_column("TimeOutput", (0..n).map(|k| k as f64 * 1e-3).collect())
            .with_column("SetVoltage", vec![apex * switch])
            .with_column("ResetVoltage", vec![-apex * switch])
            .with_column("SetResistance", vec![1e3])
            .with_column("ResetResistance", vec![1e5]);
        Sheet::new(name, table)
    }

    #[test]
    fn two_sheets_give_two_cycles_per_polarity() {
        let sheets = vec![
            cycle_sheet("Data1", 40, 1.0, 0.5),
            Sheet::new("Settings", Table::new()),
            cycle_sheet("Data2", 40, 1.0, 0.5),
        ];
        let analysis = IvAnalysis::build(sheets, &AnalysisConfig::default()).unwrap();

        assert_eq!(analysis.dropped_sheets, vec!["Settings"]);
        assert_eq!(analysis.half_cycles(), 4);
        assert_eq!(analysis.total_cycles(), 2.0);
        assert_eq!(analysis.cycles.samples_per_half_cycle, 40);
        assert_eq!(analysis.set.len(), 2);
        assert_eq!(analysis.reset.len(), 2);
        assert!(analysis.failures(Polarity::Rising).next().is_none());

        let vset = analysis.mean_transition(Polarity::Rising).unwrap();
        let vreset = analysis.mean_transition(Polarity::Falling).unwrap();
        assert!(vset > 0.05 && vset <= 1.0, "vset = {vset}");
        assert!(vreset < -0.05 && vreset >= -1.0, "vreset = {vreset}");
        assert_eq!(analysis.resistances(Polarity::Rising), &[1e3, 1e3]);
        assert_eq!(analysis.resistance_series(Polarity::Falling), vec![(1, 1e5), (2, 1e5)]);
    }

    #[test]
    fn empty_upload_is_rejected() {
        let sheets = vec![Sheet::new("Calc", Table::new())];
        assert_eq!(
            IvAnalysis::build(sheets, &AnalysisConfig::default()).unwrap_err(),
            AnalysisError::EmptyDataset
        );
    }

    #[test]
    fn failed_cycles_are_skipped_by_the_mean() {
        let outcomes = vec![
            Ok(CycleTransition {
                cycle: 0,
                result: TransitionResult {
                    transition_voltage: 1.0,
                    no_peak_fallback: false,
                },
            }),
            Err(CycleFailure {
                polarity: Polarity::Rising,
                cycle: 1,
                source: AnalysisError::NoEligibleSamples {
                    polarity: Polarity::Rising,
                },
            }),
            Ok(CycleTransition {
                cycle: 2,
                result: TransitionResult {
                    transition_voltage: 0.5,
                    no_peak_fallback: true,
                },
            }),
        ];
        assert_eq!(mean_voltage(&outcomes), Some(0.75));
        assert_eq!(mean_voltage(&outcomes[1..2]), None);
        assert_eq!(
            outcomes[1].as_ref().unwrap_err().to_string(),
            "no SET transition found in cycle 2"
        );
    }

    #[test]
    fn export_pads_with_empty_cells() {
        let table = ExportTable::new(vec![-0.8], vec![0.9, 1.1], vec![1e3], vec![]);
        assert_eq!(table.row_count(), 2);
        assert!(table.rreset.iter().all(|v| v.is_nan()));

        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Vreset,Vset,Rset,Rreset\n-0.8,0.9,1000,\n,1.1,,\n");
    }
}
