//! Retention measurements: resistance read back over time, recorded across
//! several sheets that each restart their clock at zero.

use serde::{Deserialize, Serialize};

use super::signal::nan_mean;
use crate::config::AnalysisConfig;
use crate::data::filter::measurement_sheets;
use crate::data::table::Sheet;
use crate::error::{AnalysisError, Result};

/// Column names of a retention sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionChannels {
    pub time: String,
    pub resistance: String,
}

impl Default for RetentionChannels {
    fn default() -> Self {
        Self {
            time: "Time".to_string(),
            resistance: "R".to_string(),
        }
    }
}

/// One resistance state (HRS or LRS) over the whole measurement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetentionTrace {
    pub time: Vec<f64>,
    pub resistance: Vec<f64>,
}

impl RetentionTrace {
    /// Join sheets into one trace on a continuous clock: each sheet's times
    /// are shifted by the end time of everything before it. Sheets named in
    /// `excluded_sheets` are skipped.
    pub fn stitch(sheets: &[Sheet], config: &AnalysisConfig) -> Result<Self> {
        let channels = &config.retention;
        let mut trace = Self::default();
        let mut offset = 0.0;

        for sheet in measurement_sheets(sheets, config) {
            let time = sheet.table.require(&channels.time)?;
            let resistance = sheet.table.require(&channels.resistance)?;
            if time.len() != resistance.len() {
                return Err(AnalysisError::ColumnLengthMismatch {
                    column: channels.resistance.clone(),
                    expected: time.len(),
                    found: resistance.len(),
                });
            }
            trace.time.extend(time.iter().map(|t| t + offset));
            trace.resistance.extend_from_slice(resistance);
            if let Some(end) = time.iter().rev().find(|t| !t.is_nan()) {
                offset += end;
            }
        }
        Ok(trace)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn mean_resistance(&self) -> Option<f64> {
        nan_mean(self.resistance.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Table;

    fn sheet(name: &str, time: Vec<f64>, r: Vec<f64>) -> Sheet {
        Sheet::new(name, Table::new().with_column("Time", time).with_column("R", r))
    }

    #[test]
    fn clock_keeps_running_across_sheets() {
        let sheets = vec![
            sheet("a", vec![0.0, 10.0], vec![1e5, 1.1e5]),
            sheet("b", vec![0.0, 5.0, f64::NAN], vec![1.2e5, f64::NAN, 1.3e5]),
            sheet("c", vec![0.0, 1.0], vec![1.4e5, 1.5e5]),
        ];
        let trace = RetentionTrace::stitch(&sheets, &AnalysisConfig::default()).unwrap();
        assert_eq!(trace.len(), 7);
        assert_eq!(&trace.time[..2], &[0.0, 10.0]);
        assert_eq!(&trace.time[2..4], &[10.0, 15.0]);
        assert_eq!(&trace.time[5..], &[15.0, 16.0]);
        let mean = trace.mean_resistance().unwrap();
        assert!((mean - 1.25e5).abs() < 1e-6);
    }

    #[test]
    fn missing_resistance_column_is_reported() {
        let sheets = vec![Sheet::new("a", Table::new().with_column("Time", vec![0.0]))];
        assert_eq!(
            RetentionTrace::stitch(&sheets, &AnalysisConfig::default()).unwrap_err(),
            AnalysisError::MissingColumn { column: "R".into() }
        );
    }

    #[test]
    fn instrument_settings_sheet_is_skipped() {
        let sheets = vec![
            sheet("Data1", vec![0.0, 2.0], vec![1e5, 1.2e5]),
            Sheet::new("Settings", Table::new().with_column("Key", vec![1.0])),
        ];
        let trace = RetentionTrace::stitch(&sheets, &AnalysisConfig::default()).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.time, vec![0.0, 2.0]);
    }
}
