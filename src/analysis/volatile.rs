//! Volatile-switching sweeps: every sheet is one complete cycle and only the
//! SET (rising) transition is of interest.

use super::dataset::{detect_all, mean_voltage, CycleOutcome};
use crate::config::AnalysisConfig;
use crate::data::filter::filter_sheets;
use crate::data::model::{Polarity, Sweep};
use crate::data::table::Sheet;
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone)]
pub struct VolatileAnalysis {
    /// One sweep per kept sheet, in upload order.
    pub sweeps: Vec<Sweep>,
    pub set: Vec<CycleOutcome>,
    pub dropped_sheets: Vec<String>,
}

impl VolatileAnalysis {
    /// Detect the SET voltage of every sheet. Use
    /// [`AnalysisConfig::volatile`] for the usual `DrainV`/`DrainI` channels.
    pub fn build(sheets: Vec<Sheet>, config: &AnalysisConfig) -> Result<Self> {
        let selection = filter_sheets(sheets, config);
        if selection.kept.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }
        let sweeps = selection
            .kept
            .iter()
            .map(|sheet| Sweep::from_table(&sheet.table, &config.channels))
            .collect::<Result<Vec<_>>>()?;

        let set = detect_all(
            sweeps.iter().map(|s| (s.as_slice(), Polarity::Rising)),
            config,
        );
        log::info!("analysed {} volatile cycles", sweeps.len());

        Ok(Self {
            sweeps,
            set,
            dropped_sheets: selection.dropped.into_iter().map(|(name, _)| name).collect(),
        })
    }

    pub fn total_cycles(&self) -> usize {
        self.sweeps.len()
    }

    pub fn mean_set_voltage(&self) -> Option<f64> {
        mean_voltage(&self.set)
    }
}
