use crate::analysis::dataset::IvAnalysis;
use crate::analysis::transition::detect;
use crate::config::AnalysisConfig;
use crate::data::model::{Polarity, SweepSlice, TransitionResult};
use crate::data::table::Sheet;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The browsing state of an IV-sweep session, independent of any front end.
pub struct Session {
    pub config: AnalysisConfig,

    /// Analysis of the last successful upload (None until then).
    pub analysis: Option<IvAnalysis>,

    /// Selected half-cycle, zero-based.
    pub half_cycle: usize,

    /// Show every half-cycle up to the selected one instead of just it.
    pub cumulative: bool,

    /// Status / error message for the user.
    pub status_message: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl Session {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            analysis: None,
            half_cycle: 0,
            cumulative: false,
            status_message: None,
        }
    }

    /// Replace the current dataset with a fresh analysis of `sheets`.
    ///
    /// On failure the previous analysis is dropped too, so results from two
    /// uploads never mix.
    pub fn load(&mut self, sheets: Vec<Sheet>) -> Result<()> {
        self.analysis = None;
        self.half_cycle = 0;

        match IvAnalysis::build(sheets, &self.config) {
            Ok(analysis) => {
                let failed = analysis.failures(Polarity::Rising).count()
                    + analysis.failures(Polarity::Falling).count();
                self.status_message = (failed > 0).then(|| {
                    let first = analysis
                        .failures(Polarity::Rising)
                        .chain(analysis.failures(Polarity::Falling))
                        .next()
                        .map(|f| format!("{f}: {}", f.source))
                        .unwrap_or_default();
                    format!("{failed} half-cycles skipped ({first})")
                });
                self.analysis = Some(analysis);
                Ok(())
            }
            Err(err) => {
                self.status_message = Some(format!("could not analyse upload: {err}"));
                Err(err)
            }
        }
    }

    /// Select a half-cycle, clamped to the loaded dataset.
    pub fn select_half_cycle(&mut self, index: usize) {
        let last = self
            .analysis
            .as_ref()
            .map_or(0, |a| a.half_cycles().saturating_sub(1));
        self.half_cycle = index.min(last);
    }

    pub fn set_cumulative(&mut self, cumulative: bool) {
        self.cumulative = cumulative;
    }

    /// Samples of the selected half-cycle, or of every half-cycle up to it
    /// in cumulative mode.
    pub fn current_window(&self) -> Option<SweepSlice<'_>> {
        let analysis = self.analysis.as_ref()?;
        let span = analysis.cycles.samples_per_half_cycle;
        let start = span * self.half_cycle;
        if start >= analysis.sweep.len() {
            return None;
        }
        let end = span * (self.half_cycle + 1);
        let from = if self.cumulative { 0 } else { start };
        Some(analysis.sweep.window(from..end))
    }

    /// Transition of the selected half-cycle alone.
    ///
    /// Its polarity is read from the voltage one sample after the start of
    /// the half-cycle: positive means SET.
    pub fn current_transition(&self) -> Option<Result<(Polarity, TransitionResult)>> {
        let analysis = self.analysis.as_ref()?;
        let span = analysis.cycles.samples_per_half_cycle;
        let start = span * self.half_cycle;
        let probe = *analysis.sweep.voltage.get(start + 1)?;
        let polarity = if probe > 0.0 {
            Polarity::Rising
        } else {
            Polarity::Falling
        };
        let samples = analysis.sweep.window(start..start + span);
        Some(
            detect(samples, polarity, &self.config.detector())
                .map(|result| (polarity, result)),
        )
    }

    /// Whether the dataset needs reloading before anything can be shown.
    pub fn is_empty(&self) -> bool {
        self.analysis.is_none()
    }

    /// The error to show when nothing is loaded.
    pub fn require_analysis(&self) -> Result<&IvAnalysis> {
        self.analysis.as_ref().ok_or(AnalysisError::EmptyDataset)
    }
}
