//! Splitting a concatenated multi-cycle sweep into typed half-cycles.

use crate::data::model::{Polarity, Segment, Sweep};
use crate::error::{AnalysisError, Result};

/// Offset from a block start to the sample whose sign decides its polarity.
const POLARITY_PROBE: usize = 2;

/// The classified half-cycles of one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSet {
    /// SET half-cycles in acquisition order.
    pub set: Vec<Segment>,
    /// RESET half-cycles in acquisition order.
    pub reset: Vec<Segment>,
    /// Distance between the first two zero markers.
    pub samples_per_half_cycle: usize,
    /// Number of zero markers found, i.e. half-cycles recorded.
    pub half_cycles: usize,
}

impl CycleSet {
    pub fn segments(&self, polarity: Polarity) -> &[Segment] {
        match polarity {
            Polarity::Rising => &self.set,
            Polarity::Falling => &self.reset,
        }
    }
}

/// Indices of samples whose voltage is exactly zero.
///
/// Ingestion writes an exact `0.0` at every half-cycle boundary; this is not
/// a general zero-crossing detector.
pub fn zero_markers(voltage: &[f64]) -> Vec<usize> {
    voltage
        .iter()
        .enumerate()
        .filter(|(_, v)| **v == 0.0)
        .map(|(i, _)| i)
        .collect()
}

/// Classify every half-cycle of `sweep` as SET or RESET.
///
/// Each zero marker after the first (plus a synthetic one
/// `samples_per_half_cycle - 1` past the last marker) closes a block of
/// `samples_per_half_cycle` samples ending at that marker. A block whose
/// voltage two samples in is negative is a RESET; otherwise it is a SET.
/// Blocks are clamped to the sweep, and blocks too short to probe are skipped.
pub fn classify(sweep: &Sweep) -> Result<CycleSet> {
    let mut markers = zero_markers(&sweep.voltage);
    if markers.len() < 2 {
        return Err(AnalysisError::InsufficientCycleMarkers {
            found: markers.len(),
        });
    }

    let span = markers[1] - markers[0];
    let half_cycles = markers.len();
    if let Some(&last) = markers.last() {
        markers.push(last + span - 1);
    }

    let mut set = Vec::new();
    let mut reset = Vec::new();
    for &end in &markers[1..] {
        let start = end.saturating_sub(span);
        let Some(&probe) = sweep.voltage.get(start + POLARITY_PROBE) else {
            log::warn!("half-cycle starting at sample {start} is too short to classify");
            continue;
        };
        let segment = Segment {
            range: start..end.min(sweep.len()),
            polarity: if probe < 0.0 {
                Polarity::Falling
            } else {
                Polarity::Rising
            },
        };
        match segment.polarity {
            Polarity::Rising => set.push(segment),
            Polarity::Falling => reset.push(segment),
        }
    }

    log::debug!(
        "classified {} SET and {} RESET half-cycles of {span} samples",
        set.len(),
        reset.len()
    );
    Ok(CycleSet {
        set,
        reset,
        samples_per_half_cycle: span,
        half_cycles,
    })
}
