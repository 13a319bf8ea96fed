use std::fmt;
use std::ops::Range;

use serde::Serialize;

use super::table::Table;
use crate::config::ChannelNames;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Polarity – direction of the voltage ramp a transition is searched on
// ---------------------------------------------------------------------------

/// Which branch of a sweep a segment belongs to.
///
/// `Rising` segments are searched for the SET event, `Falling` segments for
/// the RESET event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Polarity {
    Rising,
    Falling,
}

impl Polarity {
    /// `+1.0` for `Rising`, `-1.0` for `Falling`.
    pub fn sign(self) -> f64 {
        match self {
            Polarity::Rising => 1.0,
            Polarity::Falling => -1.0,
        }
    }

    /// Name of the switching event this polarity detects.
    pub fn event(self) -> &'static str {
        match self {
            Polarity::Rising => "SET",
            Polarity::Falling => "RESET",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event())
    }
}

// ---------------------------------------------------------------------------
// Sweep – one continuous time/voltage/current table
// ---------------------------------------------------------------------------

/// An ordered measurement table. All three columns have the same length and
/// are ordered by acquisition time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sweep {
    pub time: Vec<f64>,
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
}

impl Sweep {
    /// Build a sweep from parallel columns.
    pub fn new(time: Vec<f64>, voltage: Vec<f64>, current: Vec<f64>) -> Result<Self> {
        for (column, values) in [("time", &time), ("current", &current)] {
            if values.len() != voltage.len() {
                return Err(AnalysisError::ColumnLengthMismatch {
                    column: column.to_string(),
                    expected: voltage.len(),
                    found: values.len(),
                });
            }
        }
        Ok(Self {
            time,
            voltage,
            current,
        })
    }

    /// Pull the voltage, current and time columns out of a sheet.
    ///
    /// The first time column name in `channels.time` that the table carries
    /// is used, so `TimeOutput` and `Time` datasets both load.
    pub fn from_table(table: &Table, channels: &ChannelNames) -> Result<Self> {
        let voltage = table.require(&channels.voltage)?.to_vec();
        let current = table.require(&channels.current)?.to_vec();
        let time = channels
            .time
            .iter()
            .find_map(|name| table.column(name))
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: channels.time.join("|"),
            })?
            .to_vec();
        Self::new(time, voltage, current)
    }

    /// Concatenate sweeps end to end, keeping sample order.
    pub fn concat<'a>(sweeps: impl IntoIterator<Item = &'a Sweep>) -> Self {
        let mut out = Sweep::default();
        for sweep in sweeps {
            out.time.extend_from_slice(&sweep.time);
            out.voltage.extend_from_slice(&sweep.voltage);
            out.current.extend_from_slice(&sweep.current);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    /// Borrow the whole sweep as a slice.
    pub fn as_slice(&self) -> SweepSlice<'_> {
        SweepSlice {
            time: &self.time,
            voltage: &self.voltage,
            current: &self.current,
        }
    }

    /// Borrow a sub-range, clamped to the sweep's length.
    pub fn window(&self, range: Range<usize>) -> SweepSlice<'_> {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        SweepSlice {
            time: &self.time[start..end],
            voltage: &self.voltage[start..end],
            current: &self.current[start..end],
        }
    }
}

/// A borrowed, contiguous run of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSlice<'a> {
    pub time: &'a [f64],
    pub voltage: &'a [f64],
    pub current: &'a [f64],
}

impl SweepSlice<'_> {
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Segment – a typed half-cycle of a sweep
// ---------------------------------------------------------------------------

/// A half-cycle of a sweep paired with the polarity it is analysed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Sample range within the parent sweep.
    pub range: Range<usize>,
    pub polarity: Polarity,
}

impl Segment {
    pub fn samples<'a>(&self, sweep: &'a Sweep) -> SweepSlice<'a> {
        sweep.window(self.range.clone())
    }
}

// ---------------------------------------------------------------------------
// TransitionResult – output of the detector
// ---------------------------------------------------------------------------

/// The detected switching voltage of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionResult {
    pub transition_voltage: f64,
    /// True when no qualifying `dR` peak existed and the voltage came from
    /// the fallback rule.
    pub no_peak_fallback: bool,
}

// ---------------------------------------------------------------------------
// SheetRecord – instrument-computed per-cycle columns
// ---------------------------------------------------------------------------

/// Columns some instruments write next to the raw sweep: one row per cycle,
/// padded with NaN. A recorded voltage of exactly zero means the event did
/// not happen in that cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRecord {
    pub set_voltage: Vec<f64>,
    pub reset_voltage: Vec<f64>,
    pub set_resistance: Vec<f64>,
    pub reset_resistance: Vec<f64>,
}

impl SheetRecord {
    pub const SET_VOLTAGE: &'static str = "SetVoltage";
    pub const RESET_VOLTAGE: &'static str = "ResetVoltage";
    pub const SET_RESISTANCE: &'static str = "SetResistance";
    pub const RESET_RESISTANCE: &'static str = "ResetResistance";

    /// Missing columns read as empty.
    pub fn from_table(table: &Table) -> Self {
        let take = |name: &str| table.column(name).map(<[f64]>::to_vec).unwrap_or_default();
        Self {
            set_voltage: take(Self::SET_VOLTAGE),
            reset_voltage: take(Self::RESET_VOLTAGE),
            set_resistance: take(Self::SET_RESISTANCE),
            reset_resistance: take(Self::RESET_RESISTANCE),
        }
    }

    /// Recorded resistances for `polarity`, keeping only cycles in which the
    /// event happened. Without a voltage column every finite value is kept.
    pub fn resistances(&self, polarity: Polarity) -> Vec<f64> {
        let (voltage, resistance) = match polarity {
            Polarity::Rising => (&self.set_voltage, &self.set_resistance),
            Polarity::Falling => (&self.reset_voltage, &self.reset_resistance),
        };
        resistance
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_finite())
            .filter(|(row, _)| {
                voltage.is_empty()
                    || voltage
                        .get(*row)
                        .is_some_and(|v| v.is_finite() && *v != 0.0)
            })
            .map(|(_, r)| *r)
            .collect()
    }

    /// Count of recorded (non-NaN) voltages for `polarity`.
    pub fn event_count(&self, polarity: Polarity) -> usize {
        let voltage = match polarity {
            Polarity::Rising => &self.set_voltage,
            Polarity::Falling => &self.reset_voltage,
        };
        voltage.iter().filter(|v| !v.is_nan()).count()
    }
}
