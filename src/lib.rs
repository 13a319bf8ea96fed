//! Switching-voltage extraction and cycle statistics for memristor
//! electrical-characterization data (IV sweeps, volatile sweeps, pulse and
//! retention measurements).

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use analysis::dataset::{ExportTable, IvAnalysis};
pub use analysis::transition::{detect, DetectorSettings};
pub use config::{AnalysisConfig, ChannelNames};
pub use data::model::{Polarity, Segment, Sweep, SweepSlice, TransitionResult};
pub use error::{AnalysisError, CycleFailure};
