/// Analysis layer: transition detection and the per-measurement aggregates
/// built on top of it.
///
/// Architecture:
/// ```text
///   Sweep (concatenated IV sheets)
///        │
///        ▼
///   ┌──────────┐
///   │  cycles   │  zero markers → SET / RESET segments
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ transition │  one segment → TransitionResult
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ dataset   │  per-polarity outcomes, means, CDFs, export table
///   └──────────┘
/// ```
///
/// `volatile`, `pulse` and `retention` cover the other measurement types.

pub mod cycles;
pub mod dataset;
pub mod pulse;
pub mod retention;
pub mod signal;
pub mod transition;
pub mod volatile;
