/// Data layer: core types, ingestion adapter, and sheet filtering.
///
/// Architecture:
/// ```text
///  .csv sheets (or tables from any ingestion layer)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  drop Calc/Settings, empty and faulty sheets
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Sweep / SheetRecord per kept sheet
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod table;
