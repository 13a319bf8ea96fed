use super::model::{Polarity, SheetRecord};
use super::table::Sheet;
use crate::config::AnalysisConfig;

// ---------------------------------------------------------------------------
// Sheet filter: which uploaded sheets take part in the analysis
// ---------------------------------------------------------------------------

/// Why a sheet was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Named in `excluded_sheets` (instrument `Calc`/`Settings` pages).
    Excluded,
    /// The voltage column is missing or its first value is empty.
    NoVoltageData,
    /// Recorded SET and RESET counts disagree and faulty sheets are ignored.
    Faulty,
}

/// Result of [`filter_sheets`]: the kept sheets in upload order plus the
/// names of the dropped ones.
#[derive(Debug, Clone, Default)]
pub struct SheetSelection {
    pub kept: Vec<Sheet>,
    pub dropped: Vec<(String, DropReason)>,
}

/// Apply the sheet-level policies of `config` to freshly uploaded sheets.
///
/// A sheet is kept when:
/// * its name is not in `config.excluded_sheets`
/// * its first voltage sample is present
/// * with `ignore_faulty_sheets` set, its recorded SET and RESET voltage
///   counts are equal
pub fn filter_sheets(sheets: Vec<Sheet>, config: &AnalysisConfig) -> SheetSelection {
    let mut selection = SheetSelection::default();

    for sheet in sheets {
        match drop_reason(&sheet, config) {
            Some(reason) => {
                log::warn!("dropping sheet '{}': {reason:?}", sheet.name);
                selection.dropped.push((sheet.name, reason));
            }
            None => selection.kept.push(sheet),
        }
    }
    selection
}

/// Whether `name` is one of the configured non-measurement sheets.
pub fn is_excluded(name: &str, config: &AnalysisConfig) -> bool {
    config.excluded_sheets.iter().any(|excluded| excluded == name)
}

/// Skip the `excluded_sheets` only, for measurements without a voltage
/// channel to check (retention logs, pulse traces on other channels).
pub fn measurement_sheets<'a>(sheets: &'a [Sheet], config: &AnalysisConfig) -> Vec<&'a Sheet> {
    sheets
        .iter()
        .filter(|sheet| {
            let excluded = is_excluded(&sheet.name, config);
            if excluded {
                log::debug!("skipping sheet '{}'", sheet.name);
            }
            !excluded
        })
        .collect()
}

fn drop_reason(sheet: &Sheet, config: &AnalysisConfig) -> Option<DropReason> {
    if is_excluded(&sheet.name, config) {
        return Some(DropReason::Excluded);
    }
    let first_voltage = sheet
        .table
        .column(&config.channels.voltage)
        .and_then(|v| v.first());
    if !first_voltage.is_some_and(|v| !v.is_nan()) {
        return Some(DropReason::NoVoltageData);
    }
    if config.ignore_faulty_sheets {
        let record = SheetRecord::from_table(&sheet.table);
        if record.event_count(Polarity::Rising) != record.event_count(Polarity::Falling) {
            return Some(DropReason::Faulty);
        }
    }
    None
}
