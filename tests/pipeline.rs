use std::fs;
use std::path::{Path, PathBuf};

use memristor_metrics::data::loader::{load_csv, read_table};
use memristor_metrics::state::Session;
use memristor_metrics::{AnalysisConfig, IvAnalysis, Polarity};

/// One SET+RESET cycle of 20 samples, written the way the instrument exports
/// it: sweep columns plus one row of recorded per-cycle values.
fn write_cycle(dir: &Path, name: &str, record: [&str; 4]) -> PathBuf {
    let shape = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 0.8, 0.6, 0.4, 0.2];
    let mut text =
        String::from("TimeOutput,Voltage,Current,SetVoltage,ResetVoltage,SetResistance,ResetResistance\n");
    for k in 0..20 {
        let v = if k < 10 { shape[k] } else { -shape[k - 10] };
        // Low-resistance state between the SET and RESET switching points.
        let r = if (3..13).contains(&k) { 1e3 } else { 1e5 };
        let extra = if k == 0 { record.join(",") } else { ",,,".to_string() };
        text.push_str(&format!("{k},{v},{},{extra}\n", v / r));
    }
    let path = dir.join(format!("{name}.csv"));
    fs::write(&path, text).unwrap();
    path
}

fn load(paths: &[PathBuf]) -> Vec<memristor_metrics::data::table::Sheet> {
    paths.iter().map(|p| load_csv(p).unwrap()).collect()
}

#[test]
fn csv_upload_to_export() {
    let dir = tempfile::tempdir().unwrap();
    let paths = [
        write_cycle(dir.path(), "cycle1", ["0.9", "-0.8", "1000", "100000"]),
        write_cycle(dir.path(), "cycle2", ["0", "-0.7", "1200", "90000"]),
    ];
    let sheets = load(&paths);
    assert_eq!(sheets[0].name, "cycle1");

    let analysis = IvAnalysis::build(sheets, &AnalysisConfig::default()).unwrap();
    assert_eq!(analysis.half_cycles(), 4);
    assert_eq!(analysis.total_cycles(), 2.0);

    let vset = analysis.transition_voltages(Polarity::Rising);
    let vreset = analysis.transition_voltages(Polarity::Falling);
    assert_eq!(vset.len(), 2);
    assert_eq!(vreset.len(), 2);
    assert!(vset.iter().all(|v| *v > 0.05));
    assert!(vreset.iter().all(|v| *v < -0.05));
    assert_eq!(analysis.failures(Polarity::Rising).count(), 0);

    // The second cycle recorded no SET, so its resistance is not reported.
    assert_eq!(analysis.resistances(Polarity::Rising), &[1000.0]);
    assert_eq!(analysis.resistances(Polarity::Falling), &[100000.0, 90000.0]);
    assert_eq!(
        analysis.resistance_series(Polarity::Falling),
        vec![(1, 100000.0), (2, 90000.0)]
    );

    let out = dir.path().join("export.csv");
    analysis
        .export_table()
        .write_csv(fs::File::create(&out).unwrap())
        .unwrap();
    let exported = read_table(fs::File::open(&out).unwrap()).unwrap();
    assert_eq!(
        exported.column_names().collect::<Vec<_>>(),
        vec!["Rreset", "Rset", "Vreset", "Vset"]
    );
    assert_eq!(exported.row_count(), 2);
    let rset = exported.column("Rset").unwrap();
    assert_eq!(rset[0], 1000.0);
    assert!(rset[1].is_nan());
    assert_eq!(exported.column("Vset").unwrap(), vset.as_slice());
}

#[test]
fn faulty_and_settings_sheets_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let paths = [
        write_cycle(dir.path(), "good", ["0.9", "-0.8", "1000", "100000"]),
        write_cycle(dir.path(), "faulty", ["0.9", "", "1000", ""]),
    ];
    let mut sheets = load(&paths);
    let settings = dir.path().join("Settings.csv");
    fs::write(&settings, "Key,Value\n1,2\n").unwrap();
    sheets.push(load_csv(&settings).unwrap());

    let config = AnalysisConfig {
        ignore_faulty_sheets: true,
        ..AnalysisConfig::default()
    };
    let analysis = IvAnalysis::build(sheets, &config).unwrap();
    assert_eq!(analysis.dropped_sheets, vec!["faulty", "Settings"]);
    assert_eq!(analysis.half_cycles(), 2);
    assert_eq!(analysis.total_cycles(), 1.0);
}

#[test]
fn session_browses_loaded_half_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let paths = [
        write_cycle(dir.path(), "a", ["0.9", "-0.8", "1000", "100000"]),
        write_cycle(dir.path(), "b", ["0.9", "-0.8", "1000", "100000"]),
    ];
    let mut session = Session::default();
    session.load(load(&paths)).unwrap();

    session.select_half_cycle(2);
    let window = session.current_window().unwrap();
    assert_eq!(window.len(), 10);
    assert_eq!(window.voltage[0], 0.0);
    let (polarity, _) = session.current_transition().unwrap().unwrap();
    assert_eq!(polarity, Polarity::Rising);

    session.set_cumulative(true);
    assert_eq!(session.current_window().unwrap().len(), 30);
}
