use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use memristor_metrics::analysis::pulse::analyze_sheets;
use memristor_metrics::analysis::retention::RetentionTrace;
use memristor_metrics::analysis::volatile::VolatileAnalysis;
use memristor_metrics::data::loader::load_csv;
use memristor_metrics::data::table::Sheet;
use memristor_metrics::state::Session;
use memristor_metrics::{AnalysisConfig, Polarity};

/// Switching voltages and cycle statistics from memristor measurements.
#[derive(Parser, Debug)]
#[command(name = "memristor-metrics", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Multi-cycle IV sweeps: SET/RESET voltages and resistances
    Iv {
        #[command(flatten)]
        input: Input,

        /// Drop sheets whose recorded SET and RESET counts disagree
        #[arg(long)]
        ignore_faulty: bool,

        /// Write Vreset/Vset/Rset/Rreset columns to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Volatile sweeps, one cycle per sheet: SET voltage only
    Volatile {
        #[command(flatten)]
        input: Input,
    },

    /// Pulse traces: ON/OFF levels and switching times
    Pulse {
        #[command(flatten)]
        input: Input,
    },

    /// Retention measurements stitched onto one clock
    Retention {
        #[command(flatten)]
        input: Input,
    },
}

#[derive(Args, Debug)]
struct Input {
    /// CSV files, one sheet each
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON file overriding analysis settings
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Input {
    fn config_or(&self, default: impl FnOnce() -> AnalysisConfig) -> Result<AnalysisConfig> {
        match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path),
            None => Ok(default()),
        }
    }

    fn sheets(&self) -> Result<Vec<Sheet>> {
        self.files.iter().map(|path| load_csv(path)).collect()
    }
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Iv {
            input,
            ignore_faulty,
            export,
        } => {
            let mut config = input.config_or(AnalysisConfig::default)?;
            config.ignore_faulty_sheets |= ignore_faulty;
            run_iv(input.sheets()?, config, export.as_deref())
        }
        Command::Volatile { input } => {
            let config = input.config_or(AnalysisConfig::volatile)?;
            run_volatile(input.sheets()?, &config)
        }
        Command::Pulse { input } => {
            let config = input.config_or(AnalysisConfig::default)?;
            run_pulse(input.sheets()?, &config)
        }
        Command::Retention { input } => {
            let config = input.config_or(AnalysisConfig::default)?;
            run_retention(input.sheets()?, &config)
        }
    }
}

fn run_iv(sheets: Vec<Sheet>, config: AnalysisConfig, export: Option<&Path>) -> Result<()> {
    let mut session = Session::new(config);
    let loaded = session.load(sheets);
    if let Some(message) = &session.status_message {
        log::warn!("{message}");
    }
    loaded.context("analysing IV sweeps")?;
    let analysis = session.require_analysis()?;

    println!("half-cycles:  {}", analysis.half_cycles());
    println!("total cycles: {}", analysis.total_cycles());
    for polarity in [Polarity::Rising, Polarity::Falling] {
        let detected = analysis.transition_voltages(polarity).len();
        let failed = analysis.failures(polarity).count();
        print!("{:<5} {detected} detected, {failed} failed", polarity.event());
        match analysis.mean_transition(polarity) {
            Some(mean) => println!(", mean {mean:.4} V"),
            None => println!(),
        }
    }
    for failure in analysis
        .failures(Polarity::Rising)
        .chain(analysis.failures(Polarity::Falling))
    {
        println!("  {failure}: {}", failure.source);
    }
    if !analysis.dropped_sheets.is_empty() {
        println!("dropped sheets: {}", analysis.dropped_sheets.join(", "));
    }

    if let Some(path) = export {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        analysis.export_table().write_csv(file)?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

fn run_volatile(sheets: Vec<Sheet>, config: &AnalysisConfig) -> Result<()> {
    let analysis =
        VolatileAnalysis::build(sheets, config).context("analysing volatile sweeps")?;

    println!("cycles: {}", analysis.total_cycles());
    for outcome in &analysis.set {
        match outcome {
            Ok(found) => println!(
                "  cycle {:>3}: Vset {:.4} V{}",
                found.cycle + 1,
                found.result.transition_voltage,
                if found.result.no_peak_fallback {
                    " (fallback)"
                } else {
                    ""
                }
            ),
            Err(failure) => println!("  {failure}: {}", failure.source),
        }
    }
    if let Some(mean) = analysis.mean_set_voltage() {
        println!("mean Vset: {mean:.4} V");
    }
    Ok(())
}

fn run_pulse(sheets: Vec<Sheet>, config: &AnalysisConfig) -> Result<()> {
    for (name, outcome) in analyze_sheets(&sheets, config) {
        match outcome {
            Ok(metrics) => {
                println!("{name}:");
                println!(
                    "  ON   I {:.3e} A  V {:.4} V  R {:.3e} Ω  t90 {:.3e} s",
                    metrics.on.current,
                    metrics.on.voltage,
                    metrics.on.resistance,
                    metrics.on.switching_time
                );
                println!(
                    "  OFF  I {:.3e} A  V {:.4} V  R {:.3e} Ω  t10 {:.3e} s",
                    metrics.off.current,
                    metrics.off.voltage,
                    metrics.off.resistance,
                    metrics.off.switching_time
                );
            }
            Err(err) => log::warn!("sheet '{name}': {err}"),
        }
    }
    Ok(())
}

fn run_retention(sheets: Vec<Sheet>, config: &AnalysisConfig) -> Result<()> {
    let trace = RetentionTrace::stitch(&sheets, config)
        .context("stitching retention sheets")?;

    println!("samples: {}", trace.len());
    if let Some(end) = trace.time.iter().rev().find(|t| !t.is_nan()) {
        println!("duration: {end:.3e} s");
    }
    if let Some(mean) = trace.mean_resistance() {
        println!("mean R: {mean:.3e} Ω");
    }
    Ok(())
}
