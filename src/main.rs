//! Trace generator entry point: CLI wiring and config-driven engine construction.

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use tracing::Level;

use nilm_tracegen::config::ScenarioConfig;
use nilm_tracegen::io::export::export_trace;
use nilm_tracegen::sim::engine::Engine;
use nilm_tracegen::sim::noise::BackgroundNoise;
use nilm_tracegen::sim::summary::TraceSummary;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    days_override: Option<usize>,
    seed_override: Option<u64>,
    alternate: bool,
    noise_override: Option<String>,
    output: Option<PathBuf>,
    overwrite: bool,
    verbose: bool,
}

fn print_help() {
    eprintln!("nilm-tracegen: synthetic household power traces for NILM research");
    eprintln!();
    eprintln!("Usage: nilm-tracegen [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>    Load scenario from TOML config file");
    eprintln!("  --preset <name>      Use a built-in preset ({})", ScenarioConfig::PRESETS.join(", "));
    eprintln!("  --days <n>           Override number of days to synthesize");
    eprintln!("  --seed <u64>         Override random seed");
    eprintln!("  --alternate          Vary appliance models across operations");
    eprintln!("  --noise <spec>       Background noise: none, G<watts>, or C<watts>");
    eprintln!("  --output <dir>       Write CSV traces and events.csv into <dir>");
    eprintln!("  --overwrite          Replace existing output files");
    eprintln!("  --verbose            Log debug output");
    eprintln!("  --help               Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the demo preset is used.");
}

/// Returns the value following flag `args[*i]`, or exits with an error.
fn value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    *i += 1;
    match args.get(*i) {
        Some(v) => v,
        None => {
            eprintln!("error: {} requires {what}", args[*i - 1]);
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        days_override: None,
        seed_override: None,
        alternate: false,
        noise_override: None,
        output: None,
        overwrite: false,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                cli.scenario_path = Some(value(&args, &mut i, "a path argument").to_string());
            }
            "--preset" => {
                cli.preset = Some(value(&args, &mut i, "a name argument").to_string());
            }
            "--days" => {
                let raw = value(&args, &mut i, "a positive integer");
                match raw.parse::<usize>() {
                    Ok(d) if d > 0 => cli.days_override = Some(d),
                    _ => {
                        eprintln!("error: --days value \"{raw}\" is not a positive integer");
                        process::exit(1);
                    }
                }
            }
            "--seed" => {
                let raw = value(&args, &mut i, "a u64 argument");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--alternate" => {
                cli.alternate = true;
            }
            "--noise" => {
                let raw = value(&args, &mut i, "a noise spec");
                if let Err(e) = raw.parse::<BackgroundNoise>() {
                    eprintln!("error: --noise: {e}");
                    process::exit(1);
                }
                cli.noise_override = Some(raw.to_string());
            }
            "--output" => {
                cli.output = Some(PathBuf::from(value(&args, &mut i, "a directory argument")));
            }
            "--overwrite" => {
                cli.overwrite = true;
            }
            "--verbose" | "-v" => {
                cli.verbose = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    let cli = parse_args();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .without_time()
        .compact()
        .init();

    // Load config: --scenario takes priority, then --preset, then the demo preset
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else {
        ScenarioConfig::from_preset(cli.preset.as_deref().unwrap_or("demo"))
    };
    let mut scenario = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    // Apply overrides
    if let Some(days) = cli.days_override {
        scenario.general.days = days;
    }
    if let Some(seed) = cli.seed_override {
        scenario.general.seed = seed;
    }
    if cli.alternate {
        scenario.general.vary_appliances = true;
    }
    if let Some(noise) = cli.noise_override {
        scenario.general.noise = noise;
    }

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    // Build and run
    let engine = match Engine::from_config(&scenario) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    let appliances: Vec<String> = engine.appliances().keys().cloned().collect();
    let (seed, noise) = (engine.seed(), engine.noise());
    let trace = engine.run();

    let summary = TraceSummary::from_trace(&trace, appliances.iter().map(String::as_str), seed, noise);
    println!("{summary}");

    // Export CSV if requested
    if let Some(ref dir) = cli.output {
        match export_trace(&trace, dir, cli.overwrite) {
            Ok(report) => eprintln!(
                "{} of {} output files written to {}",
                report.written.len(),
                report.written.len() + report.skipped.len(),
                dir.display()
            ),
            Err(e) => {
                eprintln!("error: failed to write CSV: {e}");
                process::exit(1);
            }
        }
    }
}
