use profile_segmenter::config::profile;
use profile_segmenter::io::{load_samples_json, write_json_file};
use profile_segmenter::ProfileAnalyzer;
use std::env;
use std::path::Path;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = profile::load_config(Path::new(&config_path))?;

    let samples = load_samples_json(&config.input)?;
    let analyzer = ProfileAnalyzer::new(config.analyzer);
    let report = analyzer
        .analyze(&samples.heights, &samples.volumes)
        .map_err(|e| format!("Analysis of {} failed: {e}", config.input.display()))?;

    write_json_file(&config.output.report_json, &report)?;

    if config.output.print_summary {
        println!("{}", report.summary());
    }
    if let Some(check) = report.volume_check() {
        println!(
            "volume check: modelled {:.1} vs measured {:.1} ({:.2}%)",
            check.modelled,
            check.measured,
            100.0 * check.relative_error
        );
    }
    println!(
        "Saved {} segments to {}",
        report.segments.len(),
        config.output.report_json.display()
    );

    Ok(())
}

fn usage() -> String {
    "Usage: profile_segments <config.json>".to_string()
}
