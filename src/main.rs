use profile_segmenter::{AnalyzerConfig, ProfileAnalyzer};
use std::f64::consts::PI;

fn main() {
    // Demo stub: a 20 mm cone under a 30 mm cylinder, both 5 mm in radius.
    let k = PI * 25.0 / 400.0;
    let heights: Vec<f64> = (0..=100).map(|i| i as f64 * 0.5).collect();
    let volumes: Vec<f64> = heights
        .iter()
        .map(|&h| {
            if h <= 20.0 {
                k * h.powi(3) / 3.0
            } else {
                k * 8000.0 / 3.0 + PI * 25.0 * (h - 20.0)
            }
        })
        .collect();

    let analyzer = ProfileAnalyzer::new(AnalyzerConfig::default());
    match analyzer.analyze(&heights, &volumes) {
        Ok(report) => {
            println!("{}", report.summary());
            println!(
                "diameter={:.2} mm latency_ms={:.3}",
                report.diagnostics.diameter_mm, report.diagnostics.timings.total_ms
            );
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
