//! Report and diagnostics data model returned by the analyzer.
//!
//! [`AnalysisReport`] carries the final segments together with an
//! [`AnalysisDiagnostics`] trace of every decision the pipeline took: the
//! estimated diameter and its categories, the SNR band, the effective
//! parameters, the detector used and its candidate counts, merging and
//! boundary refinement, a volume consistency check, the derived area profile
//! and stage timings.

pub mod report;
pub mod timing;

pub use report::{
    volume_check, AnalysisDiagnostics, AnalysisReport, DetectionTrace, VolumeCheck,
    VOLUME_TOLERANCE,
};
pub use timing::{Stage, StageClock, StageTiming, TimingBreakdown};
