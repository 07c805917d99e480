//! Fit-driven refinement of segment boundaries.
//!
//! Detection looks at derivatives of the area, and volume noise hurts those
//! most near an apex where the volumes are small: spurious boundaries pass
//! validation, and real kinks can drift or vanish. This stage revisits the
//! boundaries on the volumes themselves. Each pass
//!
//! 1. moves every interior boundary to the position between its neighbours
//!    that minimises the summed squared residuals of the two segments;
//! 2. removes boundaries while that lowers the information criterion
//!    `n · ln(SSE / n) + penalty · k · ln(n)`, with `k` counting the shape
//!    parameters, one volume offset per segment and one per boundary;
//! 3. inserts boundaries while that lowers it.
//!
//! Passes repeat until the boundaries stop changing. Residuals below a floor
//! tied to the profile's volume range count as exact, so a noiseless profile
//! never trades a boundary for rounding noise.

use crate::fit::{ScoredSegment, SegmentFitter};
use crate::types::Segment;
use log::debug;
use serde::Serialize;

/// Knobs of the boundary refinement.
#[derive(Clone, Copy, Debug)]
pub struct RefineOptions {
    /// Fewest samples in a refined segment.
    pub min_points: usize,
    /// Weight of the parameter term of the criterion.
    pub penalty: f64,
    /// Residual RMS, relative to the profile's volume range, treated as exact.
    pub noise_floor: f64,
    pub max_passes: usize,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            min_points: 12,
            penalty: 6.0,
            noise_floor: 1e-5,
            max_passes: 4,
        }
    }
}

/// What the refinement changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementTrace {
    pub passes: usize,
    pub moved: usize,
    pub removed: usize,
    pub inserted: usize,
    /// True when the profile was too short to refine.
    pub skipped: bool,
}

/// Refines a partition through a fitter over the same profile.
pub struct SegmentRefiner<'f, 'a> {
    fitter: &'f SegmentFitter<'a>,
    options: RefineOptions,
    samples: usize,
    sse_floor: f64,
}

impl<'f, 'a> SegmentRefiner<'f, 'a> {
    pub fn new(fitter: &'f SegmentFitter<'a>, options: RefineOptions) -> Self {
        let profile = fitter.profile();
        let volumes = profile.volumes();
        let range = match (volumes.first(), volumes.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        let samples = profile.len();
        let sse_floor =
            (samples as f64 * (options.noise_floor * range).powi(2)).max(f64::MIN_POSITIVE);
        Self {
            fitter,
            options,
            samples,
            sse_floor,
        }
    }

    /// Information criterion of a partition given as consecutive pieces.
    pub fn criterion<'s>(&self, pieces: impl IntoIterator<Item = &'s ScoredSegment>) -> f64 {
        let mut sse = 0.0;
        let mut parameters = 0usize;
        let mut count = 0usize;
        for piece in pieces {
            sse += piece.sse;
            parameters += piece.parameters;
            count += 1;
        }
        let n = self.samples.max(1) as f64;
        let k = (parameters + count.saturating_sub(1)) as f64;
        n * (sse.max(self.sse_floor) / n).ln() + self.options.penalty * k * n.ln()
    }

    /// Returns the refined segments; the partition of the profile is kept.
    pub fn refine(&self, segments: &[Segment]) -> (Vec<Segment>, RefinementTrace) {
        let mut trace = RefinementTrace::default();
        if segments.is_empty() || self.samples < 2 * self.options.min_points {
            trace.skipped = true;
            return (segments.to_vec(), trace);
        }

        let mut pieces: Vec<ScoredSegment> = segments
            .iter()
            .map(|s| self.fitter.fit_scored(s.start_idx, s.end_idx))
            .collect();
        for pass in 1..=self.options.max_passes.max(1) {
            let before = bounds(&pieces);
            trace.passes = pass;
            trace.moved += self.shift_boundaries(&mut pieces);
            trace.removed += self.remove_boundaries(&mut pieces);
            trace.inserted += self.insert_boundaries(&mut pieces);
            if bounds(&pieces) == before {
                break;
            }
        }
        debug!(
            "refinement: {} -> {} segments {:?}",
            segments.len(),
            pieces.len(),
            trace
        );
        (pieces.into_iter().map(|p| p.segment).collect(), trace)
    }

    /// Moves each interior boundary to its least-squares position.
    fn shift_boundaries(&self, pieces: &mut [ScoredSegment]) -> usize {
        let mut moved = 0;
        for i in 0..pieces.len().saturating_sub(1) {
            let start = pieces[i].segment.start_idx;
            let end = pieces[i + 1].segment.end_idx;
            let current = pieces[i + 1].segment.start_idx;
            let mut best_sse = pieces[i].sse + pieces[i + 1].sse;
            if best_sse <= self.sse_floor {
                continue;
            }
            let mut best = None;
            for k in self.split_positions(start, end) {
                if k == current {
                    continue;
                }
                let Some((left, right)) = self.fit_split(start, k, end) else {
                    continue;
                };
                let total = left.sse + right.sse;
                if total < best_sse * (1.0 - 1e-9) {
                    best_sse = total;
                    best = Some((left, right));
                }
            }
            if let Some((left, right)) = best {
                debug!(
                    "boundary {current} moved to {}",
                    right.segment.start_idx
                );
                pieces[i] = left;
                pieces[i + 1] = right;
                moved += 1;
            }
        }
        moved
    }

    /// Joins neighbours, best first, while the criterion does not rise.
    fn remove_boundaries(&self, pieces: &mut Vec<ScoredSegment>) -> usize {
        let mut removed = 0;
        while pieces.len() > 1 {
            let base = self.criterion(pieces.iter());
            let mut best: Option<(f64, usize, ScoredSegment)> = None;
            for i in 0..pieces.len() - 1 {
                let joint = self
                    .fitter
                    .fit_scored(pieces[i].segment.start_idx, pieces[i + 1].segment.end_idx);
                if !joint.is_fitted() {
                    continue;
                }
                let delta = self.criterion(
                    pieces[..i]
                        .iter()
                        .chain(std::iter::once(&joint))
                        .chain(&pieces[i + 2..]),
                ) - base;
                if delta.is_nan() {
                    continue;
                }
                if best.as_ref().map_or(true, |(d, _, _)| delta < *d) {
                    best = Some((delta, i, joint));
                }
            }
            match best {
                Some((delta, i, joint)) if delta <= 0.0 => {
                    debug!(
                        "boundary {} removed (criterion {delta:+.2})",
                        pieces[i + 1].segment.start_idx
                    );
                    pieces[i] = joint;
                    pieces.remove(i + 1);
                    removed += 1;
                }
                _ => break,
            }
        }
        removed
    }

    /// Splits segments, best first, while the criterion drops.
    fn insert_boundaries(&self, pieces: &mut Vec<ScoredSegment>) -> usize {
        let mut inserted = 0;
        loop {
            let base = self.criterion(pieces.iter());
            let mut best: Option<(f64, usize, ScoredSegment, ScoredSegment)> = None;
            for (i, piece) in pieces.iter().enumerate() {
                let (start, end) = (piece.segment.start_idx, piece.segment.end_idx);
                for k in self.split_positions(start, end) {
                    let Some((left, right)) = self.fit_split(start, k, end) else {
                        continue;
                    };
                    let delta = self.criterion(
                        pieces[..i]
                            .iter()
                            .chain([&left, &right])
                            .chain(&pieces[i + 1..]),
                    ) - base;
                    if delta.is_nan() {
                        continue;
                    }
                    if best.as_ref().map_or(true, |(d, ..)| delta < *d) {
                        best = Some((delta, i, left, right));
                    }
                }
            }
            match best {
                Some((delta, i, left, right)) if delta < 0.0 => {
                    debug!(
                        "boundary {} inserted (criterion {delta:+.2})",
                        right.segment.start_idx
                    );
                    pieces[i] = left;
                    pieces.insert(i + 1, right);
                    inserted += 1;
                }
                _ => return inserted,
            }
        }
    }

    /// First indices of a right part leaving both parts `min_points` long.
    fn split_positions(&self, start: usize, end: usize) -> std::ops::RangeInclusive<usize> {
        let min_points = self.options.min_points.max(1);
        (start + min_points)..=(end + 1).saturating_sub(min_points)
    }

    fn fit_split(
        &self,
        start: usize,
        k: usize,
        end: usize,
    ) -> Option<(ScoredSegment, ScoredSegment)> {
        let left = self.fitter.fit_scored(start, k - 1);
        let right = self.fitter.fit_scored(k, end);
        (left.is_fitted() && right.is_fitted()).then_some((left, right))
    }
}

fn bounds(pieces: &[ScoredSegment]) -> Vec<(usize, usize)> {
    pieces
        .iter()
        .map(|p| (p.segment.start_idx, p.segment.end_idx))
        .collect()
}
