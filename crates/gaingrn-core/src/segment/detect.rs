use super::{BreakKind, Segment, SseKind, SseRecord, SseState};
use crate::error::Result;
use crate::residue::is_helix_breaker;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Turns per-residue assignments into helix and strand [`Segment`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDetector {
    /// Longest gap between two runs of the same kind that is still bridged.
    pub spacing: usize,
    pub min_helix_length: usize,
    pub min_strand_length: usize,
    /// Residues with an outlier magnitude above this value never belong to a segment.
    pub outlier_cutoff: Option<f64>,
}

impl Default for SegmentDetector {
    fn default() -> Self {
        SegmentDetector {
            spacing: 1,
            min_helix_length: 3,
            min_strand_length: 2,
            outlier_cutoff: None,
        }
    }
}

impl SegmentDetector {
    fn min_length(&self, kind: SseKind) -> usize {
        match kind {
            SseKind::Helix => self.min_helix_length,
            SseKind::Strand => self.min_strand_length,
        }
    }

    /// Detects segments of both kinds, sorted by start residue.
    ///
    /// `bounds` restricts the result to `lo..=hi`; segments crossing a bound are clipped.
    pub fn detect(
        &self,
        records: &[SseRecord],
        bounds: Option<(i32, i32)>,
    ) -> Result<Vec<Segment>> {
        let by_residue: BTreeMap<i32, &SseRecord> =
            records.iter().map(|rec| (rec.residue, rec)).collect();
        let (first, last) = match (by_residue.keys().next(), by_residue.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Ok(Vec::new()),
        };
        let (lo, hi) = bounds.unwrap_or((first, last));

        let mut segments = Vec::new();
        for kind in SseKind::iter() {
            for (start, end) in self.runs(&by_residue, kind, first, last) {
                if ((end - start + 1) as usize) < self.min_length(kind) {
                    continue;
                }
                let segment = self.annotate(Segment::new(kind, start, end)?, &by_residue)?;
                match segment.clipped(lo, hi) {
                    Some(clipped) if clipped.len() >= self.min_length(kind) => {
                        segments.push(clipped)
                    }
                    _ => {}
                }
            }
        }
        segments.sort_by_key(|seg| (seg.start(), seg.end()));
        Ok(segments)
    }

    /// Maximal runs of `kind`, with short gaps bridged.
    fn runs(
        &self,
        by_residue: &BTreeMap<i32, &SseRecord>,
        kind: SseKind,
        first: i32,
        last: i32,
    ) -> Vec<(i32, i32)> {
        let in_signal = |res: i32| {
            by_residue
                .get(&res)
                .map(|rec| rec.state.kind() == Some(kind) && !rec.exceeds(self.outlier_cutoff))
                .unwrap_or(false)
        };
        let truncated = |res: i32| {
            by_residue
                .get(&res)
                .map(|rec| rec.exceeds(self.outlier_cutoff))
                .unwrap_or(false)
        };

        let mut raw: Vec<(i32, i32)> = Vec::new();
        for res in first..=last {
            if !in_signal(res) {
                continue;
            }
            match raw.last_mut() {
                Some((_, end)) if *end == res - 1 => *end = res,
                _ => raw.push((res, res)),
            }
        }

        let mut merged: Vec<(i32, i32)> = Vec::with_capacity(raw.len());
        for (start, end) in raw {
            match merged.last_mut() {
                Some((_, prev_end))
                    if ((start - *prev_end - 1) as usize) <= self.spacing
                        && !(*prev_end + 1..start).any(|res| truncated(res)) =>
                {
                    *prev_end = end
                }
                _ => merged.push((start, end)),
            }
        }
        merged
    }

    fn annotate(
        &self,
        mut segment: Segment,
        by_residue: &BTreeMap<i32, &SseRecord>,
    ) -> Result<Segment> {
        let kind = segment.kind();
        for res in segment.start() + 1..segment.end() {
            let Some(rec) = by_residue.get(&res) else {
                segment.add_break(res, BreakKind::Disordered)?;
                continue;
            };
            if rec.state == SseState::Missing {
                segment.add_break(res, BreakKind::Disordered)?;
            } else if rec.state.kind() != Some(kind) {
                segment.add_break(res, BreakKind::Coil)?;
            }
            if rec.is_outlier() {
                segment.add_break(res, BreakKind::Disordered)?;
            }
            if is_helix_breaker(rec.res_name) {
                segment.add_break(res, BreakKind::ProGly)?;
            }
        }
        Ok(segment)
    }
}
