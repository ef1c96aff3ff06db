use crate::label::{Label, ANCHOR_POSITION};
use crate::reconcile::ReconciledElement;
use crate::template::LabelStem;
use serde::Serialize;
use std::collections::BTreeMap;

/// Numbers every residue of a reconciled interval relative to its anchor.
///
/// The anchor gets `.50`; positions grow by one per residue toward the C-terminus
/// and shrink toward the N-terminus. Residues outside the interval are untouched.
pub fn assign_labels(element: &ReconciledElement) -> BTreeMap<i32, Label> {
    let (start, end) = element.interval;
    (start..=end)
        .map(|res| {
            (
                res,
                Label::generic(element.stem, ANCHOR_POSITION + (res - element.anchor)),
            )
        })
        .collect()
}

/// A maximal run of residues without a generic label between two labelled elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopRegion {
    pub n_flank: LabelStem,
    pub c_flank: LabelStem,
    pub start: i32,
    pub end: i32,
}

impl LoopRegion {
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Loops of a per-residue label map. GPS residues count as loop residues; runs before
/// the first or after the last labelled residue are termini, not loops.
pub fn loop_regions(labels: &BTreeMap<i32, Option<Label>>) -> Vec<LoopRegion> {
    let mut loops = Vec::new();
    let mut last_stem: Option<LabelStem> = None;
    let mut run_start: Option<i32> = None;
    for (&res, label) in labels {
        match label.and_then(|l| l.stem()) {
            Some(stem) => {
                if let (Some(n_flank), Some(start)) = (last_stem, run_start) {
                    loops.push(LoopRegion {
                        n_flank,
                        c_flank: stem,
                        start,
                        end: res - 1,
                    });
                }
                last_stem = Some(stem);
                run_start = None;
            }
            None => {
                if run_start.is_none() {
                    run_start = Some(res);
                }
            }
        }
    }
    loops
}
