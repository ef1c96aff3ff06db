//! Backbone angle outliers.
//!
//! A residue whose phi or psi lies more than two standard deviations from the reference
//! distribution of its segment kind is marked as an outlier, the same mark the lowercase
//! STRIDE states carry. The detector then treats it as a disordered break point.
use super::{SegmentDetector, SseKind, SseRecord};
use crate::error::{GrnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Deviations beyond this many standard deviations are outliers.
const SD_RANGE: f64 = 2.0;

/// Mean and standard deviation of a dihedral, in degrees on `0..360`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleDistribution {
    pub mean: f64,
    pub sd: f64,
}

impl AngleDistribution {
    fn deviation(&self, angle: f64) -> f64 {
        let wrapped = if angle < 0.0 { angle + 360.0 } else { angle };
        (wrapped - self.mean).abs()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dihedral {
    #[default]
    Phi,
    Psi,
}

/// Reference backbone geometry for the segments of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleReference {
    pub kind: SseKind,
    pub phi: AngleDistribution,
    pub psi: AngleDistribution,
    /// Dihedral checked first; the other one is only checked when it finds no outlier.
    #[serde(default)]
    pub first: Dihedral,
}

impl AngleReference {
    pub fn validate(&self) -> Result<()> {
        for (name, dist) in [("phi", self.phi), ("psi", self.psi)] {
            if !dist.mean.is_finite() || !dist.sd.is_finite() || dist.sd <= 0.0 {
                return Err(GrnError::invalid(format!(
                    "{} reference for {} needs a finite mean and a positive sd",
                    name, self.kind
                )));
            }
        }
        Ok(())
    }

    fn order(&self) -> [Dihedral; 2] {
        match self.first {
            Dihedral::Phi => [Dihedral::Phi, Dihedral::Psi],
            Dihedral::Psi => [Dihedral::Psi, Dihedral::Phi],
        }
    }

    fn distribution(&self, dihedral: Dihedral) -> AngleDistribution {
        match dihedral {
            Dihedral::Phi => self.phi,
            Dihedral::Psi => self.psi,
        }
    }

    /// The most deviating residue of one segment's records, if it lies outside the
    /// reference range.
    ///
    /// Residues without angles are skipped. On equal deviation the N-terminal residue wins.
    pub fn outlier(&self, records: &[&SseRecord]) -> Option<i32> {
        for dihedral in self.order() {
            let dist = self.distribution(dihedral);
            let worst = records
                .iter()
                .filter_map(|rec| {
                    rec.angle(dihedral)
                        .map(|value| (rec.residue, dist.deviation(value)))
                })
                .reduce(|best, next| if next.1 > best.1 { next } else { best });
            if let Some((residue, deviation)) = worst {
                if deviation > SD_RANGE * dist.sd {
                    return Some(residue);
                }
            }
        }
        None
    }
}

/// Marks the angle outlier of every detected segment covered by a reference.
///
/// Returns the number of residues newly marked.
pub fn mark_angle_outliers(
    records: &mut [SseRecord],
    detector: &SegmentDetector,
    references: &[AngleReference],
) -> Result<usize> {
    if references.is_empty() {
        return Ok(0);
    }
    let segments = detector.detect(records, None)?;
    let mut outliers = Vec::new();
    {
        let by_residue: BTreeMap<i32, &SseRecord> =
            records.iter().map(|rec| (rec.residue, rec)).collect();
        for segment in &segments {
            let Some(reference) = references.iter().find(|r| r.kind == segment.kind()) else {
                continue;
            };
            let members: Vec<&SseRecord> = by_residue
                .range(segment.start()..=segment.end())
                .map(|(_, &rec)| rec)
                .collect();
            if let Some(residue) = reference.outlier(&members) {
                debug!(segment = %segment, residue, "angle outlier");
                outliers.push(residue);
            }
        }
    }

    let mut marked = 0;
    for rec in records.iter_mut().filter(|rec| outliers.contains(&rec.residue)) {
        if !rec.outlier_flag {
            rec.outlier_flag = true;
            marked += 1;
        }
    }
    Ok(marked)
}
