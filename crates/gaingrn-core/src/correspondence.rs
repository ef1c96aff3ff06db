use crate::error::{GrnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One aligned residue pair from a superposition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResiduePair {
    pub query: i32,
    pub template: i32,
    /// Cα distance after superposition, when reported.
    pub distance: Option<f64>,
}

impl ResiduePair {
    pub fn new(query: i32, template: i32, distance: Option<f64>) -> Self {
        ResiduePair {
            query,
            template,
            distance,
        }
    }
}

/// Partial, monotonic residue mapping between a query and a template plus the global RMSD.
#[derive(Debug, Clone, PartialEq)]
pub struct Correspondence {
    rmsd: f64,
    forward: BTreeMap<i32, (i32, Option<f64>)>,
    reverse: BTreeMap<i32, i32>,
}

impl Correspondence {
    /// Validates and indexes a set of pairs.
    ///
    /// Rejects non-finite RMSD values, residues mapped twice on either side and
    /// local inversions of sequence order.
    pub fn new(pairs: impl IntoIterator<Item = ResiduePair>, rmsd: f64) -> Result<Self> {
        if !rmsd.is_finite() || rmsd < 0.0 {
            return Err(GrnError::superposition(format!("invalid RMSD {}", rmsd)));
        }
        let mut forward = BTreeMap::new();
        let mut reverse = BTreeMap::new();
        for pair in pairs {
            if forward.insert(pair.query, (pair.template, pair.distance)).is_some() {
                return Err(GrnError::superposition(format!(
                    "query residue {} is mapped twice",
                    pair.query
                )));
            }
            if reverse.insert(pair.template, pair.query).is_some() {
                return Err(GrnError::superposition(format!(
                    "template residue {} is mapped twice",
                    pair.template
                )));
            }
        }
        let mut previous: Option<(i32, i32)> = None;
        for (&query, &(template, _)) in &forward {
            if let Some((prev_query, prev_template)) = previous {
                if template <= prev_template {
                    return Err(GrnError::superposition(format!(
                        "mapping inverts order: {}->{} follows {}->{}",
                        query, template, prev_query, prev_template
                    )));
                }
            }
            previous = Some((query, template));
        }
        Ok(Correspondence {
            rmsd,
            forward,
            reverse,
        })
    }

    pub fn rmsd(&self) -> f64 {
        self.rmsd
    }

    pub fn template_of(&self, query: i32) -> Option<i32> {
        self.forward.get(&query).map(|&(template, _)| template)
    }

    pub fn query_of(&self, template: i32) -> Option<i32> {
        self.reverse.get(&template).copied()
    }

    pub fn distance_at(&self, query: i32) -> Option<f64> {
        self.forward.get(&query).and_then(|&(_, distance)| distance)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Number of the given template residues that have a query partner.
    pub fn coverage(&self, template_residues: impl IntoIterator<Item = i32>) -> usize {
        template_residues
            .into_iter()
            .filter(|res| self.reverse.contains_key(res))
            .count()
    }

    /// Mapped pairs inside the query interval `lo..=hi`, in query order.
    pub fn pairs_in(&self, lo: i32, hi: i32) -> impl Iterator<Item = ResiduePair> + '_ {
        self.forward
            .range(lo..=hi.max(lo))
            .filter(move |(&query, _)| query <= hi)
            .map(|(&query, &(template, distance))| ResiduePair::new(query, template, distance))
    }

    pub fn pairs(&self) -> impl Iterator<Item = ResiduePair> + '_ {
        self.forward
            .iter()
            .map(|(&query, &(template, distance))| ResiduePair::new(query, template, distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_pairs(range: std::ops::RangeInclusive<i32>, offset: i32) -> Vec<ResiduePair> {
        range
            .map(|q| ResiduePair::new(q, q + offset, Some(1.0)))
            .collect()
    }

    #[test]
    fn test_lookup_both_directions() {
        let corr = Correspondence::new(offset_pairs(1..=20, 100), 1.2).unwrap();
        assert_eq!(corr.template_of(5), Some(105));
        assert_eq!(corr.query_of(120), Some(20));
        assert_eq!(corr.query_of(121), None);
        assert_eq!(corr.distance_at(5), Some(1.0));
        assert_eq!(corr.coverage([101, 150, 110]), 2);
        assert_eq!(corr.pairs_in(3, 5).count(), 3);
        assert_eq!(corr.pairs_in(5, 3).count(), 0);
    }

    #[test]
    fn test_rejects_inversions_and_duplicates() {
        let mut pairs = offset_pairs(1..=5, 10);
        pairs.push(ResiduePair::new(6, 12, None));
        assert!(Correspondence::new(pairs, 1.0).is_err());

        let mut pairs = offset_pairs(1..=5, 10);
        pairs.push(ResiduePair::new(3, 40, None));
        assert!(Correspondence::new(pairs, 1.0).is_err());

        assert!(Correspondence::new(offset_pairs(1..=5, 10), f64::NAN).is_err());
    }

    #[test]
    fn test_partial_coverage_allowed() {
        let mut pairs = offset_pairs(1..=5, 10);
        pairs.extend(offset_pairs(20..=25, 0));
        let corr = Correspondence::new(pairs, 2.5).unwrap();
        assert_eq!(corr.len(), 11);
        assert_eq!(corr.template_of(10), None);
    }
}
