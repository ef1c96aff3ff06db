use crate::error::{GrnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum SseKind {
    Helix,
    Strand,
}

impl SseKind {
    /// Prefix used in label stems (`H3`, `S7`).
    pub const fn prefix(&self) -> char {
        match self {
            SseKind::Helix => 'H',
            SseKind::Strand => 'S',
        }
    }

    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'H' => Some(SseKind::Helix),
            'S' => Some(SseKind::Strand),
            _ => None,
        }
    }
}

/// Why a residue inside a segment interrupts it.
///
/// The declaration order is the precedence when one residue qualifies twice.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum BreakKind {
    /// Coil or turn residue bridged into the segment by the detector.
    Coil,
    /// Angle outlier, low-confidence or missing residue.
    Disordered,
    /// Proline or glycine.
    ProGly,
}

/// A contiguous secondary-structure interval `start..=end`.
///
/// Break points always lie strictly inside the interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    kind: SseKind,
    start: i32,
    end: i32,
    breaks: BTreeMap<i32, BreakKind>,
}

impl Segment {
    pub fn new(kind: SseKind, start: i32, end: i32) -> Result<Self> {
        if start > end {
            return Err(GrnError::inconsistent(format!(
                "segment start {} lies after its end {}",
                start, end
            )));
        }
        Ok(Segment {
            kind,
            start,
            end,
            breaks: BTreeMap::new(),
        })
    }

    pub fn with_break(mut self, residue: i32, kind: BreakKind) -> Result<Self> {
        self.add_break(residue, kind)?;
        Ok(self)
    }

    /// Records a break point. A residue already tagged keeps the stronger tag.
    pub fn add_break(&mut self, residue: i32, kind: BreakKind) -> Result<()> {
        if residue <= self.start || residue >= self.end {
            return Err(GrnError::inconsistent(format!(
                "break point {} is not strictly inside segment {}",
                residue, self
            )));
        }
        self.breaks
            .entry(residue)
            .and_modify(|existing| *existing = (*existing).min(kind))
            .or_insert(kind);
        Ok(())
    }

    pub fn kind(&self) -> SseKind {
        self.kind
    }
    pub fn start(&self) -> i32 {
        self.start
    }
    pub fn end(&self) -> i32 {
        self.end
    }
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
    pub fn is_empty(&self) -> bool {
        false
    }
    pub fn contains(&self, residue: i32) -> bool {
        self.start <= residue && residue <= self.end
    }
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start <= other.end && other.start <= self.end
    }
    pub fn break_points(&self) -> impl Iterator<Item = (i32, BreakKind)> + '_ {
        self.breaks.iter().map(|(&res, &kind)| (res, kind))
    }
    pub fn break_kind(&self, residue: i32) -> Option<BreakKind> {
        self.breaks.get(&residue).copied()
    }

    /// Break points of `kind` strictly between `lo` and `hi`.
    pub fn breaks_between(
        &self,
        lo: i32,
        hi: i32,
        kind: BreakKind,
    ) -> impl Iterator<Item = i32> + '_ {
        self.breaks
            .range(lo.saturating_add(1)..hi.max(lo.saturating_add(1)))
            .filter(move |(_, &k)| k == kind)
            .map(|(&res, _)| res)
    }

    /// Returns a copy clipped to `lo..=hi`, dropping break points that end up on the edge.
    pub fn clipped(&self, lo: i32, hi: i32) -> Option<Segment> {
        let start = self.start.max(lo);
        let end = self.end.min(hi);
        if start > end {
            return None;
        }
        let breaks = self
            .breaks
            .iter()
            .filter(|(&res, _)| res > start && res < end)
            .map(|(&res, &kind)| (res, kind))
            .collect();
        Some(Segment {
            kind: self.kind,
            start,
            end,
            breaks,
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}-{}]", self.kind, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_invariants() {
        assert!(Segment::new(SseKind::Helix, 10, 5).is_err());
        let seg = Segment::new(SseKind::Helix, 5, 20).unwrap();
        assert_eq!(seg.len(), 16);
        assert!(seg.clone().with_break(5, BreakKind::Coil).is_err());
        assert!(seg.clone().with_break(20, BreakKind::Coil).is_err());
        assert!(seg.clone().with_break(12, BreakKind::Coil).is_ok());
    }

    #[test]
    fn test_break_precedence_and_range() {
        let seg = Segment::new(SseKind::Strand, 1, 30)
            .unwrap()
            .with_break(10, BreakKind::ProGly)
            .unwrap()
            .with_break(10, BreakKind::Coil)
            .unwrap()
            .with_break(15, BreakKind::Coil)
            .unwrap()
            .with_break(25, BreakKind::Coil)
            .unwrap();
        assert_eq!(seg.break_kind(10), Some(BreakKind::Coil));
        let inside: Vec<i32> = seg.breaks_between(10, 25, BreakKind::Coil).collect();
        assert_eq!(inside, vec![15]);
        assert_eq!(seg.breaks_between(25, 10, BreakKind::Coil).count(), 0);
    }

    #[test]
    fn test_clipping() {
        let seg = Segment::new(SseKind::Helix, 1, 30)
            .unwrap()
            .with_break(5, BreakKind::Coil)
            .unwrap()
            .with_break(20, BreakKind::Coil)
            .unwrap();
        let clipped = seg.clipped(5, 25).unwrap();
        assert_eq!((clipped.start(), clipped.end()), (5, 25));
        assert_eq!(clipped.break_points().count(), 1);
        assert!(seg.clipped(40, 50).is_none());
        assert_eq!(seg.to_string(), "Helix[1-30]");
    }
}
