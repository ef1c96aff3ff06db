use crate::segment::{BreakKind, Segment};
use crate::template::LabelStem;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumIter};

/// Rule that decided where a query segment was divided, in priority order.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[repr(u8)]
pub enum SplitRule {
    /// Single anchor inside the segment.
    #[default]
    None = 0,
    Coil = 1,
    Disordered = 2,
    ProGly = 3,
    HardCut = 4,
    /// Forced midpoint split between the two anchor images.
    AnchorPriority = 5,
}

impl SplitRule {
    pub fn priority(self) -> u8 {
        self as u8
    }
}

/// A template anchor whose image falls inside a query segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnchorHit {
    pub stem: LabelStem,
    /// Query residue the anchor maps to.
    pub image: i32,
    pub occupancy: f64,
    /// Superposition distance at the image, if known.
    pub distance: Option<f64>,
}

impl AnchorHit {
    /// Ordering of contested-residue priority: larger occupancy, then smaller distance.
    fn outranks(&self, other: &AnchorHit) -> bool {
        match self.occupancy.partial_cmp(&other.occupancy) {
            Some(Ordering::Greater) => return true,
            Some(Ordering::Less) => return false,
            _ => {}
        }
        let own = self.distance.unwrap_or(f64::INFINITY);
        let theirs = other.distance.unwrap_or(f64::INFINITY);
        own < theirs
    }
}

/// Two neighbouring anchors competing for one query segment.
#[derive(Debug, Clone, Copy)]
pub struct SplitContext<'a> {
    pub segment: &'a Segment,
    pub n_anchor: &'a AnchorHit,
    pub c_anchor: &'a AnchorHit,
    pub n_cut: Option<i32>,
    pub c_cut: Option<i32>,
}

impl SplitContext<'_> {
    fn midpoint(&self) -> f64 {
        (self.n_anchor.image + self.c_anchor.image) as f64 / 2.0
    }

    /// Image of the anchor that gives way: the N-terminal one unless it outranks its partner.
    fn yielding_image(&self) -> i32 {
        if self.n_anchor.outranks(self.c_anchor) {
            self.c_anchor.image
        } else {
            self.n_anchor.image
        }
    }

    /// Break point of `kind` between the anchors closest to the yielding anchor.
    fn break_near_yielding(&self, kind: BreakKind) -> Option<i32> {
        let origin = self.yielding_image();
        self.segment
            .breaks_between(self.n_anchor.image, self.c_anchor.image, kind)
            .min_by_key(|&res| (res - origin).abs())
    }

    /// Break point of `kind` between the anchors closest to their midpoint.
    /// Equidistant candidates resolve toward the N-terminal anchor.
    fn break_near_midpoint(&self, kind: BreakKind) -> Option<i32> {
        let mid = self.midpoint();
        self.segment
            .breaks_between(self.n_anchor.image, self.c_anchor.image, kind)
            .min_by(|a, b| {
                let da = (*a as f64 - mid).abs();
                let db = (*b as f64 - mid).abs();
                da.total_cmp(&db).then(a.cmp(b))
            })
    }
}

/// Where the N-terminal element ends and the C-terminal one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitPoint {
    pub n_end: i32,
    pub c_start: i32,
    pub rule: SplitRule,
}

type Resolver = fn(&SplitContext) -> Option<SplitPoint>;

/// Split rules in the order they are tried. The forced split is the fallback, not a member.
const SPLIT_RULES: [(SplitRule, Resolver); 4] = [
    (SplitRule::Coil, split_at_coil),
    (SplitRule::Disordered, split_at_disorder),
    (SplitRule::ProGly, split_at_pro_gly),
    (SplitRule::HardCut, split_at_hard_cut),
];

/// Applies the first split rule that finds a valid point, falling back to the
/// anchor-priority split.
pub fn resolve_split(ctx: &SplitContext) -> SplitPoint {
    SPLIT_RULES
        .iter()
        .find_map(|(rule, resolver)| {
            resolver(ctx).map(|point| SplitPoint {
                rule: *rule,
                ..point
            })
        })
        .unwrap_or_else(|| split_by_anchor_priority(ctx))
}

fn split_at_coil(ctx: &SplitContext) -> Option<SplitPoint> {
    ctx.break_near_yielding(BreakKind::Coil).map(|res| SplitPoint {
        n_end: res - 1,
        c_start: res + 1,
        rule: SplitRule::Coil,
    })
}

// An outlier residue is still structured, so it stays with the N-terminal element.
fn split_at_disorder(ctx: &SplitContext) -> Option<SplitPoint> {
    ctx.break_near_yielding(BreakKind::Disordered).map(|res| SplitPoint {
        n_end: res,
        c_start: res + 1,
        rule: SplitRule::Disordered,
    })
}

// Pro/Gly caps the following element, so the residue is kept as its first member.
fn split_at_pro_gly(ctx: &SplitContext) -> Option<SplitPoint> {
    ctx.break_near_midpoint(BreakKind::ProGly).map(|res| SplitPoint {
        n_end: res - 1,
        c_start: res,
        rule: SplitRule::ProGly,
    })
}

fn split_at_hard_cut(ctx: &SplitContext) -> Option<SplitPoint> {
    let (n, c) = (ctx.n_anchor.image, ctx.c_anchor.image);
    if let Some(k) = ctx.n_cut {
        let end = n + k;
        if n <= end && end < c {
            return Some(SplitPoint {
                n_end: end,
                c_start: end + 1,
                rule: SplitRule::HardCut,
            });
        }
    }
    if let Some(k) = ctx.c_cut {
        let start = c - k;
        if n < start && start <= c {
            return Some(SplitPoint {
                n_end: start - 1,
                c_start: start,
                rule: SplitRule::HardCut,
            });
        }
    }
    None
}

fn split_by_anchor_priority(ctx: &SplitContext) -> SplitPoint {
    let (n, c) = (ctx.n_anchor.image, ctx.c_anchor.image);
    let sum = n + c;
    let n_end = if sum.rem_euclid(2) == 0 {
        let contested = sum / 2;
        // the C-terminal anchor must strictly outrank to take the contested residue
        if ctx.c_anchor.outranks(ctx.n_anchor) {
            contested - 1
        } else {
            contested
        }
    } else {
        sum.div_euclid(2)
    };
    SplitPoint {
        n_end,
        c_start: n_end + 1,
        rule: SplitRule::AnchorPriority,
    }
}
