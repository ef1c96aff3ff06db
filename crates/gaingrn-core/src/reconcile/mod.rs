//! Matching detected query segments to template segments through a correspondence.
//!
//! Every template anchor of a subdomain is projected into the query. Segments that receive
//! several anchor images are divided with [`resolve_split`]; segments that receive none get a
//! fuzzy search over the template interval they superpose onto.
mod split;

pub use split::{resolve_split, AnchorHit, SplitContext, SplitPoint, SplitRule};

use crate::correspondence::Correspondence;
use crate::segment::Segment;
use crate::template::{LabelStem, Subdomain, Template, TemplateSegment};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use strum::Display;
use tracing::debug;

/// Query segments shorter than this never count as unindexed.
const MIN_UNINDEXED_LENGTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum MatchKind {
    /// The anchor's image lies inside the query segment.
    Exact,
    /// The anchor lies inside the template interval the segment superposes onto.
    Fuzzy,
}

/// A query interval matched to a template stem with its `.50` residue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledElement {
    pub stem: LabelStem,
    pub interval: (i32, i32),
    pub anchor: i32,
    pub rule: SplitRule,
    pub kind: MatchKind,
    /// Whether this occurrence labels the stem in the per-residue map.
    pub primary: bool,
    /// Template distance between the anchor and the partner of `anchor`; zero for exact matches.
    pub template_offset: i32,
}

/// Outcome of reconciling one subdomain.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Reconciliation {
    pub elements: Vec<ReconciledElement>,
    pub unindexed_stems: Vec<LabelStem>,
    pub unindexed_segments: Vec<Segment>,
    /// Highest-priority split rule that fired.
    pub split_mode: SplitRule,
}

impl Reconciliation {
    pub fn primary(&self) -> impl Iterator<Item = &ReconciledElement> {
        self.elements.iter().filter(|el| el.primary)
    }

    pub fn repeated(&self) -> impl Iterator<Item = &ReconciledElement> {
        self.elements.iter().filter(|el| !el.primary)
    }
}

/// Reconciles one subdomain's query segments against `template`.
///
/// `hard_cut` maps a stem to the largest offset from its anchor that may still carry its label.
pub fn reconcile(
    segments: &[Segment],
    template: &Template,
    subdomain: Subdomain,
    correspondence: &Correspondence,
    hard_cut: &BTreeMap<LabelStem, i32>,
) -> Reconciliation {
    let template_segments = template.segments(subdomain);

    let mut hits: Vec<Vec<AnchorHit>> = vec![Vec::new(); segments.len()];
    for tseg in &template_segments {
        let Some(image) = correspondence.query_of(tseg.anchor) else {
            debug!(stem = %tseg.stem, anchor = tseg.anchor, "anchor has no query partner");
            continue;
        };
        if let Some(idx) = segments.iter().position(|seg| seg.contains(image)) {
            hits[idx].push(AnchorHit {
                stem: tseg.stem,
                image,
                occupancy: tseg.occupancy,
                distance: correspondence.distance_at(image),
            });
        }
    }

    let mut elements = Vec::new();
    for (segment, mut seg_hits) in segments.iter().zip(hits) {
        if seg_hits.is_empty() {
            if let Some(element) = fuzzy_match(segment, &template_segments, correspondence) {
                elements.push(element);
            }
            continue;
        }
        seg_hits.sort_by_key(|hit| hit.image);
        elements.extend(split_segment(segment, &seg_hits, hard_cut));
    }

    mark_primary(&mut elements);

    for element in elements.iter_mut() {
        if let Some(&k) = hard_cut.get(&element.stem) {
            let limit = element.anchor + k;
            if element.interval.1 > limit {
                debug!(
                    stem = %element.stem,
                    from = element.interval.1,
                    to = limit,
                    "hard cut truncation"
                );
                element.interval.1 = limit.max(element.anchor);
            }
        }
    }

    let labelled: BTreeSet<LabelStem> = elements.iter().map(|el| el.stem).collect();
    let unindexed_stems = template_segments
        .iter()
        .map(|tseg| tseg.stem)
        .filter(|stem| !labelled.contains(stem))
        .collect();
    let unindexed_segments = segments
        .iter()
        .filter(|seg| seg.len() >= MIN_UNINDEXED_LENGTH)
        .filter(|seg| !elements.iter().any(|el| seg.contains(el.anchor)))
        .cloned()
        .collect();
    let split_mode = elements
        .iter()
        .map(|el| el.rule)
        .max()
        .unwrap_or_default();

    elements.sort_by_key(|el| el.interval);
    Reconciliation {
        elements,
        unindexed_stems,
        unindexed_segments,
        split_mode,
    }
}

/// Divides one segment among its anchor hits, already sorted by image.
fn split_segment(
    segment: &Segment,
    hits: &[AnchorHit],
    hard_cut: &BTreeMap<LabelStem, i32>,
) -> Vec<ReconciledElement> {
    let splits: Vec<SplitPoint> = hits
        .windows(2)
        .map(|pair| {
            let ctx = SplitContext {
                segment,
                n_anchor: &pair[0],
                c_anchor: &pair[1],
                n_cut: hard_cut.get(&pair[0].stem).copied(),
                c_cut: hard_cut.get(&pair[1].stem).copied(),
            };
            let point = resolve_split(&ctx);
            debug!(
                segment = %segment,
                n = %pair[0].stem,
                c = %pair[1].stem,
                rule = %point.rule,
                n_end = point.n_end,
                "split ambiguous segment"
            );
            point
        })
        .collect();

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let before = i.checked_sub(1).map(|j| splits[j]);
            let after = splits.get(i).copied();
            let start = before.map(|p| p.c_start).unwrap_or(segment.start());
            let end = after.map(|p| p.n_end).unwrap_or(segment.end());
            let rule = before
                .into_iter()
                .chain(after)
                .map(|p| p.rule)
                .max()
                .unwrap_or(SplitRule::None);
            ReconciledElement {
                stem: hit.stem,
                interval: (start, end),
                anchor: hit.image,
                rule,
                kind: MatchKind::Exact,
                primary: true,
                template_offset: 0,
            }
        })
        .collect()
}

/// Searches the template interval a segment superposes onto for an anchor.
fn fuzzy_match(
    segment: &Segment,
    template_segments: &[&TemplateSegment],
    correspondence: &Correspondence,
) -> Option<ReconciledElement> {
    let mapped: Vec<_> = correspondence
        .pairs_in(segment.start() - 1, segment.end() + 1)
        .collect();
    let t_lo = mapped.first()?.template;
    let t_hi = mapped.last()?.template;
    let t_mid = (t_lo + t_hi) as f64 / 2.0;

    let target = template_segments
        .iter()
        .filter(|tseg| t_lo <= tseg.anchor && tseg.anchor <= t_hi)
        .min_by(|a, b| {
            let da = (a.anchor as f64 - t_mid).abs();
            let db = (b.anchor as f64 - t_mid).abs();
            da.total_cmp(&db).then(a.anchor.cmp(&b.anchor))
        })?;

    // the flanks widen the template interval but never carry the label
    let nearest = mapped
        .iter()
        .filter(|pair| segment.contains(pair.query))
        .min_by_key(|pair| ((pair.template - target.anchor).abs(), pair.query))?;
    let anchor = nearest.query;
    debug!(
        segment = %segment,
        stem = %target.stem,
        anchor,
        "fuzzy anchor match"
    );
    Some(ReconciledElement {
        stem: target.stem,
        interval: (segment.start(), segment.end()),
        anchor,
        rule: SplitRule::None,
        kind: MatchKind::Fuzzy,
        primary: true,
        template_offset: (nearest.template - target.anchor).abs(),
    })
}

/// Keeps one primary element per stem: the exact match, else the fuzzy match closest to the anchor.
fn mark_primary(elements: &mut [ReconciledElement]) {
    let mut best: BTreeMap<LabelStem, usize> = BTreeMap::new();
    for (idx, element) in elements.iter().enumerate() {
        let key = |el: &ReconciledElement| {
            (el.kind != MatchKind::Exact, el.template_offset, el.interval.0)
        };
        best.entry(element.stem)
            .and_modify(|current| {
                if key(element) < key(&elements[*current]) {
                    *current = idx;
                }
            })
            .or_insert(idx);
    }
    for (idx, element) in elements.iter_mut().enumerate() {
        element.primary = best.get(&element.stem) == Some(&idx);
    }
}
