//! Per-structure orchestration.
//!
//! Each subdomain runs through `SelectTemplate -> ObtainCorrespondence -> Reconcile ->
//! AssignLabels -> Done`. A subdomain that cannot get a template or a correspondence ends in
//! `Failed` without affecting the other one.
use crate::assign::{assign_labels, loop_regions, LoopRegion};
use crate::config::IndexerConfig;
use crate::correspondence::Correspondence;
use crate::error::{GrnError, Result};
use crate::label::{GpsSite, Label};
use crate::reconcile::{reconcile, Reconciliation, SplitRule};
use crate::residue::Sequence;
use crate::segment::{
    BoundaryDetector, Segment, SegmentDetector, SseKind, SseRecord, SubdomainBoundary,
};
use crate::template::{LabelStem, Subdomain, Template, TemplateLibrary};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use strum::{Display, IntoEnumIterator};
use tracing::{debug, info, info_span, warn};

/// Produces a residue correspondence between a query and a template.
///
/// Implementations may block on an external process; they are called from worker threads.
pub trait Superposer: Send + Sync {
    fn superpose(
        &self,
        query: &StructureInput,
        template: &Template,
        subdomain: Subdomain,
    ) -> Result<Correspondence>;
}

/// Everything known about one query structure before indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureInput {
    pub accession: String,
    /// Receptor or family classifier.
    pub receptor: Option<String>,
    pub sequence: Sequence,
    pub segments: Vec<Segment>,
    pub boundary: Option<SubdomainBoundary>,
    /// Coordinates handed to the superposer.
    pub structure: Option<PathBuf>,
}

impl StructureInput {
    /// Builds an input from secondary-structure records.
    ///
    /// Without an explicit `boundary`, it is derived with the default [`BoundaryDetector`];
    /// segments N-terminal of the derived domain start are discarded.
    pub fn from_records(
        accession: impl Into<String>,
        receptor: Option<String>,
        records: &[SseRecord],
        detector: &SegmentDetector,
        boundary: Option<SubdomainBoundary>,
    ) -> Result<Self> {
        let accession = accession.into();
        let sequence: Sequence = records.iter().map(|rec| (rec.residue, rec.res_name)).collect();
        let boundary = boundary.or_else(|| BoundaryDetector::default().detect(records));
        if boundary.is_none() {
            debug!(
                accession = %accession,
                "no subdomain boundary found, partitioning by segment kind"
            );
        }
        let bounds = match (boundary, sequence.keys().next_back()) {
            (Some(b), Some(&last)) => Some((b.domain_start, last)),
            _ => None,
        };
        let segments = detector.detect(records, bounds)?;
        Ok(StructureInput {
            accession,
            receptor,
            sequence,
            segments,
            boundary,
            structure: None,
        })
    }

    pub fn with_structure(mut self, path: impl Into<PathBuf>) -> Self {
        self.structure = Some(path.into());
        self
    }

    /// Checks that segments and boundary agree with the sequence.
    pub fn validate(&self) -> Result<()> {
        let (Some(&first), Some(&last)) =
            (self.sequence.keys().next(), self.sequence.keys().next_back())
        else {
            return Err(GrnError::inconsistent(format!(
                "{} has an empty sequence",
                self.accession
            )));
        };
        for segment in &self.segments {
            if segment.start() < first || segment.end() > last {
                return Err(GrnError::inconsistent(format!(
                    "{}: segment {} lies outside residues {}-{}",
                    self.accession, segment, first, last
                )));
            }
        }
        for (i, a) in self.segments.iter().enumerate() {
            if let Some(b) = self.segments[i + 1..].iter().find(|b| a.overlaps(b)) {
                return Err(GrnError::inconsistent(format!(
                    "{}: segments {} and {} overlap",
                    self.accession, a, b
                )));
            }
        }
        if let Some(boundary) = self.boundary {
            if boundary.boundary < first
                || boundary.boundary > last
                || boundary.domain_start > boundary.boundary
            {
                return Err(GrnError::inconsistent(format!(
                    "{}: subdomain boundary {} (domain start {}) outside residues {}-{}",
                    self.accession, boundary.boundary, boundary.domain_start, first, last
                )));
            }
        }
        Ok(())
    }

    /// Segments of one subdomain. A segment crossing the boundary goes to the side holding
    /// most of it.
    pub fn segments_in(&self, subdomain: Subdomain) -> Vec<Segment> {
        self.segments
            .iter()
            .filter(|seg| self.subdomain_of(seg) == subdomain)
            .cloned()
            .collect()
    }

    fn subdomain_of(&self, segment: &Segment) -> Subdomain {
        match self.boundary {
            Some(b) => {
                let in_a = (segment.start()..=segment.end()).filter(|&r| r <= b.boundary).count();
                if in_a * 2 > segment.len() {
                    Subdomain::A
                } else {
                    Subdomain::B
                }
            }
            None => match segment.kind() {
                SseKind::Helix => Subdomain::A,
                SseKind::Strand => Subdomain::B,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum Stage {
    SelectTemplate,
    ObtainCorrespondence,
    Reconcile,
    AssignLabels,
    Done,
    Failed,
}

/// Final state of one subdomain pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubdomainOutcome {
    pub subdomain: Subdomain,
    pub stage: Stage,
    /// Stage that failed, when `stage` is `Failed`.
    pub failed_at: Option<Stage>,
    pub reason: Option<String>,
    pub template_id: Option<String>,
    pub rmsd: Option<f64>,
    pub split_mode: SplitRule,
}

impl SubdomainOutcome {
    fn start(subdomain: Subdomain) -> Self {
        SubdomainOutcome {
            subdomain,
            stage: Stage::SelectTemplate,
            failed_at: None,
            reason: None,
            template_id: None,
            rmsd: None,
            split_mode: SplitRule::None,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(subdomain = %self.subdomain, from = %self.stage, to = %next, "stage");
        self.stage = next;
    }

    fn fail(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(subdomain = %self.subdomain, stage = %self.stage, %reason, "subdomain failed");
        self.failed_at = Some(self.stage);
        self.stage = Stage::Failed;
        self.reason = Some(reason);
        self
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnindexedElements {
    /// Template stems without a query counterpart.
    pub stems: Vec<LabelStem>,
    /// Detected query segments that received no label.
    pub segments: Vec<Segment>,
}

impl UnindexedElements {
    pub fn is_empty(&self) -> bool {
        self.stems.is_empty() && self.segments.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexingParams {
    /// Highest split rule that fired in any subdomain.
    pub split_mode: SplitRule,
    pub template_ids: BTreeMap<Subdomain, String>,
    pub rmsd: BTreeMap<Subdomain, f64>,
    pub outcomes: Vec<SubdomainOutcome>,
}

/// Labels of one structure. Immutable once built by an [`Indexer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexingResult {
    accession: String,
    receptor: Option<String>,
    sequence: Sequence,
    element_intervals: BTreeMap<LabelStem, (i32, i32)>,
    element_centers: BTreeMap<LabelStem, i32>,
    residue_labels: BTreeMap<i32, Option<Label>>,
    repeated_labels: BTreeMap<i32, Label>,
    unindexed_elements: UnindexedElements,
    loops: Vec<LoopRegion>,
    gps: BTreeMap<GpsSite, i32>,
    params: IndexingParams,
}

impl IndexingResult {
    pub fn accession(&self) -> &str {
        &self.accession
    }
    pub fn receptor(&self) -> Option<&str> {
        self.receptor.as_deref()
    }
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }
    pub fn element_intervals(&self) -> &BTreeMap<LabelStem, (i32, i32)> {
        &self.element_intervals
    }
    pub fn element_centers(&self) -> &BTreeMap<LabelStem, i32> {
        &self.element_centers
    }
    /// Every residue of the sequence, with its label if it has one.
    pub fn residue_labels(&self) -> &BTreeMap<i32, Option<Label>> {
        &self.residue_labels
    }
    /// Labels from secondary occurrences of a stem.
    pub fn repeated_labels(&self) -> &BTreeMap<i32, Label> {
        &self.repeated_labels
    }
    pub fn unindexed_elements(&self) -> &UnindexedElements {
        &self.unindexed_elements
    }
    pub fn loops(&self) -> &[LoopRegion] {
        &self.loops
    }
    pub fn gps(&self) -> &BTreeMap<GpsSite, i32> {
        &self.gps
    }
    pub fn params(&self) -> &IndexingParams {
        &self.params
    }

    pub fn label_of(&self, residue: i32) -> Option<Label> {
        self.residue_labels.get(&residue).copied().flatten()
    }

    pub fn labelled(&self) -> impl Iterator<Item = (i32, Label)> + '_ {
        self.residue_labels
            .iter()
            .filter_map(|(&res, label)| label.map(|l| (res, l)))
    }

    pub fn residue_code(&self, residue: i32) -> Option<char> {
        self.sequence.get(&residue).copied()
    }

    /// True when no subdomain pipeline reached `Done`.
    pub fn all_failed(&self) -> bool {
        !self.params.outcomes.iter().any(SubdomainOutcome::is_done)
    }
}

struct SubdomainRun<'t> {
    outcome: SubdomainOutcome,
    template: Option<&'t Template>,
    correspondence: Option<Correspondence>,
    reconciliation: Reconciliation,
    labels: BTreeMap<i32, Label>,
    repeated: BTreeMap<i32, Label>,
    segments: Vec<Segment>,
}

/// Indexes single structures against a template library.
pub struct Indexer<'a> {
    templates: &'a TemplateLibrary,
    superposer: &'a dyn Superposer,
    config: &'a IndexerConfig,
}

impl<'a> Indexer<'a> {
    pub fn new(
        templates: &'a TemplateLibrary,
        superposer: &'a dyn Superposer,
        config: &'a IndexerConfig,
    ) -> Self {
        Indexer {
            templates,
            superposer,
            config,
        }
    }

    /// Indexes one structure.
    ///
    /// Only inconsistent input is an error; superposition failures end the affected
    /// subdomain in [`Stage::Failed`] and are reported in the result's params.
    pub fn index(&self, input: &StructureInput) -> Result<IndexingResult> {
        let _span = info_span!("index_structure", accession = %input.accession).entered();
        input.validate()?;

        let runs: Vec<SubdomainRun> = Subdomain::iter()
            .map(|sd| self.run_subdomain(input, sd))
            .collect::<Result<_>>()?;

        let mut residue_labels: BTreeMap<i32, Option<Label>> =
            input.sequence.keys().map(|&res| (res, None)).collect();
        let mut repeated_labels = BTreeMap::new();
        let mut element_intervals = BTreeMap::new();
        let mut element_centers = BTreeMap::new();
        let mut unindexed = UnindexedElements::default();
        let mut params = IndexingParams::default();

        for run in &runs {
            for element in run.reconciliation.primary() {
                element_intervals.insert(element.stem, element.interval);
                element_centers.insert(element.stem, element.anchor);
            }
            for (&res, &label) in &run.labels {
                if let Some(slot) = residue_labels.get_mut(&res) {
                    if slot.is_none() {
                        *slot = Some(label);
                    }
                }
            }
            for (&res, &label) in &run.repeated {
                repeated_labels.entry(res).or_insert(label);
            }
            unindexed.stems.extend(run.reconciliation.unindexed_stems.iter().copied());
            unindexed.segments.extend(run.reconciliation.unindexed_segments.iter().cloned());
            if !run.outcome.is_done() {
                unindexed.segments.extend(run.segments.iter().filter(|seg| seg.len() > 3).cloned());
            }

            let outcome = &run.outcome;
            if let (Some(id), Some(rmsd)) = (&outcome.template_id, outcome.rmsd) {
                params.template_ids.insert(outcome.subdomain, id.clone());
                params.rmsd.insert(outcome.subdomain, rmsd);
            }
            params.split_mode = params.split_mode.max(outcome.split_mode);
            params.outcomes.push(outcome.clone());
        }
        unindexed.segments.sort_by_key(|seg| seg.start());

        let gps = if self.config.patch_gps {
            self.patch_gps(&runs, &mut residue_labels)
        } else {
            BTreeMap::new()
        };
        let loops = loop_regions(&residue_labels);

        info!(
            labelled = residue_labels.values().filter(|l| l.is_some()).count(),
            elements = element_intervals.len(),
            unindexed = unindexed.stems.len(),
            split_mode = params.split_mode.priority(),
            "indexed"
        );

        Ok(IndexingResult {
            accession: input.accession.clone(),
            receptor: input.receptor.clone(),
            sequence: input.sequence.clone(),
            element_intervals,
            element_centers,
            residue_labels,
            repeated_labels,
            unindexed_elements: unindexed,
            loops,
            gps,
            params,
        })
    }

    fn run_subdomain(
        &self,
        input: &StructureInput,
        subdomain: Subdomain,
    ) -> Result<SubdomainRun<'a>> {
        let _span = info_span!("subdomain", sd = %subdomain).entered();
        let segments = input.segments_in(subdomain);
        let mut outcome = SubdomainOutcome::start(subdomain);
        let failed =
            |outcome: SubdomainOutcome, reason: String, segments: Vec<Segment>| SubdomainRun {
                outcome: outcome.fail(reason),
                template: None,
                correspondence: None,
                reconciliation: Reconciliation::default(),
                labels: BTreeMap::new(),
                repeated: BTreeMap::new(),
                segments,
            };

        let candidates = self.candidates(subdomain);
        if candidates.is_empty() {
            let reason = match self.config.pinned(subdomain) {
                Some(id) => format!(
                    "pinned template {} is not available for subdomain {}",
                    id, subdomain
                ),
                None => format!("no template covers subdomain {}", subdomain),
            };
            return Ok(failed(outcome, reason, segments));
        }

        outcome.advance(Stage::ObtainCorrespondence);
        let best = self.best_correspondence(input, subdomain, &candidates)?;
        let (template, correspondence) = match best {
            Ok(best) => best,
            Err(reason) => {
                let mut run = failed(outcome, reason, segments);
                // report what the first candidate would have labelled
                run.reconciliation.unindexed_stems = candidates[0]
                    .segments(subdomain)
                    .iter()
                    .map(|seg| seg.stem)
                    .collect();
                return Ok(run);
            }
        };
        outcome.template_id = Some(template.id().to_string());
        outcome.rmsd = Some(correspondence.rmsd());
        if correspondence.rmsd() > self.config.rmsd_advisory {
            warn!(
                template = template.id(),
                rmsd = correspondence.rmsd(),
                advisory = self.config.rmsd_advisory,
                "superposition above RMSD advisory"
            );
        }

        outcome.advance(Stage::Reconcile);
        let reconciliation = reconcile(
            &segments,
            template,
            subdomain,
            &correspondence,
            &self.config.hard_cut,
        );
        outcome.split_mode = reconciliation.split_mode;
        if reconciliation.split_mode == SplitRule::AnchorPriority {
            warn!(template = template.id(), "forced anchor-priority split, low confidence");
        }

        outcome.advance(Stage::AssignLabels);
        let mut labels = BTreeMap::new();
        for element in reconciliation.primary() {
            labels.extend(assign_labels(element));
        }
        let mut repeated = BTreeMap::new();
        for element in reconciliation.repeated() {
            for (res, label) in assign_labels(element) {
                repeated.entry(res).or_insert(label);
            }
        }

        outcome.advance(Stage::Done);
        Ok(SubdomainRun {
            outcome,
            template: Some(template),
            correspondence: Some(correspondence),
            reconciliation,
            labels,
            repeated,
            segments,
        })
    }

    fn candidates(&self, subdomain: Subdomain) -> Vec<&'a Template> {
        match self.config.pinned(subdomain) {
            Some(id) => self
                .templates
                .get(id)
                .filter(|t| t.covers(subdomain))
                .into_iter()
                .collect(),
            None => self.templates.candidates(subdomain),
        }
    }

    /// Superposes every candidate and keeps the lowest RMSD, then the widest anchor coverage.
    ///
    /// The outer error is fatal to the structure; the inner one fails this subdomain only.
    fn best_correspondence(
        &self,
        input: &StructureInput,
        subdomain: Subdomain,
        candidates: &[&'a Template],
    ) -> Result<std::result::Result<(&'a Template, Correspondence), String>> {
        let mut best: Option<(&'a Template, Correspondence, usize)> = None;
        let mut last_error = None;
        for &template in candidates {
            let correspondence = match self.superposer.superpose(input, template, subdomain) {
                Ok(corr) if corr.is_empty() => {
                    last_error = Some(format!("{}: empty correspondence", template.id()));
                    continue;
                }
                Ok(corr) => corr,
                Err(err) if !err.is_structure_scoped() => return Err(err),
                Err(err) => {
                    warn!(template = template.id(), error = %err, "superposition failed");
                    last_error = Some(format!("{}: {}", template.id(), err));
                    continue;
                }
            };
            let coverage = correspondence
                .coverage(template.anchors(subdomain).into_iter().map(|(_, a)| a));
            debug!(template = template.id(), rmsd = correspondence.rmsd(), coverage, "candidate");
            let better = match &best {
                None => true,
                Some((_, current, current_cov)) => {
                    match correspondence.rmsd().total_cmp(&current.rmsd()) {
                        std::cmp::Ordering::Less => true,
                        std::cmp::Ordering::Equal => coverage > *current_cov,
                        std::cmp::Ordering::Greater => false,
                    }
                }
            };
            if better {
                best = Some((template, correspondence, coverage));
            }
        }
        Ok(match best {
            Some((template, correspondence, _)) => Ok((template, correspondence)),
            None => Err(last_error.unwrap_or_else(|| "no correspondence".to_string())),
        })
    }

    /// Overrides the three GPS residues. Uses the template's GPS anchor when it maps into
    /// the query, else the last three residues of the most C-terminal subdomain B element.
    fn patch_gps(
        &self,
        runs: &[SubdomainRun],
        residue_labels: &mut BTreeMap<i32, Option<Label>>,
    ) -> BTreeMap<GpsSite, i32> {
        let Some(run_b) = runs
            .iter()
            .find(|run| run.outcome.subdomain == Subdomain::B && run.outcome.is_done())
        else {
            return BTreeMap::new();
        };
        let mapped = match (run_b.template.and_then(Template::gps_anchor), &run_b.correspondence) {
            (Some(anchor), Some(corr)) => corr.query_of(anchor),
            _ => None,
        };
        let minus_one = mapped.or_else(|| {
            run_b
                .reconciliation
                .primary()
                .map(|el| el.interval.1)
                .max()
                .map(|end| end - 1)
        });
        let Some(minus_one) = minus_one else {
            return BTreeMap::new();
        };
        debug!(residue = minus_one, from_template = mapped.is_some(), "GPS patch");

        let mut sites = BTreeMap::new();
        for site in GpsSite::iter() {
            let residue = minus_one + site.offset();
            if let Some(slot) = residue_labels.get_mut(&residue) {
                *slot = Some(Label::Gps(site));
                sites.insert(site, residue);
            }
        }
        sites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::ResiduePair;
    use crate::segment::BreakKind;
    use crate::template::{ElementDefinition, TemplateDefinition};

    /// Maps query residue `q` onto template residue `q + offset`.
    struct OffsetSuperposer {
        offsets: BTreeMap<String, (i32, f64)>,
    }

    impl Superposer for OffsetSuperposer {
        fn superpose(
            &self,
            query: &StructureInput,
            template: &Template,
            _sd: Subdomain,
        ) -> Result<Correspondence> {
            let (offset, rmsd) = self
                .offsets
                .get(template.id())
                .copied()
                .ok_or_else(|| {
                    GrnError::superposition(format!("no alignment for {}", template.id()))
                })?;
            let pairs = query
                .sequence
                .keys()
                .map(|&q| ResiduePair::new(q, q + offset, Some(1.0)));
            Correspondence::new(pairs, rmsd)
        }
    }

    fn template(
        id: &str,
        elements: &[(&str, Subdomain, i32, i32, i32)],
        gps_anchor: Option<i32>,
    ) -> Template {
        Template::try_from(TemplateDefinition {
            id: id.to_string(),
            structure: None,
            elements: elements
                .iter()
                .map(|&(label, subdomain, anchor, start, end)| ElementDefinition {
                    label: label.to_string(),
                    subdomain,
                    anchor,
                    start,
                    end,
                    occupancy: 1.0,
                })
                .collect(),
            gps_anchor,
        })
        .unwrap()
    }

    fn library() -> TemplateLibrary {
        TemplateLibrary::new(vec![
            template(
                "TA",
                &[("H4", Subdomain::A, 110, 104, 116), ("H5", Subdomain::A, 125, 118, 131)],
                None,
            ),
            template(
                "TB",
                &[("S1", Subdomain::B, 246, 244, 249), ("S2", Subdomain::B, 255, 253, 258)],
                Some(262),
            ),
            template("TB2", &[("S1", Subdomain::B, 346, 344, 349)], None),
        ])
        .unwrap()
    }

    fn input() -> StructureInput {
        let sequence: Sequence = (1..=70).map(|r| (r, 'A')).collect();
        let segments = vec![
            Segment::new(SseKind::Helix, 5, 30).unwrap().with_break(17, BreakKind::Coil).unwrap(),
            Segment::new(SseKind::Strand, 44, 49).unwrap(),
            Segment::new(SseKind::Strand, 53, 58).unwrap(),
        ];
        StructureInput {
            accession: "Q1".to_string(),
            receptor: Some("ADGRL1".to_string()),
            sequence,
            segments,
            boundary: Some(SubdomainBoundary { domain_start: 1, boundary: 38 }),
            structure: None,
        }
    }

    fn superposer() -> OffsetSuperposer {
        OffsetSuperposer {
            offsets: BTreeMap::from([
                ("TA".to_string(), (100, 1.1)),
                ("TB".to_string(), (200, 1.4)),
                ("TB2".to_string(), (300, 2.6)),
            ]),
        }
    }

    #[test]
    fn test_full_structure() {
        let (templates, sup, config) = (library(), superposer(), IndexerConfig::default());
        let result = Indexer::new(&templates, &sup, &config).index(&input()).unwrap();

        assert_eq!(result.label_of(10).unwrap().to_string(), "H4.50");
        assert_eq!(result.label_of(16).unwrap().to_string(), "H4.56");
        assert_eq!(result.label_of(17), None);
        assert_eq!(result.label_of(18).unwrap().to_string(), "H5.43");
        assert_eq!(result.label_of(25).unwrap().to_string(), "H5.50");
        assert_eq!(result.label_of(46).unwrap().to_string(), "S1.50");
        assert_eq!(result.element_centers()[&LabelStem::strand(2)], 55);
        assert_eq!(result.params().split_mode, SplitRule::Coil);
        assert_eq!(result.params().template_ids[&Subdomain::B], "TB");
        assert_eq!(result.params().rmsd[&Subdomain::A], 1.1);
        assert_eq!(result.residue_labels().len(), 70);

        // GPS anchor 262 maps to query 62
        assert_eq!(result.label_of(62), Some(Label::Gps(GpsSite::Minus1)));
        assert_eq!(result.gps()[&GpsSite::Plus1], 63);
        assert_eq!(result.loops().len(), 3);
    }

    #[test]
    fn test_pinned_template() {
        let (templates, sup) = (library(), superposer());
        let config = IndexerConfig::builder()
            .template_mode(crate::config::TemplateMode::Pinned(BTreeMap::from([(
                Subdomain::B,
                "TB2".to_string(),
            )])))
            .patch_gps(false)
            .build();
        let result = Indexer::new(&templates, &sup, &config).index(&input()).unwrap();
        assert_eq!(result.params().template_ids[&Subdomain::B], "TB2");
        assert_eq!(result.label_of(46).unwrap().to_string(), "S1.50");
        assert!(result.gps().is_empty());
        // S2 is absent from TB2, so the second strand stays unlabelled
        assert_eq!(result.label_of(55), None);
        assert_eq!(result.unindexed_elements().segments.len(), 1);
    }

    #[test]
    fn test_failed_subdomain_does_not_block_other() {
        let templates = library();
        let sup = OffsetSuperposer {
            offsets: BTreeMap::from([("TA".to_string(), (100, 1.1))]),
        };
        let config = IndexerConfig::default();
        let result = Indexer::new(&templates, &sup, &config).index(&input()).unwrap();
        assert!(result.label_of(10).is_some());
        assert!((40..=70).all(|r| result.label_of(r).is_none()));
        let outcome_b = &result.params().outcomes[1];
        assert_eq!(outcome_b.stage, Stage::Failed);
        assert_eq!(outcome_b.failed_at, Some(Stage::ObtainCorrespondence));
        assert!(!result.params().rmsd.contains_key(&Subdomain::B));
        assert!(result.unindexed_elements().stems.contains(&LabelStem::strand(1)));
        assert!(!result.all_failed());
    }

    #[test]
    fn test_missing_pinned_template_fails_selection() {
        let (templates, sup) = (library(), superposer());
        let config = IndexerConfig::builder()
            .template_mode(crate::config::TemplateMode::Pinned(BTreeMap::from([(
                Subdomain::A,
                "NOPE".to_string(),
            )])))
            .build();
        let result = Indexer::new(&templates, &sup, &config).index(&input()).unwrap();
        assert_eq!(result.params().outcomes[0].failed_at, Some(Stage::SelectTemplate));
        assert!(result.label_of(10).is_none());
    }

    #[test]
    fn test_idempotent() {
        let (templates, sup, config) = (library(), superposer(), IndexerConfig::default());
        let indexer = Indexer::new(&templates, &sup, &config);
        let first = indexer.index(&input()).unwrap();
        let second = indexer.index(&input()).unwrap();
        assert_eq!(first.residue_labels(), second.residue_labels());
        assert_eq!(first, second);
    }

    #[test]
    fn test_inconsistent_input_rejected() {
        let (templates, sup, config) = (library(), superposer(), IndexerConfig::default());
        let mut bad = input();
        bad.segments.push(Segment::new(SseKind::Strand, 65, 90).unwrap());
        let err = Indexer::new(&templates, &sup, &config).index(&bad).unwrap_err();
        assert!(matches!(err, GrnError::Inconsistent(_)));
    }

    #[test]
    fn test_partition_by_majority() {
        let mut structure = input();
        structure.boundary = Some(SubdomainBoundary { domain_start: 1, boundary: 27 });
        // 5..=30 has 23 residues at or before 27
        assert_eq!(structure.segments_in(Subdomain::A).len(), 1);
        structure.boundary = None;
        assert_eq!(structure.segments_in(Subdomain::B).len(), 2);
    }
}
