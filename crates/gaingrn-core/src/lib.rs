//! # gaingrn-core
//!
//! Structure-based Generic Residue Numbering (GRN) for GAIN domains.
//!
//! __gaingrn-core__ provides functionality for:
//! * Detecting secondary-structure [`Segment`]s from per-residue assignments
//! * Loading validated reference [`Template`]s with their `.50` anchor residues
//! * Reconciling query segments against a template through a [`Correspondence`]
//! * Assigning labels such as `H3.50` or `S7.49` to every residue of a structure
//! * Aggregating many structures into an [`IndexingCollection`] with occupancy,
//!   conservation and loop statistics
//!
//! The main entry points are [`Indexer`] for a single structure and
//! [`IndexingCollection::build`] for a dataset.
//!
mod assign;
mod collection;
mod config;
mod correspondence;
mod error;
mod indexer;
mod label;
mod reconcile;
mod residue;
mod segment;
mod template;

pub use self::assign::{assign_labels, loop_regions, LoopRegion};
pub use self::collection::{
    CanonicalTable, CellFormat, ColumnKey, ExcludedStructure, IndexingCollection, LoopKey,
    TableRow,
};
pub use self::config::{IndexerConfig, TemplateMode};
pub use self::correspondence::{Correspondence, ResiduePair};
pub use self::error::{GrnError, Result};
pub use self::indexer::{
    Indexer, IndexingParams, IndexingResult, Stage, StructureInput, SubdomainOutcome, Superposer,
    UnindexedElements,
};
pub use self::label::{GpsSite, Label, ANCHOR_POSITION};
pub use self::reconcile::{
    reconcile, resolve_split, AnchorHit, MatchKind, ReconciledElement, Reconciliation,
    SplitContext, SplitPoint, SplitRule,
};
pub use self::residue::{aa3to1, is_helix_breaker, Sequence, ALPHABET};
pub use self::segment::{
    mark_angle_outliers, AngleDistribution, AngleReference, BoundaryDetector, BreakKind, Dihedral,
    Segment, SegmentDetector, SseKind, SseRecord, SseState, SubdomainBoundary,
};
pub use self::template::{
    ElementDefinition, LabelStem, Subdomain, Template, TemplateDefinition, TemplateLibrary,
    TemplateSegment,
};
