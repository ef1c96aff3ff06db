//! Secondary-structure segments and their detection from per-residue records.

mod angles;
mod boundary;
mod detect;
mod model;
mod record;

pub use angles::{mark_angle_outliers, AngleDistribution, AngleReference, Dihedral};
pub use boundary::{BoundaryDetector, SubdomainBoundary};
pub use detect::SegmentDetector;
pub use model::{BreakKind, Segment, SseKind};
pub use record::{SseRecord, SseState};
