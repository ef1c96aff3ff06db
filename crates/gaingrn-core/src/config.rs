//! Indexing options.
//!
//! Every field has a default, so a configuration file only needs the values it changes:
//!
//! ```json
//! { "hard_cut": { "S2": 4 }, "patch_gps": false, "template_mode": { "Pinned": { "B": "TB" } } }
//! ```
use crate::error::{GrnError, Result};
use crate::segment::{AngleReference, SegmentDetector};
use crate::template::{LabelStem, Subdomain};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// How the template of a subdomain is chosen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum TemplateMode {
    /// Lowest RMSD among all candidates, ties broken by anchor coverage.
    #[default]
    Best,
    /// A fixed template id per subdomain; subdomains not listed fall back to `Best`.
    Pinned(BTreeMap<Subdomain, String>),
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Outlier magnitude above which a residue is cut out of its segment.
    pub outlier_cutoff: Option<f64>,
    /// Largest offset from the anchor that may carry the stem's label.
    #[builder(default)]
    pub hard_cut: BTreeMap<LabelStem, i32>,
    #[builder(default = true)]
    pub patch_gps: bool,
    #[builder(default)]
    pub template_mode: TemplateMode,
    /// Worker threads; 0 lets rayon decide.
    #[builder(default)]
    pub n_threads: usize,
    /// Raises log verbosity only.
    #[builder(default)]
    pub debug: bool,
    #[builder(default = 120)]
    pub superposition_timeout_secs: u64,
    /// RMSD above which a warning is logged. Never fails a structure.
    #[builder(default = 2.0)]
    pub rmsd_advisory: f64,
    #[builder(default = 1)]
    pub segment_spacing: usize,
    #[builder(default = 3)]
    pub min_helix_length: usize,
    #[builder(default = 2)]
    pub min_strand_length: usize,
    /// Backbone references for marking angle outliers before detection; empty keeps the
    /// outliers the assignment file already carries.
    #[builder(default)]
    pub angle_references: Vec<AngleReference>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig::builder().build()
    }
}

const MAX_THREADS: usize = 1024;

impl IndexerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        IndexerConfig::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_threads > MAX_THREADS {
            return Err(GrnError::invalid(format!(
                "n_threads = {} exceeds {}",
                self.n_threads, MAX_THREADS
            )));
        }
        if let Some(cutoff) = self.outlier_cutoff {
            if !cutoff.is_finite() || cutoff < 0.0 {
                return Err(GrnError::invalid(format!(
                    "outlier_cutoff = {} must be non-negative",
                    cutoff
                )));
            }
        }
        if !self.rmsd_advisory.is_finite() || self.rmsd_advisory < 0.0 {
            return Err(GrnError::invalid(format!(
                "rmsd_advisory = {} must be non-negative",
                self.rmsd_advisory
            )));
        }
        if self.superposition_timeout_secs == 0 {
            return Err(GrnError::invalid("superposition_timeout_secs must be positive"));
        }
        if self.min_helix_length == 0 || self.min_strand_length == 0 {
            return Err(GrnError::invalid("minimum segment lengths must be positive"));
        }
        if let Some((stem, k)) = self.hard_cut.iter().find(|(_, &k)| k < 0) {
            return Err(GrnError::invalid(format!("hard_cut for {} is negative ({})", stem, k)));
        }
        self.angle_references.iter().try_for_each(AngleReference::validate)
    }

    pub fn segment_detector(&self) -> SegmentDetector {
        SegmentDetector {
            spacing: self.segment_spacing,
            min_helix_length: self.min_helix_length,
            min_strand_length: self.min_strand_length,
            outlier_cutoff: self.outlier_cutoff,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.superposition_timeout_secs)
    }

    pub fn pinned(&self, subdomain: Subdomain) -> Option<&str> {
        match &self.template_mode {
            TemplateMode::Best => None,
            TemplateMode::Pinned(ids) => ids.get(&subdomain).map(String::as_str),
        }
    }
}
