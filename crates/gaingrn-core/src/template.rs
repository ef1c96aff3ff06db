//! Reference templates: named segments with their `.50` anchor residues.
//!
//! Templates are deserialized from plain [`TemplateDefinition`] records and validated once
//! into immutable [`Template`] values. A [`TemplateLibrary`] holds every template of a run.
//!
//! ```json
//! {
//!   "templates": [
//!     {
//!       "id": "A_TEMPLATE",
//!       "structure": "a_template.pdb",
//!       "elements": [
//!         { "label": "H1", "subdomain": "A", "anchor": 110, "start": 105, "end": 114 }
//!       ]
//!     }
//!   ]
//! }
//! ```
use crate::error::{GrnError, Result};
use crate::segment::SseKind;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
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
pub enum Subdomain {
    A,
    B,
}

/// Closed identifier of a template segment, `H<n>` or `S<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LabelStem {
    pub kind: SseKind,
    pub number: u8,
}

impl LabelStem {
    pub const fn new(kind: SseKind, number: u8) -> Self {
        LabelStem { kind, number }
    }
    pub const fn helix(number: u8) -> Self {
        LabelStem::new(SseKind::Helix, number)
    }
    pub const fn strand(number: u8) -> Self {
        LabelStem::new(SseKind::Strand, number)
    }
}

impl fmt::Display for LabelStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.number)
    }
}

impl FromStr for LabelStem {
    type Err = GrnError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let kind = chars
            .next()
            .and_then(SseKind::from_prefix)
            .ok_or_else(|| {
                GrnError::template(format!("label stem '{}' must start with H or S", s))
            })?;
        let number: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| GrnError::template(format!("label stem '{}' has no numeric suffix", s)))?;
        if number == 0 {
            return Err(GrnError::template(format!("label stem '{}' is numbered from 1", s)));
        }
        Ok(LabelStem { kind, number })
    }
}

impl TryFrom<String> for LabelStem {
    type Error = GrnError;
    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LabelStem> for String {
    fn from(stem: LabelStem) -> String {
        stem.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSegment {
    pub stem: LabelStem,
    pub subdomain: Subdomain,
    /// Template residue labelled `.50`.
    pub anchor: i32,
    pub extent: (i32, i32),
    /// Fraction of the reference dataset carrying this element. Used to prioritise anchors.
    pub occupancy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    pub label: String,
    pub subdomain: Subdomain,
    pub anchor: i32,
    pub start: i32,
    pub end: i32,
    #[serde(default = "default_occupancy")]
    pub occupancy: f64,
}

fn default_occupancy() -> f64 {
    1.0
}

/// Serialized form of a [`Template`], before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub id: String,
    #[serde(default)]
    pub structure: Option<PathBuf>,
    pub elements: Vec<ElementDefinition>,
    /// Template residue of the GPS-1 position.
    #[serde(default)]
    pub gps_anchor: Option<i32>,
}

/// A validated reference template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    id: String,
    segments: BTreeMap<LabelStem, TemplateSegment>,
    gps_anchor: Option<i32>,
    structure: Option<PathBuf>,
}

impl Template {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn structure(&self) -> Option<&Path> {
        self.structure.as_deref()
    }

    pub fn gps_anchor(&self) -> Option<i32> {
        self.gps_anchor
    }

    pub fn segment(&self, stem: LabelStem) -> Option<&TemplateSegment> {
        self.segments.get(&stem)
    }

    /// Segments of one subdomain in template sequence order.
    pub fn segments(&self, subdomain: Subdomain) -> Vec<&TemplateSegment> {
        self.segments
            .values()
            .filter(|seg| seg.subdomain == subdomain)
            .sorted_by_key(|seg| seg.anchor)
            .collect()
    }

    pub fn all_segments(&self) -> impl Iterator<Item = &TemplateSegment> {
        self.segments.values()
    }

    pub fn covers(&self, subdomain: Subdomain) -> bool {
        self.segments.values().any(|seg| seg.subdomain == subdomain)
    }

    pub fn anchors(&self, subdomain: Subdomain) -> Vec<(LabelStem, i32)> {
        self.segments(subdomain)
            .into_iter()
            .map(|seg| (seg.stem, seg.anchor))
            .collect()
    }

    fn with_structure_root(mut self, root: &Path) -> Self {
        if let Some(path) = self.structure.take() {
            self.structure = Some(if path.is_relative() { root.join(path) } else { path });
        }
        self
    }
}

impl TryFrom<TemplateDefinition> for Template {
    type Error = GrnError;

    fn try_from(def: TemplateDefinition) -> Result<Self> {
        let fail = |msg: String| GrnError::template(format!("{}: {}", def.id, msg));
        if def.elements.is_empty() {
            return Err(fail("no elements defined".to_string()));
        }

        let mut segments = BTreeMap::new();
        for element in &def.elements {
            let stem: LabelStem = element.label.parse()?;
            if element.start > element.end {
                return Err(fail(format!(
                    "{} extent {}-{} is reversed",
                    stem, element.start, element.end
                )));
            }
            if element.anchor < element.start || element.anchor > element.end {
                return Err(fail(format!(
                    "{} anchor {} lies outside its extent {}-{}",
                    stem, element.anchor, element.start, element.end
                )));
            }
            if !element.occupancy.is_finite()
                || element.occupancy <= 0.0
                || element.occupancy > 1.0
            {
                return Err(fail(format!(
                    "{} occupancy {} is not in (0, 1]",
                    stem, element.occupancy
                )));
            }
            let segment = TemplateSegment {
                stem,
                subdomain: element.subdomain,
                anchor: element.anchor,
                extent: (element.start, element.end),
                occupancy: element.occupancy,
            };
            if segments.insert(stem, segment).is_some() {
                return Err(fail(format!("duplicate label stem {}", stem)));
            }
        }

        let mut anchors = HashSet::new();
        for seg in segments.values() {
            if !anchors.insert(seg.anchor) {
                return Err(fail(format!("anchor residue {} is used twice", seg.anchor)));
            }
        }

        let ordered: Vec<&TemplateSegment> =
            segments.values().sorted_by_key(|seg| seg.extent).collect();
        for (left, right) in ordered.iter().tuple_windows() {
            if left.extent.1 >= right.extent.0 {
                return Err(fail(format!("extents of {} and {} overlap", left.stem, right.stem)));
            }
        }

        let a_end = ordered
            .iter()
            .filter(|seg| seg.subdomain == Subdomain::A)
            .map(|seg| seg.extent.1)
            .max();
        let b_start = ordered
            .iter()
            .filter(|seg| seg.subdomain == Subdomain::B)
            .map(|seg| seg.extent.0)
            .min();
        if let (Some(a_end), Some(b_start)) = (a_end, b_start) {
            if a_end >= b_start {
                return Err(fail("subdomain A elements must precede subdomain B".to_string()));
            }
        }

        Ok(Template {
            id: def.id,
            segments,
            gps_anchor: def.gps_anchor,
            structure: def.structure,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LibraryFile {
    templates: Vec<TemplateDefinition>,
}

/// All templates of a run, in definition order.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<Template>) -> Result<Self> {
        let mut ids = HashSet::new();
        for template in &templates {
            if !ids.insert(template.id.clone()) {
                return Err(GrnError::template(format!("duplicate template id {}", template.id)));
            }
        }
        Ok(TemplateLibrary { templates })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: LibraryFile = serde_json::from_str(json)?;
        let templates = file
            .templates
            .into_iter()
            .map(Template::try_from)
            .collect::<Result<Vec<_>>>()?;
        TemplateLibrary::new(templates)
    }

    /// Loads a library file. Relative structure paths resolve against the file's directory.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let library = TemplateLibrary::from_json_str(&json)?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(TemplateLibrary {
            templates: library
                .templates
                .into_iter()
                .map(|t| t.with_structure_root(root))
                .collect(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Templates that define at least one segment in `subdomain`.
    pub fn candidates(&self, subdomain: Subdomain) -> Vec<&Template> {
        self.templates.iter().filter(|t| t.covers(subdomain)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
