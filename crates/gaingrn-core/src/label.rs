use crate::error::{GrnError, Result};
use crate::template::LabelStem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::EnumIter;

/// Position number given to every anchor residue.
pub const ANCHOR_POSITION: i32 = 50;

/// The three residues of the GPS cleavage motif.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, Serialize, Deserialize,
)]
pub enum GpsSite {
    Minus2,
    Minus1,
    Plus1,
}

impl GpsSite {
    /// Offset from the GPS-1 residue.
    pub const fn offset(&self) -> i32 {
        match self {
            GpsSite::Minus2 => -1,
            GpsSite::Minus1 => 0,
            GpsSite::Plus1 => 1,
        }
    }
}

impl fmt::Display for GpsSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GpsSite::Minus2 => "GPS-2",
            GpsSite::Minus1 => "GPS-1",
            GpsSite::Plus1 => "GPS+1",
        };
        f.write_str(name)
    }
}

/// A residue label, `H3.50` style or one of the fixed GPS labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Label {
    Generic { stem: LabelStem, position: i32 },
    Gps(GpsSite),
}

impl Label {
    pub fn generic(stem: LabelStem, position: i32) -> Self {
        Label::Generic { stem, position }
    }

    pub fn stem(&self) -> Option<LabelStem> {
        match self {
            Label::Generic { stem, .. } => Some(*stem),
            Label::Gps(_) => None,
        }
    }

    pub fn position(&self) -> Option<i32> {
        match self {
            Label::Generic { position, .. } => Some(*position),
            Label::Gps(_) => None,
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.position() == Some(ANCHOR_POSITION)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Generic { stem, position } => write!(f, "{}.{}", stem, position),
            Label::Gps(site) => write!(f, "{}", site),
        }
    }
}

impl FromStr for Label {
    type Err = GrnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GPS-2" => return Ok(Label::Gps(GpsSite::Minus2)),
            "GPS-1" => return Ok(Label::Gps(GpsSite::Minus1)),
            "GPS+1" => return Ok(Label::Gps(GpsSite::Plus1)),
            _ => {}
        }
        let (stem, position) = s
            .split_once('.')
            .ok_or_else(|| {
                GrnError::parse(format!("label '{}' is not of the form <stem>.<position>", s))
            })?;
        let position = position
            .parse()
            .map_err(|_| GrnError::parse(format!("label '{}' has a non-numeric position", s)))?;
        Ok(Label::Generic {
            stem: stem.parse()?,
            position,
        })
    }
}

impl TryFrom<String> for Label {
    type Error = GrnError;
    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Label> for String {
    fn from(label: Label) -> String {
        label.to_string()
    }
}
