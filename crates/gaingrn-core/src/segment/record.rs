use super::{Dihedral, SseKind};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Per-residue secondary-structure state as emitted by the assignment tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum SseState {
    AlphaHelix,
    ThreeTenHelix,
    PiHelix,
    Strand,
    Bridge,
    Turn,
    Coil,
    /// Residue number without an assignment line, usually unmodelled.
    Missing,
}

impl SseState {
    /// Decodes a one-letter state. Lowercase helix and strand letters mark angle outliers.
    pub fn from_code(code: char) -> (Self, bool) {
        let outlier = matches!(code, 'h' | 'g' | 'i' | 'e');
        let state = match code.to_ascii_uppercase() {
            'H' => SseState::AlphaHelix,
            'G' => SseState::ThreeTenHelix,
            'I' => SseState::PiHelix,
            'E' => SseState::Strand,
            'B' => SseState::Bridge,
            'T' => SseState::Turn,
            'X' => SseState::Missing,
            _ => SseState::Coil,
        };
        (state, outlier)
    }

    pub fn code(&self) -> char {
        match self {
            SseState::AlphaHelix => 'H',
            SseState::ThreeTenHelix => 'G',
            SseState::PiHelix => 'I',
            SseState::Strand => 'E',
            SseState::Bridge => 'B',
            SseState::Turn => 'T',
            SseState::Coil => 'C',
            SseState::Missing => 'X',
        }
    }

    /// The segment kind this state contributes to, if any.
    pub fn kind(&self) -> Option<SseKind> {
        match self {
            SseState::AlphaHelix | SseState::ThreeTenHelix | SseState::PiHelix => {
                Some(SseKind::Helix)
            }
            SseState::Strand => Some(SseKind::Strand),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseRecord {
    pub residue: i32,
    /// One-letter amino acid code.
    pub res_name: char,
    pub state: SseState,
    pub outlier_flag: bool,
    pub outlier_magnitude: Option<f64>,
    /// Backbone dihedrals in degrees, when the assignment reports them.
    #[serde(default)]
    pub phi: Option<f64>,
    #[serde(default)]
    pub psi: Option<f64>,
}

impl SseRecord {
    pub fn new(residue: i32, res_name: char, code: char) -> Self {
        let (state, outlier_flag) = SseState::from_code(code);
        SseRecord {
            residue,
            res_name,
            state,
            outlier_flag,
            outlier_magnitude: None,
            phi: None,
            psi: None,
        }
    }

    pub fn missing(residue: i32) -> Self {
        SseRecord::new(residue, 'X', 'X')
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.outlier_magnitude = Some(magnitude);
        self
    }

    pub fn with_angles(mut self, phi: f64, psi: f64) -> Self {
        self.phi = Some(phi);
        self.psi = Some(psi);
        self
    }

    pub fn angle(&self, dihedral: Dihedral) -> Option<f64> {
        match dihedral {
            Dihedral::Phi => self.phi,
            Dihedral::Psi => self.psi,
        }
    }

    pub fn is_outlier(&self) -> bool {
        self.outlier_flag || self.outlier_magnitude.is_some()
    }

    /// True when the outlier magnitude exceeds `cutoff`, which removes the residue from
    /// any segment.
    pub fn exceeds(&self, cutoff: Option<f64>) -> bool {
        match (self.outlier_magnitude, cutoff) {
            (Some(magnitude), Some(cutoff)) => magnitude > cutoff,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        assert_eq!(SseState::from_code('H'), (SseState::AlphaHelix, false));
        assert_eq!(SseState::from_code('h'), (SseState::AlphaHelix, true));
        assert_eq!(SseState::from_code('e'), (SseState::Strand, true));
        assert_eq!(SseState::from_code('b'), (SseState::Bridge, false));
        assert_eq!(SseState::from_code('C'), (SseState::Coil, false));
        assert_eq!(SseState::from_code('?'), (SseState::Coil, false));
        assert_eq!(SseState::Missing.kind(), None);
        assert_eq!(SseState::ThreeTenHelix.kind(), Some(SseKind::Helix));
    }

    #[test]
    fn test_cutoff() {
        let rec = SseRecord::new(10, 'L', 'H').with_magnitude(3.5);
        assert!(rec.is_outlier());
        assert!(rec.exceeds(Some(3.0)));
        assert!(!rec.exceeds(Some(4.0)));
        assert!(!rec.exceeds(None));
        assert!(!SseRecord::new(11, 'A', 'H').is_outlier());
    }
}
