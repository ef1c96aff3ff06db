use std::collections::BTreeMap;

/// One-letter residue codes keyed by residue number.
pub type Sequence = BTreeMap<i32, char>;

/// Amino acid alphabet used for conservation statistics. `X` collects unknowns.
pub const ALPHABET: [char; 21] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y', 'X',
];

#[rustfmt::skip]
pub fn aa3to1(aa: &str) -> char {
    match aa {
        "ALA" => 'A', "CYS" => 'C', "ASP" => 'D',
        "GLU" => 'E', "PHE" => 'F', "GLY" => 'G',
        "HIS" => 'H', "ILE" => 'I', "LYS" => 'K',
        "LEU" => 'L', "MET" => 'M', "ASN" => 'N',
        "PRO" => 'P', "GLN" => 'Q', "ARG" => 'R',
        "SER" => 'S', "THR" => 'T', "VAL" => 'V',
        "TRP" => 'W', "TYR" => 'Y', "MSE" => 'M',
        "SEC" => 'U', _     => 'X',
    }
}

/// Proline and glycine interrupt helices and strands.
pub fn is_helix_breaker(code: char) -> bool {
    matches!(code.to_ascii_uppercase(), 'P' | 'G')
}
