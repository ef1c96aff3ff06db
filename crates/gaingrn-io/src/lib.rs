//! # gaingrn-io
//!
//! Readers and writers around the indexing engine:
//! * [`StrideReader`] for per-residue secondary-structure assignments
//! * [`parse_gesamt`], [`GesamtRunner`] and [`PrecomputedSuperposer`] for residue correspondences
//! * [`read_sequence`] for PDB coordinates
//! * [`write_table`] / [`read_table`] for the canonical label table (CSV via polars)
//! * [`write_long`] for the per-residue long format
mod gesamt;
mod long;
mod pdb;
mod stride;
mod table;

pub use self::gesamt::{parse_gesamt, read_gesamt, GesamtRunner, PrecomputedSuperposer};
pub use self::long::{write_long, write_long_file};
pub use self::pdb::{read_sequence, sequence_mismatches};
pub use self::stride::{read_stride, StrideReader};
pub use self::table::{occupancy_frame, read_table, table_frame, write_occupancy, write_table};
