use super::ids::ResidueId;
use nalgebra::Point3;

/// Main-chain (backbone) atom names of a standard amino acid residue,
/// including the C-terminal OXT.
pub const MAIN_CHAIN_ATOMS: [&str; 5] = ["CA", "N", "C", "O", "OXT"];

/// Returns whether an atom name denotes a main-chain atom.
pub fn is_main_chain(name: &str) -> bool {
    MAIN_CHAIN_ATOMS.contains(&name)
}

/// An atom of a parsed structure.
///
/// Atoms are identified by the serial number assigned in their source file;
/// restraint files reference atoms through these serials, so they must be
/// unique within one structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Serial number from the source structure file.
    pub serial: usize,
    /// The name of the atom (e.g., "CA", "N", "OG1").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(serial: usize, name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            serial,
            name: name.to_string(),
            residue_id,
            position,
        }
    }
}
