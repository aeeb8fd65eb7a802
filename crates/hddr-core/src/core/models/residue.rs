use super::ids::{AtomId, ChainId};
use crate::core::utils::codes;
use std::collections::HashMap;

/// A residue of a parsed structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    /// Residue sequence number from the source file.
    pub id: isize,
    /// Three-letter residue name (e.g., "ALA", "GLY").
    pub name: String,
    /// One-letter residue code ('X' for non-standard residues).
    pub code: char,
    /// ID of the parent chain.
    pub chain_id: ChainId,
    pub(crate) atoms: Vec<AtomId>,
    atom_name_map: HashMap<String, AtomId>,
}

impl Residue {
    pub(crate) fn new(id: isize, name: &str, chain_id: ChainId) -> Self {
        Self {
            id,
            name: name.to_string(),
            code: codes::one_letter(name),
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map.insert(atom_name.to_string(), atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    /// Looks up an atom of this residue by its name (e.g., "CA").
    pub fn atom_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map.get(name).copied()
    }
}
