use super::atom::Atom;
use super::chain::Chain;
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::HashMap;

/// A complete parsed structure: chains, residues, and atoms.
///
/// This is the central data structure consumed by the restraint machinery.
/// All cross-references needed later (atom serial lookups, residue ordinals
/// within a chain) are explicit maps built during construction, so no
/// externally-owned object is ever mutated to carry bookkeeping state.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    atoms: SlotMap<AtomId, Atom>,
    residues: SlotMap<ResidueId, Residue>,
    chains: SlotMap<ChainId, Chain>,
    /// Chains in the order they appear in the source file.
    chain_order: Vec<ChainId>,
    chain_id_map: HashMap<char, ChainId>,
    serial_map: HashMap<usize, AtomId>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Chains in source-file order.
    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.chain_order.iter().map(|&id| &self.chains[id])
    }

    pub fn chain_count(&self) -> usize {
        self.chain_order.len()
    }

    pub fn find_chain_by_id(&self, id: char) -> Option<ChainId> {
        self.chain_id_map.get(&id).copied()
    }

    /// Looks up an atom by the serial number assigned in the source file.
    pub fn find_atom_by_serial(&self, serial: usize) -> Option<&Atom> {
        self.serial_map.get(&serial).map(|&id| &self.atoms[id])
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Residues of a chain in source-file order.
    pub fn chain_residues(&self, chain_id: ChainId) -> impl Iterator<Item = &Residue> {
        self.chains
            .get(chain_id)
            .map(|c| c.residues.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&id| &self.residues[id])
    }

    /// All residues in source-file order, chains flattened.
    pub fn residues_in_order(&self) -> impl Iterator<Item = &Residue> {
        self.chain_order
            .iter()
            .flat_map(|&c| self.chains[c].residues.iter())
            .map(|&id| &self.residues[id])
    }

    /// One-letter sequence of a chain.
    pub fn chain_sequence(&self, chain_id: ChainId) -> String {
        self.chain_residues(chain_id).map(|r| r.code).collect()
    }

    /// Maps each residue of a chain to its 0-based ordinal within the chain.
    pub fn residue_ordinals(&self, chain_id: ChainId) -> HashMap<ResidueId, usize> {
        self.chains
            .get(chain_id)
            .map(|c| c.residues.as_slice())
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .map(|(ordinal, &id)| (id, ordinal))
            .collect()
    }

    /// Adds a chain or returns the existing one with the same identifier.
    pub fn add_chain(&mut self, id: char) -> ChainId {
        if let Some(&existing) = self.chain_id_map.get(&id) {
            return existing;
        }
        let chain_id = self.chains.insert(Chain::new(id));
        self.chain_order.push(chain_id);
        self.chain_id_map.insert(id, chain_id);
        chain_id
    }

    /// Appends a residue to a chain.
    ///
    /// Returns `None` if the chain does not exist.
    pub fn add_residue(&mut self, chain_id: ChainId, number: isize, name: &str) -> Option<ResidueId> {
        if !self.chains.contains_key(chain_id) {
            return None;
        }
        let residue_id = self.residues.insert(Residue::new(number, name, chain_id));
        self.chains[chain_id].residues.push(residue_id);
        Some(residue_id)
    }

    /// Adds an atom to a residue.
    ///
    /// Returns `None` if the residue does not exist or the serial number is
    /// already taken.
    pub fn add_atom(
        &mut self,
        residue_id: ResidueId,
        serial: usize,
        name: &str,
        position: Point3<f64>,
    ) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) || self.serial_map.contains_key(&serial) {
            return None;
        }
        let atom_id = self
            .atoms
            .insert(Atom::new(serial, name, residue_id, position));
        self.serial_map.insert(serial, atom_id);
        self.residues[residue_id].add_atom(name, atom_id);
        Some(atom_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_chain_structure() -> Structure {
        let mut s = Structure::new();
        let a = s.add_chain('A');
        let r1 = s.add_residue(a, 1, "GLY").unwrap();
        let r2 = s.add_residue(a, 2, "ALA").unwrap();
        s.add_atom(r1, 1, "N", Point3::new(0.0, 0.0, 0.0)).unwrap();
        s.add_atom(r1, 2, "CA", Point3::new(1.0, 0.0, 0.0)).unwrap();
        s.add_atom(r2, 3, "CA", Point3::new(2.0, 0.0, 0.0)).unwrap();
        let b = s.add_chain('B');
        let r3 = s.add_residue(b, 1, "SER").unwrap();
        s.add_atom(r3, 4, "CA", Point3::new(3.0, 0.0, 0.0)).unwrap();
        s
    }

    #[test]
    fn chains_keep_insertion_order() {
        let s = two_chain_structure();
        let ids: Vec<char> = s.chains().map(|c| c.id).collect();
        assert_eq!(ids, vec!['A', 'B']);
        assert_eq!(s.chain_count(), 2);
    }

    #[test]
    fn add_chain_is_idempotent() {
        let mut s = Structure::new();
        let first = s.add_chain('A');
        let second = s.add_chain('A');
        assert_eq!(first, second);
        assert_eq!(s.chain_count(), 1);
    }

    #[test]
    fn serial_lookup_finds_atom_and_parent_residue() {
        let s = two_chain_structure();
        let atom = s.find_atom_by_serial(3).unwrap();
        assert_eq!(atom.name, "CA");
        let residue = s.residue(atom.residue_id).unwrap();
        assert_eq!(residue.name, "ALA");
        assert_eq!(residue.id, 2);
    }

    #[test]
    fn duplicate_serial_is_rejected() {
        let mut s = Structure::new();
        let a = s.add_chain('A');
        let r = s.add_residue(a, 1, "GLY").unwrap();
        assert!(s.add_atom(r, 1, "N", Point3::origin()).is_some());
        assert!(s.add_atom(r, 1, "CA", Point3::origin()).is_none());
    }

    #[test]
    fn chain_sequence_uses_one_letter_codes() {
        let s = two_chain_structure();
        let a = s.find_chain_by_id('A').unwrap();
        assert_eq!(s.chain_sequence(a), "GA");
    }

    #[test]
    fn residue_ordinals_are_zero_based_per_chain() {
        let s = two_chain_structure();
        let a = s.find_chain_by_id('A').unwrap();
        let ordinals = s.residue_ordinals(a);
        let residues: Vec<_> = s.chain_residues(a).collect();
        assert_eq!(ordinals.len(), 2);
        assert_eq!(
            ordinals[&s.chain(a).unwrap().residues()[0]],
            0
        );
        assert_eq!(residues[1].id, 2);
    }

    #[test]
    fn residues_in_order_flattens_chains() {
        let s = two_chain_structure();
        let names: Vec<&str> = s.residues_in_order().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["GLY", "ALA", "SER"]);
    }
}
