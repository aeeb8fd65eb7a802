use super::ids::ResidueId;

/// A chain of a parsed structure, owning its residues in source-file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    /// Single-character chain identifier from the source file.
    pub id: char,
    /// Residues of this chain, in the order they appear in the file.
    pub(crate) residues: Vec<ResidueId>,
}

impl Chain {
    pub(crate) fn new(id: char) -> Self {
        Self {
            id,
            residues: Vec::new(),
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }
}
