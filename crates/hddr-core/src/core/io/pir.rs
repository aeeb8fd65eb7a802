use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PirError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Entry '{code}' has no description line")]
    MissingDescription { code: String },
    #[error("Alignment file contains no entries")]
    Empty,
    #[error("Entry '{code}' has {length} columns, expected {expected}")]
    ColumnMismatch {
        code: String,
        length: usize,
        expected: usize,
    },
    #[error("Sequence '{0}' is not present in the alignment")]
    UnknownSequence(String),
}

/// One entry of a PIR alignment: a sequence identified by its code, with a
/// reference to its structure file and its gap-padded sequence text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PirEntry {
    pub code: String,
    /// First field of the description line ("structureX", "sequence", ...).
    pub entry_type: String,
    /// Structure file recorded for this entry (second description field).
    pub atom_file: String,
    /// Gap-padded sequence; `-` marks a gap column.
    pub aligned: String,
}

impl PirEntry {
    /// The sequence with gap characters removed.
    pub fn ungapped(&self) -> String {
        self.aligned.chars().filter(|&c| !is_gap(c)).collect()
    }
}

pub(crate) fn is_gap(c: char) -> bool {
    c == '-' || c == '.'
}

/// A parsed multi-sequence alignment in PIR format.
///
/// Invariants: all entries span the same number of columns, column order
/// follows sequence order in every entry, and each residue occupies exactly
/// one column.
#[derive(Debug, Clone)]
pub struct Alignment {
    entries: Vec<PirEntry>,
    index: HashMap<String, usize>,
}

impl Alignment {
    pub fn parse(text: &str) -> Result<Self, PirError> {
        let mut entries: Vec<PirEntry> = Vec::new();
        let mut lines = text.lines().peekable();

        while let Some(line) = lines.next() {
            let line = line.trim_end();
            let Some(code) = line.strip_prefix(">P1;") else {
                continue;
            };
            let code = code.trim().to_string();

            let description = lines
                .next()
                .ok_or_else(|| PirError::MissingDescription { code: code.clone() })?;
            let mut fields = description.split(':');
            let entry_type = fields.next().unwrap_or("").trim().to_string();
            let atom_file = fields.next().unwrap_or("").trim().to_string();

            let mut aligned = String::new();
            let mut terminated = false;
            while let Some(seq_line) = lines.next_if(|l| !l.trim_start().starts_with(">P1;")) {
                for c in seq_line.chars() {
                    if c == '*' {
                        terminated = true;
                        break;
                    }
                    if !c.is_ascii_whitespace() {
                        aligned.push(c);
                    }
                }
                if terminated {
                    break;
                }
            }

            entries.push(PirEntry {
                code,
                entry_type,
                atom_file,
                aligned,
            });
        }

        if entries.is_empty() {
            return Err(PirError::Empty);
        }

        let expected = entries[0].aligned.chars().count();
        for entry in &entries[1..] {
            let length = entry.aligned.chars().count();
            if length != expected {
                return Err(PirError::ColumnMismatch {
                    code: entry.code.clone(),
                    length,
                    expected,
                });
            }
        }

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.code.clone(), i))
            .collect();
        Ok(Self { entries, index })
    }

    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, PirError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, PirError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn entries(&self) -> &[PirEntry] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&PirEntry> {
        self.index.get(code).map(|&i| &self.entries[i])
    }

    fn require(&self, code: &str) -> Result<&PirEntry, PirError> {
        self.get(code)
            .ok_or_else(|| PirError::UnknownSequence(code.to_string()))
    }

    /// Residue correspondence between two entries: for every column where
    /// both sequences have a residue, maps the 0-based residue ordinal in
    /// `a` to the ordinal in `b`. Residues facing a gap have no entry.
    pub fn correspondence(&self, a: &str, b: &str) -> Result<HashMap<usize, usize>, PirError> {
        let a = self.require(a)?;
        let b = self.require(b)?;
        Ok(column_correspondence(&a.aligned, &b.aligned))
    }
}

/// Column-wise residue correspondence between two equal-length gapped
/// sequences (see [`Alignment::correspondence`]).
pub fn column_correspondence(a: &str, b: &str) -> HashMap<usize, usize> {
    let mut map = HashMap::new();
    let mut a_ordinal = 0;
    let mut b_ordinal = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        let a_res = !is_gap(ca);
        let b_res = !is_gap(cb);
        if a_res && b_res {
            map.insert(a_ordinal, b_ordinal);
        }
        if a_res {
            a_ordinal += 1;
        }
        if b_res {
            b_ordinal += 1;
        }
    }
    map
}
