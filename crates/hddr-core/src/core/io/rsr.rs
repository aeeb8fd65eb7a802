use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

/// Form code of Gaussian restraints, whose parameters are (location, sigma).
pub const GAUSSIAN_FORM: u32 = 3;

/// Restraint group codes of the homology-derived distance restraints.
pub const HDDR_GROUPS: [u32; 4] = [
    CA_CA_GROUP,
    N_O_GROUP,
    MIXED_MAIN_CHAIN_GROUP,
    SIDE_CHAIN_GROUP,
];

/// Group code of Cα–Cα distance restraints.
pub const CA_CA_GROUP: u32 = 9;
/// Group code of main-chain N–O distance restraints.
pub const N_O_GROUP: u32 = 10;
/// Group code of distance restraints involving at least one main-chain atom.
pub const MIXED_MAIN_CHAIN_GROUP: u32 = 23;
/// Group code of all-side-chain distance restraints.
pub const SIDE_CHAIN_GROUP: u32 = 26;

#[derive(Debug, Error)]
pub enum RsrError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: RsrParseErrorKind,
    },
    #[error(
        "Restraint on atoms {atom_i}-{atom_j} has form {form}, but only Gaussian restraints \
         (form {GAUSSIAN_FORM}) support parameter overrides"
    )]
    UnsupportedForm {
        form: u32,
        atom_i: usize,
        atom_j: usize,
    },
    #[error("Failed to replace restraint file '{path}': {source}")]
    AtomicReplace {
        path: String,
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RsrParseErrorKind {
    #[error("Invalid integer in field {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float in parameter {index} (value: '{value}')")]
    InvalidFloat { index: usize, value: String },
    #[error("Record has {found} fields but the header declares {expected}")]
    TruncatedRecord { expected: usize, found: usize },
}

/// A parsed restraint record.
///
/// Field order follows the restraint-file layout: a form code, modality,
/// feature, group code, then the atom serial numbers the restraint acts on
/// and its numeric parameters. For Gaussian distance restraints the
/// parameters are `(location, sigma)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Restraint {
    pub form: u32,
    pub modality: u32,
    pub feature: u32,
    pub group: u32,
    pub atoms: Vec<usize>,
    pub params: Vec<f64>,
}

impl Restraint {
    /// The ordered atom pair of a distance restraint.
    pub fn atom_pair(&self) -> Option<(usize, usize)> {
        match self.atoms.as_slice() {
            [i, j, ..] => Some((*i, *j)),
            _ => None,
        }
    }
}

/// Replacement values for the Gaussian parameters of one restraint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamOverride {
    pub sigma: Option<f64>,
    pub location: Option<f64>,
}

#[derive(Debug, Clone)]
struct RestraintLine {
    rec: Restraint,
    raw: String,
    /// Byte span of each whitespace-separated token of `raw`.
    spans: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
enum Line {
    Raw(String),
    Restraint(RestraintLine),
}

/// An in-memory restraint file.
///
/// Every line is kept verbatim: restraint records carry their raw text plus
/// token spans, so serialization reproduces the input byte-for-byte except
/// for the numeric fields an override actually replaced.
#[derive(Debug, Clone)]
pub struct RsrFile {
    lines: Vec<Line>,
    trailing_newline: bool,
}

// Token layout of a restraint record: "R" + 7 header integers
// (form, modality, feature, group, natoms, nparams, nfeats).
const HEADER_TOKENS: usize = 8;
const LOCATION_PARAM: usize = 0;
const SIGMA_PARAM: usize = 1;

fn tokenize(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        spans.push((start, i));
    }
    spans
}

fn parse_record(line: &str, line_num: usize) -> Result<RestraintLine, RsrError> {
    let spans = tokenize(line);
    let token = |span: (usize, usize)| &line[span.0..span.1];

    let parse_u32 = |idx: usize, field: &'static str| -> Result<u32, RsrError> {
        token(spans[idx]).parse().map_err(|_| RsrError::Parse {
            line: line_num,
            kind: RsrParseErrorKind::InvalidInt {
                field,
                value: token(spans[idx]).to_string(),
            },
        })
    };

    if spans.len() < HEADER_TOKENS {
        return Err(RsrError::Parse {
            line: line_num,
            kind: RsrParseErrorKind::TruncatedRecord {
                expected: HEADER_TOKENS,
                found: spans.len(),
            },
        });
    }

    let form = parse_u32(1, "form")?;
    let modality = parse_u32(2, "modality")?;
    let feature = parse_u32(3, "feature")?;
    let group = parse_u32(4, "group")?;
    let natoms = parse_u32(5, "natoms")? as usize;
    let nparams = parse_u32(6, "nparams")? as usize;

    let expected = HEADER_TOKENS + natoms + nparams;
    if spans.len() != expected {
        return Err(RsrError::Parse {
            line: line_num,
            kind: RsrParseErrorKind::TruncatedRecord {
                expected,
                found: spans.len(),
            },
        });
    }

    let mut atoms = Vec::with_capacity(natoms);
    for k in 0..natoms {
        let value = token(spans[HEADER_TOKENS + k]);
        atoms.push(value.parse().map_err(|_| RsrError::Parse {
            line: line_num,
            kind: RsrParseErrorKind::InvalidInt {
                field: "atom index",
                value: value.to_string(),
            },
        })?);
    }

    let mut params = Vec::with_capacity(nparams);
    for k in 0..nparams {
        let value = token(spans[HEADER_TOKENS + natoms + k]);
        params.push(value.parse().map_err(|_| RsrError::Parse {
            line: line_num,
            kind: RsrParseErrorKind::InvalidFloat {
                index: k,
                value: value.to_string(),
            },
        })?);
    }

    Ok(RestraintLine {
        rec: Restraint {
            form,
            modality,
            feature,
            group,
            atoms,
            params,
        },
        raw: line.to_string(),
        spans,
    })
}

impl RestraintLine {
    /// Replaces parameter `param_idx` in both the parsed record and the raw
    /// text, preserving every other byte of the line. Shorter replacements
    /// are right-aligned into the original token width.
    fn set_param(&mut self, param_idx: usize, value: f64) {
        let token_idx = HEADER_TOKENS + self.rec.atoms.len() + param_idx;
        let (start, end) = self.spans[token_idx];
        let mut rendered = format!("{value:.4}");
        let width = end - start;
        if rendered.len() < width {
            rendered = format!("{rendered:>width$}");
        }
        self.raw.replace_range(start..end, &rendered);
        self.spans = tokenize(&self.raw);
        self.rec.params[param_idx] = value;
    }
}

impl RsrFile {
    /// Parses restraint text. `R`-prefixed lines become restraint records;
    /// every other line (headers, comments) is preserved verbatim.
    pub fn parse(text: &str) -> Result<Self, RsrError> {
        let mut lines = Vec::new();
        for (line_num, line) in text.lines().enumerate() {
            let is_record = line.split_ascii_whitespace().next() == Some("R");
            if is_record {
                lines.push(Line::Restraint(parse_record(line, line_num + 1)?));
            } else {
                lines.push(Line::Raw(line.to_string()));
            }
        }
        Ok(Self {
            lines,
            trailing_newline: text.is_empty() || text.ends_with('\n'),
        })
    }

    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, RsrError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, RsrError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// All restraint records, in file order.
    pub fn restraints(&self) -> impl Iterator<Item = &Restraint> {
        self.lines.iter().filter_map(|line| match line {
            Line::Restraint(r) => Some(&r.rec),
            Line::Raw(_) => None,
        })
    }

    /// Ordered atom pairs of the distance restraints in `group`.
    pub fn group_pairs(&self, group: u32) -> Vec<(usize, usize)> {
        self.restraints()
            .filter(|r| r.group == group)
            .filter_map(Restraint::atom_pair)
            .collect()
    }

    /// Ordered atom pairs of the distance restraints in any of `groups`,
    /// in file order.
    pub fn pairs_in_groups(&self, groups: &[u32]) -> Vec<(usize, usize)> {
        self.restraints()
            .filter(|r| groups.contains(&r.group))
            .filter_map(Restraint::atom_pair)
            .collect()
    }

    /// The restraint of `group` acting on `pair`, matched symmetrically.
    pub fn find_restraint(&self, group: u32, pair: (usize, usize)) -> Option<&Restraint> {
        self.restraints().find(|r| {
            r.group == group
                && r.atom_pair()
                    .is_some_and(|p| p == pair || p == (pair.1, pair.0))
        })
    }

    /// Applies parameter overrides to the restraints of one group.
    ///
    /// The atom pair of each restraint in `group` is looked up in `lookup`,
    /// in both orders. On a hit, the sigma and/or location parameters are
    /// replaced in place; every other field of the line and every line
    /// outside `group` is left untouched. On a miss, the restraint is
    /// removed when `drop_unmatched` is set and kept unchanged otherwise.
    ///
    /// Returns the number of edited restraints.
    ///
    /// # Errors
    ///
    /// Returns [`RsrError::UnsupportedForm`] if an override matches a
    /// non-Gaussian restraint.
    pub fn apply_overrides(
        &mut self,
        group: u32,
        lookup: &HashMap<(usize, usize), ParamOverride>,
        drop_unmatched: bool,
    ) -> Result<usize, RsrError> {
        let mut edited = 0;
        let mut keep = vec![true; self.lines.len()];

        for (idx, line) in self.lines.iter_mut().enumerate() {
            let Line::Restraint(restraint) = line else {
                continue;
            };
            if restraint.rec.group != group {
                continue;
            }
            let Some((i, j)) = restraint.rec.atom_pair() else {
                continue;
            };
            let hit = lookup.get(&(i, j)).or_else(|| lookup.get(&(j, i)));
            match hit {
                Some(over) => {
                    if restraint.rec.form != GAUSSIAN_FORM || restraint.rec.params.len() < 2 {
                        return Err(RsrError::UnsupportedForm {
                            form: restraint.rec.form,
                            atom_i: i,
                            atom_j: j,
                        });
                    }
                    if let Some(location) = over.location {
                        restraint.set_param(LOCATION_PARAM, location);
                    }
                    if let Some(sigma) = over.sigma {
                        restraint.set_param(SIGMA_PARAM, sigma);
                    }
                    edited += 1;
                }
                None if drop_unmatched => keep[idx] = false,
                None => {}
            }
        }

        if keep.contains(&false) {
            let mut kept = keep.iter();
            self.lines.retain(|_| kept.next().copied().unwrap_or(false));
        }
        Ok(edited)
    }

    /// Serializes the file, reproducing unedited lines byte-for-byte.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), RsrError> {
        write!(writer, "{}", self.to_text())?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let last = self.lines.len().saturating_sub(1);
        let mut text = String::new();
        for (idx, line) in self.lines.iter().enumerate() {
            let content = match line {
                Line::Raw(raw) => raw,
                Line::Restraint(r) => &r.raw,
            };
            text.push_str(content);
            if idx != last || self.trailing_newline {
                text.push('\n');
            }
        }
        text
    }

    /// Atomically replaces `path` with the serialized file: the text is
    /// written to a temporary file in the same directory, then renamed over
    /// the destination, so a failed write never leaves a truncated file.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), RsrError> {
        let path = path.as_ref();
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new_in(".")?,
        };
        self.write_to(&mut tmp)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| RsrError::AtomicReplace {
            path: path.display().to_string(),
            source: e.error,
        })?;
        Ok(())
    }
}
