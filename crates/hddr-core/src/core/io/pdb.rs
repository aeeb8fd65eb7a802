use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use nalgebra::Point3;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for an ATOM record (must cover the coordinate columns)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

/// Reader for PDB-format structure files.
///
/// Only `ATOM` records are consumed (plus `HETATM` for selenomethionine,
/// which substitutes for methionine in protein chains); alternate locations
/// other than the primary one are skipped, and parsing stops at the end of
/// the first model.
pub struct PdbFile;

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<Structure, Self::Error> {
        let mut structure = Structure::new();
        let mut current_chain = None;
        let mut current_residue: Option<(char, isize)> = None;
        let mut current_residue_id = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            let record_type = slice_and_trim(&line, 0, 6);
            match record_type {
                "ATOM" | "HETATM" => {}
                "ENDMDL" | "END" => break,
                _ => continue,
            }

            let res_name = slice_and_trim(&line, 17, 20);
            if record_type == "HETATM" && res_name != "MSE" {
                continue;
            }

            if line.len() < 54 {
                return Err(PdbError::Parse {
                    line: line_num,
                    kind: PdbParseErrorKind::LineTooShort,
                });
            }

            let alt_loc = line.as_bytes()[16] as char;
            if alt_loc != ' ' && alt_loc != 'A' {
                continue;
            }

            let serial_str = slice_and_trim(&line, 6, 11);
            let name_str = slice_and_trim(&line, 12, 16);
            let chain_char = line.as_bytes()[21] as char;
            let res_seq_str = slice_and_trim(&line, 22, 26);
            let x_str = slice_and_trim(&line, 30, 38);
            let y_str = slice_and_trim(&line, 38, 46);
            let z_str = slice_and_trim(&line, 46, 54);

            let serial: usize = serial_str.parse().map_err(|_| PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::InvalidInt {
                    columns: "7-11".into(),
                    value: serial_str.into(),
                },
            })?;
            let res_seq: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::InvalidInt {
                    columns: "23-26".into(),
                    value: res_seq_str.into(),
                },
            })?;
            let parse_coord = |s: &str, columns: &str| -> Result<f64, PdbError> {
                s.parse().map_err(|_| PdbError::Parse {
                    line: line_num,
                    kind: PdbParseErrorKind::InvalidFloat {
                        columns: columns.into(),
                        value: s.into(),
                    },
                })
            };
            let x = parse_coord(x_str, "31-38")?;
            let y = parse_coord(y_str, "39-46")?;
            let z = parse_coord(z_str, "47-54")?;

            let chain_id = structure.add_chain(chain_char);
            current_chain = Some(chain_id);

            if current_residue != Some((chain_char, res_seq)) {
                current_residue_id = structure.add_residue(chain_id, res_seq, res_name);
                current_residue = Some((chain_char, res_seq));
            }
            let residue_id = current_residue_id
                .ok_or_else(|| PdbError::Inconsistency("residue bookkeeping lost".into()))?;

            if structure
                .add_atom(residue_id, serial, name_str, Point3::new(x, y, z))
                .is_none()
            {
                return Err(PdbError::Inconsistency(format!(
                    "Duplicate atom serial: {serial}"
                )));
            }
        }

        if current_chain.is_none() {
            return Err(PdbError::MissingRecord("ATOM records".into()));
        }
        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::Structure;
    use std::io::BufReader;

    const SMALL_PDB: &str = "\
HEADER    HYDROLASE                               01-JAN-00   1ABC
ATOM      1  N   GLY A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  GLY A   1      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  C   GLY A   1      10.729   6.768  -4.123  1.00  0.00           C
ATOM      4  CA  ALA A   2       9.580   6.050  -3.655  1.00  0.00           C
TER       5      ALA A   2
ATOM      6  CA  SER B   1       8.000   5.000  -2.000  1.00  0.00           C
END
";

    fn parse(text: &str) -> Structure {
        PdbFile::read_from(&mut BufReader::new(text.as_bytes())).unwrap()
    }

    #[test]
    fn parses_chains_residues_and_atoms() {
        let s = parse(SMALL_PDB);
        assert_eq!(s.chain_count(), 2);
        assert_eq!(s.atom_count(), 5);
        let a = s.find_chain_by_id('A').unwrap();
        assert_eq!(s.chain_sequence(a), "GA");
        let b = s.find_chain_by_id('B').unwrap();
        assert_eq!(s.chain_sequence(b), "S");
    }

    #[test]
    fn serial_lookup_returns_coordinates() {
        let s = parse(SMALL_PDB);
        let atom = s.find_atom_by_serial(2).unwrap();
        assert_eq!(atom.name, "CA");
        assert!((atom.position.x - 11.639).abs() < 1e-9);
        assert!((atom.position.z - -5.147).abs() < 1e-9);
    }

    #[test]
    fn stops_at_end_of_first_model() {
        let text = "\
ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00  0.00           C
ENDMDL
ATOM      2  CA  GLY A   2       1.000   0.000   0.000  1.00  0.00           C
";
        let s = parse(text);
        assert_eq!(s.atom_count(), 1);
    }

    #[test]
    fn skips_secondary_alternate_locations() {
        let text = "\
ATOM      1  CA AGLY A   1       0.000   0.000   0.000  1.00  0.00           C
ATOM      2  CA BGLY A   1       9.000   0.000   0.000  1.00  0.00           C
";
        let s = parse(text);
        assert_eq!(s.atom_count(), 1);
        assert!(s.find_atom_by_serial(2).is_none());
    }

    #[test]
    fn short_atom_line_is_a_parse_error() {
        let text = "ATOM      1  CA  GLY A   1      11.104\n";
        let err = PdbFile::read_from(&mut BufReader::new(text.as_bytes())).unwrap_err();
        assert!(matches!(
            err,
            PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::LineTooShort
            }
        ));
    }

    #[test]
    fn duplicate_serial_is_an_inconsistency() {
        let text = "\
ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N
ATOM      1  CA  GLY A   1       1.000   0.000   0.000  1.00  0.00           C
";
        let err = PdbFile::read_from(&mut BufReader::new(text.as_bytes())).unwrap_err();
        assert!(matches!(err, PdbError::Inconsistency(_)));
    }

    #[test]
    fn file_without_atoms_is_rejected() {
        let err = PdbFile::read_from(&mut BufReader::new("HEADER    X\n".as_bytes())).unwrap_err();
        assert!(matches!(err, PdbError::MissingRecord(_)));
    }
}
