use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Table '{path}' is missing required column '{column}'")]
    MissingColumn { path: String, column: String },
    #[error("Table '{path}', row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        path: String,
        row: usize,
        column: String,
        value: String,
    },
}

/// Column names selecting the relevant fields of a restraint-parameter table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumns {
    pub atom_i: String,
    pub atom_j: String,
    pub sigma: String,
    pub location: Option<String>,
}

/// Override values of one table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRow {
    pub sigma: f64,
    pub location: Option<f64>,
}

/// A restraint-parameter table keyed by atom pair.
///
/// Tables are CSV files with caller-named columns; columns beyond the
/// configured ones are ignored, so tables may carry diagnostic fields.
/// Pair keys are canonicalized to `(min, max)` so lookups are symmetric.
#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    rows: HashMap<(usize, usize), TableRow>,
}

fn canonical(i: usize, j: usize) -> (usize, usize) {
    (i.min(j), i.max(j))
}

impl ParamTable {
    /// Loads a table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingColumn`] if a configured column is not in
    /// the header, and [`TableError::InvalidValue`] for unparseable cells.
    pub fn load(path: &Path, columns: &TableColumns) -> Result<Self, TableError> {
        let display = path.to_string_lossy().to_string();
        let mut reader = csv::Reader::from_path(path).map_err(|e| TableError::Csv {
            path: display.clone(),
            source: e,
        })?;

        let headers = reader
            .headers()
            .map_err(|e| TableError::Csv {
                path: display.clone(),
                source: e,
            })?
            .clone();
        let position = |name: &str| -> Result<usize, TableError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| TableError::MissingColumn {
                    path: display.clone(),
                    column: name.to_string(),
                })
        };

        let atom_i_idx = position(&columns.atom_i)?;
        let atom_j_idx = position(&columns.atom_j)?;
        let sigma_idx = position(&columns.sigma)?;
        let location_idx = columns
            .location
            .as_deref()
            .map(position)
            .transpose()?;

        let mut rows = HashMap::new();
        for (row_num, record) in reader.records().enumerate() {
            let record = record.map_err(|e| TableError::Csv {
                path: display.clone(),
                source: e,
            })?;
            let cell = |idx: usize, column: &str| -> Result<&str, TableError> {
                record.get(idx).ok_or_else(|| TableError::InvalidValue {
                    path: display.clone(),
                    row: row_num + 1,
                    column: column.to_string(),
                    value: String::new(),
                })
            };
            let parse_usize = |idx: usize, column: &str| -> Result<usize, TableError> {
                let value = cell(idx, column)?;
                value.trim().parse().map_err(|_| TableError::InvalidValue {
                    path: display.clone(),
                    row: row_num + 1,
                    column: column.to_string(),
                    value: value.to_string(),
                })
            };
            let parse_f64 = |idx: usize, column: &str| -> Result<f64, TableError> {
                let value = cell(idx, column)?;
                value.trim().parse().map_err(|_| TableError::InvalidValue {
                    path: display.clone(),
                    row: row_num + 1,
                    column: column.to_string(),
                    value: value.to_string(),
                })
            };

            let atom_i = parse_usize(atom_i_idx, &columns.atom_i)?;
            let atom_j = parse_usize(atom_j_idx, &columns.atom_j)?;
            let sigma = parse_f64(sigma_idx, &columns.sigma)?;
            let location = match (location_idx, &columns.location) {
                (Some(idx), Some(name)) => Some(parse_f64(idx, name)?),
                _ => None,
            };

            rows.insert(canonical(atom_i, atom_j), TableRow { sigma, location });
        }

        Ok(Self { rows })
    }

    /// Symmetric lookup of a pair's override row.
    pub fn get(&self, i: usize, j: usize) -> Option<&TableRow> {
        self.rows.get(&canonical(i, j))
    }

    /// Canonicalized pair keys of all rows.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of an optimal-restraint analysis table.
///
/// Field order matches the on-disk column order (alphabetical, the layout
/// parameter-table consumers expect).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    /// Deviation: target distance minus template distance.
    #[serde(rename = "GRP_DD")]
    pub grp_dd: f64,
    /// Distance observed in the target structure.
    #[serde(rename = "GRP_DN")]
    pub grp_dn: f64,
    /// Distance observed in the template structure.
    #[serde(rename = "GRP_DT")]
    pub grp_dt: f64,
    #[serde(rename = "MOD_ATOM_INDEX_I")]
    pub mod_atom_index_i: usize,
    #[serde(rename = "MOD_ATOM_INDEX_J")]
    pub mod_atom_index_j: usize,
    #[serde(rename = "MOD_ATOM_TYPE_I")]
    pub mod_atom_type_i: String,
    #[serde(rename = "MOD_ATOM_TYPE_J")]
    pub mod_atom_type_j: String,
    #[serde(rename = "MOD_RES_NAME_I")]
    pub mod_res_name_i: char,
    #[serde(rename = "MOD_RES_NAME_J")]
    pub mod_res_name_j: char,
    #[serde(rename = "MOD_RES_PDB_ID_I")]
    pub mod_res_pdb_id_i: isize,
    #[serde(rename = "MOD_RES_PDB_ID_J")]
    pub mod_res_pdb_id_j: isize,
    /// Restraint group tag derived from the atom-type pair.
    #[serde(rename = "RST_GRP")]
    pub rst_grp: String,
    #[serde(rename = "TAR_RES_NAME_I")]
    pub tar_res_name_i: char,
    #[serde(rename = "TAR_RES_NAME_J")]
    pub tar_res_name_j: char,
    #[serde(rename = "TAR_RES_PDB_ID_I")]
    pub tar_res_pdb_id_i: isize,
    #[serde(rename = "TAR_RES_PDB_ID_J")]
    pub tar_res_pdb_id_j: isize,
    #[serde(rename = "TEM_RES_NAME_I")]
    pub tem_res_name_i: char,
    #[serde(rename = "TEM_RES_NAME_J")]
    pub tem_res_name_j: char,
    #[serde(rename = "TEM_RES_PDB_ID_I")]
    pub tem_res_pdb_id_i: isize,
    #[serde(rename = "TEM_RES_PDB_ID_J")]
    pub tem_res_pdb_id_j: isize,
}

/// Writes an analysis table to `path`. An empty row set still produces the
/// file, without a header, mirroring the downstream convention that a table
/// with no rows overrides nothing.
pub fn write_analysis_table(path: &Path, rows: &[AnalysisRow]) -> Result<(), TableError> {
    let display = path.to_string_lossy().to_string();
    let mut writer = csv::Writer::from_path(path).map_err(|e| TableError::Csv {
        path: display.clone(),
        source: e,
    })?;
    for row in rows {
        writer.serialize(row).map_err(|e| TableError::Csv {
            path: display.clone(),
            source: e,
        })?;
    }
    writer.flush().map_err(|e| TableError::Io {
        path: display,
        source: e,
    })?;
    Ok(())
}
