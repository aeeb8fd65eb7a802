//! Merging of per-template parameter tables into restraint overrides.

use super::config::{CustomRestraintConfig, WeightingScheme};
use super::error::EngineError;
use super::weighting::pair_weights;
use crate::core::io::rsr::{ParamOverride, RsrFile};
use crate::core::io::tables::ParamTable;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Merges per-template tables into one override per atom pair.
///
/// For each pair present in at least one table, the sigma (and, when the
/// tables carry one, location) values of the containing tables are blended
/// with weights normalized over exactly those tables; templates missing the
/// pair contribute nothing and claim no weight. The sigma blend is taken
/// over the magnitudes of the table values: deviation-derived columns are
/// signed, and opposite-signed deviations must not cancel into a
/// near-zero-width restraint.
pub fn merge_tables(
    tables: &[ParamTable],
    scheme: WeightingScheme,
) -> HashMap<(usize, usize), ParamOverride> {
    let mut merged = HashMap::new();

    for table in tables {
        for pair in table.pairs() {
            if merged.contains_key(&pair) {
                continue;
            }
            let rows: Vec<_> = tables
                .iter()
                .filter_map(|t| t.get(pair.0, pair.1))
                .collect();
            let deviations: Vec<f64> = rows.iter().map(|r| r.sigma).collect();
            let weights = pair_weights(scheme, &deviations);

            let sigma: f64 = rows
                .iter()
                .zip(&weights)
                .map(|(row, w)| row.sigma.abs() * w)
                .sum();
            let location = if rows.iter().all(|r| r.location.is_some()) {
                Some(
                    rows.iter()
                        .zip(&weights)
                        .map(|(row, w)| row.location.unwrap_or_default() * w)
                        .sum(),
                )
            } else {
                None
            };

            merged.insert(
                pair,
                ParamOverride {
                    sigma: Some(sigma),
                    location,
                },
            );
        }
    }

    merged
}

/// Loads the configured tables, merges them, and rewrites the restraint file
/// at `restraints_path` in place. Returns the number of edited restraints.
pub fn apply_custom_restraints(
    restraints_path: &Path,
    config: &CustomRestraintConfig,
) -> Result<usize, EngineError> {
    let mut tables = Vec::with_capacity(config.table_paths.len());
    for path in &config.table_paths {
        let table = ParamTable::load(path, &config.columns)?;
        debug!(path = %path.display(), pairs = table.len(), "loaded parameter table");
        tables.push(table);
    }

    let lookup = merge_tables(&tables, config.weighting);
    let mut file = RsrFile::read_from_path(restraints_path)?;
    let edited = file.apply_overrides(config.group, &lookup, config.drop_unmatched)?;
    file.write_to_path(restraints_path)?;
    info!(
        path = %restraints_path.display(),
        group = config.group,
        edited,
        "rewrote restraint parameters"
    );
    Ok(edited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::tables::TableColumns;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn columns(location: Option<&str>) -> TableColumns {
        TableColumns {
            atom_i: "MOD_ATOM_INDEX_I".into(),
            atom_j: "MOD_ATOM_INDEX_J".into(),
            sigma: "GRP_DD".into(),
            location: location.map(str::to_string),
        }
    }

    fn table(dir: &tempfile::TempDir, name: &str, text: &str, location: Option<&str>) -> ParamTable {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{text}").unwrap();
        ParamTable::load(&path, &columns(location)).unwrap()
    }

    #[test]
    fn flat_merge_averages_shared_pairs() {
        let dir = tempdir().unwrap();
        let t0 = table(
            &dir,
            "t0.csv",
            "GRP_DD,GRP_DT,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.4,7.0,10,55\n",
            Some("GRP_DT"),
        );
        let t1 = table(
            &dir,
            "t1.csv",
            "GRP_DD,GRP_DT,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.8,9.0,10,55\n",
            Some("GRP_DT"),
        );

        let merged = merge_tables(&[t0, t1], WeightingScheme::Flat);
        let over = merged[&(10, 55)];
        assert!((over.sigma.unwrap() - 0.6).abs() < 1e-12);
        assert!((over.location.unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn weights_renormalize_over_tables_containing_the_pair() {
        let dir = tempdir().unwrap();
        // Only t0 has pair (12, 60); t1 must claim no weight for it.
        let t0 = table(
            &dir,
            "t0.csv",
            "GRP_DD,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.4,10,55\n0.9,12,60\n",
            None,
        );
        let t1 = table(
            &dir,
            "t1.csv",
            "GRP_DD,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.8,10,55\n",
            None,
        );

        let merged = merge_tables(&[t0, t1], WeightingScheme::Flat);
        assert!((merged[&(12, 60)].sigma.unwrap() - 0.9).abs() < 1e-12);
        assert!((merged[&(10, 55)].sigma.unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn merged_sigma_is_a_magnitude() {
        let dir = tempdir().unwrap();
        let t0 = table(
            &dir,
            "t0.csv",
            "GRP_DD,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n-0.5,10,55\n",
            None,
        );
        let merged = merge_tables(&[t0], WeightingScheme::Flat);
        assert_eq!(merged[&(10, 55)].sigma, Some(0.5));
    }

    #[test]
    fn opposite_signed_deviations_do_not_cancel() {
        let dir = tempdir().unwrap();
        let t0 = table(
            &dir,
            "t0.csv",
            "GRP_DD,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.5,10,55\n",
            None,
        );
        let t1 = table(
            &dir,
            "t1.csv",
            "GRP_DD,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n-0.5,10,55\n",
            None,
        );
        let merged = merge_tables(&[t0, t1], WeightingScheme::Flat);
        assert!((merged[&(10, 55)].sigma.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn reliability_pulls_blend_toward_consistent_template() {
        let dir = tempdir().unwrap();
        let t0 = table(
            &dir,
            "t0.csv",
            "GRP_DD,GRP_DT,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.1,7.0,10,55\n",
            Some("GRP_DT"),
        );
        let t1 = table(
            &dir,
            "t1.csv",
            "GRP_DD,GRP_DT,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n2.0,9.0,10,55\n",
            Some("GRP_DT"),
        );

        let merged = merge_tables(&[t0, t1], WeightingScheme::Reliability { decay: 5.0 });
        // The small-deviation template (location 7.0) outweighs the other.
        assert!(merged[&(10, 55)].location.unwrap() < 8.0);
    }

    #[test]
    fn location_absent_when_any_table_lacks_it() {
        let dir = tempdir().unwrap();
        let t0 = table(
            &dir,
            "t0.csv",
            "GRP_DD,GRP_DT,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.4,7.0,10,55\n",
            Some("GRP_DT"),
        );
        let t1 = table(
            &dir,
            "t1.csv",
            "GRP_DD,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.8,10,55\n",
            None,
        );
        let merged = merge_tables(&[t0, t1], WeightingScheme::Flat);
        assert_eq!(merged[&(10, 55)].location, None);
    }

    #[test]
    fn apply_custom_restraints_rewrites_the_file_on_disk() {
        use super::super::config::CustomRestraintConfigBuilder;

        let dir = tempdir().unwrap();
        let table_path = dir.path().join("params.csv");
        std::fs::write(
            &table_path,
            "GRP_DD,GRP_DT,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.3,7.2,10,55\n",
        )
        .unwrap();

        let rsr_path = dir.path().join("model.rsr");
        std::fs::write(
            &rsr_path,
            "MODELLER5 VERSION: MODELLER FORMAT\n\
             R    3   1   1   9   2   2   0    10    55       7.8123    0.5000\n\
             R    3   1   1   9   2   2   0    12    60       9.1000    0.4100\n",
        )
        .unwrap();

        let config = CustomRestraintConfigBuilder::new()
            .table_paths(vec![table_path])
            .sigma_col("GRP_DD")
            .location_col("GRP_DT")
            .build()
            .unwrap();

        let edited = apply_custom_restraints(&rsr_path, &config).unwrap();
        assert_eq!(edited, 1);
        let text = std::fs::read_to_string(&rsr_path).unwrap();
        assert!(text.contains("7.2000    0.3000"));
        assert!(text.contains("9.1000    0.4100"));
    }
}
