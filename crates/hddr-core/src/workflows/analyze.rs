//! Optimal-restraint analysis workflow.
//!
//! Compares the distances a model's restraints act on against the same
//! distances measured in the experimentally determined target structure and
//! in each template, producing one parameter table per template. The tables
//! carry the target distance, the template distance, and their deviation for
//! every restraint pair that could be traced through both structures, and
//! feed directly back into the table-driven restraint rebuild.

use crate::core::io::pdb::PdbFile;
use crate::core::io::pir::{Alignment, column_correspondence};
use crate::core::io::rsr::{
    CA_CA_GROUP, MIXED_MAIN_CHAIN_GROUP, N_O_GROUP, RsrFile, SIDE_CHAIN_GROUP,
};
use crate::core::io::tables::{AnalysisRow, write_analysis_table};
use crate::core::io::traits::StructureFile;
use crate::core::models::atom::{Atom, is_main_chain};
use crate::core::models::ids::ChainId;
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use crate::core::seq::align::{global_align, sequence_identity};
use crate::core::utils::geometry::atom_distance;
use crate::engine::config::AnalyzeConfig;
use crate::engine::error::EngineError;
use crate::engine::templates::resolve_template_file;
use std::path::PathBuf;
use tracing::{info, instrument};

/// The data sets an analysis runs over. The model structure and restraint
/// file come from the same build, and `sequence`/`knowns` name entries of
/// `alignment`.
pub struct AnalysisInput<'a> {
    pub alignment: &'a Alignment,
    /// Alignment code of the modeled sequence.
    pub sequence: &'a str,
    /// Alignment codes of the templates, in modeling order.
    pub knowns: &'a [String],
    pub model: &'a Structure,
    pub restraints: &'a RsrFile,
}

/// Runs the analysis, writing one table per template into the configured
/// output directory. Returns the written paths in template order.
#[instrument(skip_all, name = "analysis_workflow", fields(sequence = %input.sequence))]
pub fn run(input: &AnalysisInput, config: &AnalyzeConfig) -> Result<Vec<PathBuf>, EngineError> {
    let model_chain = single_model_chain(input.model)?;
    let target = PdbFile::read_from_path(&config.target_path)?;
    let target_chain = select_target_chain(&target, config)?;

    let model_seq = input.model.chain_sequence(model_chain);
    let target_seq = target.chain_sequence(target_chain);
    let aligned = global_align(&model_seq, &target_seq, config.gap_penalties);
    let identity = sequence_identity(&aligned);
    if identity < config.identity_threshold {
        return Err(EngineError::DataIncompatibility(format!(
            "model/target sequence identity {identity:.3} is below the required \
             {:.3}; the target structure does not correspond to the modeled sequence:\n\
             * Tar: {}\n* Mod: {}",
            config.identity_threshold, aligned.b, aligned.a
        )));
    }
    let model_to_target = column_correspondence(&aligned.a, &aligned.b);

    let model_ordinals = input.model.residue_ordinals(model_chain);
    let target_residues: Vec<&Residue> = target.chain_residues(target_chain).collect();

    // Restraint pairs of the analyzed groups, in file order.
    let pairs: Vec<(usize, usize)> = input
        .restraints
        .restraints()
        .filter(|r| config.groups.contains(&r.group))
        .filter_map(|r| r.atom_pair())
        .collect();
    info!(
        restraints = pairs.len(),
        identity = format!("{identity:.3}"),
        "analyzing restraint pairs against the target"
    );

    let mut outputs = Vec::with_capacity(input.knowns.len());
    for (template_idx, code) in input.knowns.iter().enumerate() {
        let entry = input.alignment.get(code).ok_or_else(|| {
            EngineError::DataIncompatibility(format!(
                "template '{code}' is not present in the alignment"
            ))
        })?;
        let template_path = resolve_template_file(entry, &config.search_dirs)?;
        let template = PdbFile::read_from_path(&template_path)?;
        let template_residues: Vec<&Residue> = template.residues_in_order().collect();

        let expected = entry.ungapped().chars().count();
        if template_residues.len() != expected {
            return Err(EngineError::DataIncompatibility(format!(
                "template '{code}' structure has {} residues but its alignment entry \
                 has {expected}",
                template_residues.len()
            )));
        }
        let model_to_template = input.alignment.correspondence(input.sequence, code)?;

        let mut rows = Vec::new();
        for &(serial_i, serial_j) in &pairs {
            let (mod_res_i, mod_atom_i) = model_atom(input.model, serial_i)?;
            let (mod_res_j, mod_atom_j) = model_atom(input.model, serial_j)?;
            let Some(&ord_i) = model_ordinals.get(&mod_atom_i.residue_id) else {
                continue;
            };
            let Some(&ord_j) = model_ordinals.get(&mod_atom_j.residue_id) else {
                continue;
            };

            // A pair is only comparable when both residues survive in both
            // the target and the template, and both carry the restrained
            // atom. Anything else is silently skipped, not an error: gaps
            // and missing atoms are expected in experimental structures.
            let Some(tar_i) = paired_atom(&target, &target_residues, &model_to_target, ord_i, &mod_atom_i.name) else {
                continue;
            };
            let Some(tar_j) = paired_atom(&target, &target_residues, &model_to_target, ord_j, &mod_atom_j.name) else {
                continue;
            };
            let Some(tem_i) = paired_atom(&template, &template_residues, &model_to_template, ord_i, &mod_atom_i.name) else {
                continue;
            };
            let Some(tem_j) = paired_atom(&template, &template_residues, &model_to_template, ord_j, &mod_atom_j.name) else {
                continue;
            };

            let grp_dn = atom_distance(&tar_i.1.position, &tar_j.1.position);
            let grp_dt = atom_distance(&tem_i.1.position, &tem_j.1.position);
            rows.push(AnalysisRow {
                grp_dd: grp_dn - grp_dt,
                grp_dn,
                grp_dt,
                mod_atom_index_i: serial_i,
                mod_atom_index_j: serial_j,
                mod_atom_type_i: mod_atom_i.name.clone(),
                mod_atom_type_j: mod_atom_j.name.clone(),
                mod_res_name_i: mod_res_i.code,
                mod_res_name_j: mod_res_j.code,
                mod_res_pdb_id_i: mod_res_i.id,
                mod_res_pdb_id_j: mod_res_j.id,
                rst_grp: group_tag(&mod_atom_i.name, &mod_atom_j.name).to_string(),
                tar_res_name_i: tar_i.0.code,
                tar_res_name_j: tar_j.0.code,
                tar_res_pdb_id_i: tar_i.0.id,
                tar_res_pdb_id_j: tar_j.0.id,
                tem_res_name_i: tem_i.0.code,
                tem_res_name_j: tem_j.0.code,
                tem_res_pdb_id_i: tem_i.0.id,
                tem_res_pdb_id_j: tem_j.0.id,
            });
        }

        let path = config
            .output_dir
            .join(format!("{}_tar_tem_{}.csv", input.sequence, template_idx));
        write_analysis_table(&path, &rows)?;
        info!(
            template = %code,
            rows = rows.len(),
            path = %path.display(),
            "wrote analysis table"
        );
        outputs.push(path);
    }

    Ok(outputs)
}

/// Restraint group tag re-derived from the atom-type pair, so a row's tag is
/// trustworthy even when the source restraint file mislabels a group.
fn group_tag(name_i: &str, name_j: &str) -> u32 {
    if name_i == "CA" && name_j == "CA" {
        CA_CA_GROUP
    } else if (name_i == "N" && name_j == "O") || (name_i == "O" && name_j == "N") {
        N_O_GROUP
    } else if is_main_chain(name_i) || is_main_chain(name_j) {
        MIXED_MAIN_CHAIN_GROUP
    } else {
        SIDE_CHAIN_GROUP
    }
}

fn single_model_chain(model: &Structure) -> Result<ChainId, EngineError> {
    if model.chain_count() != 1 {
        return Err(EngineError::Unsupported(format!(
            "the model structure has {} chains; restraint analysis handles \
             single-chain models only",
            model.chain_count()
        )));
    }
    let chain = model
        .chains()
        .next()
        .ok_or_else(|| EngineError::DataIncompatibility("the model structure is empty".into()))?;
    model
        .find_chain_by_id(chain.id)
        .ok_or_else(|| EngineError::DataIncompatibility("the model structure is empty".into()))
}

fn select_target_chain(target: &Structure, config: &AnalyzeConfig) -> Result<ChainId, EngineError> {
    if target.chain_count() == 0 {
        return Err(EngineError::DataIncompatibility(
            "the target structure contains no chains".into(),
        ));
    }
    let id = match (config.target_chain, target.chains().next()) {
        (Some(id), _) => id,
        (None, Some(only)) if target.chain_count() == 1 => only.id,
        (None, _) => {
            let available: String = target.chains().map(|c| c.id).collect();
            return Err(EngineError::DataIncompatibility(format!(
                "the target structure has {} chains ({available}); a target chain \
                 must be designated",
                target.chain_count()
            )));
        }
    };
    target.find_chain_by_id(id).ok_or_else(|| {
        EngineError::DataIncompatibility(format!(
            "chain '{id}' is not present in the target structure"
        ))
    })
}

fn model_atom(model: &Structure, serial: usize) -> Result<(&Residue, &Atom), EngineError> {
    let atom = model.find_atom_by_serial(serial).ok_or_else(|| {
        EngineError::DataIncompatibility(format!(
            "restraint atom serial {serial} is not present in the model structure"
        ))
    })?;
    let residue = model.residue(atom.residue_id).ok_or_else(|| {
        EngineError::DataIncompatibility(format!(
            "atom serial {serial} has no parent residue in the model structure"
        ))
    })?;
    Ok((residue, atom))
}

/// The counterpart of a model atom in another structure, or `None` if the
/// model residue faces a gap or the counterpart residue lacks the atom.
fn paired_atom<'s>(
    structure: &'s Structure,
    residues: &[&'s Residue],
    correspondence: &std::collections::HashMap<usize, usize>,
    model_ordinal: usize,
    atom_name: &str,
) -> Option<(&'s Residue, &'s Atom)> {
    let &ordinal = correspondence.get(&model_ordinal)?;
    let residue = residues.get(ordinal)?;
    let atom_id = residue.atom_by_name(atom_name)?;
    Some((residue, structure.atom(atom_id)?))
}
