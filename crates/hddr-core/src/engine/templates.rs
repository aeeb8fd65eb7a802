//! Resolution of template structure files on disk.

use super::error::EngineError;
use crate::core::io::pir::{Alignment, PirEntry};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate file names tried for a template, in order: the atom file
/// recorded in the alignment (as given and with a `.pdb` suffix), the
/// basename of that recorded path (likewise with and without the suffix),
/// then the entry code itself, again both ways. A recorded path like
/// `structures/templ_0.pdb` therefore still resolves when only
/// `templ_0.pdb` sits in a search directory.
fn candidates(entry: &PirEntry) -> Vec<String> {
    let mut names = Vec::new();
    let mut push = |name: &str| {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };
    push(&entry.atom_file);
    if !entry.atom_file.is_empty() && !entry.atom_file.ends_with(".pdb") {
        push(&format!("{}.pdb", entry.atom_file));
    }
    if let Some(base) = Path::new(&entry.atom_file)
        .file_name()
        .and_then(|n| n.to_str())
    {
        push(base);
        if !base.ends_with(".pdb") {
            push(&format!("{base}.pdb"));
        }
    }
    push(&entry.code);
    if !entry.code.ends_with(".pdb") {
        push(&format!("{}.pdb", entry.code));
    }
    names
}

/// Resolves the structure file of one template, trying each candidate name
/// in every search directory. An absolute candidate path is also tried as
/// given.
pub fn resolve_template_file(
    entry: &PirEntry,
    search_dirs: &[PathBuf],
) -> Result<PathBuf, EngineError> {
    for name in candidates(entry) {
        let as_given = Path::new(&name);
        if as_given.is_absolute() && as_given.is_file() {
            return Ok(as_given.to_path_buf());
        }
        for dir in search_dirs {
            let path = dir.join(&name);
            if path.is_file() {
                debug!(code = %entry.code, path = %path.display(), "resolved template file");
                return Ok(path);
            }
        }
    }
    Err(EngineError::TemplateNotFound {
        code: entry.code.clone(),
    })
}

/// Resolves the structure files of all `knowns`, in the given order.
pub fn resolve_template_files(
    alignment: &Alignment,
    knowns: &[String],
    search_dirs: &[PathBuf],
) -> Result<Vec<PathBuf>, EngineError> {
    knowns
        .iter()
        .map(|code| {
            let entry = alignment
                .get(code)
                .ok_or_else(|| EngineError::DataIncompatibility(format!(
                    "template '{code}' is not present in the alignment"
                )))?;
            resolve_template_file(entry, search_dirs)
        })
        .collect()
}
